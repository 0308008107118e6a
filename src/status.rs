//! Status strings to gauge values.
//!
//! Remote services report status as free-form, case-varying strings. Each
//! resource kind gets a small ordered [`StatusTable`]; a status maps to its
//! position in the table. Positions are only an encoding, nothing about the
//! order means "better" or "worse".

/// Value reported for a status that is not in the kind's table.
pub const UNKNOWN_STATUS: i64 = -1;

/// An ordered vocabulary of known statuses for one resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTable {
    kind: &'static str,
    statuses: &'static [&'static str],
}

impl StatusTable {
    /// Create a table. Entries must be lowercase.
    pub const fn new(kind: &'static str, statuses: &'static [&'static str]) -> Self {
        Self { kind, statuses }
    }

    /// The resource kind this table describes.
    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    /// The known statuses, in ordinal order.
    pub const fn statuses(&self) -> &'static [&'static str] {
        self.statuses
    }

    /// Map `raw` to its ordinal, ignoring case. Unknown statuses yield
    /// [`UNKNOWN_STATUS`].
    pub fn ordinal(&self, raw: &str) -> i64 {
        self.statuses
            .iter()
            .position(|status| status.eq_ignore_ascii_case(raw))
            .map_or(UNKNOWN_STATUS, |idx| idx as i64)
    }
}

/// DNS zones.
pub const ZONE: StatusTable = StatusTable::new("zone", &["pending", "active", "deleted", "error"]);

/// DNS recordsets.
pub const RECORDSET: StatusTable =
    StatusTable::new("recordset", &["pending", "active", "deleted", "error"]);

/// Neutron networks.
pub const NETWORK: StatusTable = StatusTable::new("network", &["active", "build", "down", "error"]);

/// Neutron ports.
pub const PORT: StatusTable = StatusTable::new("port", &["active", "build", "down", "error"]);

/// Compute servers.
pub const SERVER: StatusTable = StatusTable::new(
    "server",
    &[
        "active",
        "build",
        "deleted",
        "error",
        "hard_reboot",
        "migrating",
        "password",
        "paused",
        "reboot",
        "rebuild",
        "rescue",
        "resize",
        "revert_resize",
        "shelved",
        "shelved_offloaded",
        "shutoff",
        "soft_deleted",
        "suspended",
        "unknown",
        "verify_resize",
    ],
);

const TABLES: &[StatusTable] = &[ZONE, RECORDSET, NETWORK, PORT, SERVER];

/// Look up the table for `kind`.
pub fn table(kind: &str) -> Option<&'static StatusTable> {
    TABLES.iter().find(|table| table.kind == kind)
}

/// Map a raw status for `kind` to its ordinal. Unknown kinds and unknown
/// statuses both yield [`UNKNOWN_STATUS`].
pub fn map_status(kind: &str, raw: &str) -> i64 {
    table(kind).map_or(UNKNOWN_STATUS, |table| table.ordinal(raw))
}
