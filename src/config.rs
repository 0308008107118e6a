//! Configuration: a TOML file, overridable from the command line.

use crate::{
    Error, LogFormat, Policy, Result,
    client::Endpoints,
    poller::Schedule,
    services,
};
use clap::Parser;
use serde::Deserialize;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

const TOKEN_VAR: &str = "OS_AUTH_TOKEN";

/// Exporter configuration.
///
/// ```toml
/// listen = "0.0.0.0:9180"
/// services = ["dns", "network"]
/// endpoint_type = "internal"
/// disabled_metrics = ["neutron-port_status"]
///
/// [endpoints.dns]
/// internal = "http://designate.internal:9001"
///
/// [endpoints.network]
/// internal = "http://neutron.internal:9696"
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address the Prometheus endpoint listens on.
    pub listen: SocketAddr,
    /// First component of every metric name.
    pub prefix: String,
    pub interval_secs: u64,
    /// Deadline for one collection cycle of one service.
    pub scrape_timeout_secs: u64,
    /// Timeout for a single HTTP request.
    pub request_timeout_secs: u64,
    /// Service types to export, e.g. `dns`.
    pub services: Vec<String>,
    /// `public`, `internal` or `admin`.
    pub endpoint_type: String,
    /// Pre-issued API token. Falls back to `OS_AUTH_TOKEN`.
    pub auth_token: Option<String>,
    pub endpoints: Endpoints,
    /// Metrics to leave out, as `<service>-<metric>`.
    pub disabled_metrics: Vec<String>,
    pub disable_slow_metrics: bool,
    pub disable_deprecated_metrics: bool,
    /// Also export how long each metric group took to collect.
    pub collect_time: bool,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9180)),
            prefix: "openstack".to_owned(),
            interval_secs: 60,
            scrape_timeout_secs: 30,
            request_timeout_secs: 10,
            services: services::SERVICES
                .iter()
                .map(|service| service.service_type.to_owned())
                .collect(),
            endpoint_type: "public".to_owned(),
            auth_token: None,
            endpoints: Endpoints::new(),
            disabled_metrics: Vec::new(),
            disable_slow_metrics: false,
            disable_deprecated_metrics: false,
            collect_time: false,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&contents)
    }

    /// Reject settings the exporter cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(Error::Config("interval_secs must be positive".into()));
        }
        if self.scrape_timeout_secs == 0 || self.scrape_timeout_secs > self.interval_secs {
            return Err(Error::Config(
                "scrape_timeout_secs must be positive and at most interval_secs".into(),
            ));
        }
        if self.services.is_empty() {
            return Err(Error::Config("no services enabled".into()));
        }
        for name in &self.services {
            services::lookup(name)?;
        }
        Ok(())
    }

    pub fn policy(&self) -> Policy {
        Policy {
            disabled_metrics: self.disabled_metrics.iter().cloned().collect(),
            disable_slow: self.disable_slow_metrics,
            disable_deprecated: self.disable_deprecated_metrics,
        }
    }

    pub fn schedule(&self) -> Schedule {
        Schedule {
            interval: Duration::from_secs(self.interval_secs),
            timeout: Duration::from_secs(self.scrape_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// The API token, from the file or the environment.
    pub fn token(&self) -> Result<String> {
        match &self.auth_token {
            Some(token) => Ok(token.clone()),
            None => std::env::var(TOKEN_VAR).map_err(|_| {
                Error::Config(format!("no auth_token configured and {TOKEN_VAR} unset"))
            }),
        }
    }
}

/// Command line.
#[derive(Debug, Parser)]
#[command(name = "cloud-exporter", version, about)]
pub struct Args {
    /// Configuration file.
    #[arg(short, long, env = "CLOUD_EXPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to serve metrics on.
    #[arg(long)]
    pub listen: Option<SocketAddr>,

    /// Endpoint type used to reach each service.
    #[arg(long)]
    pub endpoint_type: Option<String>,

    /// Metric to disable, as `<service>-<metric>`. Repeatable.
    #[arg(long = "disable-metric")]
    pub disabled_metrics: Vec<String>,

    #[arg(long)]
    pub disable_slow_metrics: bool,

    #[arg(long)]
    pub disable_deprecated_metrics: bool,

    /// Export per-group collection time.
    #[arg(long)]
    pub collect_time: bool,

    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Services to export. Defaults to the configured ones.
    pub services: Vec<String>,
}

impl Args {
    /// Load the configuration file, if any, and apply overrides.
    pub fn load(self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        self.apply(config)
    }

    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(endpoint_type) = self.endpoint_type {
            config.endpoint_type = endpoint_type;
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }
        if !self.services.is_empty() {
            config.services = self.services;
        }
        config.disabled_metrics.extend(self.disabled_metrics);
        config.disable_slow_metrics |= self.disable_slow_metrics;
        config.disable_deprecated_metrics |= self.disable_deprecated_metrics;
        config.collect_time |= self.collect_time;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(
            config.services,
            ["dns", "baremetal", "network", "compute", "image", "placement"]
        );
    }

    #[test]
    fn parses_file() {
        let config = Config::from_toml(
            r#"
            listen = "127.0.0.1:9999"
            services = ["dns"]
            endpoint_type = "internal"
            auth_token = "t0k3n"
            disabled_metrics = ["designate-recordsets"]
            disable_slow_metrics = true
            log_format = "json"

            [endpoints.dns]
            internal = "http://designate:9001"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen.port(), 9999);
        assert_eq!(config.endpoints["dns"]["internal"], "http://designate:9001");
        assert_eq!(config.token().unwrap(), "t0k3n");
        assert_eq!(config.log_format, LogFormat::Json);

        let policy = config.policy();
        assert!(policy.disabled_metrics.contains("designate-recordsets"));
        assert!(policy.disable_slow);
        assert!(!policy.disable_deprecated);
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(
            Config::from_toml("listen = 5"),
            Err(Error::Toml(_))
        ));
        assert!(matches!(
            Config::from_toml("no_such_key = true"),
            Err(Error::Toml(_))
        ));
        assert!(matches!(
            Config::from_toml(r#"services = ["volume"]"#),
            Err(Error::UnknownService(_))
        ));
        assert!(matches!(
            Config::from_toml("interval_secs = 10\nscrape_timeout_secs = 20"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn cli_overrides_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "services = [\"dns\", \"network\"]\ndisabled_metrics = [\"neutron-ports\"]"
        )
        .unwrap();

        let args = Args::parse_from([
            "cloud-exporter",
            "--config",
            file.path().to_str().unwrap(),
            "--disable-metric",
            "designate-zones",
            "--endpoint-type",
            "admin",
            "--collect-time",
            "network",
        ]);
        let config = args.load().unwrap();

        assert_eq!(config.services, ["network"]);
        assert_eq!(config.endpoint_type, "admin");
        assert_eq!(config.disabled_metrics, ["neutron-ports", "designate-zones"]);
        assert!(config.collect_time);
        assert!(!config.disable_slow_metrics);
    }

    #[test]
    fn missing_file() {
        let err = Config::load(Path::new("/nonexistent/cloud-exporter.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("nonexistent")));
    }
}
