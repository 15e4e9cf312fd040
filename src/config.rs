//! Server configuration via CLI args and environment variables.

use std::time::Duration;

use clap::Parser;

use bruteguard_service::ServiceConfig;
use bruteguard_service::limiter::LimitConfig;

/// Brute-force protection service for login endpoints.
#[derive(Parser, Debug, Clone)]
#[command(name = "bruteguard-server", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "BRUTEGUARD_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8080, env = "BRUTEGUARD_PORT")]
    pub port: u16,

    /// SQLite URL for the allow/deny lists, e.g. `sqlite://data/lists.db`.
    /// Omit to keep the lists in memory.
    #[arg(long, env = "BRUTEGUARD_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Attempts allowed per login within the login interval.
    #[arg(long, default_value_t = 10, env = "BRUTEGUARD_LOGIN_LIMIT")]
    pub login_limit: u64,

    /// Login window length in seconds.
    #[arg(long, default_value_t = 60, env = "BRUTEGUARD_LOGIN_INTERVAL")]
    pub login_interval: u64,

    /// Attempts allowed per password within the password interval.
    #[arg(long, default_value_t = 100, env = "BRUTEGUARD_PASSWORD_LIMIT")]
    pub password_limit: u64,

    /// Password window length in seconds.
    #[arg(long, default_value_t = 60, env = "BRUTEGUARD_PASSWORD_INTERVAL")]
    pub password_interval: u64,

    /// Attempts allowed per source address within the address interval.
    #[arg(long, default_value_t = 1000, env = "BRUTEGUARD_IP_LIMIT")]
    pub ip_limit: u64,

    /// Address window length in seconds.
    #[arg(long, default_value_t = 60, env = "BRUTEGUARD_IP_INTERVAL")]
    pub ip_interval: u64,

    /// Bearer token for the admin routes (reset, lists). Unset leaves them open.
    #[arg(long, env = "BRUTEGUARD_ADMIN_TOKEN")]
    pub admin_token: Option<String>,

    /// Log level.
    #[arg(long, default_value = "info", env = "BRUTEGUARD_LOG_LEVEL")]
    pub log_level: String,

    /// Log format: "text" or "json".
    #[arg(long, default_value = "text", env = "BRUTEGUARD_LOG_FORMAT")]
    pub log_format: String,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// The limiter and auth settings handed to the service layer.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            login: LimitConfig::new(self.login_limit, Duration::from_secs(self.login_interval)),
            password: LimitConfig::new(
                self.password_limit,
                Duration::from_secs(self.password_interval),
            ),
            address: LimitConfig::new(self.ip_limit, Duration::from_secs(self.ip_interval)),
            admin_token: self.admin_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["bruteguard-server"]).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());

        let service = config.service_config();
        assert_eq!(service.login, LimitConfig::new(10, Duration::from_secs(60)));
        assert_eq!(service.password, LimitConfig::new(100, Duration::from_secs(60)));
        assert_eq!(service.address, LimitConfig::new(1000, Duration::from_secs(60)));
        assert!(service.admin_token.is_none());
    }

    #[test]
    fn flags_override_limits() {
        let config = Config::try_parse_from([
            "bruteguard-server",
            "--login-limit",
            "3",
            "--ip-interval",
            "5",
            "--admin-token",
            "t0k",
        ])
        .unwrap();

        let service = config.service_config();
        assert_eq!(service.login.limit, 3);
        assert_eq!(service.address.interval, Duration::from_secs(5));
        assert_eq!(service.admin_token.as_deref(), Some("t0k"));
    }
}
