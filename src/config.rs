use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::engine::PackingConfig;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            engine: EngineConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("STOWPLAN_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse STOWPLAN_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("STOWPLAN_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ STOWPLAN_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse STOWPLAN_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the packing engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    packing: PackingConfig,
}

impl EngineConfig {
    const TOLERANCE_VAR: &'static str = "STOWPLAN_PACKING_TOLERANCE";
    const WEIGHT_THRESHOLD_VAR: &'static str = "STOWPLAN_PACKING_WEIGHT_ATTRIBUTION_THRESHOLD";
    const MAX_PLACEMENTS_VAR: &'static str = "STOWPLAN_PACKING_MAX_PLACEMENTS";

    fn from_env() -> Self {
        let tolerance = load_f64_with_warning(
            Self::TOLERANCE_VAR,
            PackingConfig::DEFAULT_TOLERANCE,
            |value| value >= 0.0,
            "must not be negative",
            "Warning: Adjusted tolerance may cause unexpected fits",
        );

        let weight_attribution_threshold = load_f64_with_warning(
            Self::WEIGHT_THRESHOLD_VAR,
            PackingConfig::DEFAULT_WEIGHT_ATTRIBUTION_THRESHOLD,
            |value| (0.0..=100.0).contains(&value),
            "must be between 0 and 100",
            "Warning: Adjusted threshold changes how partial loads are attributed",
        );

        let max_placements = match env_string(Self::MAX_PLACEMENTS_VAR) {
            Some(raw) => match parse_positive_usize(&raw) {
                Some(value) => value,
                None => {
                    eprintln!(
                        "⚠️ Could not interpret {} ('{}') as a positive count. Using {}.",
                        Self::MAX_PLACEMENTS_VAR,
                        raw,
                        PackingConfig::DEFAULT_MAX_PLACEMENTS
                    );
                    PackingConfig::DEFAULT_MAX_PLACEMENTS
                }
            },
            None => PackingConfig::DEFAULT_MAX_PLACEMENTS,
        };

        let packing = PackingConfig::builder()
            .tolerance(tolerance)
            .weight_attribution_threshold(weight_attribution_threshold)
            .max_placements(max_placements)
            .build();

        Self { packing }
    }

    /// Returns the configured PackingConfig.
    pub fn packing_config(&self) -> PackingConfig {
        self.packing
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_positive_usize(raw: &str) -> Option<usize> {
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => None,
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_positive_usize_accepts_counts() {
        assert_eq!(parse_positive_usize("1"), Some(1));
        assert_eq!(parse_positive_usize("250000"), Some(250_000));
        assert_eq!(parse_positive_usize("  42  "), Some(42));
    }

    #[test]
    fn test_parse_positive_usize_rejects_invalid_values() {
        assert_eq!(parse_positive_usize("0"), None);
        assert_eq!(parse_positive_usize("-3"), None);
        assert_eq!(parse_positive_usize("3.5"), None);
        assert_eq!(parse_positive_usize("many"), None);
        assert_eq!(parse_positive_usize(""), None);
    }
}
