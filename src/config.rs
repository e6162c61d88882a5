// Application configuration loaded from the environment

use rust_decimal::Decimal;
use std::str::FromStr;

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

/// Pricing knobs used by checkout
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutConfig {
    /// Flat shipping fee charged below the free shipping threshold
    pub shipping_fee: Decimal,
    /// Orders with a subtotal at or above this amount ship free
    pub free_shipping_threshold: Decimal,
    /// Tax as a percentage of the subtotal
    pub tax_rate_percent: Decimal,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            shipping_fee: Decimal::from(50),
            free_shipping_threshold: Decimal::from(999),
            tax_rate_percent: Decimal::ZERO,
        }
    }
}

/// Top level configuration for the API process
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub max_db_connections: u32,
    pub checkout: CheckoutConfig,
    /// Requests per second allowed on public tracking, per client IP
    pub tracking_rate_limit_per_second: Option<u64>,
}

impl AppConfig {
    /// Load configuration from process environment
    ///
    /// Call `dotenv::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or("PORT", lookup("PORT"), 8080u16)?;
        let max_db_connections = parse_or("DATABASE_MAX_CONNECTIONS", lookup("DATABASE_MAX_CONNECTIONS"), 5u32)?;

        let defaults = CheckoutConfig::default();
        let checkout = CheckoutConfig {
            shipping_fee: parse_or("SHIPPING_FEE", lookup("SHIPPING_FEE"), defaults.shipping_fee)?,
            free_shipping_threshold: parse_or(
                "FREE_SHIPPING_THRESHOLD",
                lookup("FREE_SHIPPING_THRESHOLD"),
                defaults.free_shipping_threshold,
            )?,
            tax_rate_percent: parse_or(
                "TAX_RATE_PERCENT",
                lookup("TAX_RATE_PERCENT"),
                defaults.tax_rate_percent,
            )?,
        };

        if checkout.shipping_fee < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                name: "SHIPPING_FEE",
                value: checkout.shipping_fee.to_string(),
            });
        }
        if checkout.tax_rate_percent < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                name: "TAX_RATE_PERCENT",
                value: checkout.tax_rate_percent.to_string(),
            });
        }

        let tracking_rate_limit_per_second = match lookup("TRACKING_RATE_LIMIT_PER_SECOND") {
            Some(raw) => {
                let value: u64 = parse_value("TRACKING_RATE_LIMIT_PER_SECOND", &raw)?;
                if value == 0 {
                    return Err(ConfigError::Invalid {
                        name: "TRACKING_RATE_LIMIT_PER_SECOND",
                        value: raw,
                    });
                }
                Some(value)
            }
            None => None,
        };

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            max_db_connections,
            checkout,
            tracking_rate_limit_per_second,
        })
    }

    /// Socket address string the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        name,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/tokri"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_db_connections, 5);
        assert_eq!(config.checkout, CheckoutConfig::default());
        assert_eq!(config.tracking_rate_limit_per_second, None);
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_missing_database_url() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "secret")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("DATABASE_URL")));
    }

    #[test]
    fn test_missing_jwt_secret() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));
    }

    #[test]
    fn test_checkout_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("SHIPPING_FEE", "79.50"),
            ("FREE_SHIPPING_THRESHOLD", "1499"),
            ("TAX_RATE_PERCENT", "18"),
            ("TRACKING_RATE_LIMIT_PER_SECOND", "3"),
        ]))
        .unwrap();

        assert_eq!(config.checkout.shipping_fee, dec!(79.50));
        assert_eq!(config.checkout.free_shipping_threshold, dec!(1499));
        assert_eq!(config.checkout.tax_rate_percent, dec!(18));
        assert_eq!(config.tracking_rate_limit_per_second, Some(3));
    }

    #[test]
    fn test_invalid_port_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("TRACKING_RATE_LIMIT_PER_SECOND", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_negative_tax_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "secret"),
            ("TAX_RATE_PERCENT", "-5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TAX_RATE_PERCENT", .. }));
    }
}
