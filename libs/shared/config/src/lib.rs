use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SEED_DATA: &str = "data/mock_data.json";
pub const DEFAULT_SLOT_LOOKAHEAD_DAYS: u32 = 7;
pub const DEFAULT_PAYMENT_DELAY_MS: u64 = 1500;
pub const DEFAULT_CONSULTATION_FEE: u32 = 100;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub seed_data_path: PathBuf,
    /// `None` keeps the store in memory only.
    pub storage_path: Option<PathBuf>,
    pub slot_lookahead_days: u32,
    pub payment_delay_ms: u64,
    pub consultation_fee: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            seed_data_path: PathBuf::from(DEFAULT_SEED_DATA),
            storage_path: None,
            slot_lookahead_days: DEFAULT_SLOT_LOOKAHEAD_DAYS,
            payment_delay_ms: DEFAULT_PAYMENT_DELAY_MS,
            consultation_fee: DEFAULT_CONSULTATION_FEE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            bind_addr: env::var("CLINIC_BIND_ADDR")
                .unwrap_or_else(|_| {
                    warn!("CLINIC_BIND_ADDR not set, using {}", DEFAULT_BIND_ADDR);
                    DEFAULT_BIND_ADDR.to_string()
                }),
            seed_data_path: env::var("CLINIC_SEED_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    warn!("CLINIC_SEED_DATA not set, using {}", DEFAULT_SEED_DATA);
                    PathBuf::from(DEFAULT_SEED_DATA)
                }),
            storage_path: match env::var("CLINIC_STORAGE_PATH") {
                Ok(path) if !path.trim().is_empty() => Some(PathBuf::from(path)),
                _ => {
                    warn!("CLINIC_STORAGE_PATH not set, data will be kept in memory only");
                    None
                }
            },
            slot_lookahead_days: parse_or_default(
                "CLINIC_SLOT_LOOKAHEAD_DAYS",
                DEFAULT_SLOT_LOOKAHEAD_DAYS,
            ),
            payment_delay_ms: parse_or_default("CLINIC_PAYMENT_DELAY_MS", DEFAULT_PAYMENT_DELAY_MS),
            consultation_fee: parse_or_default("CLINIC_CONSULTATION_FEE", DEFAULT_CONSULTATION_FEE),
        };

        if config.slot_lookahead_days == 0 {
            warn!("CLINIC_SLOT_LOOKAHEAD_DAYS is 0 - no slots will be bookable");
        }

        config
    }

    pub fn is_persistent(&self) -> bool {
        self.storage_path.is_some()
    }
}

fn parse_or_default<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.slot_lookahead_days, 7);
        assert_eq!(config.payment_delay_ms, 1500);
        assert_eq!(config.consultation_fee, 100);
        assert!(!config.is_persistent());
    }

    #[test]
    fn test_persistent_when_storage_path_set() {
        let config = AppConfig {
            storage_path: Some(PathBuf::from("/tmp/clinic.json")),
            ..AppConfig::default()
        };

        assert!(config.is_persistent());
    }
}
