//! Engine configuration.

use crate::Fees;
use std::env;
use std::time::Duration;

/// Default upper bound on a single remote store call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings shared by the favorites and bookings stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote calls exceeding this report `NetworkTimeout`
    pub request_timeout: Duration,
    /// Fees added to every booking total
    pub fees: Fees,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fees: Fees::default(),
        }
    }
}

impl SyncConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_fees(mut self, fees: Fees) -> Self {
        self.fees = fees;
        self
    }

    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let request_timeout = match env::var("STAYBOOK_TIMEOUT_SECS") {
            Ok(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::InvalidTimeout)?;
                if secs == 0 {
                    return Err(ConfigError::InvalidTimeout);
                }
                Duration::from_secs(secs)
            }
            Err(_) => defaults.request_timeout,
        };

        let cleaning_fee = parse_fee("STAYBOOK_CLEANING_FEE", defaults.fees.cleaning_fee)?;
        let service_fee = parse_fee("STAYBOOK_SERVICE_FEE", defaults.fees.service_fee)?;

        Ok(Self {
            request_timeout,
            fees: Fees {
                cleaning_fee,
                service_fee,
            },
        })
    }
}

fn parse_fee(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidFee(var)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STAYBOOK_TIMEOUT_SECS must be a positive number of seconds")]
    InvalidTimeout,

    #[error("{0} must be a whole number of rupees")]
    InvalidFee(&'static str),
}
