//! Engine configuration, resolved once by the host and passed into services.

use crate::error::{ChartError, ChartResult};

pub const DEFAULT_CUSTOM_CODE_PREFIX: &str = "CUST";
pub const DEFAULT_CUSTOM_CODE_LENGTH: usize = 6;
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 50;
pub const DEFAULT_PERSISTENCE_RETRIES: u32 = 1;
pub const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Chart engine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartConfig {
    /// Prefix of synthesized custom codes
    pub custom_code_prefix: String,
    /// Hex characters after the prefix
    pub custom_code_length: usize,
    /// Rows fetched per history page
    pub history_page_size: usize,
    /// Extra attempts of an atomic write after a persistence failure
    pub persistence_retries: u32,
    /// Maximum catalog search results
    pub search_limit: usize,
}

impl ChartConfig {
    pub fn new(
        custom_code_prefix: impl Into<String>,
        custom_code_length: usize,
        history_page_size: usize,
        persistence_retries: u32,
        search_limit: usize,
    ) -> ChartResult<Self> {
        let custom_code_prefix = custom_code_prefix.into().trim().to_string();
        if custom_code_prefix.is_empty()
            || !custom_code_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ChartError::invalid(
                "custom_code_prefix",
                "must be non-empty and alphanumeric",
            ));
        }
        // A v4 UUID has 32 hex digits.
        if !(4..=32).contains(&custom_code_length) {
            return Err(ChartError::invalid("custom_code_length", "must be between 4 and 32"));
        }
        if history_page_size == 0 {
            return Err(ChartError::invalid("history_page_size", "must be positive"));
        }
        if search_limit == 0 {
            return Err(ChartError::invalid("search_limit", "must be positive"));
        }
        Ok(Self {
            custom_code_prefix,
            custom_code_length,
            history_page_size,
            persistence_retries,
            search_limit,
        })
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            custom_code_prefix: DEFAULT_CUSTOM_CODE_PREFIX.to_string(),
            custom_code_length: DEFAULT_CUSTOM_CODE_LENGTH,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            persistence_retries: DEFAULT_PERSISTENCE_RETRIES,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let d = ChartConfig::default();
        let built = ChartConfig::new(
            d.custom_code_prefix.clone(),
            d.custom_code_length,
            d.history_page_size,
            d.persistence_retries,
            d.search_limit,
        )
        .unwrap();
        assert_eq!(built, d);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(ChartConfig::new("", 6, 50, 1, 20).is_err());
        assert!(ChartConfig::new("CU-ST", 6, 50, 1, 20).is_err());
        assert!(ChartConfig::new("CUST", 2, 50, 1, 20).is_err());
        assert!(ChartConfig::new("CUST", 6, 0, 1, 20).is_err());
        assert!(ChartConfig::new("CUST", 6, 50, 1, 0).is_err());
    }
}
