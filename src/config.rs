use crate::constants::{
    DEFAULT_EVENT_CHANNEL_CAPACITY, DEFAULT_MAX_CONCURRENT_UNITS, DEFAULT_REBUILD_DEBOUNCE_MS,
    REBUILD_MARKER_FILE,
};
use crate::error::{Result, WeaverError};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct WeaverConfig {
    pub max_concurrent_units: usize,
    pub event_channel_capacity: usize,
    pub rebuild_debounce_ms: u64,
    pub rebuild_marker_file: String,
    pub memoize_eligibility: bool,
    pub custom_settings: HashMap<String, String>,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        Self {
            max_concurrent_units: DEFAULT_MAX_CONCURRENT_UNITS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            rebuild_debounce_ms: DEFAULT_REBUILD_DEBOUNCE_MS,
            rebuild_marker_file: REBUILD_MARKER_FILE.to_string(),
            memoize_eligibility: true,
            custom_settings: HashMap::new(),
        }
    }
}

impl WeaverConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(max_units) = std::env::var("WEAVER_MAX_CONCURRENT_UNITS") {
            config.max_concurrent_units = max_units.parse().map_err(|e| {
                WeaverError::ConfigurationError(format!("Invalid max_concurrent_units: {e}"))
            })?;
        }

        if let Ok(capacity) = std::env::var("WEAVER_EVENT_CHANNEL_CAPACITY") {
            config.event_channel_capacity = capacity.parse().map_err(|e| {
                WeaverError::ConfigurationError(format!("Invalid event_channel_capacity: {e}"))
            })?;
        }

        if let Ok(debounce) = std::env::var("WEAVER_REBUILD_DEBOUNCE_MS") {
            config.rebuild_debounce_ms = debounce.parse().map_err(|e| {
                WeaverError::ConfigurationError(format!("Invalid rebuild_debounce_ms: {e}"))
            })?;
        }

        if let Ok(marker) = std::env::var("WEAVER_REBUILD_MARKER_FILE") {
            if marker.is_empty() {
                return Err(WeaverError::ConfigurationError(
                    "rebuild_marker_file must not be empty".to_string(),
                ));
            }
            config.rebuild_marker_file = marker;
        }

        if let Ok(memoize) = std::env::var("WEAVER_MEMOIZE_ELIGIBILITY") {
            config.memoize_eligibility = memoize.parse().map_err(|e| {
                WeaverError::ConfigurationError(format!("Invalid memoize_eligibility: {e}"))
            })?;
        }

        Ok(config)
    }
}
