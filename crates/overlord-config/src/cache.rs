//! Thread-safe configuration caching with arc-swap for lock-free reads.

use crate::schema::Config;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Thread-safe configuration cache using arc-swap for lock-free reads.
///
/// Readers take a snapshot with [`ConfigCache::get`] and keep using it for the
/// duration of one message; a concurrent reload never changes a snapshot in
/// flight.
pub struct ConfigCache {
    config: ArcSwap<Config>,
}

impl ConfigCache {
    /// Creates a new configuration cache with the given initial configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Gets the current configuration.
    pub fn get(&self) -> Arc<Config> {
        self.config.load_full()
    }

    /// Validates and installs a new configuration. The current one is kept on failure.
    pub fn update(&self, config: Config) -> Result<(), crate::ConfigError> {
        config.validate()?;
        self.config.store(Arc::new(config));
        Ok(())
    }
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_survives_update() {
        let cache = ConfigCache::default();
        let before = cache.get();

        let mut next = Config::default();
        next.chat.prefix = "?".to_string();
        cache.update(next).unwrap();

        assert_eq!(before.chat.prefix, "!");
        assert_eq!(cache.get().chat.prefix, "?");
    }

    #[test]
    fn test_invalid_update_rejected() {
        let cache = ConfigCache::default();
        let mut bad = Config::default();
        bad.spam.max_repeats = 0;

        assert!(cache.update(bad).is_err());
        assert_eq!(cache.get().spam.max_repeats, 3);
    }
}
