//! Engine configuration from environment variables.

use mind_core::AaAlgorithm;
use std::env;
use std::time::Duration;

/// Default number of associations in a leaderboard.
pub const DEFAULT_LEADERBOARD_SIZE: usize = 20;

/// Default interval between result distributor ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Association engine configuration.
///
/// Read once at construction; changing it requires a new engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    /// Ranking strategy.
    pub algorithm: AaAlgorithm,
    /// Maximum associations per leaderboard.
    pub leaderboard_size: usize,
    /// Result distributor polling interval.
    pub poll_interval: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            algorithm: AaAlgorithm::default(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl AiConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `MIND_AA_ALGORITHM`: `bow` or `weighted-fts` (default: weighted-fts)
    /// - `MIND_AA_LEADERBOARD_SIZE`: maximum associations (default: 20)
    /// - `MIND_DISTRIBUTOR_POLL_MS`: distributor tick in milliseconds (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("MIND_AA_ALGORITHM") {
            config.algorithm = value.parse().map_err(|e| ConfigError::InvalidValue {
                name: "MIND_AA_ALGORITHM".to_string(),
                reason: format!("{e}"),
            })?;
        }

        if let Some(value) = lookup("MIND_AA_LEADERBOARD_SIZE") {
            config.leaderboard_size = parse_positive("MIND_AA_LEADERBOARD_SIZE", &value)?;
        }

        if let Some(value) = lookup("MIND_DISTRIBUTOR_POLL_MS") {
            let millis = parse_positive("MIND_DISTRIBUTOR_POLL_MS", &value)?;
            config.poll_interval = Duration::from_millis(millis as u64);
        }

        Ok(config)
    }

    /// Sets the ranking strategy.
    pub fn with_algorithm(mut self, algorithm: AaAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the leaderboard size.
    pub fn with_leaderboard_size(mut self, size: usize) -> Self {
        self.leaderboard_size = size;
        self
    }

    /// Sets the distributor polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn parse_positive(name: &str, value: &str) -> Result<usize, ConfigError> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        Ok(n) => Ok(n),
        Err(e) => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid environment variable value.
    #[error("invalid value for environment variable {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = AiConfig::from_vars(lookup(&[])).unwrap();

        assert_eq!(config.algorithm, AaAlgorithm::WeightedFullText);
        assert_eq!(config.leaderboard_size, 20);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config, AiConfig::default());
    }

    #[test]
    fn test_values_from_vars() {
        let config = AiConfig::from_vars(lookup(&[
            ("MIND_AA_ALGORITHM", "bow"),
            ("MIND_AA_LEADERBOARD_SIZE", "5"),
            ("MIND_DISTRIBUTOR_POLL_MS", "25"),
        ]))
        .unwrap();

        assert_eq!(config.algorithm, AaAlgorithm::BagOfWords);
        assert_eq!(config.leaderboard_size, 5);
        assert_eq!(config.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_invalid_algorithm() {
        let err = AiConfig::from_vars(lookup(&[("MIND_AA_ALGORITHM", "neural")])).unwrap_err();
        assert!(err.to_string().contains("MIND_AA_ALGORITHM"));
    }

    #[test]
    fn test_zero_leaderboard_rejected() {
        let err =
            AiConfig::from_vars(lookup(&[("MIND_AA_LEADERBOARD_SIZE", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref name, .. } if name == "MIND_AA_LEADERBOARD_SIZE"));
    }

    #[test]
    fn test_unparsable_poll_interval() {
        assert!(AiConfig::from_vars(lookup(&[("MIND_DISTRIBUTOR_POLL_MS", "soon")])).is_err());
    }

    #[test]
    fn test_builders() {
        let config = AiConfig::default()
            .with_algorithm(AaAlgorithm::BagOfWords)
            .with_leaderboard_size(3)
            .with_poll_interval(Duration::from_millis(5));

        assert_eq!(config.algorithm, AaAlgorithm::BagOfWords);
        assert_eq!(config.leaderboard_size, 3);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
    }
}
