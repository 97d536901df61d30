//! Tree configuration.
//!
//! This module provides the construction parameters for a [`BPlusTree`],
//! either built directly or loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `BPTREE_ORDER`: Maximum entries per node (default: `27`)
//! - `BPTREE_PREALLOCATION_SIZE`: Number of node-sized buffers carved per
//!   pool refill (default: `100`, `0` or `1` disables pooling)
//!
//! # Invariants
//!
//! - `order` is always at least [`MIN_TREE_ORDER`]
//! - A `TreeConfig` can only be obtained through validation
//!
//! [`BPlusTree`]: crate::btree::BPlusTree

/// Smallest order a tree can be built with.
pub const MIN_TREE_ORDER: usize = 2;

/// Environment variable holding the tree order.
pub const ORDER_ENV_VAR: &str = "BPTREE_ORDER";

/// Environment variable holding the pool preallocation size.
pub const PREALLOCATION_SIZE_ENV_VAR: &str = "BPTREE_PREALLOCATION_SIZE";

/// Tree configuration.
///
/// # Post-conditions
///
/// - `order >= MIN_TREE_ORDER`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    order: usize,
    preallocation_size: usize,
}

/// Error returned when a tree configuration is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The order is below [`MIN_TREE_ORDER`].
    OrderTooLow { order: usize, minimum: usize },
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderTooLow { order, minimum } => {
                write!(f, "invalid tree order {order}: must be at least {minimum}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl TreeConfig {
    /// Default order, tuned for in-memory inserts.
    pub const DEFAULT_ORDER: usize = 27;
    /// Default number of buffers carved per pool refill.
    pub const DEFAULT_PREALLOCATION_SIZE: usize = 100;

    /// Build a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::OrderTooLow`] if `order < MIN_TREE_ORDER`.
    pub const fn new(order: usize, preallocation_size: usize) -> Result<Self, ConfigError> {
        if order < MIN_TREE_ORDER {
            return Err(ConfigError::OrderTooLow {
                order,
                minimum: MIN_TREE_ORDER,
            });
        }

        Ok(Self {
            order,
            preallocation_size,
        })
    }

    /// Maximum number of keys a node holds before it must split.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Number of buffers carved out per pool refill.
    #[must_use]
    pub const fn preallocation_size(&self) -> usize {
        self.preallocation_size
    }

    /// Whether node buffers are drawn from pools rather than allocated one by one.
    #[must_use]
    pub const fn pooling_enabled(&self) -> bool {
        self.preallocation_size > 1
    }

    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but is not a non-negative
    /// integer, or if the resulting order is too low.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let order = load_size(&lookup, ORDER_ENV_VAR)?.unwrap_or(Self::DEFAULT_ORDER);
        let preallocation_size = load_size(&lookup, PREALLOCATION_SIZE_ENV_VAR)?
            .unwrap_or(Self::DEFAULT_PREALLOCATION_SIZE);

        Self::new(order, preallocation_size)
    }
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            order: Self::DEFAULT_ORDER,
            preallocation_size: Self::DEFAULT_PREALLOCATION_SIZE,
        }
    }
}

/// Parse a size variable, rejecting negative and non-numeric values.
fn load_size(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };

    let value = raw.trim().parse::<i64>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        message: format!("'{raw}' is not an integer"),
    })?;

    usize::try_from(value)
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("{value} is too low: must not be negative"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(
        pairs: &'static [(&'static str, &'static str)],
    ) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_string())
        }
    }

    #[test]
    fn test_default_values() {
        let config = TreeConfig::default();
        assert_eq!(config.order(), 27);
        assert_eq!(config.preallocation_size(), 100);
        assert!(config.pooling_enabled());
    }

    #[test]
    fn test_order_too_low() {
        assert_eq!(
            TreeConfig::new(1, 10),
            Err(ConfigError::OrderTooLow {
                order: 1,
                minimum: 2
            })
        );
        assert!(TreeConfig::new(0, 0).is_err());
        assert!(TreeConfig::new(2, 0).is_ok());
    }

    #[test]
    fn test_pooling_disabled_for_small_sizes() {
        assert!(!TreeConfig::new(4, 0).unwrap().pooling_enabled());
        assert!(!TreeConfig::new(4, 1).unwrap().pooling_enabled());
        assert!(TreeConfig::new(4, 2).unwrap().pooling_enabled());
    }

    #[test]
    fn test_lookup_defaults_when_unset() {
        let config = TreeConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, TreeConfig::default());
    }

    #[test]
    fn test_lookup_reads_values() {
        let config = TreeConfig::from_lookup(lookup_from(&[
            ("BPTREE_ORDER", "5"),
            ("BPTREE_PREALLOCATION_SIZE", " 16 "),
        ]))
        .unwrap();
        assert_eq!(config.order(), 5);
        assert_eq!(config.preallocation_size(), 16);
    }

    #[test]
    fn test_lookup_rejects_negative_preallocation() {
        let error =
            TreeConfig::from_lookup(lookup_from(&[("BPTREE_PREALLOCATION_SIZE", "-1")]))
                .unwrap_err();
        assert_eq!(
            error.to_string(),
            "invalid value for BPTREE_PREALLOCATION_SIZE: -1 is too low: must not be negative"
        );
    }

    #[test]
    fn test_lookup_rejects_garbage_and_low_order() {
        assert!(matches!(
            TreeConfig::from_lookup(lookup_from(&[("BPTREE_ORDER", "many")])),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            TreeConfig::from_lookup(lookup_from(&[("BPTREE_ORDER", "1")])),
            Err(ConfigError::OrderTooLow { .. })
        ));
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError::OrderTooLow {
            order: 1,
            minimum: 2,
        };
        assert_eq!(error.to_string(), "invalid tree order 1: must be at least 2");
    }
}
