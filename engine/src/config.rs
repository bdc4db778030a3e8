//! Configuration for a [`Service`](crate::Service).

use serde::{Deserialize, Serialize};
use std::env;

/// Name of the identifier field when none is configured.
pub const DEFAULT_ID_FIELD: &str = "id";

/// How the store assigns identifiers to payloads that lack one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum IdStrategy {
    /// Monotonically increasing integers, starting at `start`.
    Sequential { start: i64 },
    /// Random v4 UUID strings.
    Uuid,
}

impl Default for IdStrategy {
    fn default() -> Self {
        IdStrategy::Sequential { start: 0 }
    }
}

/// Page size settings used by [`Service::find_page`](crate::Service::find_page).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paginate {
    /// Page size when the query has no `$limit`
    pub default: Option<usize>,
    /// Upper bound applied to any `$limit`
    pub max: Option<usize>,
}

impl Paginate {
    /// The effective page size for a requested `$limit`.
    pub fn effective_limit(&self, requested: Option<usize>) -> Option<usize> {
        let limit = requested.or(self.default);
        match (limit, self.max) {
            (Some(limit), Some(max)) => Some(limit.min(max)),
            (None, Some(max)) => Some(max),
            (limit, None) => limit,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceConfig {
    /// Name of the identifier field
    pub id_field: String,
    /// Identifier assignment strategy
    pub id_strategy: IdStrategy,
    /// Pagination settings
    pub paginate: Option<Paginate>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            id_field: DEFAULT_ID_FIELD.to_string(),
            id_strategy: IdStrategy::default(),
            paginate: None,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn with_paginate(mut self, paginate: Paginate) -> Self {
        self.paginate = Some(paginate);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Recognized keys: `STASH_ID_FIELD`, `STASH_ID_STRATEGY`
    /// (`sequential` or `uuid`), `STASH_START_ID`, `STASH_PAGINATE_DEFAULT`,
    /// `STASH_PAGINATE_MAX`. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let id_field = lookup("STASH_ID_FIELD").unwrap_or_else(|| DEFAULT_ID_FIELD.to_string());
        if id_field.is_empty() {
            return Err(ConfigError::EmptyIdField);
        }

        let start = match lookup("STASH_START_ID") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("STASH_START_ID", raw))?,
            None => 0,
        };

        let id_strategy = match lookup("STASH_ID_STRATEGY").as_deref() {
            None | Some("sequential") => IdStrategy::Sequential { start },
            Some("uuid") => IdStrategy::Uuid,
            Some(other) => return Err(ConfigError::InvalidIdStrategy(other.to_string())),
        };

        let default = parse_size(&lookup, "STASH_PAGINATE_DEFAULT")?;
        let max = parse_size(&lookup, "STASH_PAGINATE_MAX")?;
        let paginate = (default.is_some() || max.is_some()).then_some(Paginate { default, max });

        Ok(Self {
            id_field,
            id_strategy,
            paginate,
        })
    }
}

fn parse_size<F>(lookup: &F, key: &'static str) -> Result<Option<usize>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.parse().map_err(|_| ConfigError::InvalidNumber(key, raw)))
        .transpose()
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STASH_ID_FIELD must not be empty")]
    EmptyIdField,

    #[error("Invalid STASH_ID_STRATEGY value '{0}': expected 'sequential' or 'uuid'")]
    InvalidIdStrategy(String),

    #[error("Invalid {0} value '{1}'")]
    InvalidNumber(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.id_field, "id");
        assert_eq!(config.id_strategy, IdStrategy::Sequential { start: 0 });
        assert!(config.paginate.is_none());
    }

    #[test]
    fn reads_all_keys() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("STASH_ID_FIELD", "_id"),
            ("STASH_ID_STRATEGY", "sequential"),
            ("STASH_START_ID", "100"),
            ("STASH_PAGINATE_DEFAULT", "10"),
            ("STASH_PAGINATE_MAX", "50"),
        ]))
        .unwrap();

        assert_eq!(config.id_field, "_id");
        assert_eq!(config.id_strategy, IdStrategy::Sequential { start: 100 });
        assert_eq!(
            config.paginate,
            Some(Paginate {
                default: Some(10),
                max: Some(50)
            })
        );
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            ServiceConfig::from_lookup(lookup(&[("STASH_ID_STRATEGY", "random")])),
            Err(ConfigError::InvalidIdStrategy("random".into()))
        );
        assert_eq!(
            ServiceConfig::from_lookup(lookup(&[("STASH_PAGINATE_MAX", "lots")])),
            Err(ConfigError::InvalidNumber("STASH_PAGINATE_MAX", "lots".into()))
        );
        assert_eq!(
            ServiceConfig::from_lookup(lookup(&[("STASH_ID_FIELD", "")])),
            Err(ConfigError::EmptyIdField)
        );
    }

    #[test]
    fn effective_limit() {
        let paginate = Paginate {
            default: Some(10),
            max: Some(25),
        };
        assert_eq!(paginate.effective_limit(None), Some(10));
        assert_eq!(paginate.effective_limit(Some(5)), Some(5));
        assert_eq!(paginate.effective_limit(Some(100)), Some(25));

        let unbounded = Paginate::default();
        assert_eq!(unbounded.effective_limit(None), None);
        assert_eq!(unbounded.effective_limit(Some(3)), Some(3));
    }

    #[test]
    fn deserialize_from_json() {
        let config: ServiceConfig = serde_json::from_str(
            r#"{"idField": "_id", "idStrategy": {"kind": "uuid"}, "paginate": {"default": 5, "max": null}}"#,
        )
        .unwrap();

        assert_eq!(config.id_field, "_id");
        assert_eq!(config.id_strategy, IdStrategy::Uuid);
        assert_eq!(config.paginate.unwrap().default, Some(5));
    }
}
