//! Service configuration from the environment.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind: String,
    pub database_url: String,
    pub db_pool: u32,
    /// Demand-model artifact bundle directory.
    pub artifacts_dir: PathBuf,
    pub license_model_dir: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5001".to_string(),
            database_url: "sqlite://meditrust.db".to_string(),
            db_pool: 5,
            artifacts_dir: PathBuf::from("models"),
            license_model_dir: PathBuf::from("models/bert_license_classifier"),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind = lookup("MEDITRUST_BIND").unwrap_or(defaults.bind);

        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| {
            tracing::warn!(default = %defaults.database_url, "DATABASE_URL not set; using local dev database");
            defaults.database_url
        });

        let db_pool = match lookup("MEDITRUST_DB_POOL") {
            None => defaults.db_pool,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(value = %raw, default = defaults.db_pool, "invalid MEDITRUST_DB_POOL; using default");
                    defaults.db_pool
                }
            },
        };

        let artifacts_dir = lookup("MEDITRUST_ARTIFACTS")
            .map(PathBuf::from)
            .unwrap_or(defaults.artifacts_dir);
        let license_model_dir = lookup("MEDITRUST_LICENSE_MODEL")
            .map(PathBuf::from)
            .unwrap_or(defaults.license_model_dir);

        Self {
            bind,
            database_url,
            db_pool,
            artifacts_dir,
            license_model_dir,
        }
    }
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
    fn defaults_apply_when_unset() {
        assert_eq!(ServiceConfig::from_lookup(lookup(&[])), ServiceConfig::default());
    }

    #[test]
    fn overrides_are_read() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("MEDITRUST_BIND", "127.0.0.1:9000"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("MEDITRUST_DB_POOL", "2"),
            ("MEDITRUST_ARTIFACTS", "/srv/models"),
        ]));
        assert_eq!(cfg.bind, "127.0.0.1:9000");
        assert_eq!(cfg.database_url, "sqlite::memory:");
        assert_eq!(cfg.db_pool, 2);
        assert_eq!(cfg.artifacts_dir, PathBuf::from("/srv/models"));
        assert_eq!(cfg.license_model_dir, PathBuf::from("models/bert_license_classifier"));
    }

    #[test]
    fn bad_pool_size_falls_back() {
        for raw in ["0", "-3", "many"] {
            let cfg = ServiceConfig::from_lookup(lookup(&[("MEDITRUST_DB_POOL", raw)]));
            assert_eq!(cfg.db_pool, 5);
        }
    }
}
