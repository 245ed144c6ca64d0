use serde::Deserialize;

fn default_worker_count() -> usize {
    4
}

fn default_poll_interval_seconds() -> u64 {
    2
}

fn default_db_deadline_seconds() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

/// Environment-driven configuration (prefix `NOVA_`), CLI overrides layered
/// on top by the binary.
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Overall deadline for a single store operation; exceeding it surfaces
    /// a transient error the scheduler retries.
    #[serde(default = "default_db_deadline_seconds")]
    pub db_deadline_seconds: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        Ok(envy::prefixed("NOVA_").from_env::<Config>()?)
    }

    pub fn with_database_url(database_url: String) -> Config {
        Config {
            database_url,
            worker_count: default_worker_count(),
            poll_interval_seconds: default_poll_interval_seconds(),
            db_deadline_seconds: default_db_deadline_seconds(),
            max_retries: default_max_retries(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_the_optional_fields() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "database_url": "postgres://localhost/nova"
        }))
        .unwrap();

        assert_eq!(config.worker_count, 4);
        assert_eq!(config.poll_interval_seconds, 2);
        assert_eq!(config.db_deadline_seconds, 10);
        assert_eq!(config.max_retries, 3);
    }
}
