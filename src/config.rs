use crate::db::schema::validate_keyspace_name;
use crate::generator::GeneratorConfig;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

/// CQL native protocol port used when a contact point has none.
pub const DEFAULT_CQL_PORT: u16 = 9042;

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster_ips: Vec<String>,
    pub keyspace: String,
    pub replication_factor: u32,
    pub store: StoreBackend,
    pub log_dir: PathBuf,
    pub batch_size: usize,
    pub history_limit: usize,
    pub accounts: usize,
    pub positions: usize,
    pub trades: usize,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Cluster,
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let cluster_ips: Vec<String> = env_map
            .get("CASSANDRA_CLUSTER_IPS")
            .map(|s| s.as_str())
            .unwrap_or("localhost")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if cluster_ips.is_empty() {
            return Err(ConfigError::InvalidValue(
                "CASSANDRA_CLUSTER_IPS".to_string(),
                "must name at least one contact point".to_string(),
            ));
        }

        let keyspace = env_map
            .get("CASSANDRA_KEYSPACE")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "investments".to_string());
        validate_keyspace_name(&keyspace)
            .map_err(|reason| ConfigError::InvalidValue("CASSANDRA_KEYSPACE".to_string(), reason))?;

        let replication_factor = env_map
            .get("CASSANDRA_REPLICATION_FACTOR")
            .map(|s| s.as_str())
            .unwrap_or("1")
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|rf| *rf >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CASSANDRA_REPLICATION_FACTOR".to_string(),
                    "must be an integer of at least 1".to_string(),
                )
            })?;

        let store = match env_map
            .get("INVESTMENTS_STORE")
            .map(|s| s.as_str())
            .unwrap_or("cluster")
        {
            "cluster" => StoreBackend::Cluster,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::InvalidValue(
                    "INVESTMENTS_STORE".to_string(),
                    format!("must be cluster or memory, got {}", other),
                ))
            }
        };

        let log_dir = PathBuf::from(
            env_map
                .get("INVESTMENTS_LOG_DIR")
                .map(|s| s.as_str())
                .unwrap_or("."),
        );

        let batch_size = parse_count(&env_map, "INVESTMENTS_BATCH_SIZE", 10, 1)?;
        let history_limit = parse_count(&env_map, "INVESTMENTS_HISTORY_LIMIT", 10, 1)?;
        let accounts = parse_count(&env_map, "INVESTMENTS_ACCOUNTS", 10, 0)?;
        let positions = parse_count(&env_map, "INVESTMENTS_POSITIONS", 100, 0)?;
        let trades = parse_count(&env_map, "INVESTMENTS_TRADES", 1000, 0)?;

        let seed = match env_map.get("INVESTMENTS_SEED") {
            Some(s) => Some(s.trim().parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "INVESTMENTS_SEED".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?),
            None => None,
        };

        Ok(Config {
            cluster_ips,
            keyspace,
            replication_factor,
            store,
            log_dir,
            batch_size,
            history_limit,
            accounts,
            positions,
            trades,
            seed,
        })
    }

    /// Contact points with the default CQL port filled in.
    pub fn cluster_nodes(&self) -> Vec<String> {
        self.cluster_ips.iter().map(|ip| with_port(ip)).collect()
    }

    pub fn generator_config(&self) -> GeneratorConfig {
        GeneratorConfig {
            accounts: self.accounts,
            positions: self.positions,
            trades: self.trades,
            seed: self.seed,
            ..GeneratorConfig::default()
        }
    }
}

fn with_port(node: &str) -> String {
    match node.matches(':').count() {
        0 => format!("{}:{}", node, DEFAULT_CQL_PORT),
        1 => node.to_string(),
        // IPv6: bracketed with a port, bracketed without, or bare.
        _ if node.contains("]:") => node.to_string(),
        _ if node.starts_with('[') => format!("{}:{}", node, DEFAULT_CQL_PORT),
        _ => format!("[{}]:{}", node, DEFAULT_CQL_PORT),
    }
}

fn parse_count(
    env_map: &HashMap<String, String>,
    key: &str,
    default: usize,
    min: usize,
) -> Result<usize, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(s) => s
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= min)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    key.to_string(),
                    format!("must be an integer of at least {}", min),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config.cluster_ips, vec!["localhost"]);
        assert_eq!(config.cluster_nodes(), vec!["localhost:9042"]);
        assert_eq!(config.keyspace, "investments");
        assert_eq!(config.replication_factor, 1);
        assert_eq!(config.store, StoreBackend::Cluster);
        assert_eq!(config.log_dir, PathBuf::from("."));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.generator_config(), GeneratorConfig::default());
    }

    #[test]
    fn test_cluster_ips_split_and_ports() {
        let config = Config::from_env_map(env(&[(
            "CASSANDRA_CLUSTER_IPS",
            "10.0.0.1, 10.0.0.2:19042,,[::1]:9043,::1,[fe80::2]",
        )]))
        .unwrap();
        assert_eq!(
            config.cluster_nodes(),
            vec![
                "10.0.0.1:9042",
                "10.0.0.2:19042",
                "[::1]:9043",
                "[::1]:9042",
                "[fe80::2]:9042"
            ]
        );
    }

    #[test]
    fn test_empty_cluster_ips() {
        let result = Config::from_env_map(env(&[("CASSANDRA_CLUSTER_IPS", " , ")]));
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CASSANDRA_CLUSTER_IPS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_keyspace() {
        let result = Config::from_env_map(env(&[("CASSANDRA_KEYSPACE", "bad-name")]));
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CASSANDRA_KEYSPACE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_replication_factor() {
        for bad in ["0", "-1", "three"] {
            let result = Config::from_env_map(env(&[("CASSANDRA_REPLICATION_FACTOR", bad)]));
            match result {
                Err(ConfigError::InvalidValue(k, _)) => {
                    assert_eq!(k, "CASSANDRA_REPLICATION_FACTOR")
                }
                _ => panic!("Expected InvalidValue error for {}", bad),
            }
        }
    }

    #[test]
    fn test_invalid_store() {
        let result = Config::from_env_map(env(&[("INVESTMENTS_STORE", "sqlite")]));
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "INVESTMENTS_STORE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = Config::from_env_map(env(&[("INVESTMENTS_BATCH_SIZE", "0")]));
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "INVESTMENTS_BATCH_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_generator_overrides() {
        let config = Config::from_env_map(env(&[
            ("INVESTMENTS_STORE", "memory"),
            ("INVESTMENTS_ACCOUNTS", "3"),
            ("INVESTMENTS_POSITIONS", "0"),
            ("INVESTMENTS_TRADES", "25"),
            ("INVESTMENTS_SEED", "7"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        let generator = config.generator_config();
        assert_eq!(generator.accounts, 3);
        assert_eq!(generator.positions, 0);
        assert_eq!(generator.trades, 25);
        assert_eq!(generator.seed, Some(7));
    }

    #[test]
    fn test_invalid_seed() {
        let result = Config::from_env_map(env(&[("INVESTMENTS_SEED", "abc")]));
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "INVESTMENTS_SEED"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
