use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
};

use anyhow::Context;

/// Server settings, read from the environment (and `.env` if present).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: NonZeroU32,
    pub broadcast_capacity: NonZeroUsize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Config> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            let raw = lookup(key).unwrap_or_else(|| default.to_owned());
            raw.trim().parse().with_context(|| format!("invalid {key}: {raw:?}"))
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL is not set")?,
            bind_addr: parse(&lookup, "BIND_ADDR", "0.0.0.0:8080")?,
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", "16")?,
            broadcast_capacity: parse(&lookup, "BROADCAST_CAPACITY", "64")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite://alumni.db")])).unwrap();
        assert_eq!(config.database_url, "sqlite://alumni.db");
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.db_max_connections.get(), 16);
        assert_eq!(config.broadcast_capacity.get(), 64);
    }

    #[test]
    fn overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("DB_MAX_CONNECTIONS", "4"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:3000".parse().unwrap());
        assert_eq!(config.db_max_connections.get(), 4);
    }

    #[test]
    fn missing_url_and_bad_numbers_are_errors() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("DB_MAX_CONNECTIONS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }

    #[rstest]
    #[case("BROADCAST_CAPACITY")]
    #[case("DB_MAX_CONNECTIONS")]
    fn zero_sizes_are_errors(#[case] key: &str) {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:"), (key, "0")])).unwrap_err();
        assert!(err.to_string().contains(key));
    }
}
