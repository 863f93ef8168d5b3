use anyhow::{anyhow, Context};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            _ => Err(format!("Unknown store backend: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreBackend,
    /// Header carrying the authenticated user id, set by the upstream gateway.
    pub actor_header: String,
    pub root_company_name: String,
    pub bootstrap_owner: Option<BootstrapOwner>,
}

/// First owner account, created only when the store has no users yet.
#[derive(Clone)]
pub struct BootstrapOwner {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

impl std::fmt::Debug for BootstrapOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapOwner")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = match lookup("HELPDESK_STORE") {
            Some(value) => value.parse::<StoreBackend>().map_err(|e| anyhow!(e))?,
            None => StoreBackend::Postgres,
        };

        let url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());
        if store == StoreBackend::Postgres && url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set for the postgres store"));
        }

        let port = match lookup("SERVER_PORT") {
            Some(value) => value
                .parse::<u16>()
                .with_context(|| format!("Invalid SERVER_PORT: {value}"))?,
            None => 8080,
        };

        let pool_size = match lookup("DB_POOL_SIZE") {
            Some(value) => value
                .parse::<u32>()
                .with_context(|| format!("Invalid DB_POOL_SIZE: {value}"))?,
            None => 10,
        };

        let bootstrap_owner = match (
            lookup("HELPDESK_OWNER_EMAIL").filter(|v| !v.trim().is_empty()),
            lookup("HELPDESK_OWNER_PASSWORD").filter(|v| !v.is_empty()),
        ) {
            (Some(email), Some(password)) => Some(BootstrapOwner {
                email,
                password,
                full_name: lookup("HELPDESK_OWNER_NAME").unwrap_or_else(|| "Owner".to_string()),
            }),
            (None, None) => None,
            _ => {
                return Err(anyhow!(
                    "HELPDESK_OWNER_EMAIL and HELPDESK_OWNER_PASSWORD must be set together"
                ))
            }
        };

        Ok(AppConfig {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port,
            },
            database: DatabaseConfig { url, pool_size },
            store,
            actor_header: lookup("HELPDESK_ACTOR_HEADER")
                .map(|h| h.trim().to_lowercase())
                .unwrap_or_else(|| "x-helpdesk-user".to_string()),
            root_company_name: lookup("HELPDESK_ROOT_COMPANY")
                .unwrap_or_else(|| "Helpdesk".to_string()),
            bootstrap_owner,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_database_url() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://h/db")])).unwrap();
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.pool_size, 10);
        assert_eq!(config.actor_header, "x-helpdesk-user");
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn test_postgres_requires_database_url() {
        assert!(AppConfig::from_lookup(lookup_from(&[])).is_err());
    }

    #[test]
    fn test_memory_store_needs_no_database() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("HELPDESK_STORE", "memory"),
            ("SERVER_PORT", "9090"),
            ("HELPDESK_ACTOR_HEADER", "X-User-Id"),
        ]))
        .unwrap();
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.actor_header, "x-user-id");
    }

    #[test]
    fn test_bootstrap_owner_needs_email_and_password() {
        let partial = AppConfig::from_lookup(lookup_from(&[
            ("HELPDESK_STORE", "memory"),
            ("HELPDESK_OWNER_EMAIL", "owner@hq.test"),
        ]));
        assert!(partial.is_err());

        let config = AppConfig::from_lookup(lookup_from(&[
            ("HELPDESK_STORE", "memory"),
            ("HELPDESK_OWNER_EMAIL", "owner@hq.test"),
            ("HELPDESK_OWNER_PASSWORD", "change-me-now"),
        ]))
        .unwrap();
        let owner = config.bootstrap_owner.unwrap();
        assert_eq!(owner.email, "owner@hq.test");
        assert_eq!(owner.full_name, "Owner");
        assert!(!format!("{owner:?}").contains("change-me-now"));
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[
            ("HELPDESK_STORE", "memory"),
            ("SERVER_PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }
}
