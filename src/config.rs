use clap::{Parser, Subcommand};
use rand::Rng;
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_DB_FILE: &str = "portal.db";

#[derive(Parser, Debug)]
#[command(
    name = "placement-portal",
    about = "Placement experience sharing portal backend"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long, env = "PORT")]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Path to the SQLite database file
    #[arg(long, env = "DATABASE_PATH")]
    pub database: Option<PathBuf>,

    /// Allowed CORS origins, comma separated, or "*"
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Secret used to sign bearer tokens
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,

    /// Create an admin account, or promote an existing account to admin
    CreateAdmin {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        #[arg(long, default_value = "Admin")]
        name: String,

        /// Password for a newly created account
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_days: i64,
    pub bcrypt_cost: u32,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: String,
}

/// Parsed form of the CORS allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigins {
    Any,
    List(Vec<String>),
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_days: 30,
            bcrypt_cost: 10,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI / env overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref path) = cli.database {
            config.database.path = Some(path.clone());
        }
        if let Some(ref origins) = cli.cors_origin {
            config.cors.allowed_origins = origins.clone();
        }
        if let Some(ref secret) = cli.jwt_secret {
            config.auth.jwt_secret = secret.clone();
        }

        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join(DEFAULT_DB_FILE));
        }

        if config.auth.jwt_secret.trim().is_empty() {
            tracing::warn!(
                "No JWT secret configured; generated a random one. Tokens will not survive a restart"
            );
            config.auth.jwt_secret = random_secret();
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".placement-portal")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
    }

    pub fn cors_origins(&self) -> CorsOrigins {
        let raw = self.cors.allowed_origins.trim();
        if raw == "*" || raw.is_empty() {
            return CorsOrigins::Any;
        }
        let origins = raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
        CorsOrigins::List(origins)
    }
}

fn random_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_data_dir(dir: Option<PathBuf>) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: dir,
            database: None,
            cors_origin: None,
            jwt_secret: None,
            command: None,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.auth.token_days, 30);
        assert_eq!(config.auth.bcrypt_cost, 10);
        assert_eq!(config.cors.allowed_origins, "*");
        assert!(config.database.path.is_none());
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with_data_dir(Some(PathBuf::from("/tmp/test-portal")));
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-portal"));
    }

    #[test]
    fn data_dir_defaults_to_dot_placement_portal() {
        let cli = cli_with_data_dir(None);
        let dir = Config::data_dir(&cli);
        assert!(dir.ends_with(".placement-portal"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = cli_with_data_dir(Some(tmp.path().to_path_buf()));
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.db_path(), tmp.path().join("portal.db"));
        // A random secret is generated when none is configured
        assert_eq!(config.auth.jwt_secret.len(), 64);
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli_with_data_dir(Some(tmp.path().to_path_buf()));
        cli.host = Some("127.0.0.1".to_string());
        cli.port = Some(8080);
        cli.database = Some(tmp.path().join("other.db"));
        cli.cors_origin = Some("http://localhost:5173".to_string());
        cli.jwt_secret = Some("s3cret".to_string());

        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.db_path(), tmp.path().join("other.db"));
        assert_eq!(config.auth.jwt_secret, "s3cret");
        assert_eq!(
            config.cors_origins(),
            CorsOrigins::List(vec!["http://localhost:5173".to_string()])
        );
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000

[auth]
jwt_secret = "from-file"
token_days = 7

[cors]
allowed_origins = "https://a.example, https://b.example"
"#,
        )
        .unwrap();

        let mut cli = cli_with_data_dir(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.jwt_secret, "from-file");
        assert_eq!(config.auth.token_days, 7);
        assert_eq!(
            config.cors_origins(),
            CorsOrigins::List(vec![
                "https://a.example".to_string(),
                "https://b.example".to_string()
            ])
        );
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
port = 9000

[auth]
jwt_secret = "from-file"
"#,
        )
        .unwrap();

        let mut cli = cli_with_data_dir(Some(tmp.path().to_path_buf()));
        cli.config = Some(config_path);
        cli.port = Some(4000);
        cli.jwt_secret = Some("from-env".to_string());
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.auth.jwt_secret, "from-env");
    }

    #[test]
    fn wildcard_cors_means_any_origin() {
        let mut config = Config::default();
        assert_eq!(config.cors_origins(), CorsOrigins::Any);
        config.cors.allowed_origins = " * ".to_string();
        assert_eq!(config.cors_origins(), CorsOrigins::Any);
    }
}
