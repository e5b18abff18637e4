use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

#[derive(Parser, Debug)]
#[command(name = "casira-connect", about = "CASIRA Connect social and volunteering API")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Keep all data in memory (demo mode, nothing is persisted)
    #[arg(long)]
    pub in_memory: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
    pub in_memory: bool,
    pub seed_sample_data: bool,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for session tokens. Falls back to `CASIRA_JWT_SECRET`.
    pub jwt_secret: Option<String>,
    pub token_ttl_days: i64,
    pub issuer: String,
    pub bcrypt_cost: u32,
    pub min_password_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            in_memory: false,
            seed_sample_data: true,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            token_ttl_days: 7,
            issuer: "casira-connect".to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
            min_password_len: 6,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli)?;
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

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if cli.in_memory {
            config.database.in_memory = true;
        }

        if config.auth.jwt_secret.is_none() {
            config.auth.jwt_secret = std::env::var("CASIRA_JWT_SECRET")
                .ok()
                .filter(|s| !s.is_empty());
        }

        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&config.auth.bcrypt_cost) {
            anyhow::bail!(
                "auth.bcrypt_cost must be between {} and {}",
                MIN_BCRYPT_COST,
                MAX_BCRYPT_COST
            );
        }

        // Resolve paths relative to data dir
        if config.database.path.is_none() {
            config.database.path = Some(data_dir.join("casira.db"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> anyhow::Result<PathBuf> {
        match cli.data_dir.clone() {
            Some(dir) => Ok(dir),
            None => dirs::home_dir()
                .map(|home| home.join(".casira"))
                .ok_or_else(|| anyhow::anyhow!("Could not determine home directory")),
        }
    }

    pub fn db_path(&self) -> Option<&PathBuf> {
        self.database.path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_dir(dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            host: None,
            port: None,
            data_dir: Some(dir.to_path_buf()),
            in_memory: false,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.auth.issuer, "casira-connect");
        assert_eq!(config.auth.min_password_len, 6);
        assert!(config.database.path.is_none());
        assert!(config.database.seed_sample_data);
        assert!(!config.database.in_memory);
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli_with_dir(std::path::Path::new("/tmp/test-casira"));
        assert_eq!(
            Config::data_dir(&cli).unwrap(),
            PathBuf::from("/tmp/test-casira")
        );
    }

    #[test]
    fn data_dir_defaults_to_home_dot_casira() {
        let cli = Cli {
            config: None,
            host: None,
            port: None,
            data_dir: None,
            in_memory: false,
        };
        let dir = Config::data_dir(&cli).unwrap();
        assert!(dir.ends_with(".casira"));
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli_with_dir(tmp.path())).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.db_path(), Some(&tmp.path().join("casira.db")));
    }

    #[test]
    fn load_applies_cli_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let cli = Cli {
            host: Some("127.0.0.1".to_string()),
            port: Some(8080),
            in_memory: true,
            ..cli_with_dir(tmp.path())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.database.in_memory);
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

[database]
seed_sample_data = false

[auth]
jwt_secret = "file-secret"
token_ttl_days = 1
bcrypt_cost = 4
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_with_dir(tmp.path())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 9000);
        assert!(!config.database.seed_sample_data);
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("file-secret"));
        assert_eq!(config.auth.token_ttl_days, 1);
        assert_eq!(config.auth.bcrypt_cost, 4);
    }

    #[test]
    fn load_rejects_out_of_range_bcrypt_cost() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(&config_path, "[auth]\nbcrypt_cost = 2\n").unwrap();

        let cli = Cli {
            config: Some(config_path),
            ..cli_with_dir(tmp.path())
        };
        assert!(Config::load(&cli).is_err());
    }

    #[test]
    fn cli_overrides_beat_toml_values() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[server]
host = "192.168.1.1"
port = 9000
"#,
        )
        .unwrap();

        let cli = Cli {
            config: Some(config_path),
            host: Some("10.0.0.1".to_string()),
            port: Some(4000),
            ..cli_with_dir(tmp.path())
        };
        let config = Config::load(&cli).unwrap();
        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 4000);
    }
}
