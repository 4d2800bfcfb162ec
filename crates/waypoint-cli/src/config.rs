//! Configuration file management for waypoint.
//!
//! Provides a TOML-based config file at `~/.config/waypoint/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use waypoint_db::config::DbConfig;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub user: UserSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSection {
    /// Owner of every goal created through this config.
    pub id: Uuid,
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the waypoint config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/waypoint` or `~/.config/waypoint`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("waypoint");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("waypoint")
}

/// Return the path to the waypoint config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct WaypointConfig {
    pub db_config: DbConfig,
    /// `None` when no source provided one. Only goal-owning commands need it.
    pub user_id: Option<Uuid>,
}

impl WaypointConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `WAYPOINT_DATABASE_URL` env > `config_file.database.url` > `DbConfig::DEFAULT_URL`
    /// - User id: `cli_user_id` > `WAYPOINT_USER_ID` env > `config_file.user.id` > none
    pub fn resolve(cli_db_url: Option<&str>, cli_user_id: Option<Uuid>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var("WAYPOINT_DATABASE_URL") {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };
        let mut db_config = DbConfig::from_env();
        db_config.database_url = db_url;

        let user_id = if let Some(id) = cli_user_id {
            Some(id)
        } else if let Ok(raw) = std::env::var("WAYPOINT_USER_ID") {
            let id = Uuid::parse_str(raw.trim())
                .context("WAYPOINT_USER_ID env var is not a valid UUID")?;
            Some(id)
        } else {
            file_config.as_ref().map(|cfg| cfg.user.id)
        };

        Ok(Self {
            db_config,
            user_id,
        })
    }

    /// The resolved user id, or an error telling the operator how to set one.
    pub fn require_user(&self) -> Result<Uuid> {
        match self.user_id {
            Some(id) => Ok(id),
            None => bail!(
                "user id not found; pass --user-id, set WAYPOINT_USER_ID or run `waypoint init`"
            ),
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point the config lookup at an empty temp dir for the guard's lifetime.
    struct IsolatedConfig {
        _tmp: tempfile::TempDir,
        orig_xdg: Option<String>,
    }

    impl IsolatedConfig {
        fn new() -> Self {
            let tmp = tempfile::TempDir::new().unwrap();
            let orig_xdg = std::env::var("XDG_CONFIG_HOME").ok();
            unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
            unsafe { std::env::remove_var("WAYPOINT_DATABASE_URL") };
            unsafe { std::env::remove_var("WAYPOINT_USER_ID") };
            Self {
                _tmp: tmp,
                orig_xdg,
            }
        }
    }

    impl Drop for IsolatedConfig {
        fn drop(&mut self) {
            match self.orig_xdg.take() {
                Some(x) => unsafe { std::env::set_var("XDG_CONFIG_HOME", x) },
                None => unsafe { std::env::remove_var("XDG_CONFIG_HOME") },
            }
            unsafe { std::env::remove_var("WAYPOINT_DATABASE_URL") };
            unsafe { std::env::remove_var("WAYPOINT_USER_ID") };
        }
    }

    fn sample_config(user: Uuid) -> ConfigFile {
        ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            user: UserSection { id: user },
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();
        let user = Uuid::new_v4();

        save_config(&sample_config(user)).unwrap();
        let loaded = load_config().unwrap();

        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
        assert_eq!(loaded.user.id, user);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let _iso = IsolatedConfig::new();

        save_config(&sample_config(Uuid::new_v4())).unwrap();

        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn resolve_with_cli_flags_overrides_all() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();
        save_config(&sample_config(Uuid::new_v4())).unwrap();
        unsafe { std::env::set_var("WAYPOINT_DATABASE_URL", "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var("WAYPOINT_USER_ID", Uuid::new_v4().to_string()) };

        let cli_user = Uuid::new_v4();
        let config =
            WaypointConfig::resolve(Some("postgresql://cli:5432/clidb"), Some(cli_user)).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(config.user_id, Some(cli_user));
    }

    #[test]
    fn resolve_with_env_vars_overrides_config_file() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();
        save_config(&sample_config(Uuid::new_v4())).unwrap();
        let env_user = Uuid::new_v4();
        unsafe { std::env::set_var("WAYPOINT_DATABASE_URL", "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var("WAYPOINT_USER_ID", env_user.to_string()) };

        let config = WaypointConfig::resolve(None, None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.user_id, Some(env_user));
    }

    #[test]
    fn resolve_falls_back_to_config_file() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();
        let file_user = Uuid::new_v4();
        save_config(&sample_config(file_user)).unwrap();

        let config = WaypointConfig::resolve(None, None).unwrap();
        assert_eq!(
            config.db_config.database_url,
            "postgresql://filehost:5432/filedb"
        );
        assert_eq!(config.require_user().unwrap(), file_user);
    }

    #[test]
    fn resolve_defaults_db_url_and_requires_user() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();

        let config = WaypointConfig::resolve(None, None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert!(config.user_id.is_none());

        let msg = config.require_user().unwrap_err().to_string();
        assert!(msg.contains("user id not found"), "unexpected error: {msg}");
    }

    #[test]
    fn resolve_rejects_malformed_env_user() {
        let _lock = lock_env();
        let _iso = IsolatedConfig::new();
        unsafe { std::env::set_var("WAYPOINT_USER_ID", "not-a-uuid") };

        let err = WaypointConfig::resolve(None, None).unwrap_err();
        assert!(err.to_string().contains("WAYPOINT_USER_ID"));
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("waypoint/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
