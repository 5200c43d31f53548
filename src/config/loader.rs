// config/loader.rs - layered TOML loading
//
// `<dir>/default.toml` is read first and `<dir>/<env>.toml` is merged over it,
// table by table. In test mode (`APP_MODE=test`) the env file is
// `<env>_test.toml`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_CONFIG_FILE_NAME: &str = "default";
pub const CONFIG_EXTENSION: &str = "toml";
pub const WORKDIR_ENV: &str = "WORKDIR";
pub const APP_MODE_ENV: &str = "APP_MODE";
pub const APP_MODE_TEST: &str = "test";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] toml::de::Error),
}

/// Where and how configuration files are looked up.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub config_dir: PathBuf,
    pub default_file_name: String,
    pub test_mode: bool,
}

impl LoaderOptions {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            default_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            test_mode: false,
        }
    }

    /// `$WORKDIR/config` when `WORKDIR` is set (containers), else `./config`.
    pub fn from_env() -> Self {
        let config_dir = match env::var(WORKDIR_ENV) {
            Ok(workdir) if !workdir.is_empty() => Path::new(&workdir).join(DEFAULT_CONFIG_DIR),
            _ => PathBuf::from(DEFAULT_CONFIG_DIR),
        };

        let mut opts = Self::new(config_dir);
        opts.test_mode = env::var(APP_MODE_ENV).as_deref() == Ok(APP_MODE_TEST);
        opts
    }

    pub fn test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }
}

pub struct ConfigLoader {
    opts: LoaderOptions,
}

impl ConfigLoader {
    pub fn new(opts: LoaderOptions) -> Self {
        Self { opts }
    }

    pub fn from_env() -> Self {
        Self::new(LoaderOptions::from_env())
    }

    /// Load the default file, merge the environment file over it and
    /// deserialize the result.
    pub fn load<T: DeserializeOwned>(&self, env_name: &str) -> Result<T, ConfigError> {
        let mut table = self.read_table(&self.opts.default_file_name)?;

        let env_file = if self.opts.test_mode {
            format!("{}_test", env_name)
        } else {
            env_name.to_string()
        };
        let overlay = self.read_table(&env_file)?;
        merge_tables(&mut table, overlay);

        Ok(toml::Value::Table(table).try_into()?)
    }

    fn read_table(&self, name: &str) -> Result<toml::Table, ConfigError> {
        let path = self
            .opts
            .config_dir
            .join(format!("{}.{}", name, CONFIG_EXTENSION));

        if name == self.opts.default_file_name {
            info!(path = %path.display(), "loading default config file");
        } else {
            info!(path = %path.display(), "loading config file");
        }

        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        contents
            .parse::<toml::Table>()
            .map_err(|source| ConfigError::Parse { path, source })
    }
}

/// Deep merge: nested tables are merged key by key, any other value in
/// `overlay` replaces the one in `base`.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
