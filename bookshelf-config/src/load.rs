use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Directory, relative to the working directory, holding the configuration files.
const CONFIGURATION_DIR: &str = "configuration";

/// Stem of the file every environment loads first.
const BASE_FILE_STEM: &str = "base";

/// File extensions tried, in order, for each configuration file.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of environment variables overriding file values, e.g. `APP_AUTH__TOKEN_TTL_SECS`.
const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_SEPARATOR: &str = "__";
const LIST_SEPARATOR: &str = ",";

/// Implemented by top level configuration structs.
pub trait Config {
    /// Keys whose environment variable values are comma separated lists.
    const LIST_PARSE_KEYS: &'static [&'static str] = &[];
}

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("configuration directory `{0}` does not exist")]
    MissingDirectory(PathBuf),

    #[error("no `{stem}` configuration file in `{directory}` (tried extensions: {extensions})")]
    MissingFile {
        stem: String,
        directory: PathBuf,
        extensions: String,
    },

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[source] io::Error),

    #[error("failed to build configuration from `{directory}`: {source}")]
    Build {
        directory: PathBuf,
        #[source]
        source: config::ConfigError,
    },

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] config::ConfigError),
}

/// Loads `T` from `./configuration` using the environment selected by `APP_ENVIRONMENT`.
///
/// Sources are applied in order, later ones overriding earlier ones:
/// `base.{yaml,yml,json}`, `{environment}.{yaml,yml,json}`, then `APP_`-prefixed
/// environment variables with `__` separating nested keys.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let directory = std::env::current_dir()
        .map_err(LoadConfigError::CurrentDir)?
        .join(CONFIGURATION_DIR);
    let environment = Environment::load().map_err(LoadConfigError::Environment)?;

    load_config_from(&directory, environment)
}

/// Loads `T` from an explicit configuration directory and environment.
pub fn load_config_from<T>(directory: &Path, environment: Environment) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::MissingDirectory(directory.to_path_buf()));
    }

    let base_file = find_file(directory, BASE_FILE_STEM)?;
    let environment_file = find_file(directory, environment.as_str())?;

    let mut env_source = config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true);

    if !T::LIST_PARSE_KEYS.is_empty() {
        env_source = env_source.list_separator(LIST_SEPARATOR);
        for key in T::LIST_PARSE_KEYS {
            env_source = env_source.with_list_parse_key(key);
        }
    }

    let settings = config::Config::builder()
        .add_source(config::File::from(base_file))
        .add_source(config::File::from(environment_file))
        .add_source(env_source)
        .build()
        .map_err(|source| LoadConfigError::Build {
            directory: directory.to_path_buf(),
            source,
        })?;

    settings
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn find_file(directory: &Path, stem: &str) -> Result<PathBuf, LoadConfigError> {
    CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{stem}.{extension}")))
        .find(|path| path.is_file())
        .ok_or_else(|| LoadConfigError::MissingFile {
            stem: stem.to_string(),
            directory: directory.to_path_buf(),
            extensions: CONFIG_FILE_EXTENSIONS.join(", "),
        })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct ServiceConfig {
        host: String,
        port: u16,
    }

    impl Config for ServiceConfig {}

    fn scratch_directory(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let directory = std::env::temp_dir().join(format!("bookshelf-config-{name}-{nanos}"));
        fs::create_dir_all(&directory).unwrap();
        directory
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let directory = scratch_directory("override");
        fs::write(directory.join("base.yaml"), "host: 127.0.0.1\nport: 8000\n").unwrap();
        fs::write(directory.join("prod.json"), r#"{"port": 9000}"#).unwrap();

        let config: ServiceConfig = load_config_from(&directory, Environment::Prod).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn missing_environment_file_is_reported() {
        let directory = scratch_directory("missing");
        fs::write(directory.join("base.yml"), "host: localhost\nport: 8000\n").unwrap();

        let err = load_config_from::<ServiceConfig>(&directory, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingFile { ref stem, .. } if stem == "dev"));

        fs::remove_dir_all(directory).unwrap();
    }

    #[test]
    fn missing_directory_is_reported() {
        let directory = std::env::temp_dir().join("bookshelf-config-does-not-exist");

        let err = load_config_from::<ServiceConfig>(&directory, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::MissingDirectory(_)));
    }
}
