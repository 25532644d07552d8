use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use tracing::info;

use super::{Config, ConfigError, Environment, defaults};

pub const ENV_PREFIX: &str = "METAPROC_";

/// Builds the configuration with layered sources, lowest priority first:
/// the environment preset, the TOML file at `path`, then `METAPROC_*`
/// variables. The result is validated before it is returned.
pub fn load(environment: Environment, path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(defaults::config_for(environment)));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::MissingConfig(path.display().to_string()));
        }
        info!(path = %path.display(), "loading config file");
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed(ENV_PREFIX));

    let config: Config = figment.extract().map_err(Box::new)?;
    if config.environment != environment {
        return Err(ConfigError::Invalid(format!(
            "config environment '{}' does not match selected '{}'",
            config.environment, environment
        )));
    }
    config.validate()?;

    info!(%environment, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn preset_without_file() {
        let config = load(Environment::Development, None).unwrap();
        assert_eq!(config, defaults::config_for(Environment::Development));
    }

    #[test]
    fn file_overrides_preset() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
processing_workers = 6
ipfs_gateways = ["https://gw.example"]
grid_size = 50.0
"#
        )
        .unwrap();

        let config = load(Environment::Staging, Some(file.path())).unwrap();
        assert_eq!(config.processing_workers, 6);
        assert_eq!(config.ipfs_gateways, vec!["https://gw.example".to_string()]);
        assert_eq!(config.grid_size, 50.0);
        assert_eq!(config.download_retries, defaults::config_for(Environment::Staging).download_retries);
    }

    #[test]
    fn invalid_file_value_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "processing_workers = 0").unwrap();
        let err = load(Environment::Staging, Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn mismatched_environment_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, r#"environment = "production""#).unwrap();
        assert!(load(Environment::Staging, Some(file.path())).is_err());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load(Environment::Staging, Some(Path::new("/nonexistent/metaproc.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig(_)));
    }
}
