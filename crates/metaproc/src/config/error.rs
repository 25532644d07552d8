use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration loading failed: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("missing config file: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
