use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Unable to load toml: {path}")]
    TomlReadError { path: String },

    #[error("Unable to parse toml: {msg}")]
    TomlParseError { msg: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("{name} must be positive, got {value}")]
    NonPositiveParameter { name: &'static str, value: f64 },

    #[error("grid resolution {n} is not a positive multiple of the dispatch tile width {tile}")]
    ResolutionNotTileAligned { n: usize, tile: usize },
}
