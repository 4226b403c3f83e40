//! CLI error types.

use crate::config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The script passed to `run` could not be read.
    #[error("cannot read script {path}: {source}")]
    Script {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration is invalid or unreadable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A `--profile` file is invalid or unreadable.
    #[error(transparent)]
    Profile(#[from] policy::Error),

    /// The effective profile could not be written out as TOML.
    #[error("cannot render profile: {0}")]
    Render(#[from] toml::ser::Error),

    /// The script failed. Rendered with its kind tag.
    #[error("{}", .0.render())]
    Eval(#[from] runtime::Error),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
