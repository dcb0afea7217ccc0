// src/error.rs

//! Error types shared by the pkgsmith library

use thiserror::Error;

/// Errors produced by the recipe maintenance core
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed input (versions, sources, recipe text, command output)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A targeted recipe section does not exist and no kind was declared
    #[error("Could not find section '{section}' in recipe")]
    SectionNotFound { section: String },

    /// A section was found but its terminator was not
    #[error("Could not find end of section '{0}'")]
    UnterminatedSection(String),

    /// The override configuration is inconsistent
    #[error("Invalid override: {0}")]
    InvalidOverride(String),

    /// File to rename does not exist in the working directory
    #[error("Cannot rename '{path}': file does not exist")]
    RenameSourceMissing { path: String },

    /// Path escapes the recipe working directory
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Regenerated VCS version is older than the stored one
    #[error("Stored VCS version {old} is newer than regenerated version {new}")]
    VersionRegression { old: String, new: String },

    /// Something expected on disk or in metadata is missing
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Required external tool is missing from PATH
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// External command ran but failed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// Invalid regular expression in an override
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid glob pattern in an override
    #[error("Glob pattern error: {0}")]
    Glob(#[from] glob::PatternError),

    /// Package config could not be read or written
    #[error("Package config error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Tool config could not be parsed
    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for pkgsmith operations
pub type Result<T> = std::result::Result<T, Error>;
