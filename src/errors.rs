// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only conditions the *caller* must react to live here. Failures raised by
//! watch functions, listeners and queued tasks are contained by the digest
//! loop and reported through [`crate::scope::Fault`] instead.

use thiserror::Error;

use crate::types::Phase;

#[derive(Error, Debug)]
pub enum ScopeError {
    /// The digest was still dirty (or had queued async work) when its
    /// iteration budget ran out.
    #[error("{ttl} digest iterations reached")]
    DigestTtlExceeded { ttl: usize },

    /// A phase was entered while another one was active on the same tree.
    #[error("{0} already in progress")]
    PhaseInProgress(Phase),

    /// The expression passed to `try_apply` failed.
    #[error("expression failed: {0}")]
    Expression(anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScopeError>;
