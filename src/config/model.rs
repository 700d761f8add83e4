// src/config/model.rs

use serde::Deserialize;

use crate::types::LogLevel;

/// Default iteration budget for a digest.
pub const DEFAULT_TTL: usize = 10;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [digest]
/// ttl = 10
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Digest loop behaviour from `[digest]`.
    #[serde(default)]
    pub digest: DigestConfig,

    /// Logging behaviour from `[logging]`.
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration. Build one with `ConfigFile::try_from(raw)` or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    pub digest: DigestConfig,
    pub logging: LoggingSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(digest: DigestConfig, logging: LoggingSection) -> Self {
        Self { digest, logging }
    }
}

/// `[digest]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DigestConfig {
    /// How many dirty sweeps a single digest may perform before it gives up
    /// with [`crate::errors::ScopeError::DigestTtlExceeded`].
    #[serde(default = "default_ttl")]
    pub ttl: usize,
}

fn default_ttl() -> usize {
    DEFAULT_TTL
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct LoggingSection {
    /// If `None`, `SCOPEWATCH_LOG` or `info` is used.
    #[serde(default)]
    pub level: Option<LogLevel>,
}
