// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ScopeError};

/// Upper bound on the iteration budget.
const MAX_TTL: usize = 1_000;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScopeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.digest, raw.logging))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_digest(cfg)?;
    Ok(())
}

fn validate_digest(cfg: &RawConfigFile) -> Result<()> {
    if cfg.digest.ttl == 0 {
        return Err(ScopeError::ConfigError(
            "[digest].ttl must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.digest.ttl > MAX_TTL {
        return Err(ScopeError::ConfigError(format!(
            "[digest].ttl must be <= {MAX_TTL} (got {})",
            cfg.digest.ttl
        )));
    }

    Ok(())
}
