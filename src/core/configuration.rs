use crate::core::error_mediator::MediatorError;
use std::time::Duration;

/// How long a cached response stays valid: 10 minutes.
pub const DEFAULT_CACHE_TTL_MILLIS: i64 = 600_000;

#[derive(Clone, Debug, PartialEq)]
pub struct MediatorConfigurationDto {
    pub cache_ttl: Duration,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MediatorConfiguration {
    cache_ttl: chrono::Duration,
}

impl MediatorConfiguration {
    pub fn new(dto: MediatorConfigurationDto) -> Result<Self, MediatorError> {
        if dto.cache_ttl.is_zero() {
            return Err(MediatorError::InvalidConfiguration(
                "cache_ttl must be > 0".to_string(),
            ));
        }
        let cache_ttl = chrono::Duration::from_std(dto.cache_ttl)
            .map_err(|err| MediatorError::InvalidConfiguration(format!("cache_ttl: {err}")))?;

        Ok(Self { cache_ttl })
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        self.cache_ttl
    }
}

impl Default for MediatorConfiguration {
    fn default() -> Self {
        Self {
            cache_ttl: chrono::Duration::milliseconds(DEFAULT_CACHE_TTL_MILLIS),
        }
    }
}
