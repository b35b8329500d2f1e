//! Fixed run parameters.
//!
//! The binary never reads these from the command line, the environment or a
//! file. [`StressConfig`] exists so the library can be driven with smaller
//! blocks and no delay from tests and benchmarks.

use crate::error::StressError;
use std::time::Duration;

/// Upper bound on the number of blocks held at once.
pub const MAX_BLOCKS: usize = 37;

/// Size of each block in mebibytes.
pub const BLOCK_MIB: usize = 25;

/// Pause after every allocation and every release.
pub const STEP_DELAY: Duration = Duration::from_secs(1);

/// Bytes per mebibyte.
pub const MIB: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StressConfig {
    pub max_blocks: usize,
    pub block_mib: usize,
    pub delay: Duration,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            max_blocks: MAX_BLOCKS,
            block_mib: BLOCK_MIB,
            delay: STEP_DELAY,
        }
    }
}

impl StressConfig {
    /// Checks that blocks are non-empty and that the largest reported total
    /// fits in a `usize`.
    pub fn validate(&self) -> Result<(), StressError> {
        if self.block_mib == 0 {
            return Err(StressError::InvalidConfig(
                "block size must be at least 1 MiB".to_string(),
            ));
        }
        self.block_mib.checked_mul(MIB).ok_or_else(|| {
            StressError::InvalidConfig(format!("{} MiB blocks overflow usize", self.block_mib))
        })?;
        self.block_mib.checked_mul(self.max_blocks).ok_or_else(|| {
            StressError::InvalidConfig(format!(
                "{} blocks of {} MiB overflow usize",
                self.max_blocks, self.block_mib
            ))
        })?;
        Ok(())
    }

    /// Size of one block in bytes. Only meaningful after [`validate`](Self::validate).
    pub fn block_bytes(&self) -> usize {
        self.block_mib.saturating_mul(MIB)
    }

    /// Cumulative megabytes represented by `count` blocks.
    pub fn megabytes(&self, count: usize) -> usize {
        self.block_mib.saturating_mul(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = StressConfig::default();
        assert_eq!(config.max_blocks, 37);
        assert_eq!(config.block_mib, 25);
        assert_eq!(config.delay, Duration::from_secs(1));
        assert_eq!(config.block_bytes(), 25 * 1024 * 1024);
        assert_eq!(config.megabytes(37), 925);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_sized_blocks_are_rejected() {
        let config = StressConfig {
            block_mib: 0,
            ..StressConfig::default()
        };
        assert!(matches!(config.validate(), Err(StressError::InvalidConfig(_))));
    }

    #[test]
    fn overflowing_block_size_is_rejected() {
        let config = StressConfig {
            block_mib: usize::MAX / 2,
            ..StressConfig::default()
        };
        assert!(matches!(config.validate(), Err(StressError::InvalidConfig(_))));
    }

    #[test]
    fn zero_blocks_is_a_valid_degenerate_run() {
        let config = StressConfig {
            max_blocks: 0,
            ..StressConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
