//! # Runtime Configuration
//!
//! Coroutine runtime settings read from the environment.
//!
//! ## `ADOPTION_STACK_SIZE`
//!
//! Stack size for the HTTP server and handler coroutines. Accepts decimal
//! (`262144`) or hexadecimal (`0x40000`). Default: `0x40000` (256 KB).
//!
//! The SQLite backend runs on the handler coroutine's stack, so values much
//! below the default risk stack overflows.

use std::env;

/// Default coroutine stack size (256 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x40000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Coroutine stack size in bytes
    pub stack_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_value(env::var("ADOPTION_STACK_SIZE").ok().as_deref())
    }

    fn from_value(raw: Option<&str>) -> Self {
        let stack_size = raw
            .map(str::trim)
            .and_then(parse_size)
            .filter(|&size| size > 0)
            .unwrap_or(DEFAULT_STACK_SIZE);
        Self { stack_size }
    }

    /// Apply to the global `may` runtime. Call once, before spawning.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

fn parse_size(s: &str) -> Option<usize> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_size_parsing() {
        assert_eq!(RuntimeConfig::from_value(Some("0x8000")).stack_size, 0x8000);
        assert_eq!(RuntimeConfig::from_value(Some("32768")).stack_size, 32768);
        assert_eq!(
            RuntimeConfig::from_value(Some("lots")).stack_size,
            DEFAULT_STACK_SIZE
        );
        assert_eq!(RuntimeConfig::from_value(Some("0")).stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(RuntimeConfig::from_value(None), RuntimeConfig::default());
    }
}
