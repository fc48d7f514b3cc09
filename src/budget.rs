use crate::constants::DEFAULT_BUDGET_BYTES;
use crate::error::{CompressionError, Result};
use crate::utils::format_file_size;
use std::fmt;

/// Maximum number of bytes an output image may occupy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeBudget(u64);

impl SizeBudget {
    pub fn new(bytes: u64) -> Result<Self> {
        if bytes == 0 {
            return Err(CompressionError::InvalidBudget(bytes));
        }
        Ok(Self(bytes))
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    pub fn fits(&self, len: usize) -> bool {
        len as u64 <= self.0
    }

    /// How far `len` overshoots the budget, 1.0 meaning exactly on it.
    pub fn ratio(&self, len: usize) -> f64 {
        len as f64 / self.0 as f64
    }
}

impl Default for SizeBudget {
    fn default() -> Self {
        Self(DEFAULT_BUDGET_BYTES)
    }
}

impl fmt::Display for SizeBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes ({})", self.0, format_file_size(self.0))
    }
}
