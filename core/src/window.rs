// Positional window over a sector sequence

use crate::{FatsectError, Result};
use serde::{Deserialize, Serialize};

/// Window over a sector sequence, in sequence positions.
///
/// `offset` and `size` count entries of the mapped sequence, not bytes and
/// not sector numbers. Out-of-range windows are truncated, never rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtentWindow {
    pub offset: usize,
    pub size: Option<usize>,
}

fn negative(what: &str, value: i64) -> FatsectError {
    FatsectError::InvalidWindow(format!("{} must not be negative (got {})", what, value))
}

impl ExtentWindow {
    pub fn new(offset: usize, size: Option<usize>) -> Self {
        Self { offset, size }
    }

    /// Build a window from user-supplied signed values, rejecting negatives
    pub fn from_signed(offset: i64, size: Option<i64>) -> Result<Self> {
        let offset = usize::try_from(offset)
            .map_err(|_| negative("offset", offset))?;

        let size = match size {
            Some(size) => Some(
                usize::try_from(size)
                    .map_err(|_| negative("size", size))?,
            ),
            None => None,
        };

        Ok(Self { offset, size })
    }

    /// Select the windowed part of `sequence`
    pub fn select<'a, T>(&self, sequence: &'a [T]) -> &'a [T] {
        let start = self.offset.min(sequence.len());
        let end = match self.size {
            Some(size) => start.saturating_add(size).min(sequence.len()),
            None => sequence.len(),
        };
        &sequence[start..end]
    }
}
