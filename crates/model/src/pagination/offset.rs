use serde::{Deserialize, Serialize};
use std::{fmt, ops::Add};

/// Count of data records already consumed; the only resumption token.
///
/// Offsets never count the header line. Starting a run at offset `n` skips
/// the first `n` data records of the source.
#[derive(
    Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Offset(u64);

impl Offset {
    pub const ZERO: Offset = Offset(0);

    pub const fn new(value: u64) -> Self {
        Offset(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    /// Converts a zero-based line index (line 0 being the header) into an
    /// offset. Index 0 and 1 both mean "first data record".
    pub fn from_line_index(line: u64) -> Self {
        Offset(line.saturating_sub(1))
    }

    /// The line index, header included, at which this offset starts.
    pub fn line_index(self) -> u64 {
        self.0 + 1
    }

    pub fn advance(&mut self, count: u64) {
        self.0 += count;
    }
}

impl Add<u64> for Offset {
    type Output = Offset;

    fn add(self, rhs: u64) -> Offset {
        Offset(self.0 + rhs)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
