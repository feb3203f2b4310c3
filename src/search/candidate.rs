//! The 4-digit PIN candidate.

use std::fmt;

use serde::{Serialize, Serializer};

/// Number of candidates in the search space (`0000`..=`9999`).
pub const PIN_SPACE: u16 = 10_000;

/// One PIN under test, always rendered as four zero-padded digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Candidate(u16);

impl Candidate {
    /// Returns `None` for values outside the PIN space.
    pub fn new(value: u16) -> Option<Self> {
        (value < PIN_SPACE).then_some(Self(value))
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// The wire form sent to the endpoint, e.g. `"0042"`.
    pub fn as_pin(self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl Serialize for Candidate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
