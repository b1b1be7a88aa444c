//! Types stored in and reported by the ledger.

/// Lifecycle status of a download record.
///
/// Stored as an integer: `1 = Pending`, `2 = Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerStatus {
    /// Reserved; transfer in progress or interrupted.
    Pending,
    /// File fully written to local storage. Terminal.
    Done,
}

impl LedgerStatus {
    pub const fn code(self) -> i64 {
        match self {
            Self::Pending => 1,
            Self::Done => 2,
        }
    }

    /// Decode a stored integer. Unknown values yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Pending),
            2 => Some(Self::Done),
            _ => None,
        }
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Row counts of the ledger, for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSummary {
    pub total: u64,
    pub pending: u64,
    pub done: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_match_wire_encoding() {
        assert_eq!(LedgerStatus::Pending.code(), 1);
        assert_eq!(LedgerStatus::Done.code(), 2);
        assert_eq!(LedgerStatus::from_code(1), Some(LedgerStatus::Pending));
        assert_eq!(LedgerStatus::from_code(2), Some(LedgerStatus::Done));
    }

    #[test]
    fn test_unknown_codes_rejected() {
        assert_eq!(LedgerStatus::from_code(0), None);
        assert_eq!(LedgerStatus::from_code(3), None);
        assert_eq!(LedgerStatus::from_code(-1), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(LedgerStatus::Pending.to_string(), "pending");
        assert_eq!(LedgerStatus::Done.to_string(), "done");
    }
}
