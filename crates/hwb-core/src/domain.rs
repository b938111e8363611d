use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// `from_date` cursor: unix seconds from which new submissions are requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(pub i64);

impl Cursor {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Review outcome of a homework submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Approved,
    Reviewing,
    Rejected,
}

impl Verdict {
    /// Wire value used by the review API.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::Reviewing => "reviewing",
            Verdict::Rejected => "rejected",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Verdict::Approved => "Work has been reviewed: the reviewer liked everything.",
            Verdict::Reviewing => "Work has been taken up for review by the reviewer.",
            Verdict::Rejected => "Work has been reviewed: the reviewer has remarks.",
        }
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "approved" => Ok(Verdict::Approved),
            "reviewing" => Ok(Verdict::Reviewing),
            "rejected" => Ok(Verdict::Rejected),
            other => Err(Error::UnknownVerdict(other.to_string())),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
