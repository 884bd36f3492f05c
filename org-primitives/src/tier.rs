//! Permission tiers and severity ordering.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One of six totally ordered authority tiers, lowest to highest.
///
/// Ordering is derived from the ordinal position, so `Board` outranks every
/// other tier and `Operational` outranks none.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PermissionTier {
    /// Day-to-day task execution, no oversight authority.
    Operational = 0,
    /// Leads a small group of operational entities.
    Team = 1,
    /// Manages one or more teams within a department.
    Management = 2,
    /// Directs a department.
    Director = 3,
    /// Cross-department executive authority.
    Executive = 4,
    /// Highest authority, typically the human supervisory board.
    Board = 5,
}

impl PermissionTier {
    /// All tiers in ascending order of authority.
    pub const ALL: [Self; 6] = [
        Self::Operational,
        Self::Team,
        Self::Management,
        Self::Director,
        Self::Executive,
        Self::Board,
    ];

    /// Returns the ordinal position of the tier on the scale.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns `true` when `self` is strictly higher than `other`.
    #[must_use]
    pub fn outranks(self, other: Self) -> bool {
        self > other
    }

    /// Returns `true` when `self` is at least as high as `other`.
    #[must_use]
    pub fn at_least(self, other: Self) -> bool {
        self >= other
    }

    /// Returns the tier one step above, if any.
    #[must_use]
    pub const fn next_up(self) -> Option<Self> {
        match self {
            Self::Operational => Some(Self::Team),
            Self::Team => Some(Self::Management),
            Self::Management => Some(Self::Director),
            Self::Director => Some(Self::Executive),
            Self::Executive => Some(Self::Board),
            Self::Board => None,
        }
    }

    /// Returns the canonical lowercase name of the tier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Operational => "operational",
            Self::Team => "team",
            Self::Management => "management",
            Self::Director => "director",
            Self::Executive => "executive",
            Self::Board => "board",
        }
    }
}

impl Display for PermissionTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| Error::UnknownTier { name: s.into() })
    }
}

/// Severity of an error reported back into the governance layer.
///
/// Ordered so that escalation thresholds can be compared with `>=`.
#[derive(
    Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Severity {
    /// Informational, no action expected.
    Info = 0,
    /// Degraded but recoverable.
    Warning = 1,
    /// A failed operation.
    Error = 2,
    /// A failure that threatens the whole task or organization.
    Critical = 3,
}

impl Severity {
    /// Returns the canonical lowercase name of the severity.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "critical" => Ok(Self::Critical),
            other => Err(Error::UnknownSeverity { name: other.into() }),
        }
    }
}
