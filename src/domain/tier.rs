//! Subscription tiers and their quota policy

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Subscription tier of a caller.
///
/// The tier is declared in the token at issue time but may be overridden by a
/// more recent billing event held in the counter store; see the tier resolver
/// for the precedence rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Tier {
    /// Monthly request quota for this tier, `None` meaning unlimited.
    pub fn monthly_limit(&self, free_limit: u64) -> Option<u64> {
        match self {
            Tier::Free => Some(free_limit),
            Tier::Pro => None,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        matches!(self, Tier::Pro)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Pro => "pro",
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "pro" => Ok(Tier::Pro),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
