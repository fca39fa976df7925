//! Purchasable plans.

use serde::{Deserialize, Serialize};

use crate::error::{LicenseError, LicenseResult};

/// Tier and device budget stamped onto every license minted for a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub tier: String,
    pub activation_limit: u32,
}

impl Plan {
    /// Creates a plan.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the tier is blank or the limit is 0.
    pub fn new(tier: &str, activation_limit: u32) -> LicenseResult<Self> {
        let tier = tier.trim();
        if tier.is_empty() {
            return Err(LicenseError::Config("plan tier must not be empty".into()));
        }
        if activation_limit == 0 {
            return Err(LicenseError::Config("activation limit must be at least 1".into()));
        }
        Ok(Self {
            tier: tier.to_string(),
            activation_limit,
        })
    }
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            tier: "pro".to_string(),
            activation_limit: 3,
        }
    }
}
