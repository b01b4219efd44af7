use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Who receives the pot when a group is disbursed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PayoutPolicy {
    /// The group leader collects the pot.
    #[default]
    Leader,
    /// The member at `current_turn_index` collects the pot.
    Rotation,
}

/// How a force-started group reaches `Payout Due`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ForceStartPolicy {
    /// Payout still requires `max_members` contributions.
    #[default]
    KeepCapacity,
    /// Force-start fixes the cycle size at the member count at that moment.
    LockToMembers,
}

/// Group store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub payout_policy: PayoutPolicy,
    pub force_start_policy: ForceStartPolicy,
    /// Balance credited to a session's wallet when the demo seed is loaded.
    pub opening_balance: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            payout_policy: PayoutPolicy::Leader,
            force_start_policy: ForceStartPolicy::KeepCapacity,
            opening_balance: 45_250,
        }
    }
}

/// Settle times for the mocked verification, loan and transfer flows.
#[derive(Debug, Clone)]
pub struct MockDelays {
    pub verification: Duration,
    pub loan_application: Duration,
    pub transfer: Duration,
    /// Upper bound applied to every mocked operation.
    pub timeout: Duration,
}

impl Default for MockDelays {
    fn default() -> Self {
        Self {
            verification: Duration::from_millis(1_500),
            loan_application: Duration::from_millis(2_500),
            transfer: Duration::from_millis(2_000),
            timeout: Duration::from_secs(10),
        }
    }
}

impl MockDelays {
    /// Zero settle times, useful for tests and scripted demos.
    pub fn immediate() -> Self {
        Self {
            verification: Duration::ZERO,
            loan_application: Duration::ZERO,
            transfer: Duration::ZERO,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Advisory backend settings.
#[derive(Debug, Clone)]
pub struct AdvisoryConfig {
    pub model: String,
    pub endpoint: String,
    pub api_key_env: String,
    pub request_timeout: Duration,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            model: "gemini-3-flash-preview".to_string(),
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}
