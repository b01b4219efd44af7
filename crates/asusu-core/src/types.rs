use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Informational cadence label. No clock enforces it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn name(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
        }
    }
}

/// Group lifecycle status.
///
/// `Filling -> Active -> Payout Due -> Completed`, with `Active -> Filling` allowed on
/// member removal. Nothing leaves `Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum GroupStatus {
    Filling,
    Active,
    #[serde(rename = "Payout Due")]
    PayoutDue,
    Completed,
}

impl GroupStatus {
    pub fn name(self) -> &'static str {
        match self {
            Self::Filling => "Filling",
            Self::Active => "Active",
            Self::PayoutDue => "Payout Due",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// One member's payment into the current cycle of a group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contribution {
    pub contributor_id: String,
    pub contributor_name: String,
    /// Whole naira; always equals the group's contribution amount.
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
}

/// A rotating-savings circle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AsusuGroup {
    pub id: String,
    pub name: String,
    pub contribution_amount: u64,
    pub frequency: Frequency,
    pub members: Vec<String>,
    pub max_members: u32,
    pub current_turn_index: u32,
    pub status: GroupStatus,
    pub leader_id: String,
    pub is_withdrawn: bool,
    /// Newest contribution first.
    pub history: Vec<Contribution>,
    /// Contributions needed to reach payout when a force-start locked the cycle size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_cycle_size: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl AsusuGroup {
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn member_count(&self) -> u32 {
        self.members.len() as u32
    }

    pub fn is_full(&self) -> bool {
        self.member_count() >= self.max_members
    }
}

/// Caller-supplied fields for a new group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupDraft {
    pub name: String,
    pub contribution_amount: u64,
    pub frequency: Frequency,
    pub max_members: u32,
}

impl GroupDraft {
    pub fn new(
        name: impl Into<String>,
        contribution_amount: u64,
        frequency: Frequency,
        max_members: u32,
    ) -> Self {
        Self {
            name: name.into(),
            contribution_amount,
            frequency,
            max_members,
        }
    }
}

/// The acting user threaded through every store call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub display_name: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            display_name: user_id.clone(),
            user_id,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}
