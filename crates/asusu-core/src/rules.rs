//! Pure derived views over a group's current data.
//!
//! Nothing here mutates or stores state; every value is recomputed from the group
//! passed in, so callers can evaluate these on any snapshot.

use crate::config::PayoutPolicy;
use crate::error::AsusuError;
use crate::locale::{self, Locale};
use crate::types::{AsusuGroup, GroupStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Share of the cycle already paid in, as a percentage in `[0, 100]`.
pub fn progress_percent(group: &AsusuGroup) -> f64 {
    let cycle = cycle_size(group);
    if cycle == 0 {
        return 0.0;
    }
    let raw = 100.0 * group.history.len() as f64 / cycle as f64;
    raw.clamp(0.0, 100.0)
}

pub fn is_member(group: &AsusuGroup, user_id: &str) -> bool {
    group.members.iter().any(|member| member == user_id)
}

pub fn is_leader(group: &AsusuGroup, user_id: &str) -> bool {
    group.leader_id == user_id
}

pub fn has_contributed_this_cycle(group: &AsusuGroup, user_id: &str) -> bool {
    group
        .history
        .iter()
        .any(|contribution| contribution.contributor_id == user_id)
}

/// Nominal pot: one contribution per turn of the cycle.
pub fn pot_total(group: &AsusuGroup) -> u64 {
    payout_amount(group)
}

/// Contributions required before the group becomes `Payout Due`.
pub fn cycle_size(group: &AsusuGroup) -> u32 {
    group.locked_cycle_size.unwrap_or(group.max_members)
}

/// Amount credited on disbursement.
///
/// Groups whose full pot would overflow are rejected at creation, so the product
/// always fits for a group that passed [`verify_invariants`].
pub fn payout_amount(group: &AsusuGroup) -> u64 {
    full_pot(group.contribution_amount, cycle_size(group)).unwrap_or(u64::MAX)
}

/// `contribution_amount * slots`, or `None` when it does not fit in a `u64`.
pub fn full_pot(contribution_amount: u64, slots: u32) -> Option<u64> {
    contribution_amount.checked_mul(u64::from(slots))
}

/// Member who collects the pot under the given policy.
pub fn payout_recipient(group: &AsusuGroup, policy: PayoutPolicy) -> Option<&str> {
    match policy {
        PayoutPolicy::Leader => Some(group.leader_id.as_str()),
        PayoutPolicy::Rotation => {
            if group.members.is_empty() {
                return None;
            }
            let index = group.current_turn_index as usize % group.members.len();
            group.members.get(index).map(String::as_str)
        }
    }
}

/// Total the user has paid into cycles that have not been paid out yet.
pub fn active_savings(groups: &[AsusuGroup], user_id: &str) -> u64 {
    groups
        .iter()
        .filter(|group| !group.is_withdrawn)
        .flat_map(|group| group.history.iter())
        .filter(|contribution| contribution.contributor_id == user_id)
        .map(|contribution| contribution.amount)
        .sum()
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StatusLabel {
    pub label: &'static str,
    pub icon: &'static str,
}

pub fn status_label(status: GroupStatus, locale: Locale) -> StatusLabel {
    let (english, hausa, icon) = match status {
        GroupStatus::Filling => ("Filling Group", "Ana Tara Mutane", "\u{23f3}"),
        GroupStatus::Active => ("Active Rotation", "Ana Kan Yi", "\u{26a1}"),
        GroupStatus::PayoutDue => ("Payout Ready", "Lokacin Biyan Kudi", "\u{1f4b0}"),
        GroupStatus::Completed => ("Cycle Completed", "An Kammala", "\u{2705}"),
    };
    let label = match locale {
        Locale::English => english,
        Locale::Hausa => hausa,
    };
    StatusLabel { label, icon }
}

/// Affordances a user has on a group right now.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GroupAction {
    Join,
    Contribute,
    Disburse,
    ForceStart,
    RemoveMember,
    AssignTurn,
    /// A non-leader member removing themself.
    Leave,
}

pub fn available_actions(group: &AsusuGroup, user_id: &str) -> Vec<GroupAction> {
    let member = is_member(group, user_id);
    let leader = is_leader(group, user_id);
    let mut actions = Vec::new();

    match group.status {
        GroupStatus::Filling => {
            if !member && !group.is_full() {
                actions.push(GroupAction::Join);
            }
            if leader && group.members.len() >= 2 {
                actions.push(GroupAction::ForceStart);
            }
        }
        GroupStatus::Active => {
            if member && !has_contributed_this_cycle(group, user_id) {
                actions.push(GroupAction::Contribute);
            }
        }
        GroupStatus::PayoutDue => {
            if leader && !group.is_withdrawn {
                actions.push(GroupAction::Disburse);
            }
        }
        GroupStatus::Completed => {}
    }

    if matches!(group.status, GroupStatus::Filling | GroupStatus::Active) {
        if leader && group.members.len() > 1 {
            actions.push(GroupAction::RemoveMember);
            actions.push(GroupAction::AssignTurn);
        } else if member && !leader {
            actions.push(GroupAction::Leave);
        }
    }

    actions
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ContributionDue,
    PayoutReady,
}

/// Reminder surfaced to the presentation layer. Derived, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub group_id: String,
    pub group_name: String,
    pub kind: NotificationKind,
    pub message: String,
}

pub fn notifications(groups: &[AsusuGroup], user_id: &str, locale: Locale) -> Vec<Notification> {
    groups
        .iter()
        .filter(|group| is_member(group, user_id))
        .filter_map(|group| {
            let kind = match group.status {
                GroupStatus::Active if !has_contributed_this_cycle(group, user_id) => {
                    NotificationKind::ContributionDue
                }
                GroupStatus::PayoutDue => NotificationKind::PayoutReady,
                GroupStatus::Filling | GroupStatus::Active | GroupStatus::Completed => {
                    return None
                }
            };
            let message = match kind {
                NotificationKind::ContributionDue => locale::turn_reminder(locale, &group.name),
                NotificationKind::PayoutReady => locale::payout_reminder(locale, &group.name),
            };
            Some(Notification {
                group_id: group.id.clone(),
                group_name: group.name.clone(),
                kind,
                message,
            })
        })
        .collect()
}

/// Check the structural invariants of a group.
pub fn verify_invariants(group: &AsusuGroup) -> Result<(), AsusuError> {
    let violation = |detail: String| {
        Err(AsusuError::InvalidState(format!(
            "group '{}' invariant violated: {}",
            group.id, detail
        )))
    };

    let mut seen = HashSet::new();
    for member in &group.members {
        if !seen.insert(member.as_str()) {
            return violation(format!("duplicate member '{}'", member));
        }
    }
    if group.members.is_empty() || group.member_count() > group.max_members {
        return violation(format!(
            "member count {} outside 1..={}",
            group.members.len(),
            group.max_members
        ));
    }
    if full_pot(group.contribution_amount, group.max_members).is_none() {
        return violation(format!(
            "pot of {} x {} overflows",
            group.contribution_amount, group.max_members
        ));
    }
    if group.current_turn_index >= group.member_count() {
        return violation(format!(
            "turn index {} outside {} members",
            group.current_turn_index,
            group.members.len()
        ));
    }
    if !is_member(group, &group.leader_id) {
        return violation(format!("leader '{}' is not a member", group.leader_id));
    }
    if group.history.len() > group.max_members as usize {
        return violation(format!("history length {}", group.history.len()));
    }
    if group.is_withdrawn && group.status != GroupStatus::Completed {
        return violation(format!("withdrawn while '{}'", group.status.name()));
    }
    let mut contributors = HashSet::new();
    for contribution in &group.history {
        if !contributors.insert(contribution.contributor_id.as_str()) {
            return violation(format!(
                "'{}' contributed twice this cycle",
                contribution.contributor_id
            ));
        }
        if contribution.amount != group.contribution_amount {
            return violation(format!(
                "contribution of {} does not match {}",
                contribution.amount, group.contribution_amount
            ));
        }
    }
    if group
        .history
        .windows(2)
        .any(|pair| pair[0].timestamp < pair[1].timestamp)
    {
        return violation("history timestamps out of order".to_string());
    }

    Ok(())
}
