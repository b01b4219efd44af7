use crate::config::{ForceStartPolicy, StoreConfig};
use crate::error::AsusuError;
use crate::journal::{ActivityJournal, JournalEntry, JournalEntryKind};
use crate::rules;
use crate::types::{AsusuGroup, Contribution, GroupDraft, GroupStatus, Session};
use crate::wallet::Wallet;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Immutable view handed to the presentation layer after each action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub user_id: String,
    pub balance: u64,
    pub groups: Vec<AsusuGroup>,
}

/// Owner of every Asusu group in a session.
///
/// All mutations go through the operations below. Each one validates against a copy
/// of the group, prepares its journal entry, performs the wallet movement last, and
/// only then swaps the copy in, so a rejected call leaves nothing behind.
pub struct GroupStore {
    groups: Vec<AsusuGroup>,
    wallet: Arc<dyn Wallet>,
    journal: ActivityJournal,
    config: StoreConfig,
}

impl std::fmt::Debug for GroupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupStore")
            .field("groups", &self.groups.len())
            .field("journal", &self.journal.len())
            .field("config", &self.config)
            .finish()
    }
}

impl GroupStore {
    pub fn new(wallet: Arc<dyn Wallet>, config: StoreConfig) -> Self {
        Self {
            groups: Vec::new(),
            wallet,
            journal: ActivityJournal::new(),
            config,
        }
    }

    /// Start from existing groups, newest first. Every group must satisfy the invariants.
    pub fn with_groups(
        wallet: Arc<dyn Wallet>,
        config: StoreConfig,
        groups: Vec<AsusuGroup>,
    ) -> Result<Self, AsusuError> {
        for group in &groups {
            rules::verify_invariants(group)?;
        }
        let mut ids = std::collections::HashSet::new();
        if let Some(dup) = groups.iter().find(|group| !ids.insert(group.id.as_str())) {
            return Err(AsusuError::Validation(format!(
                "duplicate group id '{}'",
                dup.id
            )));
        }

        Ok(Self {
            groups,
            wallet,
            journal: ActivityJournal::new(),
            config,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub fn journal(&self) -> &ActivityJournal {
        &self.journal
    }

    pub fn groups(&self) -> &[AsusuGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&AsusuGroup> {
        self.groups.iter().find(|group| group.id == group_id)
    }

    pub fn snapshot(&self, session: &Session) -> Result<StoreSnapshot, AsusuError> {
        Ok(StoreSnapshot {
            user_id: session.user_id.clone(),
            balance: self.wallet.balance(&session.user_id)?,
            groups: self.groups.clone(),
        })
    }

    pub fn create_group(
        &mut self,
        session: &Session,
        draft: GroupDraft,
    ) -> Result<AsusuGroup, AsusuError> {
        let name = draft.name.trim();
        if name.chars().count() < 3 {
            return Err(AsusuError::Validation(
                "group name must be at least 3 characters".to_string(),
            ));
        }
        if draft.contribution_amount == 0 {
            return Err(AsusuError::Validation(
                "contribution amount must be positive".to_string(),
            ));
        }
        if draft.max_members < 2 {
            return Err(AsusuError::Validation(
                "a group needs at least 2 member slots".to_string(),
            ));
        }
        if rules::full_pot(draft.contribution_amount, draft.max_members).is_none() {
            return Err(AsusuError::Validation(format!(
                "a pot of {} x {} members is too large",
                draft.contribution_amount, draft.max_members
            )));
        }
        if session.user_id.trim().is_empty() {
            return Err(AsusuError::Validation("creator id is empty".to_string()));
        }

        let group = AsusuGroup {
            id: AsusuGroup::new_id(),
            name: name.to_string(),
            contribution_amount: draft.contribution_amount,
            frequency: draft.frequency,
            members: vec![session.user_id.clone()],
            max_members: draft.max_members,
            current_turn_index: 0,
            status: GroupStatus::Filling,
            leader_id: session.user_id.clone(),
            is_withdrawn: false,
            history: Vec::new(),
            locked_cycle_size: None,
            created_at: Utc::now(),
        };

        let entry = self.journal.build_entry(
            &group.id,
            &session.user_id,
            JournalEntryKind::GroupCreated,
            &serde_json::json!({
                "name": group.name,
                "contribution_amount": group.contribution_amount,
                "frequency": group.frequency,
                "max_members": group.max_members,
            }),
        )?;
        self.journal.commit_entry(entry)?;
        self.groups.insert(0, group.clone());

        info!(
            group_id = %group.id,
            leader = %group.leader_id,
            max_members = group.max_members,
            "Asusu group created"
        );
        Ok(group)
    }

    pub fn join_group(
        &mut self,
        session: &Session,
        group_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();
        let user_id = session.user_id.as_str();

        if group.is_full() {
            return Err(AsusuError::CapacityExceeded {
                group_id: group.id.clone(),
                max_members: group.max_members,
            });
        }
        if rules::is_member(&group, user_id) {
            return Err(AsusuError::AlreadyMember {
                group_id: group.id.clone(),
                user_id: user_id.to_string(),
            });
        }
        if group.status != GroupStatus::Filling {
            return Err(AsusuError::status_violation(
                "join",
                GroupStatus::Filling.name(),
                group.status.name(),
            ));
        }

        group.members.push(user_id.to_string());
        if group.is_full() {
            group.status = GroupStatus::Active;
        }

        let entry = self.journal.build_entry(
            &group.id,
            user_id,
            JournalEntryKind::MemberJoined,
            &serde_json::json!({
                "member_id": user_id,
                "members": group.members.len(),
                "status": group.status,
            }),
        )?;
        self.commit(position, group, entry)
    }

    pub fn remove_member(
        &mut self,
        session: &Session,
        group_id: &str,
        member_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();

        if !rules::is_member(&group, member_id) {
            return Err(AsusuError::NotFound(format!(
                "member '{}' in group '{}'",
                member_id, group.id
            )));
        }
        if !rules::is_leader(&group, &session.user_id) && session.user_id != member_id {
            return Err(AsusuError::Unauthorized(format!(
                "only the leader or the member can remove '{}'",
                member_id
            )));
        }
        if rules::is_leader(&group, member_id) {
            return Err(AsusuError::InvalidState(format!(
                "leader '{}' cannot be removed from group '{}'",
                member_id, group.id
            )));
        }
        match group.status {
            GroupStatus::Filling | GroupStatus::Active => {}
            GroupStatus::PayoutDue | GroupStatus::Completed => {
                return Err(AsusuError::InvalidState(format!(
                    "members cannot be removed once group is '{}'",
                    group.status.name()
                )));
            }
        }

        let removed_index = group
            .members
            .iter()
            .position(|member| member == member_id)
            .unwrap_or_default() as u32;
        group.members.retain(|member| member != member_id);
        let refund = group
            .history
            .iter()
            .position(|contribution| contribution.contributor_id == member_id)
            .map(|index| group.history.remove(index).amount);
        if group.status == GroupStatus::Active && group.member_count() < group.max_members {
            group.status = GroupStatus::Filling;
            group.locked_cycle_size = None;
        }
        // The turn stays with the same member; a departing turn holder hands it to the leader.
        if removed_index < group.current_turn_index {
            group.current_turn_index -= 1;
        } else if removed_index == group.current_turn_index {
            group.current_turn_index = group
                .members
                .iter()
                .position(|member| *member == group.leader_id)
                .unwrap_or_default() as u32;
        }

        let entry = self.journal.build_entry(
            &group.id,
            &session.user_id,
            JournalEntryKind::MemberRemoved,
            &serde_json::json!({
                "member_id": member_id,
                "refund": refund,
                "status": group.status,
            }),
        )?;
        if let Some(amount) = refund {
            self.wallet.credit(
                member_id,
                amount,
                &format!("Asusu refund: {}", group.name),
            )?;
        }

        info!(
            group_id = %group.id,
            member = %member_id,
            refunded = refund.unwrap_or(0),
            "Asusu member removed"
        );
        self.commit(position, group, entry)
    }

    pub fn contribute(
        &mut self,
        session: &Session,
        group_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();
        let user_id = session.user_id.as_str();

        if !rules::is_member(&group, user_id) {
            return Err(AsusuError::NotAMember {
                group_id: group.id.clone(),
                user_id: user_id.to_string(),
            });
        }
        if group.status != GroupStatus::Active {
            return Err(AsusuError::status_violation(
                "contribute",
                GroupStatus::Active.name(),
                group.status.name(),
            ));
        }
        if rules::has_contributed_this_cycle(&group, user_id) {
            return Err(AsusuError::AlreadyContributed {
                group_id: group.id.clone(),
                user_id: user_id.to_string(),
            });
        }

        let now = Utc::now();
        let timestamp = group
            .history
            .first()
            .map(|latest| latest.timestamp.max(now))
            .unwrap_or(now);
        group.history.insert(
            0,
            Contribution {
                contributor_id: user_id.to_string(),
                contributor_name: session.display_name.clone(),
                amount: group.contribution_amount,
                timestamp,
            },
        );
        if group.history.len() as u32 >= rules::cycle_size(&group) {
            group.status = GroupStatus::PayoutDue;
        }

        let entry = self.journal.build_entry(
            &group.id,
            user_id,
            JournalEntryKind::ContributionRecorded,
            &serde_json::json!({
                "amount": group.contribution_amount,
                "contributions": group.history.len(),
                "status": group.status,
            }),
        )?;
        if let Err(err) = self.wallet.debit(
            user_id,
            group.contribution_amount,
            &format!("Asusu contribution: {}", group.name),
        ) {
            warn!(group_id = %group.id, user = %user_id, error = %err, "Asusu contribution rejected");
            return Err(err);
        }

        info!(
            group_id = %group.id,
            user = %user_id,
            contributions = group.history.len(),
            status = group.status.name(),
            "Asusu contribution recorded"
        );
        self.commit(position, group, entry)
    }

    pub fn disburse(
        &mut self,
        session: &Session,
        group_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();

        if group.is_withdrawn {
            return Err(AsusuError::InvalidState(format!(
                "group '{}' has already been paid out",
                group.id
            )));
        }
        if group.status != GroupStatus::PayoutDue {
            return Err(AsusuError::status_violation(
                "disburse",
                GroupStatus::PayoutDue.name(),
                group.status.name(),
            ));
        }
        if !rules::is_leader(&group, &session.user_id) {
            return Err(AsusuError::Unauthorized(format!(
                "only the leader of '{}' can disburse",
                group.id
            )));
        }

        let recipient = rules::payout_recipient(&group, self.config.payout_policy)
            .map(str::to_string)
            .ok_or_else(|| {
                AsusuError::InvalidState(format!("group '{}' has no payout recipient", group.id))
            })?;
        let amount = rules::payout_amount(&group);

        group.status = GroupStatus::Completed;
        group.is_withdrawn = true;

        let entry = self.journal.build_entry(
            &group.id,
            &session.user_id,
            JournalEntryKind::PayoutDisbursed,
            &serde_json::json!({
                "recipient": recipient,
                "amount": amount,
            }),
        )?;
        self.wallet
            .credit(&recipient, amount, &format!("Asusu payout: {}", group.name))?;

        info!(
            group_id = %group.id,
            recipient = %recipient,
            amount,
            "Asusu payout disbursed"
        );
        self.commit(position, group, entry)
    }

    pub fn force_start(
        &mut self,
        session: &Session,
        group_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();

        if !rules::is_leader(&group, &session.user_id) {
            return Err(AsusuError::Unauthorized(format!(
                "only the leader of '{}' can force-start",
                group.id
            )));
        }
        if group.status != GroupStatus::Filling {
            return Err(AsusuError::status_violation(
                "force-start",
                GroupStatus::Filling.name(),
                group.status.name(),
            ));
        }
        if group.members.len() < 2 {
            return Err(AsusuError::InvalidState(format!(
                "group '{}' needs at least 2 members to start",
                group.id
            )));
        }

        group.status = GroupStatus::Active;
        if self.config.force_start_policy == ForceStartPolicy::LockToMembers {
            group.locked_cycle_size = Some(group.member_count());
            if group.history.len() as u32 >= group.member_count() {
                group.status = GroupStatus::PayoutDue;
            }
        }

        let entry = self.journal.build_entry(
            &group.id,
            &session.user_id,
            JournalEntryKind::ForceStarted,
            &serde_json::json!({
                "members": group.members.len(),
                "cycle_size": rules::cycle_size(&group),
            }),
        )?;

        info!(
            group_id = %group.id,
            members = group.members.len(),
            max_members = group.max_members,
            "Asusu group force-started"
        );
        self.commit(position, group, entry)
    }

    /// Hand the current rotation turn to `member_id`. Under
    /// [`PayoutPolicy::Rotation`](crate::config::PayoutPolicy::Rotation) the turn holder
    /// collects the pot on disbursement.
    pub fn assign_turn(
        &mut self,
        session: &Session,
        group_id: &str,
        member_id: &str,
    ) -> Result<AsusuGroup, AsusuError> {
        let position = self.position(group_id)?;
        let mut group = self.groups[position].clone();

        let turn_index = group
            .members
            .iter()
            .position(|member| member == member_id)
            .ok_or_else(|| {
                AsusuError::NotFound(format!("member '{}' in group '{}'", member_id, group.id))
            })?;
        if !rules::is_leader(&group, &session.user_id) {
            return Err(AsusuError::Unauthorized(format!(
                "only the leader of '{}' can assign turns",
                group.id
            )));
        }
        match group.status {
            GroupStatus::Filling | GroupStatus::Active => {}
            GroupStatus::PayoutDue | GroupStatus::Completed => {
                return Err(AsusuError::InvalidState(format!(
                    "turns cannot change once group is '{}'",
                    group.status.name()
                )));
            }
        }

        group.current_turn_index = turn_index as u32;

        let entry = self.journal.build_entry(
            &group.id,
            &session.user_id,
            JournalEntryKind::TurnAssigned,
            &serde_json::json!({
                "member_id": member_id,
                "turn_index": group.current_turn_index,
            }),
        )?;

        info!(
            group_id = %group.id,
            member = %member_id,
            turn_index = group.current_turn_index,
            "Asusu turn assigned"
        );
        self.commit(position, group, entry)
    }

    fn position(&self, group_id: &str) -> Result<usize, AsusuError> {
        self.groups
            .iter()
            .position(|group| group.id == group_id)
            .ok_or_else(|| AsusuError::group_not_found(group_id))
    }

    fn commit(
        &mut self,
        position: usize,
        group: AsusuGroup,
        entry: JournalEntry,
    ) -> Result<AsusuGroup, AsusuError> {
        debug_assert!(rules::verify_invariants(&group).is_ok());
        self.journal.commit_entry(entry)?;
        self.groups[position] = group.clone();
        Ok(group)
    }
}
