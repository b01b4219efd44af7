//! Demo data shown on a fresh install.

use crate::config::StoreConfig;
use crate::error::AsusuError;
use crate::store::GroupStore;
use crate::types::{AsusuGroup, Contribution, Frequency, GroupStatus, Session};
use crate::wallet::Wallet;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;

pub const DEMO_USER_ID: &str = "Fatima Abdullahi";
pub const KATSINA_MARKET_WOMEN_ID: &str = "demo-katsina-market-women";
pub const CENTRAL_FARMERS_UNION_ID: &str = "demo-central-farmers-union";

fn contribution(member: &str, amount: u64, timestamp: DateTime<Utc>) -> Contribution {
    Contribution {
        contributor_id: member.to_string(),
        contributor_name: member.to_string(),
        amount,
        timestamp,
    }
}

/// The two groups shown on first launch, newest first.
pub fn demo_groups(now: DateTime<Utc>) -> Vec<AsusuGroup> {
    let market_women = AsusuGroup {
        id: KATSINA_MARKET_WOMEN_ID.to_string(),
        name: "Katsina Market Women".to_string(),
        contribution_amount: 5_000,
        frequency: Frequency::Weekly,
        members: ["Fatima Abdullahi", "Zainab", "Aisha", "Hadiza", "Mariya"]
            .iter()
            .map(|m| m.to_string())
            .collect(),
        max_members: 5,
        current_turn_index: 0,
        status: GroupStatus::Active,
        leader_id: DEMO_USER_ID.to_string(),
        is_withdrawn: false,
        history: vec![
            contribution("Zainab", 5_000, now - Duration::days(1)),
            contribution("Aisha", 5_000, now - Duration::days(2)),
        ],
        locked_cycle_size: None,
        created_at: now - Duration::seconds(10_000),
    };

    let farmers_union = AsusuGroup {
        id: CENTRAL_FARMERS_UNION_ID.to_string(),
        name: "Central Farmers Union".to_string(),
        contribution_amount: 20_000,
        frequency: Frequency::Monthly,
        members: vec!["Bello".to_string(), "Umar".to_string()],
        max_members: 10,
        current_turn_index: 0,
        status: GroupStatus::Filling,
        leader_id: "Bello".to_string(),
        is_withdrawn: false,
        history: Vec::new(),
        locked_cycle_size: None,
        created_at: now,
    };

    vec![market_women, farmers_union]
}

impl GroupStore {
    /// Store preloaded with the demo groups. The session's wallet receives the
    /// configured opening balance.
    pub fn seeded(
        wallet: Arc<dyn Wallet>,
        config: StoreConfig,
        session: &Session,
    ) -> Result<Self, AsusuError> {
        let opening_balance = config.opening_balance;
        let store = Self::with_groups(wallet, config, demo_groups(Utc::now()))?;
        if opening_balance > 0 {
            store
                .wallet()
                .credit(&session.user_id, opening_balance, "Opening balance")?;
        }
        info!(
            user = %session.user_id,
            groups = store.groups().len(),
            opening_balance,
            "Demo store seeded"
        );
        Ok(store)
    }
}
