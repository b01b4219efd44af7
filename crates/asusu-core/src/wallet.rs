use crate::error::AsusuError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TxDirection {
    Debit,
    Credit,
}

/// Posted wallet movement, kept for the dashboard's recent-transactions list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletTransaction {
    pub tx_id: String,
    pub user_id: String,
    pub direction: TxDirection,
    pub amount: u64,
    pub memo: String,
    pub balance_after: u64,
    pub occurred_at: DateTime<Utc>,
}

/// Balance collaborator consumed by contributions, payouts and transfers.
///
/// A rejected debit must leave the balance untouched.
pub trait Wallet: Send + Sync {
    fn balance(&self, user_id: &str) -> Result<u64, AsusuError>;

    fn debit(&self, user_id: &str, amount: u64, memo: &str)
        -> Result<WalletTransaction, AsusuError>;

    fn credit(&self, user_id: &str, amount: u64, memo: &str)
        -> Result<WalletTransaction, AsusuError>;

    /// Newest first.
    fn transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, AsusuError>;
}

#[derive(Debug, Default)]
struct WalletBook {
    balances: HashMap<String, u64>,
    postings: Vec<WalletTransaction>,
}

/// Process-local wallet. Unknown users start at zero.
#[derive(Debug, Default)]
pub struct InMemoryWallet {
    book: Mutex<WalletBook>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(user_id: impl Into<String>, amount: u64) -> Self {
        let wallet = Self::new();
        if let Ok(mut book) = wallet.book.lock() {
            book.balances.insert(user_id.into(), amount);
        }
        wallet
    }

    fn post(
        &self,
        user_id: &str,
        direction: TxDirection,
        amount: u64,
        memo: &str,
    ) -> Result<WalletTransaction, AsusuError> {
        let mut book = self
            .book
            .lock()
            .map_err(|_| AsusuError::InvalidState("wallet lock poisoned".to_string()))?;

        let available = book.balances.get(user_id).copied().unwrap_or(0);
        let balance_after = match direction {
            TxDirection::Debit => {
                available
                    .checked_sub(amount)
                    .ok_or_else(|| AsusuError::InsufficientFunds {
                        user_id: user_id.to_string(),
                        required: amount,
                        available,
                    })?
            }
            TxDirection::Credit => available.checked_add(amount).ok_or_else(|| {
                AsusuError::Validation(format!("credit of {} overflows balance", amount))
            })?,
        };

        let posting = WalletTransaction {
            tx_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            direction,
            amount,
            memo: memo.to_string(),
            balance_after,
            occurred_at: Utc::now(),
        };
        book.balances.insert(user_id.to_string(), balance_after);
        book.postings.push(posting.clone());
        Ok(posting)
    }
}

impl Wallet for InMemoryWallet {
    fn balance(&self, user_id: &str) -> Result<u64, AsusuError> {
        let book = self
            .book
            .lock()
            .map_err(|_| AsusuError::InvalidState("wallet lock poisoned".to_string()))?;
        Ok(book.balances.get(user_id).copied().unwrap_or(0))
    }

    fn debit(
        &self,
        user_id: &str,
        amount: u64,
        memo: &str,
    ) -> Result<WalletTransaction, AsusuError> {
        self.post(user_id, TxDirection::Debit, amount, memo)
    }

    fn credit(
        &self,
        user_id: &str,
        amount: u64,
        memo: &str,
    ) -> Result<WalletTransaction, AsusuError> {
        self.post(user_id, TxDirection::Credit, amount, memo)
    }

    fn transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, AsusuError> {
        let book = self
            .book
            .lock()
            .map_err(|_| AsusuError::InvalidState("wallet lock poisoned".to_string()))?;
        Ok(book
            .postings
            .iter()
            .rev()
            .filter(|posting| posting.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_debit_leaves_balance_untouched() {
        let wallet = InMemoryWallet::with_balance("fatima", 1_000);
        let err = wallet.debit("fatima", 5_000, "asusu").unwrap_err();
        assert_eq!(
            err,
            AsusuError::InsufficientFunds {
                user_id: "fatima".to_string(),
                required: 5_000,
                available: 1_000,
            }
        );
        assert_eq!(wallet.balance("fatima").unwrap(), 1_000);
        assert!(wallet.transactions("fatima").unwrap().is_empty());
    }

    #[test]
    fn postings_are_listed_newest_first() {
        let wallet = InMemoryWallet::with_balance("fatima", 10_000);
        wallet.debit("fatima", 4_000, "first").unwrap();
        wallet.credit("fatima", 1_000, "second").unwrap();
        wallet.credit("bello", 500, "other user").unwrap();

        let postings = wallet.transactions("fatima").unwrap();
        assert_eq!(postings.len(), 2);
        assert_eq!(postings[0].memo, "second");
        assert_eq!(postings[0].balance_after, 7_000);
        assert_eq!(wallet.balance("bello").unwrap(), 500);
    }
}
