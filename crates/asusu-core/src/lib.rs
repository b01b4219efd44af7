//! Asusu rotating savings groups for the Amana mobile bank.
//!
//! Groups fill, rotate and pay out through [`GroupStore`], which keeps the lifecycle
//! invariants, moves money through a [`Wallet`] and appends every change to a
//! hash-chained [`ActivityJournal`].

#![deny(unsafe_code)]

pub mod advisory;
pub mod config;
pub mod error;
pub mod journal;
pub mod locale;
pub mod pending;
pub mod rules;
pub mod seed;
pub mod store;
pub mod types;
pub mod wallet;

pub use advisory::{
    AdviceBoard, AdviceRating, AdviceReport, AdviceTicket, AdvisoryClient, AdvisoryError,
    AdvisoryTransport,
};
pub use config::{AdvisoryConfig, ForceStartPolicy, MockDelays, PayoutPolicy, StoreConfig};
pub use error::AsusuError;
pub use journal::{ActivityJournal, JournalEntry, JournalEntryKind};
pub use locale::{translate, Locale, MessageKey};
pub use pending::{cancel_pair, CancelHandle, CancelToken, LoanKind};
pub use rules::{GroupAction, Notification, NotificationKind, StatusLabel};
pub use store::{GroupStore, StoreSnapshot};
pub use types::{AsusuGroup, Contribution, Frequency, GroupDraft, GroupStatus, Session};
pub use wallet::{InMemoryWallet, TxDirection, Wallet, WalletTransaction};
