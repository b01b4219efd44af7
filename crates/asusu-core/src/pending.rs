//! Mocked back-office flows that settle after a fixed delay.
//!
//! Each flow validates its input up front, then waits for its configured settle time.
//! The wait can be cut short through a [`CancelHandle`] and is bounded by
//! [`MockDelays::timeout`].

use crate::config::MockDelays;
use crate::error::AsusuError;
use crate::wallet::{Wallet, WalletTransaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

pub const BVN_LENGTH: usize = 11;
pub const ACCOUNT_NUMBER_LENGTH: usize = 10;
pub const LOAN_MIN: u64 = 5_000;
pub const LOAN_MAX: u64 = 100_000;
pub const LOAN_STEP: u64 = 5_000;

/// Banks offered on the transfer screen, as `(id, display name)`.
pub const SUPPORTED_BANKS: &[(&str, &str)] = &[
    ("access", "Access Bank"),
    ("amana", "Amana Microfinance"),
    ("fidelity", "Fidelity Bank"),
    ("gtb", "GTBank"),
    ("kuda", "Kuda Bank"),
    ("moniepoint", "Moniepoint"),
    ("opay", "OPay"),
    ("uba", "United Bank for Africa"),
    ("zenith", "Zenith Bank"),
];

/// Caller side of a cancellation pair.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Operation side of a cancellation pair.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl CancelToken {
    /// Token that is never cancelled.
    pub fn never() -> Self {
        let (_handle, token) = cancel_pair();
        token
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    async fn cancelled(&mut self) {
        loop {
            let cancelled = *self.rx.borrow_and_update();
            if cancelled {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped without cancelling.
                std::future::pending::<()>().await;
            }
        }
    }
}

async fn settle(
    operation: &str,
    delay: Duration,
    limit: Duration,
    token: &mut CancelToken,
) -> Result<(), AsusuError> {
    let wait = async {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = token.cancelled() => Err(AsusuError::Cancelled(operation.to_string())),
        }
    };

    match tokio::time::timeout(limit, wait).await {
        Ok(outcome) => outcome,
        Err(_) => Err(AsusuError::TimedOut {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis().min(u64::MAX as u128) as u64,
        }),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BvnVerification {
    /// Last four digits only.
    pub bvn_masked: String,
    pub verified_at: DateTime<Utc>,
}

pub async fn verify_bvn(
    bvn: &str,
    delays: &MockDelays,
    mut token: CancelToken,
) -> Result<BvnVerification, AsusuError> {
    let bvn = bvn.trim();
    if bvn.len() != BVN_LENGTH || !bvn.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AsusuError::Validation(format!(
            "BVN must be exactly {} digits",
            BVN_LENGTH
        )));
    }

    settle("bvn verification", delays.verification, delays.timeout, &mut token).await?;

    let bvn_masked = format!("*******{}", &bvn[BVN_LENGTH - 4..]);
    info!(bvn = %bvn_masked, "BVN verified");
    Ok(BvnVerification {
        bvn_masked,
        verified_at: Utc::now(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LoanKind {
    Agri,
    Trade,
}

impl LoanKind {
    pub fn title(self) -> &'static str {
        match self {
            Self::Agri => "Agri-Loan",
            Self::Trade => "Trade-Loan",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    pub applicant_id: String,
    pub kind: LoanKind,
    pub amount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoanReceipt {
    pub reference: String,
    pub applicant_id: String,
    pub kind: LoanKind,
    pub amount: u64,
    pub received_at: DateTime<Utc>,
}

pub async fn apply_loan(
    application: LoanApplication,
    delays: &MockDelays,
    mut token: CancelToken,
) -> Result<LoanReceipt, AsusuError> {
    let amount = application.amount;
    if !(LOAN_MIN..=LOAN_MAX).contains(&amount) || amount % LOAN_STEP != 0 {
        return Err(AsusuError::Validation(format!(
            "loan amount must be a multiple of {} between {} and {}",
            LOAN_STEP, LOAN_MIN, LOAN_MAX
        )));
    }

    settle(
        "loan application",
        delays.loan_application,
        delays.timeout,
        &mut token,
    )
    .await?;

    let receipt = LoanReceipt {
        reference: format!("LN-{}", Uuid::new_v4().simple()),
        applicant_id: application.applicant_id,
        kind: application.kind,
        amount,
        received_at: Utc::now(),
    };
    info!(
        reference = %receipt.reference,
        kind = receipt.kind.title(),
        amount,
        "loan application received"
    );
    Ok(receipt)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub user_id: String,
    pub bank_id: String,
    pub account_number: String,
    pub amount: u64,
}

/// Send money to another bank. The wallet is debited only once the transfer settles.
pub async fn transfer(
    wallet: &dyn Wallet,
    request: &TransferRequest,
    delays: &MockDelays,
    mut token: CancelToken,
) -> Result<WalletTransaction, AsusuError> {
    let bank = SUPPORTED_BANKS
        .iter()
        .find(|(id, _)| *id == request.bank_id)
        .map(|(_, name)| *name)
        .ok_or_else(|| AsusuError::NotFound(format!("bank '{}'", request.bank_id)))?;
    if request.account_number.len() != ACCOUNT_NUMBER_LENGTH
        || !request.account_number.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(AsusuError::Validation(format!(
            "account number must be {} digits",
            ACCOUNT_NUMBER_LENGTH
        )));
    }
    if request.amount == 0 {
        return Err(AsusuError::Validation(
            "transfer amount must be positive".to_string(),
        ));
    }
    let available = wallet.balance(&request.user_id)?;
    if request.amount > available {
        return Err(AsusuError::InsufficientFunds {
            user_id: request.user_id.clone(),
            required: request.amount,
            available,
        });
    }

    debug!(bank, amount = request.amount, "transfer processing");
    settle("transfer", delays.transfer, delays.timeout, &mut token).await?;

    let posting = wallet.debit(
        &request.user_id,
        request.amount,
        &format!("Transfer to {} {}", bank, request.account_number),
    )?;
    info!(
        tx_id = %posting.tx_id,
        bank,
        amount = request.amount,
        "transfer settled"
    );
    Ok(posting)
}
