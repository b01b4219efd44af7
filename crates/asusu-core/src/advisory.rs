//! Financial advisory: the model is asked for a trust score and two short texts.
//!
//! The advisory path never fails from the caller's point of view. Any transport or
//! decoding problem yields [`fallback_report`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

pub const MIN_SCORE: u16 = 300;
pub const MAX_SCORE: u16 = 850;

const FALLBACK_SCORE: u16 = 620;
const FALLBACK_TIP: &str = "Consistent grain trading at the Central Market is your strength. \
Consider reinvesting 15% of your weekly profit into bulk storage to leverage seasonal price hikes.";
const FALLBACK_OUTLOOK: &str = "The upcoming harvest season in Katsina suggests a favorable \
period for investing in transport logistics.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AdviceRating {
    Elite,
    Strong,
    Growing,
    Basic,
}

impl AdviceRating {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "elite" => Some(Self::Elite),
            "strong" => Some(Self::Strong),
            "growing" => Some(Self::Growing),
            "basic" => Some(Self::Basic),
            _ => None,
        }
    }

    /// Banding used when the model omits or garbles the rating.
    pub fn for_score(score: u16) -> Self {
        match score {
            750.. => Self::Elite,
            670..=749 => Self::Strong,
            580..=669 => Self::Growing,
            _ => Self::Basic,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdviceReport {
    pub score: u16,
    pub rating: AdviceRating,
    pub wealth_tip: String,
    pub market_outlook: String,
    #[serde(default)]
    pub fallback: bool,
}

pub fn fallback_report() -> AdviceReport {
    AdviceReport {
        score: FALLBACK_SCORE,
        rating: AdviceRating::Growing,
        wealth_tip: FALLBACK_TIP.to_string(),
        market_outlook: FALLBACK_OUTLOOK.to_string(),
        fallback: true,
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("advisory backend not configured: {0}")]
    NotConfigured(String),

    #[error("advisory transport failed: {0}")]
    Transport(String),

    #[error("advisory response invalid: {0}")]
    InvalidResponse(String),
}

/// Outbound model call. Returns the raw JSON text the model produced.
#[async_trait]
pub trait AdvisoryTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

pub fn advice_prompt(context: &str) -> String {
    format!(
        "You are a specialized financial advisor for micro-entrepreneurs and farmers in \
Katsina, Nigeria. Based on this transaction history and profile: \"{}\", provide:\n\
1. A \"Trust Score\" (300-850).\n\
2. A tailored \"Wealth Tip\" focusing on savings strategies (like Asusu optimization) or \
low-risk local investment options (e.g., commodity trading, livestock scaling) suitable for \
Katsina MSMEs.\n\
3. A \"Market Outlook\" specific to current economic trends in Katsina.\n\
Return in JSON format.",
        context.trim()
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAdvice {
    score: f64,
    #[serde(default)]
    rating: Option<String>,
    wealth_tip: String,
    market_outlook: String,
}

/// Decode the model's JSON text into a report, clamping the score into range.
pub fn parse_report(text: &str) -> Result<AdviceReport, AdvisoryError> {
    let raw: RawAdvice = serde_json::from_str(text.trim())
        .map_err(|e| AdvisoryError::InvalidResponse(e.to_string()))?;
    if !raw.score.is_finite() {
        return Err(AdvisoryError::InvalidResponse(
            "score is not a number".to_string(),
        ));
    }

    let score = raw.score.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u16;
    let rating = raw
        .rating
        .as_deref()
        .and_then(AdviceRating::parse)
        .unwrap_or_else(|| AdviceRating::for_score(score));

    Ok(AdviceReport {
        score,
        rating,
        wealth_tip: raw.wealth_tip,
        market_outlook: raw.market_outlook,
        fallback: false,
    })
}

#[derive(Clone)]
pub struct AdvisoryClient {
    transport: Arc<dyn AdvisoryTransport>,
}

impl std::fmt::Debug for AdvisoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdvisoryClient")
            .field("transport", &self.transport.name())
            .finish()
    }
}

impl AdvisoryClient {
    pub fn new(transport: Arc<dyn AdvisoryTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    pub async fn advise(&self, context: &str) -> AdviceReport {
        let prompt = advice_prompt(context);
        let outcome = match self.transport.generate(&prompt).await {
            Ok(text) => parse_report(&text),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(report) => {
                debug!(
                    transport = self.transport.name(),
                    score = report.score,
                    "advisory report received"
                );
                report
            }
            Err(err) => {
                warn!(
                    transport = self.transport.name(),
                    error = %err,
                    "advisory failed, serving fallback"
                );
                fallback_report()
            }
        }
    }
}

/// Sequence number handed out when an advisory request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AdviceTicket(u64);

/// Holds the report on screen. Overlapping requests resolve to the latest request,
/// not the latest response.
#[derive(Debug, Default)]
pub struct AdviceBoard {
    issued: u64,
    current: Option<(AdviceTicket, AdviceReport)>,
}

impl AdviceBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> AdviceTicket {
        self.issued += 1;
        AdviceTicket(self.issued)
    }

    /// Returns `false` when a newer request already published its report.
    pub fn publish(&mut self, ticket: AdviceTicket, report: AdviceReport) -> bool {
        if let Some((published, _)) = &self.current {
            if *published > ticket {
                debug!(ticket = ticket.0, "stale advisory report dropped");
                return false;
            }
        }
        self.current = Some((ticket, report));
        true
    }

    pub fn current(&self) -> Option<&AdviceReport> {
        self.current.as_ref().map(|(_, report)| report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted(Result<String, AdvisoryError>);

    #[async_trait]
    impl AdvisoryTransport for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, AdvisoryError> {
            self.0.clone()
        }
    }

    fn client(outcome: Result<String, AdvisoryError>) -> AdvisoryClient {
        AdvisoryClient::new(Arc::new(Scripted(outcome)))
    }

    #[tokio::test]
    async fn transport_failure_yields_fallback() {
        let report = client(Err(AdvisoryError::Transport("offline".to_string())))
            .advise("sells grain weekly")
            .await;
        assert_eq!(report, fallback_report());
        assert_eq!(report.score, 620);
        assert_eq!(report.rating, AdviceRating::Growing);
    }

    #[tokio::test]
    async fn malformed_json_yields_fallback() {
        let report = client(Ok("not json".to_string())).advise("").await;
        assert!(report.fallback);
    }

    #[tokio::test]
    async fn out_of_range_score_is_clamped() {
        let body = r#"{"score": 990, "rating": "Elite", "wealthTip": "t", "marketOutlook": "o"}"#;
        let report = client(Ok(body.to_string())).advise("trader").await;
        assert_eq!(report.score, MAX_SCORE);
        assert_eq!(report.rating, AdviceRating::Elite);
        assert!(!report.fallback);
    }

    #[test]
    fn unknown_rating_is_derived_from_score() {
        let body = r#"{"score": 512.4, "rating": "Superb", "wealthTip": "t", "marketOutlook": "o"}"#;
        let report = parse_report(body).unwrap();
        assert_eq!(report.score, 512);
        assert_eq!(report.rating, AdviceRating::Basic);
    }

    #[test]
    fn prompt_embeds_context() {
        assert!(advice_prompt("  livestock trader ").contains("\"livestock trader\""));
    }

    #[test]
    fn newer_request_wins_over_late_response() {
        let mut board = AdviceBoard::new();
        let first = board.issue();
        let second = board.issue();

        let mut newer = fallback_report();
        newer.score = 700;
        assert!(board.publish(second, newer));
        assert!(!board.publish(first, fallback_report()));
        assert_eq!(board.current().map(|r| r.score), Some(700));
    }
}
