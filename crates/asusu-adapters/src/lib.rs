//! Adapters for Asusu collaborators.

#![deny(unsafe_code)]

use async_trait::async_trait;
use asusu_core::advisory::{AdvisoryClient, AdvisoryError, AdvisoryTransport};
use asusu_core::config::AdvisoryConfig;
use asusu_core::error::AsusuError;
use asusu_core::wallet::{InMemoryWallet, Wallet, WalletTransaction};
use reqwest::{Client, Url};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

/// Gemini `generateContent` over HTTPS, asking for a JSON advice object.
#[derive(Clone)]
pub struct GeminiTransport {
    client: Client,
    url: Url,
    model: String,
}

impl std::fmt::Debug for GeminiTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL carries the API key.
        f.debug_struct("GeminiTransport")
            .field("model", &self.model)
            .finish()
    }
}

impl GeminiTransport {
    pub fn new(config: &AdvisoryConfig, api_key: &str) -> Result<Self, AdvisoryError> {
        if api_key.trim().is_empty() {
            return Err(AdvisoryError::NotConfigured(format!(
                "empty {}",
                config.api_key_env
            )));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdvisoryError::NotConfigured(format!("http client: {}", e)))?;
        let url = resolve_endpoint(&config.endpoint, &config.model, api_key)?;

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
        })
    }

    /// Read the API key from the configured environment variable.
    pub fn from_env(config: &AdvisoryConfig) -> Result<Self, AdvisoryError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| AdvisoryError::NotConfigured(format!("missing {}", config.api_key_env)))?;
        Self::new(config, &api_key)
    }
}

fn resolve_endpoint(endpoint: &str, model: &str, api_key: &str) -> Result<Url, AdvisoryError> {
    let mut url = if endpoint.contains(":generateContent") {
        Url::parse(endpoint)
    } else {
        Url::parse(&format!(
            "{}/v1beta/models/{}:generateContent",
            endpoint.trim_end_matches('/'),
            model
        ))
    }
    .map_err(|e| AdvisoryError::NotConfigured(format!("invalid endpoint {}: {}", endpoint, e)))?;

    if !url.query_pairs().any(|(k, _)| k == "key") {
        url.query_pairs_mut().append_pair("key", api_key);
    }
    Ok(url)
}

fn advice_payload(prompt: &str) -> Value {
    json!({
        "contents": [{ "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "score": { "type": "NUMBER" },
                    "wealthTip": { "type": "STRING" },
                    "marketOutlook": { "type": "STRING" },
                    "rating": {
                        "type": "STRING",
                        "description": "One word: Elite, Strong, Growing, or Basic"
                    }
                },
                "required": ["score", "wealthTip", "marketOutlook", "rating"]
            }
        }
    })
}

fn candidate_text(body: &Value) -> Option<String> {
    let text = body["candidates"]
        .as_array()?
        .first()?["content"]["parts"]
        .as_array()?
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    let mut chars = value.chars();
    let truncated: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[async_trait]
impl AdvisoryTransport for GeminiTransport {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&advice_payload(prompt))
            .send()
            .await
            .map_err(|e| AdvisoryError::Transport(format!("gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisoryError::Transport(format!(
                "gemini error {}: {}",
                status,
                truncate(&body, 320)
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AdvisoryError::InvalidResponse(format!("gemini body: {}", e)))?;
        debug!(model = %self.model, "gemini response received");
        candidate_text(&body)
            .ok_or_else(|| AdvisoryError::InvalidResponse("gemini returned no text".to_string()))
    }
}

/// Returns the same body for every prompt.
#[derive(Debug, Clone)]
pub struct FixedAdvisoryTransport {
    body: String,
}

impl FixedAdvisoryTransport {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl AdvisoryTransport for FixedAdvisoryTransport {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, AdvisoryError> {
        Ok(self.body.clone())
    }
}

/// Deterministic failing transport useful for offline runs and chaos testing.
#[derive(Debug, Clone)]
pub struct AlwaysFailTransport {
    reason: String,
}

impl AlwaysFailTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl AdvisoryTransport for AlwaysFailTransport {
    fn name(&self) -> &str {
        "always-fail"
    }

    async fn generate(&self, _prompt: &str) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Transport(self.reason.clone()))
    }
}

/// Gemini when a key is available, otherwise a transport that always serves the fallback.
pub fn advisory_client(config: &AdvisoryConfig, api_key: Option<&str>) -> AdvisoryClient {
    let transport: Arc<dyn AdvisoryTransport> = match api_key.map(|key| GeminiTransport::new(config, key)) {
        Some(Ok(gemini)) => {
            info!(model = %config.model, "advisory backed by gemini");
            Arc::new(gemini)
        }
        Some(Err(err)) => Arc::new(AlwaysFailTransport::new(err.to_string())),
        None => Arc::new(AlwaysFailTransport::new(format!(
            "{} not set",
            config.api_key_env
        ))),
    };
    AdvisoryClient::new(transport)
}

/// Wallet whose debits are always refused. Reads and credits pass through.
#[derive(Debug, Default)]
pub struct FrozenWallet {
    inner: InMemoryWallet,
}

impl FrozenWallet {
    pub fn new(inner: InMemoryWallet) -> Self {
        Self { inner }
    }
}

impl Wallet for FrozenWallet {
    fn balance(&self, user_id: &str) -> Result<u64, AsusuError> {
        self.inner.balance(user_id)
    }

    fn debit(
        &self,
        user_id: &str,
        amount: u64,
        _memo: &str,
    ) -> Result<WalletTransaction, AsusuError> {
        // Frozen funds are not spendable.
        Err(AsusuError::InsufficientFunds {
            user_id: user_id.to_string(),
            required: amount,
            available: 0,
        })
    }

    fn credit(
        &self,
        user_id: &str,
        amount: u64,
        memo: &str,
    ) -> Result<WalletTransaction, AsusuError> {
        self.inner.credit(user_id, amount, memo)
    }

    fn transactions(&self, user_id: &str) -> Result<Vec<WalletTransaction>, AsusuError> {
        self.inner.transactions(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asusu_core::advisory::AdviceRating;
    use asusu_core::config::StoreConfig;
    use asusu_core::store::GroupStore;
    use asusu_core::types::{Frequency, GroupDraft, Session};

    #[test]
    fn endpoint_gets_model_path_and_key() {
        let url = resolve_endpoint(
            "https://generativelanguage.googleapis.com/",
            "gemini-3-flash-preview",
            "secret",
        )
        .unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-3-flash-preview:generateContent");
        assert!(url.query_pairs().any(|(k, v)| k == "key" && v == "secret"));
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = json!({
            "candidates": [
                { "content": { "parts": [{ "text": "{\"score\":" }, { "text": "700}" }] } },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        });
        assert_eq!(candidate_text(&body).as_deref(), Some("{\"score\":700}"));
        assert_eq!(candidate_text(&json!({ "candidates": [] })), None);
    }

    #[test]
    fn payload_requests_json_schema() {
        let payload = advice_payload("hello");
        assert_eq!(
            payload["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(payload["contents"][0]["parts"][0]["text"], "hello");
    }

    #[test]
    fn empty_key_is_not_configured() {
        assert!(matches!(
            GeminiTransport::new(&AdvisoryConfig::default(), "  "),
            Err(AdvisoryError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn fixed_transport_feeds_client() {
        let client = AdvisoryClient::new(Arc::new(FixedAdvisoryTransport::new(
            r#"{"score": 710, "rating": "Strong", "wealthTip": "Buy in bulk", "marketOutlook": "Stable"}"#,
        )));
        let report = client.advise("grain trader").await;
        assert_eq!(report.score, 710);
        assert_eq!(report.rating, AdviceRating::Strong);
        assert_eq!(report.wealth_tip, "Buy in bulk");
    }

    #[tokio::test]
    async fn unreachable_gemini_serves_fallback() {
        let config = AdvisoryConfig {
            endpoint: "http://127.0.0.1:9".to_string(),
            request_timeout: std::time::Duration::from_secs(2),
            ..AdvisoryConfig::default()
        };
        let client = advisory_client(&config, Some("test-key"));
        assert_eq!(client.transport_name(), "gemini");
        assert!(client.advise("trader").await.fallback);
    }

    #[tokio::test]
    async fn missing_key_serves_fallback() {
        let client = advisory_client(&AdvisoryConfig::default(), None);
        assert_eq!(client.transport_name(), "always-fail");
        assert_eq!(client.advise("trader").await.score, 620);
    }

    #[test]
    fn frozen_wallet_blocks_contribution_without_mutation() {
        let wallet = FrozenWallet::new(InMemoryWallet::with_balance("L", 50_000));
        let mut store = GroupStore::new(Arc::new(wallet), StoreConfig::default());
        let leader = Session::new("L");
        let group = store
            .create_group(&leader, GroupDraft::new("Frozen", 5_000, Frequency::Daily, 2))
            .unwrap();
        store.join_group(&Session::new("M"), &group.id).unwrap();

        let err = store.contribute(&leader, &group.id).unwrap_err();
        assert!(matches!(
            err,
            AsusuError::InsufficientFunds {
                required: 5_000,
                available: 0,
                ..
            }
        ));
        assert!(store.group(&group.id).unwrap().history.is_empty());
        assert_eq!(store.wallet().balance("L").unwrap(), 50_000);
    }
}
