#![deny(unsafe_code)]

use asusu_adapters::advisory_client;
use asusu_core::advisory::{AdviceBoard, AdviceReport, AdvisoryClient};
use asusu_core::config::{AdvisoryConfig, MockDelays, StoreConfig};
use asusu_core::journal::JournalEntry;
use asusu_core::locale::Locale;
use asusu_core::pending::{
    self, BvnVerification, CancelToken, LoanApplication, LoanKind, LoanReceipt, TransferRequest,
};
use asusu_core::rules::{self, GroupAction, Notification, StatusLabel};
use asusu_core::seed::DEMO_USER_ID;
use asusu_core::store::GroupStore;
use asusu_core::types::{AsusuGroup, Frequency, GroupDraft, Session};
use asusu_core::wallet::{InMemoryWallet, Wallet, WalletTransaction};
use asusu_core::AsusuError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub store: StoreConfig,
    pub advisory: AdvisoryConfig,
    pub gemini_api_key: Option<String>,
    /// Load the demo groups and credit the demo user's opening balance.
    pub seed_demo: bool,
    pub demo_user: String,
    pub delays: MockDelays,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            advisory: AdvisoryConfig::default(),
            gemini_api_key: None,
            seed_demo: true,
            demo_user: DEMO_USER_ID.to_string(),
            delays: MockDelays::default(),
        }
    }
}

#[derive(Clone)]
pub struct ServiceState {
    pub store: Arc<Mutex<GroupStore>>,
    pub wallet: Arc<dyn Wallet>,
    pub advisory: AdvisoryClient,
    pub advice_board: Arc<Mutex<AdviceBoard>>,
    pub delays: MockDelays,
}

impl ServiceState {
    pub fn bootstrap(config: ServiceConfig) -> Result<Self, ServiceError> {
        let ServiceConfig {
            store: store_config,
            advisory,
            gemini_api_key,
            seed_demo,
            demo_user,
            delays,
        } = config;

        let wallet: Arc<dyn Wallet> = Arc::new(InMemoryWallet::new());
        let store = if seed_demo {
            GroupStore::seeded(wallet.clone(), store_config, &Session::new(demo_user))?
        } else {
            GroupStore::new(wallet.clone(), store_config)
        };
        let advisory = advisory_client(&advisory, gemini_api_key.as_deref());

        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            wallet,
            advisory,
            advice_board: Arc::new(Mutex::new(AdviceBoard::new())),
            delays,
        })
    }

    pub fn with_advisory(mut self, advisory: AdvisoryClient) -> Self {
        self.advisory = advisory;
        self
    }
}

pub fn build_router(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/groups", get(list_groups).post(create_group))
        .route("/v1/groups/:group_id/join", post(join_group))
        .route("/v1/groups/:group_id/contribute", post(contribute))
        .route("/v1/groups/:group_id/disburse", post(disburse))
        .route("/v1/groups/:group_id/force-start", post(force_start))
        .route(
            "/v1/groups/:group_id/members/:member_id/remove",
            post(remove_member),
        )
        .route(
            "/v1/groups/:group_id/members/:member_id/turn",
            post(assign_turn),
        )
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/wallet", get(wallet_summary))
        .route("/v1/advice", post(request_advice))
        .route("/v1/journal", get(list_journal))
        .route("/v1/bvn/verify", post(verify_bvn))
        .route("/v1/loans", post(apply_loan))
        .route("/v1/transfers", post(transfer))
        .with_state(state)
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("core error: {0}")]
    Core(#[from] AsusuError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error(transparent)]
    Core(#[from] AsusuError),
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::Http {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

pub fn status_for(err: &AsusuError) -> StatusCode {
    match err {
        AsusuError::Validation(_) => StatusCode::BAD_REQUEST,
        AsusuError::NotFound(_) => StatusCode::NOT_FOUND,
        AsusuError::CapacityExceeded { .. }
        | AsusuError::AlreadyMember { .. }
        | AsusuError::NotAMember { .. }
        | AsusuError::AlreadyContributed { .. }
        | AsusuError::InvalidState(_)
        | AsusuError::Cancelled(_) => StatusCode::CONFLICT,
        AsusuError::Unauthorized(_) => StatusCode::FORBIDDEN,
        AsusuError::InsufficientFunds { .. } => StatusCode::PAYMENT_REQUIRED,
        AsusuError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
        AsusuError::Journal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Http { status, message } => (status, message),
            ApiError::Core(err) => (status_for(&err), err.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// A group plus the fields the group screens derive for the viewing user.
#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    #[serde(flatten)]
    pub group: AsusuGroup,
    pub status_label: StatusLabel,
    pub progress_percent: f64,
    pub pot_total: u64,
    pub payout_amount: u64,
    pub is_member: bool,
    pub has_contributed: bool,
    pub actions: Vec<GroupAction>,
}

impl GroupView {
    pub fn new(group: AsusuGroup, user_id: &str, locale: Locale) -> Self {
        Self {
            status_label: rules::status_label(group.status, locale),
            progress_percent: rules::progress_percent(&group),
            pot_total: rules::pot_total(&group),
            payout_amount: rules::payout_amount(&group),
            is_member: rules::is_member(&group, user_id),
            has_contributed: rules::has_contributed_this_cycle(&group, user_id),
            actions: rules::available_actions(&group, user_id),
            group,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ViewerQuery {
    user_id: Option<String>,
    locale: Option<String>,
}

impl ViewerQuery {
    fn user_id(&self) -> Result<&str, ApiError> {
        self.user_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("user_id is required"))
    }

    fn locale(&self) -> Result<Locale, ApiError> {
        parse_locale(self.locale.as_deref())
    }
}

fn parse_locale(tag: Option<&str>) -> Result<Locale, ApiError> {
    match tag {
        None => Ok(Locale::default()),
        Some(tag) => Locale::parse(tag).ok_or_else(|| {
            ApiError::bad_request(format!("unsupported locale '{}'; expected en or ha", tag))
        }),
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ActorBody {
    user_id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    locale: Option<String>,
}

impl ActorBody {
    fn session(&self) -> Result<Session, ApiError> {
        if self.user_id.trim().is_empty() {
            return Err(ApiError::bad_request("user_id is required"));
        }
        let session = Session::new(self.user_id.clone());
        Ok(match &self.display_name {
            Some(name) if !name.trim().is_empty() => session.with_display_name(name.clone()),
            _ => session,
        })
    }

    fn locale(&self) -> Result<Locale, ApiError> {
        parse_locale(self.locale.as_deref())
    }
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    groups: usize,
    journal_verified: bool,
    advisory: String,
}

async fn health(State(state): State<ServiceState>) -> Json<HealthResponse> {
    let store = state.store.lock().await;
    Json(HealthResponse {
        status: "ok",
        service: "asusu-service",
        groups: store.groups().len(),
        journal_verified: store.journal().verify_chain(),
        advisory: state.advisory.transport_name().to_string(),
    })
}

#[derive(Debug, Clone, Serialize)]
struct GroupsResponse {
    user_id: String,
    balance: u64,
    active_savings: u64,
    groups: Vec<GroupView>,
}

async fn list_groups(
    State(state): State<ServiceState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<GroupsResponse>, ApiError> {
    let user_id = query.user_id()?;
    let locale = query.locale()?;
    let store = state.store.lock().await;
    let snapshot = store.snapshot(&Session::new(user_id))?;

    Ok(Json(GroupsResponse {
        active_savings: rules::active_savings(&snapshot.groups, user_id),
        user_id: snapshot.user_id,
        balance: snapshot.balance,
        groups: snapshot
            .groups
            .into_iter()
            .map(|group| GroupView::new(group, user_id, locale))
            .collect(),
    }))
}

#[derive(Debug, Clone, Deserialize)]
struct CreateGroupBody {
    #[serde(flatten)]
    actor: ActorBody,
    name: String,
    contribution_amount: u64,
    frequency: Frequency,
    max_members: u32,
}

async fn create_group(
    State(state): State<ServiceState>,
    Json(body): Json<CreateGroupBody>,
) -> Result<(StatusCode, Json<GroupView>), ApiError> {
    let session = body.actor.session()?;
    let locale = body.actor.locale()?;
    let draft = GroupDraft::new(
        body.name,
        body.contribution_amount,
        body.frequency,
        body.max_members,
    );
    let group = state.store.lock().await.create_group(&session, draft)?;
    Ok((
        StatusCode::CREATED,
        Json(GroupView::new(group, &session.user_id, locale)),
    ))
}

async fn join_group(
    State(state): State<ServiceState>,
    Path(group_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state.store.lock().await.join_group(&session, &group_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn contribute(
    State(state): State<ServiceState>,
    Path(group_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state.store.lock().await.contribute(&session, &group_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn disburse(
    State(state): State<ServiceState>,
    Path(group_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state.store.lock().await.disburse(&session, &group_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn force_start(
    State(state): State<ServiceState>,
    Path(group_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state.store.lock().await.force_start(&session, &group_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn remove_member(
    State(state): State<ServiceState>,
    Path((group_id, member_id)): Path<(String, String)>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state
        .store
        .lock()
        .await
        .remove_member(&session, &group_id, &member_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn assign_turn(
    State(state): State<ServiceState>,
    Path((group_id, member_id)): Path<(String, String)>,
    Json(body): Json<ActorBody>,
) -> Result<Json<GroupView>, ApiError> {
    let session = body.session()?;
    let locale = body.locale()?;
    let group = state
        .store
        .lock()
        .await
        .assign_turn(&session, &group_id, &member_id)?;
    Ok(Json(GroupView::new(group, &session.user_id, locale)))
}

async fn list_notifications(
    State(state): State<ServiceState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let user_id = query.user_id()?;
    let locale = query.locale()?;
    let store = state.store.lock().await;
    Ok(Json(rules::notifications(store.groups(), user_id, locale)))
}

#[derive(Debug, Clone, Serialize)]
struct WalletResponse {
    user_id: String,
    balance: u64,
    active_savings: u64,
    transactions: Vec<WalletTransaction>,
}

async fn wallet_summary(
    State(state): State<ServiceState>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<WalletResponse>, ApiError> {
    let user_id = query.user_id()?;
    let active_savings = {
        let store = state.store.lock().await;
        rules::active_savings(store.groups(), user_id)
    };

    Ok(Json(WalletResponse {
        user_id: user_id.to_string(),
        balance: state.wallet.balance(user_id)?,
        active_savings,
        transactions: state.wallet.transactions(user_id)?,
    }))
}

#[derive(Debug, Clone, Deserialize)]
struct AdviceBody {
    context: String,
}

#[derive(Debug, Clone, Serialize)]
struct AdviceResponse {
    report: AdviceReport,
    /// `false` when a newer request already replaced this report on the board.
    published: bool,
}

async fn request_advice(
    State(state): State<ServiceState>,
    Json(body): Json<AdviceBody>,
) -> Json<AdviceResponse> {
    let ticket = state.advice_board.lock().await.issue();
    let report = state.advisory.advise(&body.context).await;
    let published = state
        .advice_board
        .lock()
        .await
        .publish(ticket, report.clone());
    Json(AdviceResponse { report, published })
}

#[derive(Debug, Clone, Deserialize)]
struct JournalQuery {
    group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct JournalResponse {
    verified: bool,
    total: usize,
    entries: Vec<JournalEntry>,
}

async fn list_journal(
    State(state): State<ServiceState>,
    Query(query): Query<JournalQuery>,
) -> Json<JournalResponse> {
    let store = state.store.lock().await;
    let journal = store.journal();
    let entries = match query.group_id.as_deref() {
        Some(group_id) => journal.entries_for_group(group_id).cloned().collect(),
        None => journal.entries().to_vec(),
    };
    Json(JournalResponse {
        verified: journal.verify_chain(),
        total: journal.len(),
        entries,
    })
}

#[derive(Debug, Clone, Deserialize)]
struct BvnBody {
    bvn: String,
}

async fn verify_bvn(
    State(state): State<ServiceState>,
    Json(body): Json<BvnBody>,
) -> Result<Json<BvnVerification>, ApiError> {
    let verified = pending::verify_bvn(&body.bvn, &state.delays, CancelToken::never()).await?;
    Ok(Json(verified))
}

#[derive(Debug, Clone, Deserialize)]
struct LoanBody {
    user_id: String,
    kind: LoanKind,
    amount: u64,
}

async fn apply_loan(
    State(state): State<ServiceState>,
    Json(body): Json<LoanBody>,
) -> Result<(StatusCode, Json<LoanReceipt>), ApiError> {
    let application = LoanApplication {
        applicant_id: body.user_id,
        kind: body.kind,
        amount: body.amount,
    };
    let receipt = pending::apply_loan(application, &state.delays, CancelToken::never()).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

async fn transfer(
    State(state): State<ServiceState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<WalletTransaction>, ApiError> {
    let posting = pending::transfer(
        state.wallet.as_ref(),
        &request,
        &state.delays,
        CancelToken::never(),
    )
    .await?;
    info!(user = %request.user_id, amount = request.amount, "transfer completed");
    Ok(Json(posting))
}

#[cfg(test)]
mod tests {
    use super::*;
    use asusu_adapters::FixedAdvisoryTransport;
    use asusu_core::seed::KATSINA_MARKET_WOMEN_ID;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn quiet_config() -> ServiceConfig {
        ServiceConfig {
            seed_demo: false,
            delays: MockDelays::immediate(),
            ..ServiceConfig::default()
        }
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create(app: &Router, leader: &str, max_members: u32) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/v1/groups",
            Some(json!({
                "user_id": leader,
                "name": "Sabon Gari Traders",
                "contribution_amount": 5000,
                "frequency": "Weekly",
                "max_members": max_members
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn full_cycle_over_http() {
        let state = ServiceState::bootstrap(quiet_config()).unwrap();
        state.wallet.credit("L", 20_000, "top up").unwrap();
        state.wallet.credit("M", 20_000, "top up").unwrap();
        let app = build_router(state);

        let group_id = create(&app, "L", 2).await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/join", group_id),
            Some(json!({ "user_id": "M" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Active");

        for user in ["L", "M"] {
            let (status, _) = send(
                &app,
                "POST",
                &format!("/v1/groups/{}/contribute", group_id),
                Some(json!({ "user_id": user })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/disburse", group_id),
            Some(json!({ "user_id": "M" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("leader"));

        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/disburse", group_id),
            Some(json!({ "user_id": "L" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "Completed");
        assert_eq!(body["is_withdrawn"], true);

        let (_, wallet) = send(&app, "GET", "/v1/wallet?user_id=L", None).await;
        assert_eq!(wallet["balance"], 25_000);
        assert_eq!(wallet["transactions"][0]["direction"], "credit");

        let (_, journal) = send(&app, "GET", &format!("/v1/journal?group_id={}", group_id), None).await;
        assert_eq!(journal["verified"], true);
        assert_eq!(journal["entries"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn unsupported_locale_rejects_before_mutation() {
        let state = ServiceState::bootstrap(quiet_config()).unwrap();
        state.wallet.credit("L", 20_000, "top up").unwrap();
        state.wallet.credit("M", 20_000, "top up").unwrap();
        let store = state.store.clone();
        let wallet = state.wallet.clone();
        let app = build_router(state);

        let group_id = create(&app, "L", 2).await;
        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/join", group_id),
            Some(json!({ "user_id": "M", "locale": "fr" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.lock().await.group(&group_id).unwrap().members, vec!["L"]);

        send(
            &app,
            "POST",
            &format!("/v1/groups/{}/join", group_id),
            Some(json!({ "user_id": "M" })),
        )
        .await;
        let (status, body) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/contribute", group_id),
            Some(json!({ "user_id": "L", "locale": "fr" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("fr"));
        assert!(store.lock().await.group(&group_id).unwrap().history.is_empty());
        assert_eq!(wallet.balance("L").unwrap(), 20_000);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/contribute", group_id),
            Some(json!({ "user_id": "L", "locale": "ha" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wallet.balance("L").unwrap(), 15_000);
    }

    #[tokio::test]
    async fn lifecycle_conflicts_map_to_status_codes() {
        let state = ServiceState::bootstrap(quiet_config()).unwrap();
        let app = build_router(state);
        let group_id = create(&app, "L", 2).await;

        let join = |user: &'static str| {
            let app = app.clone();
            let uri = format!("/v1/groups/{}/join", group_id);
            async move { send(&app, "POST", &uri, Some(json!({ "user_id": user }))).await }
        };
        assert_eq!(join("M").await.0, StatusCode::OK);
        assert_eq!(join("X").await.0, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            "POST",
            &format!("/v1/groups/{}/contribute", group_id),
            Some(json!({ "user_id": "M" })),
        )
        .await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

        let (status, _) = send(
            &app,
            "POST",
            "/v1/groups/missing/join",
            Some(json!({ "user_id": "M" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app,
            "POST",
            "/v1/groups",
            Some(json!({
                "user_id": "L",
                "name": "ab",
                "contribution_amount": 5000,
                "frequency": "Daily",
                "max_members": 3
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("3 characters"));
    }

    #[tokio::test]
    async fn seeded_groups_show_derived_fields_in_hausa() {
        let state = ServiceState::bootstrap(ServiceConfig {
            delays: MockDelays::immediate(),
            ..ServiceConfig::default()
        })
        .unwrap();
        let app = build_router(state);

        let (status, body) = send(
            &app,
            "GET",
            "/v1/groups?user_id=Fatima%20Abdullahi&locale=ha",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance"], 45_250);
        let market = &body["groups"][0];
        assert_eq!(market["id"], KATSINA_MARKET_WOMEN_ID);
        assert_eq!(market["status_label"]["label"], "Ana Kan Yi");
        assert_eq!(market["progress_percent"], 40.0);
        assert_eq!(
            market["actions"],
            json!(["contribute", "remove_member", "assign_turn"])
        );

        let (_, notes) = send(
            &app,
            "GET",
            "/v1/notifications?user_id=Fatima%20Abdullahi&locale=ha",
            None,
        )
        .await;
        assert_eq!(notes[0]["kind"], "contribution_due");

        let (status, _) = send(&app, "GET", "/v1/groups", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn advice_falls_back_without_key() {
        let app = build_router(ServiceState::bootstrap(quiet_config()).unwrap());
        let (status, body) = send(
            &app,
            "POST",
            "/v1/advice",
            Some(json!({ "context": "grain trader, weekly Asusu" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["score"], 620);
        assert_eq!(body["report"]["rating"], "Growing");
        assert_eq!(body["published"], true);
    }

    #[tokio::test]
    async fn advice_uses_configured_transport() {
        let state = ServiceState::bootstrap(quiet_config())
            .unwrap()
            .with_advisory(AdvisoryClient::new(Arc::new(FixedAdvisoryTransport::new(
                r#"{"score": 780, "rating": "Elite", "wealthTip": "tip", "marketOutlook": "outlook"}"#,
            ))));
        let app = build_router(state);
        let (_, body) = send(&app, "POST", "/v1/advice", Some(json!({ "context": "x" }))).await;
        assert_eq!(body["report"]["wealthTip"], "tip");
        assert_eq!(body["report"]["score"], 780);
    }

    #[tokio::test]
    async fn mocked_flows_validate_and_settle() {
        let state = ServiceState::bootstrap(ServiceConfig {
            delays: MockDelays::immediate(),
            ..ServiceConfig::default()
        })
        .unwrap();
        let app = build_router(state);

        let (status, _) = send(&app, "POST", "/v1/bvn/verify", Some(json!({ "bvn": "123" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            "/v1/loans",
            Some(json!({ "user_id": "Fatima Abdullahi", "kind": "Agri", "amount": 50000 })),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(body["reference"].as_str().unwrap().starts_with("LN-"));

        let (status, body) = send(
            &app,
            "POST",
            "/v1/transfers",
            Some(json!({
                "user_id": "Fatima Abdullahi",
                "bank_id": "opay",
                "account_number": "0123456789",
                "amount": 5250
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balance_after"], 40_000);
    }
}
