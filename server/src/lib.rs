//! HTTP API for the CursorClip license hub.
//!
//! Every route is a thin JSON adapter over `cchub-license`. Store access is
//! synchronous, so handlers hop onto the blocking pool for it.

mod config;
mod error;
mod mailer;

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use cchub_license::{
    ActivationReply, CheckinReport, CheckinService, DeviceActivationManager, KeyGenerator,
    LicenseRecovery, NotificationDispatcher, Notifier, Plan, PublicBaseUrl, PurchaseEvent,
    PurchaseGate, UpdateResolver,
};
use cchub_store::LicenseStore;
use cchub_types::Processor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use config::{AddVersionArgs, Cli, Command, ServeArgs};
pub use error::{ApiError, ErrorBody};
pub use mailer::HttpMailNotifier;

struct Services {
    activation: DeviceActivationManager,
    checkin: CheckinService,
    recovery: LicenseRecovery,
    purchases: PurchaseGate,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    services: Arc<Services>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn LicenseStore>,
        base_url: PublicBaseUrl,
        plan: Plan,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let dispatcher = NotificationDispatcher::new(notifier);
        let updates = UpdateResolver::new(Arc::clone(&store), base_url);
        let services = Services {
            activation: DeviceActivationManager::new(Arc::clone(&store)),
            checkin: CheckinService::new(Arc::clone(&store), updates),
            recovery: LicenseRecovery::new(Arc::clone(&store), dispatcher.clone()),
            purchases: PurchaseGate::new(store, KeyGenerator::new(), plan, dispatcher),
        };
        Self {
            services: Arc::new(services),
        }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Services) -> T + Send + 'static,
        T: Send + 'static,
    {
        let services = Arc::clone(&self.services);
        tokio::task::spawn_blocking(move || f(&services))
            .await
            .map_err(ApiError::from)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivateRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "deviceId", default)]
    pub device_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateResponse {
    pub status: String,
    pub tier: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppCheckRequest {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(rename = "deviceId", default)]
    pub device_id: String,
    #[serde(default)]
    pub current_build_number: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestLicenseRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

async fn activate_handler(
    State(state): State<AppState>,
    payload: Result<Json<ActivateRequest>, JsonRejection>,
) -> Result<Json<ActivateResponse>, ApiError> {
    let Json(req) = payload?;
    let reply = state
        .run(move |s| {
            s.activation
                .activate_by_key(&req.email, &req.key, &req.device_id)
        })
        .await??;
    match reply {
        ActivationReply::Activated { tier, .. } => Ok(Json(ActivateResponse {
            status: "success".to_string(),
            tier,
        })),
        ActivationReply::Denied(denied) => Err(denied.into()),
    }
}

async fn app_check_handler(
    State(state): State<AppState>,
    payload: Result<Json<AppCheckRequest>, JsonRejection>,
) -> Result<Json<CheckinReport>, ApiError> {
    let Json(req) = payload?;
    let report = state
        .run(move |s| {
            s.checkin
                .checkin(req.key.as_deref(), &req.device_id, req.current_build_number)
        })
        .await?;
    Ok(Json(report))
}

async fn request_license_handler(
    State(state): State<AppState>,
    payload: Result<Json<RequestLicenseRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = payload?;
    state.run(move |s| s.recovery.request(&req.email)).await?;
    Ok(StatusResponse::ok())
}

/// Dodo Payments purchase webhook. The body is kept verbatim on the
/// transaction; only three fields are interpreted.
async fn dodo_purchase_handler(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(body) = payload?;
    let field = |name: &str| body.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
    let event = PurchaseEvent {
        processor: Processor::Dodo,
        processor_id: field("transaction_id"),
        buyer_email: field("customer_email"),
        buyer_name: field("customer_name"),
        payload: body,
    };
    state.run(move |s| s.purchases.process(event)).await??;
    Ok(StatusCode::OK)
}

async fn health_handler() -> Json<StatusResponse> {
    StatusResponse::ok()
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/activate", post(activate_handler))
        .route("/api/v1/app_check", post(app_check_handler))
        .route("/api/v1/request_license", post(request_license_handler))
        .route("/api/v1/health", get(health_handler))
        .route("/api/hooks/dodo_purchase", post(dodo_purchase_handler))
        .with_state(state)
}
