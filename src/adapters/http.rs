use {
    crate::AppState,
    crate::adapters::api_errors::ApiError,
    crate::adapters::healthpay::HealthPayClient,
    crate::domain::error::GatewayError,
    crate::domain::event::WebhookNotice,
    crate::domain::id::{ReferenceId, TransactionId},
    crate::domain::settings::GatewaySettings,
    crate::services::reconciliation::{InitiateOutcome, ReconcileOutcome},
    crate::services::settings_admin::{self, SettingsUpdate},
    crate::services::signature,
    axum::{
        Json,
        extract::{Form, Query, State},
        http::{HeaderMap, StatusCode},
        response::Redirect,
    },
    serde::Deserialize,
    serde_json::{Value, json},
    std::sync::Arc,
};

/// Hex HMAC-SHA-256 of the raw webhook body.
pub const SIGNATURE_HEADER: &str = "x-healthpay-signature";

const SUCCESS_PAGE: &str = "/payment/success";
const FAILED_PAGE: &str = "/payment/failed";

pub async fn health() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
pub struct PayRequest {
    pub order_id: i64,
}

/// Starts a payment attempt and hands the caller the processor's hosted
/// payment page URL. Refused outright while the gateway is disabled.
pub async fn pay(
    State(state): State<AppState>,
    Json(req): Json<PayRequest>,
) -> Result<Json<Value>, ApiError> {
    let persisted = state.settings.load().await?;
    let creds = state.resolver.resolve(persisted.as_ref());
    if !creds.enabled {
        return Err(GatewayError::Configuration("payment gateway is disabled".into()).into());
    }

    let gateway = state.gateway.read().await.clone();
    match state
        .engine
        .initiate_payment(gateway.as_ref(), req.order_id)
        .await?
    {
        InitiateOutcome::Redirect {
            order_id,
            payment_url,
        } => Ok(Json(json!({
            "status": "redirect",
            "order_id": order_id,
            "payment_url": payment_url,
        }))),
        InitiateOutcome::AlreadyPaid(order_id) => Ok(Json(json!({
            "status": "already_paid",
            "order_id": order_id,
        }))),
    }
}

/// Query/form parameters the processor appends when sending the user (or a
/// server-side POST) back to us.
#[derive(Debug, Deserialize)]
pub struct ReconcileParams {
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub reference_id: Option<String>,
}

/// Browser return leg: user lands here after the hosted payment page.
pub async fn payment_return(
    State(state): State<AppState>,
    Query(params): Query<ReconcileParams>,
) -> Redirect {
    finish(&state, params, "return").await
}

/// Server-to-server callback leg. Same reconcile path as the return leg,
/// different transport.
pub async fn payment_callback(
    State(state): State<AppState>,
    Form(params): Form<ReconcileParams>,
) -> Redirect {
    finish(&state, params, "callback").await
}

/// The user always ends up on a result page; reconcile failures are logged,
/// never surfaced as error responses on this leg.
async fn finish(state: &AppState, params: ReconcileParams, channel: &'static str) -> Redirect {
    match reconcile(state, params, channel).await {
        Ok(ReconcileOutcome::Completed(_) | ReconcileOutcome::AlreadyPaid(_)) => {
            Redirect::to(SUCCESS_PAGE)
        }
        Ok(outcome) => {
            tracing::info!(channel, ?outcome, "payment did not complete");
            Redirect::to(FAILED_PAGE)
        }
        Err(err) => {
            tracing::warn!(channel, error = %err, "inbound reconcile failed");
            Redirect::to(FAILED_PAGE)
        }
    }
}

async fn reconcile(
    state: &AppState,
    params: ReconcileParams,
    channel: &'static str,
) -> Result<ReconcileOutcome, GatewayError> {
    let transaction_id = TransactionId::new(params.transaction_id.unwrap_or_default())?;
    let reference_id = ReferenceId::new(params.reference_id.unwrap_or_default())?;

    let gateway = state.gateway.read().await.clone();
    state
        .engine
        .reconcile_inbound(gateway.as_ref(), &transaction_id, &reference_id, channel)
        .await
}

/// Signed webhook push from the processor. The signature covers the raw
/// body, so the body is taken as a string and parsed only after the HMAC
/// check passes.
#[tracing::instrument(skip_all)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let persisted = state.settings.load().await?;
    let creds = state.resolver.resolve(persisted.as_ref());

    if !signature::verify_webhook(
        body.as_bytes(),
        &signature,
        creds.webhook_secret.as_deref(),
        creds.mode,
    ) {
        return Err(GatewayError::Signature("webhook signature mismatch".into()).into());
    }

    let payload: Value = serde_json::from_str(&body)
        .map_err(|e| GatewayError::MalformedRequest(format!("invalid webhook body: {e}")))?;

    // Unknown event names are acknowledged so the processor stops retrying.
    let Some(notice) = WebhookNotice::parse(payload, signature)? else {
        return Ok(Json(json!({ "status": "success" })));
    };

    let outcome = state.engine.reconcile_webhook(&notice).await?;
    tracing::info!(?outcome, "webhook reconciled");
    Ok(Json(json!({ "status": "success" })))
}

// ── admin ───────────────────────────────────────────────────────────────────

pub async fn settings_show(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let settings = state
        .settings
        .load()
        .await?
        .unwrap_or_else(GatewaySettings::disabled_sandbox);
    Ok(Json(settings_admin::masked_view(&settings)))
}

/// Persists new settings and swaps in a client built from them, so the next
/// request already runs with the updated credentials.
pub async fn settings_update(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Value>, ApiError> {
    let settings = settings_admin::update_settings(state.settings.as_ref(), update).await?;

    let creds = state.resolver.resolve(Some(&settings));
    let client = HealthPayClient::new(creds, state.public_base_url.to_string())?;
    *state.gateway.write().await = Arc::new(client);

    Ok(Json(settings_admin::masked_view(&settings)))
}

pub async fn settings_test(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let gateway = state.gateway.read().await.clone();
    let valid = settings_admin::test_connection(state.settings.as_ref(), gateway.as_ref()).await?;

    let (status, message) = if valid {
        (StatusCode::OK, "credentials verified")
    } else {
        (StatusCode::BAD_REQUEST, "credential check failed")
    };
    Ok((status, Json(json!({ "success": valid, "message": message }))))
}
