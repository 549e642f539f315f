use crate::api_client::DashboardApi;
use crate::config::Config;
use crate::errors::DashboardError;
use crate::export::{self, CsvRecord};
use crate::filters;
use crate::messaging::{
    self, Banner, MessageForm, TelegramKind, WhatsAppKind, SEND_FAILED, TELEGRAM_SENT,
    WHATSAPP_SENT,
};
use crate::polling::{Mounted, Phase, PollingStore, RefreshOutcome, StoreState};
use crate::resources::*;
use crate::settings::{self, SettingsUpdate, SAVE_FAILED, SETTINGS_SAVED};
use crate::views::{self, BranchQuery, CustomerQuery, GradedScore, LoanQuery, ScoringQuery};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client for the dashboard backend, used directly by the action routes.
    pub api: DashboardApi,
    pub overview: Arc<PollingStore<OverviewResources>>,
    pub analytics: Arc<PollingStore<AnalyticsResources>>,
    pub branches: Arc<PollingStore<BranchResources>>,
    pub customers: Arc<PollingStore<CustomerResources>>,
    pub loans: Arc<PollingStore<LoanResources>>,
    pub scoring: Arc<PollingStore<ScoringResources>>,
    pub reports: Arc<PollingStore<ReportResources>>,
    pub messaging: Arc<PollingStore<MessagingResources>>,
    pub settings: Arc<PollingStore<SettingsResources>>,
    /// Score calculation and the per-customer result cache.
    pub credit_scoring: views::CreditScoring,
}

/// Every view's mount guard. Dropping it unmounts all views.
pub struct MountedViews {
    _overview: Mounted<OverviewResources>,
    _analytics: Mounted<AnalyticsResources>,
    _branches: Mounted<BranchResources>,
    _customers: Mounted<CustomerResources>,
    _loans: Mounted<LoanResources>,
    _scoring: Mounted<ScoringResources>,
    _reports: Mounted<ReportResources>,
    _messaging: Mounted<MessagingResources>,
    _settings: Mounted<SettingsResources>,
}

impl AppState {
    /// Builds one unmounted store per view.
    pub fn new(config: Config, api: DashboardApi) -> Self {
        let interval = config.poll_interval();
        let timeout = config.request_timeout();

        Self {
            overview: Arc::new(PollingStore::new(
                OverviewResources::new(api.clone()),
                interval,
                timeout,
            )),
            analytics: Arc::new(PollingStore::new(
                AnalyticsResources::new(api.clone()),
                interval,
                timeout,
            )),
            branches: Arc::new(PollingStore::new(
                BranchResources::new(api.clone()),
                interval,
                timeout,
            )),
            customers: Arc::new(PollingStore::new(
                CustomerResources::new(api.clone(), config.customer_page_limit),
                interval,
                timeout,
            )),
            loans: Arc::new(PollingStore::new(
                LoanResources::new(api.clone(), config.loan_page_limit),
                interval,
                timeout,
            )),
            scoring: Arc::new(PollingStore::new(
                ScoringResources::new(api.clone(), config.scoring_customer_limit),
                interval,
                timeout,
            )),
            reports: Arc::new(PollingStore::new(
                ReportResources::new(api.clone()),
                interval,
                timeout,
            )),
            messaging: Arc::new(PollingStore::new(
                MessagingResources::new(api.clone()),
                interval,
                timeout,
            )),
            settings: Arc::new(PollingStore::new(
                SettingsResources::new(api.clone()),
                interval,
                timeout,
            )),
            credit_scoring: views::CreditScoring::new(api.clone()),
            api,
            config,
        }
    }

    /// Mounts every view. Must be called inside a Tokio runtime.
    pub fn mount_all(&self) -> MountedViews {
        MountedViews {
            _overview: self.overview.mount(),
            _analytics: self.analytics.mount(),
            _branches: self.branches.mount(),
            _customers: self.customers.mount(),
            _loans: self.loans.mount(),
            _scoring: self.scoring.mount(),
            _reports: self.reports.mount(),
            _messaging: self.messaging.mount(),
            _settings: self.settings.mount(),
        }
    }

    /// Runs one refresh cycle of the named view.
    pub async fn refresh_view(&self, view: &str) -> Option<(RefreshOutcome, Option<String>)> {
        macro_rules! refresh {
            ($store:expr) => {{
                let outcome = $store.refresh().await;
                Some((outcome, $store.snapshot().error))
            }};
        }

        match view {
            "overview" => refresh!(self.overview),
            "analytics" => refresh!(self.analytics),
            "branches" => refresh!(self.branches),
            "customers" => refresh!(self.customers),
            "loans" => refresh!(self.loans),
            "credit-scoring" => refresh!(self.scoring),
            "reports" => refresh!(self.reports),
            "messaging" => refresh!(self.messaging),
            "settings" => refresh!(self.settings),
            _ => None,
        }
    }

    fn mounted_views(&self) -> serde_json::Value {
        json!({
            "overview": self.overview.is_mounted(),
            "analytics": self.analytics.is_mounted(),
            "branches": self.branches.is_mounted(),
            "customers": self.customers.is_mounted(),
            "loans": self.loans.is_mounted(),
            "credit-scoring": self.scoring.is_mounted(),
            "reports": self.reports.is_mounted(),
            "messaging": self.messaging.is_mounted(),
            "settings": self.settings.is_mounted(),
        })
    }
}

// ============ Rendering ============

/// Staleness markers that travel with every rendered model.
pub struct Freshness<'s> {
    view: &'static str,
    refreshing: bool,
    last_error: Option<&'s str>,
    revision: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct ViewResponse<'s, M> {
    view: &'static str,
    refreshing: bool,
    last_error: Option<&'s str>,
    revision: Option<DateTime<Utc>>,
    data: M,
}

impl Freshness<'_> {
    pub fn respond<M: Serialize>(self, data: M) -> Response {
        Json(ViewResponse {
            view: self.view,
            refreshing: self.refreshing,
            last_error: self.last_error,
            revision: self.revision,
            data,
        })
        .into_response()
    }
}

/// Renders a store state by phase.
///
/// Content is served whenever a snapshot exists, even a stale one. Without
/// one the response is `202` while loading and `503` with the retry route
/// once the first load has failed.
pub fn render<T>(
    view: &'static str,
    state: &StoreState<T>,
    build: impl FnOnce(&T, Freshness<'_>) -> Response,
) -> Response {
    match state.phase() {
        Phase::Ready {
            data,
            refreshing,
            last_error,
        } => build(
            data,
            Freshness {
                view,
                refreshing,
                last_error,
                revision: state.revision,
            },
        ),
        Phase::Loading => (
            StatusCode::ACCEPTED,
            Json(json!({ "view": view, "status": "loading" })),
        )
            .into_response(),
        Phase::Failed(message) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "view": view,
                "status": "error",
                "error": message,
                "retry": format!("/refresh/{}", view),
            })),
        )
            .into_response(),
    }
}

/// The snapshot, or the error matching why there is none.
fn require<'s, T>(view: &str, state: &'s StoreState<T>) -> Result<&'s T, DashboardError> {
    match state.phase() {
        Phase::Ready { data, .. } => Ok(data),
        Phase::Loading => Err(DashboardError::NotReady(view.to_string())),
        Phase::Failed(message) => Err(DashboardError::Unavailable(message.to_string())),
    }
}

fn csv_download<T: CsvRecord>(view: &str, rows: &[&T]) -> Result<Response, DashboardError> {
    let body = export::to_csv(rows)?;
    let filename = export::export_filename(view, Utc::now().date_naive());
    tracing::info!("Exporting {} {} rows as {}", rows.len(), view, filename);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response())
}

fn banner_response(result: Result<(), DashboardError>, success: &str, fallback: &str) -> Response {
    let banner = Banner::from_result(&result, success, fallback);
    let status = match &result {
        Ok(()) => StatusCode::OK,
        Err(e) if !e.is_request_failure() => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::BAD_GATEWAY,
    };
    (status, Json(banner)).into_response()
}

// ============ Routes ============

/// Health check endpoint.
///
/// Returns the service status, version and which views are mounted.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kechita-dashboard",
            "version": env!("CARGO_PKG_VERSION"),
            "backend": state.api.base_url(),
            "poll_interval_secs": state.config.poll_interval_secs,
            "views": state.mounted_views(),
        })),
    )
}

/// GET /views/overview
pub async fn overview_view(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.overview.snapshot();
    render("overview", &snapshot, |data, fresh| {
        fresh.respond(views::overview(data))
    })
}

/// GET /views/analytics
pub async fn analytics_view(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.analytics.snapshot();
    render("analytics", &snapshot, |data, fresh| {
        fresh.respond(views::analytics(data))
    })
}

/// GET /views/branches?search=&rate=&selected=
pub async fn branches_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BranchQuery>,
) -> Response {
    let snapshot = state.branches.snapshot();
    render("branches", &snapshot, |data, fresh| {
        fresh.respond(views::branches(data, &query))
    })
}

/// GET /views/branches/export.csv
pub async fn export_branches(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BranchQuery>,
) -> Result<Response, DashboardError> {
    let snapshot = state.branches.snapshot();
    let branches = require("branches", &snapshot)?;
    csv_download("branches", &filters::apply(branches, &query.spec()))
}

/// GET /views/customers?search=&branch=
pub async fn customers_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CustomerQuery>,
) -> Response {
    let snapshot = state.customers.snapshot();
    render("customers", &snapshot, |data, fresh| {
        fresh.respond(views::customers(data, &query))
    })
}

/// GET /views/customers/export.csv
pub async fn export_customers(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CustomerQuery>,
) -> Result<Response, DashboardError> {
    let snapshot = state.customers.snapshot();
    let data = require("customers", &snapshot)?;
    csv_download("customers", &filters::apply(&data.page.customers, &query.spec()))
}

/// GET /views/loans?search=&branch=&status=
pub async fn loans_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> Response {
    let snapshot = state.loans.snapshot();
    render("loans", &snapshot, |data, fresh| {
        fresh.respond(views::loans(data, &query))
    })
}

/// GET /views/loans/export.csv
pub async fn export_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanQuery>,
) -> Result<Response, DashboardError> {
    let snapshot = state.loans.snapshot();
    let data = require("loans", &snapshot)?;
    csv_download("loans", &filters::apply(&data.page.loans, &query.spec()))
}

/// GET /views/credit-scoring?search=&risk=
pub async fn credit_scoring_view(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ScoringQuery>,
) -> Response {
    let snapshot = state.scoring.snapshot();
    let model = match &snapshot.data {
        Some(page) => Some(state.credit_scoring.model(page, &query).await),
        None => None,
    };
    render("credit-scoring", &snapshot, move |_, fresh| fresh.respond(model))
}

/// POST /actions/credit-score/:customer_id
pub async fn calculate_score(
    State(state): State<Arc<AppState>>,
    Path(customer_id): Path<String>,
) -> Result<Json<GradedScore>, DashboardError> {
    tracing::info!("POST credit score - customer_id: {}", customer_id);
    let scored = state.credit_scoring.calculate(&customer_id).await?;
    Ok(Json(scored))
}

/// GET /views/reports
pub async fn reports_view(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.reports.snapshot();
    render("reports", &snapshot, |data, fresh| {
        fresh.respond(views::reports(data))
    })
}

/// GET /views/messaging
pub async fn messaging_view(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.messaging.snapshot();
    render("messaging", &snapshot, |data, fresh| {
        fresh.respond(views::messaging(data))
    })
}

/// GET /views/settings
pub async fn settings_view(State(state): State<Arc<AppState>>) -> Response {
    let snapshot = state.settings.snapshot();
    render("settings", &snapshot, |data, fresh| {
        fresh.respond(views::settings(data))
    })
}

/// POST /refresh/:view
///
/// Manual refresh, also the retry action of a failed first load.
pub async fn refresh_view(
    State(state): State<Arc<AppState>>,
    Path(view): Path<String>,
) -> Response {
    tracing::info!("Manual refresh requested for {}", view);
    match state.refresh_view(&view).await {
        Some((outcome, error)) => Json(json!({
            "view": view,
            "outcome": outcome,
            "error": error,
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("Unknown view '{}'", view) })),
        )
            .into_response(),
    }
}

/// POST /actions/whatsapp/:kind?to_number=&branch_name=
pub async fn send_whatsapp(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(form): Query<MessageForm>,
) -> Response {
    let result = match kind.parse::<WhatsAppKind>() {
        Ok(kind) => messaging::send_whatsapp(&state.api, kind, &form).await,
        Err(e) => Err(e),
    };
    banner_response(result, WHATSAPP_SENT, SEND_FAILED)
}

/// POST /actions/telegram/:kind?branch_name=
pub async fn send_telegram(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Query(form): Query<MessageForm>,
) -> Response {
    let result = match kind.parse::<TelegramKind>() {
        Ok(kind) => messaging::send_telegram(&state.api, kind, &form).await,
        Err(e) => Err(e),
    };
    banner_response(result, TELEGRAM_SENT, SEND_FAILED)
}

/// POST /actions/settings
///
/// A successful save refreshes the settings view so the configured flags
/// reflect the new credentials.
pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    Json(update): Json<SettingsUpdate>,
) -> Response {
    let result = settings::save(&state.api, &update).await;
    if result.is_ok() {
        state.settings.refresh().await;
    }
    banner_response(result, SETTINGS_SAVED, SAVE_FAILED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn respond_ok(data: &u8, fresh: Freshness<'_>) -> Response {
        fresh.respond(*data)
    }

    #[test]
    fn test_render_by_phase() {
        let mut state: StoreState<u8> = StoreState::default();
        assert_eq!(
            render("overview", &state, respond_ok).status(),
            StatusCode::ACCEPTED
        );

        state.error = Some("Request failed: connection refused".to_string());
        assert_eq!(
            render("overview", &state, respond_ok).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );

        // Stale data still renders.
        state.data = Some(3);
        assert_eq!(render("overview", &state, respond_ok).status(), StatusCode::OK);
    }

    #[test]
    fn test_require_maps_phase_to_error() {
        let mut state: StoreState<u8> = StoreState::default();
        assert!(matches!(
            require("loans", &state),
            Err(DashboardError::NotReady(_))
        ));

        state.error = Some("boom".to_string());
        assert!(matches!(
            require("loans", &state),
            Err(DashboardError::Unavailable(_))
        ));

        state.data = Some(1);
        assert_eq!(require("loans", &state).unwrap(), &1);
    }

    #[test]
    fn test_banner_status_codes() {
        let ok = banner_response(Ok(()), SETTINGS_SAVED, SAVE_FAILED);
        assert_eq!(ok.status(), StatusCode::OK);

        let invalid = banner_response(
            Err(DashboardError::Validation("bad number".to_string())),
            WHATSAPP_SENT,
            SEND_FAILED,
        );
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let upstream = banner_response(
            Err(DashboardError::Transport("reset".to_string())),
            WHATSAPP_SENT,
            SEND_FAILED,
        );
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_csv_download_headers() {
        let response = csv_download::<crate::models::BranchMetric>("branches", &[]).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"kechita-branches-"));
        assert!(disposition.ends_with(".csv\""));
    }
}
