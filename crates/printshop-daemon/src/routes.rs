//! Axum router and all HTTP handlers for printshop-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! the tracing layer so tests can drive the bare router.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use chrono::Utc;
use printshop_orders::OrderError;
use printshop_schemas::OrderStatus;
use tracing::{info, warn};

use crate::{
    api_types::{
        CheckOrderForm, DashboardQuery, DashboardView, ErrorResponse, HealthResponse, IntakeView,
        LoginForm, LoginView, NameOrderForm, OrderView, QueueEntry, QueueView, SubmitOrderForm,
        UpdateColorsForm, UpdateOrderForm,
    },
    desk::DeskError,
    session::{AdminSession, SessionGate},
    state::AppState,
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // customer
        .route("/", get(intake))
        .route("/submit_order", post(submit_order))
        .route("/order/:id", get(view_order))
        .route("/check_order", post(check_order))
        .route("/name_order/:id", post(name_order))
        .route("/approve_price/:id", post(approve_price))
        .route("/deny_price/:id", post(deny_price))
        .route("/cancel_order/:id", post(cancel_order))
        .route("/orders", get(queue))
        // session
        .route("/login", get(login_page).post(login))
        .route("/logout", post(logout))
        // admin
        .route("/dashboard", get(dashboard))
        .route("/update_order/:id", post(update_order))
        .route("/update_colors", post(update_colors))
        .route("/delete_order/:id", post(delete_order))
        .route("/health", get(health))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Desk error rendered as a JSON `ErrorResponse`.
#[derive(Debug)]
pub struct ApiError(pub DeskError);

impl From<DeskError> for ApiError {
    fn from(e: DeskError) -> Self {
        Self(e)
    }
}

impl From<OrderError> for ApiError {
    fn from(e: OrderError) -> Self {
        Self(DeskError::Order(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DeskError::Order(OrderError::NotFound(_)) => StatusCode::NOT_FOUND,
            DeskError::Order(OrderError::Conflict(_)) => StatusCode::FORBIDDEN,
            DeskError::Order(OrderError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            DeskError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
                kind: self.0.kind(),
            }),
        )
            .into_response()
    }
}

fn to_order(id: &str) -> Redirect {
    Redirect::to(&format!("/order/{id}"))
}

fn to_dashboard() -> Redirect {
    Redirect::to("/dashboard")
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
            store_backend: st.desk.store_backend(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Customer
// ---------------------------------------------------------------------------

pub(crate) async fn intake(State(st): State<Arc<AppState>>) -> Json<IntakeView> {
    Json(IntakeView {
        filaments: st.desk.intake_options().await,
    })
}

pub(crate) async fn submit_order(
    State(st): State<Arc<AppState>>,
    Form(form): Form<SubmitOrderForm>,
) -> Result<Redirect, ApiError> {
    let order = st.desk.submit_order(form.into()).await?;
    Ok(to_order(&order.id))
}

pub(crate) async fn view_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let order = st.desk.get_order(&id).await?;
    Ok(Json(OrderView::from(&order)))
}

/// Lookup form on the landing page; ids are pasted by hand, so trim them.
pub(crate) async fn check_order(
    State(st): State<Arc<AppState>>,
    Form(form): Form<CheckOrderForm>,
) -> Result<Json<OrderView>, ApiError> {
    let order = st.desk.get_order(form.order_id.trim()).await?;
    Ok(Json(OrderView::from(&order)))
}

pub(crate) async fn name_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<NameOrderForm>,
) -> Result<Redirect, ApiError> {
    st.desk.rename_order(&id, &form.name).await?;
    Ok(to_order(&id))
}

pub(crate) async fn approve_price(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    st.desk.approve_price(&id).await?;
    Ok(to_order(&id))
}

pub(crate) async fn deny_price(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    st.desk.deny_price(&id).await?;
    Ok(to_order(&id))
}

pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    st.desk.cancel_order(&id).await?;
    Ok(to_order(&id))
}

pub(crate) async fn queue(State(st): State<Arc<AppState>>) -> Json<QueueView> {
    let orders = st
        .desk
        .active_queue()
        .await
        .into_iter()
        .map(|o| QueueEntry {
            name: o.name,
            status: o.status,
        })
        .collect();
    Json(QueueView { orders })
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub(crate) async fn login_page(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<LoginView> {
    let now = Utc::now().timestamp();
    Json(LoginView {
        authenticated: st.gate.session_from_headers(&headers, now).is_some(),
        error: None,
    })
}

pub(crate) async fn login(
    State(st): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Response {
    if !st.gate.check_password(&form.password) {
        warn!("admin login refused");
        return (
            StatusCode::UNAUTHORIZED,
            Json(LoginView {
                authenticated: false,
                error: Some("Incorrect password".to_string()),
            }),
        )
            .into_response();
    }

    let cookie = st.gate.issue(Utc::now().timestamp());
    info!("admin login");
    (
        [(header::SET_COOKIE, st.gate.set_cookie(&cookie))],
        to_dashboard(),
    )
        .into_response()
}

pub(crate) async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, SessionGate::clear_cookie())],
        Redirect::to("/"),
    )
}

// ---------------------------------------------------------------------------
// Admin
// ---------------------------------------------------------------------------

pub(crate) async fn dashboard(
    admin: AdminSession,
    State(st): State<Arc<AppState>>,
    Query(q): Query<DashboardQuery>,
) -> Json<DashboardView> {
    let include_terminal = q.include_terminal.unwrap_or(st.dashboard_include_terminal);
    let snap = st.desk.dashboard(&admin, include_terminal).await;
    Json(DashboardView {
        orders: snap.orders.iter().map(OrderView::from).collect(),
        filaments: snap.filaments,
        include_terminal,
        statuses: OrderStatus::ALL.iter().map(OrderStatus::as_str).collect(),
    })
}

pub(crate) async fn update_order(
    admin: AdminSession,
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
    Form(form): Form<UpdateOrderForm>,
) -> Result<Redirect, ApiError> {
    st.desk.update_order(&admin, &id, form.into()).await?;
    Ok(to_dashboard())
}

pub(crate) async fn update_colors(
    admin: AdminSession,
    State(st): State<Arc<AppState>>,
    Form(form): Form<UpdateColorsForm>,
) -> Result<Redirect, ApiError> {
    st.desk.update_filaments(&admin, &form.colors_list).await?;
    Ok(to_dashboard())
}

pub(crate) async fn delete_order(
    admin: AdminSession,
    State(st): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Redirect, ApiError> {
    st.desk.delete_order(&admin, &id).await?;
    Ok(to_dashboard())
}
