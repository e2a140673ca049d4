use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use config::Config;
use services::events::EventBus;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub events: EventBus,
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new().route("/login", post(routes::auth::login));

    // Staff management and salaries are admin-only; everything else behind
    // authentication is open to any signed-in staff member.
    let staff_routes = Router::new()
        .route("/", get(routes::staff::list_staff).post(routes::staff::create_staff))
        .route(
            "/:id",
            get(routes::staff::get_staff)
                .put(routes::staff::update_staff)
                .delete(routes::staff::delete_staff),
        )
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::require_role::require_admin,
        ));

    let salary_routes = Router::new()
        .route(
            "/",
            get(routes::salaries::monthly_statement).post(routes::salaries::pay_salary),
        )
        .route("/history", get(routes::salaries::salary_history))
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::require_role::require_admin,
        ));

    let package_routes = Router::new()
        .route(
            "/",
            get(routes::packages::list_packages).post(routes::packages::create_package),
        )
        .route("/active", get(routes::packages::list_active))
        .route(
            "/:id",
            get(routes::packages::get_package)
                .put(routes::packages::update_package)
                .delete(routes::packages::delete_package),
        )
        .route("/:id/reserve", post(routes::packages::reserve))
        .route("/:id/unreserve", post(routes::packages::unreserve));

    let booking_routes = Router::new()
        .route(
            "/",
            get(routes::bookings::list_bookings).post(routes::bookings::create_booking),
        )
        .route("/debtors", get(routes::bookings::debtors))
        .route("/payments", get(routes::bookings::payments_in_range))
        .route("/addresses", get(routes::bookings::addresses))
        .route("/package/:package_id", get(routes::bookings::bookings_by_package))
        .route(
            "/:id",
            get(routes::bookings::get_booking)
                .put(routes::bookings::update_booking)
                .delete(routes::bookings::delete_booking),
        )
        .route("/:id/payments", post(routes::bookings::record_payment))
        .route(
            "/:id/members/:member_id",
            axum::routing::delete(routes::bookings::delete_member),
        );

    let expense_routes = Router::new()
        .route(
            "/",
            get(routes::expenses::list_expenses).post(routes::expenses::create_expense),
        )
        .route(
            "/:id",
            axum::routing::put(routes::expenses::update_expense)
                .delete(routes::expenses::delete_expense),
        );

    let dashboard_routes = Router::new()
        .route("/", get(routes::dashboard::dashboard))
        .route("/kassa", get(routes::dashboard::kassa));

    let protected = Router::new()
        .nest("/staff", staff_routes)
        .nest("/salaries", salary_routes)
        .nest("/packages", package_routes)
        .nest("/bookings", booking_routes)
        .nest("/expenses", expense_routes)
        .nest("/dashboard", dashboard_routes)
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    Router::new()
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1", protected)
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env());
    let db = db::create_pool(&config).await;

    let events = EventBus::default();
    services::events::spawn_logger(&events);

    let state = AppState {
        db,
        config: config.clone(),
        events,
    };
    services::scheduler::spawn_daily_sweep(state.clone());

    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(%addr, "travel office api listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server port");
    axum::serve(listener, app)
        .await
        .expect("Server error");
}
