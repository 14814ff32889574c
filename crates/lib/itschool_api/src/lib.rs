//! # itschool_api
//!
//! HTTP API library for the IT School backend: the `/auth` endpoints, the
//! authentication and capability middleware, and the gated route groups
//! that entity handlers are mounted into.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use itschool_core::auth::AuthContext;
use itschool_core::auth::accounts::AccountService;
use itschool_core::auth::authenticator::RequestAuthenticator;
use itschool_core::auth::capability::Capability;
use itschool_core::auth::reset::PasswordResetService;
use itschool_core::auth::service::AuthService;
use itschool_core::email::EmailSender;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};

use crate::handlers::{auth, health, reset, users};
use crate::middleware::permission::require_capability;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub reset: PasswordResetService,
    pub accounts: AccountService,
    pub authenticator: RequestAuthenticator,
}

impl AppState {
    pub fn new(ctx: AuthContext, mailer: Arc<dyn EmailSender>) -> Self {
        Self {
            auth: AuthService::new(ctx.clone()),
            reset: PasswordResetService::new(ctx.clone(), mailer),
            accounts: AccountService::new(ctx.clone()),
            authenticator: RequestAuthenticator::new(ctx),
        }
    }
}

/// Run embedded database migrations.
///
/// Delegates to `itschool_core::migrate::migrate()` which owns the migration files.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    itschool_core::migrate::migrate(pool).await
}

/// Routes mounted inside the capability-gated groups. Paths are relative to
/// the group prefix (`/settings`, `/curators`, `/manager`).
#[derive(Default)]
pub struct GatedRoutes {
    pub settings: Router<AppState>,
    pub curators: Router<AppState>,
    pub manager: Router<AppState>,
}

/// Builds the Axum router with the auth routes only.
pub fn router(state: AppState) -> Router {
    router_with(state, GatedRoutes::default())
}

/// Builds the Axum router, mounting `gated` inside the matching groups.
pub fn router_with(state: AppState, gated: GatedRoutes) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/", get(health::health_check))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/reset-password", post(reset::reset_password_handler))
        .route("/auth/new-password", post(reset::new_password_handler));

    let settings = Router::new()
        .route("/users", post(users::create_user_handler))
        .merge(gated.settings);

    // Route layers run outermost-last: authenticate wraps the capability gates.
    let protected = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/change-password", post(auth::change_password_handler))
        .merge(group("/settings", settings, Capability::AccessSettings))
        .merge(group("/curators", gated.curators, Capability::AccessCurator))
        .merge(group("/manager", gated.manager, Capability::AccessManager))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::auth::authenticate,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .fallback(health::not_found)
        .layer(cors)
        .with_state(state)
}

fn group(prefix: &str, routes: Router<AppState>, capability: Capability) -> Router<AppState> {
    if !routes.has_routes() {
        return Router::new();
    }
    Router::new().nest(
        prefix,
        routes.route_layer(from_fn_with_state(capability, require_capability)),
    )
}
