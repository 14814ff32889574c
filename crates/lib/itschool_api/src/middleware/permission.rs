//! Capability gate middleware. Must run after [`super::auth::authenticate`].

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use itschool_core::auth::capability::Capability;
use itschool_core::auth::gate;
use tracing::debug;

use crate::error::AppError;
use crate::middleware::auth::AuthenticatedUser;

/// Axum middleware: 403 unless the authenticated role grants the capability
/// given as state. A request that reaches here without an identity is a
/// routing defect and answers 500.
///
/// ```ignore
/// routes.route_layer(from_fn_with_state(Capability::AccessSettings, require_capability))
/// ```
pub async fn require_capability(
    State(capability): State<Capability>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request.extensions().get::<AuthenticatedUser>();
    if let Err(e) = gate::authorize(user.map(|u| &u.role), capability) {
        debug!(%capability, user_id = ?user.map(|u| u.user_id), "capability check failed");
        return Err(e.into());
    }
    Ok(next.run(request).await)
}
