/**
 * Request Deadline Middleware
 *
 * Creates the request's `RequestScope` with the configured soft deadline and
 * stores it in the request extensions for handlers to pick up.
 *
 * The middleware holds a `DropGuard` for the scope while the inner service
 * runs. If the client disconnects, hyper drops the request future, the guard
 * drops with it and every unit working for the request sees the scope
 * cancelled. The guard also fires after a normal response, which stops any
 * unit still running after its handler returned.
 */

use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::backend::server::state::AppState;
use crate::backend::tasks::RequestScope;

/// Request deadline middleware
pub async fn deadline_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let scope = RequestScope::new(app_state.config.soft_timeout);
    let _guard = scope.drop_guard();

    request.extensions_mut().insert(scope);
    next.run(request).await
}

/// Extract the request's scope
///
/// Outside the deadline middleware (for example in unit tests of a bare
/// handler) an unbounded scope is returned instead.
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestScope>()
            .cloned()
            .unwrap_or_else(RequestScope::unbounded))
    }
}
