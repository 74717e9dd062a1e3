//! CORS policy for browser clients, driven by an origin allow-list.
//!
//! Note:
//! - CORS is enforced by browsers. Native mobile apps and server-to-server calls are not
//!   restricted by CORS, and requests without an `Origin` header always pass.
//! - This middleware should be applied at the Router level (not inside handlers).
//!
//! Layering (outermost first):
//! - guard: rejects requests whose origin is not allowed (403, no CORS headers) and turns
//!   successful preflight responses into `204 No Content`.
//! - `CorsLayer`: sets the actual CORS response headers.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, Method, StatusCode, header, request::Parts};
use axum::middleware::{self, Next};
use axum::response::Response;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::error::AppError;
use crate::policy::{Environment, OriginPolicy, SmartCorsOptions};

pub const ALLOWED_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

pub const ALLOWED_HEADERS: [header::HeaderName; 2] = [header::CONTENT_TYPE, header::AUTHORIZATION];

/// Assembled CORS policy, cheap to clone.
#[derive(Clone, Debug)]
pub struct SmartCors {
    policy: Arc<OriginPolicy>,
}

impl SmartCors {
    pub fn new(options: &SmartCorsOptions, env: &Environment) -> Self {
        Self {
            policy: Arc::new(OriginPolicy::new(options, env)),
        }
    }

    pub fn policy(&self) -> &OriginPolicy {
        &self.policy
    }

    /// Header-setting layer. Origins are checked against the same policy as the guard.
    pub fn cors_layer(&self) -> CorsLayer {
        let policy = self.policy.clone();
        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _req: &Parts| {
            origin
                .to_str()
                .map(|o| policy.is_allowed(Some(o)))
                .unwrap_or(false)
        });

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_credentials(self.policy.allow_credentials())
            .allow_methods(ALLOWED_METHODS)
            .allow_headers(ALLOWED_HEADERS)
    }
}

/// Build a [`SmartCors`] using `ALLOWED_ORIGINS` / `APP_ENV` from the process environment.
pub fn smartcors(options: &SmartCorsOptions) -> SmartCors {
    SmartCors::new(options, &Environment::from_env())
}

/// Apply the CORS policy to the given Router.
pub fn apply<S>(router: Router<S>, cors: &SmartCors) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(cors.cors_layer())
        .layer(middleware::from_fn_with_state(cors.policy.clone(), guard))
}

async fn guard(
    State(policy): State<Arc<OriginPolicy>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let decision = match req.headers().get(header::ORIGIN) {
        None => policy.decide(None),
        Some(value) => match value.to_str() {
            Ok(origin) => policy.decide(Some(origin)),
            // Cannot equal any configured entry.
            Err(_) => Err(AppError::OriginRejected),
        },
    };

    decision.inspect_err(|_| {
        tracing::warn!(
            origin = ?req.headers().get(header::ORIGIN),
            method = %req.method(),
            uri = %req.uri(),
            "cross-origin request rejected"
        );
    })?;

    let is_preflight = req.method() == Method::OPTIONS;
    let mut response = next.run(req).await;

    // CorsLayer answers every OPTIONS request itself with 200.
    if is_preflight && response.status() == StatusCode::OK {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }

    Ok(response)
}
