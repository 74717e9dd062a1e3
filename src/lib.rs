//! Origin allow-list matching for cross-origin request filtering.
//!
//! ```no_run
//! use axum::{Router, routing::get};
//! use smartcors::{AllowListEntry, SmartCorsOptions, middleware::cors};
//!
//! let options = SmartCorsOptions {
//!     allowed_origins: vec![
//!         "https://app.example.com".into(),
//!         "*.example.com".into(),
//!         AllowListEntry::pattern(r"\.mydomain\.com$").unwrap(),
//!     ],
//!     allow_credentials: true,
//!     debug: false,
//! };
//!
//! let router: Router = Router::new().route("/", get(|| async { "ok" }));
//! let router = cors::apply(router, &cors::smartcors(&options));
//! ```
pub mod app;
pub mod config;
pub mod error;
pub mod matcher;
pub mod middleware;
pub mod policy;

pub use error::AppError;
pub use matcher::{AllowListEntry, match_origin};
pub use middleware::cors::{SmartCors, smartcors};
pub use policy::{Environment, OriginPolicy, SmartCorsOptions};
