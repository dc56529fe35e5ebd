//! HTTP surface for the dashlens lineage/observability engine.
//!
//! Three read endpoints and a small cache-admin surface over the engine in
//! the `dashlens` crate:
//!
//! - `GET /dag/:id` - enriched lineage view with per-node broad checks
//! - `POST /dag/:id?action=invalidate` - drop cached views for a node
//! - `GET /errors/:id` - classified test report
//! - `GET /cache/stats`, `POST /cache/clear` - cache administration
//! - `GET /`, `/health`, `/ready`, `/metrics` - operational surface
//!
//! Successful reads carry `X-Cache`, `X-Compute-Time-Ms` and
//! `Cache-Control` headers; errors are `{error, message}` bodies with
//! 400/404/503/500 mapping. Access control is out of scope and assumed to
//! live in the surrounding deployment layer.

pub mod error;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ErrorBody, Result};
pub use server::{ApiConfig, ApiServer};
pub use state::{AppState, ServerConfig};
