//! HTTP front end of the desk queue: JSON API, live change stream and
//! Prometheus metrics over `ghiseu-core`.

pub mod api;
pub mod metrics;
pub mod state;

pub use api::create_router;
pub use state::AppState;
