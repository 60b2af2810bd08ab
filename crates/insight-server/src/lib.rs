//! HTTP service for stock insights
//!
//! Exposes the insight orchestrator over JSON:
//!
//! - `POST /summary` - price, trend chart, headlines and an AI summary for a symbol
//! - `GET /history` - the shared conversation history
//! - `GET /health` - liveness and current history length

pub mod error;
pub mod router;

pub use error::ApiError;
pub use router::{AppState, insight_router};
