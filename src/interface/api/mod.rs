//! API interface implementations

pub mod call_dto;
pub mod call_handler;
pub mod metrics_handler;
pub mod router;
pub mod state;
pub mod voice_handler;
pub mod webhook_handler;

pub use metrics_handler::init_metrics;
pub use router::build_router;
pub use state::AppState;
