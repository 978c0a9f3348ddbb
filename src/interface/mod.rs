//! Interface layer - HTTP surface of the service
//!
//! Provider callbacks (`/answer`, `/gather`), call control (`/call`,
//! `/hangup`, `/calls/*`), the agent webhook and operational endpoints.

pub mod api;
