//! Dashboard backend — customers, orders, campaigns, delivery receipts and
//! the campaign assistant over REST.
//!
//! Data lives in the in-memory store; the delivery pipeline runs in-process.

pub mod auth;
pub mod handlers;
pub mod models;
pub mod router;

pub use handlers::ManagementState;
pub use router::management_router;
