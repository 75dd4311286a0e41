//! In-memory CRM document store — customers, orders, campaigns, delivery logs.
//!
//! Data lives in DashMap; each campaign document is updated in place under
//! its shard lock, which is what makes receipt counters atomic.

pub mod memory;
mod seed;

pub use memory::MemoryStore;
