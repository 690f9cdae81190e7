pub mod backoff;
pub mod filter;
pub mod reconcile;
pub mod types;
