pub mod config;
pub mod context;
pub mod error;
pub mod platform;
pub mod report;
pub mod shutdown;
pub mod sleeper;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_utils;
