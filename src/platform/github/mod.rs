mod client;
pub mod mapper;

pub use client::{classify_failure, GitHubPlatform};
