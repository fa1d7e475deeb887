//! Element grounding: description → normalized screen point.
pub mod backend;
pub mod client;
pub mod retry;
pub mod strategy;
pub mod types;

pub use backend::GroundingBackend;
pub use client::{GroundedAction, GroundingClient};
pub use retry::{Attempt, RetryPolicy};
pub use strategy::GroundingStrategy;
pub use types::{GroundingResult, Point};
