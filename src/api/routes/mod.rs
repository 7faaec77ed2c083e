//! REST route handlers

pub mod dashboard;
pub mod health;
pub mod monitors;
pub mod stats;
