//! Shared helpers for canvastream integration tests.

pub mod containers;
pub mod fixtures;
pub mod mocks;
pub mod setup;
