//! Traffic Manager Library
//!
//! A tick-based road traffic simulation that runs headless.

pub mod simulation;
