//! API handlers.

// Allow precision loss in handlers - amounts displayed are well within f64 precision
#![allow(clippy::cast_precision_loss)]

pub mod bridge;
pub mod drivers;
pub mod expenses;
pub mod feed;
pub mod health;
pub mod payments;
pub mod public;
pub mod trips;
