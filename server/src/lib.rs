//! Findo server library
//!
//! Pharmacy directory and medicine search backend.

pub mod api;
pub mod app;
pub mod core;
pub mod data;
pub mod domain;
pub mod utils;
