//! API route handlers

pub mod admin;
pub mod auth;
pub mod favorites;
pub mod health;
pub mod medicines;
pub mod notifications;
pub mod pharmacies;
pub mod search;
