//! Medicly: request-time access gate for the patient/doctor dashboards.

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod profile;
pub mod session;
pub mod store;
