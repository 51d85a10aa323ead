//! Order → payment → enrollment pipeline for an online course marketplace,
//! with per-user lecture progress for enrolled courses.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
