//! HTTP surface: request models and the upload handler.

pub mod handlers;
pub mod models;
