//! HTTP handlers, organised by domain

pub mod health;
pub mod import_session;
