//! M3U/M3U8 playlist import
//!
//! Parses playlists into typed channel records, classifies each entry as TV,
//! radio or VOD, stages them for selection and imports the chosen subset into
//! a storage API.

pub mod config;
pub mod errors;
pub mod importer;
pub mod ingestor;
pub mod models;
pub mod session;
pub mod web;
