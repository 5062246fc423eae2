//! Core infrastructure for managing and accessing the study spot database.
pub mod database;
pub mod error;
pub mod loadable;
