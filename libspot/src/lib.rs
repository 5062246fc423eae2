//! This is a library that provides objects and functionality to help you keep
//! track of study spots (cafes, libraries, parks, ...) on a map and store them
//! inside of a database.

pub mod core;
pub mod marker;

pub use crate::core::database::Database;
pub use crate::core::error::Error;
pub use crate::core::error::Result;
