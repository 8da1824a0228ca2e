//! Trade pipeline - read, parse, clean, write

pub mod clean;
pub mod fetch;
pub mod parse;
pub mod patterns;
pub mod types;
pub mod utils;
pub mod write;

pub use types::*;
