//! Learning-content file server.
//!
//! Files are stored under their MD5 checksum and served back with a readable
//! download name derived from the content title and format preset.

pub mod api;
pub mod models;
pub mod utils;
