//! The SQLite statistics store written by the desktop app
//!
//! - `locate`: find the store file on disk
//! - `schema`: the `user_stats` table definition
//! - `reader`: load every record with the fixed projection

pub mod locate;
pub mod reader;
pub mod schema;

pub use locate::{candidate_paths, locate_store};
pub use reader::StoreReader;
