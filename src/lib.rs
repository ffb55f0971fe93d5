//! Structural decoder for dex files.
//!
//! [`file::DexFile::from_raw_parts`] turns a byte buffer into a tree of
//! [`file::Component`]s that mirrors the layout of the file: the header, the
//! index tables, the class definitions, the map list and the data-pool blocks
//! reachable through offsets.

use std::result;

pub mod error;
pub mod file;
pub mod leb128;
pub mod utf;

pub mod desc_names;

pub type Result<T> = result::Result<T, error::DexError>;
