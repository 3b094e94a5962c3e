//! Core change-detection building blocks.
//!
//! This module contains:
//! - Bit-field extraction over packed containers
//! - The per-session field index and name table
//! - The shadow snapshot of the host's container array
//! - The change buffer shared by the notification and tick paths

pub mod bitfield;
pub mod buffer;
pub mod index;
pub mod snapshot;

// Re-export commonly used types
pub use bitfield::{extract, insert};
pub use buffer::{ChangeBuffer, ChangeEvent};
pub use index::{FieldIndex, NameTable};
pub use snapshot::SnapshotStore;
