//! Host boundary for the recorder.
//!
//! The host application owns the live container array, the tick counter
//! and the field catalog. The recorder only reads from it through the
//! [`Host`] trait; notifications arrive as direct calls on the recorder.

pub mod sim;
pub mod types;

use std::sync::Arc;

// Re-export commonly used types
pub use sim::SimulatedHost;
pub use types::{FieldDescriptor, FieldName, HostEvent};

/// Read access to the host application's state.
///
/// Implementations must be callable from both the notification thread and
/// the tick thread.
pub trait Host: Send + Sync {
    /// Copy of the live container array.
    fn live_array(&self) -> Vec<i32>;

    /// Current host tick count.
    fn tick_count(&self) -> u32;

    /// Field definitions known to the host. Authoritative for the session
    /// being started; may differ between sessions.
    fn field_catalog(&self) -> Vec<FieldDescriptor>;

    /// Static id -> name table.
    fn field_names(&self) -> Vec<FieldName>;
}

impl<H: Host + ?Sized> Host for Arc<H> {
    fn live_array(&self) -> Vec<i32> {
        (**self).live_array()
    }

    fn tick_count(&self) -> u32 {
        (**self).tick_count()
    }

    fn field_catalog(&self) -> Vec<FieldDescriptor> {
        (**self).field_catalog()
    }

    fn field_names(&self) -> Vec<FieldName> {
        (**self).field_names()
    }
}
