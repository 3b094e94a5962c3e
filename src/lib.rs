//! Varbit Recorder - change detection for bit-packed host state.
//!
//! The host application keeps a large array of integer containers, each
//! packing several small fields ("variable bits"). This library shadows that
//! array, reports every field whose value changed, and forwards the changes
//! once per host tick to an HTTP collector.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Varbit Recorder                         │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  container changed      ┌────────────┐   ┌──────────────┐        │
//! │  ───────────────────────▶ FieldIndex │──▶│   Snapshot   │        │
//! │                         └────────────┘   │ prev vs cur  │        │
//! │                                          └──────┬───────┘        │
//! │                                                 ▼                │
//! │  time step             ┌──────────────┐  ┌──────────────┐        │
//! │  ──────────────────────▶    Flush     │◀─│ ChangeBuffer │        │
//! │                        └──────┬───────┘  └──────────────┘        │
//! │                               ▼                                  │
//! │                        ┌──────────────┐                          │
//! │                        │  Dispatcher  │──▶ POST collector        │
//! │                        └──────────────┘                          │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use varbit_recorder::{
//!     DispatchConfig, FieldDescriptor, HttpDispatcher, Recorder, SessionControl, SimulatedHost,
//! };
//!
//! let host = Arc::new(SimulatedHost::from_catalog(
//!     vec![FieldDescriptor::new(1, 0, 0, 3)],
//!     Vec::new(),
//! ));
//! let dispatcher = HttpDispatcher::with_runtime(DispatchConfig::new(
//!     "http://localhost:3001/updateMany",
//! ))
//! .expect("Failed to create dispatcher");
//!
//! let recorder = Recorder::new(Arc::clone(&host), dispatcher);
//! recorder.start().expect("Failed to start recording");
//!
//! host.set_field(&host.catalog()[0], 5);
//! recorder.on_field_container_changed(0);
//! recorder.on_time_step(host.advance_tick());
//! ```

pub mod config;
pub mod core;
pub mod dispatch;
pub mod host;
pub mod recorder;
pub mod session;
pub mod stats;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{ChangeBuffer, ChangeEvent, FieldIndex, NameTable, SnapshotStore};
pub use dispatch::{
    BatchPayload, BatchSink, DispatchConfig, DispatchError, HttpDispatcher, MemorySink,
};
pub use host::{FieldDescriptor, FieldName, Host, HostEvent, SimulatedHost};
pub use recorder::{CommitPolicy, Recorder};
pub use session::{SessionControl, SessionError, SessionState, SessionStatus};
pub use stats::{RecorderStats, SharedStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
