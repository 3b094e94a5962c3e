//! The recording session object.
//!
//! [`Recorder`] owns the session state, the shadow snapshot, the field index
//! and the change buffer, and is shared by the two host callback paths:
//!
//! ```text
//! on_field_container_changed ─▶ FieldIndex ─▶ extract(prev) vs extract(cur) ─▶ ChangeBuffer
//!                                                                                  │
//! on_time_step ─▶ advance tick ─▶ commit snapshot ─▶ drain ─▶ BatchSink (async) ◀──┘
//! ```
//!
//! Locking: `start`, `stop` and `set_session_id` take the session lock for
//! writing; both callbacks take it for reading. The snapshot and tick sit
//! behind an inner mutex so a refresh-and-diff never interleaves with a
//! commit. The change buffer needs no lock.

use crate::config::Config;
use crate::core::{ChangeBuffer, ChangeEvent, FieldIndex, NameTable, SnapshotStore};
use crate::dispatch::{BatchPayload, BatchSink};
use crate::host::{Host, HostEvent};
use crate::session::{
    new_session_id, validate_session_id, SessionControl, SessionError, SessionState,
    SessionStatus,
};
use crate::stats::{create_shared_stats, SharedStats};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// When the previous snapshot catches up with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitPolicy {
    /// Commit the whole array once per tick, after the tick's notifications.
    #[default]
    PerTick,
    /// Additionally commit each field as soon as its change is recorded.
    Eager,
}

/// Tick counter and snapshot, updated together.
#[derive(Debug, Default)]
struct Frame {
    tick: u32,
    snapshot: SnapshotStore,
}

#[derive(Debug)]
struct Session {
    state: SessionState,
    session_id: String,
    index: FieldIndex,
    names: NameTable,
    frame: Mutex<Frame>,
}

impl Session {
    fn frame(&self) -> MutexGuard<'_, Frame> {
        self.frame.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frame.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Change detector and batcher for one host.
pub struct Recorder<H, S> {
    host: H,
    sink: S,
    policy: CommitPolicy,
    session: RwLock<Session>,
    buffer: ChangeBuffer,
    stats: SharedStats,
}

impl<H: Host, S: BatchSink> Recorder<H, S> {
    /// Create an idle recorder with a random session id.
    pub fn new(host: H, sink: S) -> Self {
        Self {
            host,
            sink,
            policy: CommitPolicy::default(),
            session: RwLock::new(Session {
                state: SessionState::Idle,
                session_id: new_session_id(),
                index: FieldIndex::default(),
                names: NameTable::default(),
                frame: Mutex::new(Frame::default()),
            }),
            buffer: ChangeBuffer::new(),
            stats: create_shared_stats(),
        }
    }

    /// Create an idle recorder using the configured policy and session id.
    pub fn from_config(host: H, sink: S, config: &Config) -> Self {
        let recorder = Self::new(host, sink).with_commit_policy(config.commit_policy);
        match config.manual_session_id.as_deref().map(validate_session_id) {
            Some(Ok(id)) => recorder.with_session_id(id),
            Some(Err(e)) => {
                tracing::warn!("Ignoring configured session id: {}", e);
                recorder
            }
            None => recorder,
        }
    }

    pub fn with_commit_policy(mut self, policy: CommitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the initial session id.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id = session_id.into();
        self
    }

    /// Count activity in `stats` instead of a private counter set.
    pub fn with_stats(mut self, stats: SharedStats) -> Self {
        self.stats = stats;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn stats(&self) -> &SharedStats {
        &self.stats
    }

    pub fn commit_policy(&self) -> CommitPolicy {
        self.policy
    }

    pub fn is_recording(&self) -> bool {
        self.read_session().state.is_recording()
    }

    /// Tick stamped on changes detected now.
    pub fn tick(&self) -> u32 {
        self.read_session().frame().tick
    }

    /// Events waiting for the next flush.
    pub fn pending_events(&self) -> usize {
        self.buffer.len()
    }

    /// Route a host notification to the matching callback.
    pub fn handle_event(&self, event: HostEvent) {
        match event {
            HostEvent::ContainerChanged(key) => self.on_field_container_changed(key),
            HostEvent::TimeStep(tick) => self.on_time_step(tick),
        }
    }

    /// Notification path: diff every field packed into `container_key`.
    pub fn on_field_container_changed(&self, container_key: u32) {
        let session = self.read_session();
        if !session.state.is_recording() {
            return;
        }
        self.stats.record_notification();

        let live = self.host.live_array();
        let descriptors = session.index.lookup(container_key);
        if descriptors.is_empty() {
            tracing::trace!(container_key, "no fields indexed for container");
        }

        let mut frame = session.frame();
        let tick = frame.tick;
        frame.snapshot.refresh_current(&live);

        for descriptor in descriptors {
            let (old_value, new_value) = frame.snapshot.diff(descriptor);
            if old_value == new_value {
                continue;
            }
            if self.policy == CommitPolicy::Eager {
                frame.snapshot.commit_field(descriptor, new_value);
            }

            let name = session.names.resolve(descriptor.id);
            tracing::debug!(field = %name, old_value, new_value, tick, "field changed");
            self.stats.record_change();
            self.buffer.push(ChangeEvent::new(
                descriptor.id,
                name,
                old_value,
                new_value,
                tick,
            ));
        }
    }

    /// Tick path: advance the tick, commit the snapshot and flush the buffer.
    ///
    /// The tick advances and the snapshot commits in every state; only the
    /// flush depends on recording. An idle snapshot is empty.
    pub fn on_time_step(&self, tick: u32) {
        let session = self.read_session();
        {
            let mut frame = session.frame();
            frame.tick = tick;
            frame.snapshot.commit();
        }
        if !session.state.is_recording() {
            return;
        }

        let batch = self.buffer.drain();
        if batch.is_empty() {
            return;
        }
        let payload = BatchPayload::new(session.session_id.clone(), batch);
        drop(session);

        tracing::debug!(tick, events = payload.len(), "flushing batch");
        self.sink.submit(payload);
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: Host, S: BatchSink> SessionControl for Recorder<H, S> {
    fn set_session_id(&self, value: &str) -> Result<(), SessionError> {
        let mut session = self.write_session();
        if session.state.is_recording() {
            tracing::warn!(
                session_id = %session.session_id,
                "Ignoring session id change while recording"
            );
            return Err(SessionError::Busy);
        }
        session.session_id = validate_session_id(value)?;
        tracing::info!(session_id = %session.session_id, "session id set");
        Ok(())
    }

    fn session_id(&self) -> String {
        self.read_session().session_id.clone()
    }

    fn start(&self) -> Result<(), SessionError> {
        let mut session = self.write_session();
        if session.state.is_recording() {
            return Err(SessionError::AlreadyRecording);
        }

        session.index = FieldIndex::build(self.host.field_catalog());
        session.names = NameTable::build(self.host.field_names());

        let live = self.host.live_array();
        let tick = self.host.tick_count();
        let frame = session.frame_mut();
        frame.snapshot.initialize(live.len());
        frame.snapshot.refresh_current(&live);
        frame.snapshot.commit();
        frame.tick = tick;

        let stale = self.buffer.clear();
        session.state = SessionState::Recording;
        self.stats.record_session_started();

        tracing::info!(
            session_id = %session.session_id,
            fields = session.index.field_count(),
            containers = live.len(),
            tick,
            stale,
            "recording started"
        );
        Ok(())
    }

    fn stop(&self) {
        let mut session = self.write_session();
        if !session.state.is_recording() {
            return;
        }

        session.state = SessionState::Idle;
        session.frame_mut().snapshot.clear();
        let discarded = self.buffer.clear();
        let finished = std::mem::replace(&mut session.session_id, new_session_id());

        tracing::info!(
            session_id = %finished,
            next_session_id = %session.session_id,
            discarded,
            "recording stopped"
        );
    }

    fn status(&self) -> SessionStatus {
        let session = self.read_session();
        let tick = session.frame().tick;
        SessionStatus {
            session_id: session.session_id.clone(),
            state: session.state,
            tick,
            pending_events: self.buffer.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::MemorySink;
    use crate::host::{FieldDescriptor, FieldName, SimulatedHost};
    use std::sync::Arc;

    fn recorder() -> Recorder<Arc<SimulatedHost>, Arc<MemorySink>> {
        let host = Arc::new(SimulatedHost::from_catalog(
            vec![
                FieldDescriptor::new(100, 0, 0, 3),
                FieldDescriptor::new(101, 0, 4, 7),
            ],
            vec![FieldName {
                id: 100,
                name: "FIELD_A".to_string(),
            }],
        ));
        Recorder::new(host, Arc::new(MemorySink::new()))
    }

    #[test]
    fn test_starts_idle() {
        let recorder = recorder();
        assert!(!recorder.is_recording());
        assert_eq!(recorder.status().state, SessionState::Idle);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let recorder = recorder();
        recorder.start().unwrap();
        assert_eq!(recorder.start(), Err(SessionError::AlreadyRecording));
        assert!(recorder.is_recording());
    }

    #[test]
    fn test_set_session_id_only_while_idle() {
        let recorder = recorder();
        recorder.set_session_id("manual-1").unwrap();
        assert_eq!(recorder.session_id(), "manual-1");

        recorder.start().unwrap();
        assert_eq!(recorder.set_session_id("manual-2"), Err(SessionError::Busy));
        assert_eq!(recorder.session_id(), "manual-1");
    }

    #[test]
    fn test_stop_regenerates_session_id_and_is_idempotent() {
        let recorder = recorder();
        recorder.start().unwrap();
        let first = recorder.session_id();

        recorder.stop();
        let second = recorder.session_id();
        assert_ne!(first, second);
        assert!(!recorder.is_recording());

        recorder.stop();
        assert_eq!(recorder.session_id(), second);
        assert_eq!(recorder.status().state, SessionState::Idle);
    }

    #[test]
    fn test_start_takes_host_tick_and_baseline() {
        let recorder = recorder();
        let host = Arc::clone(recorder.host());
        host.advance_tick();
        host.advance_tick();
        host.set_container(0, 0x33);

        recorder.start().unwrap();
        assert_eq!(recorder.tick(), 2);

        // Values present before start are not reported.
        recorder.on_field_container_changed(0);
        assert_eq!(recorder.pending_events(), 0);
    }

    #[test]
    fn test_tick_advances_while_idle() {
        let recorder = recorder();
        recorder.on_time_step(7);
        assert_eq!(recorder.tick(), 7);
        assert_eq!(recorder.status().tick, 7);
        assert!(recorder.sink().is_empty());

        recorder.start().unwrap();
        recorder.stop();
        recorder.on_time_step(12);
        assert_eq!(recorder.status().tick, 12);
    }

    #[test]
    fn test_name_resolution_on_events() {
        let recorder = recorder();
        let host = Arc::clone(recorder.host());
        recorder.start().unwrap();

        host.set_container(0, 0x15);
        recorder.on_field_container_changed(0);
        recorder.on_time_step(1);

        let payloads = recorder.sink().take();
        let names: Vec<&str> = payloads[0].info.iter().map(|e| e.name.as_str()).collect();
        assert!(names.contains(&"FIELD_A(100)"));
        assert!(names.contains(&"101"));
    }

    #[test]
    fn test_from_config_applies_policy_and_session() {
        let mut config = Config::default();
        config.commit_policy = CommitPolicy::Eager;
        config.manual_session_id = Some("fixed".to_string());

        let host = Arc::new(SimulatedHost::new(1, Vec::new(), Vec::new()));
        let recorder = Recorder::from_config(host, MemorySink::new(), &config);
        assert_eq!(recorder.commit_policy(), CommitPolicy::Eager);
        assert_eq!(recorder.session_id(), "fixed");
    }

    #[test]
    fn test_stats_are_counted() {
        let recorder = recorder();
        let host = Arc::clone(recorder.host());
        recorder.start().unwrap();

        host.set_container(0, 0x15);
        recorder.on_field_container_changed(0);
        recorder.on_field_container_changed(9);

        let stats = recorder.stats().stats();
        assert_eq!(stats.sessions_started, 1);
        assert_eq!(stats.notifications, 2);
        assert_eq!(stats.changes_detected, 2);
    }
}
