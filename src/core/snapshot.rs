//! Shadow copy of the host's container array.
//!
//! `current` holds the host values as of the last refresh and `previous`
//! lags it by one commit. Both always have the same length.

use crate::core::bitfield;
use crate::host::FieldDescriptor;

/// Current and previous container state for one recording session.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    current: Vec<i32>,
    previous: Vec<i32>,
}

impl SnapshotStore {
    /// Create a store of `length` zeroed containers.
    pub fn new(length: usize) -> Self {
        let mut store = Self::default();
        store.initialize(length);
        store
    }

    /// Reset both sides to `length` zeroed containers.
    pub fn initialize(&mut self, length: usize) {
        self.current = vec![0; length];
        self.previous = vec![0; length];
    }

    /// Copy the host's live values into `current`.
    ///
    /// Only the overlapping prefix is copied when the host array length no
    /// longer matches the session's.
    pub fn refresh_current(&mut self, live: &[i32]) {
        let n = self.current.len().min(live.len());
        if n != live.len() || n != self.current.len() {
            tracing::trace!(
                expected = self.current.len(),
                actual = live.len(),
                "live array length differs from snapshot"
            );
        }
        self.current[..n].copy_from_slice(&live[..n]);
    }

    /// Copy `current` into `previous`.
    pub fn commit(&mut self) {
        self.previous.copy_from_slice(&self.current);
    }

    /// Write a single field's value into `previous`.
    pub fn commit_field(&mut self, descriptor: &FieldDescriptor, value: i32) {
        bitfield::insert(&mut self.previous, descriptor, value);
    }

    /// `(previous, current)` values of a field.
    pub fn diff(&self, descriptor: &FieldDescriptor) -> (i32, i32) {
        (
            bitfield::extract(&self.previous, descriptor),
            bitfield::extract(&self.current, descriptor),
        )
    }

    /// Drop both sides.
    pub fn clear(&mut self) {
        self.current = Vec::new();
        self.previous = Vec::new();
    }

    pub fn current(&self) -> &[i32] {
        &self.current
    }

    pub fn previous(&self) -> &[i32] {
        &self.previous
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_zero_filled() {
        let store = SnapshotStore::new(4);
        assert_eq!(store.current(), &[0, 0, 0, 0]);
        assert_eq!(store.previous(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_refresh_does_not_touch_previous() {
        let mut store = SnapshotStore::new(2);
        store.refresh_current(&[0x15, 3]);
        assert_eq!(store.current(), &[0x15, 3]);
        assert_eq!(store.previous(), &[0, 0]);
    }

    #[test]
    fn test_refresh_with_mismatched_length_keeps_size() {
        let mut store = SnapshotStore::new(2);
        store.refresh_current(&[1, 2, 3]);
        assert_eq!(store.current(), &[1, 2]);

        store.refresh_current(&[9]);
        assert_eq!(store.current(), &[9, 2]);
        assert_eq!(store.previous().len(), store.current().len());
    }

    #[test]
    fn test_commit_moves_current_into_previous() {
        let descriptors = [
            FieldDescriptor::new(1, 0, 0, 3),
            FieldDescriptor::new(2, 0, 4, 7),
            FieldDescriptor::new(3, 1, 2, 9),
        ];
        let mut store = SnapshotStore::new(2);
        store.refresh_current(&[0x15, 0x3fc]);

        let before: Vec<i32> = descriptors.iter().map(|d| store.diff(d).1).collect();
        store.commit();

        for (d, expected) in descriptors.iter().zip(before) {
            assert_eq!(store.diff(d), (expected, expected));
        }
    }

    #[test]
    fn test_diff_reports_previous_and_current() {
        let d = FieldDescriptor::new(1, 0, 0, 3);
        let mut store = SnapshotStore::new(1);
        store.refresh_current(&[5]);
        assert_eq!(store.diff(&d), (0, 5));
    }

    #[test]
    fn test_commit_field_only_updates_that_field() {
        let a = FieldDescriptor::new(1, 0, 0, 3);
        let b = FieldDescriptor::new(2, 0, 4, 7);
        let mut store = SnapshotStore::new(1);
        store.refresh_current(&[0x15]);

        store.commit_field(&a, 5);
        assert_eq!(store.diff(&a), (5, 5));
        assert_eq!(store.diff(&b), (0, 1));
    }

    #[test]
    fn test_baseline_and_clear() {
        let mut store = SnapshotStore::new(1);
        store.initialize(3);
        store.refresh_current(&[7, 8, 9]);
        store.commit();
        assert_eq!(store.previous(), &[7, 8, 9]);
        assert_eq!(store.current(), &[7, 8, 9]);

        store.clear();
        assert!(store.is_empty());
        assert!(store.previous().is_empty());
    }
}
