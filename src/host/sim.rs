//! In-process simulated host.
//!
//! Holds a container array and a tick counter behind the [`Host`] trait.
//! Every write returns the [`HostEvent`] a real host would raise for it, and
//! [`SimulatedHost::run_tick`] hands each one to the listener before the next
//! write, so a notification is always processed against the state that
//! caused it. Used by the CLI, the demo and the tests.

use crate::core::bitfield;
use crate::host::types::{FieldDescriptor, FieldName, HostEvent};
use crate::host::Host;
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

/// A host whose state is driven by explicit writes.
pub struct SimulatedHost {
    containers: Mutex<Vec<i32>>,
    tick: AtomicU32,
    catalog: Vec<FieldDescriptor>,
    names: Vec<FieldName>,
}

impl SimulatedHost {
    /// Create a host with `container_count` zeroed containers.
    pub fn new(container_count: usize, catalog: Vec<FieldDescriptor>, names: Vec<FieldName>) -> Self {
        Self {
            containers: Mutex::new(vec![0; container_count]),
            tick: AtomicU32::new(0),
            catalog,
            names,
        }
    }

    /// Create a host sized to cover every container the catalog references.
    pub fn from_catalog(catalog: Vec<FieldDescriptor>, names: Vec<FieldName>) -> Self {
        let container_count = catalog
            .iter()
            .map(|d| d.container_key as usize + 1)
            .max()
            .unwrap_or(0);
        Self::new(container_count, catalog, names)
    }

    /// Catalog this host was built with.
    pub fn catalog(&self) -> &[FieldDescriptor] {
        &self.catalog
    }

    /// Overwrite a whole container.
    ///
    /// Returns the notification for the write, or `None` when the key is out
    /// of range and nothing was written.
    pub fn set_container(&self, container_key: u32, value: i32) -> Option<HostEvent> {
        let mut containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = containers.get_mut(container_key as usize)?;
        *slot = value;
        Some(HostEvent::ContainerChanged(container_key))
    }

    /// Write one field and return the notification for its container.
    pub fn set_field(&self, descriptor: &FieldDescriptor, value: i32) -> HostEvent {
        let mut containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        bitfield::insert(&mut containers, descriptor, value);
        HostEvent::ContainerChanged(descriptor.container_key)
    }

    /// Current value of a field.
    pub fn field(&self, descriptor: &FieldDescriptor) -> i32 {
        let containers = self.containers.lock().unwrap_or_else(PoisonError::into_inner);
        bitfield::extract(&containers, descriptor)
    }

    /// Write a random value into a random catalog field.
    ///
    /// Values are the field's raw bits as stored in an `i32` container, so a
    /// 32-bit field can yield a negative value. Returns the field written and
    /// its value, or `None` when the catalog is empty.
    pub fn mutate_random<R: Rng>(&self, rng: &mut R) -> Option<(FieldDescriptor, i32)> {
        if self.catalog.is_empty() {
            return None;
        }
        let descriptor = self.catalog[rng.gen_range(0..self.catalog.len())];
        let value = rng.gen_range(0..=descriptor.max_value()) as i32;
        self.set_field(&descriptor, value);
        Some((descriptor, value))
    }

    /// Advance the tick counter and return the new tick.
    pub fn advance_tick(&self) -> u32 {
        self.tick.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Run one host tick: up to `max_writes` random writes, then the time step.
    ///
    /// `deliver` receives each notification synchronously, right after the
    /// write that raised it. Returns the new tick.
    pub fn run_tick<R, F>(&self, rng: &mut R, max_writes: usize, mut deliver: F) -> u32
    where
        R: Rng,
        F: FnMut(HostEvent),
    {
        for _ in 0..rng.gen_range(0..=max_writes) {
            if let Some((descriptor, _)) = self.mutate_random(rng) {
                deliver(HostEvent::ContainerChanged(descriptor.container_key));
            }
        }
        let tick = self.advance_tick();
        deliver(HostEvent::TimeStep(tick));
        tick
    }
}

impl Host for SimulatedHost {
    fn live_array(&self) -> Vec<i32> {
        self.containers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn tick_count(&self) -> u32 {
        self.tick.load(Ordering::SeqCst)
    }

    fn field_catalog(&self) -> Vec<FieldDescriptor> {
        self.catalog.clone()
    }

    fn field_names(&self) -> Vec<FieldName> {
        self.names.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn host() -> SimulatedHost {
        SimulatedHost::from_catalog(
            vec![
                FieldDescriptor::new(1, 0, 0, 3),
                FieldDescriptor::new(2, 0, 4, 7),
                FieldDescriptor::new(3, 2, 0, 0),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_from_catalog_sizes_containers() {
        assert_eq!(host().live_array().len(), 3);
    }

    #[test]
    fn test_set_field_returns_notification() {
        let host = host();
        let d = host.catalog()[1];

        assert_eq!(host.set_field(&d, 9), HostEvent::ContainerChanged(0));
        assert_eq!(host.live_array()[0], 0x90);
        assert_eq!(host.field(&d), 9);
    }

    #[test]
    fn test_set_container_out_of_range_is_ignored() {
        let host = host();
        assert_eq!(host.set_container(10, 1), None);
        assert_eq!(host.set_container(2, 1), Some(HostEvent::ContainerChanged(2)));
        assert_eq!(host.live_array(), vec![0, 0, 1]);
    }

    #[test]
    fn test_advance_tick() {
        let host = host();
        assert_eq!(host.tick_count(), 0);
        assert_eq!(host.advance_tick(), 1);
        assert_eq!(host.tick_count(), 1);
    }

    #[test]
    fn test_mutate_random_stays_in_field() {
        let host = host();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let (d, value) = host.mutate_random(&mut rng).unwrap();
            assert!(value >= 0);
            assert!(value as u32 <= d.max_value());
            assert_eq!(host.field(&d), value);
        }
    }

    #[test]
    fn test_mutate_random_full_width_field_keeps_raw_bits() {
        let d = FieldDescriptor::new(9, 0, 0, 31);
        let host = SimulatedHost::from_catalog(vec![d], Vec::new());
        let mut rng = StdRng::seed_from_u64(11);

        let mut saw_negative = false;
        for _ in 0..100 {
            let (_, value) = host.mutate_random(&mut rng).unwrap();
            saw_negative |= value < 0;
            assert_eq!(host.field(&d), value);
            assert_eq!(host.live_array()[0], value);
        }
        assert!(saw_negative);
    }

    #[test]
    fn test_mutate_random_empty_catalog() {
        let host = SimulatedHost::new(4, Vec::new(), Vec::new());
        let mut rng = StdRng::seed_from_u64(7);
        assert!(host.mutate_random(&mut rng).is_none());
    }

    #[test]
    fn test_run_tick_delivers_writes_then_time_step() {
        let host = host();
        let mut rng = StdRng::seed_from_u64(3);
        let mut events = Vec::new();

        let tick = host.run_tick(&mut rng, 5, |event| {
            if let HostEvent::ContainerChanged(key) = event {
                assert!(key == 0 || key == 2);
            }
            events.push(event);
        });

        assert_eq!(tick, 1);
        assert!(events.len() <= 6);
        assert_eq!(events.last(), Some(&HostEvent::TimeStep(1)));
        assert!(events[..events.len() - 1]
            .iter()
            .all(|e| matches!(e, HostEvent::ContainerChanged(_))));
    }
}
