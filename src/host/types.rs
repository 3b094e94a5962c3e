//! Types exchanged with the host application.
//!
//! The host owns a flat array of integer containers. Each catalog entry
//! describes one field packed into a bit range of a single container.

use serde::{Deserialize, Serialize};

/// One bit-packed field inside a container slot.
///
/// Catalog entries and index entries share this shape. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field identifier (unique within a catalog)
    pub id: u32,
    /// Container slot holding the field, also the notification key
    pub container_key: u32,
    /// Lowest bit of the field (inclusive)
    pub start_bit: u8,
    /// Highest bit of the field (inclusive)
    pub end_bit: u8,
}

impl FieldDescriptor {
    pub fn new(id: u32, container_key: u32, start_bit: u8, end_bit: u8) -> Self {
        Self {
            id,
            container_key,
            start_bit,
            end_bit,
        }
    }

    /// Number of bits the field spans.
    pub fn width(&self) -> u32 {
        u32::from(self.end_bit.saturating_sub(self.start_bit)) + 1
    }

    /// Largest value the field can hold.
    pub fn max_value(&self) -> u32 {
        crate::core::bitfield::mask(self.width())
    }
}

/// A notification raised by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HostEvent {
    /// A container slot was written.
    ContainerChanged(u32),
    /// The host finished a time step; carries the new tick count.
    TimeStep(u32),
}

/// Named entry of the host's static id -> name table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldName {
    pub id: u32,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_width() {
        let d = FieldDescriptor::new(10, 3, 4, 7);
        assert_eq!(d.width(), 4);
        assert_eq!(d.max_value(), 15);

        let single = FieldDescriptor::new(11, 3, 9, 9);
        assert_eq!(single.width(), 1);
        assert_eq!(single.max_value(), 1);
    }

    #[test]
    fn test_descriptor_catalog_json() {
        let json = r#"{"id":4101,"container_key":281,"start_bit":0,"end_bit":3}"#;
        let d: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(d, FieldDescriptor::new(4101, 281, 0, 3));
    }
}
