//! Lookup tables built once per recording session.
//!
//! [`FieldIndex`] maps a container key to the fields packed into that
//! container, so a change notification only has to check the fields it can
//! affect. [`NameTable`] resolves field ids to display names.

use crate::host::{FieldDescriptor, FieldName};
use std::collections::{HashMap, HashSet};

/// Container key -> fields packed into that container.
#[derive(Debug, Clone, Default)]
pub struct FieldIndex {
    by_container: HashMap<u32, Vec<FieldDescriptor>>,
    field_count: usize,
}

impl FieldIndex {
    /// Group catalog entries by container key.
    ///
    /// Field ids are unique across the index; a repeated id keeps its first
    /// definition.
    pub fn build<I>(definitions: I) -> Self
    where
        I: IntoIterator<Item = FieldDescriptor>,
    {
        let mut by_container: HashMap<u32, Vec<FieldDescriptor>> = HashMap::new();
        let mut seen = HashSet::new();

        for descriptor in definitions {
            if !seen.insert(descriptor.id) {
                tracing::trace!(id = descriptor.id, "duplicate field definition ignored");
                continue;
            }
            by_container
                .entry(descriptor.container_key)
                .or_default()
                .push(descriptor);
        }

        Self {
            by_container,
            field_count: seen.len(),
        }
    }

    /// Fields covered by a container key. Unknown keys yield an empty slice.
    pub fn lookup(&self, container_key: u32) -> &[FieldDescriptor] {
        self.by_container
            .get(&container_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of indexed fields.
    pub fn field_count(&self) -> usize {
        self.field_count
    }

    /// Number of distinct container keys.
    pub fn container_count(&self) -> usize {
        self.by_container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_count == 0
    }
}

/// Field id -> display name.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<u32, String>,
}

impl NameTable {
    pub fn build<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = FieldName>,
    {
        Self {
            names: entries.into_iter().map(|e| (e.id, e.name)).collect(),
        }
    }

    /// Display label for a field: `NAME(id)` when named, else the decimal id.
    pub fn resolve(&self, id: u32) -> String {
        match self.names.get(&id) {
            Some(name) => format!("{name}({id})"),
            None => id.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_groups_by_container() {
        let index = FieldIndex::build(vec![
            FieldDescriptor::new(1, 10, 0, 3),
            FieldDescriptor::new(2, 10, 4, 7),
            FieldDescriptor::new(3, 11, 0, 31),
        ]);

        assert_eq!(index.field_count(), 3);
        assert_eq!(index.container_count(), 2);

        let mut ids: Vec<u32> = index.lookup(10).iter().map(|d| d.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(index.lookup(11).len(), 1);
    }

    #[test]
    fn test_lookup_unknown_key_is_empty() {
        let index = FieldIndex::build(vec![FieldDescriptor::new(1, 10, 0, 3)]);
        assert!(index.lookup(99).is_empty());
        assert!(FieldIndex::default().lookup(0).is_empty());
    }

    #[test]
    fn test_duplicate_ids_kept_once() {
        let index = FieldIndex::build(vec![
            FieldDescriptor::new(1, 10, 0, 3),
            FieldDescriptor::new(1, 12, 0, 3),
        ]);
        assert_eq!(index.field_count(), 1);
        assert_eq!(index.lookup(10).len(), 1);
        assert!(index.lookup(12).is_empty());
    }

    #[test]
    fn test_name_resolution() {
        let names = NameTable::build(vec![FieldName {
            id: 4101,
            name: "QUEST_POINTS".to_string(),
        }]);
        assert_eq!(names.resolve(4101), "QUEST_POINTS(4101)");
        assert_eq!(names.resolve(77), "77");
    }
}
