pub mod repository;

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use uuid::Uuid;

pub use repository::Repository;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{table}: record {id} already exists")]
    DuplicateKey { table: &'static str, id: Uuid },
}

/// A record addressable by a generated primary key.
pub trait Record: Clone + Send + Sync {
    fn key(&self) -> Uuid;
}

struct Row<T> {
    seq: u64,
    record: T,
}

/// One table of the record store. Reads come back in insertion order.
pub struct Table<T> {
    name: &'static str,
    rows: DashMap<Uuid, Row<T>>,
    next_seq: AtomicU64,
}

impl<T: Record> Table<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            rows: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn insert(&self, record: T) -> Result<T, StoreError> {
        let id = record.key();
        match self.rows.entry(id) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey {
                table: self.name,
                id,
            }),
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Row {
                    seq,
                    record: record.clone(),
                });
                Ok(record)
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<T> {
        self.rows.get(id).map(|row| row.record.clone())
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.rows.contains_key(id)
    }

    pub fn select<F>(&self, predicate: F) -> Vec<T>
    where
        F: Fn(&T) -> bool,
    {
        let mut matches: Vec<(u64, T)> = self
            .rows
            .iter()
            .filter(|entry| predicate(&entry.value().record))
            .map(|entry| (entry.value().seq, entry.value().record.clone()))
            .collect();

        matches.sort_by_key(|(seq, _)| *seq);
        matches.into_iter().map(|(_, record)| record).collect()
    }

    pub fn find<F>(&self, predicate: F) -> Option<T>
    where
        F: Fn(&T) -> bool,
    {
        self.select(predicate).into_iter().next()
    }

    /// Applies `patch` to the stored record in place. `None` when absent.
    pub fn update<F>(&self, id: &Uuid, patch: F) -> Option<T>
    where
        F: FnOnce(&mut T),
    {
        let mut row = self.rows.get_mut(id)?;
        patch(&mut row.record);
        Some(row.record.clone())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{Record, StoreError, Table};

    #[derive(Clone, Debug, PartialEq)]
    struct Item {
        id: Uuid,
        label: &'static str,
    }

    impl Record for Item {
        fn key(&self) -> Uuid {
            self.id
        }
    }

    fn item(seed: u128, label: &'static str) -> Item {
        Item {
            id: Uuid::from_u128(seed),
            label,
        }
    }

    #[test]
    fn select_preserves_insertion_order() {
        let table = Table::new("items");
        // keys deliberately out of order relative to insertion
        for (seed, label) in [(9, "first"), (1, "second"), (5, "third")] {
            table.insert(item(seed, label)).unwrap();
        }

        let labels: Vec<_> = table.select(|_| true).into_iter().map(|i| i.label).collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let table = Table::new("items");
        table.insert(item(1, "a")).unwrap();

        let err = table.insert(item(1, "b")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { table: "items", .. }));
        assert_eq!(table.get(&Uuid::from_u128(1)).unwrap().label, "a");
    }

    #[test]
    fn update_of_missing_record_is_none() {
        let table: Table<Item> = Table::new("items");
        assert!(table.update(&Uuid::from_u128(3), |i| i.label = "x").is_none());
    }

    #[test]
    fn update_returns_patched_record() {
        let table = Table::new("items");
        table.insert(item(2, "old")).unwrap();

        let updated = table.update(&Uuid::from_u128(2), |i| i.label = "new").unwrap();
        assert_eq!(updated.label, "new");
        assert_eq!(table.get(&Uuid::from_u128(2)).unwrap().label, "new");
    }
}
