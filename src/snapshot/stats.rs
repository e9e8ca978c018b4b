//! Row-count snapshot types
//!
//! `TableStats` is an ordered map from qualified table name to row count.
//! Order is the census order and survives a trip through JSON, so the
//! persisted files and the delta report list tables the way the database
//! enumerated them.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Row counts keyed by `"<schema>.<table>"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    entries: Vec<(String, u64)>,
    /// Table name -> position in `entries`
    index: HashMap<String, usize>,
}

impl TableStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a count. An existing key keeps its position.
    pub fn insert(&mut self, table: impl Into<String>, count: u64) -> Option<u64> {
        let table = table.into();
        match self.index.get(&table) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, count)),
            None => {
                self.index.insert(table.clone(), self.entries.len());
                self.entries.push((table, count));
                None
            }
        }
    }

    pub fn get(&self, table: &str) -> Option<u64> {
        self.index.get(table).map(|&pos| self.entries[pos].1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }
}

impl<K: Into<String>> FromIterator<(K, u64)> for TableStats {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut stats = TableStats::new();
        for (table, count) in iter {
            stats.insert(table, count);
        }
        stats
    }
}

impl Serialize for TableStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (table, count) in &self.entries {
            map.serialize_entry(table, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableStats {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatsVisitor;

        impl<'de> Visitor<'de> for StatsVisitor {
            type Value = TableStats;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of table names to non-negative row counts")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TableStats, A::Error> {
                let mut stats = TableStats::new();
                while let Some((table, count)) = access.next_entry::<String, u64>()? {
                    stats.insert(table, count);
                }
                Ok(stats)
            }
        }

        deserializer.deserialize_map(StatsVisitor)
    }
}

/// Every run's snapshot keyed by its `YYYY-MM-DD HH:MM:SS` UTC timestamp.
/// Lexical key order is chronological for that format.
pub type StatisticsLog = BTreeMap<String, TableStats>;
