//! Deterministic column ordering for the export table
//!
//! Business columns listed in a priority list come first, in that list's
//! order, followed by every other discovered column sorted lexicographically.
//! The result depends only on the field universe, never on record order.

use crate::flatten::types::{FieldUniverse, FlatRow};
use std::collections::{HashMap, HashSet};

/// Well-known columns, in the order they lead the export
pub const DEFAULT_PRIORITY: [&str; 9] = [
    "UID",
    "名称",
    "GMV",
    "花费",
    "消耗",
    "全站ROI",
    "roi",
    "订单数",
    "更新时间",
];

/// Final column order: a permutation of the field universe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    columns: Vec<String>,
}

impl ColumnOrder {
    /// Resolve the order for `universe`.
    ///
    /// Priority names missing from the universe are skipped; duplicates in the
    /// priority list only count once.
    pub fn resolve<S: AsRef<str>>(universe: &FieldUniverse, priority: &[S]) -> Self {
        let mut prioritized: HashSet<&str> = HashSet::new();
        let mut columns = Vec::with_capacity(universe.len());

        for name in priority {
            let name: &str = name.as_ref();
            if universe.contains(name) && prioritized.insert(name) {
                columns.push(name.to_string());
            }
        }

        // FieldUniverse iterates in sorted order
        columns.extend(
            universe
                .iter()
                .filter(|name| !prioritized.contains(name))
                .map(str::to_string),
        );

        ColumnOrder { columns }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.columns
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Header cells, with display labels substituted where configured
    pub fn header<'a>(&'a self, labels: &'a HashMap<String, String>) -> Vec<&'a str> {
        self.columns
            .iter()
            .map(|column| labels.get(column).unwrap_or(column).as_str())
            .collect()
    }

    /// Cells of `row` in column order; absent columns are blank
    pub fn project(&self, row: &FlatRow) -> Vec<String> {
        self.columns.iter().map(|column| row.cell_text(column)).collect()
    }
}
