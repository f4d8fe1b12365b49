//! Natural composite identity shared by authors and books.
//!
//! ```text
//! Author        Book          EntityKey
//!   name          title         label ──┐
//!   dob           pubdate       year  ──┴── composite key
//! ```
//!
//! Labels are compared byte-for-byte: "Edward Tufte" and "Edward R. Tufte"
//! are different entities. Years are Gregorian, negative for BC.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Immutable (label, year) identity of an author or a book.
///
/// Ordering is label first, then year. That order is also the tie-break
/// used when ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct EntityKey {
    label: String,
    year: i64,
}

impl EntityKey {
    pub fn new(label: impl Into<String>, year: i64) -> Self {
        Self {
            label: label.into(),
            year,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn year(&self) -> i64 {
        self.year
    }

    /// Split into owned parts (used when re-expanding into records).
    pub fn into_parts(self) -> (String, i64) {
        (self.label, self.year)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.label, self.year)
    }
}

impl<S: Into<String>> From<(S, i64)> for EntityKey {
    fn from((label, year): (S, i64)) -> Self {
        Self::new(label, year)
    }
}

/// Opposite-kind keys an entity is related to.
pub type RelationSet = BTreeSet<EntityKey>;
