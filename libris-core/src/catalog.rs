//! Author/book facade over [`RelationStore`].
//!
//! Authors live on the left table, books on the right. This module only
//! translates between wire records and [`EntityKey`]s.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::key::{EntityKey, RelationSet};
use crate::relation::{RelationStore, Side, StoreStats, UpsertOutcome};

const AUTHORS: Side = Side::Left;
const BOOKS: Side = Side::Right;

/// A book as it appears in an author's relation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub pubdate: i64,
}

/// An author as it appears in a book's relation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    pub dob: i64,
}

/// A record annotated with its relation count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked<R> {
    #[serde(flatten)]
    pub record: R,
    pub count: usize,
}

impl BookRecord {
    pub fn new(title: impl Into<String>, pubdate: i64) -> Self {
        Self {
            title: title.into(),
            pubdate,
        }
    }
}

impl AuthorRecord {
    pub fn new(name: impl Into<String>, dob: i64) -> Self {
        Self {
            name: name.into(),
            dob,
        }
    }
}

impl From<&BookRecord> for EntityKey {
    fn from(record: &BookRecord) -> Self {
        EntityKey::new(record.title.clone(), record.pubdate)
    }
}

impl From<&AuthorRecord> for EntityKey {
    fn from(record: &AuthorRecord) -> Self {
        EntityKey::new(record.name.clone(), record.dob)
    }
}

impl From<EntityKey> for BookRecord {
    fn from(key: EntityKey) -> Self {
        let (title, pubdate) = key.into_parts();
        Self { title, pubdate }
    }
}

impl From<EntityKey> for AuthorRecord {
    fn from(key: EntityKey) -> Self {
        let (name, dob) = key.into_parts();
        Self { name, dob }
    }
}

fn to_keys<'a, R>(records: &'a [R]) -> RelationSet
where
    EntityKey: From<&'a R>,
{
    records.iter().map(EntityKey::from).collect()
}

fn to_records<R: From<EntityKey>>(related: RelationSet) -> Vec<R> {
    related.into_iter().map(R::from).collect()
}

fn to_ranked<R: From<EntityKey>>(ranked: Vec<(EntityKey, usize)>) -> Vec<Ranked<R>> {
    ranked
        .into_iter()
        .map(|(key, count)| Ranked {
            record: R::from(key),
            count,
        })
        .collect()
}

/// Authors and books with symmetric, existence-dependent relations.
///
/// Each instance is independent; share one across tasks with `Arc`.
#[derive(Debug, Default)]
pub struct BookAuthorStore {
    relations: RelationStore,
}

impl BookAuthorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the author if needed and link it to every listed book.
    pub fn author_create(&self, name: &str, dob: i64, books: &[BookRecord]) -> Result<UpsertOutcome> {
        Ok(self.author_merge(name, dob, books)?.0)
    }

    /// Create the book if needed and link it to every listed author.
    pub fn book_create(&self, title: &str, pubdate: i64, authors: &[AuthorRecord]) -> Result<UpsertOutcome> {
        Ok(self.book_merge(title, pubdate, authors)?.0)
    }

    /// [`author_create`](Self::author_create) that also returns the author's
    /// books as of the merge.
    pub fn author_merge(
        &self,
        name: &str,
        dob: i64,
        books: &[BookRecord],
    ) -> Result<(UpsertOutcome, Vec<BookRecord>)> {
        let key = EntityKey::new(name, dob);
        let (outcome, merged) = self.relations.merge(AUTHORS, key.clone(), to_keys(books))?;
        log_upsert("author", &key, outcome);
        Ok((outcome, to_records(merged)))
    }

    /// [`book_create`](Self::book_create) that also returns the book's
    /// authors as of the merge.
    pub fn book_merge(
        &self,
        title: &str,
        pubdate: i64,
        authors: &[AuthorRecord],
    ) -> Result<(UpsertOutcome, Vec<AuthorRecord>)> {
        let key = EntityKey::new(title, pubdate);
        let (outcome, merged) = self.relations.merge(BOOKS, key.clone(), to_keys(authors))?;
        log_upsert("book", &key, outcome);
        Ok((outcome, to_records(merged)))
    }

    /// Books of an author, ordered by (title, pubdate). Empty if unknown.
    pub fn author_read(&self, name: &str, dob: i64) -> Result<Vec<BookRecord>> {
        let related = self.relations.read(AUTHORS, &EntityKey::new(name, dob))?;
        Ok(to_records(related))
    }

    /// Authors of a book, ordered by (name, dob). Empty if unknown.
    pub fn book_read(&self, title: &str, pubdate: i64) -> Result<Vec<AuthorRecord>> {
        let related = self.relations.read(BOOKS, &EntityKey::new(title, pubdate))?;
        Ok(to_records(related))
    }

    pub fn author_delete(&self, name: &str, dob: i64) -> Result<bool> {
        Ok(self.author_remove(name, dob)?.is_some())
    }

    pub fn book_delete(&self, title: &str, pubdate: i64) -> Result<bool> {
        Ok(self.book_remove(title, pubdate)?.is_some())
    }

    /// Delete an author, returning the books it was linked to.
    ///
    /// Books left without any author are deleted as well.
    pub fn author_remove(&self, name: &str, dob: i64) -> Result<Option<Vec<BookRecord>>> {
        let key = EntityKey::new(name, dob);
        let removed = self.relations.remove(AUTHORS, &key)?;
        if removed.is_some() {
            log::info!("Deleted author {key}");
        }
        Ok(removed.map(to_records))
    }

    /// Delete a book, returning the authors it was linked to.
    ///
    /// Authors left without any book are deleted as well.
    pub fn book_remove(&self, title: &str, pubdate: i64) -> Result<Option<Vec<AuthorRecord>>> {
        let key = EntityKey::new(title, pubdate);
        let removed = self.relations.remove(BOOKS, &key)?;
        if removed.is_some() {
            log::info!("Deleted book {key}");
        }
        Ok(removed.map(to_records))
    }

    /// Authors ordered by number of books, most prolific first.
    pub fn author_by_books(&self) -> Result<Vec<Ranked<AuthorRecord>>> {
        Ok(to_ranked(self.relations.rank_by_relation_count(AUTHORS)?))
    }

    /// Books ordered by number of authors.
    pub fn book_by_authors(&self) -> Result<Vec<Ranked<BookRecord>>> {
        Ok(to_ranked(self.relations.rank_by_relation_count(BOOKS)?))
    }

    pub fn author_count(&self) -> Result<usize> {
        self.relations.len(AUTHORS)
    }

    pub fn book_count(&self) -> Result<usize> {
        self.relations.len(BOOKS)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.relations.stats()
    }

    /// See [`RelationStore::check_invariants`].
    pub fn check_invariants(&self) -> Result<()> {
        self.relations.check_invariants()
    }
}

fn log_upsert(kind: &str, key: &EntityKey, outcome: UpsertOutcome) {
    if outcome.created {
        log::info!("Created {kind} {key}");
    } else if outcome.updated {
        log::debug!("Merged new relations into {kind} {key}");
    } else {
        log::trace!("No change to {kind} {key}");
    }
}
