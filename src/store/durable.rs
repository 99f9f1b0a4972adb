//! ACID-durable repository backed by redb.
//!
//! Every upsert and check-and-set runs inside a single write transaction, so
//! redb's single-writer model provides the uniqueness and atomicity
//! guarantees. Reads use MVCC snapshots and only ever see committed rows.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use redb::{Database, DatabaseError, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::model::{Ontology, OntologyDraft, RankingPatch, Term, TermDraft, now_secs};
use crate::store::{
    Repository, RepositoryCounts, StoreResult, UpsertPolicy, Upserted, require_key,
};

/// Ontologies keyed by uri (bincode-encoded values).
const ONTOLOGIES: TableDefinition<&str, &[u8]> = TableDefinition::new("ontologies");
/// Terms keyed by uri (bincode-encoded values).
const TERMS: TableDefinition<&str, &[u8]> = TableDefinition::new("terms");

/// Database file name inside the data directory.
pub const DB_FILE: &str = "ontology-search.redb";

fn redb_err<E: std::fmt::Display>(op: &'static str) -> impl FnOnce(E) -> StoreError {
    move |e| StoreError::Redb {
        message: format!("{op} failed: {e}"),
    }
}

fn encode<T: Serialize>(value: &T) -> StoreResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })
}

/// Durable repository using redb.
pub struct DurableRepository {
    db: Arc<Database>,
}

impl DurableRepository {
    /// Open or create the repository in the given directory.
    pub fn open(data_dir: &Path) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir).map_err(|e| StoreError::Io { source: e })?;
        let db_path = data_dir.join(DB_FILE);
        let db = Database::create(&db_path).map_err(|e| match e {
            DatabaseError::DatabaseAlreadyOpen => StoreError::Locked {
                path: db_path.display().to_string(),
            },
            other => StoreError::Redb {
                message: format!("failed to open redb at {}: {other}", db_path.display()),
            },
        })?;

        // Create both tables up front so read transactions never miss them.
        let txn = db.begin_write().map_err(redb_err("begin_write"))?;
        txn.open_table(ONTOLOGIES).map_err(redb_err("open_table"))?;
        txn.open_table(TERMS).map_err(redb_err("open_table"))?;
        txn.commit().map_err(redb_err("commit"))?;

        tracing::debug!(path = %db_path.display(), "opened durable repository");
        Ok(Self { db: Arc::new(db) })
    }

    /// Get-or-create inside one write transaction.
    fn upsert<T>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        kind: &'static str,
        uri: &str,
        create: impl FnOnce() -> T,
        on_conflict: impl FnOnce(&mut T) -> bool,
    ) -> StoreResult<Upserted<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let outcome = {
            let mut table = txn.open_table(table).map_err(redb_err("open_table"))?;
            let stored = match table.get(uri).map_err(redb_err("get"))? {
                Some(guard) => Some(decode::<T>(guard.value())?),
                None => None,
            };
            match stored {
                Some(mut entity) => {
                    if on_conflict(&mut entity) {
                        table
                            .insert(uri, encode(&entity)?.as_slice())
                            .map_err(redb_err("insert"))?;
                    }
                    Upserted::existing(entity)
                }
                None => {
                    let entity = create();
                    let previous = table
                        .insert(uri, encode(&entity)?.as_slice())
                        .map_err(redb_err("insert"))?;
                    if previous.is_some() {
                        // Dropping the uncommitted transaction rolls back.
                        return Err(StoreError::Constraint {
                            kind,
                            uri: uri.to_string(),
                        });
                    }
                    Upserted::created(entity)
                }
            }
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(outcome)
    }

    /// Read-modify-write of a single term inside one write transaction.
    ///
    /// `update` returns whether the term changed; unchanged terms are not
    /// rewritten. Returns `None` when the term does not exist.
    fn modify_term<R>(
        &self,
        uri: &str,
        update: impl FnOnce(&mut Term) -> (bool, R),
    ) -> StoreResult<Option<R>> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let result = {
            let mut table = txn.open_table(TERMS).map_err(redb_err("open_table"))?;
            let stored = match table.get(uri).map_err(redb_err("get"))? {
                Some(guard) => Some(decode::<Term>(guard.value())?),
                None => None,
            };
            match stored {
                Some(mut term) => {
                    let (changed, result) = update(&mut term);
                    if changed {
                        table
                            .insert(uri, encode(&term)?.as_slice())
                            .map_err(redb_err("insert"))?;
                    }
                    Some(result)
                }
                None => None,
            }
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(result)
    }

    fn get<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        uri: &str,
    ) -> StoreResult<Option<T>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let guard = table.get(uri).map_err(redb_err("get"))?;
        guard.map(|g| decode(g.value())).transpose()
    }

    /// All values of a table, in key order.
    fn scan<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
    ) -> StoreResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let table = txn.open_table(table).map_err(redb_err("open_table"))?;
        let mut values = Vec::new();
        for entry in table.iter().map_err(redb_err("iter"))? {
            let (_, value) = entry.map_err(redb_err("iter"))?;
            values.push(decode(value.value())?);
        }
        Ok(values)
    }
}

impl Repository for DurableRepository {
    fn upsert_ontology(
        &self,
        draft: OntologyDraft,
        policy: UpsertPolicy,
    ) -> StoreResult<Upserted<Ontology>> {
        require_key("ontology", &draft.uri)?;
        let now = now_secs();
        self.upsert(
            ONTOLOGIES,
            "ontology",
            &draft.uri,
            || draft.clone().into_entity(now),
            |stored| policy.apply_ontology(stored, &draft, now),
        )
    }

    fn upsert_term(&self, draft: TermDraft, policy: UpsertPolicy) -> StoreResult<Upserted<Term>> {
        require_key("term", &draft.uri)?;
        let now = now_secs();
        self.upsert(
            TERMS,
            "term",
            &draft.uri,
            || draft.clone().into_entity(now),
            |stored| policy.apply_term(stored, &draft, now),
        )
    }

    fn ontology(&self, uri: &str) -> StoreResult<Option<Ontology>> {
        self.get(ONTOLOGIES, uri)
    }

    fn term(&self, uri: &str) -> StoreResult<Option<Term>> {
        self.get(TERMS, uri)
    }

    fn ontologies(&self) -> StoreResult<Vec<Ontology>> {
        self.scan(ONTOLOGIES)
    }

    fn terms(&self) -> StoreResult<Vec<Term>> {
        self.scan(TERMS)
    }

    fn terms_without_parents(&self) -> StoreResult<Vec<String>> {
        Ok(self
            .scan::<Term>(TERMS)?
            .into_iter()
            .filter(|t| t.sub_class_of.is_empty())
            .map(|t| t.uri)
            .collect())
    }

    fn set_parents_if_empty(&self, uri: &str, parents: BTreeSet<String>) -> StoreResult<bool> {
        if parents.is_empty() {
            return Ok(false);
        }
        let updated = self.modify_term(uri, |term| {
            if !term.sub_class_of.is_empty() {
                return (false, false);
            }
            term.sub_class_of = parents;
            term.updated_at = now_secs();
            (true, true)
        })?;
        Ok(updated.unwrap_or(false))
    }

    fn remove_ontology(&self, uri: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(redb_err("begin_write"))?;
        let removed = {
            let mut ontologies = txn.open_table(ONTOLOGIES).map_err(redb_err("open_table"))?;
            let existed = ontologies.remove(uri).map_err(redb_err("remove"))?.is_some();

            if existed {
                let mut terms = txn.open_table(TERMS).map_err(redb_err("open_table"))?;
                let mut orphaned = Vec::new();
                for entry in terms.iter().map_err(redb_err("iter"))? {
                    let (_, value) = entry.map_err(redb_err("iter"))?;
                    let term: Term = decode(value.value())?;
                    if term.ontology.as_deref() == Some(uri) {
                        orphaned.push(term);
                    }
                }
                let now = now_secs();
                for mut term in orphaned {
                    term.ontology = None;
                    term.updated_at = now;
                    terms
                        .insert(term.uri.as_str(), encode(&term)?.as_slice())
                        .map_err(redb_err("insert"))?;
                }
            }
            existed
        };
        txn.commit().map_err(redb_err("commit"))?;
        Ok(removed)
    }

    fn update_ranking(&self, uri: &str, patch: RankingPatch) -> StoreResult<Option<Term>> {
        self.modify_term(uri, |term| {
            patch.apply(term, now_secs());
            (true, term.clone())
        })
    }

    fn counts(&self) -> StoreResult<RepositoryCounts> {
        let txn = self.db.begin_read().map_err(redb_err("begin_read"))?;
        let ontologies = txn.open_table(ONTOLOGIES).map_err(redb_err("open_table"))?;
        let terms = txn.open_table(TERMS).map_err(redb_err("open_table"))?;
        Ok(RepositoryCounts {
            ontologies: ontologies.len().map_err(redb_err("len"))? as usize,
            terms: terms.len().map_err(redb_err("len"))? as usize,
        })
    }
}

impl std::fmt::Debug for DurableRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableRepository").finish()
    }
}
