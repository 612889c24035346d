//! The indexed commit store: `(key, value_bytes, attributes)` rows with a
//! fixed set of indexable attribute columns and a small equality/greater-than
//! predicate query engine.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};
use serde_json::Value as AttrValue;

use crate::errors::StoreError;
use crate::hash::BlobKey;

/// The only attribute names a row may carry. Anything else is `invalid_index`.
pub const INDEX_COLUMNS: &[&str] = &[
    "repository_key",
    "branch_name",
    "subject_key",
    "subject_branch",
    "subject_commit",
    "predicate_key",
    "predicate_branch",
    "predicate_commit",
    "object_key",
    "object_branch",
    "object_commit",
    "resource_object_type",
    "resource_life_cycle_state",
    "keyword",
];

fn check_index_name(column: &str) -> Result<(), StoreError> {
    if INDEX_COLUMNS.contains(&column) {
        Ok(())
    } else {
        Err(StoreError::invalid_index(column))
    }
}

fn check_attributes(attributes: &HashMap<String, AttrValue>) -> Result<(), StoreError> {
    for (column, value) in attributes {
        check_index_name(column)?;
        if !value.is_string() {
            return Err(StoreError::InvalidValueType(column.clone()));
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gt,
}

#[derive(Clone, Debug)]
pub struct Predicate {
    pub column: String,
    pub value: String,
    pub op: Op,
}

impl Predicate {
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            value: value.into(),
            op: Op::Eq,
        }
    }

    pub fn gt(column: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate {
            column: column.into(),
            value: value.into(),
            op: Op::Gt,
        }
    }

    fn matches(&self, attributes: &HashMap<String, String>) -> bool {
        match attributes.get(&self.column) {
            Some(actual) => match self.op {
                Op::Eq => *actual == self.value,
                Op::Gt => actual.as_str() > self.value.as_str(),
            },
            None => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CommitRow {
    pub key: BlobKey,
    pub value: Vec<u8>,
    pub attributes: HashMap<String, String>,
}

#[async_trait]
pub trait CommitStore: Send + Sync {
    async fn put(
        &self,
        key: BlobKey,
        value: Vec<u8>,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError>;

    async fn update_index(
        &self,
        key: BlobKey,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError>;

    async fn get(&self, key: BlobKey) -> Result<CommitRow, StoreError>;

    async fn multiget(&self, keys: &[BlobKey]) -> Result<Vec<CommitRow>, StoreError>;

    async fn has_key(&self, key: BlobKey) -> Result<bool, StoreError>;

    async fn remove(&self, key: BlobKey) -> Result<(), StoreError>;

    async fn query(
        &self,
        predicates: &[Predicate],
        max_rows: usize,
    ) -> Result<Vec<CommitRow>, StoreError>;
}

fn stringify(attributes: HashMap<String, AttrValue>) -> HashMap<String, String> {
    attributes
        .into_iter()
        .map(|(k, v)| (k, v.as_str().unwrap_or_default().to_string()))
        .collect()
}

/// In-process commit store backed by a concurrent hash map. `query` does a
/// linear scan over all rows rather than maintaining per-column secondary
/// indexes; correct and simple, at the cost of being O(rows) per query.
#[derive(Default)]
pub struct MemoryCommitStore {
    rows: DashMap<BlobKey, CommitRow>,
}

impl MemoryCommitStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommitStore for MemoryCommitStore {
    async fn put(
        &self,
        key: BlobKey,
        value: Vec<u8>,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError> {
        check_attributes(&attributes)?;
        self.rows.insert(
            key,
            CommitRow {
                key,
                value,
                attributes: stringify(attributes),
            },
        );
        Ok(())
    }

    async fn update_index(
        &self,
        key: BlobKey,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError> {
        check_attributes(&attributes)?;
        let mut row = self
            .rows
            .get_mut(&key)
            .ok_or_else(|| StoreError::not_found(format!("commit row {key} not found")))?;
        row.attributes.extend(stringify(attributes));
        Ok(())
    }

    async fn get(&self, key: BlobKey) -> Result<CommitRow, StoreError> {
        self.rows
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(format!("commit row {key} not found")))
    }

    async fn multiget(&self, keys: &[BlobKey]) -> Result<Vec<CommitRow>, StoreError> {
        Ok(keys
            .iter()
            .filter_map(|key| self.rows.get(key).map(|entry| entry.value().clone()))
            .collect())
    }

    async fn has_key(&self, key: BlobKey) -> Result<bool, StoreError> {
        Ok(self.rows.contains_key(&key))
    }

    async fn remove(&self, key: BlobKey) -> Result<(), StoreError> {
        self.rows.remove(&key);
        Ok(())
    }

    async fn query(
        &self,
        predicates: &[Predicate],
        max_rows: usize,
    ) -> Result<Vec<CommitRow>, StoreError> {
        for predicate in predicates {
            check_index_name(&predicate.column)?;
        }
        let mut matches: Vec<CommitRow> = self
            .rows
            .iter()
            .filter(|entry| predicates.iter().all(|p| p.matches(&entry.attributes)))
            .map(|entry| entry.value().clone())
            .collect();
        matches.truncate(max_rows);
        Ok(matches)
    }
}

/// Durable commit store backed by `sea_orm`. The indexed attribute columns
/// are real SQL columns in a single wide table, so `query` compiles to one
/// parameterized `SELECT ... WHERE` rather than an application-level scan.
pub struct SqliteCommitStore {
    db: DatabaseConnection,
}

impl SqliteCommitStore {
    pub async fn new(db: DatabaseConnection) -> Result<Self, StoreError> {
        let backend = db.get_database_backend();
        let columns: Vec<String> = INDEX_COLUMNS
            .iter()
            .map(|c| format!("{c} TEXT"))
            .collect();
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS commits (\
                 key TEXT PRIMARY KEY, \
                 value BLOB NOT NULL, \
                 {}\
             )",
            columns.join(", ")
        );
        db.execute(Statement::from_string(backend, ddl)).await?;
        for column in INDEX_COLUMNS {
            let ddl = format!(
                "CREATE INDEX IF NOT EXISTS commits_{column}_idx ON commits ({column})"
            );
            db.execute(Statement::from_string(backend, ddl)).await?;
        }
        Ok(SqliteCommitStore { db })
    }

    async fn write_row(
        &self,
        key: BlobKey,
        value: Option<Vec<u8>>,
        attributes: HashMap<String, String>,
    ) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        let existing = self.read_attributes(key).await?;

        let mut merged = existing.unwrap_or_default();
        merged.extend(attributes);

        let value_bytes = match value {
            Some(bytes) => bytes,
            None => self
                .db
                .query_one(Statement::from_sql_and_values(
                    backend,
                    "SELECT value FROM commits WHERE key = $1",
                    [key.to_hex().into()],
                ))
                .await?
                .ok_or_else(|| StoreError::not_found(format!("commit row {key} not found")))?
                .try_get("", "value")?,
        };

        let mut columns = vec!["key".to_string(), "value".to_string()];
        let mut placeholders = vec!["$1".to_string(), "$2".to_string()];
        let mut values: Vec<sea_orm::Value> = vec![key.to_hex().into(), value_bytes.into()];
        for column in INDEX_COLUMNS {
            columns.push((*column).to_string());
            placeholders.push(format!("${}", values.len() + 1));
            values.push(merged.get(*column).cloned().into());
        }
        let update_clause = INDEX_COLUMNS
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO commits ({}) VALUES ({}) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, {update_clause}",
            columns.join(", "),
            placeholders.join(", "),
        );
        self.db
            .execute(Statement::from_sql_and_values(backend, sql, values))
            .await?;
        Ok(())
    }

    async fn read_attributes(
        &self,
        key: BlobKey,
    ) -> Result<Option<HashMap<String, String>>, StoreError> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT * FROM commits WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?;
        let Some(row) = row else { return Ok(None) };
        let mut attributes = HashMap::new();
        for column in INDEX_COLUMNS {
            if let Ok(Some(value)) = row.try_get::<Option<String>>("", column) {
                attributes.insert((*column).to_string(), value);
            }
        }
        Ok(Some(attributes))
    }

    fn row_from_query_result(row: &sea_orm::QueryResult) -> Result<CommitRow, StoreError> {
        let key_hex: String = row.try_get("", "key")?;
        let key: BlobKey = key_hex.parse().map_err(StoreError::bad_request)?;
        let value: Vec<u8> = row.try_get("", "value")?;
        let mut attributes = HashMap::new();
        for column in INDEX_COLUMNS {
            if let Ok(Some(v)) = row.try_get::<Option<String>>("", column) {
                attributes.insert((*column).to_string(), v);
            }
        }
        Ok(CommitRow {
            key,
            value,
            attributes,
        })
    }
}

#[async_trait]
impl CommitStore for SqliteCommitStore {
    async fn put(
        &self,
        key: BlobKey,
        value: Vec<u8>,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError> {
        check_attributes(&attributes)?;
        self.write_row(key, Some(value), stringify(attributes))
            .await
    }

    async fn update_index(
        &self,
        key: BlobKey,
        attributes: HashMap<String, AttrValue>,
    ) -> Result<(), StoreError> {
        check_attributes(&attributes)?;
        if !self.has_key(key).await? {
            return Err(StoreError::not_found(format!("commit row {key} not found")));
        }
        self.write_row(key, None, stringify(attributes)).await
    }

    async fn get(&self, key: BlobKey) -> Result<CommitRow, StoreError> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT * FROM commits WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?
            .ok_or_else(|| StoreError::not_found(format!("commit row {key} not found")))?;
        Self::row_from_query_result(&row)
    }

    async fn multiget(&self, keys: &[BlobKey]) -> Result<Vec<CommitRow>, StoreError> {
        let mut rows = Vec::with_capacity(keys.len());
        for key in keys {
            if let Ok(row) = self.get(*key).await {
                rows.push(row);
            }
        }
        Ok(rows)
    }

    async fn has_key(&self, key: BlobKey) -> Result<bool, StoreError> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT 1 AS present FROM commits WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?;
        Ok(row.is_some())
    }

    async fn remove(&self, key: BlobKey) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM commits WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?;
        Ok(())
    }

    async fn query(
        &self,
        predicates: &[Predicate],
        max_rows: usize,
    ) -> Result<Vec<CommitRow>, StoreError> {
        for predicate in predicates {
            check_index_name(&predicate.column)?;
        }
        let backend = self.db.get_database_backend();
        let mut clauses = Vec::with_capacity(predicates.len());
        let mut values: Vec<sea_orm::Value> = Vec::with_capacity(predicates.len());
        for predicate in predicates {
            let op = match predicate.op {
                Op::Eq => "=",
                Op::Gt => ">",
            };
            values.push(predicate.value.clone().into());
            clauses.push(format!("{} {op} ${}", predicate.column, values.len()));
        }
        let where_clause = if clauses.is_empty() {
            "1 = 1".to_string()
        } else {
            clauses.join(" AND ")
        };
        let sql = format!("SELECT * FROM commits WHERE {where_clause} LIMIT {max_rows}");
        let rows = self
            .db
            .query_all(Statement::from_sql_and_values(backend, sql, values))
            .await?;
        rows.iter().map(Self::row_from_query_result).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attr(pairs: &[(&str, &str)]) -> HashMap<String, AttrValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), AttrValue::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn put_and_get_round_trip() {
        let store = MemoryCommitStore::new();
        let key = BlobKey::new(b"commit-1");
        store
            .put(key, b"payload".to_vec(), attr(&[("repository_key", "R1")]))
            .await
            .unwrap();
        let row = store.get(key).await.unwrap();
        assert_eq!(row.value, b"payload");
        assert_eq!(row.attributes["repository_key"], "R1");
    }

    #[tokio::test]
    async fn rejects_non_indexed_column() {
        let store = MemoryCommitStore::new();
        let key = BlobKey::new(b"commit-2");
        let result = store
            .put(key, Vec::new(), attr(&[("not_a_column", "x")]))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidIndex(_))));
    }

    #[tokio::test]
    async fn rejects_non_string_value() {
        let store = MemoryCommitStore::new();
        let key = BlobKey::new(b"commit-3");
        let mut attributes = HashMap::new();
        attributes.insert("repository_key".to_string(), AttrValue::from(42));
        let result = store.put(key, Vec::new(), attributes).await;
        assert!(matches!(result, Err(StoreError::InvalidValueType(_))));
    }

    #[tokio::test]
    async fn update_index_merges_without_rewriting_value() {
        let store = MemoryCommitStore::new();
        let key = BlobKey::new(b"commit-4");
        store
            .put(key, b"payload".to_vec(), attr(&[("branch_name", "master")]))
            .await
            .unwrap();
        store
            .update_index(key, attr(&[("branch_name", "")]))
            .await
            .unwrap();
        let row = store.get(key).await.unwrap();
        assert_eq!(row.value, b"payload");
        assert_eq!(row.attributes["branch_name"], "");
    }

    #[tokio::test]
    async fn query_matches_conjunction() {
        let store = MemoryCommitStore::new();
        let k1 = BlobKey::new(b"commit-5");
        let k2 = BlobKey::new(b"commit-6");
        store
            .put(
                k1,
                Vec::new(),
                attr(&[("repository_key", "R1"), ("branch_name", "master")]),
            )
            .await
            .unwrap();
        store
            .put(
                k2,
                Vec::new(),
                attr(&[("repository_key", "R1"), ("branch_name", "dev")]),
            )
            .await
            .unwrap();

        let results = store
            .query(
                &[
                    Predicate::eq("repository_key", "R1"),
                    Predicate::eq("branch_name", "master"),
                ],
                10_000_000,
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, k1);
    }
}
