//! In-memory implementation of the table store.
//!
//! Mirrors the filtering, ordering and id generation of the hosted store
//! closely enough for tests and the offline demo.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use estate_core::error::{EstateError, Result};
use estate_core::store::{Condition, Filter, Query, StoreBackend, Table};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
struct Tables {
    rows: HashMap<Table, Vec<Value>>,
    next_id: u64,
    failing: HashSet<Table>,
}

/// Thread-safe in-memory table store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts rows as-is, assigning ids to rows that have none.
    pub fn seed(&self, table: Table, rows: impl IntoIterator<Item = Value>) -> Result<()> {
        let mut tables = self.lock()?;
        for row in rows {
            let row = tables.with_id(row)?;
            tables.rows.entry(table).or_default().push(row);
        }
        Ok(())
    }

    /// Makes every operation on `table` fail until cleared.
    pub fn set_failing(&self, table: Table, failing: bool) -> Result<()> {
        let mut tables = self.lock()?;
        if failing {
            tables.failing.insert(table);
        } else {
            tables.failing.remove(&table);
        }
        Ok(())
    }

    /// Snapshot of a table's rows in insertion order.
    pub fn rows(&self, table: Table) -> Result<Vec<Value>> {
        Ok(self.lock()?.rows.get(&table).cloned().unwrap_or_default())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|_| EstateError::internal("memory store lock poisoned"))
    }
}

impl Tables {
    fn check(&self, table: Table) -> Result<()> {
        if self.failing.contains(&table) {
            Err(EstateError::backend(
                Some(503),
                format!("table '{table}' is unavailable"),
            ))
        } else {
            Ok(())
        }
    }

    fn with_id(&mut self, row: Value) -> Result<Value> {
        let Value::Object(mut object) = row else {
            return Err(EstateError::backend(Some(400), "row must be a JSON object"));
        };
        match object.get("id") {
            Some(Value::Number(n)) => {
                if let Some(n) = n.as_u64() {
                    self.next_id = self.next_id.max(n);
                }
            }
            Some(Value::Null) | None => {
                self.next_id += 1;
                object.insert("id".to_string(), Value::from(self.next_id));
            }
            Some(_) => {}
        }
        Ok(Value::Object(object))
    }
}

#[async_trait]
impl StoreBackend for MemoryStore {
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>> {
        let tables = self.lock()?;
        tables.check(table)?;

        let mut rows: Vec<Value> = tables
            .rows
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_filter(row, &query.filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = compare_values(
                    a.get(&order.column).unwrap_or(&Value::Null),
                    b.get(&order.column).unwrap_or(&Value::Null),
                );
                if order.ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: Value) -> Result<Value> {
        let mut tables = self.lock()?;
        tables.check(table)?;
        let row = tables.with_id(row)?;
        tables.rows.entry(table).or_default().push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<usize> {
        let mut tables = self.lock()?;
        tables.check(table)?;
        let Value::Object(patch) = patch else {
            return Err(EstateError::backend(Some(400), "patch must be a JSON object"));
        };

        let mut changed = 0;
        for row in tables.rows.entry(table).or_default().iter_mut() {
            if matches_filter(row, filter) {
                if let Value::Object(object) = row {
                    merge(object, &patch);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize> {
        let mut tables = self.lock()?;
        tables.check(table)?;
        let rows = tables.rows.entry(table).or_default();
        let before = rows.len();
        rows.retain(|row| !matches_filter(row, filter));
        Ok(before - rows.len())
    }
}

fn merge(object: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        object.insert(key.clone(), value.clone());
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    filter.conditions.iter().all(|condition| match condition {
        Condition::Eq { column, value } => row
            .get(column)
            .is_some_and(|actual| scalar_eq(actual, value)),
        Condition::In { column, values } => row
            .get(column)
            .is_some_and(|actual| values.iter().any(|v| scalar_eq(actual, v))),
    })
}

/// Equality the way a SQL column compares against a text literal:
/// `4` and `"4"` are the same key.
fn scalar_eq(a: &Value, b: &Value) -> bool {
    canonical(a) == canonical(b)
}

fn canonical(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(x), Some(y)) = (as_timestamp(a), as_timestamp(b)) {
        return x.cmp(&y);
    }
    canonical(a).cmp(&canonical(b))
}

fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert(Table::Favorites, json!({"user_id": "u1", "property_id": "1"}))
            .await
            .unwrap();
        let b = store
            .insert(Table::Favorites, json!({"user_id": "u1", "property_id": "2"}))
            .await
            .unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
    }

    #[tokio::test]
    async fn test_seed_keeps_explicit_ids() {
        let store = MemoryStore::new();
        store
            .seed(Table::Properties, [json!({"id": 10, "title": "A"})])
            .unwrap();
        let row = store
            .insert(Table::Properties, json!({"title": "B"}))
            .await
            .unwrap();
        assert_eq!(row["id"], json!(11));
    }

    #[tokio::test]
    async fn test_select_filters_loosely_and_orders() {
        let store = MemoryStore::new();
        store
            .seed(
                Table::ViewHistory,
                [
                    json!({"user_id": "u1", "property_id": 1, "viewed_at": "2025-01-01T10:00:00Z"}),
                    json!({"user_id": "u1", "property_id": 2, "viewed_at": "2025-01-01T10:00:00.500Z"}),
                    json!({"user_id": "u2", "property_id": 3, "viewed_at": "2025-01-03T10:00:00Z"}),
                ],
            )
            .unwrap();

        let query = Query::new()
            .eq("user_id", "u1")
            .is_in("property_id", ["1", "2"])
            .order_by("viewed_at", false);
        let rows = store.select(Table::ViewHistory, &query).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["property_id"].clone()).collect();
        assert_eq!(ids, vec![json!(2), json!(1)]);

        let limited = store
            .select(Table::ViewHistory, &Query::new().limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete_report_counts() {
        let store = MemoryStore::new();
        store
            .seed(
                Table::Favorites,
                [
                    json!({"user_id": "u1", "property_id": "1"}),
                    json!({"user_id": "u1", "property_id": "2"}),
                ],
            )
            .unwrap();

        let changed = store
            .update(
                Table::Favorites,
                &Filter::new().eq("property_id", "2"),
                json!({"favorited_at": "2025-01-01T00:00:00Z"}),
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);

        let removed = store
            .delete(Table::Favorites, &Filter::new().eq("user_id", "u1"))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(store.rows(Table::Favorites).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failing_table() {
        let store = MemoryStore::new();
        store.set_failing(Table::Properties, true).unwrap();
        let err = store
            .select(Table::Properties, &Query::new())
            .await
            .unwrap_err();
        assert!(err.is_transient());

        store.set_failing(Table::Properties, false).unwrap();
        assert!(store.select(Table::Properties, &Query::new()).await.is_ok());
    }
}
