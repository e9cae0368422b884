//! Table-style access to the hosted store.
//!
//! Rows travel as JSON objects; typed mapping happens in the gateway.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

use crate::error::Result;

/// Tables the application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Properties,
    PropertyImages,
    ViewHistory,
    Favorites,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Properties => "properties",
            Table::PropertyImages => "property_images",
            Table::ViewHistory => "view_history",
            Table::Favorites => "favorites",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq { column: String, value: Value },
    In { column: String, values: Vec<Value> },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Condition::Eq { column, .. } | Condition::In { column, .. } => column,
        }
    }
}

/// Conjunction of conditions; an empty filter matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A `select` request: filter, optional ordering and row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filter = self.filter.is_in(column, values);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Table operations offered by the hosted store.
///
/// Implementations apply the row-level security of the current session;
/// callers never pass credentials.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Returns the rows matching `query`.
    async fn select(&self, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Inserts one row and returns it as stored (with generated columns).
    async fn insert(&self, table: Table, row: Value) -> Result<Value>;

    /// Applies `patch` to every row matching `filter`; returns the number of rows changed.
    async fn update(&self, table: Table, filter: &Filter, patch: Value) -> Result<usize>;

    /// Deletes every row matching `filter`; returns the number of rows removed.
    async fn delete(&self, table: Table, filter: &Filter) -> Result<usize>;
}
