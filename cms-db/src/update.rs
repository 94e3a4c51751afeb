//! Typed field updates.
//!
//! Column names never come from callers verbatim: each table exposes an enum
//! implementing [`Column`], string keys are parsed against it, and every value
//! is bound as a query parameter.

use sqlx::Executor;
use thiserror::Error;

use crate::DbBackend;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown column `{column}` for table `{table}`")]
pub struct UnknownColumn {
    pub table: &'static str,
    pub column: String,
}

/// A writable column of a single table.
pub trait Column: Copy + Eq + 'static {
    const TABLE: &'static str;

    /// Every column callers may write to.
    fn all() -> &'static [Self];

    fn name(self) -> &'static str;

    fn parse(key: &str) -> Result<Self, UnknownColumn> {
        Self::all()
            .iter()
            .copied()
            .find(|c| c.name() == key)
            .ok_or_else(|| UnknownColumn {
                table: Self::TABLE,
                column: key.to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Null,
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSet<C: Column> {
    fields: Vec<(C, FieldValue)>,
}

impl<C: Column> Default for UpdateSet<C> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<C: Column> UpdateSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column, replacing any earlier value for it.
    #[must_use]
    pub fn set(mut self, column: C, value: impl Into<FieldValue>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((column, value)),
        }
        self
    }

    /// Builds an update from caller-supplied keys, rejecting any key that is
    /// not a column of `C`.
    pub fn from_pairs<K, I>(pairs: I) -> Result<Self, UnknownColumn>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, FieldValue)>,
    {
        pairs.into_iter().try_fold(Self::new(), |set, (key, value)| {
            Ok(set.set(C::parse(key.as_ref())?, value))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_sql(&self) -> String {
        let assignments = self
            .fields
            .iter()
            .map(|(c, _)| format!("{} = ?", c.name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("UPDATE {} SET {assignments} WHERE id = ?", C::TABLE)
    }

    /// Applies the update to the row with `id`; returns the affected row count.
    /// An empty set touches nothing.
    pub async fn execute<'e, E>(&self, executor: E, id: i64) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = DbBackend>,
    {
        if self.is_empty() {
            return Ok(0);
        }

        let sql = self.to_sql();
        let mut query = sqlx::query(&sql);
        for (_, value) in &self.fields {
            query = match value {
                FieldValue::Int(v) => query.bind(*v),
                FieldValue::Text(v) => query.bind(v.as_str()),
                FieldValue::Null => query.bind(Option::<String>::None),
            };
        }
        let result = query.bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }
}
