use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// A stored document: named fields mapped to JSON values.
pub type Record = serde_json::Map<String, Value>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("record already exists: {collection}/{id}")]
    AlreadyExists { collection: String, id: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

/// A conjunctive predicate on a named field. Comparisons order numbers
/// numerically and strings lexicographically; mismatched types never match.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Gt, value)
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Ge, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Lt, value)
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Le, value)
    }

    pub fn matches(&self, record: &Record) -> bool {
        let field_value = record.get(&self.field).unwrap_or(&Value::Null);
        match self.op {
            FilterOp::Eq => field_value == &self.value,
            op => match compare_values(field_value, &self.value) {
                Some(ordering) => match op {
                    FilterOp::Gt => ordering == Ordering::Greater,
                    FilterOp::Ge => ordering != Ordering::Less,
                    FilterOp::Lt => ordering == Ordering::Less,
                    FilterOp::Le => ordering != Ordering::Greater,
                    FilterOp::Eq => unreachable!(),
                },
                None => false,
            },
        }
    }
}

/// Cross-type comparisons are undefined; nulls sort before everything.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64()?;
            let y = y.as_f64()?;
            x.partial_cmp(&y)
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub dir: SortDir,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            dir: SortDir::Desc,
        }
    }
}

/// A single field mutation within an update.
#[derive(Debug, Clone)]
pub enum Patch {
    /// Replace the field with a literal value.
    Set(Value),
    /// Add a signed delta to a numeric field, atomically with respect to
    /// concurrent increments. A missing or non-numeric field counts as 0.
    Increment(i64),
}

/// An ordered set of field patches applied as one atomic write.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub patches: BTreeMap<String, Patch>,
}

impl Update {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.patches.insert(field.into(), Patch::Set(value.into()));
        self
    }

    pub fn increment(mut self, field: impl Into<String>, delta: i64) -> Self {
        self.patches.insert(field.into(), Patch::Increment(delta));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn merge(mut self, other: Update) -> Self {
        self.patches.extend(other.patches);
        self
    }
}

/// The record-store seam every higher component depends on. Backends must
/// make `Increment` patches atomic relative to concurrent writers, and must
/// evaluate `update_if` guards and apply the update as one atomic step.
/// Those two properties are the only concurrency primitives the core
/// relies on.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Filtered, ordered, truncated read. Filters are ANDed.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Record)>>;

    /// Read one record by id.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Record>>;

    /// Create a record under a backend-generated id.
    async fn create(&self, collection: &str, record: Record) -> Result<String>;

    /// Create a record under a caller-supplied id.
    async fn create_with_id(&self, collection: &str, id: &str, record: Record) -> Result<()>;

    /// Apply field patches to an existing record.
    async fn update(&self, collection: &str, id: &str, update: Update) -> Result<()>;

    /// Apply field patches only if every guard predicate holds against the
    /// current record. Returns `false` (and writes nothing) when a guard
    /// fails. This is the compare-and-set primitive moderation uses to make
    /// status transitions at-most-once.
    async fn update_if(
        &self,
        collection: &str,
        id: &str,
        guards: &[Filter],
        update: Update,
    ) -> Result<bool>;

    /// Number of records matching the filters.
    async fn count(&self, collection: &str, filters: &[Filter]) -> Result<usize>;
}
