//! Primary key values used for identity and relation references.
//!
//! Keys are kept independent of the column type they were read from, so an
//! `INTEGER` key decoded as `i32` and a `BIGINT` key decoded as `i64` compare
//! equal. `EntityKey::to_db_values` turns a key back into typed parameters.

use crate::schema::ScalarType;
use sea_orm::Value;
use std::fmt;
use uuid::Uuid;

/// A single primary key component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyValue {
    Int(i64),
    String(String),
    Uuid(Uuid),
}

impl KeyValue {
    /// Create from a sea_orm::Value; NULLs and non-key types yield `None`
    pub fn from_db_value(value: &Value) -> Option<Self> {
        match value {
            Value::TinyInt(Some(i)) => Some(Self::Int(i64::from(*i))),
            Value::SmallInt(Some(i)) => Some(Self::Int(i64::from(*i))),
            Value::Int(Some(i)) => Some(Self::Int(i64::from(*i))),
            Value::BigInt(Some(i)) => Some(Self::Int(*i)),
            Value::Unsigned(Some(i)) => Some(Self::Int(i64::from(*i))),
            Value::String(Some(s)) => Some(Self::String((**s).clone())),
            Value::Uuid(Some(uuid)) => Some(Self::Uuid(**uuid)),
            _ => None,
        }
    }

    /// Convert to a sea_orm::Value typed for the key column
    pub fn to_db_value(&self, ty: ScalarType) -> Value {
        match (self, ty) {
            (Self::Int(value), ScalarType::Integer) => Value::Int(Some(*value as i32)),
            (Self::Int(value), _) => Value::BigInt(Some(*value)),
            (Self::String(value), _) => Value::String(Some(Box::new(value.clone()))),
            (Self::Uuid(value), _) => Value::Uuid(Some(Box::new(*value))),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{}", value),
            Self::String(value) => write!(f, "{}", value),
            Self::Uuid(value) => write!(f, "{}", value),
        }
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

/// Primary key of a persisted row, one component per primary key column
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(Vec<KeyValue>);

impl EntityKey {
    pub fn new(parts: Vec<KeyValue>) -> Self {
        Self(parts)
    }

    pub fn single(part: impl Into<KeyValue>) -> Self {
        Self(vec![part.into()])
    }

    pub fn parts(&self) -> &[KeyValue] {
        &self.0
    }

    /// The only component of a single-column key
    pub fn as_single(&self) -> Option<&KeyValue> {
        match self.0.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Build a key from the values of the primary key columns, in order
    pub fn from_db_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Self> {
        let parts = values
            .into_iter()
            .map(KeyValue::from_db_value)
            .collect::<Option<Vec<_>>>()?;
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }

    pub fn to_db_values(&self, types: &[ScalarType]) -> Vec<Value> {
        self.0
            .iter()
            .zip(types.iter())
            .map(|(part, ty)| part.to_db_value(*ty))
            .collect()
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

macro_rules! single_key_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for EntityKey {
                fn from(value: $ty) -> Self {
                    Self::single(value)
                }
            }
        )*
    };
}

single_key_from!(KeyValue, i32, i64, String, &str, Uuid);
