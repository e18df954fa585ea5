//! In-memory object graph.
//!
//! Every property slot is a tri-state [`Field`]: never fetched, fetched but
//! NULL, or hydrated. Embedded value objects are nested [`Object`]s owned by
//! value; relations are [`Reference`]s to a managed instance or a persisted key.

use crate::key_types::EntityKey;
use rust_decimal::Decimal;
use sea_orm::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Index of an instance managed by an [`crate::EntityManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) usize);

impl Handle {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reference {
    /// An instance of the current unit of work, possibly not inserted yet
    Managed(Handle),
    /// A persisted row
    Key(EntityKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Value),
    Embedded(Object),
    EmbeddedArray(Vec<Object>),
    Reference(Reference),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Field {
    /// Not requested; reading it says nothing about the stored value
    #[default]
    Unloaded,
    /// Requested, stored value is NULL
    Null,
    Value(FieldValue),
}

pub(crate) static UNLOADED: Field = Field::Unloaded;

impl Field {
    pub fn is_loaded(&self) -> bool {
        !matches!(self, Self::Unloaded)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn value(&self) -> Option<&FieldValue> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Value(FieldValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.as_scalar()? {
            Value::String(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.as_scalar()? {
            Value::TinyInt(Some(i)) => Some(i64::from(*i)),
            Value::SmallInt(Some(i)) => Some(i64::from(*i)),
            Value::Int(Some(i)) => Some(i64::from(*i)),
            Value::BigInt(Some(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar()? {
            Value::Bool(Some(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar()? {
            Value::Double(Some(d)) => Some(*d),
            Value::Float(Some(f)) => Some(f64::from(*f)),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Value(FieldValue::Embedded(object)) => Some(object),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut Object> {
        match self {
            Self::Value(FieldValue::Embedded(object)) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Self::Value(FieldValue::EmbeddedArray(items)) => Some(items),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Self::Value(FieldValue::Reference(reference)) => Some(reference),
            _ => None,
        }
    }
}

/// Property values of one entity or embeddable, keyed by property name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Object {
    fields: BTreeMap<String, Field>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Field>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Field>) {
        let value = value.into();
        let name = name.into();
        if value.is_loaded() {
            self.fields.insert(name, value);
        } else {
            self.fields.remove(&name);
        }
    }

    /// Absent properties read as `Field::Unloaded`
    pub fn get(&self, name: &str) -> &Field {
        self.fields.get(name).unwrap_or(&UNLOADED)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.get_mut(name)
    }

    pub fn unset(&mut self, name: &str) -> Field {
        self.fields.remove(name).unwrap_or_default()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Field)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fill slots that are still unloaded here from `other`, recursing into
    /// embedded objects present on both sides. Loaded slots are kept.
    pub fn merge_unloaded(&mut self, other: Object) {
        for (name, incoming) in other.fields {
            match self.fields.get_mut(&name) {
                None => {
                    self.fields.insert(name, incoming);
                }
                Some(Field::Value(FieldValue::Embedded(mine))) => {
                    if let Field::Value(FieldValue::Embedded(theirs)) = incoming {
                        mine.merge_unloaded(theirs);
                    }
                }
                Some(_) => {}
            }
        }
    }

    /// Overwrite slots here with the loaded slots of `other`, recursing into
    /// embedded objects present on both sides. Slots `other` never loaded are kept.
    pub fn assign(&mut self, other: Object) {
        for (name, incoming) in other.fields {
            match incoming {
                Field::Value(FieldValue::Embedded(theirs)) => match self.fields.get_mut(&name) {
                    Some(Field::Value(FieldValue::Embedded(mine))) => mine.assign(theirs),
                    _ => {
                        self.fields.insert(name, Field::from(theirs));
                    }
                },
                incoming => {
                    self.fields.insert(name, incoming);
                }
            }
        }
    }
}

macro_rules! scalar_field_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Field {
                fn from(value: $ty) -> Self {
                    Field::Value(FieldValue::Scalar(Value::from(value)))
                }
            }

            impl From<Option<$ty>> for Field {
                fn from(value: Option<$ty>) -> Self {
                    value.map(Field::from).unwrap_or(Field::Null)
                }
            }
        )*
    };
}

scalar_field_from!(&str, String, i32, i64, bool, f64, Decimal, Uuid, serde_json::Value);

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        if crate::flatten::is_null(&value) {
            Field::Null
        } else {
            Field::Value(FieldValue::Scalar(value))
        }
    }
}

impl From<Object> for Field {
    fn from(value: Object) -> Self {
        Field::Value(FieldValue::Embedded(value))
    }
}

impl From<Option<Object>> for Field {
    fn from(value: Option<Object>) -> Self {
        value.map(Field::from).unwrap_or(Field::Null)
    }
}

impl From<Vec<Object>> for Field {
    fn from(value: Vec<Object>) -> Self {
        Field::Value(FieldValue::EmbeddedArray(value))
    }
}

impl From<Option<Vec<Object>>> for Field {
    fn from(value: Option<Vec<Object>>) -> Self {
        value.map(Field::from).unwrap_or(Field::Null)
    }
}

impl From<Reference> for Field {
    fn from(value: Reference) -> Self {
        Field::Value(FieldValue::Reference(value))
    }
}

impl From<Handle> for Field {
    fn from(value: Handle) -> Self {
        Field::Value(FieldValue::Reference(Reference::Managed(value)))
    }
}

impl From<EntityKey> for Field {
    fn from(value: EntityKey) -> Self {
        Field::Value(FieldValue::Reference(Reference::Key(value)))
    }
}

impl From<FieldValue> for Field {
    fn from(value: FieldValue) -> Self {
        Field::Value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tri_state() {
        let object = Object::new()
            .with("name", "Foo")
            .with("nickname", None::<String>);
        assert_eq!(object.get("name").as_str(), Some("Foo"));
        assert!(object.get("nickname").is_null());
        assert!(!object.get("tag").is_loaded());
    }

    #[test]
    fn test_setting_unloaded_removes_slot() {
        let mut object = Object::new().with("tag", "a");
        object.set("tag", Field::Unloaded);
        assert!(object.is_empty());
    }

    #[test]
    fn test_merge_unloaded_keeps_local_values() {
        let mut local = Object::new()
            .with("name", "changed")
            .with("properties", Object::new().with("tag", "mine"));
        let loaded = Object::new()
            .with("name", "stored")
            .with("email", "foo")
            .with(
                "properties",
                Object::new().with("tag", "stored").with("rank", 3),
            );
        local.merge_unloaded(loaded);

        assert_eq!(local.get("name").as_str(), Some("changed"));
        assert_eq!(local.get("email").as_str(), Some("foo"));
        let properties = local.get("properties").as_object().unwrap();
        assert_eq!(properties.get("tag").as_str(), Some("mine"));
        assert_eq!(properties.get("rank").as_i64(), Some(3));
    }

    #[test]
    fn test_assign_overwrites_loaded_slots_only() {
        let mut local = Object::new()
            .with("name", "stale")
            .with("properties", Object::new().with("tag", "old").with("rank", 1));
        let fresh = Object::new()
            .with("name", "fresh")
            .with("properties", Object::new().with("tag", "new"));
        local.assign(fresh);

        assert_eq!(local.get("name").as_str(), Some("fresh"));
        let properties = local.get("properties").as_object().unwrap();
        assert_eq!(properties.get("tag").as_str(), Some("new"));
        assert_eq!(properties.get("rank").as_i64(), Some(1));
    }
}
