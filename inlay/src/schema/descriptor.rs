use heck::ToSnakeCase;
use sea_orm::Value;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Column types understood by DDL, row decoding and JSON encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Integer,
    BigInteger,
    Text,
    Boolean,
    Double,
    Decimal,
    Uuid,
    DateTime,
    Json,
}

impl ScalarType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::BigInteger => "big_integer",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Uuid => "uuid",
            Self::DateTime => "date_time",
            Self::Json => "json",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Integer | Self::BigInteger)
    }

    /// A typed SQL NULL for this column type
    pub fn null_value(&self) -> Value {
        match self {
            Self::Integer => Value::Int(None),
            Self::BigInteger => Value::BigInt(None),
            Self::Text => Value::String(None),
            Self::Boolean => Value::Bool(None),
            Self::Double => Value::Double(None),
            Self::Decimal => Value::Decimal(None),
            Self::Uuid => Value::Uuid(None),
            Self::DateTime => Value::ChronoDateTimeWithTimeZone(None),
            Self::Json => Value::Json(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    pub target: String,
    /// Column name of the foreign key, relative to the owning shape
    pub foreign_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Scalar(ScalarType),
    Embedded(Arc<EmbeddableDescriptor>),
    EmbeddedArray(Arc<EmbeddableDescriptor>),
    Relation(RelationDescriptor),
}

impl PropertyKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Embedded(_) => "embedded",
            Self::EmbeddedArray(_) => "embedded-array",
            Self::Relation(_) => "relation",
        }
    }

    pub fn embeddable(&self) -> Option<&Arc<EmbeddableDescriptor>> {
        match self {
            Self::Embedded(shape) | Self::EmbeddedArray(shape) => Some(shape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub kind: PropertyKind,
    pub nullable: bool,
    pub unique: bool,
    /// Lazy properties are left out of the default fetch set
    pub lazy: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl PropertyDescriptor {
    fn with_kind(name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            unique: false,
            lazy: false,
            primary_key: false,
            auto_increment: false,
        }
    }

    pub fn scalar(name: impl Into<String>, ty: ScalarType) -> Self {
        Self::with_kind(name, PropertyKind::Scalar(ty))
    }

    pub fn embedded(name: impl Into<String>, shape: EmbeddableDescriptor) -> Self {
        Self::with_kind(name, PropertyKind::Embedded(Arc::new(shape)))
    }

    pub fn embedded_array(name: impl Into<String>, shape: EmbeddableDescriptor) -> Self {
        Self::with_kind(name, PropertyKind::EmbeddedArray(Arc::new(shape)))
    }

    /// Many-to-one reference; the foreign key column defaults to the property name
    pub fn relation(name: impl Into<String>, target: impl Into<String>) -> Self {
        let name = name.into();
        let foreign_key = name.clone();
        Self::with_kind(
            name,
            PropertyKind::Relation(RelationDescriptor {
                target: target.into(),
                foreign_key,
            }),
        )
    }

    /// Integer keys are auto-incremented unless `auto_increment(false)` follows
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.auto_increment = matches!(self.kind, PropertyKind::Scalar(ty) if ty.is_integer());
        self
    }

    pub fn auto_increment(mut self, enabled: bool) -> Self {
        self.auto_increment = enabled;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
        if let PropertyKind::Relation(relation) = &mut self.kind {
            relation.foreign_key = column.into();
        }
        self
    }

    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            PropertyKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Anything that owns an ordered list of properties
pub trait Shape {
    fn shape_name(&self) -> &str;
    fn properties(&self) -> &[PropertyDescriptor];

    fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties().iter().find(|p| p.name == name)
    }
}

/// Value-object shape: no identity, no table, always owned by one property
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddableDescriptor {
    pub name: String,
    pub properties: Vec<PropertyDescriptor>,
}

impl EmbeddableDescriptor {
    pub fn builder(name: impl Into<String>) -> EmbeddableBuilder {
        EmbeddableBuilder {
            name: name.into(),
            properties: Vec::new(),
        }
    }
}

impl Shape for EmbeddableDescriptor {
    fn shape_name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub name: String,
    pub table: String,
    pub properties: Vec<PropertyDescriptor>,
    pub primary_key: Vec<String>,
}

impl EntityDescriptor {
    pub fn builder(name: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            name: name.into(),
            table: None,
            properties: Vec::new(),
        }
    }

    pub fn primary_key_properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.primary_key.iter().filter_map(|name| self.property(name))
    }

    pub fn primary_key_types(&self) -> Vec<ScalarType> {
        self.primary_key_properties()
            .filter_map(PropertyDescriptor::scalar_type)
            .collect()
    }

    /// The auto-increment primary key column, if the key is a single generated integer
    pub fn generated_key(&self) -> Option<&PropertyDescriptor> {
        match self.primary_key.as_slice() {
            [only] => self.property(only).filter(|p| p.auto_increment),
            _ => None,
        }
    }
}

impl Shape for EntityDescriptor {
    fn shape_name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> &[PropertyDescriptor] {
        &self.properties
    }
}

pub struct EntityBuilder {
    name: String,
    table: Option<String>,
    properties: Vec<PropertyDescriptor>,
}

impl EntityBuilder {
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    /// Table defaults to the snake_case entity name
    pub fn build(self) -> EntityDescriptor {
        let table = self.table.unwrap_or_else(|| self.name.to_snake_case());
        let primary_key = self
            .properties
            .iter()
            .filter(|p| p.primary_key)
            .map(|p| p.name.clone())
            .collect();
        EntityDescriptor {
            name: self.name,
            table,
            properties: self.properties,
            primary_key,
        }
    }
}

pub struct EmbeddableBuilder {
    name: String,
    properties: Vec<PropertyDescriptor>,
}

impl EmbeddableBuilder {
    pub fn property(mut self, property: PropertyDescriptor) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self) -> EmbeddableDescriptor {
        EmbeddableDescriptor {
            name: self.name,
            properties: self.properties,
        }
    }
}

/// Implemented by `#[derive(Entity)]`
pub trait DescribeEntity {
    const NAME: &'static str;

    fn entity_descriptor() -> EntityDescriptor;
}

/// Implemented by `#[derive(Embeddable)]`
pub trait DescribeEmbeddable {
    fn embeddable_descriptor() -> EmbeddableDescriptor;
}
