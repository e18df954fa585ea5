use crate::config::MapperConfig;
use crate::dialect::Dialect;
use crate::schema::{
    EntityDescriptor, PropertyDescriptor, PropertyKind, ScalarType, Schema, Shape,
};
use crate::types::{InlayError, InlayResult};
use sea_orm::sea_query::ArrayType;
use sea_orm::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Physical type of a flattened column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Scalar(ScalarType),
    /// Whole embedded array encoded as one JSON document
    JsonArray,
    /// One element leaf of an embedded array, index `i` holding element `i`
    NativeArray(ScalarType),
}

impl ColumnType {
    pub fn null_value(&self) -> Value {
        match self {
            Self::Scalar(ty) => ty.null_value(),
            Self::JsonArray => Value::Json(None),
            Self::NativeArray(ty) => Value::Array(array_type(*ty), None),
        }
    }
}

pub(crate) fn array_type(ty: ScalarType) -> ArrayType {
    match ty {
        ScalarType::Integer => ArrayType::Int,
        ScalarType::BigInteger => ArrayType::BigInt,
        ScalarType::Text => ArrayType::String,
        ScalarType::Boolean => ArrayType::Bool,
        ScalarType::Double => ArrayType::Double,
        ScalarType::Decimal => ArrayType::Decimal,
        ScalarType::Uuid => ArrayType::Uuid,
        ScalarType::DateTime => ArrayType::ChronoDateTimeWithTimeZone,
        ScalarType::Json => ArrayType::Json,
    }
}

/// One column of an entity table
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    /// Property path from the entity root that this column stores
    pub path: Vec<String>,
    pub ty: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    /// The property or one of its embedded ancestors is lazy
    pub lazy: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
}

impl ColumnSpec {
    pub fn under(&self, prefix: &[String]) -> bool {
        self.path.len() >= prefix.len() && self.path[..prefix.len()] == *prefix
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Inherited {
    nullable: bool,
    lazy: bool,
}

/// Stateless mapping facade over a registered schema.
///
/// Cheap to clone and safe to share between tasks once built.
#[derive(Debug, Clone)]
pub struct Mapper {
    schema: Arc<Schema>,
    config: MapperConfig,
    dialect: Dialect,
}

impl Mapper {
    pub fn new(
        schema: impl Into<Arc<Schema>>,
        config: MapperConfig,
        dialect: Dialect,
    ) -> InlayResult<Self> {
        config.validate(&dialect)?;
        let mapper = Self {
            schema: schema.into(),
            config,
            dialect,
        };
        for entity in mapper.schema.entities() {
            mapper.check_unique_columns(entity)?;
        }
        Ok(mapper)
    }

    // Prefixing alone cannot separate `a_b` from `a.b` under the same separator
    fn check_unique_columns(&self, entity: &EntityDescriptor) -> InlayResult<()> {
        let mut seen = HashSet::new();
        for column in self.columns(entity)? {
            if !seen.insert(column.name.clone()) {
                return Err(InlayError::invalid_schema(format!(
                    "entity '{}' maps more than one property to column '{}'",
                    entity.name, column.name
                )));
            }
        }
        Ok(())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub(crate) fn native_arrays(&self) -> bool {
        self.config.uses_native_arrays(&self.dialect)
    }

    pub fn column_name(&self, segments: &[String]) -> String {
        segments.join(&self.config.column_separator)
    }

    /// Every column of the entity's table, in declaration order
    pub fn columns(&self, entity: &EntityDescriptor) -> InlayResult<Vec<ColumnSpec>> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_columns(entity, &mut path, Inherited::default(), &mut out)?;
        Ok(out)
    }

    /// Columns stored under one property of `entity`, identified by its path
    pub fn columns_under(
        &self,
        entity: &EntityDescriptor,
        prefix: &[String],
    ) -> InlayResult<Vec<ColumnSpec>> {
        Ok(self
            .columns(entity)?
            .into_iter()
            .filter(|c| c.under(prefix))
            .collect())
    }

    pub fn primary_key_columns(&self, entity: &EntityDescriptor) -> InlayResult<Vec<ColumnSpec>> {
        Ok(self
            .columns(entity)?
            .into_iter()
            .filter(|c| c.primary_key)
            .collect())
    }

    fn collect_columns(
        &self,
        shape: &dyn Shape,
        path: &mut Vec<String>,
        inherited: Inherited,
        out: &mut Vec<ColumnSpec>,
    ) -> InlayResult<()> {
        for property in shape.properties() {
            self.collect_property(property, path, inherited, out)?;
        }
        Ok(())
    }

    fn collect_property(
        &self,
        property: &PropertyDescriptor,
        path: &mut Vec<String>,
        inherited: Inherited,
        out: &mut Vec<ColumnSpec>,
    ) -> InlayResult<()> {
        let inherited = Inherited {
            nullable: inherited.nullable || property.nullable,
            lazy: inherited.lazy || property.lazy,
        };
        path.push(property.name.clone());
        match &property.kind {
            PropertyKind::Scalar(ty) => {
                out.push(ColumnSpec {
                    name: self.column_name(path),
                    path: path.clone(),
                    ty: ColumnType::Scalar(*ty),
                    nullable: inherited.nullable,
                    unique: property.unique,
                    lazy: inherited.lazy,
                    primary_key: property.primary_key,
                    auto_increment: property.auto_increment,
                });
            }
            PropertyKind::Embedded(inner) => {
                self.collect_columns(&**inner, path, inherited, out)?;
            }
            PropertyKind::EmbeddedArray(inner) => {
                if self.native_arrays() {
                    for (leaf, ty) in element_leaves(&**inner) {
                        let mut full = path.clone();
                        full.extend(leaf);
                        out.push(ColumnSpec {
                            name: self.column_name(&full),
                            path: full,
                            ty: ColumnType::NativeArray(ty),
                            nullable: inherited.nullable,
                            unique: false,
                            lazy: inherited.lazy,
                            primary_key: false,
                            auto_increment: false,
                        });
                    }
                } else {
                    out.push(ColumnSpec {
                        name: self.column_name(path),
                        path: path.clone(),
                        ty: ColumnType::JsonArray,
                        nullable: inherited.nullable,
                        unique: property.unique,
                        lazy: inherited.lazy,
                        primary_key: false,
                        auto_increment: false,
                    });
                }
            }
            PropertyKind::Relation(relation) => {
                let target = self.schema.entity(&relation.target)?;
                let key_type = target
                    .primary_key_types()
                    .first()
                    .copied()
                    .unwrap_or(ScalarType::Integer);
                let mut fk_path = path[..path.len() - 1].to_vec();
                fk_path.push(relation.foreign_key.clone());
                out.push(ColumnSpec {
                    name: self.column_name(&fk_path),
                    path: path.clone(),
                    ty: ColumnType::Scalar(key_type),
                    nullable: inherited.nullable,
                    unique: property.unique,
                    lazy: inherited.lazy,
                    primary_key: false,
                    auto_increment: false,
                });
            }
        }
        path.pop();
        Ok(())
    }
}

/// Scalar leaves of an array element, relative to the element.
///
/// Nested arrays inside an element are JSON-encoded per element.
pub(crate) fn element_leaves(shape: &dyn Shape) -> Vec<(Vec<String>, ScalarType)> {
    fn walk(shape: &dyn Shape, path: &mut Vec<String>, out: &mut Vec<(Vec<String>, ScalarType)>) {
        for property in shape.properties() {
            path.push(property.name.clone());
            match &property.kind {
                PropertyKind::Scalar(ty) => out.push((path.clone(), *ty)),
                PropertyKind::Embedded(inner) => walk(&**inner, path, out),
                PropertyKind::EmbeddedArray(_) => out.push((path.clone(), ScalarType::Json)),
                // rejected at registration
                PropertyKind::Relation(_) => {}
            }
            path.pop();
        }
    }
    let mut out = Vec::new();
    walk(shape, &mut Vec::new(), &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::EmbeddableDescriptor;
    use sea_orm::DbBackend;

    fn schema() -> Schema {
        let address = EmbeddableDescriptor::builder("Address")
            .property(PropertyDescriptor::scalar("street", ScalarType::Text))
            .property(PropertyDescriptor::scalar("zip", ScalarType::Text).nullable())
            .build();
        let properties = EmbeddableDescriptor::builder("Properties")
            .property(PropertyDescriptor::scalar("tag", ScalarType::Text).lazy())
            .property(
                PropertyDescriptor::relation("organization", "Organization")
                    .foreign_key("organization_id"),
            )
            .build();
        Schema::builder()
            .entity(
                EntityDescriptor::builder("Organization")
                    .property(
                        PropertyDescriptor::scalar("id", ScalarType::BigInteger).primary_key(),
                    )
                    .build(),
            )
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::embedded("properties", properties).nullable())
                    .property(PropertyDescriptor::embedded_array("addresses", address))
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_embedded_columns_are_prefixed() {
        let mapper = Mapper::new(
            schema(),
            MapperConfig::default(),
            Dialect::for_backend(DbBackend::Sqlite),
        )
        .unwrap();
        let user = mapper.schema().entity("User").unwrap().clone();
        let columns = mapper.columns(&user).unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "properties_tag", "properties_organization_id", "addresses"]
        );

        let tag = &columns[1];
        assert!(tag.lazy && tag.nullable);
        let fk = &columns[2];
        assert_eq!(fk.ty, ColumnType::Scalar(ScalarType::BigInteger));
        assert_eq!(fk.path, vec!["properties".to_string(), "organization".to_string()]);
        assert_eq!(columns[3].ty, ColumnType::JsonArray);
    }

    #[test]
    fn test_native_array_columns_per_leaf() {
        let mapper = Mapper::new(
            schema(),
            MapperConfig::default().column_separator("__"),
            Dialect::for_backend(DbBackend::Postgres),
        )
        .unwrap();
        let user = mapper.schema().entity("User").unwrap().clone();
        let columns = mapper.columns_under(&user, &["addresses".to_string()]).unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["addresses__street", "addresses__zip"]);
        assert_eq!(columns[0].ty, ColumnType::NativeArray(ScalarType::Text));
    }

    #[test]
    fn test_colliding_column_names_rejected() {
        let properties = EmbeddableDescriptor::builder("Properties")
            .property(PropertyDescriptor::scalar("tag", ScalarType::Text))
            .build();
        let schema = Schema::builder()
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::scalar("properties_tag", ScalarType::Text))
                    .property(PropertyDescriptor::embedded("properties", properties))
                    .build(),
            )
            .build()
            .unwrap();
        let result = Mapper::new(
            schema.clone(),
            MapperConfig::default(),
            Dialect::for_backend(DbBackend::Sqlite),
        );
        assert!(matches!(result, Err(InlayError::InvalidSchema { .. })));

        // a different separator keeps the two apart
        let mapper = Mapper::new(
            schema,
            MapperConfig::default().column_separator("__"),
            Dialect::for_backend(DbBackend::Sqlite),
        );
        assert!(mapper.is_ok());
    }
}
