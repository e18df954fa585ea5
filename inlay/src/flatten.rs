//! Object graph <-> flat row conversion.
//!
//! `flatten` only emits columns for loaded slots, so a partially loaded
//! object flattens to a partial row. `unflatten` is told which columns were
//! selected: a selected column missing from the row is an error, anything
//! outside the selection stays `Field::Unloaded`.

use crate::key_types::{EntityKey, KeyValue};
use crate::mapper::{element_leaves, ColumnSpec, ColumnType, Mapper};
use crate::schema::{EntityDescriptor, PropertyDescriptor, PropertyKind, ScalarType, Shape};
use crate::types::{InlayError, InlayResult};
use crate::value::{Field, FieldValue, Object, Reference};
use chrono::DateTime;
use rust_decimal::Decimal;
use sea_orm::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Column name -> value
pub type Row = BTreeMap<String, Value>;

/// Turns relation references into primary keys while flattening
pub trait KeyResolver {
    fn resolve(&self, reference: &Reference) -> Option<EntityKey>;
}

/// Resolves only references that already carry a key
pub struct KeysOnly;

impl KeyResolver for KeysOnly {
    fn resolve(&self, reference: &Reference) -> Option<EntityKey> {
        match reference {
            Reference::Key(key) => Some(key.clone()),
            Reference::Managed(_) => None,
        }
    }
}

pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Bool(v) => v.is_none(),
        Value::TinyInt(v) => v.is_none(),
        Value::SmallInt(v) => v.is_none(),
        Value::Int(v) => v.is_none(),
        Value::BigInt(v) => v.is_none(),
        Value::TinyUnsigned(v) => v.is_none(),
        Value::SmallUnsigned(v) => v.is_none(),
        Value::Unsigned(v) => v.is_none(),
        Value::BigUnsigned(v) => v.is_none(),
        Value::Float(v) => v.is_none(),
        Value::Double(v) => v.is_none(),
        Value::String(v) => v.is_none(),
        Value::Char(v) => v.is_none(),
        Value::Bytes(v) => v.is_none(),
        Value::Json(v) => v.is_none(),
        Value::Decimal(v) => v.is_none(),
        Value::Uuid(v) => v.is_none(),
        Value::ChronoDateTimeWithTimeZone(v) => v.is_none(),
        Value::Array(_, v) => v.is_none(),
        _ => false,
    }
}

impl Mapper {
    /// Flatten the loaded slots of `object` into a row
    pub fn flatten(
        &self,
        entity: &EntityDescriptor,
        object: &Object,
        keys: &dyn KeyResolver,
    ) -> InlayResult<Row> {
        let columns = self.columns(entity)?;
        let mut row = Row::new();
        let mut path = Vec::new();
        self.flatten_shape(entity, entity, object, &mut path, &columns, keys, &mut row)?;
        Ok(row)
    }

    #[allow(clippy::too_many_arguments)]
    fn flatten_shape(
        &self,
        entity: &EntityDescriptor,
        shape: &dyn Shape,
        object: &Object,
        path: &mut Vec<String>,
        columns: &[ColumnSpec],
        keys: &dyn KeyResolver,
        row: &mut Row,
    ) -> InlayResult<()> {
        for property in shape.properties() {
            path.push(property.name.clone());
            let field = object.get(&property.name);
            let result =
                self.flatten_property(entity, property, field, path, columns, keys, row);
            path.pop();
            result?;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn flatten_property(
        &self,
        entity: &EntityDescriptor,
        property: &PropertyDescriptor,
        field: &Field,
        path: &mut Vec<String>,
        columns: &[ColumnSpec],
        keys: &dyn KeyResolver,
        row: &mut Row,
    ) -> InlayResult<()> {
        let value = match field {
            Field::Unloaded => return Ok(()),
            Field::Null => {
                for column in columns.iter().filter(|c| c.under(path)) {
                    row.insert(column.name.clone(), column.ty.null_value());
                }
                return Ok(());
            }
            Field::Value(value) => value,
        };

        match (&property.kind, value) {
            (PropertyKind::Scalar(ty), FieldValue::Scalar(scalar)) => {
                let coerced = coerce_scalar(*ty, scalar, &path.join("."))?;
                row.insert(self.column_name(path), coerced);
            }
            (PropertyKind::Embedded(inner), FieldValue::Embedded(nested)) => {
                self.flatten_shape(entity, &**inner, nested, path, columns, keys, row)?;
            }
            (PropertyKind::EmbeddedArray(inner), FieldValue::EmbeddedArray(items)) => {
                if self.native_arrays() {
                    self.flatten_native_array(&**inner, items, path, columns, row)?;
                } else {
                    let encoded = items
                        .iter()
                        .map(|item| object_to_json(&**inner, item, &path.join(".")))
                        .collect::<InlayResult<Vec<_>>>()?;
                    row.insert(
                        self.column_name(path),
                        Value::Json(Some(Box::new(serde_json::Value::Array(encoded)))),
                    );
                }
            }
            (PropertyKind::Relation(relation), FieldValue::Reference(reference)) => {
                let column = columns
                    .iter()
                    .find(|c| c.path == *path)
                    .ok_or_else(|| InlayError::unknown_property(&entity.name, path.join(".")))?;
                let key = keys
                    .resolve(reference)
                    .ok_or_else(|| InlayError::UnresolvedReference {
                        entity: entity.name.clone(),
                        column: column.name.clone(),
                    })?;
                let target = self.schema().entity(&relation.target)?;
                let value = key
                    .to_db_values(&target.primary_key_types())
                    .into_iter()
                    .next()
                    .ok_or_else(|| InlayError::UnresolvedReference {
                        entity: entity.name.clone(),
                        column: column.name.clone(),
                    })?;
                row.insert(column.name.clone(), value);
            }
            (kind, _) => {
                return Err(InlayError::invalid_value(path.join("."), kind.label()));
            }
        }
        Ok(())
    }

    fn flatten_native_array(
        &self,
        shape: &dyn Shape,
        items: &[Object],
        path: &[String],
        columns: &[ColumnSpec],
        row: &mut Row,
    ) -> InlayResult<()> {
        let leaves = element_leaves(shape);
        let mut per_leaf: Vec<Vec<Value>> = vec![Vec::with_capacity(items.len()); leaves.len()];
        for item in items {
            let mut element = BTreeMap::new();
            flatten_element(shape, item, &mut Vec::new(), &path.join("."), &mut element)?;
            for (i, (leaf, ty)) in leaves.iter().enumerate() {
                per_leaf[i].push(element.remove(leaf).unwrap_or_else(|| ty.null_value()));
            }
        }
        for ((leaf, ty), values) in leaves.iter().zip(per_leaf) {
            let mut full = path.to_vec();
            full.extend(leaf.iter().cloned());
            let name = columns
                .iter()
                .find(|c| c.path == full)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| self.column_name(&full));
            row.insert(
                name,
                Value::Array(crate::mapper::array_type(*ty), Some(Box::new(values))),
            );
        }
        Ok(())
    }

    /// Rebuild an object from a row, expecting the columns in `selected`
    pub fn unflatten(
        &self,
        entity: &EntityDescriptor,
        row: &Row,
        selected: &[ColumnSpec],
    ) -> InlayResult<Object> {
        let columns = self.columns(entity)?;
        let source = RowSource {
            row,
            by_path: columns.iter().map(|c| (c.path.clone(), c)).collect(),
            selected: selected.iter().map(|c| c.path.clone()).collect(),
        };
        let mut path = Vec::new();
        self.read_shape(entity, entity, &mut path, &source)
    }

    /// `unflatten` against the default (non-lazy) column set
    pub fn unflatten_default(&self, entity: &EntityDescriptor, row: &Row) -> InlayResult<Object> {
        let defaults = self
            .columns(entity)?
            .into_iter()
            .filter(|c| !c.lazy)
            .collect::<Vec<_>>();
        self.unflatten(entity, row, &defaults)
    }

    fn read_shape(
        &self,
        entity: &EntityDescriptor,
        shape: &dyn Shape,
        path: &mut Vec<String>,
        source: &RowSource<'_>,
    ) -> InlayResult<Object> {
        let mut object = Object::new();
        for property in shape.properties() {
            path.push(property.name.clone());
            let field = self.read_property(entity, property, path, source);
            path.pop();
            object.set(property.name.clone(), field?);
        }
        Ok(object)
    }

    fn read_property(
        &self,
        entity: &EntityDescriptor,
        property: &PropertyDescriptor,
        path: &mut Vec<String>,
        source: &RowSource<'_>,
    ) -> InlayResult<Field> {
        match &property.kind {
            PropertyKind::Scalar(_) => match source.value(path) {
                Some(value) => Ok(Field::from(value.clone())),
                None => source.absent(entity, path),
            },
            PropertyKind::Relation(_) => match source.value(path) {
                Some(value) if is_null(value) => Ok(Field::Null),
                Some(value) => {
                    let key = KeyValue::from_db_value(value).ok_or_else(|| {
                        InlayError::invalid_value(path.join("."), "primary key value")
                    })?;
                    Ok(Field::from(EntityKey::single(key)))
                }
                None => source.absent(entity, path),
            },
            PropertyKind::Embedded(inner) => {
                if !source.any_under(path) {
                    return Ok(Field::Unloaded);
                }
                // A NULL embedded needs every column under it, lazy leaves included
                if property.nullable
                    && source.all_read_under(path)
                    && source.all_null_under(path)
                {
                    return Ok(Field::Null);
                }
                let nested = self.read_shape(entity, &**inner, path, source)?;
                Ok(Field::from(nested))
            }
            PropertyKind::EmbeddedArray(inner) => {
                if self.native_arrays() {
                    return self.read_native_array(entity, &**inner, path, source);
                }
                match source.value(path) {
                    None => source.absent(entity, path),
                    Some(Value::Json(Some(json))) => {
                        let items = json
                            .as_array()
                            .ok_or_else(|| InlayError::invalid_value(path.join("."), "json array"))?
                            .iter()
                            .map(|item| object_from_json(&**inner, item, &path.join(".")))
                            .collect::<InlayResult<Vec<_>>>()?;
                        Ok(Field::from(items))
                    }
                    Some(value) if is_null(value) => Ok(Field::Null),
                    Some(_) => Err(InlayError::invalid_value(path.join("."), "json array")),
                }
            }
        }
    }

    fn read_native_array(
        &self,
        entity: &EntityDescriptor,
        shape: &dyn Shape,
        path: &mut Vec<String>,
        source: &RowSource<'_>,
    ) -> InlayResult<Field> {
        if !source.any_under(path) {
            return match source.selected.iter().find(|p| p.starts_with(path)) {
                Some(leaf) => source.absent(entity, leaf),
                None => Ok(Field::Unloaded),
            };
        }
        let leaves = element_leaves(shape);
        let mut arrays: Vec<(&Vec<String>, &[Value])> = Vec::with_capacity(leaves.len());
        for (leaf, _) in &leaves {
            let mut full = path.clone();
            full.extend(leaf.iter().cloned());
            match source.value(&full) {
                Some(Value::Array(_, Some(values))) => arrays.push((leaf, values.as_slice())),
                Some(value) if is_null(value) => return Ok(Field::Null),
                Some(_) => return Err(InlayError::invalid_value(full.join("."), "array")),
                None => return source.absent(entity, &full),
            }
        }
        let len = arrays.first().map(|(_, values)| values.len()).unwrap_or(0);
        let mut items = Vec::with_capacity(len);
        for i in 0..len {
            let element: BTreeMap<Vec<String>, Value> = arrays
                .iter()
                .filter_map(|(leaf, values)| values.get(i).map(|v| ((*leaf).clone(), v.clone())))
                .collect();
            items.push(read_element(shape, &element, &mut Vec::new(), &path.join("."))?);
        }
        Ok(Field::from(items))
    }
}

struct RowSource<'a> {
    row: &'a Row,
    by_path: BTreeMap<Vec<String>, &'a ColumnSpec>,
    selected: BTreeSet<Vec<String>>,
}

impl<'a> RowSource<'a> {
    fn value(&self, path: &[String]) -> Option<&'a Value> {
        let column = self.by_path.get(path)?;
        self.row.get(&column.name)
    }

    fn present_under(&self, path: &[String]) -> impl Iterator<Item = &'a Value> + '_ {
        let path = path.to_vec();
        self.by_path
            .values()
            .filter(move |c| c.under(&path))
            .filter_map(move |c| self.row.get(&c.name))
    }

    fn any_under(&self, path: &[String]) -> bool {
        self.present_under(path).next().is_some()
    }

    fn all_null_under(&self, path: &[String]) -> bool {
        self.present_under(path).all(is_null)
    }

    fn all_read_under(&self, path: &[String]) -> bool {
        self.by_path
            .values()
            .filter(|c| c.under(path))
            .all(|c| self.row.contains_key(&c.name))
    }

    fn absent(&self, entity: &EntityDescriptor, path: &[String]) -> InlayResult<Field> {
        if self.selected.contains(path) {
            let column = self
                .by_path
                .get(path)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| path.join("."));
            return Err(InlayError::MissingColumn {
                entity: entity.name.clone(),
                column,
            });
        }
        Ok(Field::Unloaded)
    }
}

/// Reject slots that name no property of `shape`, recursing into embedded values
pub(crate) fn check_properties(shape: &dyn Shape, object: &Object, path: &str) -> InlayResult<()> {
    for (name, field) in object.fields() {
        let nested_path = if path.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", path, name)
        };
        let property = shape
            .property(name)
            .ok_or_else(|| InlayError::unknown_property(shape.shape_name(), &nested_path))?;
        match (&property.kind, field) {
            (PropertyKind::Embedded(inner), Field::Value(FieldValue::Embedded(nested))) => {
                check_properties(&**inner, nested, &nested_path)?;
            }
            (
                PropertyKind::EmbeddedArray(inner),
                Field::Value(FieldValue::EmbeddedArray(items)),
            ) => {
                for item in items {
                    check_properties(&**inner, item, &nested_path)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Coerce a scalar to the column's type, widening or narrowing integers
pub(crate) fn coerce_scalar(ty: ScalarType, value: &Value, path: &str) -> InlayResult<Value> {
    if is_null(value) {
        return Ok(ty.null_value());
    }
    let mismatch = || InlayError::invalid_value(path, ty.name());
    let coerced = match (ty, value) {
        (ScalarType::Integer, Value::Int(_)) => value.clone(),
        (ScalarType::Integer, Value::BigInt(Some(i))) => {
            Value::Int(Some(i32::try_from(*i).map_err(|_| mismatch())?))
        }
        (ScalarType::Integer, Value::SmallInt(Some(i))) => Value::Int(Some(i32::from(*i))),
        (ScalarType::BigInteger, Value::BigInt(_)) => value.clone(),
        (ScalarType::BigInteger, Value::Int(Some(i))) => Value::BigInt(Some(i64::from(*i))),
        (ScalarType::BigInteger, Value::SmallInt(Some(i))) => Value::BigInt(Some(i64::from(*i))),
        (ScalarType::Text, Value::String(_)) => value.clone(),
        (ScalarType::Boolean, Value::Bool(_)) => value.clone(),
        (ScalarType::Double, Value::Double(_)) => value.clone(),
        (ScalarType::Double, Value::Float(Some(f))) => Value::Double(Some(f64::from(*f))),
        (ScalarType::Double, Value::Int(Some(i))) => Value::Double(Some(f64::from(*i))),
        (ScalarType::Decimal, Value::Decimal(_)) => value.clone(),
        (ScalarType::Uuid, Value::Uuid(_)) => value.clone(),
        (ScalarType::Uuid, Value::String(Some(s))) => {
            Value::from(uuid::Uuid::parse_str(s).map_err(|_| mismatch())?)
        }
        (ScalarType::DateTime, Value::ChronoDateTimeWithTimeZone(_)) => value.clone(),
        (ScalarType::Json, Value::Json(_)) => value.clone(),
        (ScalarType::Json, other) => Value::Json(Some(Box::new(scalar_to_json(other)))),
        _ => return Err(mismatch()),
    };
    Ok(coerced)
}

pub(crate) fn scalar_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Bool(Some(b)) => Json::Bool(*b),
        Value::TinyInt(Some(i)) => Json::from(*i),
        Value::SmallInt(Some(i)) => Json::from(*i),
        Value::Int(Some(i)) => Json::from(*i),
        Value::BigInt(Some(i)) => Json::from(*i),
        Value::Unsigned(Some(i)) => Json::from(*i),
        Value::BigUnsigned(Some(i)) => Json::from(*i),
        Value::Float(Some(f)) => Json::from(*f),
        Value::Double(Some(d)) => Json::from(*d),
        Value::String(Some(s)) => Json::String((**s).clone()),
        Value::Decimal(Some(d)) => Json::String(d.to_string()),
        Value::Uuid(Some(u)) => Json::String(u.to_string()),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => Json::String(dt.to_rfc3339()),
        Value::Json(Some(json)) => (**json).clone(),
        _ => Json::Null,
    }
}

pub(crate) fn scalar_from_json(
    ty: ScalarType,
    json: &serde_json::Value,
    path: &str,
) -> InlayResult<Value> {
    if json.is_null() {
        return Ok(ty.null_value());
    }
    let mismatch = || InlayError::invalid_value(path, ty.name());
    let value = match ty {
        ScalarType::Integer => {
            let i = json.as_i64().ok_or_else(mismatch)?;
            Value::Int(Some(i32::try_from(i).map_err(|_| mismatch())?))
        }
        ScalarType::BigInteger => Value::BigInt(Some(json.as_i64().ok_or_else(mismatch)?)),
        ScalarType::Text => Value::from(json.as_str().ok_or_else(mismatch)?),
        ScalarType::Boolean => Value::Bool(Some(json.as_bool().ok_or_else(mismatch)?)),
        ScalarType::Double => Value::Double(Some(json.as_f64().ok_or_else(mismatch)?)),
        ScalarType::Decimal => {
            let raw = match json {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Number(n) => n.to_string(),
                _ => return Err(mismatch()),
            };
            Value::from(Decimal::from_str(&raw).map_err(|_| mismatch())?)
        }
        ScalarType::Uuid => {
            let raw = json.as_str().ok_or_else(mismatch)?;
            Value::from(uuid::Uuid::parse_str(raw).map_err(|_| mismatch())?)
        }
        ScalarType::DateTime => {
            let raw = json.as_str().ok_or_else(mismatch)?;
            Value::from(DateTime::parse_from_rfc3339(raw).map_err(|_| mismatch())?)
        }
        ScalarType::Json => Value::Json(Some(Box::new(json.clone()))),
    };
    Ok(value)
}

/// Encode one embeddable as a JSON object keyed by property name
pub(crate) fn object_to_json(
    shape: &dyn Shape,
    object: &Object,
    path: &str,
) -> InlayResult<serde_json::Value> {
    let mut map = serde_json::Map::new();
    for property in shape.properties() {
        let nested_path = format!("{}.{}", path, property.name);
        let encoded = match (object.get(&property.name), &property.kind) {
            (Field::Unloaded, _) => continue,
            (Field::Null, _) => serde_json::Value::Null,
            (Field::Value(FieldValue::Scalar(value)), PropertyKind::Scalar(ty)) => {
                scalar_to_json(&coerce_scalar(*ty, value, &nested_path)?)
            }
            (Field::Value(FieldValue::Embedded(nested)), PropertyKind::Embedded(inner)) => {
                object_to_json(&**inner, nested, &nested_path)?
            }
            (
                Field::Value(FieldValue::EmbeddedArray(items)),
                PropertyKind::EmbeddedArray(inner),
            ) => {
                serde_json::Value::Array(
                    items
                        .iter()
                        .map(|item| object_to_json(&**inner, item, &nested_path))
                        .collect::<InlayResult<Vec<_>>>()?,
                )
            }
            (_, kind) => return Err(InlayError::invalid_value(nested_path, kind.label())),
        };
        map.insert(property.name.clone(), encoded);
    }
    Ok(serde_json::Value::Object(map))
}

pub(crate) fn object_from_json(
    shape: &dyn Shape,
    json: &serde_json::Value,
    path: &str,
) -> InlayResult<Object> {
    let map = json
        .as_object()
        .ok_or_else(|| InlayError::invalid_value(path, "json object"))?;
    let mut object = Object::new();
    for property in shape.properties() {
        let nested_path = format!("{}.{}", path, property.name);
        let field = match map.get(&property.name) {
            None => Field::Unloaded,
            Some(serde_json::Value::Null) => Field::Null,
            Some(value) => match &property.kind {
                PropertyKind::Scalar(ty) => {
                    Field::from(scalar_from_json(*ty, value, &nested_path)?)
                }
                PropertyKind::Embedded(inner) => {
                    Field::from(object_from_json(&**inner, value, &nested_path)?)
                }
                PropertyKind::EmbeddedArray(inner) => {
                    let items = value
                        .as_array()
                        .ok_or_else(|| InlayError::invalid_value(&nested_path, "json array"))?
                        .iter()
                        .map(|item| object_from_json(&**inner, item, &nested_path))
                        .collect::<InlayResult<Vec<_>>>()?;
                    Field::from(items)
                }
                PropertyKind::Relation(_) => {
                    return Err(InlayError::invalid_value(nested_path, "relation"))
                }
            },
        };
        object.set(property.name.clone(), field);
    }
    Ok(object)
}

// Flatten one array element into leaf-path -> value, for native array storage
fn flatten_element(
    shape: &dyn Shape,
    object: &Object,
    leaf: &mut Vec<String>,
    path: &str,
    out: &mut BTreeMap<Vec<String>, Value>,
) -> InlayResult<()> {
    for property in shape.properties() {
        leaf.push(property.name.clone());
        let nested_path = format!("{}.{}", path, property.name);
        match (object.get(&property.name), &property.kind) {
            (Field::Unloaded, _) | (Field::Null, _) => {}
            (Field::Value(FieldValue::Scalar(value)), PropertyKind::Scalar(ty)) => {
                out.insert(leaf.clone(), coerce_scalar(*ty, value, &nested_path)?);
            }
            (Field::Value(FieldValue::Embedded(nested)), PropertyKind::Embedded(inner)) => {
                flatten_element(&**inner, nested, leaf, &nested_path, out)?;
            }
            (
                Field::Value(FieldValue::EmbeddedArray(items)),
                PropertyKind::EmbeddedArray(inner),
            ) => {
                let encoded = items
                    .iter()
                    .map(|item| object_to_json(&**inner, item, &nested_path))
                    .collect::<InlayResult<Vec<_>>>()?;
                out.insert(
                    leaf.clone(),
                    Value::Json(Some(Box::new(serde_json::Value::Array(encoded)))),
                );
            }
            (_, kind) => return Err(InlayError::invalid_value(nested_path, kind.label())),
        }
        leaf.pop();
    }
    Ok(())
}

fn read_element(
    shape: &dyn Shape,
    element: &BTreeMap<Vec<String>, Value>,
    leaf: &mut Vec<String>,
    path: &str,
) -> InlayResult<Object> {
    let mut object = Object::new();
    for property in shape.properties() {
        leaf.push(property.name.clone());
        let nested_path = format!("{}.{}", path, property.name);
        let field = match &property.kind {
            PropertyKind::Scalar(_) => element
                .get(leaf.as_slice())
                .cloned()
                .map(Field::from)
                .unwrap_or(Field::Null),
            PropertyKind::Embedded(inner) => {
                let under = element
                    .iter()
                    .filter(|(k, _)| k.len() > leaf.len() && k[..leaf.len()] == leaf[..])
                    .collect::<Vec<_>>();
                if property.nullable && under.iter().all(|(_, v)| is_null(v)) {
                    Field::Null
                } else {
                    Field::from(read_element(&**inner, element, leaf, &nested_path)?)
                }
            }
            PropertyKind::EmbeddedArray(inner) => match element.get(leaf.as_slice()) {
                Some(Value::Json(Some(json))) => {
                    let items = json
                        .as_array()
                        .ok_or_else(|| InlayError::invalid_value(&nested_path, "json array"))?
                        .iter()
                        .map(|item| object_from_json(&**inner, item, &nested_path))
                        .collect::<InlayResult<Vec<_>>>()?;
                    Field::from(items)
                }
                _ => Field::Null,
            },
            PropertyKind::Relation(_) => Field::Unloaded,
        };
        leaf.pop();
        object.set(property.name.clone(), field);
    }
    Ok(object)
}
