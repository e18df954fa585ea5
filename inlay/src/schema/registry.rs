use super::descriptor::{
    DescribeEntity, EmbeddableDescriptor, EntityDescriptor, PropertyDescriptor, PropertyKind,
    Shape,
};
use super::path::FieldPath;
use crate::types::{InlayError, InlayResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Collects entity descriptors at startup and validates them once in `build`
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    entities: Vec<EntityDescriptor>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: EntityDescriptor) -> &mut Self {
        log::trace!("registering entity '{}'", descriptor.name);
        self.entities.push(descriptor);
        self
    }

    pub fn entity(mut self, descriptor: EntityDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// Register a type deriving `Entity`
    pub fn with<T: DescribeEntity>(self) -> Self {
        self.entity(T::entity_descriptor())
    }

    pub fn build(self) -> InlayResult<Schema> {
        let mut entities = BTreeMap::new();
        for descriptor in self.entities {
            if entities.contains_key(&descriptor.name) {
                return Err(InlayError::invalid_schema(format!(
                    "entity '{}' registered twice",
                    descriptor.name
                )));
            }
            entities.insert(descriptor.name.clone(), Arc::new(descriptor));
        }
        let schema = Schema { entities };
        for entity in schema.entities.values() {
            schema.validate_entity(entity)?;
        }
        Ok(schema)
    }
}

/// Immutable registry of entity descriptors
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: BTreeMap<String, Arc<EntityDescriptor>>,
}

/// One property visited while resolving a path
#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub property: PropertyDescriptor,
    /// Entity whose table stores this property
    pub entity: String,
    /// Segments from that entity's root down to (excluding) this property
    pub prefix: Vec<String>,
    /// True when an embedded array was crossed to reach this property
    pub within_array: bool,
}

impl ResolvedStep {
    /// Segments from the owning entity's root, including this property
    pub fn local_segments(&self) -> Vec<String> {
        let mut segments = self.prefix.clone();
        segments.push(self.property.name.clone());
        segments
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPath {
    pub path: FieldPath,
    pub steps: Vec<ResolvedStep>,
}

impl ResolvedPath {
    pub fn terminal(&self) -> &ResolvedStep {
        &self.steps[self.steps.len() - 1]
    }

    /// Index of the first relation that is followed into its target
    pub fn first_hop(&self) -> Option<usize> {
        let last = self.steps.len() - 1;
        self.steps[..last]
            .iter()
            .position(|step| matches!(step.property.kind, PropertyKind::Relation(_)))
    }

    /// Index of the first embedded array on the path, terminal included
    pub fn first_array(&self) -> Option<usize> {
        self.steps
            .iter()
            .position(|step| matches!(step.property.kind, PropertyKind::EmbeddedArray(_)))
    }
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    pub fn entity(&self, name: &str) -> InlayResult<&Arc<EntityDescriptor>> {
        self.entities
            .get(name)
            .ok_or_else(|| InlayError::UnknownEntity {
                entity: name.to_string(),
            })
    }

    pub fn entities(&self) -> impl Iterator<Item = &Arc<EntityDescriptor>> {
        self.entities.values()
    }

    /// Walk `path` from `root`, one segment at a time.
    ///
    /// Relations and embedded arrays in the middle of a path are followed into
    /// their target entity and element shape; a scalar in the middle fails with
    /// `PathTraversal`, a missing segment with `UnknownProperty`.
    pub fn resolve_path(&self, root: &str, path: &FieldPath) -> InlayResult<ResolvedPath> {
        let mut entity = self.entity(root)?.clone();
        let mut shape = Cursor::Entity(entity.clone());
        let mut prefix: Vec<String> = Vec::new();
        let mut within_array = false;
        let mut steps = Vec::with_capacity(path.len());

        for (i, segment) in path.segments().iter().enumerate() {
            let property = shape.get().property(segment).cloned().ok_or_else(|| {
                InlayError::unknown_property(shape.get().shape_name(), path.to_string())
            })?;
            steps.push(ResolvedStep {
                property: property.clone(),
                entity: entity.name.clone(),
                prefix: prefix.clone(),
                within_array,
            });

            if i + 1 == path.len() {
                break;
            }
            match &property.kind {
                PropertyKind::Scalar(_) => {
                    return Err(InlayError::PathTraversal {
                        path: path.to_string(),
                        segment: segment.clone(),
                        reason: "scalar property has no nested properties".to_string(),
                    });
                }
                PropertyKind::Embedded(inner) => {
                    prefix.push(property.name.clone());
                    shape = Cursor::Embedded(inner.clone());
                }
                PropertyKind::EmbeddedArray(inner) => {
                    prefix.push(property.name.clone());
                    within_array = true;
                    shape = Cursor::Embedded(inner.clone());
                }
                PropertyKind::Relation(relation) => {
                    entity = self.entity(&relation.target)?.clone();
                    shape = Cursor::Entity(entity.clone());
                    prefix.clear();
                    within_array = false;
                }
            }
        }

        Ok(ResolvedPath {
            path: path.clone(),
            steps,
        })
    }

    fn validate_entity(&self, entity: &EntityDescriptor) -> InlayResult<()> {
        if entity.primary_key.is_empty() {
            return Err(InlayError::invalid_schema(format!(
                "entity '{}' has no primary key",
                entity.name
            )));
        }
        for pk in entity.primary_key_properties() {
            if !matches!(pk.kind, PropertyKind::Scalar(_)) || pk.nullable {
                return Err(InlayError::invalid_schema(format!(
                    "primary key '{}.{}' must be a non-nullable scalar",
                    entity.name, pk.name
                )));
            }
        }
        self.validate_shape(&entity.name, entity, false, true)
    }

    fn validate_shape(
        &self,
        owner: &str,
        shape: &dyn Shape,
        in_array: bool,
        is_root: bool,
    ) -> InlayResult<()> {
        let mut seen = BTreeSet::new();
        for property in shape.properties() {
            if !seen.insert(property.name.as_str()) {
                return Err(InlayError::invalid_schema(format!(
                    "property '{}' declared twice in '{}'",
                    property.name,
                    shape.shape_name()
                )));
            }
            if property.primary_key && !is_root {
                return Err(InlayError::invalid_schema(format!(
                    "embeddable '{}' cannot declare primary key '{}'",
                    shape.shape_name(),
                    property.name
                )));
            }
            match &property.kind {
                PropertyKind::Scalar(_) => {}
                PropertyKind::Embedded(inner) => {
                    self.validate_shape(owner, &**inner, in_array, false)?
                }
                PropertyKind::EmbeddedArray(inner) => {
                    self.validate_shape(owner, &**inner, true, false)?
                }
                PropertyKind::Relation(relation) => {
                    if in_array {
                        return Err(InlayError::invalid_schema(format!(
                            "relation '{}' in '{}' cannot live inside an embedded array",
                            property.name,
                            shape.shape_name()
                        )));
                    }
                    let target = self.entity(&relation.target).map_err(|_| {
                        InlayError::invalid_schema(format!(
                            "relation '{}.{}' targets unregistered entity '{}'",
                            owner, property.name, relation.target
                        ))
                    })?;
                    if target.primary_key.len() != 1 {
                        return Err(InlayError::invalid_schema(format!(
                            "relation '{}.{}' targets '{}' which has a composite primary key",
                            owner, property.name, relation.target
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

// Shape currently being walked; owned so the walk can hop between entities
enum Cursor {
    Entity(Arc<EntityDescriptor>),
    Embedded(Arc<EmbeddableDescriptor>),
}

impl Cursor {
    fn get(&self) -> &dyn Shape {
        match self {
            Self::Entity(entity) => &**entity,
            Self::Embedded(shape) => &**shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ScalarType;

    fn schema() -> Schema {
        let properties = EmbeddableDescriptor::builder("Properties")
            .property(PropertyDescriptor::relation("organization", "Organization"))
            .property(PropertyDescriptor::scalar("tag", ScalarType::Text).lazy())
            .build();
        Schema::builder()
            .entity(
                EntityDescriptor::builder("Organization")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::scalar("tag", ScalarType::Text).lazy())
                    .build(),
            )
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::scalar("email", ScalarType::Text).unique())
                    .property(PropertyDescriptor::embedded("properties", properties))
                    .build(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_through_embedded_and_relation() {
        let schema = schema();
        let path = FieldPath::parse("properties.organization.tag").unwrap();
        let resolved = schema.resolve_path("User", &path).unwrap();
        assert_eq!(resolved.steps.len(), 3);
        assert_eq!(resolved.first_hop(), Some(1));
        assert_eq!(resolved.steps[1].prefix, vec!["properties".to_string()]);
        assert_eq!(resolved.terminal().entity, "Organization");
        assert!(resolved.terminal().prefix.is_empty());
        assert!(resolved.terminal().property.lazy);
    }

    #[test]
    fn test_scalar_in_the_middle_is_traversal_error() {
        let schema = schema();
        let path = FieldPath::parse("email.domain").unwrap();
        assert!(matches!(
            schema.resolve_path("User", &path).unwrap_err(),
            InlayError::PathTraversal { .. }
        ));
    }

    #[test]
    fn test_unknown_segment() {
        let schema = schema();
        let path = FieldPath::parse("properties.missing").unwrap();
        match schema.resolve_path("User", &path).unwrap_err() {
            InlayError::UnknownProperty { owner, path } => {
                assert_eq!(owner, "Properties");
                assert_eq!(path, "properties.missing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_rejects_dangling_relation() {
        let result = Schema::builder()
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::relation("team", "Team"))
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(InlayError::InvalidSchema { .. })));
    }

    #[test]
    fn test_build_rejects_missing_primary_key() {
        let result = Schema::builder()
            .entity(
                EntityDescriptor::builder("Log")
                    .property(PropertyDescriptor::scalar("line", ScalarType::Text))
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(InlayError::InvalidSchema { .. })));
    }

    #[test]
    fn test_build_rejects_relation_inside_embedded_array() {
        let member = EmbeddableDescriptor::builder("Member")
            .property(PropertyDescriptor::relation("user", "User"))
            .build();
        let result = Schema::builder()
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .build(),
            )
            .entity(
                EntityDescriptor::builder("Team")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::embedded_array("members", member))
                    .build(),
            )
            .build();
        assert!(matches!(result, Err(InlayError::InvalidSchema { .. })));
    }
}
