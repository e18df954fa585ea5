//! Schema model: entity, embeddable and property descriptors, registered once
//! at startup and immutable afterwards.

mod descriptor;
mod path;
mod registry;

pub use descriptor::{
    DescribeEmbeddable, DescribeEntity, EmbeddableBuilder, EmbeddableDescriptor, EntityBuilder,
    EntityDescriptor, PropertyDescriptor, PropertyKind, RelationDescriptor, ScalarType, Shape,
};
pub use path::FieldPath;
pub use registry::{ResolvedPath, ResolvedStep, Schema, SchemaBuilder};
