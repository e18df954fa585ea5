//! Embedded value objects for relational persistence.
//!
//! Entities may hold embeddable value objects, single or as arrays, which
//! are flattened into prefixed columns of the owning table. Queries can load
//! a subset of those columns, and upserts resolve merge fields against the
//! flattened layout.

pub mod config;
pub mod dialect;
pub mod flatten;
pub mod key_types;
pub mod manager;
pub mod mapper;
pub mod merge;
pub mod planner;
pub mod query_builders;
pub mod schema;
mod sql;
pub mod types;
pub mod value;

pub use config::{ArrayStorage, MapperConfig};
pub use dialect::Dialect;
pub use flatten::{KeyResolver, KeysOnly, Row};
pub use key_types::{EntityKey, KeyValue};
pub use manager::EntityManager;
pub use mapper::{ColumnSpec, ColumnType, Mapper};
pub use merge::{ConflictAction, UpsertOptions, UpsertPlan};
pub use planner::{FindOptions, LoadPlan, PopulatePlan};
pub use query_builders::*;
pub use schema::{
    DescribeEmbeddable, DescribeEntity, EmbeddableDescriptor, EntityDescriptor, FieldPath,
    PropertyDescriptor, PropertyKind, ScalarType, Schema,
};
pub use types::*;
pub use value::{Field, FieldValue, Handle, Object, Reference};

pub use inlay_macros::{Embeddable, Entity};
