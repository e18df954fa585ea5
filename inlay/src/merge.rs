//! Conflict target and merge set of an upsert.
//!
//! Field names in the options are property paths. A path naming an embedded
//! property stands for every column stored under it, so `"properties"` and
//! `"properties.tag"` merge the same column when `tag` is the only leaf.

use crate::flatten::{is_null, KeyResolver, Row};
use crate::mapper::{ColumnSpec, Mapper};
use crate::schema::{EntityDescriptor, FieldPath};
use crate::types::{InlayError, InlayResult};
use crate::value::Object;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConflictAction {
    /// `DO UPDATE SET` the merge columns
    #[default]
    Merge,
    /// `DO NOTHING`
    Ignore,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Conflict target; defaults to the primary key or the first unique property in the payload
    pub on_conflict_fields: Option<Vec<String>>,
    /// Columns updated on conflict; defaults to every inserted column
    pub on_conflict_merge_fields: Option<Vec<String>>,
    pub on_conflict_exclude_fields: Vec<String>,
    pub on_conflict_action: ConflictAction,
}

/// Resolved upsert, ready to be rendered as one statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertPlan {
    pub row: Row,
    pub conflict_columns: Vec<String>,
    /// Empty means `DO NOTHING`
    pub merge_columns: Vec<String>,
}

impl Mapper {
    /// Flatten `payload` and decide the conflict and merge columns.
    ///
    /// Every named field is validated before the payload is touched.
    pub fn resolve_upsert(
        &self,
        entity: &EntityDescriptor,
        payload: &Object,
        options: &UpsertOptions,
        keys: &dyn KeyResolver,
    ) -> InlayResult<UpsertPlan> {
        let columns = self.columns(entity)?;

        let explicit_conflict = options
            .on_conflict_fields
            .as_ref()
            .map(|fields| self.expand_fields(entity, &columns, fields))
            .transpose()?;
        let explicit_merge = options
            .on_conflict_merge_fields
            .as_ref()
            .map(|fields| self.expand_fields(entity, &columns, fields))
            .transpose()?;
        let excluded = self.expand_fields(entity, &columns, &options.on_conflict_exclude_fields)?;

        let row = self.flatten(entity, payload, keys)?;
        let present = |name: &String| row.get(name).is_some_and(|v| !is_null(v));

        let conflict_columns = match explicit_conflict {
            Some(conflict) => {
                if conflict.is_empty() || !conflict.iter().all(present) {
                    return Err(InlayError::NoConflictTarget {
                        entity: entity.name.clone(),
                    });
                }
                conflict
            }
            None => default_conflict_target(&columns, &row).ok_or_else(|| {
                InlayError::NoConflictTarget {
                    entity: entity.name.clone(),
                }
            })?,
        };

        let merge_columns = match options.on_conflict_action {
            ConflictAction::Ignore => Vec::new(),
            ConflictAction::Merge => {
                let candidates = explicit_merge.unwrap_or_else(|| {
                    columns.iter().map(|c| c.name.clone()).collect()
                });
                candidates
                    .into_iter()
                    .filter(|name| row.contains_key(name))
                    .filter(|name| !conflict_columns.contains(name))
                    .filter(|name| !excluded.contains(name))
                    .collect()
            }
        };

        log::debug!(
            "upsert '{}' on ({}) merging ({})",
            entity.name,
            conflict_columns.join(", "),
            merge_columns.join(", ")
        );
        Ok(UpsertPlan {
            row,
            conflict_columns,
            merge_columns,
        })
    }

    // Column names stored under each field, deduplicated, in table order
    fn expand_fields(
        &self,
        entity: &EntityDescriptor,
        columns: &[ColumnSpec],
        fields: &[String],
    ) -> InlayResult<Vec<String>> {
        let unknown = |field: &str| InlayError::UnknownMergeField {
            entity: entity.name.clone(),
            field: field.to_string(),
        };
        let mut prefixes = Vec::with_capacity(fields.len());
        for field in fields {
            let path: FieldPath = field.parse().map_err(|_| unknown(field))?;
            let resolved = self
                .schema()
                .resolve_path(&entity.name, &path)
                .map_err(|_| unknown(field))?;
            if resolved.first_hop().is_some() {
                return Err(unknown(field));
            }
            let anchor = match resolved.first_array() {
                Some(j) => &resolved.steps[j],
                None => resolved.terminal(),
            };
            prefixes.push(anchor.local_segments());
        }
        Ok(columns
            .iter()
            .filter(|c| prefixes.iter().any(|prefix| c.under(prefix)))
            .map(|c| c.name.clone())
            .collect())
    }
}

fn default_conflict_target(columns: &[ColumnSpec], row: &Row) -> Option<Vec<String>> {
    let present = |c: &&ColumnSpec| row.get(&c.name).is_some_and(|v| !is_null(v));
    let primary: Vec<&ColumnSpec> = columns.iter().filter(|c| c.primary_key).collect();
    if !primary.is_empty() && primary.iter().all(present) {
        return Some(primary.iter().map(|c| c.name.clone()).collect());
    }
    columns
        .iter()
        .filter(|c| c.unique)
        .find(present)
        .map(|c| vec![c.name.clone()])
}
