//! Column selection for `find`.
//!
//! A [`LoadPlan`] lists the columns of one entity table to select and the
//! relations to hydrate with a follow-up query. Every requested path is
//! resolved against the schema while planning, so a bad path fails before
//! any statement is built.

use crate::mapper::{ColumnSpec, Mapper};
use crate::schema::{EntityDescriptor, FieldPath, PropertyKind, ResolvedPath};
use crate::types::{InlayError, InlayResult};
use std::collections::BTreeSet;

/// Requested shape of a `find` result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Allow-list of paths; `"*"` stands for the root's default columns.
    /// `None` selects the default columns.
    pub fields: Option<Vec<String>>,
    /// Paths loaded on top of the selection, typically lazy properties and relations
    pub populate: Vec<String>,
}

impl FindOptions {
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields
            .get_or_insert_with(Vec::new)
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn populate<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate.extend(paths.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadPlan {
    pub entity: String,
    /// Selected columns, in table order
    pub columns: Vec<ColumnSpec>,
    pub populates: Vec<PopulatePlan>,
}

impl LoadPlan {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A relation hydrated by a second query keyed on its foreign-key column
#[derive(Debug, Clone, PartialEq)]
pub struct PopulatePlan {
    /// Property path of the relation from the owning entity's root
    pub path: Vec<String>,
    pub foreign_key: String,
    pub target: String,
    pub plan: LoadPlan,
}

// Requests collected for one relation before the target is planned
struct Hop {
    path: Vec<String>,
    foreign_key: String,
    target: String,
    options: FindOptions,
    whole: bool,
}

impl Mapper {
    /// Plan which columns and relations to load for `entity`
    pub fn plan(&self, entity: &str, options: &FindOptions) -> InlayResult<LoadPlan> {
        let descriptor = self.schema().entity(entity)?.clone();
        let all = self.columns(&descriptor)?;
        let mut selected: BTreeSet<Vec<String>> = all
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.path.clone())
            .collect();
        let mut hops: Vec<Hop> = Vec::new();

        match &options.fields {
            Some(fields) => {
                for raw in fields {
                    if raw == FieldPath::WILDCARD {
                        selected.extend(default_columns(&all));
                        continue;
                    }
                    let resolved = self.resolve(&descriptor, raw)?;
                    self.select_path(&descriptor, &all, &resolved, true, &mut selected, &mut hops)?;
                }
            }
            None => selected.extend(default_columns(&all)),
        }

        for raw in &options.populate {
            if raw == FieldPath::WILDCARD {
                for column in &all {
                    let path = FieldPath::from_segments(column.path.clone())?;
                    let resolved = self.schema().resolve_path(&descriptor.name, &path)?;
                    if matches!(resolved.terminal().property.kind, PropertyKind::Relation(_)) {
                        self.select_path(
                            &descriptor,
                            &all,
                            &resolved,
                            false,
                            &mut selected,
                            &mut hops,
                        )?;
                    }
                }
                continue;
            }
            let resolved = self.resolve(&descriptor, raw)?;
            self.select_path(&descriptor, &all, &resolved, false, &mut selected, &mut hops)?;
        }

        let mut populates = Vec::with_capacity(hops.len());
        for mut hop in hops {
            if hop.whole {
                if let Some(fields) = hop.options.fields.as_mut() {
                    fields.push(FieldPath::WILDCARD.to_string());
                }
            }
            let plan = self.plan(&hop.target, &hop.options)?;
            populates.push(PopulatePlan {
                path: hop.path,
                foreign_key: hop.foreign_key,
                target: hop.target,
                plan,
            });
        }

        let columns = all
            .into_iter()
            .filter(|c| selected.contains(&c.path))
            .collect();
        log::trace!("planned load of '{}' with {:?}", entity, options);
        Ok(LoadPlan {
            entity: descriptor.name.clone(),
            columns,
            populates,
        })
    }

    /// The plan used when no options are given
    pub fn default_plan(&self, entity: &str) -> InlayResult<LoadPlan> {
        self.plan(entity, &FindOptions::default())
    }

    /// Column a filter on `path` compares against; relation traversal is not allowed
    pub fn filter_column(&self, entity: &EntityDescriptor, raw: &str) -> InlayResult<ColumnSpec> {
        let resolved = self.resolve(entity, raw)?;
        let terminal = resolved.terminal();
        if let Some(hop) = resolved.first_hop() {
            return Err(InlayError::PathTraversal {
                path: raw.to_string(),
                segment: resolved.steps[hop].property.name.clone(),
                reason: "filters cannot follow relations".to_string(),
            });
        }
        if resolved.first_array().is_some()
            || matches!(
                terminal.property.kind,
                PropertyKind::Embedded(_) | PropertyKind::EmbeddedArray(_)
            )
        {
            return Err(InlayError::PathTraversal {
                path: raw.to_string(),
                segment: terminal.property.name.clone(),
                reason: "filters need a scalar or relation column".to_string(),
            });
        }
        let local = terminal.local_segments();
        self.columns(entity)?
            .into_iter()
            .find(|c| c.path == local)
            .ok_or_else(|| InlayError::unknown_property(&entity.name, raw))
    }

    fn resolve(&self, entity: &EntityDescriptor, raw: &str) -> InlayResult<ResolvedPath> {
        let path: FieldPath = raw
            .parse()
            .map_err(|_| InlayError::unknown_property(&entity.name, raw))?;
        self.schema().resolve_path(&entity.name, &path)
    }

    fn select_path(
        &self,
        entity: &EntityDescriptor,
        all: &[ColumnSpec],
        resolved: &ResolvedPath,
        as_fields: bool,
        selected: &mut BTreeSet<Vec<String>>,
        hops: &mut Vec<Hop>,
    ) -> InlayResult<()> {
        let terminal_relation = matches!(
            resolved.terminal().property.kind,
            PropertyKind::Relation(_)
        );
        let hop_at = match resolved.first_hop() {
            Some(i) => Some(i),
            // a populate naming a relation loads the whole target
            None if terminal_relation && !as_fields => Some(resolved.steps.len() - 1),
            None => None,
        };

        if let Some(i) = hop_at {
            let step = &resolved.steps[i];
            let local = step.local_segments();
            let PropertyKind::Relation(relation) = &step.property.kind else {
                return Err(InlayError::unknown_property(&entity.name, resolved.path.to_string()));
            };
            let foreign_key = all.iter().find(|c| c.path == local).ok_or_else(|| {
                InlayError::unknown_property(&entity.name, resolved.path.to_string())
            })?;
            selected.insert(local.clone());

            let position = match hops.iter().position(|h| h.path == local) {
                Some(position) => position,
                None => {
                    hops.push(Hop {
                        path: local.clone(),
                        foreign_key: foreign_key.name.clone(),
                        target: relation.target.clone(),
                        options: FindOptions::default(),
                        whole: false,
                    });
                    hops.len() - 1
                }
            };
            let hop = &mut hops[position];
            match resolved.path.suffix(i + 1) {
                Some(rest) if as_fields => {
                    hop.options.fields.get_or_insert_with(Vec::new).push(rest.to_string())
                }
                Some(rest) => hop.options.populate.push(rest.to_string()),
                None => hop.whole = true,
            }
            return Ok(());
        }

        // paths into an array element load the whole array
        let anchor = match resolved.first_array() {
            Some(j) => &resolved.steps[j],
            None => resolved.terminal(),
        };
        let local = anchor.local_segments();
        for column in all.iter().filter(|c| c.under(&local)) {
            if column.path.len() == local.len()
                || !self.lazy_below(entity, &column.path, local.len())?
            {
                selected.insert(column.path.clone());
            }
        }
        Ok(())
    }

    // Whether any property strictly below the first `depth` segments of `path` is lazy
    fn lazy_below(
        &self,
        entity: &EntityDescriptor,
        path: &[String],
        depth: usize,
    ) -> InlayResult<bool> {
        let resolved = self
            .schema()
            .resolve_path(&entity.name, &FieldPath::from_segments(path.to_vec())?)?;
        Ok(resolved.steps[depth..].iter().any(|step| step.property.lazy))
    }
}

fn default_columns(all: &[ColumnSpec]) -> impl Iterator<Item = Vec<String>> + '_ {
    all.iter().filter(|c| !c.lazy).map(|c| c.path.clone())
}
