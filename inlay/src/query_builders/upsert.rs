use crate::manager::EntityManager;
use crate::merge::{ConflictAction, UpsertOptions};
use crate::types::InlayResult;
use crate::value::{Handle, Object};

/// Query builder for inserting a payload or merging it into the conflicting row
pub struct UpsertQueryBuilder<'a> {
    pub em: &'a mut EntityManager,
    pub entity: String,
    pub payload: Object,
    pub options: UpsertOptions,
}

impl<'a> UpsertQueryBuilder<'a> {
    pub(crate) fn new(em: &'a mut EntityManager, entity: &str, payload: Object) -> Self {
        Self {
            em,
            entity: entity.to_string(),
            payload,
            options: UpsertOptions::default(),
        }
    }

    pub fn on_conflict_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.on_conflict_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Only these fields are overwritten on conflict; embedded names cover all their columns
    pub fn merge_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.on_conflict_merge_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options
            .on_conflict_exclude_fields
            .extend(fields.into_iter().map(Into::into));
        self
    }

    /// Keep the existing row untouched on conflict
    pub fn ignore(mut self) -> Self {
        self.options.on_conflict_action = ConflictAction::Ignore;
        self
    }

    pub fn options(mut self, options: UpsertOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute and return the managed instance holding the stored row
    pub async fn exec(self) -> InlayResult<Handle> {
        self.em
            .run_upsert(&self.entity, self.payload, &self.options)
            .await
    }
}
