use crate::manager::EntityManager;
use crate::planner::{FindOptions, LoadPlan};
use crate::sql::{self, SelectSpec};
use crate::types::{FieldOp, Filter, InlayError, InlayResult, SortOrder};
use crate::value::Handle;

/// Query builder for loading instances of one entity, optionally partially
pub struct FindQueryBuilder<'a> {
    pub em: &'a mut EntityManager,
    pub entity: String,
    pub filters: Vec<Filter>,
    pub options: FindOptions,
    pub order: Vec<(String, SortOrder)>,
    pub take: Option<u64>,
    pub skip: Option<u64>,
}

impl<'a> FindQueryBuilder<'a> {
    pub(crate) fn new(em: &'a mut EntityManager, entity: &str) -> Self {
        Self {
            em,
            entity: entity.to_string(),
            filters: Vec::new(),
            options: FindOptions::default(),
            order: Vec::new(),
            take: None,
            skip: None,
        }
    }

    /// Restrict to rows where the column at `field` satisfies `operation`
    pub fn filter(mut self, field: impl Into<String>, operation: FieldOp) -> Self {
        self.filters.push(Filter::new(field, operation));
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.fields(fields);
        self
    }

    pub fn populate<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = self.options.populate(paths);
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order.push((field.into(), order));
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    // Resolve every path before any statement is built
    fn prepare(&self) -> InlayResult<(LoadPlan, SelectSpec)> {
        let mapper = self.em.mapper();
        let entity = mapper.schema().entity(&self.entity)?;
        let plan = mapper.plan(&self.entity, &self.options)?;
        let conditions = self
            .filters
            .iter()
            .map(|filter| {
                mapper
                    .filter_column(entity, &filter.field)
                    .map(|column| sql::condition(&column.name, &filter.operation))
            })
            .collect::<InlayResult<Vec<_>>>()?;
        let order = self
            .order
            .iter()
            .map(|(field, order)| {
                mapper
                    .filter_column(entity, field)
                    .map(|column| (column.name, *order))
            })
            .collect::<InlayResult<Vec<_>>>()?;
        Ok((
            plan,
            SelectSpec {
                conditions,
                order,
                limit: self.take,
                offset: self.skip,
            },
        ))
    }

    /// Execute and return the first matching instance
    pub async fn exec(self) -> InlayResult<Option<Handle>> {
        let (plan, mut spec) = self.prepare()?;
        spec.limit = Some(1);
        Ok(self.em.load(&plan, spec, false).await?.into_iter().next())
    }

    /// Execute and return every matching instance in row order
    pub async fn exec_many(self) -> InlayResult<Vec<Handle>> {
        let (plan, spec) = self.prepare()?;
        self.em.load(&plan, spec, false).await
    }

    /// Execute and fail with `NotFound` when nothing matches
    pub async fn exec_or_fail(self) -> InlayResult<Handle> {
        let entity = self.entity.clone();
        self.exec()
            .await?
            .ok_or(InlayError::NotFound { entity })
    }
}
