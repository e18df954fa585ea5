//! Statement building and row decoding over sea-query.
//!
//! Every value is bound as a parameter through `DbBackend::build`. Statements
//! are logged at debug level on the `inlay::query` target right before they
//! are sent.

use crate::flatten::{is_null, Row};
use crate::mapper::{array_type, ColumnSpec, ColumnType, Mapper};
use crate::schema::{EntityDescriptor, ScalarType};
use crate::types::{FieldOp, InlayResult, SortOrder};
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use sea_orm::sea_query::{
    Alias, ColumnDef, ColumnType as SqlType, Expr, Index, OnConflict, Order, Query, SimpleExpr,
    Table, TableCreateStatement, TableDropStatement,
};
use sea_orm::{ConnectionTrait, DbBackend, DbErr, ExecResult, QueryResult, Statement, Value};
use uuid::Uuid;

pub(crate) const QUERY_TARGET: &str = "inlay::query";

/// A `SELECT` against one entity table
#[derive(Debug, Clone, Default)]
pub(crate) struct SelectSpec {
    pub conditions: Vec<SimpleExpr>,
    pub order: Vec<(String, SortOrder)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

pub(crate) fn condition(column: &str, op: &FieldOp) -> SimpleExpr {
    let col = Expr::col(Alias::new(column));
    match op {
        FieldOp::Equals(value) if is_null(value) => col.is_null(),
        FieldOp::NotEquals(value) if is_null(value) => col.is_not_null(),
        FieldOp::Equals(value) => col.eq(value.clone()),
        FieldOp::NotEquals(value) => col.ne(value.clone()),
        FieldOp::Gt(value) => col.gt(value.clone()),
        FieldOp::Lt(value) => col.lt(value.clone()),
        FieldOp::Gte(value) => col.gte(value.clone()),
        FieldOp::Lte(value) => col.lte(value.clone()),
        FieldOp::InVec(values) => col.is_in(values.clone()),
        FieldOp::NotInVec(values) => col.is_not_in(values.clone()),
        FieldOp::IsNull => col.is_null(),
        FieldOp::IsNotNull => col.is_not_null(),
    }
}

/// `column = value` for every entry of `row`
pub(crate) fn row_conditions(row: &Row) -> Vec<SimpleExpr> {
    row.iter()
        .map(|(column, value)| condition(column, &FieldOp::Equals(value.clone())))
        .collect()
}

pub(crate) fn select(
    table: &str,
    columns: &[ColumnSpec],
    spec: &SelectSpec,
    backend: DbBackend,
) -> Statement {
    let mut query = Query::select();
    query.from(Alias::new(table));
    for column in columns {
        query.column(Alias::new(column.name.as_str()));
    }
    for condition in &spec.conditions {
        query.and_where(condition.clone());
    }
    for (column, order) in &spec.order {
        let order = match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        };
        query.order_by(Alias::new(column.as_str()), order);
    }
    if let Some(limit) = spec.limit {
        query.limit(limit);
    }
    if let Some(offset) = spec.offset {
        query.offset(offset);
    }
    backend.build(&query)
}

pub(crate) fn insert(
    table: &str,
    row: &Row,
    returning: Option<&str>,
    backend: DbBackend,
) -> InlayResult<Statement> {
    let mut insert = Query::insert();
    insert.into_table(Alias::new(table));
    if row.is_empty() {
        insert.or_default_values();
    } else {
        insert.columns(row.keys().map(|c| Alias::new(c.as_str())));
        insert
            .values(row.values().cloned().map(SimpleExpr::from))
            .map_err(|e| DbErr::Custom(e.to_string()))?;
    }
    if let Some(column) = returning {
        insert.returning_col(Alias::new(column));
    }
    Ok(backend.build(&insert))
}

/// `INSERT .. ON CONFLICT (..) DO UPDATE SET ..`, or `DO NOTHING` when `merge` is empty
pub(crate) fn upsert(
    table: &str,
    row: &Row,
    conflict: &[String],
    merge: &[String],
    backend: DbBackend,
) -> InlayResult<Statement> {
    let mut insert = Query::insert();
    insert
        .into_table(Alias::new(table))
        .columns(row.keys().map(|c| Alias::new(c.as_str())))
        .values(row.values().cloned().map(SimpleExpr::from))
        .map_err(|e| DbErr::Custom(e.to_string()))?;
    let mut on_conflict = OnConflict::columns(conflict.iter().map(|c| Alias::new(c.as_str())));
    if merge.is_empty() {
        on_conflict.do_nothing();
    } else {
        on_conflict.update_columns(merge.iter().map(|c| Alias::new(c.as_str())));
    }
    insert.on_conflict(on_conflict);
    Ok(backend.build(&insert))
}

pub(crate) fn update(table: &str, changes: &Row, key: &Row, backend: DbBackend) -> Statement {
    let mut update = Query::update();
    update.table(Alias::new(table)).values(
        changes
            .iter()
            .map(|(column, value)| (Alias::new(column.as_str()), SimpleExpr::from(value.clone()))),
    );
    for condition in row_conditions(key) {
        update.and_where(condition);
    }
    backend.build(&update)
}

pub(crate) fn delete(table: &str, key: &Row, backend: DbBackend) -> Statement {
    let mut delete = Query::delete();
    delete.from_table(Alias::new(table));
    for condition in row_conditions(key) {
        delete.and_where(condition);
    }
    backend.build(&delete)
}

fn sql_type(ty: ScalarType) -> SqlType {
    match ty {
        ScalarType::Integer => SqlType::Integer,
        ScalarType::BigInteger => SqlType::BigInteger,
        ScalarType::Text => SqlType::Text,
        ScalarType::Boolean => SqlType::Boolean,
        ScalarType::Double => SqlType::Double,
        ScalarType::Decimal => SqlType::Decimal(None),
        ScalarType::Uuid => SqlType::Uuid,
        ScalarType::DateTime => SqlType::TimestampWithTimeZone,
        ScalarType::Json => SqlType::Json,
    }
}

pub(crate) fn create_table(
    mapper: &Mapper,
    entity: &EntityDescriptor,
) -> InlayResult<TableCreateStatement> {
    let columns = mapper.columns(entity)?;
    let primary: Vec<&ColumnSpec> = columns.iter().filter(|c| c.primary_key).collect();
    let inline_key = primary.len() == 1;

    let mut table = Table::create();
    table.table(Alias::new(entity.table.as_str())).if_not_exists();
    for column in &columns {
        let mut def = ColumnDef::new(Alias::new(column.name.as_str()));
        match column.ty {
            // SQLite only generates keys for `integer` primary keys
            ColumnType::Scalar(_)
                if column.auto_increment && mapper.dialect().backend == DbBackend::Sqlite =>
            {
                def.integer();
            }
            ColumnType::Scalar(ty) => {
                def.typed_as(ty);
            }
            ColumnType::JsonArray => {
                def.json();
            }
            ColumnType::NativeArray(ty) => {
                def.array(sql_type(ty));
            }
        }
        if column.nullable {
            def.null();
        } else {
            def.not_null();
        }
        if column.primary_key && inline_key {
            def.primary_key();
            if column.auto_increment {
                def.auto_increment();
            }
        }
        if column.unique && !column.primary_key {
            def.unique_key();
        }
        table.col(&mut def);
    }
    if !inline_key {
        let mut index = Index::create();
        for column in &primary {
            index.col(Alias::new(column.name.as_str()));
        }
        table.primary_key(&mut index);
    }
    Ok(table.to_owned())
}

pub(crate) fn drop_table(entity: &EntityDescriptor) -> TableDropStatement {
    Table::drop()
        .table(Alias::new(entity.table.as_str()))
        .if_exists()
        .to_owned()
}

trait ScalarColumn {
    fn typed_as(&mut self, ty: ScalarType) -> &mut Self;
}

impl ScalarColumn for ColumnDef {
    fn typed_as(&mut self, ty: ScalarType) -> &mut Self {
        match ty {
            ScalarType::Integer => self.integer(),
            ScalarType::BigInteger => self.big_integer(),
            ScalarType::Text => self.text(),
            ScalarType::Boolean => self.boolean(),
            ScalarType::Double => self.double(),
            ScalarType::Decimal => self.decimal(),
            ScalarType::Uuid => self.uuid(),
            ScalarType::DateTime => self.timestamp_with_time_zone(),
            ScalarType::Json => self.json(),
        }
    }
}

/// Read the columns of `columns` out of a result row
pub(crate) fn decode_row(result: &QueryResult, columns: &[ColumnSpec]) -> InlayResult<Row> {
    let mut row = Row::new();
    for column in columns {
        let name = column.name.as_str();
        let value = match column.ty {
            ColumnType::Scalar(ty) => decode_scalar(result, name, ty)?,
            ColumnType::JsonArray => Value::Json(
                result
                    .try_get::<Option<serde_json::Value>>("", name)?
                    .map(Box::new),
            ),
            ColumnType::NativeArray(ty) => decode_array(result, name, ty)?,
        };
        row.insert(column.name.clone(), value);
    }
    Ok(row)
}

pub(crate) fn decode_scalar(
    result: &QueryResult,
    name: &str,
    ty: ScalarType,
) -> Result<Value, DbErr> {
    let value = match ty {
        ScalarType::Integer => Value::Int(result.try_get::<Option<i32>>("", name)?),
        ScalarType::BigInteger => Value::BigInt(result.try_get::<Option<i64>>("", name)?),
        ScalarType::Text => {
            Value::String(result.try_get::<Option<String>>("", name)?.map(Box::new))
        }
        ScalarType::Boolean => Value::Bool(result.try_get::<Option<bool>>("", name)?),
        ScalarType::Double => Value::Double(result.try_get::<Option<f64>>("", name)?),
        ScalarType::Decimal => {
            Value::Decimal(result.try_get::<Option<Decimal>>("", name)?.map(Box::new))
        }
        ScalarType::Uuid => Value::Uuid(result.try_get::<Option<Uuid>>("", name)?.map(Box::new)),
        ScalarType::DateTime => Value::ChronoDateTimeWithTimeZone(
            result
                .try_get::<Option<DateTime<FixedOffset>>>("", name)?
                .map(Box::new),
        ),
        ScalarType::Json => Value::Json(
            result
                .try_get::<Option<serde_json::Value>>("", name)?
                .map(Box::new),
        ),
    };
    Ok(value)
}

macro_rules! decode_array_of {
    ($result:expr, $name:expr, $elem:ty) => {
        $result
            .try_get::<Option<Vec<$elem>>>("", $name)?
            .map(|items| items.into_iter().map(Value::from).collect::<Vec<_>>())
    };
}

fn decode_array(result: &QueryResult, name: &str, ty: ScalarType) -> Result<Value, DbErr> {
    let items = match ty {
        ScalarType::Integer => decode_array_of!(result, name, i32),
        ScalarType::BigInteger => decode_array_of!(result, name, i64),
        ScalarType::Text => decode_array_of!(result, name, String),
        ScalarType::Boolean => decode_array_of!(result, name, bool),
        ScalarType::Double => decode_array_of!(result, name, f64),
        ScalarType::Decimal => decode_array_of!(result, name, Decimal),
        ScalarType::Uuid => decode_array_of!(result, name, Uuid),
        ScalarType::DateTime => decode_array_of!(result, name, DateTime<FixedOffset>),
        ScalarType::Json => decode_array_of!(result, name, serde_json::Value),
    };
    Ok(Value::Array(array_type(ty), items.map(Box::new)))
}

fn log_statement(stmt: &Statement) {
    log::debug!(target: QUERY_TARGET, "{} {:?}", stmt.sql, stmt.values);
}

pub(crate) async fn execute<C: ConnectionTrait>(
    conn: &C,
    stmt: Statement,
) -> InlayResult<ExecResult> {
    log_statement(&stmt);
    Ok(conn.execute(stmt).await?)
}

pub(crate) async fn query_one<C: ConnectionTrait>(
    conn: &C,
    stmt: Statement,
) -> InlayResult<Option<QueryResult>> {
    log_statement(&stmt);
    Ok(conn.query_one(stmt).await?)
}

pub(crate) async fn query_all<C: ConnectionTrait>(
    conn: &C,
    stmt: Statement,
) -> InlayResult<Vec<QueryResult>> {
    log_statement(&stmt);
    Ok(conn.query_all(stmt).await?)
}
