pub mod find;
pub mod upsert;

pub use find::FindQueryBuilder;
pub use upsert::UpsertQueryBuilder;
