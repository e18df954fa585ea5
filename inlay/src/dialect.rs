use sea_orm::DbBackend;

/// Capability flags of the storage backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub backend: DbBackend,
    /// `text[]`-style array columns
    pub native_arrays: bool,
    /// `INSERT .. ON CONFLICT .. DO UPDATE` (or MySQL's `ON DUPLICATE KEY UPDATE`)
    pub upsert_clause: bool,
    /// `INSERT .. RETURNING`; without it generated keys come from `last_insert_id`
    pub returning: bool,
}

impl Dialect {
    pub fn for_backend(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Postgres => Self {
                backend,
                native_arrays: true,
                upsert_clause: true,
                returning: true,
            },
            DbBackend::Sqlite => Self {
                backend,
                native_arrays: false,
                upsert_clause: true,
                returning: false,
            },
            // MySql
            _ => Self {
                backend,
                native_arrays: false,
                upsert_clause: true,
                returning: false,
            },
        }
    }
}
