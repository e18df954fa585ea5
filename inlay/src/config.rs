use crate::dialect::Dialect;
use crate::types::{InlayError, InlayResult};
use serde::Deserialize;

/// Storage strategy for arrays of embeddables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayStorage {
    /// Native arrays when the dialect has them, JSON otherwise
    #[default]
    Auto,
    /// One opaque JSON column per array property
    Json,
    /// One SQL array column per element leaf
    Native,
}

/// Mapper configuration, usually built once next to the schema
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Joins embedded path segments into column names
    pub column_separator: String,
    pub embedded_arrays: ArrayStorage,
    /// Run upserts as select-then-write even when the dialect has an upsert clause
    pub emulate_upsert: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            column_separator: "_".to_string(),
            embedded_arrays: ArrayStorage::Auto,
            emulate_upsert: false,
        }
    }
}

impl MapperConfig {
    pub fn column_separator(mut self, separator: impl Into<String>) -> Self {
        self.column_separator = separator.into();
        self
    }

    pub fn embedded_arrays(mut self, storage: ArrayStorage) -> Self {
        self.embedded_arrays = storage;
        self
    }

    pub fn emulate_upsert(mut self, enabled: bool) -> Self {
        self.emulate_upsert = enabled;
        self
    }

    pub fn validate(&self, dialect: &Dialect) -> InlayResult<()> {
        if self.column_separator.is_empty() {
            return Err(InlayError::invalid_configuration(
                "column_separator",
                "separator must not be empty",
            ));
        }
        if self.embedded_arrays == ArrayStorage::Native && !dialect.native_arrays {
            return Err(InlayError::invalid_configuration(
                "embedded_arrays",
                format!("{:?} has no native array columns", dialect.backend),
            ));
        }
        Ok(())
    }

    /// Whether arrays of embeddables end up in native array columns
    pub fn uses_native_arrays(&self, dialect: &Dialect) -> bool {
        match self.embedded_arrays {
            ArrayStorage::Auto => dialect.native_arrays,
            ArrayStorage::Json => false,
            ArrayStorage::Native => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::DbBackend;

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MapperConfig =
            serde_json::from_str(r#"{ "embedded_arrays": "json" }"#).unwrap();
        assert_eq!(config.column_separator, "_");
        assert_eq!(config.embedded_arrays, ArrayStorage::Json);
        assert!(!config.emulate_upsert);
    }

    #[test]
    fn test_native_arrays_need_dialect_support() {
        let sqlite = Dialect::for_backend(DbBackend::Sqlite);
        let postgres = Dialect::for_backend(DbBackend::Postgres);
        let config = MapperConfig::default().embedded_arrays(ArrayStorage::Native);
        assert!(config.validate(&sqlite).is_err());
        assert!(config.validate(&postgres).is_ok());

        let auto = MapperConfig::default();
        assert!(!auto.uses_native_arrays(&sqlite));
        assert!(auto.uses_native_arrays(&postgres));
    }

    #[test]
    fn test_empty_separator_rejected() {
        let sqlite = Dialect::for_backend(DbBackend::Sqlite);
        let config = MapperConfig::default().column_separator("");
        assert!(matches!(
            config.validate(&sqlite),
            Err(InlayError::InvalidConfiguration { .. })
        ));
    }
}
