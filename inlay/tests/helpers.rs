use inlay::{EntityManager, MapperConfig, Schema};
use sea_orm::{Database, DatabaseConnection};

#[allow(dead_code)]
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
#[allow(dead_code)]
pub async fn setup_test_db() -> DatabaseConnection {
    init_logger();
    Database::connect("sqlite::memory:").await.unwrap()
}

/// In-memory manager with every table of `schema` created
#[allow(dead_code)]
pub async fn setup_manager(schema: Schema, config: MapperConfig) -> EntityManager {
    let db = setup_test_db().await;
    let em = EntityManager::new(db, schema, config).unwrap();
    em.refresh_schema().await.unwrap();
    em
}
