#[path = "helpers.rs"]
mod helpers;

#[cfg(test)]
mod tests {
    use super::helpers::setup_manager;
    use inlay::{
        EmbeddableDescriptor, EntityDescriptor, EntityManager, FieldOp, InlayError, MapperConfig,
        Object, PropertyDescriptor, ScalarType, Schema,
    };

    fn schema() -> Schema {
        let properties = EmbeddableDescriptor::builder("Properties")
            .property(PropertyDescriptor::scalar("tag", ScalarType::Text))
            .build();
        Schema::builder()
            .entity(
                EntityDescriptor::builder("User")
                    .property(PropertyDescriptor::scalar("id", ScalarType::Integer).primary_key())
                    .property(PropertyDescriptor::scalar("name", ScalarType::Text))
                    .property(PropertyDescriptor::scalar("email", ScalarType::Text).unique())
                    .property(PropertyDescriptor::embedded("properties", properties))
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn user(name: &str, email: &str, tag: &str) -> Object {
        Object::new()
            .with("name", name)
            .with("email", email)
            .with("properties", Object::new().with("tag", tag))
    }

    async fn seed(em: &mut EntityManager, name: &str, email: &str, tag: &str) {
        em.create("User", user(name, email, tag)).unwrap();
        em.flush().await.unwrap();
        em.clear();
    }

    async fn stored_tag(em: &mut EntityManager, email: &str) -> Option<String> {
        em.clear();
        let user = em
            .find("User")
            .filter("email", FieldOp::equals(email))
            .exec_or_fail()
            .await
            .unwrap();
        em.field(user, "properties.tag")
            .unwrap()
            .as_str()
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_default_settings_update_embedded_columns() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed(&mut em, "Foo", "foo", "foo").await;

        em.upsert("User", user("Foo", "foo", "foo2"))
            .exec()
            .await
            .unwrap();
        assert_eq!(stored_tag(&mut em, "foo").await.as_deref(), Some("foo2"));
    }

    #[tokio::test]
    async fn test_bare_embedded_name_in_merge_fields() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed(&mut em, "Bar", "bar", "bar").await;

        em.upsert("User", user("Bar", "bar", "bar2"))
            .on_conflict_fields(["email"])
            .merge_fields(["name", "properties"])
            .exec()
            .await
            .unwrap();
        assert_eq!(stored_tag(&mut em, "bar").await.as_deref(), Some("bar2"));
    }

    #[tokio::test]
    async fn test_full_leaf_path_in_merge_fields() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed(&mut em, "Baz", "baz", "baz").await;

        em.upsert("User", user("Baz", "baz", "baz2"))
            .on_conflict_fields(["email"])
            .merge_fields(["name", "properties.tag"])
            .exec()
            .await
            .unwrap();
        assert_eq!(stored_tag(&mut em, "baz").await.as_deref(), Some("baz2"));
    }

    #[tokio::test]
    async fn test_merge_fields_limit_the_update() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed(&mut em, "Qux", "qux", "qux").await;

        let handle = em
            .upsert("User", user("Renamed", "qux", "qux2"))
            .merge_fields(["properties"])
            .exec()
            .await
            .unwrap();
        assert_eq!(em.field(handle, "name").unwrap().as_str(), Some("Qux"));
        assert_eq!(em.field(handle, "properties.tag").unwrap().as_str(), Some("qux2"));
    }

    #[tokio::test]
    async fn test_upsert_inserts_and_returns_managed_row() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;

        let handle = em
            .upsert("User", user("New", "new", "fresh"))
            .exec()
            .await
            .unwrap();
        let key = em.key(handle).unwrap().cloned().unwrap();
        assert_eq!(em.lookup("User", &key), Some(handle));
        assert!(em.field(handle, "id").unwrap().is_loaded());
        assert_eq!(em.field(handle, "properties.tag").unwrap().as_str(), Some("fresh"));

        // a second upsert refreshes the same managed instance
        let again = em
            .upsert("User", user("New", "new", "fresher"))
            .exec()
            .await
            .unwrap();
        assert_eq!(again, handle);
        assert_eq!(em.field(handle, "properties.tag").unwrap().as_str(), Some("fresher"));
    }

    #[tokio::test]
    async fn test_ignore_keeps_existing_row() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed(&mut em, "Keep", "keep", "old").await;

        em.upsert("User", user("Keep", "keep", "new"))
            .ignore()
            .exec()
            .await
            .unwrap();
        assert_eq!(stored_tag(&mut em, "keep").await.as_deref(), Some("old"));
    }

    #[tokio::test]
    async fn test_emulated_upsert_matches_native_clause() {
        let config = MapperConfig {
            emulate_upsert: true,
            ..Default::default()
        };
        let mut em = setup_manager(schema(), config).await;
        seed(&mut em, "Emu", "emu", "emu").await;

        em.upsert("User", user("Emu", "emu", "emu2"))
            .on_conflict_fields(["email"])
            .merge_fields(["name", "properties"])
            .exec()
            .await
            .unwrap();
        assert_eq!(stored_tag(&mut em, "emu").await.as_deref(), Some("emu2"));

        em.upsert("User", user("Other", "other", "o"))
            .exec()
            .await
            .unwrap();
        em.clear();
        assert_eq!(em.find("User").exec_many().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_target_required() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        let err = em
            .upsert(
                "User",
                Object::new()
                    .with("name", "NoKey")
                    .with("properties", Object::new().with("tag", "x")),
            )
            .exec()
            .await
            .unwrap_err();
        assert!(matches!(err, InlayError::NoConflictTarget { .. }), "{err}");
    }
}
