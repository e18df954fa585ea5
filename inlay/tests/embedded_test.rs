pub mod model {
    #![allow(dead_code)]
    use inlay::{Embeddable, Entity};

    #[derive(Embeddable)]
    pub struct Properties {
        #[inlay(lazy)]
        pub tag: String,
    }

    #[derive(Entity)]
    pub struct User {
        #[inlay(primary_key)]
        pub id: i32,
        pub name: String,
        #[inlay(unique)]
        pub email: String,
        #[inlay(embedded)]
        pub properties: Properties,
    }

    #[derive(Embeddable)]
    pub struct Address {
        pub city: String,
        pub zip: Option<i32>,
    }

    #[derive(Entity)]
    #[inlay(table = "customers")]
    pub struct Customer {
        #[inlay(primary_key)]
        pub id: i32,
        pub name: String,
        #[inlay(embedded)]
        pub addresses: Option<Vec<Address>>,
    }

    #[derive(Embeddable)]
    pub struct Settings {
        #[inlay(lazy)]
        pub tag: Option<String>,
        pub rank: Option<i32>,
    }

    #[derive(Entity)]
    pub struct Account {
        #[inlay(primary_key)]
        pub id: i32,
        #[inlay(embedded)]
        pub settings: Option<Settings>,
    }
}

#[path = "helpers.rs"]
mod helpers;

#[cfg(test)]
mod tests {
    use super::helpers::{setup_manager, setup_test_db};
    use super::model::{Account, Customer, User};
    use inlay::{EntityManager, FieldOp, InlayError, MapperConfig, Object, Schema};
    use sea_orm::ConnectionTrait;

    fn schema() -> Schema {
        Schema::builder()
            .with::<User>()
            .with::<Customer>()
            .with::<Account>()
            .build()
            .unwrap()
    }

    async fn seed_account(em: &mut EntityManager, settings: Object) {
        em.create("Account", Object::new().with("settings", settings)).unwrap();
        em.flush().await.unwrap();
        em.clear();
    }

    async fn stored_settings_tag(em: &mut EntityManager) -> Option<String> {
        let account = em
            .find("Account")
            .populate(["settings.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        let tag = em
            .field(account, "settings.tag")
            .unwrap()
            .as_str()
            .map(str::to_string);
        em.clear();
        tag
    }

    async fn seed_user(em: &mut EntityManager) {
        em.create(
            "User",
            Object::new()
                .with("name", "Foo")
                .with("email", "foo")
                .with("properties", Object::new().with("tag", "Bar")),
        )
        .unwrap();
        em.flush().await.unwrap();
        em.clear();
    }

    #[tokio::test]
    async fn test_lazy_embedded_leaf_via_fields_and_populate() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_user(&mut em).await;

        let user1 = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .fields(["*", "properties.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(user1, "name").unwrap().as_str(), Some("Foo"));
        assert_eq!(em.field(user1, "email").unwrap().as_str(), Some("foo"));
        assert_eq!(em.field(user1, "properties.tag").unwrap().as_str(), Some("Bar"));
        em.clear();

        let user2 = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .populate(["properties.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(user2, "name").unwrap().as_str(), Some("Foo"));
        assert_eq!(em.field(user2, "email").unwrap().as_str(), Some("foo"));
        assert_eq!(em.field(user2, "properties.tag").unwrap().as_str(), Some("Bar"));
    }

    #[tokio::test]
    async fn test_lazy_leaf_stays_unloaded_by_default() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_user(&mut em).await;

        let user = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(user, "name").unwrap().as_str(), Some("Foo"));
        assert!(!em.field(user, "properties.tag").unwrap().is_loaded());
    }

    #[tokio::test]
    async fn test_reload_keeps_local_changes() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_user(&mut em).await;

        let user = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .exec_or_fail()
            .await
            .unwrap();
        em.object_mut(user).unwrap().set("name", "Changed");

        let again = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .populate(["properties.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(again, user);
        assert_eq!(em.field(user, "name").unwrap().as_str(), Some("Changed"));
        assert_eq!(em.field(user, "properties.tag").unwrap().as_str(), Some("Bar"));

        em.flush().await.unwrap();
        em.clear();
        let user = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(user, "name").unwrap().as_str(), Some("Changed"));
    }

    #[tokio::test]
    async fn test_refind_takes_newer_values_for_untouched_fields() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_user(&mut em).await;

        let user = em
            .find("User")
            .filter("email", FieldOp::equals("foo"))
            .exec_or_fail()
            .await
            .unwrap();
        em.object_mut(user).unwrap().set("email", "foo@local");
        em.connection()
            .execute_unprepared(r#"UPDATE "user" SET "name" = 'External'"#)
            .await
            .unwrap();

        let again = em
            .find("User")
            .filter("name", FieldOp::equals("External"))
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(again, user);
        assert_eq!(em.field(user, "name").unwrap().as_str(), Some("External"));
        assert_eq!(em.field(user, "email").unwrap().as_str(), Some("foo@local"));

        em.flush().await.unwrap();
        em.clear();
        let user = em.find("User").exec_or_fail().await.unwrap();
        assert_eq!(em.field(user, "name").unwrap().as_str(), Some("External"));
        assert_eq!(em.field(user, "email").unwrap().as_str(), Some("foo@local"));
    }

    #[tokio::test]
    async fn test_untouched_flush_keeps_unselected_lazy_leaf() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_account(
            &mut em,
            Object::new().with("tag", "bar").with("rank", None::<i32>),
        )
        .await;

        let account = em.find("Account").exec_or_fail().await.unwrap();
        let settings = em.field(account, "settings").unwrap();
        assert!(!settings.is_null());
        let settings = settings.as_object().unwrap();
        assert!(settings.get("rank").is_null());
        assert!(!settings.get("tag").is_loaded());

        em.flush().await.unwrap();
        em.clear();
        assert_eq!(stored_settings_tag(&mut em).await.as_deref(), Some("bar"));
    }

    #[tokio::test]
    async fn test_null_embedded_with_lazy_leaf_round_trip() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        seed_account(&mut em, Object::new().with("tag", "bar").with("rank", 3)).await;

        let account = em.find("Account").exec_or_fail().await.unwrap();
        em.object_mut(account).unwrap().set("settings", None::<Object>);
        em.flush().await.unwrap();
        em.clear();

        let account = em
            .find("Account")
            .fields(["*", "settings.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        assert!(em.field(account, "settings").unwrap().is_null());
        em.clear();

        // only the eager leaf is read here, so the embedded is not known to be NULL
        let account = em.find("Account").exec_or_fail().await.unwrap();
        assert!(em.field(account, "settings.rank").unwrap().is_null());
        assert!(!em.field(account, "settings.tag").unwrap().is_loaded());
        em.flush().await.unwrap();
        em.clear();

        let account = em
            .find("Account")
            .populate(["settings.tag"])
            .exec_or_fail()
            .await
            .unwrap();
        assert!(em.field(account, "settings").unwrap().is_null());
    }

    #[tokio::test]
    async fn test_null_embedded_array_persists_as_null() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        let customer = em
            .create(
                "Customer",
                Object::new().with("name", "Acme").with(
                    "addresses",
                    vec![Object::new().with("city", "Berlin").with("zip", 10115)],
                ),
            )
            .unwrap();
        em.flush().await.unwrap();
        let id = em.key(customer).unwrap().cloned().unwrap();
        em.clear();

        let customer = em.find("Customer").exec_or_fail().await.unwrap();
        let addresses = em.field(customer, "addresses").unwrap().as_array().unwrap();
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].get("city").as_str(), Some("Berlin"));
        assert_eq!(addresses[0].get("zip").as_i64(), Some(10115));

        em.object_mut(customer)
            .unwrap()
            .set("addresses", Option::<Vec<Object>>::None);
        em.flush().await.unwrap();
        em.clear();

        let customer = em.find("Customer").exec_or_fail().await.unwrap();
        assert_eq!(em.key(customer).unwrap(), Some(&id));
        let addresses = em.field(customer, "addresses").unwrap();
        assert!(addresses.is_null());
        assert!(addresses.as_array().is_none());
    }

    #[tokio::test]
    async fn test_empty_embedded_array_is_not_null() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        em.create(
            "Customer",
            Object::new().with("name", "Empty").with("addresses", Vec::<Object>::new()),
        )
        .unwrap();
        em.flush().await.unwrap();
        em.clear();

        let customer = em.find("Customer").exec_or_fail().await.unwrap();
        let addresses = em.field(customer, "addresses").unwrap();
        assert!(!addresses.is_null());
        assert_eq!(addresses.as_array().map(<[Object]>::len), Some(0));
    }

    #[tokio::test]
    async fn test_unknown_paths_fail_before_any_sql() {
        // no tables: any statement reaching the database would be a driver error
        let db = setup_test_db().await;
        let mut em = EntityManager::new(db, schema(), MapperConfig::default()).unwrap();

        let err = em
            .find("User")
            .populate(["properties.missing"])
            .exec()
            .await
            .unwrap_err();
        assert!(matches!(err, InlayError::UnknownProperty { .. }), "{err}");

        let err = em
            .find("User")
            .fields(["name.first"])
            .exec()
            .await
            .unwrap_err();
        assert!(matches!(err, InlayError::PathTraversal { .. }), "{err}");

        let err = em
            .upsert(
                "User",
                Object::new()
                    .with("name", "Foo")
                    .with("email", "foo")
                    .with("properties", Object::new().with("tag", "x")),
            )
            .merge_fields(["name", "properties.nope"])
            .exec()
            .await
            .unwrap_err();
        assert!(matches!(err, InlayError::UnknownMergeField { .. }), "{err}");
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_unknown_property_in_created_object() {
        let mut em = setup_manager(schema(), MapperConfig::default()).await;
        let err = em
            .create(
                "User",
                Object::new()
                    .with("name", "Foo")
                    .with("properties", Object::new().with("colour", "red")),
            )
            .unwrap_err();
        assert!(matches!(err, InlayError::UnknownProperty { .. }));
        assert!(em.is_empty());
    }
}
