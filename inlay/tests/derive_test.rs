pub mod model {
    #![allow(dead_code)]
    use inlay::{Embeddable, Entity};

    #[derive(Embeddable)]
    pub struct Geo {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Embeddable)]
    pub struct Address {
        pub street: String,
        #[inlay(embedded)]
        pub geo: Option<Geo>,
    }

    #[derive(Entity)]
    pub struct Company {
        #[inlay(primary_key)]
        pub id: i64,
        #[inlay(unique)]
        pub name: String,
    }

    #[derive(Entity)]
    #[inlay(table = "people")]
    pub struct Person {
        #[inlay(primary_key)]
        pub id: i32,
        #[inlay(rename = "fullName")]
        pub full_name: String,
        #[inlay(lazy)]
        pub bio: Option<String>,
        #[inlay(embedded)]
        pub address: Address,
        #[inlay(embedded)]
        pub previous: Vec<Address>,
        #[inlay(relation = "Company", foreign_key = "employer_id")]
        pub employer: Option<i64>,
        #[inlay(skip)]
        pub cached: u8,
    }

    #[derive(Entity)]
    pub struct Ticket {
        #[inlay(primary_key, auto_increment = false)]
        pub code: String,
        pub seat: i32,
    }
}

#[path = "helpers.rs"]
mod helpers;

#[cfg(test)]
mod tests {
    use super::helpers::init_logger;
    use super::model::{Address, Company, Person, Ticket};
    use inlay::schema::{DescribeEmbeddable, DescribeEntity};
    use inlay::{
        EntityManager, FieldOp, MapperConfig, Object, PropertyKind, ScalarType, Schema,
    };

    #[test]
    fn test_entity_descriptor_from_derive() {
        let person = Person::entity_descriptor();
        assert_eq!(Person::NAME, "Person");
        assert_eq!(person.table, "people");
        assert_eq!(person.primary_key, vec!["id"]);
        let names: Vec<&str> = person.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "fullName", "bio", "address", "previous", "employer"]
        );

        let id = &person.properties[0];
        assert!(id.primary_key && id.auto_increment);
        let bio = &person.properties[2];
        assert!(bio.lazy && bio.nullable);
        assert!(matches!(person.properties[3].kind, PropertyKind::Embedded(_)));
        assert!(matches!(person.properties[4].kind, PropertyKind::EmbeddedArray(_)));
        match &person.properties[5].kind {
            PropertyKind::Relation(relation) => {
                assert_eq!(relation.target, "Company");
                assert_eq!(relation.foreign_key, "employer_id");
            }
            other => panic!("expected relation, got {other:?}"),
        }
        assert!(person.properties[5].nullable);
    }

    #[test]
    fn test_embeddable_descriptor_from_derive() {
        let address = Address::embeddable_descriptor();
        assert_eq!(address.name, "Address");
        let geo = &address.properties[1];
        assert!(geo.nullable);
        let shape = geo.kind.embeddable().unwrap();
        assert_eq!(shape.properties[0].scalar_type(), Some(ScalarType::Double));
    }

    #[test]
    fn test_auto_increment_opt_out() {
        let ticket = Ticket::entity_descriptor();
        assert_eq!(ticket.table, "ticket");
        assert!(ticket.properties[0].primary_key);
        assert!(!ticket.properties[0].auto_increment);
        assert!(ticket.generated_key().is_none());
        assert_eq!(Company::entity_descriptor().primary_key_types(), vec![ScalarType::BigInteger]);
    }

    #[tokio::test]
    async fn test_file_backed_round_trip() {
        init_logger();
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("inlay.db").display());
        let schema = Schema::builder()
            .with::<Company>()
            .with::<Person>()
            .with::<Ticket>()
            .build()
            .unwrap();

        {
            let mut em = EntityManager::connect(&url, schema.clone(), MapperConfig::default())
                .await
                .unwrap();
            em.refresh_schema().await.unwrap();
            let company = em.create("Company", Object::new().with("name", "Initech")).unwrap();
            em.create(
                "Person",
                Object::new()
                    .with("fullName", "Peter")
                    .with("bio", "Works here")
                    .with(
                        "address",
                        Object::new()
                            .with("street", "Main St")
                            .with("geo", Object::new().with("lat", 1.5).with("lng", -2.0)),
                    )
                    .with(
                        "previous",
                        vec![Object::new()
                            .with("street", "Old Rd")
                            .with("geo", Option::<Object>::None)],
                    )
                    .with("employer", company),
            )
            .unwrap();
            em.create("Ticket", Object::new().with("code", "A1").with("seat", 7)).unwrap();
            em.flush().await.unwrap();
        }

        // a fresh connection sees what the first one committed
        let mut em = EntityManager::connect(&url, schema, MapperConfig::default())
            .await
            .unwrap();
        let person = em
            .find("Person")
            .filter("address.street", FieldOp::equals("Main St"))
            .populate(["employer"])
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(person, "fullName").unwrap().as_str(), Some("Peter"));
        assert!(!em.field(person, "bio").unwrap().is_loaded());
        assert_eq!(em.field(person, "address.geo.lat").unwrap().as_f64(), Some(1.5));
        assert_eq!(em.field(person, "employer.name").unwrap().as_str(), Some("Initech"));
        let previous = em.field(person, "previous").unwrap().as_array().unwrap();
        assert_eq!(previous[0].get("street").as_str(), Some("Old Rd"));
        assert!(previous[0].get("geo").is_null());

        let ticket = em
            .find("Ticket")
            .filter("code", FieldOp::equals("A1"))
            .exec_or_fail()
            .await
            .unwrap();
        assert_eq!(em.field(ticket, "seat").unwrap().as_i64(), Some(7));
    }
}
