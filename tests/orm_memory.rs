//! CRUD through the dispatcher against the in-memory backend.

mod common;

use chrono::NaiveDate;
use common::Person;
use std::sync::Arc;
use tidemark::{
    ErrorKind, Expression, MapperSettings, MemoryBackend, NullHandling, OrderBy, Orm,
    StorageBackend, TideError, TypeRegistry, Value, ValueMap,
};

fn person(name: &str) -> Person {
    Person {
        id: 0,
        first_name: name.to_string(),
        born_on: None,
    }
}

fn orm_with(settings: MapperSettings) -> Orm<MemoryBackend> {
    let orm = Orm::with_settings(MemoryBackend::new(), settings);
    orm.register_type::<Person>().unwrap();
    orm.insert_many(&[person("Ada"), person("Grace"), person("Linus"), person("Barbara")])
        .unwrap();
    orm
}

fn orm() -> Orm<MemoryBackend> {
    orm_with(MapperSettings::default())
}

fn names(people: &[Person]) -> Vec<&str> {
    people.iter().map(|p| p.first_name.as_str()).collect()
}

#[test]
fn test_register_creates_table() {
    let orm = Orm::new(MemoryBackend::new());
    orm.register_type::<Person>().unwrap();
    assert!(orm.backend().table_exists("person").unwrap());
    let columns = orm.backend().describe_table("person").unwrap();
    assert_eq!(columns.len(), 3);
    assert_eq!(orm.table_name::<Person>().unwrap(), "person");
    assert_eq!(orm.column_name::<Person>("first_name").unwrap(), "firstname");

    let err = orm.register_type::<Person>().unwrap_err();
    assert!(matches!(err, TideError::AlreadyRegistered { .. }));
}

#[test]
fn test_register_without_creating_tables() {
    let settings = MapperSettings {
        create_missing_tables: false,
        ..MapperSettings::default()
    };
    let orm = Orm::with_settings(MemoryBackend::new(), settings);
    orm.register_type::<Person>().unwrap();
    assert!(!orm.backend().table_exists("person").unwrap());
    let err = orm.insert(&person("Ada")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
}

#[test]
fn test_unregistered_type_is_a_lookup_error() {
    let orm = Orm::new(MemoryBackend::new());
    let err = orm.insert(&person("Ada")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lookup);
    assert!(orm.select_many::<Person>(None, &[], None, None).is_err());
}

#[test]
fn test_insert_assigns_keys() {
    let orm = orm();
    let people: Vec<Person> = orm
        .select_many(None, &[OrderBy::asc("id")], None, None)
        .unwrap();
    assert_eq!(people.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    assert_eq!(names(&people), vec!["Ada", "Grace", "Linus", "Barbara"]);
    assert!(orm.insert_many::<Person>(&[]).is_err());
}

#[test]
fn test_select_paging_and_order() {
    let orm = orm();
    let page: Vec<Person> = orm
        .select_many(None, &[OrderBy::asc("firstname")], Some(1), Some(2))
        .unwrap();
    assert_eq!(names(&page), vec!["Barbara", "Grace"]);

    let first = orm
        .select_first::<Person>(None, &[OrderBy::desc("firstname")])
        .unwrap()
        .unwrap();
    assert_eq!(first.first_name, "Linus");

    let none = orm
        .select_first::<Person>(Some(&Expression::equals("firstname", "Nobody")), &[])
        .unwrap();
    assert!(none.is_none());
}

#[test]
fn test_default_select_limit() {
    let orm = orm_with(MapperSettings {
        default_select_limit: Some(3),
        ..MapperSettings::default()
    });
    let capped: Vec<Person> = orm.select_many(None, &[], None, None).unwrap();
    assert_eq!(capped.len(), 3);
    let explicit: Vec<Person> = orm.select_many(None, &[], None, Some(10)).unwrap();
    assert_eq!(explicit.len(), 4);
}

#[test]
fn test_select_by_key() {
    let orm = orm();
    let grace = orm.select_by_key::<Person>(2).unwrap().unwrap();
    assert_eq!(grace.first_name, "Grace");
    assert!(orm.select_by_key::<Person>(99).unwrap().is_none());
    let err = orm.select_by_key::<Person>(Value::Null).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_update_round_trip() {
    let orm = orm();
    let mut ada = orm.select_by_key::<Person>(1).unwrap().unwrap();
    ada.first_name = "Augusta Ada".to_string();
    ada.born_on = chrono::NaiveDate::from_ymd_opt(1815, 12, 10).and_then(|d| d.and_hms_opt(0, 0, 0));
    let updated = orm.update(&ada).unwrap();
    assert_eq!(updated, ada);
    assert_eq!(orm.select_by_key::<Person>(1).unwrap(), Some(ada));

    let ghost = Person {
        id: 42,
        ..person("Ghost")
    };
    assert_eq!(orm.update(&ghost).unwrap_err().kind(), ErrorKind::Argument);
}

#[test]
fn test_update_many_validates_columns() {
    let orm = orm();
    let values: ValueMap = [("firstname".to_string(), Value::from("Anon"))].into_iter().collect();
    let changed = orm
        .update_many::<Person>(&Expression::greater_than("id", 2), values)
        .unwrap();
    assert_eq!(changed, 2);
    let anon = Expression::equals("firstname", "Anon");
    assert_eq!(orm.count::<Person>(Some(&anon)).unwrap(), 2);

    let key: ValueMap = [("id".to_string(), Value::Integer(7))].into_iter().collect();
    let err = orm.update_many::<Person>(&anon, key).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
    assert!(orm.update_many::<Person>(&anon, ValueMap::new()).is_err());
}

#[test]
fn test_update_many_coerces_values() {
    let orm = orm();
    let everyone = Expression::greater_than("id", 0);

    let long: ValueMap = [("firstname".to_string(), Value::from("x".repeat(100)))]
        .into_iter()
        .collect();
    let err = orm.update_many::<Person>(&everyone, long).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conversion);

    let flag: ValueMap = [("bornon".to_string(), Value::Bool(true))].into_iter().collect();
    let err = orm.update_many::<Person>(&everyone, flag).unwrap_err();
    assert!(matches!(err, TideError::UnsupportedDataType { .. }));
    assert_eq!(orm.count::<Person>(Some(&Expression::is_null("bornon"))).unwrap(), 4);

    let born = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let dated: ValueMap = [("bornon".to_string(), Value::DateTime(born))].into_iter().collect();
    assert_eq!(orm.update_many::<Person>(&Expression::equals("id", 1), dated).unwrap(), 1);
    let ada = orm.select_by_key::<Person>(1).unwrap().unwrap();
    assert_eq!(ada.born_on, Some(born));
}

#[test]
fn test_concurrent_register_type_has_one_winner() {
    let orm = Orm::new(MemoryBackend::new());
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| orm.register_type::<Person>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(matches!(err, TideError::AlreadyRegistered { .. }), "{err}");
    }
    assert!(orm.backend().table_exists("person").unwrap());
}

#[test]
fn test_delete_variants() {
    let orm = orm();
    let ada = orm.select_by_key::<Person>(1).unwrap().unwrap();
    assert_eq!(orm.delete(&ada).unwrap(), 1);
    assert_eq!(orm.delete_by_key::<Person>(2).unwrap(), 1);
    assert_eq!(orm.delete_by_key::<Person>(2).unwrap(), 0);
    let removed = orm
        .delete_many::<Person>(&Expression::ends_with("firstname", "s"))
        .unwrap();
    assert_eq!(removed, 1);
    let left: Vec<Person> = orm.select_many(None, &[], None, None).unwrap();
    assert_eq!(names(&left), vec!["Barbara"]);
}

#[test]
fn test_aggregates() {
    let orm = orm();
    assert_eq!(orm.count::<Person>(None).unwrap(), 4);
    assert!(orm.exists::<Person>(Some(&Expression::contains("firstname", "inu"))).unwrap());
    assert!(!orm.exists::<Person>(Some(&Expression::is_not_null("bornon"))).unwrap());
    assert_eq!(orm.sum::<Person>("id", None).unwrap(), Value::Integer(10));
    let filter = Expression::between("id", vec![Value::from(2), Value::from(3)]).unwrap();
    assert_eq!(orm.sum::<Person>("id", Some(&filter)).unwrap(), Value::Integer(5));
}

#[test]
fn test_null_handling_omit_leaves_defaults_to_backend() {
    let orm = orm_with(MapperSettings {
        null_handling: NullHandling::Omit,
        ..MapperSettings::default()
    });
    let stored = orm.insert(&person("Margaret")).unwrap();
    assert_eq!(stored.born_on, None);
    assert_eq!(orm.mapper().null_handling(), NullHandling::Omit);
}

#[test]
fn test_raw_query_error_carries_text() {
    let orm = orm();
    let err = orm.query("SELECT * FROM person").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Backend);
    assert_eq!(err.query(), Some("SELECT * FROM person"));
    assert!(orm.query_as::<Person>("SELECT 1").is_err());
    assert_eq!(orm.sanitize("O'Brien"), "O''Brien");
}

#[test]
fn test_shared_registry_between_dispatchers() {
    let registry = Arc::new(TypeRegistry::new());
    let first = Orm::with_registry(MemoryBackend::new(), Arc::clone(&registry), MapperSettings::default());
    first.register_type::<Person>().unwrap();

    let second = Orm::with_registry(MemoryBackend::new(), registry, MapperSettings::default());
    assert_eq!(second.table_name::<Person>().unwrap(), "person");
    // the second backend never saw the table
    assert_eq!(second.insert(&person("Ada")).unwrap_err().kind(), ErrorKind::Backend);
    second
        .backend()
        .create_table("person", first.registry().lookup::<Person>().unwrap().columns())
        .unwrap();
    assert_eq!(second.insert(&person("Ada")).unwrap().id, 1);
}
