//! The `person` scenario: Int key, Nvarchar(64) name, nullable DateTime.

mod common;

use chrono::NaiveDate;
use common::Person;
use tidemark::{
    DataType, DefaultTimestamps, NullHandling, RecordMapper, Row, TypeRegistry, Value, ValueMap,
};

fn registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    registry.register::<Person>().unwrap();
    registry
}

#[test]
fn test_person_metadata() {
    let registry = registry();
    let metadata = registry.lookup::<Person>().unwrap();
    assert_eq!(metadata.table_name(), "person");
    assert_eq!(metadata.primary_key_column(), "id");
    let columns: Vec<(&str, DataType, Option<u32>, bool)> = metadata
        .columns()
        .iter()
        .map(|c| (c.name.as_str(), c.data_type, c.max_length, c.nullable))
        .collect();
    assert_eq!(
        columns,
        vec![
            ("id", DataType::Int, None, false),
            ("firstname", DataType::Nvarchar, Some(64), false),
            ("bornon", DataType::DateTime, None, true),
        ]
    );
}

#[test]
fn test_person_to_value_map() {
    let registry = registry();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let ada = Person {
        id: 0,
        first_name: "Ada".to_string(),
        born_on: None,
    };
    let expected: ValueMap = [
        ("firstname".to_string(), Value::from("Ada")),
        ("bornon".to_string(), Value::Null),
    ]
    .into_iter()
    .collect();
    assert_eq!(mapper.to_value_map(&ada).unwrap(), expected);

    let omitting = mapper.with_null_handling(NullHandling::Omit);
    let values = omitting.to_value_map(&ada).unwrap();
    assert_eq!(values.keys().collect::<Vec<_>>(), vec!["firstname"]);
}

#[test]
fn test_person_from_row() {
    let registry = registry();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let row: Row = [
        ("id".to_string(), Value::Integer(1)),
        ("firstname".to_string(), Value::from("Ada")),
        ("bornon".to_string(), Value::Null),
    ]
    .into_iter()
    .collect();
    let person: Person = mapper.from_row(row).unwrap();
    assert_eq!(
        person,
        Person {
            id: 1,
            first_name: "Ada".to_string(),
            born_on: None,
        }
    );
}

#[test]
fn test_person_timestamp_round_trip() {
    let registry = registry();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let born = NaiveDate::from_ymd_opt(1815, 12, 10)
        .and_then(|d| d.and_hms_micro_opt(8, 30, 0, 250))
        .unwrap();
    let ada = Person {
        id: 3,
        first_name: "Ada".to_string(),
        born_on: Some(born),
    };
    let mut row = mapper.to_value_map(&ada).unwrap();
    assert_eq!(
        row.get("bornon"),
        Some(&Value::Text("1815-12-10 08:30:00.000250".to_string()))
    );
    row.insert("id".to_string(), Value::Integer(3));
    assert_eq!(mapper.from_row::<Person>(row).unwrap(), ada);
}

#[test]
fn test_person_name_too_long() {
    let registry = registry();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let long = Person {
        id: 0,
        first_name: "x".repeat(65),
        born_on: None,
    };
    assert!(mapper.to_value_map(&long).is_err());
    let exact = Person {
        first_name: "é".repeat(64),
        ..long
    };
    assert!(mapper.to_value_map(&exact).is_ok());
}
