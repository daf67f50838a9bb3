//! Write then read every supported data type, through the mapper and through
//! the in-memory backend.

mod common;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use common::{Sample, Status};
use fake::faker::lorem::en::{Sentence, Word};
use fake::{Fake, Faker};
use rust_decimal::Decimal;
use tidemark::{
    DefaultTimestamps, MemoryBackend, Orm, PropertyValue, RecordMapper, Row, TypeRegistry, Value,
};
use uuid::Uuid;

fn fake_datetime() -> NaiveDateTime {
    let secs: i64 = (0..4_102_444_800i64).fake();
    let micros: u32 = (0..1_000_000u32).fake();
    DateTime::from_timestamp(secs, micros * 1000).unwrap().naive_utc()
}

fn fake_offset_datetime() -> DateTime<FixedOffset> {
    let minutes: i32 = (-12 * 60..=14 * 60).fake();
    let offset = FixedOffset::east_opt(minutes * 60).unwrap();
    fake_datetime().and_utc().with_timezone(&offset)
}

fn fake_status() -> Status {
    [Status::Draft, Status::Published, Status::Archived][(0..3usize).fake::<usize>()]
}

fn fake_sample() -> Sample {
    let word: String = Word().fake();
    Sample {
        id: Uuid::new_v4(),
        flag: Faker.fake(),
        small: Faker.fake(),
        count: Faker.fake(),
        total: Faker.fake(),
        price: Decimal::new((-1_000_000_000_000i64..1_000_000_000_000).fake(), 2),
        ratio: (-1.0e9..1.0e9).fake(),
        label: word.chars().take(32).collect(),
        note: Faker.fake::<bool>().then(|| Sentence(3..8).fake()),
        status: fake_status(),
        level: Faker.fake::<bool>().then(fake_status),
        created: fake_datetime(),
        seen: Faker.fake::<bool>().then(fake_offset_datetime),
        payload: (Faker, 0..64usize).fake::<Vec<u8>>(),
        external: Faker.fake::<bool>().then(Uuid::new_v4),
    }
}

#[test]
fn test_mapper_round_trip() {
    let registry = TypeRegistry::new();
    registry.register::<Sample>().unwrap();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    for _ in 0..200 {
        let sample = fake_sample();
        let mut row: Row = mapper.to_value_map(&sample).unwrap();
        row.insert("id".to_string(), mapper.key_value(&sample).unwrap());
        let back: Sample = mapper.from_row(row).unwrap();
        assert_eq!(back, sample);
    }
}

#[test]
fn test_write_representations() {
    let registry = TypeRegistry::new();
    registry.register::<Sample>().unwrap();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let sample = Sample {
        flag: true,
        status: Status::Archived,
        level: Some(Status::Published),
        external: Some(Uuid::nil()),
        ..fake_sample()
    };
    let values = mapper.to_value_map(&sample).unwrap();
    assert_eq!(values["flag"], Value::Integer(1));
    assert_eq!(values["status"], Value::from("Archived"));
    assert_eq!(values["level"], Value::Integer(1));
    assert_eq!(
        values["external"],
        Value::from("00000000-0000-0000-0000-000000000000")
    );
    assert!(!values.contains_key("id"));
}

#[test]
fn test_guid_read_representations() {
    let registry = TypeRegistry::new();
    registry.register::<Sample>().unwrap();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let guid = Uuid::new_v4();
    let base = mapper.to_value_map(&fake_sample()).unwrap();

    for stored in [
        Value::Guid(guid),
        Value::Bytes(guid.as_bytes().to_vec()),
        Value::Text(guid.hyphenated().to_string()),
    ] {
        let mut row = base.clone();
        row.insert("id".to_string(), stored);
        let sample: Sample = mapper.from_row(row).unwrap();
        assert_eq!(sample.id, guid);
    }

    for bad in [Value::Integer(7), Value::Bytes(vec![1, 2, 3]), Value::from("not-a-guid")] {
        let mut row = base.clone();
        row.insert("id".to_string(), bad);
        assert!(mapper.from_row::<Sample>(row).is_err());
    }
}

#[test]
fn test_enum_reads_name_or_ordinal() {
    let registry = TypeRegistry::new();
    registry.register::<Sample>().unwrap();
    let mapper = RecordMapper::new(&registry, &DefaultTimestamps);
    let mut row = mapper.to_value_map(&fake_sample()).unwrap();
    row.insert("status".to_string(), Value::from("published"));
    row.insert("level".to_string(), Value::Integer(9));
    let sample: Sample = mapper.from_row(row.clone()).unwrap();
    assert_eq!(sample.status, Status::Published);
    assert_eq!(sample.level, Some(Status::Archived));

    row.insert("level".to_string(), Value::Integer(4));
    assert!(mapper.from_row::<Sample>(row).is_err());
}

#[test]
fn test_backend_round_trip() {
    let orm = Orm::new(MemoryBackend::new());
    orm.register_type::<Sample>().unwrap();
    for _ in 0..50 {
        let sample = fake_sample();
        let stored = orm.insert(&sample).unwrap();
        // the key is assigned by the backend
        assert_ne!(stored.id, sample.id);
        assert_eq!(Sample { id: sample.id, ..stored.clone() }, sample);

        let fetched: Sample = orm.select_by_key::<Sample>(stored.id).unwrap().unwrap();
        assert_eq!(fetched, stored);
    }
    assert_eq!(orm.count::<Sample>(None).unwrap(), 50);
}

#[test]
fn test_property_values_are_canonical_per_column() {
    let registry = TypeRegistry::new();
    registry.register::<Sample>().unwrap();
    let metadata = registry.lookup::<Sample>().unwrap();
    let small = metadata.column_for_property("small").unwrap();
    let read = tidemark::value::from_storage(small, Value::Integer(200), &DefaultTimestamps).unwrap();
    assert_eq!(read, PropertyValue::U8(200));
}
