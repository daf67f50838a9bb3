//! Record types shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::Decimal;
use tidemark::{ColumnTag, DataType, Record, RecordDescriptor, TableTag, TideError};
use uuid::Uuid;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Person {
    pub id: i32,
    pub first_name: String,
    pub born_on: Option<NaiveDateTime>,
}

impl Record for Person {
    fn describe() -> Result<RecordDescriptor, TideError> {
        Ok(RecordDescriptor::new()
            .table(TableTag::new("person")?)
            .column("id", ColumnTag::builder(DataType::Int).primary_key().build()?)
            .column(
                "first_name",
                ColumnTag::builder(DataType::Nvarchar).name("firstname").max_length(64).build()?,
            )
            .column(
                "born_on",
                ColumnTag::builder(DataType::DateTime).name("bornon").nullable().build()?,
            ))
    }

    tidemark::record_accessors!(id, first_name, born_on);
}

tidemark::db_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub enum Status {
        #[default]
        Draft = 0,
        Published = 1,
        Archived = 9,
    }
}

/// One property per supported data type.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Sample {
    pub id: Uuid,
    pub flag: bool,
    pub small: u8,
    pub count: i32,
    pub total: i64,
    pub price: Decimal,
    pub ratio: f64,
    pub label: String,
    pub note: Option<String>,
    pub status: Status,
    pub level: Option<Status>,
    pub created: NaiveDateTime,
    pub seen: Option<DateTime<FixedOffset>>,
    pub payload: Vec<u8>,
    pub external: Option<Uuid>,
}

impl Record for Sample {
    fn describe() -> Result<RecordDescriptor, TideError> {
        Ok(RecordDescriptor::new()
            .table(TableTag::new("sample")?)
            .column("id", ColumnTag::builder(DataType::Guid).primary_key().build()?)
            .column("flag", ColumnTag::builder(DataType::Boolean).build()?)
            .column("small", ColumnTag::builder(DataType::TinyInt).build()?)
            .column("count", ColumnTag::builder(DataType::Int).build()?)
            .column("total", ColumnTag::builder(DataType::Long).build()?)
            .column(
                "price",
                ColumnTag::builder(DataType::Decimal).max_length(14).precision(2).build()?,
            )
            .column(
                "ratio",
                ColumnTag::builder(DataType::Double).max_length(18).precision(6).build()?,
            )
            .column("label", ColumnTag::builder(DataType::Varchar).max_length(32).build()?)
            .column(
                "note",
                ColumnTag::builder(DataType::Nvarchar).max_length(200).nullable().build()?,
            )
            .column("status", ColumnTag::builder(DataType::Enum).max_length(16).build()?)
            .column("level", ColumnTag::builder(DataType::Int).nullable().build()?)
            .column("created", ColumnTag::builder(DataType::DateTime).build()?)
            .column("seen", ColumnTag::builder(DataType::DateTimeOffset).nullable().build()?)
            .column("payload", ColumnTag::builder(DataType::Blob).build()?)
            .column("external", ColumnTag::builder(DataType::Guid).nullable().build()?))
    }

    tidemark::record_accessors!(
        id, flag, small, count, total, price, ratio, label, note, status, level, created, seen,
        payload, external,
    );
}
