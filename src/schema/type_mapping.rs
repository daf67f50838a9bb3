//! Type mapping from [`DataType`] to SeaQuery `ColumnDef` types.

use super::data_type::DataType;
use super::definition::ColumnDefinition;
use sea_query::ColumnDef;

/// Default length used when a character column reaches here without one.
const DEFAULT_STRING_LEN: u32 = 255;

/// Apply the column's storage type to a SeaQuery `ColumnDef`.
///
/// - Varchar / Nvarchar / Enum → `.string_len(max_length)`
/// - TinyInt → `.tiny_unsigned()`
/// - Int → `.integer()`, Long → `.big_integer()`
/// - Boolean → `.boolean()`
/// - Decimal → `.decimal_len(max_length, precision)`, Double → `.double()`
/// - DateTime → `.date_time()`, DateTimeOffset → `.timestamp_with_time_zone()`
/// - Blob → `.binary()`, Guid → `.uuid()`
pub(crate) fn apply_column_type(column: &ColumnDefinition, def: &mut ColumnDef) {
    match column.data_type {
        DataType::Varchar | DataType::Nvarchar | DataType::Enum => {
            def.string_len(column.max_length.unwrap_or(DEFAULT_STRING_LEN));
        }
        DataType::TinyInt => {
            def.tiny_unsigned();
        }
        DataType::Int => {
            def.integer();
        }
        DataType::Long => {
            def.big_integer();
        }
        DataType::Boolean => {
            def.boolean();
        }
        DataType::Decimal => match (column.max_length, column.precision) {
            (Some(len), Some(prec)) => {
                def.decimal_len(len, prec);
            }
            _ => {
                def.decimal();
            }
        },
        DataType::Double => {
            def.double();
        }
        DataType::DateTime => {
            def.date_time();
        }
        DataType::DateTimeOffset => {
            def.timestamp_with_time_zone();
        }
        DataType::Blob => {
            def.binary();
        }
        DataType::Guid => {
            def.uuid();
        }
    }
}
