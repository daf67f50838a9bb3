//! In-process storage backend.
//!
//! Tables live in a `HashMap` behind one mutex. Filters are evaluated directly
//! against stored rows with SQL-like null semantics: a comparison involving null
//! is false, only `IS [NOT] NULL` looks at nulls.
//!
//! Integer primary keys are assigned on insert when the value map leaves them out
//! (auto-increment); GUID keys get a random v4 GUID in its 36-character form.

use super::StorageBackend;
use crate::error::TideError;
use crate::query::{Direction, Expression, LeftTerm, Operator, OrderBy, RightTerm};
use crate::schema::{ColumnDefinition, DataType};
use crate::value::timestamp::{DEFAULT_TIMESTAMP, DEFAULT_TIMESTAMP_OFFSET};
use crate::value::{Row, TimestampFormat, Value, ValueMap};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Debug)]
struct MemoryTable {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
    next_id: i64,
}

impl MemoryTable {
    fn resolve(&self, table: &str, column: &str) -> Result<&ColumnDefinition, TideError> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .or_else(|| self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(column)))
            .ok_or_else(|| TideError::backend(format!("no such column: {table}.{column}")))
    }

    fn primary_key(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.primary_key)
    }
}

/// Storage backend that keeps every table in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: Mutex<HashMap<String, MemoryTable>>,
}

type Tables = HashMap<String, MemoryTable>;

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, TideError> {
        self.tables
            .lock()
            .map_err(|e| TideError::Internal(format!("Failed to lock memory backend: {e}")))
    }

    fn with_table<T>(
        &self,
        table: &str,
        f: impl FnOnce(&mut MemoryTable) -> Result<T, TideError>,
    ) -> Result<T, TideError> {
        let mut tables = self.lock()?;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        f(entry)
    }

    /// Rows matching `filter`, as indices into `table.rows`.
    fn matching(
        &self,
        name: &str,
        table: &MemoryTable,
        filter: Option<&Expression>,
    ) -> Result<Vec<usize>, TideError> {
        let mut hits = Vec::new();
        for (idx, row) in table.rows.iter().enumerate() {
            let keep = match filter {
                Some(expr) => Evaluator { name, table, row, timestamps: self }.eval(expr)?,
                None => true,
            };
            if keep {
                hits.push(idx);
            }
        }
        Ok(hits)
    }
}

impl TimestampFormat for MemoryBackend {
    fn timestamp(&self, value: &NaiveDateTime) -> String {
        value.format(DEFAULT_TIMESTAMP).to_string()
    }

    fn timestamp_offset(&self, value: &DateTime<FixedOffset>) -> String {
        value.format(DEFAULT_TIMESTAMP_OFFSET).to_string()
    }
}

impl StorageBackend for MemoryBackend {
    fn create_table(&self, table: &str, columns: &[ColumnDefinition]) -> Result<(), TideError> {
        let mut tables = self.lock()?;
        if tables.contains_key(table) {
            return Err(TideError::backend(format!("table {table} already exists")));
        }
        tables.insert(
            table.to_string(),
            MemoryTable {
                columns: columns.to_vec(),
                rows: Vec::new(),
                next_id: 1,
            },
        );
        log::debug!("memory backend created table {table}");
        Ok(())
    }

    fn table_exists(&self, table: &str) -> Result<bool, TideError> {
        Ok(self.lock()?.contains_key(table))
    }

    fn describe_table(&self, table: &str) -> Result<Vec<ColumnDefinition>, TideError> {
        self.with_table(table, |t| Ok(t.columns.clone()))
    }

    fn insert(&self, table: &str, values: &ValueMap) -> Result<Row, TideError> {
        self.with_table(table, |t| {
            let mut row = Row::new();
            for column in &t.columns {
                row.insert(column.name.clone(), Value::Null);
            }
            for (name, value) in values {
                let column = t.resolve(table, name)?;
                row.insert(column.name.clone(), value.clone());
            }

            if let Some(pk) = t.primary_key().cloned() {
                let key = row.get(&pk.name).cloned().unwrap_or(Value::Null);
                let key = match (key, pk.data_type) {
                    (Value::Null, dt) if dt.is_integer() => Value::Integer(t.next_id),
                    (Value::Null, DataType::Guid) => Value::Text(Uuid::new_v4().to_string()),
                    (Value::Null, _) => {
                        return Err(TideError::backend(format!(
                            "primary key {table}.{} requires a value",
                            pk.name
                        )))
                    }
                    (key, _) => key,
                };
                let duplicate = t.rows.iter().any(|existing| {
                    existing
                        .get(&pk.name)
                        .and_then(|v| compare(v, &key, self))
                        .is_some_and(Ordering::is_eq)
                });
                if duplicate {
                    return Err(TideError::backend(format!(
                        "UNIQUE constraint failed: {table}.{} = {key}",
                        pk.name
                    )));
                }
                if let Value::Integer(id) = key {
                    t.next_id = t.next_id.max(id.saturating_add(1));
                }
                row.insert(pk.name.clone(), key);
            }

            check_not_null(table, &t.columns, &row)?;
            t.rows.push(row.clone());
            Ok(row)
        })
    }

    fn update(
        &self,
        table: &str,
        values: &ValueMap,
        filter: &Expression,
    ) -> Result<u64, TideError> {
        let mut tables = self.lock()?;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        let mut assignments = Vec::with_capacity(values.len());
        for (name, value) in values {
            assignments.push((t.resolve(table, name)?.name.clone(), value.clone()));
        }
        let hits = self.matching(table, t, Some(filter))?;
        // Check every row before touching any, so a failed update changes nothing
        let mut staged = Vec::with_capacity(hits.len());
        for &idx in &hits {
            let mut updated = t.rows[idx].clone();
            for (column, value) in &assignments {
                updated.insert(column.clone(), value.clone());
            }
            check_not_null(table, &t.columns, &updated)?;
            staged.push((idx, updated));
        }
        for (idx, updated) in staged {
            t.rows[idx] = updated;
        }
        Ok(hits.len() as u64)
    }

    fn delete(&self, table: &str, filter: &Expression) -> Result<u64, TideError> {
        let mut tables = self.lock()?;
        let t = tables
            .get_mut(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        let hits = self.matching(table, t, Some(filter))?;
        for &idx in hits.iter().rev() {
            t.rows.remove(idx);
        }
        Ok(hits.len() as u64)
    }

    fn select(
        &self,
        table: &str,
        skip: Option<usize>,
        limit: Option<usize>,
        filter: Option<&Expression>,
        order: &[OrderBy],
    ) -> Result<Vec<Row>, TideError> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        let mut sort_keys = Vec::with_capacity(order.len());
        for o in order {
            sort_keys.push((t.resolve(table, &o.column)?.name.clone(), o.direction));
        }

        let mut rows: Vec<&Row> = self
            .matching(table, t, filter)?
            .into_iter()
            .map(|idx| &t.rows[idx])
            .collect();
        if !sort_keys.is_empty() {
            rows.sort_by(|a, b| {
                sort_keys
                    .iter()
                    .map(|(column, direction)| {
                        let ord = sort_order(a.get(column), b.get(column), self);
                        match direction {
                            Direction::Asc => ord,
                            Direction::Desc => ord.reverse(),
                        }
                    })
                    .find(|ord| ord.is_ne())
                    .unwrap_or(Ordering::Equal)
            });
        }
        Ok(rows
            .into_iter()
            .skip(skip.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn count(&self, table: &str, filter: Option<&Expression>) -> Result<u64, TideError> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        Ok(self.matching(table, t, filter)?.len() as u64)
    }

    fn sum(
        &self,
        table: &str,
        column: &str,
        filter: Option<&Expression>,
    ) -> Result<Value, TideError> {
        let tables = self.lock()?;
        let t = tables
            .get(table)
            .ok_or_else(|| TideError::backend(format!("no such table: {table}")))?;
        let column = &t.resolve(table, column)?.name;
        let mut total = Sum::Empty;
        for idx in self.matching(table, t, filter)? {
            match t.rows[idx].get(column) {
                None | Some(Value::Null) => {}
                Some(value) => total = total.accumulate(value).ok_or_else(|| {
                    TideError::backend(format!("cannot sum {} value in {table}.{column}", value.kind()))
                })?,
            }
        }
        Ok(total.into_value())
    }

    fn query(&self, query: &str) -> Result<Vec<Row>, TideError> {
        Err(TideError::backend("raw queries are not supported by the memory backend").with_query(query))
    }
}

fn check_not_null(table: &str, columns: &[ColumnDefinition], row: &Row) -> Result<(), TideError> {
    for column in columns.iter().filter(|c| !c.nullable) {
        if row.get(&column.name).map_or(true, Value::is_null) {
            return Err(TideError::backend(format!(
                "NOT NULL constraint failed: {table}.{}",
                column.name
            )));
        }
    }
    Ok(())
}

/// Running total for `sum`, widening Integer → Decimal → Double as needed.
enum Sum {
    Empty,
    Integer(i64),
    Decimal(Decimal),
    Double(f64),
}

impl Sum {
    fn accumulate(self, value: &Value) -> Option<Sum> {
        let value = match value {
            Value::Integer(v) => Sum::Integer(*v),
            Value::Decimal(d) => Sum::Decimal(*d),
            Value::Double(v) => Sum::Double(*v),
            _ => return None,
        };
        Some(match (self, value) {
            (Sum::Empty, v) => v,
            (Sum::Integer(a), Sum::Integer(b)) => match a.checked_add(b) {
                Some(total) => Sum::Integer(total),
                None => Sum::Decimal(Decimal::from(a) + Decimal::from(b)),
            },
            (Sum::Double(a), other) | (other, Sum::Double(a)) => Sum::Double(a + other.as_f64()?),
            (a, b) => Sum::Decimal(a.as_decimal()?.checked_add(b.as_decimal()?)?),
        })
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Sum::Empty => Some(0.0),
            Sum::Integer(v) => Decimal::from(*v).to_f64(),
            Sum::Decimal(d) => d.to_f64(),
            Sum::Double(v) => Some(*v),
        }
    }

    fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Sum::Empty => Some(Decimal::ZERO),
            Sum::Integer(v) => Some(Decimal::from(*v)),
            Sum::Decimal(d) => Some(*d),
            Sum::Double(v) => Decimal::try_from(*v).ok(),
        }
    }

    fn into_value(self) -> Value {
        match self {
            Sum::Empty => Value::Null,
            Sum::Integer(v) => Value::Integer(v),
            Sum::Decimal(d) => Value::Decimal(d),
            Sum::Double(v) => Value::Double(v),
        }
    }
}

/// Pending work while evaluating a filter tree.
enum Step<'e> {
    Eval(&'e Expression),
    /// Left operand of an `And`/`Or` is on the result stack.
    Join(&'e Expression),
    /// Nested operands of a comparison are on the result stack.
    Compare(&'e Expression),
}

/// Evaluates one filter against one stored row.
///
/// Works off an explicit step stack, so filters folded from long lists do not
/// recurse. `And`/`Or` short-circuit.
struct Evaluator<'a> {
    name: &'a str,
    table: &'a MemoryTable,
    row: &'a Row,
    timestamps: &'a dyn TimestampFormat,
}

impl Evaluator<'_> {
    fn malformed(&self, expr: &Expression) -> TideError {
        TideError::backend(format!("malformed filter on {}: {expr}", self.name))
    }

    fn eval(&self, root: &Expression) -> Result<bool, TideError> {
        let mut steps = vec![Step::Eval(root)];
        let mut results: Vec<bool> = Vec::new();
        while let Some(step) = steps.pop() {
            match step {
                Step::Eval(expr) if expr.operator.is_logical() => {
                    let (LeftTerm::Expression(left), RightTerm::Expression(_)) =
                        (&expr.left, &expr.right)
                    else {
                        return Err(self.malformed(expr));
                    };
                    steps.push(Step::Join(expr));
                    steps.push(Step::Eval(left.as_ref()));
                }
                Step::Eval(expr) => {
                    steps.push(Step::Compare(expr));
                    if let RightTerm::Expression(right) = &expr.right {
                        steps.push(Step::Eval(right.as_ref()));
                    }
                    if let LeftTerm::Expression(left) = &expr.left {
                        steps.push(Step::Eval(left.as_ref()));
                    }
                }
                Step::Join(expr) => {
                    let left = results.pop().ok_or_else(|| self.malformed(expr))?;
                    match (expr.operator, left, &expr.right) {
                        (Operator::And, false, _) => results.push(false),
                        (Operator::Or, true, _) => results.push(true),
                        // The right operand decides
                        (_, _, RightTerm::Expression(right)) => steps.push(Step::Eval(right.as_ref())),
                        _ => return Err(self.malformed(expr)),
                    }
                }
                Step::Compare(expr) => {
                    let right = match &expr.right {
                        RightTerm::Expression(_) => {
                            Some(Value::Bool(results.pop().ok_or_else(|| self.malformed(expr))?))
                        }
                        _ => None,
                    };
                    let left = match &expr.left {
                        LeftTerm::Column(name) => {
                            let column = self.table.resolve(self.name, name)?;
                            self.row.get(&column.name).cloned().unwrap_or(Value::Null)
                        }
                        LeftTerm::Expression(_) => {
                            Value::Bool(results.pop().ok_or_else(|| self.malformed(expr))?)
                        }
                    };
                    results.push(self.compare_terms(expr, &left, right.as_ref())?);
                }
            }
        }
        match (results.pop(), results.is_empty()) {
            (Some(matched), true) => Ok(matched),
            _ => Err(self.malformed(root)),
        }
    }

    /// One non-logical node, with its nested operands already evaluated.
    fn compare_terms(
        &self,
        expr: &Expression,
        left: &Value,
        nested_right: Option<&Value>,
    ) -> Result<bool, TideError> {
        let op = expr.operator;
        Ok(match (op, &expr.right) {
            (Operator::IsNull, _) | (Operator::Equals, RightTerm::Null) => left.is_null(),
            (Operator::IsNotNull, _) | (Operator::NotEquals, RightTerm::Null) => !left.is_null(),
            (Operator::In, RightTerm::List(values)) => self.contained(left, values),
            (Operator::NotIn, RightTerm::List(values)) => {
                !left.is_null() && !self.contained(left, values)
            }
            (
                Operator::Contains | Operator::ContainsNot | Operator::StartsWith | Operator::EndsWith,
                RightTerm::Value(needle),
            ) => match (text_of(left), text_of(needle)) {
                (Some(hay), Some(needle)) => match op {
                    Operator::Contains => hay.contains(&needle),
                    Operator::ContainsNot => !hay.contains(&needle),
                    Operator::StartsWith => hay.starts_with(&needle),
                    _ => hay.ends_with(&needle),
                },
                _ => false,
            },
            (_, RightTerm::Value(value)) => self.test(op, left, value).ok_or_else(|| self.malformed(expr))?,
            (_, RightTerm::Expression(_)) => {
                let right = nested_right.ok_or_else(|| self.malformed(expr))?;
                self.test(op, left, right).ok_or_else(|| self.malformed(expr))?
            }
            _ => return Err(self.malformed(expr)),
        })
    }

    fn contained(&self, left: &Value, values: &[Value]) -> bool {
        values
            .iter()
            .any(|v| compare(left, v, self.timestamps).is_some_and(Ordering::is_eq))
    }

    /// `None` if `op` is not a binary comparison.
    fn test(&self, op: Operator, left: &Value, right: &Value) -> Option<bool> {
        let ord = compare(left, right, self.timestamps);
        Some(match op {
            Operator::Equals => ord.is_some_and(Ordering::is_eq),
            Operator::NotEquals => ord.is_some_and(Ordering::is_ne),
            Operator::GreaterThan => ord.is_some_and(Ordering::is_gt),
            Operator::GreaterThanOrEqual => ord.is_some_and(Ordering::is_ge),
            Operator::LessThan => ord.is_some_and(Ordering::is_lt),
            Operator::LessThanOrEqual => ord.is_some_and(Ordering::is_le),
            _ => return None,
        })
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Text(s) => Some(s.clone()),
        Value::Integer(v) => Some(v.to_string()),
        Value::Double(v) => Some(v.to_string()),
        Value::Decimal(d) => Some(d.to_string()),
        Value::Guid(g) => Some(g.to_string()),
        _ => None,
    }
}

/// Nulls sort first.
fn sort_order(a: Option<&Value>, b: Option<&Value>, timestamps: &dyn TimestampFormat) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => compare(a, b, timestamps).unwrap_or(Ordering::Equal),
    }
}

/// Compare two stored or literal values; `None` if either is null or the kinds
/// are incomparable.
///
/// Text compares against GUIDs and timestamps by parsing, since the write path
/// stores both as text.
fn compare(a: &Value, b: &Value, timestamps: &dyn TimestampFormat) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        (Value::Bytes(x), Value::Bytes(y)) => Some(x.cmp(y)),
        (Value::Guid(x), Value::Guid(y)) => Some(x.cmp(y)),
        (Value::Guid(x), Value::Text(s)) => Uuid::parse_str(s).ok().map(|y| x.cmp(&y)),
        (Value::Text(s), Value::Guid(y)) => Uuid::parse_str(s).ok().map(|x| x.cmp(y)),
        (Value::DateTime(x), Value::DateTime(y)) => Some(x.cmp(y)),
        (Value::DateTime(x), Value::Text(s)) => timestamps.parse_timestamp(s).map(|y| x.cmp(&y)),
        (Value::Text(s), Value::DateTime(y)) => timestamps.parse_timestamp(s).map(|x| x.cmp(y)),
        (Value::DateTimeOffset(x), Value::DateTimeOffset(y)) => Some(x.cmp(y)),
        (Value::DateTimeOffset(x), Value::Text(s)) => {
            timestamps.parse_timestamp_offset(s).map(|y| x.cmp(&y))
        }
        (Value::Text(s), Value::DateTimeOffset(y)) => {
            timestamps.parse_timestamp_offset(s).map(|x| x.cmp(y))
        }
        _ => compare_numeric(a, b),
    }
}

enum Number {
    Int(i64),
    Dec(Decimal),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Number> {
        match value {
            Value::Bool(b) => Some(Number::Int(i64::from(*b))),
            Value::Integer(v) => Some(Number::Int(*v)),
            Value::Decimal(d) => Some(Number::Dec(*d)),
            Value::Double(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    fn to_f64(&self) -> Option<f64> {
        match self {
            Number::Int(v) => Decimal::from(*v).to_f64(),
            Number::Dec(d) => d.to_f64(),
            Number::Float(v) => Some(*v),
        }
    }

    fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Number::Int(v) => Some(Decimal::from(*v)),
            Number::Dec(d) => Some(*d),
            Number::Float(v) => Decimal::try_from(*v).ok(),
        }
    }
}

fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    let (a, b) = (Number::of(a)?, Number::of(b)?);
    match (&a, &b) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(y)),
        (Number::Float(_), _) | (_, Number::Float(_)) => a.to_f64()?.partial_cmp(&b.to_f64()?),
        _ => Some(a.to_decimal()?.cmp(&b.to_decimal()?)),
    }
}
