use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use serde::Serialize;

use super::SourceRecord;
use crate::schema::{SqlType, TableSchema};

/// One typed value ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Real(f64),
    Text(String),
    Null,
}

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            CellValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            CellValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// How a raw field became its stored value.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Parsed(CellValue),
    /// Field present but blank after trimming.
    DefaultedOnEmpty(CellValue),
    /// Field present but not a usable number.
    DefaultedOnError(CellValue),
    /// Header declared the column but the record has no such field.
    Absent(CellValue),
}

impl Conversion {
    pub fn value(&self) -> &CellValue {
        match self {
            Conversion::Parsed(v)
            | Conversion::DefaultedOnEmpty(v)
            | Conversion::DefaultedOnError(v)
            | Conversion::Absent(v) => v,
        }
    }

    pub fn into_value(self) -> CellValue {
        match self {
            Conversion::Parsed(v)
            | Conversion::DefaultedOnEmpty(v)
            | Conversion::DefaultedOnError(v)
            | Conversion::Absent(v) => v,
        }
    }
}

/// Knobs for the degrade-instead-of-fail rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionPolicy {
    pub integer_default: i64,
}

impl Default for ConversionPolicy {
    fn default() -> Self {
        Self { integer_default: 0 }
    }
}

/// Per-outcome tallies over a whole load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    pub parsed: u64,
    pub defaulted_on_empty: u64,
    pub defaulted_on_error: u64,
    pub absent: u64,
}

impl ConversionStats {
    pub fn record(&mut self, c: &Conversion) {
        match c {
            Conversion::Parsed(_) => self.parsed += 1,
            Conversion::DefaultedOnEmpty(_) => self.defaulted_on_empty += 1,
            Conversion::DefaultedOnError(_) => self.defaulted_on_error += 1,
            Conversion::Absent(_) => self.absent += 1,
        }
    }
}

/// Convert a single raw field. `None` means the field was missing entirely.
pub fn convert_field(ty: SqlType, raw: Option<&str>, policy: &ConversionPolicy) -> Conversion {
    let default_int = CellValue::Integer(policy.integer_default);

    let Some(raw) = raw else {
        return match ty {
            SqlType::Integer => Conversion::Absent(default_int),
            SqlType::Real | SqlType::Text => Conversion::Absent(CellValue::Null),
        };
    };
    let v = raw.trim();

    match ty {
        SqlType::Text => Conversion::Parsed(CellValue::Text(v.to_string())),
        SqlType::Integer => {
            if v.is_empty() {
                return Conversion::DefaultedOnEmpty(default_int);
            }
            // "1200.00" style values go through f64 and truncate toward zero
            match parse_finite(v).map(f64::trunc) {
                Some(f) if (I64_LOWER..I64_UPPER).contains(&f) => {
                    Conversion::Parsed(CellValue::Integer(f as i64))
                }
                _ => Conversion::DefaultedOnError(default_int),
            }
        }
        SqlType::Real => {
            if v.is_empty() {
                return Conversion::DefaultedOnEmpty(CellValue::Null);
            }
            match parse_finite(v) {
                Some(f) => Conversion::Parsed(CellValue::Real(f)),
                None => Conversion::DefaultedOnError(CellValue::Null),
            }
        }
    }
}

// -2^63 and 2^63 are exact in f64; the upper bound itself is out of range.
const I64_LOWER: f64 = -9_223_372_036_854_775_808.0;
const I64_UPPER: f64 = 9_223_372_036_854_775_808.0;

fn parse_finite(v: &str) -> Option<f64> {
    v.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Convert a record into one value per schema column, in schema order.
pub fn convert_record(
    schema: &TableSchema,
    record: &SourceRecord,
    policy: &ConversionPolicy,
) -> Vec<Conversion> {
    schema
        .columns
        .iter()
        .map(|col| convert_field(col.ty, record.get(&col.name), policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    const P: ConversionPolicy = ConversionPolicy { integer_default: 0 };

    #[test]
    fn integer_truncates_decimal_text() {
        assert_eq!(
            convert_field(SqlType::Integer, Some("1200.00"), &P),
            Conversion::Parsed(CellValue::Integer(1200))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some(" 99.9 "), &P),
            Conversion::Parsed(CellValue::Integer(99))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some("-3.7"), &P),
            Conversion::Parsed(CellValue::Integer(-3))
        );
    }

    #[test]
    fn integer_defaults_on_empty_and_garbage() {
        assert_eq!(
            convert_field(SqlType::Integer, Some("   "), &P),
            Conversion::DefaultedOnEmpty(CellValue::Integer(0))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some("n/a"), &P),
            Conversion::DefaultedOnError(CellValue::Integer(0))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some("1,200"), &P),
            Conversion::DefaultedOnError(CellValue::Integer(0))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some("NaN"), &P),
            Conversion::DefaultedOnError(CellValue::Integer(0))
        );
        let custom = ConversionPolicy { integer_default: -1 };
        assert_eq!(
            convert_field(SqlType::Integer, None, &custom),
            Conversion::Absent(CellValue::Integer(-1))
        );
    }

    #[test]
    fn integer_out_of_range_is_an_error_not_a_clamp() {
        for raw in ["1e20", "-1e20", "9223372036854775808"] {
            assert_eq!(
                convert_field(SqlType::Integer, Some(raw), &P),
                Conversion::DefaultedOnError(CellValue::Integer(0)),
                "{raw}"
            );
        }
        assert_eq!(
            convert_field(SqlType::Integer, Some("-9223372036854775808"), &P),
            Conversion::Parsed(CellValue::Integer(i64::MIN))
        );
        assert_eq!(
            convert_field(SqlType::Integer, Some("1e15"), &P),
            Conversion::Parsed(CellValue::Integer(1_000_000_000_000_000))
        );
    }

    #[test]
    fn real_keeps_null_distinct_from_zero() {
        assert_eq!(
            convert_field(SqlType::Real, Some("0.755"), &P),
            Conversion::Parsed(CellValue::Real(0.755))
        );
        assert_eq!(
            convert_field(SqlType::Real, Some("0"), &P),
            Conversion::Parsed(CellValue::Real(0.0))
        );
        assert_eq!(
            convert_field(SqlType::Real, Some(""), &P),
            Conversion::DefaultedOnEmpty(CellValue::Null)
        );
        assert_eq!(
            convert_field(SqlType::Real, Some("75%"), &P),
            Conversion::DefaultedOnError(CellValue::Null)
        );
        assert_eq!(
            convert_field(SqlType::Real, None, &P),
            Conversion::Absent(CellValue::Null)
        );
    }

    #[test]
    fn text_trims_but_keeps_empty() {
        assert_eq!(
            convert_field(SqlType::Text, Some("  골조공사 "), &P),
            Conversion::Parsed(CellValue::Text("골조공사".into()))
        );
        assert_eq!(
            convert_field(SqlType::Text, Some(""), &P).into_value(),
            CellValue::Text(String::new())
        );
        assert_eq!(
            convert_field(SqlType::Text, None, &P),
            Conversion::Absent(CellValue::Null)
        );
    }

    #[test]
    fn record_follows_schema_order_with_missing_keys() {
        let schema = TableSchema {
            table: "evms".into(),
            columns: vec![
                ColumnDef { name: "id".into(), ty: SqlType::Text },
                ColumnDef { name: "cost".into(), ty: SqlType::Integer },
                ColumnDef { name: "progress".into(), ty: SqlType::Real },
            ],
        };
        let record = SourceRecord::from_pairs([("cost", "200"), ("id", "2")]);
        let values: Vec<CellValue> = convert_record(&schema, &record, &P)
            .into_iter()
            .map(Conversion::into_value)
            .collect();
        assert_eq!(
            values,
            vec![
                CellValue::Text("2".into()),
                CellValue::Integer(200),
                CellValue::Null,
            ]
        );
    }

    #[test]
    fn stats_count_each_outcome() {
        let mut stats = ConversionStats::default();
        for c in [
            convert_field(SqlType::Integer, Some("1"), &P),
            convert_field(SqlType::Integer, Some(""), &P),
            convert_field(SqlType::Real, Some("x"), &P),
            convert_field(SqlType::Text, None, &P),
            convert_field(SqlType::Text, Some("a"), &P),
        ] {
            stats.record(&c);
        }
        assert_eq!(
            stats,
            ConversionStats {
                parsed: 2,
                defaulted_on_empty: 1,
                defaulted_on_error: 1,
                absent: 1,
            }
        );
    }
}
