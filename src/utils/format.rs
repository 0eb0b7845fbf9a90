// Serializers for the dashboard wire format: nulls render as "", dates as
// YYYY-MM-DD and quantities as plain JSON numbers.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serializer;

pub const ISO_DATE: &str = "%Y-%m-%d";

pub fn text<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(value.as_deref().unwrap_or(""))
}

pub fn date<S: Serializer>(value: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.collect_str(&d.format(ISO_DATE)),
        None => s.serialize_str(""),
    }
}

pub fn quantity<S: Serializer>(value: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    number(value, s)
}

pub fn opt_quantity<S: Serializer>(value: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => number(d, s),
        None => s.serialize_str(""),
    }
}

pub fn opt_int<S: Serializer>(value: &Option<i32>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => s.serialize_i32(*v),
        None => s.serialize_str(""),
    }
}

fn number<S: Serializer>(value: &Decimal, s: S) -> Result<S::Ok, S::Error> {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(whole) = normalized.to_i64() {
            return s.serialize_i64(whole);
        }
    }
    match normalized.to_f64() {
        Some(f) => s.serialize_f64(f),
        None => s.collect_str(&normalized),
    }
}

/// Human-facing date used by the returns view.
pub fn day_first(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format("%d/%m/%Y").to_string())
        .unwrap_or_default()
}
