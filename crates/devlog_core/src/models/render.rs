//! JSON rendering of PostgreSQL binary values.
//!
//! [`value_to_json`] covers the scalar types the browser needs structured,
//! arrays of them at any depth, enums and domains over them. Anything else
//! returns `None` and is rendered from the server's text output instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value as JsonValue};
use std::fmt::Write as _;
use tokio_postgres::types::{FromSql, Kind, Type};
use uuid::Uuid;

use super::value::{base_type, numeric_to_string};

/// Render one non-null value, or `None` when the type has no client-side form.
pub fn value_to_json(ty: &Type, raw: &[u8]) -> Option<JsonValue> {
    let ty = base_type(ty);
    match ty.kind() {
        Kind::Array(member) => return array_to_json(member, raw),
        // Enum labels travel as plain UTF-8.
        Kind::Enum(_) => return std::str::from_utf8(raw).ok().map(JsonValue::from),
        _ => {}
    }

    let value = match *ty {
        Type::BOOL => JsonValue::Bool(decode(ty, raw)?),
        Type::INT2 => JsonValue::from(decode::<i16>(ty, raw)?),
        Type::INT4 => JsonValue::from(decode::<i32>(ty, raw)?),
        // Strings past 2^53 would lose digits as JSON numbers.
        Type::INT8 => JsonValue::String(decode::<i64>(ty, raw)?.to_string()),
        Type::OID => JsonValue::from(decode::<u32>(ty, raw)?),
        Type::FLOAT4 => float_to_json(f64::from(decode::<f32>(ty, raw)?)),
        Type::FLOAT8 => float_to_json(decode(ty, raw)?),
        Type::NUMERIC => JsonValue::String(numeric_to_string(raw)?),
        Type::UUID => JsonValue::String(decode::<Uuid>(ty, raw)?.to_string()),
        Type::JSON | Type::JSONB => decode::<JsonValue>(ty, raw)?,
        Type::TIMESTAMPTZ => JsonValue::String(decode::<DateTime<Utc>>(ty, raw)?.to_rfc3339()),
        Type::TIMESTAMP => JsonValue::String(decode::<NaiveDateTime>(ty, raw)?.to_string()),
        Type::DATE => JsonValue::String(decode::<NaiveDate>(ty, raw)?.to_string()),
        Type::TIME => JsonValue::String(decode::<NaiveTime>(ty, raw)?.to_string()),
        Type::BYTEA => JsonValue::String(bytea_hex(raw)),
        _ if <&str as FromSql>::accepts(ty) => JsonValue::from(decode::<&str>(ty, raw)?),
        _ => return None,
    };
    Some(value)
}

/// Last-resort rendering of bytes nobody could interpret.
pub fn opaque_to_json(raw: &[u8]) -> JsonValue {
    match std::str::from_utf8(raw) {
        Ok(text) => JsonValue::from(text),
        Err(_) => JsonValue::String(bytea_hex(raw)),
    }
}

fn decode<'a, T: FromSql<'a>>(ty: &Type, raw: &'a [u8]) -> Option<T> {
    T::from_sql(ty, raw).ok()
}

/// NaN and the infinities have no JSON number form.
fn float_to_json(v: f64) -> JsonValue {
    match Number::from_f64(v) {
        Some(n) => JsonValue::Number(n),
        None if v.is_nan() => JsonValue::from("NaN"),
        None if v > 0.0 => JsonValue::from("Infinity"),
        None => JsonValue::from("-Infinity"),
    }
}

/// Render bytea the way PostgreSQL's `hex` output format does.
fn bytea_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}

/// Decode the binary array format into nested JSON arrays.
///
/// Layout: ndim, flags, element oid, `ndim` (length, lower bound) pairs, then
/// each element as a length-prefixed value (length -1 for NULL).
fn array_to_json(member: &Type, raw: &[u8]) -> Option<JsonValue> {
    let mut buf = raw;
    let ndim = take_i32(&mut buf)?;
    let _flags = take_i32(&mut buf)?;
    let _element_oid = take_i32(&mut buf)?;

    let mut dims = Vec::with_capacity(usize::try_from(ndim).ok()?);
    for _ in 0..ndim {
        dims.push(usize::try_from(take_i32(&mut buf)?).ok()?);
        let _lower_bound = take_i32(&mut buf)?;
    }

    let total: usize = if dims.is_empty() { 0 } else { dims.iter().product() };
    let mut elements = Vec::with_capacity(total);
    for _ in 0..total {
        let len = take_i32(&mut buf)?;
        if len < 0 {
            elements.push(JsonValue::Null);
            continue;
        }
        let len = len as usize;
        let value = buf.get(..len)?;
        buf = &buf[len..];
        elements.push(value_to_json(member, value)?);
    }

    if !buf.is_empty() {
        return None;
    }
    Some(nest(&dims, &mut elements.into_iter()))
}

fn nest<I: Iterator<Item = JsonValue>>(dims: &[usize], elements: &mut I) -> JsonValue {
    match dims {
        [] => JsonValue::Array(Vec::new()),
        [len] => JsonValue::Array(elements.by_ref().take(*len).collect()),
        [len, inner @ ..] => JsonValue::Array((0..*len).map(|_| nest(inner, elements)).collect()),
    }
}

fn take_i32(buf: &mut &[u8]) -> Option<i32> {
    let (head, rest) = buf.split_first_chunk::<4>()?;
    *buf = rest;
    Some(i32::from_be_bytes(*head))
}
