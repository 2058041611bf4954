//! Schema-agnostic row values used by the transfer engine.
//!
//! A [`SqlValue`] keeps a column value exactly as the source server sent it
//! (binary wire format plus its type), so it can be replayed as a parameter
//! into the destination without knowing the column type at compile time.

use bytes::BytesMut;
use std::error::Error;
use std::fmt::Write as _;
use tokio_postgres::types::{to_sql_checked, FromSql, IsNull, Kind, ToSql, Type};

use super::query::ColumnInfo;

/// A single column value in its original wire encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// SQL NULL
    Null,
    /// Binary-encoded value tagged with the source column type
    Raw {
        /// Type reported by the source server
        ty: Type,
        /// Binary wire representation
        bytes: Vec<u8>,
    },
}

impl SqlValue {
    /// The value as text, for values read through a `::text` cast.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Raw { bytes, .. } => Some(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Strip domains down to the type their values are encoded as.
pub fn base_type(ty: &Type) -> &Type {
    let mut ty = ty;
    while let Kind::Domain(base) = ty.kind() {
        ty = base;
    }
    ty
}

impl<'a> FromSql<'a> for SqlValue {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self::Raw { ty: ty.clone(), bytes: raw.to_vec() })
    }

    fn from_sql_null(_: &Type) -> Result<Self, Box<dyn Error + Sync + Send>> {
        Ok(Self::Null)
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        match self {
            Self::Null => Ok(IsNull::Yes),
            Self::Raw { ty: source, bytes } => {
                // OIDs of user-defined types differ between servers; names do not.
                let (from, to) = (base_type(source), base_type(ty));
                if from.name() != to.name() {
                    return Err(format!("cannot write {} value into {} column", from.name(), ty.name())
                        .into());
                }
                out.extend_from_slice(bytes);
                Ok(IsNull::No)
            }
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

/// A fully materialized table: one column descriptor shared by every row.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    /// Columns in select order
    pub columns: Vec<ColumnInfo>,
    /// Row values, each with exactly `columns.len()` entries
    pub rows: Vec<Vec<SqlValue>>,
}

impl RowSet {
    /// Decode driver rows against a column descriptor.
    pub fn from_rows(
        columns: Vec<ColumnInfo>,
        rows: &[tokio_postgres::Row],
    ) -> Result<Self, tokio_postgres::Error> {
        let rows = rows
            .iter()
            .map(|row| (0..row.len()).map(|i| row.try_get::<_, SqlValue>(i)).collect())
            .collect::<Result<Vec<Vec<SqlValue>>, _>>()?;
        Ok(Self { columns, rows })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Borrow one row as a parameter list for `execute`.
    pub fn params(&self, index: usize) -> Vec<&(dyn ToSql + Sync)> {
        self.rows[index].iter().map(|v| v as &(dyn ToSql + Sync)).collect()
    }
}

/// Decode a binary NUMERIC value into its canonical decimal text.
///
/// Returns `None` for malformed input.
pub fn numeric_to_string(raw: &[u8]) -> Option<String> {
    let word = |at: usize| raw.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));

    let ndigits = word(0)? as usize;
    let weight = word(2)? as i16 as i32;
    let sign = word(4)?;
    let dscale = word(6)? as usize;
    let digits = (0..ndigits).map(|i| word(8 + i * 2)).collect::<Option<Vec<u16>>>()?;

    let mut out = String::new();
    match sign {
        0x0000 => {}
        0x4000 => out.push('-'),
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => return None,
    }

    // Base-10000 digit groups; index `weight` holds the units group.
    if weight < 0 {
        out.push('0');
    } else {
        for idx in 0..=weight as usize {
            let group = digits.get(idx).copied().unwrap_or(0);
            if idx == 0 {
                let _ = write!(out, "{group}");
            } else {
                let _ = write!(out, "{group:04}");
            }
        }
    }

    if dscale > 0 {
        let mut frac = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while frac.len() < dscale {
            let group = if idx < 0 { 0 } else { digits.get(idx as usize).copied().unwrap_or(0) };
            let _ = write!(frac, "{group:04}");
            idx += 1;
        }
        frac.truncate(dscale);
        out.push('.');
        out.push_str(&frac);
    }

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_value_written_verbatim() {
        let value = SqlValue::from_sql(&Type::INT4, &[0, 0, 0, 42]).unwrap();
        let mut out = BytesMut::new();
        let is_null = value.to_sql(&Type::INT4, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::No));
        assert_eq!(&out[..], &[0, 0, 0, 42]);
    }

    #[test]
    fn test_null_value() {
        let value = SqlValue::from_sql_null(&Type::TEXT).unwrap();
        assert_eq!(value, SqlValue::Null);

        let mut out = BytesMut::new();
        let is_null = value.to_sql(&Type::INT8, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let value = SqlValue::Raw { ty: Type::INT4, bytes: vec![0, 0, 0, 1] };
        let mut out = BytesMut::new();
        let err = value.to_sql(&Type::INT8, &mut out).err().expect("expected type mismatch error");
        assert_eq!(err.to_string(), "cannot write int4 value into int8 column");
        assert!(out.is_empty());
    }

    #[test]
    fn test_domain_takes_base_type_bytes() {
        let email = Type::new("email_t".into(), 91_000, Kind::Domain(Type::TEXT), "public".into());
        let value = SqlValue::Raw { ty: Type::TEXT, bytes: b"a@b.c".to_vec() };
        let mut out = BytesMut::new();
        value.to_sql(&email, &mut out).unwrap();
        assert_eq!(&out[..], b"a@b.c");

        let err = SqlValue::Raw { ty: Type::INT4, bytes: vec![0, 0, 0, 1] }
            .to_sql(&email, &mut BytesMut::new())
            .err().expect("expected type mismatch error");
        assert_eq!(err.to_string(), "cannot write int4 value into email_t column");
    }

    #[test]
    fn test_as_text() {
        assert_eq!(SqlValue::Raw { ty: Type::TEXT, bytes: b"42".to_vec() }.as_text().as_deref(), Some("42"));
        assert_eq!(SqlValue::Null.as_text(), None);
    }

    #[test]
    fn test_base_type() {
        let inner = Type::new("short_email".into(), 91_001, Kind::Domain(Type::VARCHAR), "public".into());
        let outer = Type::new("work_email".into(), 91_002, Kind::Domain(inner), "public".into());
        assert_eq!(base_type(&outer), &Type::VARCHAR);
        assert_eq!(base_type(&Type::INT4), &Type::INT4);
    }

    #[test]
    fn test_accepts_every_type() {
        assert!(<SqlValue as FromSql>::accepts(&Type::JSONB));
        assert!(<SqlValue as ToSql>::accepts(&Type::TEXT_ARRAY));
    }

    #[test]
    fn test_row_set_params() {
        let set = RowSet {
            columns: vec![
                ColumnInfo { name: "id".into(), type_oid: Type::INT4.oid(), type_name: "int4".into() },
                ColumnInfo { name: "note".into(), type_oid: Type::TEXT.oid(), type_name: "text".into() },
            ],
            rows: vec![vec![SqlValue::Raw { ty: Type::INT4, bytes: vec![0, 0, 0, 7] }, SqlValue::Null]],
        };
        assert_eq!(set.len(), 1);
        assert_eq!(set.column_names(), vec!["id", "note"]);
        assert_eq!(set.params(0).len(), 2);
    }

    fn numeric(ndigits: u16, weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        for word in [ndigits, weight as u16, sign, dscale] {
            raw.extend_from_slice(&word.to_be_bytes());
        }
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_numeric_to_string() {
        assert_eq!(numeric_to_string(&numeric(2, 0, 0, 2, &[123, 4500])).as_deref(), Some("123.45"));
        assert_eq!(numeric_to_string(&numeric(1, -1, 0, 2, &[500])).as_deref(), Some("0.05"));
        assert_eq!(numeric_to_string(&numeric(1, -2, 0, 5, &[1000])).as_deref(), Some("0.00001"));
        assert_eq!(numeric_to_string(&numeric(1, 1, 0, 0, &[1])).as_deref(), Some("10000"));
        assert_eq!(numeric_to_string(&numeric(0, 0, 0, 0, &[])).as_deref(), Some("0"));
        assert_eq!(numeric_to_string(&numeric(1, 0, 0x4000, 1, &[7])).as_deref(), Some("-7.0"));
        assert_eq!(numeric_to_string(&numeric(0, 0, 0xC000, 0, &[])).as_deref(), Some("NaN"));
    }

    #[test]
    fn test_numeric_malformed() {
        assert_eq!(numeric_to_string(&[0, 1]), None);
        // Declares two digit groups but carries one.
        assert_eq!(numeric_to_string(&numeric(2, 0, 0, 0, &[1])), None);
    }
}
