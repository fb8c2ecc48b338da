// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Typed single values: partition values and column bounds.
//!
//! Bounds are stored in manifests using the
//! [binary single-value serialization](https://iceberg.apache.org/spec/#binary-single-value-serialization):
//! little-endian for fixed-width numbers, raw UTF-8 for strings, big-endian
//! for uuids and minimal two's-complement big-endian for decimals. No length
//! prefix is written; the field type decides how bytes are read back.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta};
use ordered_float::OrderedFloat;
use uuid::Uuid;

use super::datatypes::{PrimitiveType, MAX_DECIMAL_PRECISION};
use crate::{Error, ErrorKind, Result};

const MICROS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000;

/// Values present in iceberg type
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveLiteral {
    /// 0x00 for false, non-zero byte for true
    Boolean(bool),
    /// Stored as 4-byte little-endian
    Int(i32),
    /// Stored as 8-byte little-endian
    Long(i64),
    /// Stored as 4-byte little-endian
    Float(OrderedFloat<f32>),
    /// Stored as 8-byte little-endian
    Double(OrderedFloat<f64>),
    /// UTF-8 bytes (without length)
    String(String),
    /// Binary value (without length)
    Binary(Vec<u8>),
    /// Stored as 16-byte little-endian
    Int128(i128),
    /// Stored as 16-byte little-endian
    UInt128(u128),
}

/// Literal associated with its type. The value and type pair is checked
/// when construction, so the type and value is guaranteed to be correct.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Datum {
    r#type: PrimitiveType,
    literal: PrimitiveLiteral,
}

impl PartialOrd for Datum {
    /// Type-aware ordering. Values of different types are not comparable;
    /// floats order NaN above every number.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.r#type != other.r#type {
            return None;
        }
        match (&self.literal, &other.literal) {
            (PrimitiveLiteral::Boolean(a), PrimitiveLiteral::Boolean(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Int(a), PrimitiveLiteral::Int(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Long(a), PrimitiveLiteral::Long(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Float(a), PrimitiveLiteral::Float(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Double(a), PrimitiveLiteral::Double(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::String(a), PrimitiveLiteral::String(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Binary(a), PrimitiveLiteral::Binary(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::Int128(a), PrimitiveLiteral::Int128(b)) => a.partial_cmp(b),
            (PrimitiveLiteral::UInt128(a), PrimitiveLiteral::UInt128(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl Display for Datum {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.r#type, &self.literal) {
            (_, PrimitiveLiteral::Boolean(val)) => write!(f, "{val}"),
            (PrimitiveType::Date, PrimitiveLiteral::Int(val)) => {
                match unix_epoch_day().checked_add_signed(TimeDelta::days(*val as i64)) {
                    Some(day) => write!(f, "{day}"),
                    None => write!(f, "{val}"),
                }
            }
            (_, PrimitiveLiteral::Int(val)) => write!(f, "{val}"),
            (PrimitiveType::Time, PrimitiveLiteral::Long(val)) => {
                let secs = u32::try_from(val.div_euclid(1_000_000)).ok();
                let nanos = u32::try_from(val.rem_euclid(1_000_000) * 1000).ok();
                let time = secs.zip(nanos).and_then(|(secs, nanos)| {
                    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                });
                match time {
                    Some(time) => write!(f, "{time}"),
                    None => write!(f, "{val}"),
                }
            }
            (PrimitiveType::Timestamp, PrimitiveLiteral::Long(val)) => {
                match DateTime::from_timestamp_micros(*val) {
                    Some(ts) => write!(f, "{}", ts.naive_utc()),
                    None => write!(f, "{val}"),
                }
            }
            (PrimitiveType::Timestamptz, PrimitiveLiteral::Long(val)) => {
                match DateTime::from_timestamp_micros(*val) {
                    Some(ts) => write!(f, "{ts}"),
                    None => write!(f, "{val}"),
                }
            }
            (_, PrimitiveLiteral::Long(val)) => write!(f, "{val}"),
            (_, PrimitiveLiteral::Float(val)) => write!(f, "{val}"),
            (_, PrimitiveLiteral::Double(val)) => write!(f, "{val}"),
            (_, PrimitiveLiteral::String(val)) => write!(f, r#""{val}""#),
            (PrimitiveType::Uuid, PrimitiveLiteral::UInt128(val)) => {
                write!(f, "{}", Uuid::from_u128(*val))
            }
            (_, PrimitiveLiteral::UInt128(val)) => write!(f, "{val}"),
            (PrimitiveType::Decimal { scale, .. }, PrimitiveLiteral::Int128(val)) => {
                write_decimal(f, *val, *scale)
            }
            (_, PrimitiveLiteral::Int128(val)) => write!(f, "{val}"),
            (_, PrimitiveLiteral::Binary(val)) => {
                for byte in val {
                    write!(f, "{byte:02X}")?;
                }
                Ok(())
            }
        }
    }
}

fn unix_epoch_day() -> NaiveDate {
    NaiveDate::default()
}

fn check_time_of_day(value: i64) -> Result<()> {
    if !(0..MICROS_PER_DAY).contains(&value) {
        return Err(Error::new(
            ErrorKind::DataInvalid,
            format!("Time of day in microseconds must be in [0, {MICROS_PER_DAY}), got {value}"),
        ));
    }
    Ok(())
}

fn write_decimal(f: &mut Formatter<'_>, unscaled: i128, scale: u32) -> std::fmt::Result {
    if scale == 0 {
        return write!(f, "{unscaled}");
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let digits = unscaled.unsigned_abs().to_string();
    let scale = scale as usize;
    if digits.len() > scale {
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        write!(f, "{sign}{int_part}.{frac_part}")
    } else {
        write!(f, "{sign}0.{digits:0>scale$}")
    }
}

impl Datum {
    /// Creates a `Datum` from a `PrimitiveType` and a `PrimitiveLiteral`,
    /// checking that they agree.
    pub fn new(r#type: PrimitiveType, literal: PrimitiveLiteral) -> Result<Self> {
        let valid = matches!(
            (&r#type, &literal),
            (PrimitiveType::Boolean, PrimitiveLiteral::Boolean(_))
                | (PrimitiveType::Int, PrimitiveLiteral::Int(_))
                | (PrimitiveType::Date, PrimitiveLiteral::Int(_))
                | (PrimitiveType::Long, PrimitiveLiteral::Long(_))
                | (PrimitiveType::Time, PrimitiveLiteral::Long(_))
                | (PrimitiveType::Timestamp, PrimitiveLiteral::Long(_))
                | (PrimitiveType::Timestamptz, PrimitiveLiteral::Long(_))
                | (PrimitiveType::Float, PrimitiveLiteral::Float(_))
                | (PrimitiveType::Double, PrimitiveLiteral::Double(_))
                | (PrimitiveType::String, PrimitiveLiteral::String(_))
                | (PrimitiveType::Binary, PrimitiveLiteral::Binary(_))
                | (PrimitiveType::Uuid, PrimitiveLiteral::UInt128(_))
                | (PrimitiveType::Decimal { .. }, PrimitiveLiteral::Int128(_))
        ) || matches!(
            (&r#type, &literal),
            (PrimitiveType::Fixed(size), PrimitiveLiteral::Binary(v)) if v.len() as u64 == *size
        );

        if !valid {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Literal {literal:?} is not a valid value of type {type}"),
            ));
        }
        if let (PrimitiveType::Time, PrimitiveLiteral::Long(micros)) = (&r#type, &literal) {
            check_time_of_day(*micros)?;
        }
        Ok(Self { r#type, literal })
    }

    /// Creates a boolean value.
    pub fn bool<T: Into<bool>>(t: T) -> Self {
        Self {
            r#type: PrimitiveType::Boolean,
            literal: PrimitiveLiteral::Boolean(t.into()),
        }
    }

    /// Creates an 32bit integer.
    pub fn int<T: Into<i32>>(t: T) -> Self {
        Self {
            r#type: PrimitiveType::Int,
            literal: PrimitiveLiteral::Int(t.into()),
        }
    }

    /// Creates an 64bit integer.
    pub fn long<T: Into<i64>>(t: T) -> Self {
        Self {
            r#type: PrimitiveType::Long,
            literal: PrimitiveLiteral::Long(t.into()),
        }
    }

    /// Creates an 32bit floating point number.
    pub fn float<T: Into<f32>>(t: T) -> Self {
        Self {
            r#type: PrimitiveType::Float,
            literal: PrimitiveLiteral::Float(OrderedFloat(t.into())),
        }
    }

    /// Creates an 64bit floating point number.
    pub fn double<T: Into<f64>>(t: T) -> Self {
        Self {
            r#type: PrimitiveType::Double,
            literal: PrimitiveLiteral::Double(OrderedFloat(t.into())),
        }
    }

    /// Creates date literal from number of days from unix epoch directly.
    pub fn date(days: i32) -> Self {
        Self {
            r#type: PrimitiveType::Date,
            literal: PrimitiveLiteral::Int(days),
        }
    }

    /// Creates a date literal from a calendar date.
    pub fn date_from_ymd(year: i32, month: u32, day: u32) -> Result<Self> {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("Invalid date: {year}-{month}-{day}"),
            )
        })?;
        let days = date.signed_duration_since(unix_epoch_day()).num_days();
        Ok(Self::date(i32::try_from(days)?))
    }

    /// Creates time literal in microseconds since midnight.
    ///
    /// Fails when the value is outside a single day.
    pub fn time_micros(value: i64) -> Result<Self> {
        check_time_of_day(value)?;
        Ok(Self {
            r#type: PrimitiveType::Time,
            literal: PrimitiveLiteral::Long(value),
        })
    }

    /// Creates a timestamp from unix epoch in microseconds.
    pub fn timestamp_micros(value: i64) -> Self {
        Self {
            r#type: PrimitiveType::Timestamp,
            literal: PrimitiveLiteral::Long(value),
        }
    }

    /// Creates a timestamp with timezone from unix epoch in microseconds.
    pub fn timestamptz_micros(value: i64) -> Self {
        Self {
            r#type: PrimitiveType::Timestamptz,
            literal: PrimitiveLiteral::Long(value),
        }
    }

    /// Creates a string literal.
    pub fn string<S: ToString>(s: S) -> Self {
        Self {
            r#type: PrimitiveType::String,
            literal: PrimitiveLiteral::String(s.to_string()),
        }
    }

    /// Creates uuid literal.
    pub fn uuid(uuid: Uuid) -> Self {
        Self {
            r#type: PrimitiveType::Uuid,
            literal: PrimitiveLiteral::UInt128(uuid.as_u128()),
        }
    }

    /// Creates a fixed literal from bytes.
    pub fn fixed<I: IntoIterator<Item = u8>>(input: I) -> Self {
        let value: Vec<u8> = input.into_iter().collect();
        Self {
            r#type: PrimitiveType::Fixed(value.len() as u64),
            literal: PrimitiveLiteral::Binary(value),
        }
    }

    /// Creates a binary literal from bytes.
    pub fn binary<I: IntoIterator<Item = u8>>(input: I) -> Self {
        Self {
            r#type: PrimitiveType::Binary,
            literal: PrimitiveLiteral::Binary(input.into_iter().collect()),
        }
    }

    /// Creates a decimal literal from its unscaled value.
    ///
    /// Fails when the unscaled value needs more digits than `precision`.
    pub fn decimal(unscaled: i128, precision: u32, scale: u32) -> Result<Self> {
        PrimitiveType::decimal_required_bytes(precision)?;
        if scale > precision {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Decimal scale {scale} exceeds precision {precision}"),
            ));
        }
        let limit = 10i128.pow(precision.min(MAX_DECIMAL_PRECISION));
        if unscaled.unsigned_abs() >= limit.unsigned_abs() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Decimal value {unscaled} does not fit precision {precision}"),
            ));
        }
        Ok(Self {
            r#type: PrimitiveType::Decimal { precision, scale },
            literal: PrimitiveLiteral::Int128(unscaled),
        })
    }

    /// Get the primitive literal from datum.
    pub fn literal(&self) -> &PrimitiveLiteral {
        &self.literal
    }

    /// Get the primitive type from datum.
    pub fn data_type(&self) -> &PrimitiveType {
        &self.r#type
    }

    /// Returns true if the value is a floating point NaN.
    pub fn is_nan(&self) -> bool {
        match self.literal {
            PrimitiveLiteral::Float(val) => val.is_nan(),
            PrimitiveLiteral::Double(val) => val.is_nan(),
            _ => false,
        }
    }

    /// Serialize to the binary single-value form.
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.literal {
            PrimitiveLiteral::Boolean(val) => vec![u8::from(*val)],
            PrimitiveLiteral::Int(val) => val.to_le_bytes().to_vec(),
            PrimitiveLiteral::Long(val) => val.to_le_bytes().to_vec(),
            PrimitiveLiteral::Float(val) => val.to_le_bytes().to_vec(),
            PrimitiveLiteral::Double(val) => val.to_le_bytes().to_vec(),
            PrimitiveLiteral::String(val) => val.as_bytes().to_vec(),
            PrimitiveLiteral::Binary(val) => val.clone(),
            PrimitiveLiteral::UInt128(val) => val.to_be_bytes().to_vec(),
            PrimitiveLiteral::Int128(val) => decimal_to_min_bytes(*val),
        }
    }

    /// Create a datum from its binary single-value form, as read from the
    /// bounds of a field of type `data_type`.
    ///
    /// 4-byte values are promoted when the type is `long` or `double`, which
    /// happens after an `int -> long` or `float -> double` schema change.
    pub fn try_from_bytes(bytes: &[u8], data_type: PrimitiveType) -> Result<Self> {
        let literal = match data_type {
            PrimitiveType::Boolean => match bytes {
                [b] => PrimitiveLiteral::Boolean(*b != 0),
                _ => return Err(length_mismatch(&data_type, "1", bytes.len())),
            },
            PrimitiveType::Int | PrimitiveType::Date => {
                PrimitiveLiteral::Int(i32::from_le_bytes(fixed_bytes(bytes, &data_type)?))
            }
            PrimitiveType::Long => match bytes.len() {
                4 => PrimitiveLiteral::Long(
                    i32::from_le_bytes(fixed_bytes(bytes, &data_type)?) as i64,
                ),
                _ => PrimitiveLiteral::Long(i64::from_le_bytes(fixed_bytes(bytes, &data_type)?)),
            },
            PrimitiveType::Time => {
                let micros = i64::from_le_bytes(fixed_bytes(bytes, &data_type)?);
                check_time_of_day(micros)?;
                PrimitiveLiteral::Long(micros)
            }
            PrimitiveType::Timestamp | PrimitiveType::Timestamptz => {
                PrimitiveLiteral::Long(i64::from_le_bytes(fixed_bytes(bytes, &data_type)?))
            }
            PrimitiveType::Float => PrimitiveLiteral::Float(OrderedFloat(f32::from_le_bytes(
                fixed_bytes(bytes, &data_type)?,
            ))),
            PrimitiveType::Double => match bytes.len() {
                4 => PrimitiveLiteral::Double(OrderedFloat(
                    f32::from_le_bytes(fixed_bytes(bytes, &data_type)?) as f64,
                )),
                _ => PrimitiveLiteral::Double(OrderedFloat(f64::from_le_bytes(fixed_bytes(
                    bytes, &data_type,
                )?))),
            },
            PrimitiveType::String => {
                PrimitiveLiteral::String(std::str::from_utf8(bytes)?.to_string())
            }
            PrimitiveType::Uuid => {
                PrimitiveLiteral::UInt128(u128::from_be_bytes(fixed_bytes(bytes, &data_type)?))
            }
            PrimitiveType::Fixed(size) => {
                if bytes.len() as u64 != size {
                    return Err(length_mismatch(&data_type, &size.to_string(), bytes.len()));
                }
                PrimitiveLiteral::Binary(bytes.to_vec())
            }
            PrimitiveType::Binary => PrimitiveLiteral::Binary(bytes.to_vec()),
            PrimitiveType::Decimal { precision, .. } => {
                let max_len = PrimitiveType::decimal_required_bytes(precision)? as usize;
                if bytes.is_empty() || bytes.len() > max_len {
                    return Err(length_mismatch(
                        &data_type,
                        &format!("1 to {max_len}"),
                        bytes.len(),
                    ));
                }
                PrimitiveLiteral::Int128(decimal_from_bytes(bytes))
            }
        };
        Ok(Self {
            r#type: data_type,
            literal,
        })
    }

    /// Create a datum from bytes that must have exactly the serialized
    /// length of `data_type`.
    ///
    /// Unlike [`Datum::try_from_bytes`], 4-byte values are rejected for
    /// `long` and `double`. Writers use this; the promotion only applies to
    /// bounds written before a schema change.
    pub fn try_from_exact_bytes(bytes: &[u8], data_type: PrimitiveType) -> Result<Self> {
        match data_type {
            PrimitiveType::Long | PrimitiveType::Double if bytes.len() != 8 => {
                Err(length_mismatch(&data_type, "8", bytes.len()))
            }
            _ => Self::try_from_bytes(bytes, data_type),
        }
    }
}

fn fixed_bytes<const N: usize>(bytes: &[u8], data_type: &PrimitiveType) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| length_mismatch(data_type, &N.to_string(), bytes.len()))
}

fn length_mismatch(data_type: &PrimitiveType, expected: &str, actual: usize) -> Error {
    Error::new(
        ErrorKind::DataInvalid,
        format!("Bound of type {data_type} must be {expected} bytes long, got {actual}"),
    )
}

/// Minimal big-endian two's-complement bytes of an unscaled decimal.
pub(crate) fn decimal_to_min_bytes(unscaled: i128) -> Vec<u8> {
    let bytes = unscaled.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let redundant = (bytes[start] == 0x00 && bytes[start + 1] & 0x80 == 0)
            || (bytes[start] == 0xFF && bytes[start + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

/// Sign-extends big-endian two's-complement bytes, at most 16 of them.
pub(crate) fn decimal_from_bytes(bytes: &[u8]) -> i128 {
    let fill = if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        0xFF
    } else {
        0x00
    };
    let mut buf = [fill; 16];
    let len = bytes.len().min(16);
    buf[16 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    i128::from_be_bytes(buf)
}

/// Data of a struct value, used for partition tuples.
///
/// Fields are positional and follow the partition spec; a `None` field is a
/// null partition value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Struct {
    fields: Vec<Option<Datum>>,
}

impl Struct {
    /// Create a empty struct.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a iterator to read the field in order of field_value.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Option<&Datum>> {
        self.fields.iter().map(Option::as_ref)
    }

    /// Value at position `index`, `None` for null or out of range.
    pub fn get(&self, index: usize) -> Option<&Datum> {
        self.fields.get(index).and_then(Option::as_ref)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the struct has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<Option<Datum>> for Struct {
    fn from_iter<I: IntoIterator<Item = Option<Datum>>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Struct {
    type Item = Option<Datum>;
    type IntoIter = std::vec::IntoIter<Option<Datum>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
