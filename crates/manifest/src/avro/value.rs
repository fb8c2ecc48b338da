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

//! Conversions between avro values and manifest values.
//!
//! Every failure here is a [`ErrorKind::MalformedEntry`]: the value does not
//! have the shape its field declares.

use apache_avro::types::Value;
use apache_avro::Decimal;

use crate::spec::{Datum, PrimitiveLiteral, PrimitiveType, StatsMap};
use crate::{Error, ErrorKind, Result};

pub(crate) fn malformed(field: &str, expected: &str, value: &Value) -> Error {
    Error::new(
        ErrorKind::MalformedEntry,
        format!("Field '{field}' must be {expected}, got {value:?}"),
    )
}

/// Value of an optional field: `["null", T]` unions are encoded with the
/// null branch first.
pub(crate) fn optional(value: Option<Value>) -> Value {
    match value {
        Some(value) => Value::Union(1, Box::new(value)),
        None => Value::Union(0, Box::new(Value::Null)),
    }
}

/// Strip a union wrapper, mapping null to `None`.
pub(crate) fn unwrap_union(value: Value) -> Option<Value> {
    match value {
        Value::Union(_, inner) => unwrap_union(*inner),
        Value::Null => None,
        other => Some(other),
    }
}

pub(crate) fn to_bool(value: Value, field: &str) -> Result<bool> {
    match value {
        Value::Boolean(v) => Ok(v),
        other => Err(malformed(field, "a boolean", &other)),
    }
}

pub(crate) fn to_int(value: Value, field: &str) -> Result<i32> {
    match value {
        Value::Int(v) => Ok(v),
        other => Err(malformed(field, "an int", &other)),
    }
}

pub(crate) fn to_long(value: Value, field: &str) -> Result<i64> {
    match value {
        Value::Long(v) => Ok(v),
        Value::Int(v) => Ok(v as i64),
        other => Err(malformed(field, "a long", &other)),
    }
}

pub(crate) fn to_count(value: Value, field: &str) -> Result<u64> {
    let count = to_long(value, field)?;
    u64::try_from(count).map_err(|_| {
        Error::new(
            ErrorKind::MalformedEntry,
            format!("Field '{field}' must not be negative, got {count}"),
        )
    })
}

pub(crate) fn to_string(value: Value, field: &str) -> Result<String> {
    match value {
        Value::String(v) => Ok(v),
        Value::Enum(_, v) => Ok(v),
        other => Err(malformed(field, "a string", &other)),
    }
}

pub(crate) fn to_bytes(value: Value, field: &str) -> Result<Vec<u8>> {
    match value {
        Value::Bytes(v) => Ok(v),
        Value::Fixed(_, v) => Ok(v),
        other => Err(malformed(field, "bytes", &other)),
    }
}

pub(crate) fn to_array(value: Value, field: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(malformed(field, "an array", &other)),
    }
}

pub(crate) fn to_record(value: Value, field: &str) -> Result<Vec<(String, Value)>> {
    match value {
        Value::Record(fields) => Ok(fields),
        other => Err(malformed(field, "a record", &other)),
    }
}

/// Decode an int keyed map stored as an array of `{key, value}` records.
///
/// Keys must be unique.
pub(crate) fn to_int_map<V>(
    value: Value,
    field: &str,
    mut convert: impl FnMut(Value) -> Result<V>,
) -> Result<StatsMap<i32, V>> {
    let map: StatsMap<i32, V> = to_array(value, field)?
        .into_iter()
        .map(|item| {
            let mut key = None;
            let mut val = None;
            for (name, v) in to_record(item, field)? {
                match name.as_str() {
                    "key" => key = Some(v),
                    "value" => val = unwrap_union(v),
                    _ => {}
                }
            }
            let key = key.ok_or_else(|| {
                Error::new(
                    ErrorKind::MalformedEntry,
                    format!("Map entry of field '{field}' has no key"),
                )
            })?;
            let val = val.ok_or_else(|| {
                Error::new(
                    ErrorKind::MalformedEntry,
                    format!("Map entry of field '{field}' has no value"),
                )
            })?;
            Ok((to_int(key, field)?, convert(val)?))
        })
        .collect::<Result<_>>()?;
    if let Some(key) = map.first_duplicate_key() {
        return Err(Error::new(
            ErrorKind::MalformedEntry,
            format!("Field '{field}' has more than one value for key {key}"),
        ));
    }
    Ok(map)
}

/// Encode an int keyed map as an array of `{key, value}` records.
pub(crate) fn from_int_map<V>(map: &StatsMap<i32, V>, convert: impl Fn(&V) -> Value) -> Value {
    Value::Array(
        map.iter()
            .map(|(k, v)| {
                Value::Record(vec![
                    ("key".to_string(), Value::Int(*k)),
                    ("value".to_string(), convert(v)),
                ])
            })
            .collect(),
    )
}

/// Avro value of a partition value or summary bound.
pub(crate) fn datum_to_value(datum: &Datum) -> Value {
    match (datum.data_type(), datum.literal()) {
        (_, PrimitiveLiteral::Boolean(v)) => Value::Boolean(*v),
        (PrimitiveType::Date, PrimitiveLiteral::Int(v)) => Value::Date(*v),
        (_, PrimitiveLiteral::Int(v)) => Value::Int(*v),
        (PrimitiveType::Time, PrimitiveLiteral::Long(v)) => Value::TimeMicros(*v),
        (PrimitiveType::Timestamp | PrimitiveType::Timestamptz, PrimitiveLiteral::Long(v)) => {
            Value::TimestampMicros(*v)
        }
        (_, PrimitiveLiteral::Long(v)) => Value::Long(*v),
        (_, PrimitiveLiteral::Float(v)) => Value::Float(v.0),
        (_, PrimitiveLiteral::Double(v)) => Value::Double(v.0),
        (_, PrimitiveLiteral::String(v)) => Value::String(v.clone()),
        (PrimitiveType::Fixed(_), PrimitiveLiteral::Binary(v)) => Value::Fixed(v.len(), v.clone()),
        (_, PrimitiveLiteral::Binary(v)) => Value::Bytes(v.clone()),
        (_, PrimitiveLiteral::UInt128(v)) => Value::Fixed(16, v.to_be_bytes().to_vec()),
        (PrimitiveType::Decimal { precision, .. }, PrimitiveLiteral::Int128(v)) => {
            let size = PrimitiveType::decimal_required_bytes(*precision).unwrap_or(16) as usize;
            let bytes = v.to_be_bytes();
            Value::Decimal(Decimal::from(&bytes[bytes.len() - size.min(16)..]))
        }
        (_, PrimitiveLiteral::Int128(v)) => Value::Decimal(Decimal::from(v.to_be_bytes())),
    }
}

/// Decode a partition value or summary bound of type `ty`.
pub(crate) fn value_to_datum(value: Value, ty: &PrimitiveType, field: &str) -> Result<Datum> {
    let datum = match (ty, value) {
        (PrimitiveType::Boolean, Value::Boolean(v)) => Datum::bool(v),
        (PrimitiveType::Int, Value::Int(v)) => Datum::int(v),
        (PrimitiveType::Long, Value::Long(v)) => Datum::long(v),
        (PrimitiveType::Long, Value::Int(v)) => Datum::long(v),
        (PrimitiveType::Float, Value::Float(v)) => Datum::float(v),
        (PrimitiveType::Double, Value::Double(v)) => Datum::double(v),
        (PrimitiveType::Double, Value::Float(v)) => Datum::double(v),
        (PrimitiveType::Date, Value::Date(v) | Value::Int(v)) => Datum::date(v),
        (PrimitiveType::Time, Value::TimeMicros(v) | Value::Long(v)) => {
            Datum::time_micros(v).map_err(|err| {
                Error::new(
                    ErrorKind::MalformedEntry,
                    format!("Field '{field}' is not a time of day"),
                )
                .with_source(err)
            })?
        }
        (PrimitiveType::Timestamp, Value::TimestampMicros(v) | Value::Long(v)) => {
            Datum::timestamp_micros(v)
        }
        (PrimitiveType::Timestamptz, Value::TimestampMicros(v) | Value::Long(v)) => {
            Datum::timestamptz_micros(v)
        }
        (PrimitiveType::String, Value::String(v)) => Datum::string(v),
        (PrimitiveType::Uuid, Value::Uuid(v)) => Datum::uuid(v),
        (PrimitiveType::Uuid, Value::Fixed(16, v)) => {
            Datum::new(*ty, PrimitiveLiteral::UInt128(u128::from_be_bytes(fixed_16(&v, field)?)))?
        }
        (PrimitiveType::Fixed(_), Value::Fixed(_, v)) => {
            Datum::new(*ty, PrimitiveLiteral::Binary(v)).map_err(|err| {
                Error::new(ErrorKind::MalformedEntry, format!("Field '{field}' has a bad length"))
                    .with_source(err)
            })?
        }
        (PrimitiveType::Binary, Value::Bytes(v) | Value::Fixed(_, v)) => Datum::binary(v),
        (PrimitiveType::Decimal { precision, scale }, Value::Decimal(v)) => {
            let bytes = Vec::<u8>::try_from(&v).map_err(|err| {
                Error::new(ErrorKind::MalformedEntry, format!("Field '{field}' is not a decimal"))
                    .with_source(err)
            })?;
            decimal_datum(&bytes, *precision, *scale, field)?
        }
        (PrimitiveType::Decimal { precision, scale }, Value::Fixed(_, v) | Value::Bytes(v)) => {
            decimal_datum(&v, *precision, *scale, field)?
        }
        (ty, other) => return Err(malformed(field, &format!("a {ty} value"), &other)),
    };
    Ok(datum)
}

fn fixed_16(bytes: &[u8], field: &str) -> Result<[u8; 16]> {
    bytes.try_into().map_err(|_| {
        Error::new(
            ErrorKind::MalformedEntry,
            format!("Field '{field}' must be 16 bytes long, got {}", bytes.len()),
        )
    })
}

fn decimal_datum(bytes: &[u8], precision: u32, scale: u32, field: &str) -> Result<Datum> {
    if bytes.is_empty() || bytes.len() > 16 {
        return Err(Error::new(
            ErrorKind::MalformedEntry,
            format!(
                "Field '{field}' holds a decimal of {} bytes",
                bytes.len()
            ),
        ));
    }
    Datum::decimal(
        crate::spec::decimal_from_bytes(bytes),
        precision,
        scale,
    )
    .map_err(|err| {
        Error::new(
            ErrorKind::MalformedEntry,
            format!("Field '{field}' holds an invalid decimal"),
        )
        .with_source(err)
    })
}

/// Value of a field that is required or optional in the written version.
pub(crate) fn encode_field(required: bool, field: &str, value: Option<Value>) -> Result<Value> {
    match (required, value) {
        (true, Some(value)) => Ok(value),
        (true, None) => Err(Error::new(
            ErrorKind::MalformedEntry,
            format!("Required field '{field}' is not set"),
        )),
        (false, value) => Ok(optional(value)),
    }
}
