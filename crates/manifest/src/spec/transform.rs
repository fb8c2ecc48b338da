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

//! Transforms in iceberg.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::datatypes::{PrimitiveType, Type};
use crate::{Error, ErrorKind, Result};

/// Transform is used to transform predicates to partition predicates,
/// in addition to transforming data values.
///
/// Only the result type of a transform matters for manifests: it decides the
/// type of the corresponding field in the partition struct.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum Transform {
    /// Source value, unmodified
    Identity,
    /// Hash of value, mod `N`.
    Bucket(u32),
    /// Value truncated to width `W`
    Truncate(u32),
    /// Extract a date or timestamp year, as years from 1970
    Year,
    /// Extract a date or timestamp month, as months from 1970-01-01
    Month,
    /// Extract a date or timestamp day, as days from 1970-01-01
    Day,
    /// Extract a timestamp hour, as hours from 1970-01-01 00:00:00
    Hour,
    /// Always produces `null`
    Void,
}

impl Transform {
    /// Get the return type of transform given the input type.
    ///
    /// Returns [`ErrorKind::SchemaProjection`] when the transform can't be
    /// applied to the input type.
    pub fn result_type(&self, input_type: &Type) -> Result<Type> {
        let Type::Primitive(primitive) = input_type else {
            return match self {
                Transform::Void => Ok(input_type.clone()),
                _ => Err(self.not_applicable(input_type)),
            };
        };

        let result = match self {
            Transform::Identity | Transform::Void => Some(*primitive),
            Transform::Bucket(_) => matches!(
                primitive,
                PrimitiveType::Int
                    | PrimitiveType::Long
                    | PrimitiveType::Decimal { .. }
                    | PrimitiveType::Date
                    | PrimitiveType::Time
                    | PrimitiveType::Timestamp
                    | PrimitiveType::Timestamptz
                    | PrimitiveType::String
                    | PrimitiveType::Uuid
                    | PrimitiveType::Fixed(_)
                    | PrimitiveType::Binary
            )
            .then_some(PrimitiveType::Int),
            Transform::Truncate(_) => matches!(
                primitive,
                PrimitiveType::Int
                    | PrimitiveType::Long
                    | PrimitiveType::Decimal { .. }
                    | PrimitiveType::String
                    | PrimitiveType::Binary
            )
            .then_some(*primitive),
            Transform::Year | Transform::Month => matches!(
                primitive,
                PrimitiveType::Date | PrimitiveType::Timestamp | PrimitiveType::Timestamptz
            )
            .then_some(PrimitiveType::Int),
            Transform::Day => matches!(
                primitive,
                PrimitiveType::Date | PrimitiveType::Timestamp | PrimitiveType::Timestamptz
            )
            .then_some(PrimitiveType::Date),
            Transform::Hour => matches!(
                primitive,
                PrimitiveType::Timestamp | PrimitiveType::Timestamptz
            )
            .then_some(PrimitiveType::Int),
        };

        result
            .map(Type::Primitive)
            .ok_or_else(|| self.not_applicable(input_type))
    }

    fn not_applicable(&self, input_type: &Type) -> Error {
        Error::new(
            ErrorKind::SchemaProjection,
            format!("{input_type} is not a valid input type of {self} transform"),
        )
    }
}

impl Display for Transform {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Void => write!(f, "void"),
            Transform::Bucket(length) => write!(f, "bucket[{length}]"),
            Transform::Truncate(width) => write!(f, "truncate[{width}]"),
        }
    }
}

impl FromStr for Transform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let t = match s {
            "identity" => Transform::Identity,
            "year" => Transform::Year,
            "month" => Transform::Month,
            "day" => Transform::Day,
            "hour" => Transform::Hour,
            "void" => Transform::Void,
            v if v.starts_with("bucket") => {
                let length = parse_param(v, "bucket")?;
                Transform::Bucket(length)
            }
            v if v.starts_with("truncate") => {
                let width = parse_param(v, "truncate")?;
                Transform::Truncate(width)
            }
            v => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    format!("transform {v:?} is not supported"),
                ));
            }
        };
        Ok(t)
    }
}

fn parse_param(s: &str, name: &str) -> Result<u32> {
    s.strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("transform {name} is invalid: {s}"),
            )
        })?
        .parse()
        .map_err(|err| {
            Error::new(
                ErrorKind::DataInvalid,
                format!("transform {name} has an invalid parameter: {s}"),
            )
            .with_source(err)
        })
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::datatypes::{ListType, NestedField};

    #[test]
    fn test_transform_from_str() {
        assert_eq!("bucket[16]".parse::<Transform>().unwrap(), Transform::Bucket(16));
        assert_eq!(
            "truncate[4]".parse::<Transform>().unwrap(),
            Transform::Truncate(4)
        );
        assert_eq!("day".parse::<Transform>().unwrap(), Transform::Day);
        assert!("bucket[x]".parse::<Transform>().is_err());
        assert!("zorder".parse::<Transform>().is_err());
    }

    #[test]
    fn test_result_types() {
        let ts = Type::Primitive(PrimitiveType::Timestamptz);
        assert_eq!(Transform::Identity.result_type(&ts).unwrap(), ts);
        assert_eq!(
            Transform::Day.result_type(&ts).unwrap(),
            Type::Primitive(PrimitiveType::Date)
        );
        assert_eq!(
            Transform::Hour.result_type(&ts).unwrap(),
            Type::Primitive(PrimitiveType::Int)
        );
        assert_eq!(
            Transform::Bucket(8)
                .result_type(&Type::Primitive(PrimitiveType::String))
                .unwrap(),
            Type::Primitive(PrimitiveType::Int)
        );
        assert_eq!(
            Transform::Truncate(3)
                .result_type(&Type::Primitive(PrimitiveType::String))
                .unwrap(),
            Type::Primitive(PrimitiveType::String)
        );
    }

    #[test]
    fn test_result_type_not_applicable() {
        let err = Transform::Hour
            .result_type(&Type::Primitive(PrimitiveType::Date))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaProjection);

        let list = Type::List(ListType::new(
            NestedField::list_element(2, PrimitiveType::Int.into(), true).into(),
        ));
        let err = Transform::Identity.result_type(&list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaProjection);

        let err = Transform::Truncate(2)
            .result_type(&Type::Primitive(PrimitiveType::Double))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaProjection);
    }
}
