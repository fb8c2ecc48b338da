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

//! Data types of table schemas.
//!
//! Types serialize to the JSON representation used in table metadata and in
//! the `schema` entry of manifest headers.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, ErrorKind, Result};

/// Maximum precision of a decimal type.
pub const MAX_DECIMAL_PRECISION: u32 = 38;

/// Primitive types.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum PrimitiveType {
    /// True or False
    Boolean,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE 754 floating point.
    Float,
    /// 64-bit IEEE 754 floating point.
    Double,
    /// Fixed point decimal
    Decimal {
        /// Precision, must be 38 or less
        precision: u32,
        /// Scale
        scale: u32,
    },
    /// Calendar date without timezone or time.
    Date,
    /// Time of day in microsecond precision, without date or timezone.
    Time,
    /// Timestamp in microsecond precision, without timezone
    Timestamp,
    /// Timestamp in microsecond precision, with timezone
    Timestamptz,
    /// Arbitrary-length character sequences encoded in utf-8
    String,
    /// Universally Unique Identifiers, should use 16-byte fixed
    Uuid,
    /// Fixed length byte array
    Fixed(u64),
    /// Arbitrary-length byte array.
    Binary,
}

impl PrimitiveType {
    /// Minimum number of bytes able to hold the unscaled value of a decimal
    /// with the given precision.
    pub fn decimal_required_bytes(precision: u32) -> Result<u32> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Decimal precision must be between 1 and {MAX_DECIMAL_PRECISION}, got {precision}"
                ),
            ));
        }
        let max_unscaled = 10i128.pow(precision) - 1;
        // Smallest n with 2^(8n - 1) > max_unscaled.
        let mut bytes = 1u32;
        while bytes < 16 && (1i128 << (8 * bytes - 1)) <= max_unscaled {
            bytes += 1;
        }
        Ok(bytes)
    }

    /// Whether values of this type are floating point and may be NaN.
    pub fn is_floating_type(&self) -> bool {
        matches!(self, PrimitiveType::Float | PrimitiveType::Double)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Int => write!(f, "int"),
            PrimitiveType::Long => write!(f, "long"),
            PrimitiveType::Float => write!(f, "float"),
            PrimitiveType::Double => write!(f, "double"),
            PrimitiveType::Decimal { precision, scale } => {
                write!(f, "decimal({precision},{scale})")
            }
            PrimitiveType::Date => write!(f, "date"),
            PrimitiveType::Time => write!(f, "time"),
            PrimitiveType::Timestamp => write!(f, "timestamp"),
            PrimitiveType::Timestamptz => write!(f, "timestamptz"),
            PrimitiveType::String => write!(f, "string"),
            PrimitiveType::Uuid => write!(f, "uuid"),
            PrimitiveType::Fixed(size) => write!(f, "fixed[{size}]"),
            PrimitiveType::Binary => write!(f, "binary"),
        }
    }
}

impl FromStr for PrimitiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let primitive = match s {
            "boolean" => PrimitiveType::Boolean,
            "int" => PrimitiveType::Int,
            "long" => PrimitiveType::Long,
            "float" => PrimitiveType::Float,
            "double" => PrimitiveType::Double,
            "date" => PrimitiveType::Date,
            "time" => PrimitiveType::Time,
            "timestamp" => PrimitiveType::Timestamp,
            "timestamptz" => PrimitiveType::Timestamptz,
            "string" => PrimitiveType::String,
            "uuid" => PrimitiveType::Uuid,
            "binary" => PrimitiveType::Binary,
            other => {
                if let Some(args) = other
                    .strip_prefix("decimal(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    let (precision, scale) = args.split_once(',').ok_or_else(|| {
                        Error::new(
                            ErrorKind::DataInvalid,
                            format!("Invalid decimal type: {other}"),
                        )
                    })?;
                    let precision: u32 = precision.trim().parse()?;
                    let scale: u32 = scale.trim().parse()?;
                    PrimitiveType::decimal_required_bytes(precision)?;
                    PrimitiveType::Decimal { precision, scale }
                } else if let Some(size) = other
                    .strip_prefix("fixed[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    PrimitiveType::Fixed(size.trim().parse()?)
                } else {
                    return Err(Error::new(
                        ErrorKind::DataInvalid,
                        format!("Unknown primitive type: {other}"),
                    ));
                }
            }
        };
        Ok(primitive)
    }
}

impl Serialize for PrimitiveType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PrimitiveType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// All data types are either primitives or nested types, which are maps, lists, or structs.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "crate::spec::datatypes::_serde::SerdeType", into = "crate::spec::datatypes::_serde::SerdeType")]
pub enum Type {
    /// Primitive types
    Primitive(PrimitiveType),
    /// Struct type
    Struct(StructType),
    /// List type.
    List(ListType),
    /// Map type
    Map(MapType),
}

impl Type {
    /// Whether the type is primitive type.
    #[inline(always)]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    /// Returns the primitive type if this is one.
    pub fn as_primitive_type(&self) -> Option<&PrimitiveType> {
        if let Type::Primitive(primitive) = self {
            Some(primitive)
        } else {
            None
        }
    }

    /// Returns the struct type if this is one.
    pub fn as_struct_type(&self) -> Option<&StructType> {
        if let Type::Struct(struct_type) = self {
            Some(struct_type)
        } else {
            None
        }
    }
}

impl From<PrimitiveType> for Type {
    fn from(value: PrimitiveType) -> Self {
        Self::Primitive(value)
    }
}

impl From<StructType> for Type {
    fn from(value: StructType) -> Self {
        Type::Struct(value)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{primitive}"),
            Type::Struct(s) => {
                write!(f, "struct<")?;
                for (idx, field) in s.fields().iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.field_type)?;
                }
                write!(f, ">")
            }
            Type::List(list) => write!(f, "list<{}>", list.element_field.field_type),
            Type::Map(map) => write!(
                f,
                "map<{}, {}>",
                map.key_field.field_type, map.value_field.field_type
            ),
        }
    }
}

/// Reference to nested field.
pub type NestedFieldRef = Arc<NestedField>;

/// A struct is a tuple of typed values.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct StructType {
    fields: Vec<NestedFieldRef>,
}

impl StructType {
    /// Creates a struct type with the given fields.
    pub fn new(fields: Vec<NestedFieldRef>) -> Self {
        Self { fields }
    }

    /// Get struct field with certain id
    pub fn field_by_id(&self, id: i32) -> Option<&NestedFieldRef> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Get struct field with certain field name
    pub fn field_by_name(&self, name: &str) -> Option<&NestedFieldRef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Position of the field with the given id.
    pub fn position_by_id(&self, id: i32) -> Option<usize> {
        self.fields.iter().position(|field| field.id == id)
    }

    /// Get fields.
    pub fn fields(&self) -> &[NestedFieldRef] {
        &self.fields
    }
}

/// A list is a collection of values with some element type.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ListType {
    /// Element field of list type.
    pub element_field: NestedFieldRef,
}

impl ListType {
    /// Construct a list type with the given element field.
    pub fn new(element_field: NestedFieldRef) -> Self {
        Self { element_field }
    }
}

/// A map is a collection of key-value pairs with a key type and a value type.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct MapType {
    /// Field for key.
    pub key_field: NestedFieldRef,
    /// Field for value.
    pub value_field: NestedFieldRef,
}

impl MapType {
    /// Construct a map type with the given key and value fields.
    pub fn new(key_field: NestedFieldRef, value_field: NestedFieldRef) -> Self {
        Self {
            key_field,
            value_field,
        }
    }
}

/// A struct field, list element, or map key/value.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(from = "crate::spec::datatypes::_serde::SerdeNestedField", into = "crate::spec::datatypes::_serde::SerdeNestedField")]
pub struct NestedField {
    /// Id unique in table schema
    pub id: i32,
    /// Field Name
    pub name: String,
    /// Optional or required
    pub required: bool,
    /// Datatype
    pub field_type: Box<Type>,
    /// Fields may have an optional comment or doc string.
    pub doc: Option<String>,
}

impl NestedField {
    /// Construct a required field.
    pub fn required(id: i32, name: impl ToString, field_type: Type) -> Self {
        Self {
            id,
            name: name.to_string(),
            required: true,
            field_type: Box::new(field_type),
            doc: None,
        }
    }

    /// Construct an optional field.
    pub fn optional(id: i32, name: impl ToString, field_type: Type) -> Self {
        Self {
            id,
            name: name.to_string(),
            required: false,
            field_type: Box::new(field_type),
            doc: None,
        }
    }

    /// Construct a list type element field.
    pub fn list_element(id: i32, field_type: Type, required: bool) -> Self {
        let field = Self::optional(id, "element", field_type);
        Self { required, ..field }
    }

    /// Construct a map type key field.
    pub fn map_key_element(id: i32, field_type: Type) -> Self {
        Self::required(id, "key", field_type)
    }

    /// Construct a map type value field.
    pub fn map_value_element(id: i32, field_type: Type, required: bool) -> Self {
        let field = Self::optional(id, "value", field_type);
        Self { required, ..field }
    }

    /// Set the field's doc.
    pub fn with_doc(mut self, doc: impl ToString) -> Self {
        self.doc = Some(doc.to_string());
        self
    }
}

mod _serde {
    use serde_derive::{Deserialize, Serialize};

    use super::{ListType, MapType, NestedField, PrimitiveType, StructType, Type};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    pub(super) enum SerdeType {
        Primitive(PrimitiveType),
        Nested(SerdeNestedType),
    }

    #[derive(Serialize, Deserialize)]
    #[serde(tag = "type", rename_all = "lowercase")]
    pub(super) enum SerdeNestedType {
        Struct {
            fields: Vec<NestedField>,
        },
        List {
            #[serde(rename = "element-id")]
            element_id: i32,
            #[serde(rename = "element-required")]
            element_required: bool,
            element: Box<Type>,
        },
        Map {
            #[serde(rename = "key-id")]
            key_id: i32,
            key: Box<Type>,
            #[serde(rename = "value-id")]
            value_id: i32,
            #[serde(rename = "value-required")]
            value_required: bool,
            value: Box<Type>,
        },
    }

    impl From<SerdeType> for Type {
        fn from(value: SerdeType) -> Self {
            match value {
                SerdeType::Primitive(primitive) => Type::Primitive(primitive),
                SerdeType::Nested(SerdeNestedType::Struct { fields }) => {
                    Type::Struct(StructType::new(fields.into_iter().map(Into::into).collect()))
                }
                SerdeType::Nested(SerdeNestedType::List {
                    element_id,
                    element_required,
                    element,
                }) => Type::List(ListType::new(
                    NestedField::list_element(element_id, *element, element_required).into(),
                )),
                SerdeType::Nested(SerdeNestedType::Map {
                    key_id,
                    key,
                    value_id,
                    value_required,
                    value,
                }) => Type::Map(MapType::new(
                    NestedField::map_key_element(key_id, *key).into(),
                    NestedField::map_value_element(value_id, *value, value_required).into(),
                )),
            }
        }
    }

    impl From<Type> for SerdeType {
        fn from(value: Type) -> Self {
            match value {
                Type::Primitive(primitive) => SerdeType::Primitive(primitive),
                Type::Struct(s) => SerdeType::Nested(SerdeNestedType::Struct {
                    fields: s.fields().iter().map(|f| f.as_ref().clone()).collect(),
                }),
                Type::List(list) => SerdeType::Nested(SerdeNestedType::List {
                    element_id: list.element_field.id,
                    element_required: list.element_field.required,
                    element: list.element_field.field_type.clone(),
                }),
                Type::Map(map) => SerdeType::Nested(SerdeNestedType::Map {
                    key_id: map.key_field.id,
                    key: map.key_field.field_type.clone(),
                    value_id: map.value_field.id,
                    value_required: map.value_field.required,
                    value: map.value_field.field_type.clone(),
                }),
            }
        }
    }

    #[derive(Serialize, Deserialize)]
    pub(super) struct SerdeNestedField {
        id: i32,
        name: String,
        required: bool,
        #[serde(rename = "type")]
        field_type: Box<Type>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        doc: Option<String>,
    }

    impl From<SerdeNestedField> for NestedField {
        fn from(value: SerdeNestedField) -> Self {
            NestedField {
                id: value.id,
                name: value.name,
                required: value.required,
                field_type: value.field_type,
                doc: value.doc,
            }
        }
    }

    impl From<NestedField> for SerdeNestedField {
        fn from(value: NestedField) -> Self {
            SerdeNestedField {
                id: value.id,
                name: value.name,
                required: value.required,
                field_type: value.field_type,
                doc: value.doc,
            }
        }
    }
}
