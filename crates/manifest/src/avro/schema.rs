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

//! Conversion from iceberg types to Avro schemas, and back to the field ids
//! of a writer schema.

use apache_avro::Schema as AvroSchema;
use serde_json::{json, Map, Value as JsonValue};

use crate::spec::{NestedField, PrimitiveType, StructType, Type};
use crate::{Error, ErrorKind, Result};

const FIELD_ID_PROP: &str = "field-id";
const ELEMENT_ID_PROP: &str = "element-id";
const KEY_ID_PROP: &str = "key-id";
const VALUE_ID_PROP: &str = "value-id";
const ADJUST_TO_UTC_PROP: &str = "adjust-to-utc";
const LOGICAL_TYPE_PROP: &str = "logicalType";

/// Convert an iceberg struct into an Avro record schema named `name`.
///
/// Every field carries its iceberg id as the `field-id` property. Nested
/// records are named `r{field_id}`, maps with non-string keys become arrays
/// of `k{key_id}_v{value_id}` records and optional fields become
/// `["null", T]` unions defaulting to null.
pub fn schema_to_avro_schema(name: impl ToString, schema: &StructType) -> Result<AvroSchema> {
    let json = avro_schema_json(name, schema)?;
    AvroSchema::parse(&json).map_err(|err| {
        Error::new(
            ErrorKind::Unexpected,
            "Failed to parse generated avro schema",
        )
        .with_context("schema", json.to_string())
        .with_source(err)
    })
}

/// The JSON form of [`schema_to_avro_schema`].
pub fn avro_schema_json(name: impl ToString, schema: &StructType) -> Result<JsonValue> {
    record_json(&sanitize_avro_name(&name.to_string()), schema.fields())
}

fn record_json(name: &str, fields: &[crate::spec::NestedFieldRef]) -> Result<JsonValue> {
    let fields = fields
        .iter()
        .map(|field| field_json(field))
        .collect::<Result<Vec<_>>>()?;
    Ok(json!({
        "type": "record",
        "name": name,
        "fields": fields,
    }))
}

fn field_json(field: &NestedField) -> Result<JsonValue> {
    let mut field_type = type_json(&field.field_type, field.id)?;
    let mut obj = Map::new();
    obj.insert("name".to_string(), json!(sanitize_avro_name(&field.name)));
    if !field.required {
        field_type = json!(["null", field_type]);
    }
    obj.insert("type".to_string(), field_type);
    if !field.required {
        obj.insert("default".to_string(), JsonValue::Null);
    }
    if let Some(doc) = &field.doc {
        obj.insert("doc".to_string(), json!(doc));
    }
    obj.insert(FIELD_ID_PROP.to_string(), json!(field.id));
    Ok(JsonValue::Object(obj))
}

fn optional_if(json: JsonValue, required: bool) -> JsonValue {
    if required {
        json
    } else {
        json!(["null", json])
    }
}

fn type_json(ty: &Type, field_id: i32) -> Result<JsonValue> {
    let json = match ty {
        Type::Primitive(primitive) => primitive_json(primitive, field_id)?,
        Type::Struct(s) => record_json(&format!("r{field_id}"), s.fields())?,
        Type::List(list) => {
            let element = &list.element_field;
            json!({
                "type": "array",
                "items": optional_if(type_json(&element.field_type, element.id)?, element.required),
                ELEMENT_ID_PROP: element.id,
            })
        }
        Type::Map(map) => {
            let key = &map.key_field;
            let value = &map.value_field;
            let value_json =
                optional_if(type_json(&value.field_type, value.id)?, value.required);
            if matches!(*key.field_type, Type::Primitive(PrimitiveType::String)) {
                json!({
                    "type": "map",
                    "values": value_json,
                    KEY_ID_PROP: key.id,
                    VALUE_ID_PROP: value.id,
                })
            } else {
                let mut value_field = Map::new();
                value_field.insert("name".to_string(), json!("value"));
                value_field.insert("type".to_string(), value_json);
                if !value.required {
                    value_field.insert("default".to_string(), JsonValue::Null);
                }
                value_field.insert(FIELD_ID_PROP.to_string(), json!(value.id));
                json!({
                    "type": "array",
                    LOGICAL_TYPE_PROP: "map",
                    "items": {
                        "type": "record",
                        "name": format!("k{}_v{}", key.id, value.id),
                        "fields": [
                            {
                                "name": "key",
                                "type": type_json(&key.field_type, key.id)?,
                                FIELD_ID_PROP: key.id,
                            },
                            JsonValue::Object(value_field),
                        ],
                    },
                })
            }
        }
    };
    Ok(json)
}

fn primitive_json(primitive: &PrimitiveType, field_id: i32) -> Result<JsonValue> {
    let json = match primitive {
        PrimitiveType::Boolean => json!("boolean"),
        PrimitiveType::Int => json!("int"),
        PrimitiveType::Long => json!("long"),
        PrimitiveType::Float => json!("float"),
        PrimitiveType::Double => json!("double"),
        PrimitiveType::String => json!("string"),
        PrimitiveType::Binary => json!("bytes"),
        PrimitiveType::Date => json!({"type": "int", LOGICAL_TYPE_PROP: "date"}),
        PrimitiveType::Time => json!({"type": "long", LOGICAL_TYPE_PROP: "time-micros"}),
        PrimitiveType::Timestamp => json!({
            "type": "long",
            LOGICAL_TYPE_PROP: "timestamp-micros",
            ADJUST_TO_UTC_PROP: false,
        }),
        PrimitiveType::Timestamptz => json!({
            "type": "long",
            LOGICAL_TYPE_PROP: "timestamp-micros",
            ADJUST_TO_UTC_PROP: true,
        }),
        // Named types get a per-field name so that no schema needs a name reference.
        PrimitiveType::Uuid => json!({
            "type": "fixed",
            "name": format!("uuid_fixed_{field_id}"),
            "size": 16,
        }),
        PrimitiveType::Fixed(size) => json!({
            "type": "fixed",
            "name": format!("fixed_{field_id}"),
            "size": size,
        }),
        PrimitiveType::Decimal { precision, scale } => json!({
            "type": "fixed",
            "name": format!("decimal_{field_id}"),
            "size": PrimitiveType::decimal_required_bytes(*precision)?,
            LOGICAL_TYPE_PROP: "decimal",
            "precision": precision,
            "scale": scale,
        }),
    };
    Ok(json)
}

/// Make `name` a valid Avro name: `[A-Za-z_][A-Za-z0-9_]*`.
///
/// A leading digit is prefixed with `_`, any other invalid character is
/// replaced by `_x` followed by its upper-case hex code point.
pub fn sanitize_avro_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len());
    for (idx, c) in name.chars().enumerate() {
        match c {
            'a'..='z' | 'A'..='Z' | '_' => sanitized.push(c),
            '0'..='9' if idx > 0 => sanitized.push(c),
            '0'..='9' => {
                sanitized.push('_');
                sanitized.push(c);
            }
            other => sanitized.push_str(&format!("_x{:X}", other as u32)),
        }
    }
    if sanitized.is_empty() {
        sanitized.push('_');
    }
    sanitized
}

/// Field names and ids of an Avro record, in the order its values are encoded.
///
/// Built from the writer schema stored in a file header. Only nested records
/// are kept, which is what decoding manifest entries needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RecordLayout {
    pub(crate) fields: Vec<FieldLayout>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldLayout {
    pub(crate) name: String,
    pub(crate) field_id: Option<i32>,
    pub(crate) record: Option<RecordLayout>,
}

impl RecordLayout {
    /// Parse the layout of the top level record of an Avro schema.
    pub(crate) fn parse(schema_json: &JsonValue) -> Result<Self> {
        record_layout(schema_json).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                "Avro writer schema is not a record schema",
            )
        })
    }
}

fn record_layout(json: &JsonValue) -> Option<RecordLayout> {
    match json {
        JsonValue::Object(obj) if obj.get("type").and_then(JsonValue::as_str) == Some("record") => {
            let fields = obj.get("fields")?.as_array()?;
            let fields = fields
                .iter()
                .filter_map(|field| {
                    let name = field.get("name")?.as_str()?.to_string();
                    let field_id = field
                        .get(FIELD_ID_PROP)
                        .and_then(JsonValue::as_i64)
                        .and_then(|id| i32::try_from(id).ok());
                    let record = field.get("type").and_then(record_layout);
                    Some(FieldLayout {
                        name,
                        field_id,
                        record,
                    })
                })
                .collect();
            Some(RecordLayout { fields })
        }
        // Lists of records keep the layout of their element.
        JsonValue::Object(obj) if obj.get("type").and_then(JsonValue::as_str) == Some("array") => {
            obj.get("items").and_then(record_layout)
        }
        JsonValue::Object(obj) => obj.get("type").and_then(record_layout),
        JsonValue::Array(branches) => branches.iter().find_map(record_layout),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use apache_avro::types::Value;

    use super::*;
    use crate::spec::{ListType, MapType};

    fn partition_like() -> StructType {
        StructType::new(vec![
            NestedField::optional(1000, "id", PrimitiveType::Int.into()).into(),
            NestedField::optional(1001, "ts_day", PrimitiveType::Date.into()).into(),
            NestedField::optional(
                1002,
                "amount",
                PrimitiveType::Decimal {
                    precision: 9,
                    scale: 2,
                }
                .into(),
            )
            .into(),
            NestedField::optional(1003, "guid", PrimitiveType::Uuid.into()).into(),
            NestedField::optional(1004, "1st-col", PrimitiveType::String.into()).into(),
        ])
    }

    #[test]
    fn test_sanitize_avro_name() {
        assert_eq!(sanitize_avro_name("valid_name"), "valid_name");
        assert_eq!(sanitize_avro_name("1st"), "_1st");
        assert_eq!(sanitize_avro_name("a-b"), "a_x2Db");
        assert_eq!(sanitize_avro_name("a.b c"), "a_x2Eb_x20c");
        assert_eq!(sanitize_avro_name(""), "_");
    }

    #[test]
    fn test_schema_json_carries_field_ids() {
        let json = avro_schema_json("r102", &partition_like()).unwrap();
        let fields = json["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0]["field-id"], json!(1000));
        assert_eq!(fields[0]["type"], json!(["null", "int"]));
        assert_eq!(fields[0]["default"], JsonValue::Null);
        assert_eq!(fields[2]["type"][1]["logicalType"], json!("decimal"));
        assert_eq!(fields[2]["type"][1]["size"], json!(4));
        assert_eq!(fields[4]["name"], json!("_1st_x2Dcol"));
        schema_to_avro_schema("r102", &partition_like()).unwrap();
    }

    #[test]
    fn test_int_keyed_map_is_array_of_records() {
        let schema = StructType::new(vec![NestedField::optional(
            108,
            "column_sizes",
            Type::Map(MapType::new(
                NestedField::map_key_element(117, PrimitiveType::Int.into()).into(),
                NestedField::map_value_element(118, PrimitiveType::Long.into(), true).into(),
            )),
        )
        .into()]);
        let json = avro_schema_json("r2", &schema).unwrap();
        let map_type = &json["fields"][0]["type"][1];
        assert_eq!(map_type["type"], json!("array"));
        assert_eq!(map_type["logicalType"], json!("map"));
        assert_eq!(map_type["items"]["name"], json!("k117_v118"));
        assert_eq!(map_type["items"]["fields"][0]["field-id"], json!(117));
        assert_eq!(map_type["items"]["fields"][1]["field-id"], json!(118));

        let avro = schema_to_avro_schema("r2", &schema).unwrap();
        let value = Value::Record(vec![(
            "column_sizes".to_string(),
            Value::Union(
                1,
                Box::new(Value::Array(vec![Value::Record(vec![
                    ("key".to_string(), Value::Int(1)),
                    ("value".to_string(), Value::Long(64)),
                ])])),
            ),
        )]);
        assert!(value.validate(&avro));
    }

    #[test]
    fn test_list_carries_element_id() {
        let schema = StructType::new(vec![NestedField::optional(
            132,
            "split_offsets",
            Type::List(ListType::new(
                NestedField::list_element(133, PrimitiveType::Long.into(), true).into(),
            )),
        )
        .into()]);
        let json = avro_schema_json("r2", &schema).unwrap();
        assert_eq!(json["fields"][0]["type"][1]["element-id"], json!(133));
        assert_eq!(json["fields"][0]["type"][1]["items"], json!("long"));
    }

    #[test]
    fn test_record_layout() {
        let schema = StructType::new(vec![
            NestedField::required(0, "status", PrimitiveType::Int.into()).into(),
            NestedField::required(2, "data_file", Type::Struct(partition_like())).into(),
        ]);
        let json = avro_schema_json("manifest_entry", &schema).unwrap();
        let layout = RecordLayout::parse(&json).unwrap();
        assert_eq!(layout.fields.len(), 2);
        assert_eq!(layout.fields[0].field_id, Some(0));
        assert!(layout.fields[0].record.is_none());
        let nested = layout.fields[1].record.as_ref().unwrap();
        assert_eq!(nested.fields.len(), 5);
        assert_eq!(nested.fields[3].field_id, Some(1003));

        assert!(RecordLayout::parse(&json!("int")).is_err());
    }
}
