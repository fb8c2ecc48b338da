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

//! Table schema, keyed by field id.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::datatypes::{NestedFieldRef, StructType, Type};
use crate::{Error, ErrorKind, Result};

/// Type alias for schema id.
pub type SchemaId = i32;
/// Reference to [`Schema`].
pub type SchemaRef = Arc<Schema>;

const DEFAULT_SCHEMA_ID: SchemaId = 0;

/// Defines schema in iceberg.
#[derive(Debug, Clone)]
pub struct Schema {
    r#struct: StructType,
    schema_id: SchemaId,
    identifier_field_ids: Vec<i32>,

    id_to_field: HashMap<i32, NestedFieldRef>,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.r#struct == other.r#struct
            && self.schema_id == other.schema_id
            && self.identifier_field_ids == other.identifier_field_ids
    }
}

impl Eq for Schema {}

/// Schema builder.
#[derive(Debug)]
pub struct SchemaBuilder {
    schema_id: SchemaId,
    fields: Vec<NestedFieldRef>,
    identifier_field_ids: Vec<i32>,
}

impl SchemaBuilder {
    /// Add fields to schema builder.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = NestedFieldRef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Set schema id.
    pub fn with_schema_id(mut self, schema_id: SchemaId) -> Self {
        self.schema_id = schema_id;
        self
    }

    /// Set identifier field ids.
    pub fn with_identifier_field_ids(mut self, ids: impl IntoIterator<Item = i32>) -> Self {
        self.identifier_field_ids.extend(ids);
        self
    }

    /// Builds the schema.
    ///
    /// Fails when two fields, at any nesting level, share a field id.
    pub fn build(self) -> Result<Schema> {
        let r#struct = StructType::new(self.fields);
        let mut id_to_field = HashMap::new();
        index_fields(r#struct.fields(), &mut id_to_field)?;

        for id in &self.identifier_field_ids {
            if !id_to_field.contains_key(id) {
                return Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Identifier field {id} does not exist in schema"),
                ));
            }
        }

        Ok(Schema {
            r#struct,
            schema_id: self.schema_id,
            identifier_field_ids: self.identifier_field_ids,
            id_to_field,
        })
    }
}

fn index_fields(
    fields: &[NestedFieldRef],
    index: &mut HashMap<i32, NestedFieldRef>,
) -> Result<()> {
    for field in fields {
        if index.insert(field.id, field.clone()).is_some() {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Duplicate field id {} in schema", field.id),
            ));
        }
        match field.field_type.as_ref() {
            Type::Primitive(_) => {}
            Type::Struct(s) => index_fields(s.fields(), index)?,
            Type::List(list) => index_fields(std::slice::from_ref(&list.element_field), index)?,
            Type::Map(map) => index_fields(
                &[map.key_field.clone(), map.value_field.clone()],
                index,
            )?,
        }
    }
    Ok(())
}

impl Schema {
    /// Create a schema builder.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder {
            schema_id: DEFAULT_SCHEMA_ID,
            fields: vec![],
            identifier_field_ids: vec![],
        }
    }

    /// Get field by field id, including fields nested in structs, lists and maps.
    pub fn field_by_id(&self, field_id: i32) -> Option<&NestedFieldRef> {
        self.id_to_field.get(&field_id)
    }

    /// Get a top level field by name.
    pub fn field_by_name(&self, field_name: &str) -> Option<&NestedFieldRef> {
        self.r#struct.field_by_name(field_name)
    }

    /// Returns [`schema_id`].
    #[inline]
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// Returns [`r#struct`].
    #[inline]
    pub fn as_struct(&self) -> &StructType {
        &self.r#struct
    }

    /// Identifier field ids.
    pub fn identifier_field_ids(&self) -> &[i32] {
        &self.identifier_field_ids
    }

    /// Highest field id in use.
    pub fn highest_field_id(&self) -> i32 {
        self.id_to_field.keys().copied().max().unwrap_or(0)
    }
}

pub(super) mod _serde {
    use serde_derive::{Deserialize, Serialize};

    use super::{Schema, SchemaId};
    use crate::spec::datatypes::NestedField;
    use crate::{Error, Result};

    #[derive(Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub(super) struct SchemaV2 {
        #[serde(rename = "type", default = "struct_type")]
        pub r#type: String,
        #[serde(default)]
        pub schema_id: SchemaId,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub identifier_field_ids: Vec<i32>,
        pub fields: Vec<NestedField>,
    }

    fn struct_type() -> String {
        "struct".to_string()
    }

    impl TryFrom<SchemaV2> for Schema {
        type Error = Error;

        fn try_from(value: SchemaV2) -> Result<Self> {
            Schema::builder()
                .with_schema_id(value.schema_id)
                .with_identifier_field_ids(value.identifier_field_ids)
                .with_fields(value.fields.into_iter().map(Into::into))
                .build()
        }
    }

    impl From<&Schema> for SchemaV2 {
        fn from(value: &Schema) -> Self {
            SchemaV2 {
                r#type: struct_type(),
                schema_id: value.schema_id,
                identifier_field_ids: value.identifier_field_ids.clone(),
                fields: value
                    .r#struct
                    .fields()
                    .iter()
                    .map(|f| f.as_ref().clone())
                    .collect(),
            }
        }
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        _serde::SchemaV2::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let schema = _serde::SchemaV2::deserialize(deserializer)?;
        Schema::try_from(schema).map_err(serde::de::Error::custom)
    }
}
