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

//! Partition specs: ordered lists of (source field, transform) pairs.

use std::collections::HashSet;
use std::sync::Arc;

use serde_derive::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use super::datatypes::{NestedField, StructType};
use super::schema::Schema;
use super::transform::Transform;
use crate::{Error, ErrorKind, Result};

/// Reference to [`PartitionSpec`].
pub type PartitionSpecRef = Arc<PartitionSpec>;

/// Field ids of partition fields start here, above the ids of table columns.
pub const PARTITION_DATA_ID_START: i32 = 1000;

/// Partition fields capture the transform from table data to partition values.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Hash, TypedBuilder)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionField {
    /// A source column id from the table's schema
    pub source_id: i32,
    /// A partition field id that is used to identify a partition field and is unique within a partition spec.
    pub field_id: i32,
    /// A partition name.
    #[builder(setter(into))]
    pub name: String,
    /// A transform that is applied to the source column to produce a partition value.
    pub transform: Transform,
}

/// Partition spec that defines how to produce a tuple of partition values from a record.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Default)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSpec {
    /// Identifier for PartitionSpec
    pub(crate) spec_id: i32,
    /// Details of the partition spec
    pub(crate) fields: Vec<PartitionField>,
}

impl PartitionSpec {
    /// Create partition spec builder
    pub fn builder() -> PartitionSpecBuilder {
        PartitionSpecBuilder::default()
    }

    /// The spec with no partition fields.
    pub fn unpartition_spec() -> Self {
        Self::default()
    }

    /// Spec id of the partition spec
    pub fn spec_id(&self) -> i32 {
        self.spec_id
    }

    /// Fields of the partition spec
    pub fn fields(&self) -> &[PartitionField] {
        &self.fields
    }

    /// Returns if the partition spec is unpartitioned.
    ///
    /// A [`PartitionSpec`] is unpartitioned if it has no fields or all fields are [`Transform::Void`] transform.
    pub fn is_unpartitioned(&self) -> bool {
        self.fields.is_empty() || self.fields.iter().all(|f| f.transform == Transform::Void)
    }

    /// Returns the partition type of this partition spec.
    ///
    /// One optional field per partition field, in spec order, carrying the
    /// partition field id and name and typed by the transform's result type.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::SchemaProjection`] when a source column is missing or not
    /// primitive, when a transform does not apply to its source type, or when
    /// two partition fields share a field id or a name.
    pub fn partition_type(&self, schema: &Schema) -> Result<StructType> {
        let mut ids = HashSet::with_capacity(self.fields.len());
        let mut names = HashSet::with_capacity(self.fields.len());
        let mut fields = Vec::with_capacity(self.fields.len());

        for partition_field in &self.fields {
            if !ids.insert(partition_field.field_id) {
                return Err(Error::new(
                    ErrorKind::SchemaProjection,
                    format!(
                        "Partition field id {} is used by more than one partition field",
                        partition_field.field_id
                    ),
                )
                .with_context("spec_id", self.spec_id.to_string()));
            }
            if !names.insert(partition_field.name.as_str()) {
                return Err(Error::new(
                    ErrorKind::SchemaProjection,
                    format!(
                        "Partition field name '{}' is used by more than one partition field",
                        partition_field.name
                    ),
                )
                .with_context("spec_id", self.spec_id.to_string()));
            }

            let source = schema.field_by_id(partition_field.source_id).ok_or_else(|| {
                Error::new(
                    ErrorKind::SchemaProjection,
                    format!(
                        "No column with source column id {} in schema {}",
                        partition_field.source_id,
                        schema.schema_id()
                    ),
                )
                .with_context("partition_field", partition_field.name.clone())
            })?;
            if !source.field_type.is_primitive() {
                return Err(Error::new(
                    ErrorKind::SchemaProjection,
                    format!(
                        "Cannot partition by non-primitive source field {}: {}",
                        source.name, source.field_type
                    ),
                )
                .with_context("partition_field", partition_field.name.clone()));
            }

            let res_type = partition_field
                .transform
                .result_type(&source.field_type)
                .map_err(|err| err.with_context("partition_field", partition_field.name.clone()))?;
            fields.push(
                NestedField::optional(partition_field.field_id, &partition_field.name, res_type)
                    .into(),
            );
        }
        Ok(StructType::new(fields))
    }
}

/// Create a new [`PartitionSpec`].
///
/// Field ids are assigned in order starting at [`PARTITION_DATA_ID_START`]
/// unless given explicitly. Validation against a schema happens in
/// [`PartitionSpec::partition_type`].
#[derive(Debug, Default)]
pub struct PartitionSpecBuilder {
    spec_id: i32,
    fields: Vec<PartitionField>,
}

impl PartitionSpecBuilder {
    /// Set the spec id.
    pub fn with_spec_id(mut self, spec_id: i32) -> Self {
        self.spec_id = spec_id;
        self
    }

    /// Add a partition field with the next free field id.
    pub fn add_partition_field(
        self,
        source_id: i32,
        target_name: impl ToString,
        transform: Transform,
    ) -> Self {
        let field_id = self
            .fields
            .iter()
            .map(|f| f.field_id + 1)
            .max()
            .unwrap_or(PARTITION_DATA_ID_START);
        self.add_unbound_field(PartitionField {
            source_id,
            field_id,
            name: target_name.to_string(),
            transform,
        })
    }

    /// Add a partition field as is.
    pub fn add_unbound_field(mut self, field: PartitionField) -> Self {
        self.fields.push(field);
        self
    }

    /// Build the partition spec.
    pub fn build(self) -> PartitionSpec {
        PartitionSpec {
            spec_id: self.spec_id,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::datatypes::{PrimitiveType, Type};

    fn table_schema_simple() -> Schema {
        Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "id", Type::Primitive(PrimitiveType::Int)).into(),
                NestedField::required(2, "ts", Type::Primitive(PrimitiveType::Timestamptz)).into(),
                NestedField::optional(3, "name", Type::Primitive(PrimitiveType::String)).into(),
                NestedField::optional(
                    4,
                    "location",
                    Type::Struct(StructType::new(vec![NestedField::required(
                        5,
                        "lat",
                        PrimitiveType::Double.into(),
                    )
                    .into()])),
                )
                .into(),
            ])
            .build()
            .unwrap()
    }

    #[test]
    fn test_partition_spec_json() {
        let spec = r#"
        {
            "spec-id": 1,
            "fields": [
                {"source-id": 4, "field-id": 1000, "name": "ts_day", "transform": "day"},
                {"source-id": 1, "field-id": 1001, "name": "id_bucket", "transform": "bucket[16]"},
                {"source-id": 2, "field-id": 1002, "name": "id_truncate", "transform": "truncate[4]"}
            ]
        }
        "#;

        let partition_spec: PartitionSpec = serde_json::from_str(spec).unwrap();
        assert_eq!(partition_spec.spec_id(), 1);
        assert_eq!(partition_spec.fields()[0].field_id, 1000);
        assert_eq!(partition_spec.fields()[1].transform, Transform::Bucket(16));
        assert_eq!(partition_spec.fields()[2].name, "id_truncate");
    }

    #[test]
    fn test_builder_assigns_field_ids() {
        let spec = PartitionSpec::builder()
            .with_spec_id(3)
            .add_partition_field(2, "ts_day", Transform::Day)
            .add_partition_field(1, "id_bucket", Transform::Bucket(4))
            .build();
        let ids: Vec<i32> = spec.fields().iter().map(|f| f.field_id).collect();
        assert_eq!(ids, vec![1000, 1001]);
        assert_eq!(spec.spec_id(), 3);
    }

    #[test]
    fn test_partition_type() {
        let schema = table_schema_simple();
        let spec = PartitionSpec::builder()
            .add_partition_field(2, "ts_day", Transform::Day)
            .add_partition_field(1, "id_bucket", Transform::Bucket(4))
            .add_partition_field(3, "name", Transform::Identity)
            .build();
        let partition_type = spec.partition_type(&schema).unwrap();

        assert_eq!(partition_type.fields().len(), 3);
        let expected = [
            (1000, "ts_day", PrimitiveType::Date),
            (1001, "id_bucket", PrimitiveType::Int),
            (1002, "name", PrimitiveType::String),
        ];
        for (field, (id, name, ty)) in partition_type.fields().iter().zip(expected) {
            assert_eq!(field.id, id);
            assert_eq!(field.name, name);
            assert!(!field.required);
            assert_eq!(*field.field_type, Type::Primitive(ty));
        }
    }

    #[test]
    fn test_partition_type_errors() {
        let schema = table_schema_simple();

        let missing = PartitionSpec::builder()
            .add_partition_field(42, "missing", Transform::Identity)
            .build();
        assert_eq!(
            missing.partition_type(&schema).unwrap_err().kind(),
            ErrorKind::SchemaProjection
        );

        let nested = PartitionSpec::builder()
            .add_partition_field(4, "location", Transform::Identity)
            .build();
        assert_eq!(
            nested.partition_type(&schema).unwrap_err().kind(),
            ErrorKind::SchemaProjection
        );

        let id_collision = PartitionSpec::builder()
            .add_unbound_field(PartitionField {
                source_id: 1,
                field_id: 1000,
                name: "a".to_string(),
                transform: Transform::Identity,
            })
            .add_unbound_field(PartitionField {
                source_id: 3,
                field_id: 1000,
                name: "b".to_string(),
                transform: Transform::Identity,
            })
            .build();
        assert_eq!(
            id_collision.partition_type(&schema).unwrap_err().kind(),
            ErrorKind::SchemaProjection
        );

        let name_collision = PartitionSpec::builder()
            .add_partition_field(1, "p", Transform::Identity)
            .add_partition_field(3, "p", Transform::Identity)
            .build();
        assert_eq!(
            name_collision.partition_type(&schema).unwrap_err().kind(),
            ErrorKind::SchemaProjection
        );
    }

    #[test]
    fn test_unpartitioned() {
        assert!(PartitionSpec::unpartition_spec().is_unpartitioned());
        let void_only = PartitionSpec::builder()
            .add_partition_field(1, "id_void", Transform::Void)
            .build();
        assert!(void_only.is_unpartitioned());
        assert_eq!(
            void_only
                .partition_type(&table_schema_simple())
                .unwrap()
                .fields()
                .len(),
            1
        );
    }
}
