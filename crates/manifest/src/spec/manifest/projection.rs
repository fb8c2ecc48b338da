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

//! Field tables of manifest records and the encoding schema derived from
//! them for one table schema, partition spec and format version.
//!
//! Each record type has a static table of [`ManifestFieldDef`]s giving the
//! field id, name, type and presence per format version. Writers encode and
//! readers decode by walking these tables, so the field-presence matrix
//! lives in one place.

use apache_avro::types::Value;
use apache_avro::Schema as AvroSchema;

use crate::avro::{schema_to_avro_schema, RecordLayout};
use crate::spec::{
    FormatVersion, ListType, MapType, NestedField, PartitionSpec, PrimitiveType, Schema,
    StructType, Type,
};
use crate::{Error, ErrorKind, Result};

/// Avro record name of manifest entries.
pub const MANIFEST_ENTRY_RECORD_NAME: &str = "manifest_entry";

/// Field id of `data_file` in a manifest entry.
pub const DATA_FILE_FIELD_ID: i32 = 2;
/// Field id of `partition` in a data file.
pub const PARTITION_FIELD_ID: i32 = 102;

/// Whether a field exists in a given format version, and if so whether it
/// may be null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Not part of the record.
    Absent,
    /// Part of the record, may be null.
    Optional,
    /// Part of the record, never null.
    Required,
}

/// Type of a manifest record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFieldType {
    /// A primitive value.
    Primitive(PrimitiveType),
    /// Map from field id (int) to a primitive value, stored as an array of
    /// key/value records.
    IntMap {
        /// Id of the key field.
        key_id: i32,
        /// Id of the value field.
        value_id: i32,
        /// Type of the values.
        value: PrimitiveType,
    },
    /// List of required primitive elements.
    List {
        /// Id of the element field.
        element_id: i32,
        /// Type of the elements.
        element: PrimitiveType,
    },
    /// A nested type supplied by the caller, such as the partition tuple
    /// whose type depends on the table.
    Record,
}

/// One row of a record's static field table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManifestFieldDef<F> {
    /// Which field this is.
    pub field: F,
    /// Field id.
    pub id: i32,
    /// Field name.
    pub name: &'static str,
    /// Name used by format version 1 when it differs.
    pub v1_name: Option<&'static str>,
    /// Field type.
    pub field_type: ManifestFieldType,
    /// Presence in format version 1.
    pub v1: Presence,
    /// Presence in format version 2.
    pub v2: Presence,
}

impl<F> ManifestFieldDef<F> {
    /// Presence of this field in `version`.
    pub fn presence(&self, version: FormatVersion) -> Presence {
        match version {
            FormatVersion::V1 => self.v1,
            FormatVersion::V2 => self.v2,
        }
    }

    /// Name of this field in `version`.
    pub fn name_for(&self, version: FormatVersion) -> &'static str {
        match (version, self.v1_name) {
            (FormatVersion::V1, Some(name)) => name,
            _ => self.name,
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.v1_name == Some(name)
    }

    /// The same field, named `v1_name` in format version 1.
    pub(crate) const fn renamed_in_v1(mut self, v1_name: &'static str) -> Self {
        self.v1_name = Some(v1_name);
        self
    }
}

pub(crate) const fn def<F>(
    field: F,
    id: i32,
    name: &'static str,
    field_type: ManifestFieldType,
    v1: Presence,
    v2: Presence,
) -> ManifestFieldDef<F> {
    ManifestFieldDef {
        field,
        id,
        name,
        v1_name: None,
        field_type,
        v1,
        v2,
    }
}

/// Fields of a manifest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryField {
    /// `status`
    Status,
    /// `snapshot_id`
    SnapshotId,
    /// `sequence_number`
    SequenceNumber,
    /// `file_sequence_number`
    FileSequenceNumber,
    /// `data_file`
    DataFile,
}

/// Fields of a data file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFileField {
    /// `content`
    Content,
    /// `file_path`
    FilePath,
    /// `file_format`
    FileFormat,
    /// `partition`
    Partition,
    /// `record_count`
    RecordCount,
    /// `file_size_in_bytes`
    FileSizeInBytes,
    /// `block_size_in_bytes`
    BlockSizeInBytes,
    /// `column_sizes`
    ColumnSizes,
    /// `value_counts`
    ValueCounts,
    /// `null_value_counts`
    NullValueCounts,
    /// `nan_value_counts`
    NanValueCounts,
    /// `lower_bounds`
    LowerBounds,
    /// `upper_bounds`
    UpperBounds,
    /// `key_metadata`
    KeyMetadata,
    /// `split_offsets`
    SplitOffsets,
    /// `equality_ids`
    EqualityIds,
    /// `sort_order_id`
    SortOrderId,
}

use ManifestFieldType::{IntMap, List, Primitive, Record};
use Presence::{Absent, Optional, Required};

/// Field table of `manifest_entry`, in encoding order.
#[rustfmt::skip]
pub const MANIFEST_ENTRY_FIELDS: &[ManifestFieldDef<EntryField>] = &[
    def(EntryField::Status, 0, "status", Primitive(PrimitiveType::Int), Required, Required),
    def(EntryField::SnapshotId, 1, "snapshot_id", Primitive(PrimitiveType::Long), Required, Optional),
    def(EntryField::SequenceNumber, 3, "sequence_number", Primitive(PrimitiveType::Long), Absent, Optional),
    def(EntryField::FileSequenceNumber, 4, "file_sequence_number", Primitive(PrimitiveType::Long), Absent, Optional),
    def(EntryField::DataFile, DATA_FILE_FIELD_ID, "data_file", Record, Required, Required),
];

/// Field table of `data_file` (`r2`), in encoding order.
#[rustfmt::skip]
pub const DATA_FILE_FIELDS: &[ManifestFieldDef<DataFileField>] = &[
    def(DataFileField::Content, 134, "content", Primitive(PrimitiveType::Int), Absent, Required),
    def(DataFileField::FilePath, 100, "file_path", Primitive(PrimitiveType::String), Required, Required),
    def(DataFileField::FileFormat, 101, "file_format", Primitive(PrimitiveType::String), Required, Required),
    def(DataFileField::Partition, PARTITION_FIELD_ID, "partition", Record, Required, Required),
    def(DataFileField::RecordCount, 103, "record_count", Primitive(PrimitiveType::Long), Required, Required),
    def(DataFileField::FileSizeInBytes, 104, "file_size_in_bytes", Primitive(PrimitiveType::Long), Required, Required),
    def(DataFileField::BlockSizeInBytes, 105, "block_size_in_bytes", Primitive(PrimitiveType::Long), Required, Absent),
    def(DataFileField::ColumnSizes, 108, "column_sizes", IntMap { key_id: 117, value_id: 118, value: PrimitiveType::Long }, Optional, Optional),
    def(DataFileField::ValueCounts, 109, "value_counts", IntMap { key_id: 119, value_id: 120, value: PrimitiveType::Long }, Optional, Optional),
    def(DataFileField::NullValueCounts, 110, "null_value_counts", IntMap { key_id: 121, value_id: 122, value: PrimitiveType::Long }, Optional, Optional),
    def(DataFileField::NanValueCounts, 137, "nan_value_counts", IntMap { key_id: 138, value_id: 139, value: PrimitiveType::Long }, Optional, Optional),
    def(DataFileField::LowerBounds, 125, "lower_bounds", IntMap { key_id: 126, value_id: 127, value: PrimitiveType::Binary }, Optional, Optional),
    def(DataFileField::UpperBounds, 128, "upper_bounds", IntMap { key_id: 129, value_id: 130, value: PrimitiveType::Binary }, Optional, Optional),
    def(DataFileField::KeyMetadata, 131, "key_metadata", Primitive(PrimitiveType::Binary), Optional, Optional),
    def(DataFileField::SplitOffsets, 132, "split_offsets", List { element_id: 133, element: PrimitiveType::Long }, Optional, Optional),
    def(DataFileField::EqualityIds, 135, "equality_ids", List { element_id: 136, element: PrimitiveType::Int }, Absent, Optional),
    def(DataFileField::SortOrderId, 140, "sort_order_id", Primitive(PrimitiveType::Int), Optional, Optional),
];

/// Iceberg struct type of the fields of `defs` present in `version`.
///
/// `record_type` supplies the type of [`ManifestFieldType::Record`] fields.
pub(crate) fn struct_type_of<F: Copy>(
    defs: &[ManifestFieldDef<F>],
    version: FormatVersion,
    mut record_type: impl FnMut(F) -> Result<Type>,
) -> Result<StructType> {
    let mut fields = Vec::with_capacity(defs.len());
    for def in defs {
        let field_type = match def.field_type {
            Primitive(ty) => Type::Primitive(ty),
            IntMap {
                key_id,
                value_id,
                value,
            } => Type::Map(MapType::new(
                NestedField::map_key_element(key_id, PrimitiveType::Int.into()).into(),
                NestedField::map_value_element(value_id, value.into(), true).into(),
            )),
            List {
                element_id,
                element,
            } => Type::List(ListType::new(
                NestedField::list_element(element_id, element.into(), true).into(),
            )),
            Record => record_type(def.field)?,
        };
        let name = def.name_for(version);
        match def.presence(version) {
            Absent => continue,
            Optional => fields.push(NestedField::optional(def.id, name, field_type).into()),
            Required => fields.push(NestedField::required(def.id, name, field_type).into()),
        }
    }
    Ok(StructType::new(fields))
}

/// The concrete schema manifests of one table schema, partition spec and
/// format version are encoded with.
#[derive(Debug, Clone)]
pub struct EncodingSchema {
    format_version: FormatVersion,
    partition_type: StructType,
    entry_type: StructType,
    avro_schema: AvroSchema,
}

impl EncodingSchema {
    /// Project `table_schema` and `partition_spec` onto the manifest record
    /// layout of `format_version`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::SchemaProjection`] when the partition spec does not bind
    /// to the schema, see [`PartitionSpec::partition_type`].
    pub fn project(
        table_schema: &Schema,
        partition_spec: &PartitionSpec,
        format_version: FormatVersion,
    ) -> Result<Self> {
        let partition_type = partition_spec.partition_type(table_schema)?;
        let data_file_type = struct_type_of(DATA_FILE_FIELDS, format_version, |_| {
            Ok(Type::Struct(partition_type.clone()))
        })?;
        let entry_type = struct_type_of(MANIFEST_ENTRY_FIELDS, format_version, |_| {
            Ok(Type::Struct(data_file_type.clone()))
        })?;
        let avro_schema = schema_to_avro_schema(MANIFEST_ENTRY_RECORD_NAME, &entry_type)?;
        Ok(Self {
            format_version,
            partition_type,
            entry_type,
            avro_schema,
        })
    }

    /// Format version this schema encodes.
    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }

    /// Struct type of partition tuples, one optional field per partition field.
    pub fn partition_type(&self) -> &StructType {
        &self.partition_type
    }

    /// Struct type of `manifest_entry`.
    pub fn entry_type(&self) -> &StructType {
        &self.entry_type
    }

    /// Struct type of `data_file`.
    pub fn data_file_type(&self) -> Option<&StructType> {
        self.entry_type
            .field_by_id(DATA_FILE_FIELD_ID)
            .and_then(|field| field.field_type.as_struct_type())
    }

    /// The avro schema entries are written with.
    pub fn avro_schema(&self) -> &AvroSchema {
        &self.avro_schema
    }

    /// Entry fields present in this format version.
    pub fn entry_fields(&self) -> impl Iterator<Item = &'static ManifestFieldDef<EntryField>> {
        present_fields(MANIFEST_ENTRY_FIELDS, self.format_version)
    }

    /// Data file fields present in this format version.
    pub fn data_file_fields(
        &self,
    ) -> impl Iterator<Item = &'static ManifestFieldDef<DataFileField>> {
        present_fields(DATA_FILE_FIELDS, self.format_version)
    }
}

/// Shorthand for [`EncodingSchema::project`].
pub fn project(
    table_schema: &Schema,
    partition_spec: &PartitionSpec,
    format_version: FormatVersion,
) -> Result<EncodingSchema> {
    EncodingSchema::project(table_schema, partition_spec, format_version)
}

pub(crate) fn present_fields<F>(
    defs: &'static [ManifestFieldDef<F>],
    version: FormatVersion,
) -> impl Iterator<Item = &'static ManifestFieldDef<F>> {
    defs.iter().filter(move |def| def.presence(version) != Absent)
}

/// Fields of one decoded avro record, matched to a field table.
///
/// Values keep the layout of their nested record, if any, so that nested
/// records can be matched the same way.
pub(crate) struct MatchedRecord<'a, F> {
    record: &'static str,
    values: Vec<(F, Value, Option<&'a RecordLayout>)>,
}

impl<'a, F: Copy + PartialEq> MatchedRecord<'a, F> {
    /// Match the fields of `value` against `defs`.
    ///
    /// Fields are matched by field id, or by name when the writer schema
    /// carries no ids. Unknown fields and fields absent from `version` are
    /// skipped. A field that is required in `version` but missing is a
    /// [`ErrorKind::MalformedEntry`].
    pub(crate) fn match_fields(
        record: &'static str,
        defs: &'static [ManifestFieldDef<F>],
        version: FormatVersion,
        layout: &'a RecordLayout,
        value: Value,
    ) -> Result<Self> {
        let fields = crate::avro::value::to_record(value, record)?;
        if fields.len() != layout.fields.len() {
            return Err(Error::new(
                ErrorKind::MalformedEntry,
                format!(
                    "Record '{record}' has {} fields, its schema declares {}",
                    fields.len(),
                    layout.fields.len()
                ),
            ));
        }

        let mut values = Vec::with_capacity(fields.len());
        for ((_, value), field_layout) in fields.into_iter().zip(&layout.fields) {
            let def = match field_layout.field_id {
                Some(id) => defs.iter().find(|def| def.id == id),
                None => defs.iter().find(|def| def.matches_name(&field_layout.name)),
            };
            match def {
                Some(def) if def.presence(version) != Absent => {
                    values.push((def.field, value, field_layout.record.as_ref()))
                }
                _ => continue,
            }
        }

        for def in defs {
            if def.presence(version) == Required
                && !values.iter().any(|(field, _, _)| *field == def.field)
            {
                return Err(Error::new(
                    ErrorKind::MalformedEntry,
                    format!(
                        "Record '{record}' is missing field '{}' required by format version {version}",
                        def.name_for(version)
                    ),
                ));
            }
        }

        Ok(Self { record, values })
    }

    /// Take the value of `field`, `None` when absent or null.
    pub(crate) fn take(&mut self, field: F) -> Option<(Value, Option<&'a RecordLayout>)> {
        let pos = self.values.iter().position(|(f, _, _)| *f == field)?;
        let (_, value, layout) = self.values.swap_remove(pos);
        crate::avro::value::unwrap_union(value).map(|value| (value, layout))
    }

    /// Take the value of `field`, `None` when absent or null.
    pub(crate) fn take_value(&mut self, field: F) -> Option<Value> {
        self.take(field).map(|(value, _)| value)
    }

    /// Take the value of a field that must not be null.
    pub(crate) fn take_required(&mut self, field: F, name: &str) -> Result<Value> {
        self.take_value(field).ok_or_else(|| {
            Error::new(
                ErrorKind::MalformedEntry,
                format!("Field '{name}' of record '{}' is null", self.record),
            )
        })
    }
}
