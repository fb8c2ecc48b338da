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

use std::io::Cursor;
use std::iter::FusedIterator;

use apache_avro::types::Value;
use apache_avro::Reader as AvroReader;
use bytes::Bytes;
use tracing::debug;

use super::data_file::{DataContentType, DataFile};
use super::entry::{ManifestEntry, ManifestStatus};
use super::metadata::ManifestMetadata;
use super::projection::{
    DataFileField, EncodingSchema, EntryField, MatchedRecord, DATA_FILE_FIELDS,
    MANIFEST_ENTRY_FIELDS, MANIFEST_ENTRY_RECORD_NAME,
};
use crate::avro::value::{
    to_array, to_bytes, to_count, to_int, to_int_map, to_long, to_record, to_string,
    unwrap_union, value_to_datum,
};
use crate::avro::{ContainerHeader, RecordLayout};
use crate::codec::CompressionCodec;
use crate::io::InputFile;
use crate::spec::{FormatVersion, StatsMap, Struct, StructType};
use crate::{Error, ErrorKind, Result};

/// Reads the entries of a finished manifest.
///
/// Everything needed to decode the file comes from the file itself: format
/// version, table schema and partition spec from the header metadata, codec
/// from `avro.codec`, and field ids from the writer's avro schema.
#[derive(Debug)]
pub struct ManifestReader {
    bytes: Bytes,
    metadata: ManifestMetadata,
    codec: CompressionCodec,
    decoder: EntryDecoder,
}

impl ManifestReader {
    /// Read `input` and prepare to decode its entries.
    pub async fn open(input: &InputFile) -> Result<Self> {
        let bytes = input.read().await?;
        let reader = Self::try_new(bytes)
            .map_err(|err| err.with_context("path", input.location().to_string()))?;
        debug!(
            path = %input.location(),
            format_version = %reader.metadata.format_version,
            codec = %reader.codec,
            "opened manifest"
        );
        Ok(reader)
    }

    /// Prepare to decode the entries of the manifest held in `bytes`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::DataInvalid`] when `bytes` is not an avro container or
    ///   its metadata lacks the schema or the partition spec.
    /// - [`ErrorKind::UnsupportedFormatVersion`] for format versions other
    ///   than 1 and 2.
    /// - [`ErrorKind::CodecUnavailable`] when the codec of the file is not
    ///   available.
    pub fn try_new(bytes: Bytes) -> Result<Self> {
        let header = ContainerHeader::read(&bytes)?;
        let codec = header.codec()?;
        let metadata = ManifestMetadata::parse(&header)?;
        let encoding = EncodingSchema::project(
            &metadata.schema,
            &metadata.partition_spec,
            metadata.format_version,
        )?;
        let layout = RecordLayout::parse(&header.schema_json()?)?;

        let decoder = EntryDecoder {
            format_version: metadata.format_version,
            partition_spec_id: metadata.partition_spec.spec_id(),
            partition_type: encoding.partition_type().clone(),
            layout,
        };
        Ok(Self {
            bytes,
            metadata,
            codec,
            decoder,
        })
    }

    /// Metadata from the manifest header.
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Codec the manifest was written with.
    pub fn codec(&self) -> CompressionCodec {
        self.codec
    }

    /// Lazily decode the entries, in file order.
    pub fn entries(self) -> Result<ManifestEntryIter> {
        let inner = AvroReader::new(Cursor::new(self.bytes))?;
        Ok(ManifestEntryIter {
            inner: Some(inner),
            decoder: self.decoder,
        })
    }

    /// Decode every entry, keeping the metadata.
    pub fn read_all(self) -> Result<(ManifestMetadata, Vec<ManifestEntry>)> {
        let metadata = self.metadata.clone();
        let entries = self.entries()?.collect::<Result<Vec<_>>>()?;
        Ok((metadata, entries))
    }
}

/// Single-pass iterator over the entries of a manifest.
///
/// Decoding stops at the first error: the error is yielded once and the
/// iterator is exhausted after it.
pub struct ManifestEntryIter {
    inner: Option<AvroReader<'static, Cursor<Bytes>>>,
    decoder: EntryDecoder,
}

impl Iterator for ManifestEntryIter {
    type Item = Result<ManifestEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = match self.inner.as_mut()?.next() {
            Some(next) => next,
            None => {
                self.inner = None;
                return None;
            }
        };
        let entry = next
            .map_err(|err| {
                Error::new(ErrorKind::MalformedEntry, "Failed to decode manifest entry")
                    .with_source(err)
            })
            .and_then(|value| self.decoder.decode(value));
        if entry.is_err() {
            self.inner = None;
        }
        Some(entry)
    }
}

impl FusedIterator for ManifestEntryIter {}

#[derive(Debug)]
struct EntryDecoder {
    format_version: FormatVersion,
    partition_spec_id: i32,
    partition_type: StructType,
    layout: RecordLayout,
}

impl EntryDecoder {
    fn decode(&self, value: Value) -> Result<ManifestEntry> {
        let mut record = MatchedRecord::match_fields(
            MANIFEST_ENTRY_RECORD_NAME,
            MANIFEST_ENTRY_FIELDS,
            self.format_version,
            &self.layout,
            value,
        )?;

        let status = ManifestStatus::try_from(to_int(
            record.take_required(EntryField::Status, "status")?,
            "status",
        )?)?;
        let snapshot_id = match self.format_version {
            FormatVersion::V1 => Some(to_long(
                record.take_required(EntryField::SnapshotId, "snapshot_id")?,
                "snapshot_id",
            )?),
            FormatVersion::V2 => record
                .take_value(EntryField::SnapshotId)
                .map(|v| to_long(v, "snapshot_id"))
                .transpose()?,
        };
        let sequence_number = record
            .take_value(EntryField::SequenceNumber)
            .map(|v| to_long(v, "sequence_number"))
            .transpose()?;
        let file_sequence_number = record
            .take_value(EntryField::FileSequenceNumber)
            .map(|v| to_long(v, "file_sequence_number"))
            .transpose()?;

        let (data_file, layout) = record.take(EntryField::DataFile).ok_or_else(|| {
            Error::new(ErrorKind::MalformedEntry, "Field 'data_file' is null")
        })?;
        let layout = layout.ok_or_else(|| {
            Error::new(
                ErrorKind::MalformedEntry,
                "Field 'data_file' is not a record in the writer schema",
            )
        })?;
        let data_file = self.decode_data_file(data_file, layout)?;

        Ok(ManifestEntry {
            status,
            snapshot_id,
            sequence_number,
            file_sequence_number,
            data_file,
        })
    }

    fn decode_data_file(&self, value: Value, layout: &RecordLayout) -> Result<DataFile> {
        let mut record = MatchedRecord::match_fields(
            "r2",
            DATA_FILE_FIELDS,
            self.format_version,
            layout,
            value,
        )?;

        // Version 1 only tracks data files.
        let content = match self.format_version {
            FormatVersion::V1 => DataContentType::Data,
            FormatVersion::V2 => DataContentType::try_from(to_int(
                record.take_required(DataFileField::Content, "content")?,
                "content",
            )?)?,
        };
        let file_path = to_string(
            record.take_required(DataFileField::FilePath, "file_path")?,
            "file_path",
        )?;
        let file_format = to_string(
            record.take_required(DataFileField::FileFormat, "file_format")?,
            "file_format",
        )?
        .parse()?;
        let (partition, partition_layout) =
            record.take(DataFileField::Partition).ok_or_else(|| {
                Error::new(ErrorKind::MalformedEntry, "Field 'partition' is null")
            })?;
        let partition = self.decode_partition(partition, partition_layout)?;
        let record_count = to_count(
            record.take_required(DataFileField::RecordCount, "record_count")?,
            "record_count",
        )?;
        let file_size_in_bytes = to_count(
            record.take_required(DataFileField::FileSizeInBytes, "file_size_in_bytes")?,
            "file_size_in_bytes",
        )?;

        Ok(DataFile {
            content,
            file_path,
            file_format,
            partition,
            record_count,
            file_size_in_bytes,
            column_sizes: take_counts(&mut record, DataFileField::ColumnSizes, "column_sizes")?,
            value_counts: take_counts(&mut record, DataFileField::ValueCounts, "value_counts")?,
            null_value_counts: take_counts(
                &mut record,
                DataFileField::NullValueCounts,
                "null_value_counts",
            )?,
            nan_value_counts: take_counts(
                &mut record,
                DataFileField::NanValueCounts,
                "nan_value_counts",
            )?,
            lower_bounds: take_bounds(&mut record, DataFileField::LowerBounds, "lower_bounds")?,
            upper_bounds: take_bounds(&mut record, DataFileField::UpperBounds, "upper_bounds")?,
            key_metadata: record
                .take_value(DataFileField::KeyMetadata)
                .map(|v| to_bytes(v, "key_metadata"))
                .transpose()?,
            split_offsets: record
                .take_value(DataFileField::SplitOffsets)
                .map(|v| {
                    to_array(v, "split_offsets")?
                        .into_iter()
                        .map(|offset| to_long(offset, "split_offsets"))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?
                .unwrap_or_default(),
            equality_ids: record
                .take_value(DataFileField::EqualityIds)
                .map(|v| {
                    to_array(v, "equality_ids")?
                        .into_iter()
                        .map(|id| to_int(id, "equality_ids"))
                        .collect::<Result<Vec<_>>>()
                })
                .transpose()?,
            sort_order_id: record
                .take_value(DataFileField::SortOrderId)
                .map(|v| to_int(v, "sort_order_id"))
                .transpose()?,
            partition_spec_id: self.partition_spec_id,
        })
    }

    /// Partition values are matched to the partition spec by field id, or by
    /// position when the writer schema has no ids.
    fn decode_partition(&self, value: Value, layout: Option<&RecordLayout>) -> Result<Struct> {
        let expected = self.partition_type.fields();
        let mut values: Vec<Option<Value>> = to_record(value, "partition")?
            .into_iter()
            .map(|(_, v)| Some(v))
            .collect();
        if values.len() != expected.len() {
            return Err(Error::new(
                ErrorKind::MalformedEntry,
                format!(
                    "Partition tuple has {} values, partition spec {} has {} fields",
                    values.len(),
                    self.partition_spec_id,
                    expected.len()
                ),
            ));
        }

        expected
            .iter()
            .enumerate()
            .map(|(pos, field)| {
                let idx = layout
                    .and_then(|layout| {
                        layout
                            .fields
                            .iter()
                            .position(|f| f.field_id == Some(field.id))
                    })
                    .unwrap_or(pos);
                let value = values.get_mut(idx).and_then(Option::take).ok_or_else(|| {
                    Error::new(
                        ErrorKind::MalformedEntry,
                        format!("Partition field '{}' has no value", field.name),
                    )
                })?;
                let ty = field.field_type.as_primitive_type().ok_or_else(|| {
                    Error::new(
                        ErrorKind::MalformedEntry,
                        format!("Partition field '{}' is not primitive", field.name),
                    )
                })?;
                unwrap_union(value)
                    .map(|value| value_to_datum(value, ty, &field.name))
                    .transpose()
            })
            .collect()
    }
}

fn take_counts(
    record: &mut MatchedRecord<'_, DataFileField>,
    field: DataFileField,
    name: &str,
) -> Result<StatsMap<i32, u64>> {
    Ok(record
        .take_value(field)
        .map(|v| to_int_map(v, name, |v| to_count(v, name)))
        .transpose()?
        .unwrap_or_default())
}

fn take_bounds(
    record: &mut MatchedRecord<'_, DataFileField>,
    field: DataFileField,
    name: &str,
) -> Result<StatsMap<i32, Vec<u8>>> {
    Ok(record
        .take_value(field)
        .map(|v| to_int_map(v, name, |v| to_bytes(v, name)))
        .transpose()?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use apache_avro::{Codec, Writer};
    use serde_json::json;

    use super::*;
    use crate::spec::manifest::{
        DataFileBuilder, DataFileFormat, ManifestWriterBuilder,
    };
    use crate::spec::{Datum, NestedField, PartitionSpec, PrimitiveType, Schema, Transform};
    use crate::io::FileIOBuilder;

    fn schema() -> Schema {
        Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "id", PrimitiveType::Long.into()).into(),
                NestedField::optional(2, "category", PrimitiveType::String.into()).into(),
            ])
            .build()
            .unwrap()
    }

    fn spec() -> PartitionSpec {
        PartitionSpec::builder()
            .add_partition_field(2, "category", Transform::Identity)
            .build()
    }

    async fn write_entries(version: FormatVersion, count: usize) -> Bytes {
        let io = FileIOBuilder::new_memory_io().build().unwrap();
        let output = io.new_output("memory://m/entries.avro").unwrap();
        let builder = ManifestWriterBuilder::new(output.clone(), Some(10), None, schema(), spec());
        let mut writer = match version {
            FormatVersion::V1 => builder.build_v1().unwrap(),
            FormatVersion::V2 => builder.build_v2_data().unwrap(),
        };
        for i in 0..count {
            let data_file = DataFileBuilder::default()
                .file_path(format!("memory://data/{i}.parquet"))
                .file_format(DataFileFormat::Parquet)
                .record_count(i as u64)
                .file_size_in_bytes(100)
                .partition(Struct::from_iter([Some(Datum::string(format!("c{i}")))]))
                .build()
                .unwrap();
            writer.add_file(data_file, Some(3)).unwrap();
        }
        writer.write_manifest_file().await.unwrap();
        output.to_input_file().read().await.unwrap()
    }

    #[tokio::test]
    async fn test_entries_are_lazy_and_ordered() {
        let bytes = write_entries(FormatVersion::V2, 3).await;
        let reader = ManifestReader::try_new(bytes).unwrap();
        assert_eq!(reader.metadata().format_version(), FormatVersion::V2);
        let mut entries = reader.entries().unwrap();
        let first = entries.next().unwrap().unwrap();
        assert_eq!(first.file_path(), "memory://data/0.parquet");
        assert_eq!(first.sequence_number(), Some(3));
        assert_eq!(entries.count(), 2);
    }

    #[tokio::test]
    async fn test_v1_entries_have_no_sequence_numbers() {
        let bytes = write_entries(FormatVersion::V1, 1).await;
        let reader = ManifestReader::try_new(bytes).unwrap();
        assert_eq!(reader.metadata().format_version(), FormatVersion::V1);
        let (_, entries) = reader.read_all().unwrap();
        assert_eq!(entries[0].content_type(), DataContentType::Data);
        assert_eq!(entries[0].sequence_number(), None);
        assert_eq!(entries[0].file_sequence_number(), None);
        assert_eq!(entries[0].snapshot_id(), Some(10));
    }

    #[test]
    fn test_not_a_manifest() {
        let err = ManifestReader::try_new(Bytes::from_static(b"not avro")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    /// A hand-written format version 1 manifest holding a single entry.
    ///
    /// `partition_fields` declares the partition record; `extra_fields` are
    /// appended to the fields of `data_file`.
    fn hand_written_manifest(
        schema: &Schema,
        spec: &PartitionSpec,
        partition_fields: Vec<serde_json::Value>,
        extra_fields: Vec<serde_json::Value>,
        partition: Vec<(String, Value)>,
        extra: Vec<(String, Value)>,
    ) -> Vec<u8> {
        let mut data_file_fields = vec![
            json!({"name": "file_path", "type": "string", "field-id": 100}),
            json!({"name": "file_format", "type": "string", "field-id": 101}),
            json!({"name": "partition", "field-id": 102, "type": {
                "type": "record",
                "name": "r102",
                "fields": partition_fields
            }}),
            json!({"name": "record_count", "type": "long", "field-id": 103}),
            json!({"name": "file_size_in_bytes", "type": "long", "field-id": 104}),
            json!({"name": "block_size_in_bytes", "type": "long", "field-id": 105}),
        ];
        data_file_fields.extend(extra_fields);
        let avro_schema = apache_avro::Schema::parse_str(
            &json!({
                "type": "record",
                "name": "manifest_entry",
                "fields": [
                    {"name": "status", "type": "int", "field-id": 0},
                    {"name": "snapshot_id", "type": "long", "field-id": 1},
                    {"name": "data_file", "field-id": 2, "type": {
                        "type": "record",
                        "name": "r2",
                        "fields": data_file_fields
                    }}
                ]
            })
            .to_string(),
        )
        .unwrap();

        let mut writer = Writer::with_codec(&avro_schema, Vec::new(), Codec::Null);
        writer
            .add_user_metadata("schema".to_string(), serde_json::to_string(schema).unwrap())
            .unwrap();
        writer
            .add_user_metadata(
                "partition-spec".to_string(),
                serde_json::to_string(spec.fields()).unwrap(),
            )
            .unwrap();
        writer.add_user_metadata("format-version".to_string(), "1").unwrap();

        let mut data_file = vec![
            ("file_path".to_string(), Value::String("a.parquet".to_string())),
            ("file_format".to_string(), Value::String("PARQUET".to_string())),
            ("partition".to_string(), Value::Record(partition)),
            ("record_count".to_string(), Value::Long(1)),
            ("file_size_in_bytes".to_string(), Value::Long(1)),
            ("block_size_in_bytes".to_string(), Value::Long(1)),
        ];
        data_file.extend(extra);
        writer
            .append(Value::Record(vec![
                ("status".to_string(), Value::Int(1)),
                ("snapshot_id".to_string(), Value::Long(1)),
                ("data_file".to_string(), Value::Record(data_file)),
            ]))
            .unwrap();
        writer.into_inner().unwrap()
    }

    fn null() -> Value {
        Value::Union(0, Box::new(Value::Null))
    }

    fn first_entry_error(bytes: Vec<u8>) -> ErrorKind {
        let reader = ManifestReader::try_new(Bytes::from(bytes)).unwrap();
        let mut entries = reader.entries().unwrap();
        let kind = entries.next().unwrap().unwrap_err().kind();
        assert!(entries.next().is_none());
        kind
    }

    /// Partition record with two values while the partition spec has one
    /// field.
    fn manifest_with_wide_partition() -> Vec<u8> {
        hand_written_manifest(
            &schema(),
            &spec(),
            vec![
                json!({"name": "a", "type": ["null", "string"], "field-id": 1000}),
                json!({"name": "b", "type": ["null", "string"], "field-id": 1001}),
            ],
            vec![],
            vec![("a".to_string(), null()), ("b".to_string(), null())],
            vec![],
        )
    }

    #[test]
    fn test_partition_arity_mismatch_stops_decoding() {
        assert_eq!(
            first_entry_error(manifest_with_wide_partition()),
            ErrorKind::MalformedEntry
        );
    }

    #[test]
    fn test_duplicate_stats_key_is_malformed() {
        let count = |key, value| {
            Value::Record(vec![
                ("key".to_string(), Value::Int(key)),
                ("value".to_string(), Value::Long(value)),
            ])
        };
        let bytes = hand_written_manifest(
            &schema(),
            &spec(),
            vec![json!({"name": "category", "type": ["null", "string"], "field-id": 1000})],
            vec![json!({"name": "value_counts", "field-id": 109, "type": ["null", {
                "type": "array",
                "logicalType": "map",
                "items": {
                    "type": "record",
                    "name": "k119_v120",
                    "fields": [
                        {"name": "key", "type": "int", "field-id": 119},
                        {"name": "value", "type": "long", "field-id": 120}
                    ]
                }
            }]})],
            vec![("category".to_string(), null())],
            vec![(
                "value_counts".to_string(),
                Value::Union(1, Box::new(Value::Array(vec![count(1, 4), count(1, 5)]))),
            )],
        );
        assert_eq!(first_entry_error(bytes), ErrorKind::MalformedEntry);
    }

    #[test]
    fn test_time_partition_outside_a_day_is_malformed() {
        let schema = Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "t", PrimitiveType::Time.into()).into(),
            ])
            .build()
            .unwrap();
        let spec = PartitionSpec::builder()
            .add_partition_field(1, "t", Transform::Identity)
            .build();
        let bytes = hand_written_manifest(
            &schema,
            &spec,
            vec![json!({"name": "t", "field-id": 1000, "type": [
                "null",
                {"type": "long", "logicalType": "time-micros"}
            ]})],
            vec![],
            vec![(
                "t".to_string(),
                Value::Union(1, Box::new(Value::TimeMicros(-1))),
            )],
            vec![],
        );
        assert_eq!(first_entry_error(bytes), ErrorKind::MalformedEntry);
    }
}
