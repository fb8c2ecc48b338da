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

use apache_avro::types::Value;
use apache_avro::Writer as AvroWriter;
use bytes::Bytes;
use tracing::debug;

use super::data_file::{DataContentType, DataFile};
use super::entry::{ManifestEntry, ManifestStatus};
use super::metadata::ManifestMetadata;
use super::projection::{DataFileField, EncodingSchema, EntryField, Presence};
use crate::avro::sanitize_avro_name;
use crate::avro::value::{datum_to_value, encode_field, from_int_map, optional};
use crate::codec::CompressionCodec;
use crate::io::OutputFile;
use crate::spec::manifest_list::{
    FieldSummary, ManifestContentType, ManifestFile, UNASSIGNED_SEQUENCE_NUMBER,
    UNASSIGNED_SNAPSHOT_ID,
};
use crate::spec::{
    Datum, FormatVersion, PartitionSpec, PrimitiveType, SchemaRef, StatsMap, Struct,
};
use crate::{Error, ErrorKind, Result};

/// Value written to `block_size_in_bytes` of format version 1 manifests.
pub const V1_DEFAULT_BLOCK_SIZE: i64 = 64 * 1024 * 1024;

/// The builder used to create a [`ManifestWriter`].
pub struct ManifestWriterBuilder {
    output: OutputFile,
    snapshot_id: Option<i64>,
    key_metadata: Option<Vec<u8>>,
    schema: SchemaRef,
    partition_spec: PartitionSpec,
    compression: CompressionCodec,
}

impl ManifestWriterBuilder {
    /// Create a new builder. Entries are written uncompressed unless
    /// [`ManifestWriterBuilder::with_compression`] says otherwise.
    pub fn new(
        output: OutputFile,
        snapshot_id: Option<i64>,
        key_metadata: Option<Vec<u8>>,
        schema: impl Into<SchemaRef>,
        partition_spec: PartitionSpec,
    ) -> Self {
        Self {
            output,
            snapshot_id,
            key_metadata,
            schema: schema.into(),
            partition_spec,
            compression: CompressionCodec::default(),
        }
    }

    /// Set the codec applied to the blocks of the manifest.
    pub fn with_compression(mut self, compression: CompressionCodec) -> Self {
        self.compression = compression;
        self
    }

    /// Build a [`ManifestWriter`] for format version 1.
    pub fn build_v1(self) -> Result<ManifestWriter> {
        self.build(FormatVersion::V1, ManifestContentType::Data)
    }

    /// Build a [`ManifestWriter`] for format version 2, data content.
    pub fn build_v2_data(self) -> Result<ManifestWriter> {
        self.build(FormatVersion::V2, ManifestContentType::Data)
    }

    /// Build a [`ManifestWriter`] for format version 2, deletes content.
    pub fn build_v2_deletes(self) -> Result<ManifestWriter> {
        self.build(FormatVersion::V2, ManifestContentType::Deletes)
    }

    fn build(
        self,
        format_version: FormatVersion,
        content: ManifestContentType,
    ) -> Result<ManifestWriter> {
        let encoding =
            EncodingSchema::project(&self.schema, &self.partition_spec, format_version)?;
        // Fail before anything is buffered if the codec is not usable.
        self.compression.to_avro()?;

        debug!(
            path = %self.output.location(),
            %format_version,
            codec = %self.compression,
            spec_id = self.partition_spec.spec_id(),
            "opening manifest writer"
        );

        let partition_stats = encoding
            .partition_type()
            .fields()
            .iter()
            .map(|field| {
                PartitionFieldStats::new(
                    field
                        .field_type
                        .as_primitive_type()
                        .copied()
                        .unwrap_or(PrimitiveType::Binary),
                )
            })
            .collect();
        let metadata = ManifestMetadata {
            schema_id: self.schema.schema_id(),
            schema: self.schema,
            partition_spec: self.partition_spec,
            format_version,
            content,
        };

        Ok(ManifestWriter {
            output: self.output,
            snapshot_id: self.snapshot_id,
            key_metadata: self.key_metadata,
            compression: self.compression,
            metadata,
            encoding,
            records: Vec::new(),
            added_files: 0,
            added_rows: 0,
            existing_files: 0,
            existing_rows: 0,
            deleted_files: 0,
            deleted_rows: 0,
            min_seq_num: None,
            partition_stats,
        })
    }
}

/// A manifest writer.
///
/// Entries are validated and encoded as they are added; nothing reaches the
/// output before [`ManifestWriter::write_manifest_file`], which writes the
/// whole file and closes the output once. Dropping the writer instead leaves
/// no file behind.
pub struct ManifestWriter {
    output: OutputFile,
    snapshot_id: Option<i64>,
    key_metadata: Option<Vec<u8>>,
    compression: CompressionCodec,
    metadata: ManifestMetadata,
    encoding: EncodingSchema,

    records: Vec<Value>,

    added_files: u32,
    added_rows: u64,
    existing_files: u32,
    existing_rows: u64,
    deleted_files: u32,
    deleted_rows: u64,

    min_seq_num: Option<i64>,
    partition_stats: Vec<PartitionFieldStats>,
}

impl ManifestWriter {
    /// Metadata written to the header of the manifest.
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Schema entries are encoded with.
    pub fn encoding_schema(&self) -> &EncodingSchema {
        &self.encoding
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no entry has been added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add an entry as is.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::MalformedEntry`] when the entry does not fit the manifest:
    /// a partition tuple that disagrees with the partition spec, duplicate or
    /// undecodable statistics, content the manifest does not track, or
    /// tracking fields the format version forbids leaving out. The writer is
    /// unchanged on error.
    pub fn add_entry(&mut self, entry: ManifestEntry) -> Result<()> {
        self.check_entry(&entry)
            .map_err(|err| err.with_context("file_path", entry.file_path().to_string()))?;
        let record = self.entry_to_value(&entry)?;
        if !record.validate(self.encoding.avro_schema()) {
            return Err(Error::new(
                ErrorKind::MalformedEntry,
                "Manifest entry does not match the manifest schema",
            )
            .with_context("file_path", entry.file_path().to_string()));
        }

        let rows = entry.data_file.record_count;
        let (files_count, rows_count) = match entry.status {
            ManifestStatus::Added => (&mut self.added_files, &mut self.added_rows),
            ManifestStatus::Existing => (&mut self.existing_files, &mut self.existing_rows),
            ManifestStatus::Deleted => (&mut self.deleted_files, &mut self.deleted_rows),
        };
        let (Some(files), Some(total_rows)) =
            (files_count.checked_add(1), rows_count.checked_add(rows))
        else {
            return Err(malformed(format!(
                "Counts of {:?} entries overflow",
                entry.status
            ))
            .with_context("file_path", entry.file_path().to_string()));
        };
        *files_count = files;
        *rows_count = total_rows;
        if entry.is_alive() {
            if let Some(seq_num) = entry.sequence_number {
                self.min_seq_num = Some(self.min_seq_num.map_or(seq_num, |v| v.min(seq_num)));
            }
        }
        for (stats, value) in self
            .partition_stats
            .iter_mut()
            .zip(entry.data_file.partition.iter())
        {
            stats.update(value);
        }
        self.records.push(record);
        Ok(())
    }

    /// Add a file added by this writer's snapshot.
    ///
    /// `sequence_number` is left unset to be inherited at commit time.
    pub fn add_file(&mut self, data_file: DataFile, sequence_number: Option<i64>) -> Result<()> {
        self.add_entry(ManifestEntry {
            status: ManifestStatus::Added,
            snapshot_id: self.snapshot_id,
            sequence_number,
            file_sequence_number: None,
            data_file,
        })
    }

    /// Add a file deleted by this writer's snapshot.
    pub fn add_delete_file(
        &mut self,
        data_file: DataFile,
        sequence_number: i64,
        file_sequence_number: Option<i64>,
    ) -> Result<()> {
        self.add_entry(ManifestEntry {
            status: ManifestStatus::Deleted,
            snapshot_id: self.snapshot_id,
            sequence_number: Some(sequence_number),
            file_sequence_number,
            data_file,
        })
    }

    /// Add a file carried over from an earlier snapshot.
    pub fn add_existing_file(
        &mut self,
        data_file: DataFile,
        snapshot_id: i64,
        sequence_number: i64,
        file_sequence_number: Option<i64>,
    ) -> Result<()> {
        self.add_entry(ManifestEntry {
            status: ManifestStatus::Existing,
            snapshot_id: Some(snapshot_id),
            sequence_number: Some(sequence_number),
            file_sequence_number,
            data_file,
        })
    }

    /// Add an entry of an earlier manifest as deleted by this writer's snapshot.
    pub fn add_delete_entry(&mut self, mut entry: ManifestEntry) -> Result<()> {
        entry.status = ManifestStatus::Deleted;
        entry.snapshot_id = self.snapshot_id;
        self.add_entry(entry)
    }

    /// Add an entry of an earlier manifest as existing.
    pub fn add_existing_entry(&mut self, mut entry: ManifestEntry) -> Result<()> {
        entry.status = ManifestStatus::Existing;
        self.add_entry(entry)
    }

    /// Write the manifest and close the output, returning its summary for
    /// the manifest list.
    ///
    /// The summary's `sequence_number` is unassigned; the manifest list
    /// writer assigns it when the snapshot commits.
    pub async fn write_manifest_file(self) -> Result<ManifestFile> {
        let ManifestWriter {
            output,
            snapshot_id,
            key_metadata,
            compression,
            metadata,
            encoding,
            records,
            added_files,
            added_rows,
            existing_files,
            existing_rows,
            deleted_files,
            deleted_rows,
            min_seq_num,
            partition_stats,
        } = self;

        let entry_count = records.len();
        let mut avro_writer =
            AvroWriter::with_codec(encoding.avro_schema(), Vec::new(), compression.to_avro()?);
        for (key, value) in metadata.to_header_entries()? {
            avro_writer.add_user_metadata(key.to_string(), value)?;
        }
        for record in records {
            avro_writer.append(record)?;
        }
        let content = avro_writer.into_inner()?;
        let length = content.len();

        let mut writer = output.writer().await?;
        writer.write(Bytes::from(content)).await?;
        writer.close().await?;

        debug!(
            path = %output.location(),
            entries = entry_count,
            bytes = length,
            "wrote manifest"
        );

        Ok(ManifestFile {
            manifest_path: output.location().to_string(),
            manifest_length: i64::try_from(length)?,
            partition_spec_id: metadata.partition_spec.spec_id(),
            content: metadata.content,
            sequence_number: UNASSIGNED_SEQUENCE_NUMBER,
            min_sequence_number: min_seq_num.unwrap_or(UNASSIGNED_SEQUENCE_NUMBER),
            added_snapshot_id: snapshot_id.unwrap_or(UNASSIGNED_SNAPSHOT_ID),
            added_files_count: Some(added_files),
            existing_files_count: Some(existing_files),
            deleted_files_count: Some(deleted_files),
            added_rows_count: Some(added_rows),
            existing_rows_count: Some(existing_rows),
            deleted_rows_count: Some(deleted_rows),
            partitions: Some(
                partition_stats
                    .iter()
                    .map(PartitionFieldStats::to_summary)
                    .collect(),
            ),
            key_metadata,
        })
    }

    fn check_entry(&self, entry: &ManifestEntry) -> Result<()> {
        let data_file = &entry.data_file;
        let version = self.metadata.format_version;

        if data_file.file_path.is_empty() {
            return Err(malformed("Data file path must not be empty"));
        }
        let spec_id = self.metadata.partition_spec.spec_id();
        if data_file.partition_spec_id != spec_id {
            return Err(malformed(format!(
                "Data file of partition spec {} cannot be added to a manifest of spec {spec_id}",
                data_file.partition_spec_id
            )));
        }

        match (self.metadata.content, data_file.content) {
            (ManifestContentType::Data, DataContentType::Data) => {}
            (ManifestContentType::Deletes, DataContentType::PositionDeletes)
            | (ManifestContentType::Deletes, DataContentType::EqualityDeletes) => {}
            (manifest, file) => {
                return Err(malformed(format!(
                    "Cannot add a {file:?} file to a {manifest} manifest"
                )));
            }
        }
        if data_file.content == DataContentType::EqualityDeletes
            && data_file.equality_ids.as_ref().map_or(true, Vec::is_empty)
        {
            return Err(malformed("Equality delete files must carry equality ids"));
        }

        match version {
            FormatVersion::V1 => {
                if entry.snapshot_id.or(self.snapshot_id).is_none() {
                    return Err(malformed(
                        "Format version 1 entries need a snapshot id, from the entry or the writer",
                    ));
                }
            }
            FormatVersion::V2 => {
                if entry.sequence_number.is_none() {
                    if entry.status != ManifestStatus::Added {
                        return Err(malformed(format!(
                            "{:?} entries must carry a data sequence number",
                            entry.status
                        )));
                    }
                    if entry.snapshot_id.is_some() && entry.snapshot_id != self.snapshot_id {
                        return Err(malformed(
                            "Only files added by this writer's snapshot may inherit their sequence number",
                        ));
                    }
                }
            }
        }

        self.check_partition(&data_file.partition)?;
        self.check_stats(data_file)
    }

    fn check_partition(&self, partition: &Struct) -> Result<()> {
        let partition_type = self.encoding.partition_type();
        if partition.len() != partition_type.fields().len() {
            return Err(malformed(format!(
                "Partition tuple has {} values, partition spec {} has {} fields",
                partition.len(),
                self.metadata.partition_spec.spec_id(),
                partition_type.fields().len()
            )));
        }
        for (value, field) in partition.iter().zip(partition_type.fields()) {
            let Some(value) = value else { continue };
            if field.field_type.as_primitive_type() != Some(value.data_type()) {
                return Err(malformed(format!(
                    "Partition value {value} of field '{}' must be of type {}",
                    field.name, field.field_type
                )));
            }
        }
        Ok(())
    }

    fn check_stats(&self, data_file: &DataFile) -> Result<()> {
        let counts = [
            ("column_sizes", &data_file.column_sizes),
            ("value_counts", &data_file.value_counts),
            ("null_value_counts", &data_file.null_value_counts),
            ("nan_value_counts", &data_file.nan_value_counts),
        ];
        for (name, map) in counts {
            check_unique_keys(name, map)?;
            if let Some((id, _)) = map.iter().find(|(_, v)| i64::try_from(**v).is_err()) {
                return Err(malformed(format!("Count of column {id} in {name} overflows")));
            }
        }

        for (name, bounds) in [
            ("lower_bounds", &data_file.lower_bounds),
            ("upper_bounds", &data_file.upper_bounds),
        ] {
            check_unique_keys(name, bounds)?;
            for (id, bytes) in bounds.iter() {
                let ty = self
                    .metadata
                    .schema
                    .field_by_id(*id)
                    .and_then(|field| field.field_type.as_primitive_type())
                    .ok_or_else(|| {
                        malformed(format!(
                            "{name} references column {id}, which is not a primitive column of the schema"
                        ))
                    })?;
                Datum::try_from_exact_bytes(bytes, *ty).map_err(|err| {
                    Error::new(
                        ErrorKind::MalformedEntry,
                        format!("{name} of column {id} is not a valid {ty} bound"),
                    )
                    .with_source(err)
                })?;
            }
        }
        Ok(())
    }

    fn entry_to_value(&self, entry: &ManifestEntry) -> Result<Value> {
        let version = self.metadata.format_version;
        let mut fields = Vec::with_capacity(5);
        for def in self.encoding.entry_fields() {
            let value = match def.field {
                EntryField::Status => Some(Value::Int(entry.status.wire_code())),
                EntryField::SnapshotId => match version {
                    FormatVersion::V1 => entry.snapshot_id.or(self.snapshot_id),
                    FormatVersion::V2 => entry.snapshot_id,
                }
                .map(Value::Long),
                EntryField::SequenceNumber => entry.sequence_number.map(Value::Long),
                EntryField::FileSequenceNumber => entry.file_sequence_number.map(Value::Long),
                EntryField::DataFile => Some(self.data_file_to_value(&entry.data_file)?),
            };
            let name = def.name_for(version);
            fields.push((
                name.to_string(),
                encode_field(def.presence(version) == Presence::Required, name, value)?,
            ));
        }
        Ok(Value::Record(fields))
    }

    fn data_file_to_value(&self, data_file: &DataFile) -> Result<Value> {
        let version = self.metadata.format_version;
        let mut fields = Vec::with_capacity(17);
        for def in self.encoding.data_file_fields() {
            let value = match def.field {
                DataFileField::Content => Some(Value::Int(data_file.content.wire_code())),
                DataFileField::FilePath => Some(Value::String(data_file.file_path.clone())),
                DataFileField::FileFormat => Some(Value::String(data_file.file_format.to_string())),
                DataFileField::Partition => Some(self.partition_to_value(&data_file.partition)),
                DataFileField::RecordCount => Some(Value::Long(count_to_long(
                    data_file.record_count,
                    "record_count",
                )?)),
                DataFileField::FileSizeInBytes => Some(Value::Long(count_to_long(
                    data_file.file_size_in_bytes,
                    "file_size_in_bytes",
                )?)),
                DataFileField::BlockSizeInBytes => Some(Value::Long(V1_DEFAULT_BLOCK_SIZE)),
                DataFileField::ColumnSizes => counts_to_value(&data_file.column_sizes),
                DataFileField::ValueCounts => counts_to_value(&data_file.value_counts),
                DataFileField::NullValueCounts => counts_to_value(&data_file.null_value_counts),
                DataFileField::NanValueCounts => counts_to_value(&data_file.nan_value_counts),
                DataFileField::LowerBounds => bounds_to_value(&data_file.lower_bounds),
                DataFileField::UpperBounds => bounds_to_value(&data_file.upper_bounds),
                DataFileField::KeyMetadata => data_file.key_metadata.clone().map(Value::Bytes),
                DataFileField::SplitOffsets => (!data_file.split_offsets.is_empty()).then(|| {
                    Value::Array(data_file.split_offsets.iter().copied().map(Value::Long).collect())
                }),
                DataFileField::EqualityIds => data_file
                    .equality_ids
                    .as_ref()
                    .map(|ids| Value::Array(ids.iter().copied().map(Value::Int).collect())),
                DataFileField::SortOrderId => data_file.sort_order_id.map(Value::Int),
            };
            let name = def.name_for(version);
            fields.push((
                name.to_string(),
                encode_field(def.presence(version) == Presence::Required, name, value)?,
            ));
        }
        Ok(Value::Record(fields))
    }

    fn partition_to_value(&self, partition: &Struct) -> Value {
        Value::Record(
            self.encoding
                .partition_type()
                .fields()
                .iter()
                .zip(partition.iter())
                .map(|(field, value)| {
                    (
                        sanitize_avro_name(&field.name),
                        optional(value.map(datum_to_value)),
                    )
                })
                .collect(),
        )
    }
}

fn malformed(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::MalformedEntry, message)
}

fn check_unique_keys<V>(name: &str, map: &StatsMap<i32, V>) -> Result<()> {
    match map.first_duplicate_key() {
        Some(id) => Err(malformed(format!("{name} has more than one value for column {id}"))),
        None => Ok(()),
    }
}

fn count_to_long(count: u64, name: &str) -> Result<i64> {
    i64::try_from(count).map_err(|_| malformed(format!("{name} {count} overflows a long")))
}

fn counts_to_value(map: &StatsMap<i32, u64>) -> Option<Value> {
    // Counts are checked to fit a long before encoding.
    (!map.is_empty()).then(|| from_int_map(map, |v| Value::Long(*v as i64)))
}

fn bounds_to_value(map: &StatsMap<i32, Vec<u8>>) -> Option<Value> {
    (!map.is_empty()).then(|| from_int_map(map, |v| Value::Bytes(v.clone())))
}

/// Running summary of one partition field across the entries of a manifest.
#[derive(Debug, Clone)]
struct PartitionFieldStats {
    contains_null: bool,
    contains_nan: Option<bool>,
    lower_bound: Option<Datum>,
    upper_bound: Option<Datum>,
}

impl PartitionFieldStats {
    fn new(field_type: PrimitiveType) -> Self {
        Self {
            contains_null: false,
            contains_nan: field_type.is_floating_type().then_some(false),
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Nulls and NaNs only set their flag and never become a bound.
    fn update(&mut self, value: Option<&Datum>) {
        let Some(value) = value else {
            self.contains_null = true;
            return;
        };
        if value.is_nan() {
            self.contains_nan = Some(true);
            return;
        }
        if self.lower_bound.as_ref().map_or(true, |lower| value < lower) {
            self.lower_bound = Some(value.clone());
        }
        if self.upper_bound.as_ref().map_or(true, |upper| value > upper) {
            self.upper_bound = Some(value.clone());
        }
    }

    fn to_summary(&self) -> FieldSummary {
        FieldSummary {
            contains_null: self.contains_null,
            contains_nan: self.contains_nan,
            lower_bound: self.lower_bound.as_ref().map(Datum::to_bytes),
            upper_bound: self.upper_bound.as_ref().map(Datum::to_bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileIOBuilder;
    use crate::spec::manifest::{DataFileBuilder, DataFileFormat};
    use crate::spec::{NestedField, Schema, Transform};

    fn schema() -> Schema {
        Schema::builder()
            .with_fields(vec![
                NestedField::required(1, "id", PrimitiveType::Int.into()).into(),
                NestedField::optional(2, "score", PrimitiveType::Double.into()).into(),
            ])
            .build()
            .unwrap()
    }

    fn spec() -> PartitionSpec {
        PartitionSpec::builder()
            .add_partition_field(1, "id", Transform::Identity)
            .add_partition_field(2, "score", Transform::Identity)
            .build()
    }

    fn writer(path: &str) -> ManifestWriter {
        let io = FileIOBuilder::new_memory_io().build().unwrap();
        ManifestWriterBuilder::new(
            io.new_output(path).unwrap(),
            Some(1),
            None,
            schema(),
            spec(),
        )
        .build_v2_data()
        .unwrap()
    }

    fn data_file(partition: Struct) -> DataFile {
        DataFileBuilder::default()
            .file_path("memory://data/1.parquet")
            .file_format(DataFileFormat::Parquet)
            .record_count(3)
            .file_size_in_bytes(100)
            .partition(partition)
            .build()
            .unwrap()
    }

    #[test]
    fn test_partition_stats() {
        let mut stats = PartitionFieldStats::new(PrimitiveType::Double);
        stats.update(Some(&Datum::double(2.0)));
        stats.update(None);
        stats.update(Some(&Datum::double(f64::NAN)));
        stats.update(Some(&Datum::double(-1.0)));
        let summary = stats.to_summary();
        assert!(summary.contains_null);
        assert_eq!(summary.contains_nan, Some(true));
        assert_eq!(summary.lower_bound, Some((-1.0f64).to_le_bytes().to_vec()));
        assert_eq!(summary.upper_bound, Some(2.0f64.to_le_bytes().to_vec()));

        let ints = PartitionFieldStats::new(PrimitiveType::Int).to_summary();
        assert_eq!(ints.contains_nan, None);
        assert!(!ints.contains_null);
        assert_eq!(ints.lower_bound, None);
    }

    #[test]
    fn test_rejects_wrong_partition_shape() {
        let mut writer = writer("memory://m/shape.avro");
        let err = writer
            .add_file(data_file(Struct::from_iter([Some(Datum::int(1))])), Some(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let err = writer
            .add_file(
                data_file(Struct::from_iter([Some(Datum::long(1)), None])),
                Some(1),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_rejects_bad_stats() {
        let mut writer = writer("memory://m/stats.avro");
        let partition = Struct::from_iter([Some(Datum::int(1)), None]);

        let mut duplicate = data_file(partition.clone());
        duplicate.value_counts = vec![(1, 1u64), (1, 2)].into();
        let err = writer.add_file(duplicate, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let mut short_bound = data_file(partition.clone());
        short_bound.lower_bounds = vec![(2, vec![0u8; 3])].into();
        let err = writer.add_file(short_bound, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let mut unknown_column = data_file(partition.clone());
        unknown_column.upper_bounds = vec![(99, vec![0u8; 4])].into();
        let err = writer.add_file(unknown_column, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let mut ok = data_file(partition);
        ok.lower_bounds = vec![(1, Datum::int(4).to_bytes())].into();
        writer.add_file(ok, Some(1)).unwrap();
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_bounds_must_have_the_exact_width() {
        let mut writer = writer("memory://m/width.avro");
        let partition = Struct::from_iter([Some(Datum::int(1)), None]);

        let mut narrow_double = data_file(partition.clone());
        narrow_double.upper_bounds = vec![(2, 2.5f32.to_le_bytes().to_vec())].into();
        let err = writer.add_file(narrow_double, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let mut wide_int = data_file(partition.clone());
        wide_int.lower_bounds = vec![(1, 7i64.to_le_bytes().to_vec())].into();
        let err = writer.add_file(wide_int, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);

        let mut exact = data_file(partition);
        exact.upper_bounds = vec![(2, Datum::double(2.5).to_bytes())].into();
        writer.add_file(exact, Some(1)).unwrap();
        assert_eq!(writer.len(), 1);
    }

    #[test]
    fn test_rejects_other_partition_spec() {
        let mut writer = writer("memory://m/spec.avro");
        let mut file = data_file(Struct::from_iter([Some(Datum::int(1)), None]));
        file.partition_spec_id = 9;
        let err = writer.add_file(file, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
        assert!(writer.is_empty());
    }

    #[test]
    fn test_row_count_overflow_is_rejected() {
        let mut writer = writer("memory://m/rows.avro");
        let mut file = data_file(Struct::from_iter([None, None]));
        file.record_count = i64::MAX as u64;
        writer.add_file(file.clone(), Some(1)).unwrap();
        writer.add_file(file.clone(), Some(1)).unwrap();

        let err = writer.add_file(file, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
        assert_eq!(writer.len(), 2);
        assert_eq!(writer.added_rows, u64::MAX - 1);
    }

    #[test]
    fn test_rejects_content_mismatch() {
        let mut writer = writer("memory://m/content.avro");
        let mut deletes = data_file(Struct::from_iter([None, None]));
        deletes.content = DataContentType::PositionDeletes;
        let err = writer.add_file(deletes, Some(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
    }

    #[test]
    fn test_v2_sequence_number_rules() {
        let mut writer = writer("memory://m/seq.avro");
        let file = data_file(Struct::from_iter([None, None]));

        // Added by this snapshot: inherits its sequence number later.
        writer.add_file(file.clone(), None).unwrap();

        let existing = ManifestEntry::builder()
            .status(ManifestStatus::Existing)
            .snapshot_id(0)
            .data_file(file.clone())
            .build();
        assert_eq!(
            writer.add_entry(existing).unwrap_err().kind(),
            ErrorKind::MalformedEntry
        );

        let other_snapshot = ManifestEntry::builder()
            .status(ManifestStatus::Added)
            .snapshot_id(7)
            .data_file(file)
            .build();
        assert_eq!(
            writer.add_entry(other_snapshot).unwrap_err().kind(),
            ErrorKind::MalformedEntry
        );
        assert_eq!(writer.len(), 1);
    }

    #[tokio::test]
    async fn test_nothing_written_before_close() {
        let io = FileIOBuilder::new_memory_io().build().unwrap();
        let output = io.new_output("memory://m/lazy.avro").unwrap();
        let mut writer = ManifestWriterBuilder::new(output.clone(), Some(1), None, schema(), spec())
            .build_v2_data()
            .unwrap();
        writer
            .add_file(data_file(Struct::from_iter([Some(Datum::int(1)), None])), Some(1))
            .unwrap();
        assert!(!output.exists().await.unwrap());

        let manifest = writer.write_manifest_file().await.unwrap();
        assert!(output.exists().await.unwrap());
        assert_eq!(manifest.added_files_count, Some(1));
        assert_eq!(manifest.sequence_number, UNASSIGNED_SEQUENCE_NUMBER);
        assert_eq!(manifest.min_sequence_number, 1);
        assert_eq!(
            manifest.manifest_length,
            output.to_input_file().read().await.unwrap().len() as i64
        );
    }
}
