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

//! ManifestList for Iceberg.

use std::fmt;
use std::str::FromStr;

use apache_avro::types::Value;
use apache_avro::{Reader as AvroReader, Writer as AvroWriter};
use bytes::Bytes;
use tracing::debug;

use super::manifest::projection::{
    def, present_fields, struct_type_of, ManifestFieldDef, MatchedRecord, Presence,
};
use super::manifest::{Manifest, ManifestFieldType, ManifestReader};
use crate::avro::value::{
    encode_field, to_array, to_bool, to_bytes, to_count, to_int, to_long, to_string,
};
use crate::avro::{schema_to_avro_schema, ContainerHeader, RecordLayout};
use crate::codec::CompressionCodec;
use crate::io::{FileIO, OutputFile};
use crate::spec::{FormatVersion, ListType, NestedField, PrimitiveType, StructType, Type};
use crate::{ensure_data_valid, Error, ErrorKind, Result};

/// Sequence number of every file of a table written before format version 2.
pub const INITIAL_SEQUENCE_NUMBER: i64 = 0;

/// Placeholder for a sequence number that is assigned when the snapshot
/// commits.
pub const UNASSIGNED_SEQUENCE_NUMBER: i64 = -1;

/// Placeholder for the snapshot id of a manifest written without one.
pub const UNASSIGNED_SNAPSHOT_ID: i64 = -1;

const MANIFEST_FILE_RECORD_NAME: &str = "manifest_file";
const FIELD_SUMMARY_RECORD_NAME: &str = "r508";
const FIELD_SUMMARY_ELEMENT_ID: i32 = 508;

const SNAPSHOT_ID_KEY: &str = "snapshot-id";
const PARENT_SNAPSHOT_ID_KEY: &str = "parent-snapshot-id";
const SEQUENCE_NUMBER_KEY: &str = "sequence-number";
const FORMAT_VERSION_KEY: &str = "format-version";

/// Snapshots are embedded in table metadata, but the list of manifests for a
/// snapshot are stored in a separate manifest list file.
///
/// A new manifest list is written for each attempt to commit a snapshot
/// because the list of manifests always changes to produce a new snapshot.
/// When a manifest list is written, the (optimistic) sequence number of the
/// snapshot is written for all new manifest files tracked by the list.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestList {
    /// Entries in a manifest list.
    entries: Vec<ManifestFile>,
}

impl ManifestList {
    /// Parse manifest list from bytes, taking the format version from the
    /// file header. A header without `format-version` is version 1.
    pub fn parse(bs: &[u8]) -> Result<ManifestList> {
        let header = ContainerHeader::read(bs)?;
        let version = match header.get_str(FORMAT_VERSION_KEY)? {
            Some(version) => version.parse()?,
            None => FormatVersion::V1,
        };
        Self::parse_with_version(bs, version)
    }

    /// Parse manifest list from bytes.
    pub fn parse_with_version(bs: &[u8], version: FormatVersion) -> Result<ManifestList> {
        let header = ContainerHeader::read(bs)?;
        // Resolving the codec up front reports a missing codec by name.
        header.codec()?;
        let layout = RecordLayout::parse(&header.schema_json()?)?;

        let entries = AvroReader::new(bs)?
            .map(|value| {
                let value = value.map_err(|err| {
                    Error::new(ErrorKind::MalformedEntry, "Failed to decode manifest list entry")
                        .with_source(err)
                })?;
                decode_manifest_file(value, version, &layout)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ManifestList { entries })
    }

    /// Get the entries in the manifest list.
    pub fn entries(&self) -> &[ManifestFile] {
        &self.entries
    }

    /// Take ownership of the entries in the manifest list, consuming it
    pub fn consume_entries(self) -> impl IntoIterator<Item = ManifestFile> {
        Box::new(self.entries.into_iter())
    }
}

/// A manifest list writer.
///
/// Like [`crate::spec::ManifestWriter`], entries are buffered and the file
/// is written in one go by [`ManifestListWriter::close`].
pub struct ManifestListWriter {
    format_version: FormatVersion,
    output_file: OutputFile,
    metadata: Vec<(&'static str, String)>,
    compression: CompressionCodec,
    records: Vec<Value>,
    sequence_number: i64,
    snapshot_id: i64,
}

impl fmt::Debug for ManifestListWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManifestListWriter")
            .field("format_version", &self.format_version)
            .field("output_file", &self.output_file.location())
            .field("snapshot_id", &self.snapshot_id)
            .field("entries", &self.records.len())
            .finish_non_exhaustive()
    }
}

impl ManifestListWriter {
    /// Construct a v1 [`ManifestListWriter`] that writes to a provided [`OutputFile`].
    pub fn v1(output_file: OutputFile, snapshot_id: i64, parent_snapshot_id: Option<i64>) -> Self {
        let mut metadata = vec![
            (SNAPSHOT_ID_KEY, snapshot_id.to_string()),
            (FORMAT_VERSION_KEY, FormatVersion::V1.to_string()),
        ];
        if let Some(parent_snapshot_id) = parent_snapshot_id {
            metadata.push((PARENT_SNAPSHOT_ID_KEY, parent_snapshot_id.to_string()));
        }
        Self::new(
            FormatVersion::V1,
            output_file,
            metadata,
            INITIAL_SEQUENCE_NUMBER,
            snapshot_id,
        )
    }

    /// Construct a v2 [`ManifestListWriter`] that writes to a provided [`OutputFile`].
    pub fn v2(
        output_file: OutputFile,
        snapshot_id: i64,
        parent_snapshot_id: Option<i64>,
        sequence_number: i64,
    ) -> Self {
        let metadata = vec![
            (SNAPSHOT_ID_KEY, snapshot_id.to_string()),
            (
                PARENT_SNAPSHOT_ID_KEY,
                parent_snapshot_id
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "null".to_string()),
            ),
            (SEQUENCE_NUMBER_KEY, sequence_number.to_string()),
            (FORMAT_VERSION_KEY, FormatVersion::V2.to_string()),
        ];
        Self::new(
            FormatVersion::V2,
            output_file,
            metadata,
            sequence_number,
            snapshot_id,
        )
    }

    fn new(
        format_version: FormatVersion,
        output_file: OutputFile,
        metadata: Vec<(&'static str, String)>,
        sequence_number: i64,
        snapshot_id: i64,
    ) -> Self {
        Self {
            format_version,
            output_file,
            metadata,
            compression: CompressionCodec::default(),
            records: Vec::new(),
            sequence_number,
            snapshot_id,
        }
    }

    /// Set the codec applied to the blocks of the manifest list.
    pub fn with_compression(mut self, compression: CompressionCodec) -> Self {
        self.compression = compression;
        self
    }

    /// Append manifests to be written.
    ///
    /// For format version 2, unassigned sequence numbers of manifests added
    /// by this snapshot get the snapshot's sequence number. No manifest is
    /// appended if any of them fails.
    pub fn add_manifests(&mut self, manifests: impl Iterator<Item = ManifestFile>) -> Result<()> {
        let mut records = Vec::new();
        for mut manifest in manifests {
            match self.format_version {
                FormatVersion::V1 => {
                    ensure_data_valid!(
                        manifest.content == ManifestContentType::Data,
                        "Format version 1 manifest lists only hold data manifests, got {}",
                        manifest.manifest_path
                    );
                }
                FormatVersion::V2 => {
                    if manifest.sequence_number == UNASSIGNED_SEQUENCE_NUMBER {
                        self.check_assignable(&manifest)?;
                        manifest.sequence_number = self.sequence_number;
                    }
                    if manifest.min_sequence_number == UNASSIGNED_SEQUENCE_NUMBER {
                        self.check_assignable(&manifest)?;
                        manifest.min_sequence_number = self.sequence_number;
                    }
                }
            }
            records.push(manifest_file_to_value(&manifest, self.format_version)?);
        }
        self.records.extend(records);
        Ok(())
    }

    fn check_assignable(&self, manifest: &ManifestFile) -> Result<()> {
        if manifest.added_snapshot_id != self.snapshot_id {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                format!(
                    "Found unassigned sequence number for a manifest from snapshot {}.",
                    manifest.added_snapshot_id
                ),
            )
            .with_context("manifest_path", manifest.manifest_path.clone()));
        }
        Ok(())
    }

    /// Write the manifest list to the output file.
    pub async fn close(self) -> Result<()> {
        let avro_schema = manifest_list_avro_schema(self.format_version)?;
        let mut avro_writer =
            AvroWriter::with_codec(&avro_schema, Vec::new(), self.compression.to_avro()?);
        for (key, value) in self.metadata {
            avro_writer.add_user_metadata(key.to_string(), value)?;
        }
        let entries = self.records.len();
        for record in self.records {
            avro_writer.append(record)?;
        }
        let data = avro_writer.into_inner()?;
        let length = data.len();

        let mut writer = self.output_file.writer().await?;
        writer.write(Bytes::from(data)).await?;
        writer.close().await?;

        debug!(
            path = %self.output_file.location(),
            snapshot_id = self.snapshot_id,
            entries,
            bytes = length,
            "wrote manifest list"
        );
        Ok(())
    }
}

/// Entry in a manifest list.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
pub struct ManifestFile {
    /// field: 500
    ///
    /// Location of the manifest file
    pub manifest_path: String,
    /// field: 501
    ///
    /// Length of the manifest file in bytes
    pub manifest_length: i64,
    /// field: 502
    ///
    /// ID of a partition spec used to write the manifest; must be listed
    /// in table metadata partition-specs
    pub partition_spec_id: i32,
    /// field: 517
    ///
    /// The type of files tracked by the manifest, either data or delete
    /// files; 0 for all v1 manifests
    pub content: ManifestContentType,
    /// field: 515
    ///
    /// The sequence number when the manifest was added to the table; use 0
    /// when reading v1 manifest lists
    pub sequence_number: i64,
    /// field: 516
    ///
    /// The minimum data sequence number of all live data or delete files in
    /// the manifest; use 0 when reading v1 manifest lists
    pub min_sequence_number: i64,
    /// field: 503
    ///
    /// ID of the snapshot where the manifest file was added
    pub added_snapshot_id: i64,
    /// field: 504
    ///
    /// Number of entries in the manifest that have status ADDED, when null
    /// this is assumed to be non-zero
    pub added_files_count: Option<u32>,
    /// field: 505
    ///
    /// Number of entries in the manifest that have status EXISTING (0),
    /// when null this is assumed to be non-zero
    pub existing_files_count: Option<u32>,
    /// field: 506
    ///
    /// Number of entries in the manifest that have status DELETED (2),
    /// when null this is assumed to be non-zero
    pub deleted_files_count: Option<u32>,
    /// field: 512
    ///
    /// Number of rows in all of files in the manifest that have status
    /// ADDED, when null this is assumed to be non-zero
    pub added_rows_count: Option<u64>,
    /// field: 513
    ///
    /// Number of rows in all of files in the manifest that have status
    /// EXISTING, when null this is assumed to be non-zero
    pub existing_rows_count: Option<u64>,
    /// field: 514
    ///
    /// Number of rows in all of files in the manifest that have status
    /// DELETED, when null this is assumed to be non-zero
    pub deleted_rows_count: Option<u64>,
    /// field: 507
    /// element_field: 508
    ///
    /// A list of field summaries for each partition field in the spec. Each
    /// field in the list corresponds to a field in the manifest file’s
    /// partition spec.
    pub partitions: Option<Vec<FieldSummary>>,
    /// field: 519
    ///
    /// Implementation-specific key metadata for encryption
    pub key_metadata: Option<Vec<u8>>,
}

impl ManifestFile {
    /// Checks if the manifest file has any added files.
    pub fn has_added_files(&self) -> bool {
        self.added_files_count.map(|c| c > 0).unwrap_or(true)
    }

    /// Checks whether this manifest contains entries with DELETED status.
    pub fn has_deleted_files(&self) -> bool {
        self.deleted_files_count.map(|c| c > 0).unwrap_or(true)
    }

    /// Checks if the manifest file has any existed files.
    pub fn has_existing_files(&self) -> bool {
        self.existing_files_count.map(|c| c > 0).unwrap_or(true)
    }

    /// Load [`Manifest`].
    ///
    /// This method will also initialize inherited values of
    /// [`crate::spec::ManifestEntry`], such as `sequence_number`.
    pub async fn load_manifest(&self, file_io: &FileIO) -> Result<Manifest> {
        let input = file_io.new_input(&self.manifest_path)?;
        let (metadata, mut entries) = ManifestReader::open(&input).await?.read_all()?;

        // Let entries inherit values from the manifest list entry.
        for entry in &mut entries {
            entry.inherit_data(self);
        }

        Ok(Manifest::new(metadata, entries))
    }
}

/// The type of files tracked by the manifest, either data or delete files; Data(0) for all v1 manifests
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash, Default)]
pub enum ManifestContentType {
    /// The manifest content is data.
    #[default]
    Data,
    /// The manifest content is deletes.
    Deletes,
}

impl ManifestContentType {
    /// Code of this content type in manifest lists.
    pub fn wire_code(self) -> i32 {
        match self {
            ManifestContentType::Data => 0,
            ManifestContentType::Deletes => 1,
        }
    }
}

impl FromStr for ManifestContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "data" => Ok(ManifestContentType::Data),
            "deletes" => Ok(ManifestContentType::Deletes),
            _ => Err(Error::new(
                ErrorKind::DataInvalid,
                format!("Invalid manifest content type: {s}"),
            )),
        }
    }
}

impl fmt::Display for ManifestContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestContentType::Data => write!(f, "data"),
            ManifestContentType::Deletes => write!(f, "deletes"),
        }
    }
}

impl TryFrom<i32> for ManifestContentType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(ManifestContentType::Data),
            1 => Ok(ManifestContentType::Deletes),
            _ => Err(Error::new(
                ErrorKind::MalformedEntry,
                format!("Invalid manifest content type. Expected 0 or 1, got {value}"),
            )),
        }
    }
}

/// Field summary for partition field in the spec.
///
/// Each field in the list corresponds to a field in the manifest file’s partition spec.
#[derive(Debug, PartialEq, Eq, Clone, Default, Hash)]
pub struct FieldSummary {
    /// field: 509
    ///
    /// Whether the manifest contains at least one partition with a null
    /// value for the field
    pub contains_null: bool,
    /// field: 518
    /// Whether the manifest contains at least one partition with a NaN
    /// value for the field
    pub contains_nan: Option<bool>,
    /// field: 510
    /// The minimum value for the field in the manifests
    /// partitions.
    pub lower_bound: Option<Vec<u8>>,
    /// field: 511
    /// The maximum value for the field in the manifests
    /// partitions.
    pub upper_bound: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestFileField {
    ManifestPath,
    ManifestLength,
    PartitionSpecId,
    Content,
    SequenceNumber,
    MinSequenceNumber,
    AddedSnapshotId,
    AddedFilesCount,
    ExistingFilesCount,
    DeletedFilesCount,
    AddedRowsCount,
    ExistingRowsCount,
    DeletedRowsCount,
    Partitions,
    KeyMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldSummaryField {
    ContainsNull,
    ContainsNan,
    LowerBound,
    UpperBound,
}

use ManifestFieldType::{Primitive, Record};
use Presence::{Absent, Optional, Required};

#[rustfmt::skip]
const MANIFEST_FILE_FIELDS: &[ManifestFieldDef<ManifestFileField>] = &[
    def(ManifestFileField::ManifestPath, 500, "manifest_path", Primitive(PrimitiveType::String), Required, Required),
    def(ManifestFileField::ManifestLength, 501, "manifest_length", Primitive(PrimitiveType::Long), Required, Required),
    def(ManifestFileField::PartitionSpecId, 502, "partition_spec_id", Primitive(PrimitiveType::Int), Required, Required),
    def(ManifestFileField::Content, 517, "content", Primitive(PrimitiveType::Int), Absent, Required),
    def(ManifestFileField::SequenceNumber, 515, "sequence_number", Primitive(PrimitiveType::Long), Absent, Required),
    def(ManifestFileField::MinSequenceNumber, 516, "min_sequence_number", Primitive(PrimitiveType::Long), Absent, Required),
    def(ManifestFileField::AddedSnapshotId, 503, "added_snapshot_id", Primitive(PrimitiveType::Long), Required, Required),
    def(ManifestFileField::AddedFilesCount, 504, "added_files_count", Primitive(PrimitiveType::Int), Optional, Required)
        .renamed_in_v1("added_data_files_count"),
    def(ManifestFileField::ExistingFilesCount, 505, "existing_files_count", Primitive(PrimitiveType::Int), Optional, Required)
        .renamed_in_v1("existing_data_files_count"),
    def(ManifestFileField::DeletedFilesCount, 506, "deleted_files_count", Primitive(PrimitiveType::Int), Optional, Required)
        .renamed_in_v1("deleted_data_files_count"),
    def(ManifestFileField::AddedRowsCount, 512, "added_rows_count", Primitive(PrimitiveType::Long), Optional, Required),
    def(ManifestFileField::ExistingRowsCount, 513, "existing_rows_count", Primitive(PrimitiveType::Long), Optional, Required),
    def(ManifestFileField::DeletedRowsCount, 514, "deleted_rows_count", Primitive(PrimitiveType::Long), Optional, Required),
    def(ManifestFileField::Partitions, 507, "partitions", Record, Optional, Optional),
    def(ManifestFileField::KeyMetadata, 519, "key_metadata", Primitive(PrimitiveType::Binary), Optional, Optional),
];

#[rustfmt::skip]
const FIELD_SUMMARY_FIELDS: &[ManifestFieldDef<FieldSummaryField>] = &[
    def(FieldSummaryField::ContainsNull, 509, "contains_null", Primitive(PrimitiveType::Boolean), Required, Required),
    def(FieldSummaryField::ContainsNan, 518, "contains_nan", Primitive(PrimitiveType::Boolean), Optional, Optional),
    def(FieldSummaryField::LowerBound, 510, "lower_bound", Primitive(PrimitiveType::Binary), Optional, Optional),
    def(FieldSummaryField::UpperBound, 511, "upper_bound", Primitive(PrimitiveType::Binary), Optional, Optional),
];

fn manifest_list_type(version: FormatVersion) -> Result<StructType> {
    let summary_type = struct_type_of(FIELD_SUMMARY_FIELDS, version, |_| {
        Err(Error::new(
            ErrorKind::Unexpected,
            "Field summaries have no nested records",
        ))
    })?;
    struct_type_of(MANIFEST_FILE_FIELDS, version, |_| {
        Ok(Type::List(ListType::new(
            NestedField::list_element(
                FIELD_SUMMARY_ELEMENT_ID,
                Type::Struct(summary_type.clone()),
                true,
            )
            .into(),
        )))
    })
}

fn manifest_list_avro_schema(version: FormatVersion) -> Result<apache_avro::Schema> {
    schema_to_avro_schema(MANIFEST_FILE_RECORD_NAME, &manifest_list_type(version)?)
}

fn manifest_file_to_value(manifest: &ManifestFile, version: FormatVersion) -> Result<Value> {
    let mut fields = Vec::with_capacity(MANIFEST_FILE_FIELDS.len());
    for def in present_fields(MANIFEST_FILE_FIELDS, version) {
        let name = def.name_for(version);
        let value = match def.field {
            ManifestFileField::ManifestPath => Some(Value::String(manifest.manifest_path.clone())),
            ManifestFileField::ManifestLength => Some(Value::Long(manifest.manifest_length)),
            ManifestFileField::PartitionSpecId => Some(Value::Int(manifest.partition_spec_id)),
            ManifestFileField::Content => Some(Value::Int(manifest.content.wire_code())),
            ManifestFileField::SequenceNumber => Some(Value::Long(manifest.sequence_number)),
            ManifestFileField::MinSequenceNumber => {
                Some(Value::Long(manifest.min_sequence_number))
            }
            ManifestFileField::AddedSnapshotId => Some(Value::Long(manifest.added_snapshot_id)),
            ManifestFileField::AddedFilesCount => {
                file_count_value(manifest.added_files_count, name)?
            }
            ManifestFileField::ExistingFilesCount => {
                file_count_value(manifest.existing_files_count, name)?
            }
            ManifestFileField::DeletedFilesCount => {
                file_count_value(manifest.deleted_files_count, name)?
            }
            ManifestFileField::AddedRowsCount => row_count_value(manifest.added_rows_count, name)?,
            ManifestFileField::ExistingRowsCount => {
                row_count_value(manifest.existing_rows_count, name)?
            }
            ManifestFileField::DeletedRowsCount => {
                row_count_value(manifest.deleted_rows_count, name)?
            }
            ManifestFileField::Partitions => match &manifest.partitions {
                Some(partitions) => Some(Value::Array(
                    partitions
                        .iter()
                        .map(|summary| field_summary_to_value(summary, version))
                        .collect::<Result<Vec<_>>>()?,
                )),
                None => None,
            },
            ManifestFileField::KeyMetadata => manifest.key_metadata.clone().map(Value::Bytes),
        };
        fields.push((
            name.to_string(),
            encode_field(def.presence(version) == Required, name, value)?,
        ));
    }
    Ok(Value::Record(fields))
}

fn field_summary_to_value(summary: &FieldSummary, version: FormatVersion) -> Result<Value> {
    let mut fields = Vec::with_capacity(FIELD_SUMMARY_FIELDS.len());
    for def in present_fields(FIELD_SUMMARY_FIELDS, version) {
        let value = match def.field {
            FieldSummaryField::ContainsNull => Some(Value::Boolean(summary.contains_null)),
            FieldSummaryField::ContainsNan => summary.contains_nan.map(Value::Boolean),
            FieldSummaryField::LowerBound => summary.lower_bound.clone().map(Value::Bytes),
            FieldSummaryField::UpperBound => summary.upper_bound.clone().map(Value::Bytes),
        };
        fields.push((
            def.name.to_string(),
            encode_field(def.presence(version) == Required, def.name, value)?,
        ));
    }
    Ok(Value::Record(fields))
}

fn file_count_value(count: Option<u32>, name: &str) -> Result<Option<Value>> {
    count
        .map(|count| {
            i32::try_from(count).map(Value::Int).map_err(|_| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("{name} {count} overflows an int"),
                )
            })
        })
        .transpose()
}

fn row_count_value(count: Option<u64>, name: &str) -> Result<Option<Value>> {
    count
        .map(|count| {
            i64::try_from(count).map(Value::Long).map_err(|_| {
                Error::new(
                    ErrorKind::DataInvalid,
                    format!("{name} {count} overflows a long"),
                )
            })
        })
        .transpose()
}

fn decode_manifest_file(
    value: Value,
    version: FormatVersion,
    layout: &RecordLayout,
) -> Result<ManifestFile> {
    let mut record = MatchedRecord::match_fields(
        MANIFEST_FILE_RECORD_NAME,
        MANIFEST_FILE_FIELDS,
        version,
        layout,
        value,
    )?;
    let mut take_long = |field, name| -> Result<Option<i64>> {
        record
            .take_value(field)
            .map(|v| to_long(v, name))
            .transpose()
    };

    let manifest_length = take_long(ManifestFileField::ManifestLength, "manifest_length")?;
    let added_snapshot_id = take_long(ManifestFileField::AddedSnapshotId, "added_snapshot_id")?;
    let sequence_number = take_long(ManifestFileField::SequenceNumber, "sequence_number")?;
    let min_sequence_number =
        take_long(ManifestFileField::MinSequenceNumber, "min_sequence_number")?;

    let manifest_path = to_string(
        record.take_required(ManifestFileField::ManifestPath, "manifest_path")?,
        "manifest_path",
    )?;
    let partition_spec_id = to_int(
        record.take_required(ManifestFileField::PartitionSpecId, "partition_spec_id")?,
        "partition_spec_id",
    )?;
    let content = match version {
        FormatVersion::V1 => ManifestContentType::Data,
        FormatVersion::V2 => ManifestContentType::try_from(to_int(
            record.take_required(ManifestFileField::Content, "content")?,
            "content",
        )?)?,
    };
    let partitions = record
        .take(ManifestFileField::Partitions)
        .map(|(value, layout)| {
            let layout = layout.ok_or_else(|| {
                Error::new(
                    ErrorKind::MalformedEntry,
                    "Field 'partitions' is not a list of records in the writer schema",
                )
            })?;
            to_array(value, "partitions")?
                .into_iter()
                .map(|summary| decode_field_summary(summary, version, layout))
                .collect::<Result<Vec<_>>>()
        })
        .transpose()?;

    let mut take_file_count = |field, name| -> Result<Option<u32>> {
        record
            .take_value(field)
            .map(|v| {
                let count = to_int(v, name)?;
                u32::try_from(count).map_err(|_| {
                    Error::new(
                        ErrorKind::MalformedEntry,
                        format!("Field '{name}' is negative: {count}"),
                    )
                })
            })
            .transpose()
    };
    let added_files_count =
        take_file_count(ManifestFileField::AddedFilesCount, "added_files_count")?;
    let existing_files_count =
        take_file_count(ManifestFileField::ExistingFilesCount, "existing_files_count")?;
    let deleted_files_count =
        take_file_count(ManifestFileField::DeletedFilesCount, "deleted_files_count")?;

    let mut take_row_count = |field, name| -> Result<Option<u64>> {
        record
            .take_value(field)
            .map(|v| to_count(v, name))
            .transpose()
    };
    let added_rows_count = take_row_count(ManifestFileField::AddedRowsCount, "added_rows_count")?;
    let existing_rows_count =
        take_row_count(ManifestFileField::ExistingRowsCount, "existing_rows_count")?;
    let deleted_rows_count =
        take_row_count(ManifestFileField::DeletedRowsCount, "deleted_rows_count")?;

    let key_metadata = record
        .take_value(ManifestFileField::KeyMetadata)
        .map(|v| to_bytes(v, "key_metadata"))
        .transpose()?;

    let required = |value: Option<i64>, name: &str| {
        value.ok_or_else(|| {
            Error::new(
                ErrorKind::MalformedEntry,
                format!("Field '{name}' of record '{MANIFEST_FILE_RECORD_NAME}' is null"),
            )
        })
    };
    Ok(ManifestFile {
        manifest_path,
        manifest_length: required(manifest_length, "manifest_length")?,
        partition_spec_id,
        content,
        sequence_number: sequence_number.unwrap_or(INITIAL_SEQUENCE_NUMBER),
        min_sequence_number: min_sequence_number.unwrap_or(INITIAL_SEQUENCE_NUMBER),
        added_snapshot_id: required(added_snapshot_id, "added_snapshot_id")?,
        added_files_count,
        existing_files_count,
        deleted_files_count,
        added_rows_count,
        existing_rows_count,
        deleted_rows_count,
        partitions,
        key_metadata,
    })
}

fn decode_field_summary(
    value: Value,
    version: FormatVersion,
    layout: &RecordLayout,
) -> Result<FieldSummary> {
    let mut record = MatchedRecord::match_fields(
        FIELD_SUMMARY_RECORD_NAME,
        FIELD_SUMMARY_FIELDS,
        version,
        layout,
        value,
    )?;
    Ok(FieldSummary {
        contains_null: to_bool(
            record.take_required(FieldSummaryField::ContainsNull, "contains_null")?,
            "contains_null",
        )?,
        contains_nan: record
            .take_value(FieldSummaryField::ContainsNan)
            .map(|v| to_bool(v, "contains_nan"))
            .transpose()?,
        lower_bound: record
            .take_value(FieldSummaryField::LowerBound)
            .map(|v| to_bytes(v, "lower_bound"))
            .transpose()?,
        upper_bound: record
            .take_value(FieldSummaryField::UpperBound)
            .map(|v| to_bytes(v, "upper_bound"))
            .transpose()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::FileIOBuilder;

    fn manifest_file(snapshot_id: i64, sequence_number: i64) -> ManifestFile {
        ManifestFile {
            manifest_path: format!("memory://metadata/{snapshot_id}-m0.avro"),
            manifest_length: 5806,
            partition_spec_id: 1,
            content: ManifestContentType::Data,
            sequence_number,
            min_sequence_number: sequence_number,
            added_snapshot_id: snapshot_id,
            added_files_count: Some(1),
            existing_files_count: Some(0),
            deleted_files_count: Some(0),
            added_rows_count: Some(3),
            existing_rows_count: Some(0),
            deleted_rows_count: Some(0),
            partitions: Some(vec![FieldSummary {
                contains_null: false,
                contains_nan: Some(false),
                lower_bound: Some(vec![1, 0, 0, 0]),
                upper_bound: Some(vec![9, 0, 0, 0]),
            }]),
            key_metadata: None,
        }
    }

    async fn write_and_read(
        writer_of: impl FnOnce(OutputFile) -> ManifestListWriter,
        manifests: Vec<ManifestFile>,
    ) -> Result<Bytes> {
        let io = FileIOBuilder::new_memory_io().build()?;
        let output = io.new_output("memory://metadata/snap.avro")?;
        let mut writer = writer_of(output.clone());
        writer.add_manifests(manifests.into_iter())?;
        writer.close().await?;
        output.to_input_file().read().await
    }

    #[tokio::test]
    async fn test_v2_round_trip_assigns_sequence_numbers() {
        let bytes = write_and_read(
            |output| ManifestListWriter::v2(output, 377075049360453639, Some(1), 4),
            vec![
                manifest_file(377075049360453639, UNASSIGNED_SEQUENCE_NUMBER),
                manifest_file(1, 2),
            ],
        )
        .await
        .unwrap();

        let header = ContainerHeader::read(&bytes).unwrap();
        assert_eq!(header.get_str("sequence-number").unwrap(), Some("4"));
        assert_eq!(header.get_str("parent-snapshot-id").unwrap(), Some("1"));

        let list = ManifestList::parse(&bytes).unwrap();
        assert_eq!(list.entries().len(), 2);
        assert_eq!(list.entries()[0].sequence_number, 4);
        assert_eq!(list.entries()[0].min_sequence_number, 4);
        assert_eq!(list.entries()[1], manifest_file(1, 2));
    }

    #[tokio::test]
    async fn test_v2_rejects_unassigned_from_other_snapshot() {
        let err = write_and_read(
            |output| ManifestListWriter::v2(output, 10, None, 4),
            vec![manifest_file(9, UNASSIGNED_SEQUENCE_NUMBER)],
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[tokio::test]
    async fn test_v1_round_trip() {
        let bytes = write_and_read(
            |output| ManifestListWriter::v1(output, 7, None),
            vec![manifest_file(7, 0)],
        )
        .await
        .unwrap();

        let header = ContainerHeader::read(&bytes).unwrap();
        assert_eq!(header.get("parent-snapshot-id"), None);
        let schema = header.schema_json().unwrap();
        let names: Vec<&str> = schema["fields"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|f| f["name"].as_str())
            .collect();
        assert!(names.contains(&"added_data_files_count"));
        assert!(!names.contains(&"content"));

        let list = ManifestList::parse_with_version(&bytes, FormatVersion::V1).unwrap();
        let entry = &list.entries()[0];
        assert_eq!(entry.content, ManifestContentType::Data);
        assert_eq!(entry.sequence_number, INITIAL_SEQUENCE_NUMBER);
        assert_eq!(entry.added_files_count, Some(1));
        assert_eq!(entry.partitions, manifest_file(7, 0).partitions);
    }

    #[tokio::test]
    async fn test_v1_rejects_delete_manifests() {
        let mut deletes = manifest_file(7, 0);
        deletes.content = ManifestContentType::Deletes;
        let err = write_and_read(|output| ManifestListWriter::v1(output, 7, None), vec![deletes])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
    }

    #[tokio::test]
    async fn test_v2_requires_counts() {
        let mut manifest = manifest_file(7, 1);
        manifest.added_rows_count = None;
        let err = write_and_read(
            |output| ManifestListWriter::v2(output, 7, None, 1),
            vec![manifest],
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry);
    }

    #[test]
    fn test_content_type_mapping() {
        assert_eq!(
            ManifestContentType::try_from(ManifestContentType::Deletes.wire_code()).unwrap(),
            ManifestContentType::Deletes
        );
        assert_eq!("deletes".parse::<ManifestContentType>().unwrap().to_string(), "deletes");
        assert!(ManifestContentType::try_from(2).is_err());
    }
}
