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

mod data_file;
pub use data_file::*;
mod entry;
pub use entry::*;
mod metadata;
pub use metadata::*;
pub(crate) mod projection;
pub use projection::{
    project, DataFileField, EncodingSchema, EntryField, ManifestFieldDef, ManifestFieldType,
    Presence, DATA_FILE_FIELDS, DATA_FILE_FIELD_ID, MANIFEST_ENTRY_FIELDS,
    MANIFEST_ENTRY_RECORD_NAME, PARTITION_FIELD_ID,
};
mod reader;
pub use reader::*;
mod writer;
pub use writer::*;

use bytes::Bytes;

use super::{FormatVersion, PartitionSpec, SchemaRef};
use crate::codec::CompressionCodec;
use crate::io::OutputFile;
use crate::Result;

/// A manifest contains metadata and a list of entries.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Manifest {
    metadata: ManifestMetadata,
    entries: Vec<ManifestEntryRef>,
}

impl Manifest {
    /// Parse manifest from bytes of avro file.
    pub fn parse_avro(bs: &[u8]) -> Result<Self> {
        let (metadata, entries) =
            ManifestReader::try_new(Bytes::copy_from_slice(bs))?.read_all()?;
        Ok(Self::new(metadata, entries))
    }

    /// Entries slice.
    pub fn entries(&self) -> &[ManifestEntryRef] {
        &self.entries
    }

    /// Get the metadata of the manifest.
    pub fn metadata(&self) -> &ManifestMetadata {
        &self.metadata
    }

    /// Consume this Manifest, returning its constituent parts
    pub fn into_parts(self) -> (Vec<ManifestEntryRef>, ManifestMetadata) {
        let Self { entries, metadata } = self;
        (entries, metadata)
    }

    /// Constructor from [`ManifestMetadata`] and [`ManifestEntry`]s.
    pub fn new(metadata: ManifestMetadata, entries: Vec<ManifestEntry>) -> Self {
        Self {
            metadata,
            entries: entries.into_iter().map(ManifestEntryRef::new).collect(),
        }
    }
}

/// Open a data manifest writer for `format_version` (1 or 2) that
/// compresses with the codec named `codec`.
///
/// # Errors
///
/// - [`crate::ErrorKind::UnsupportedFormatVersion`] for versions other than 1 and 2.
/// - [`crate::ErrorKind::CodecUnavailable`] when `codec` does not name an
///   available codec.
/// - [`crate::ErrorKind::SchemaProjection`] when `partition_spec` does not
///   bind to `schema`.
pub fn write_manifest(
    format_version: u8,
    partition_spec: PartitionSpec,
    schema: impl Into<SchemaRef>,
    output: OutputFile,
    snapshot_id: i64,
    codec: &str,
) -> Result<ManifestWriter> {
    let format_version = FormatVersion::try_from(format_version)?;
    let compression = CompressionCodec::resolve(codec)?;
    let builder =
        ManifestWriterBuilder::new(output, Some(snapshot_id), None, schema, partition_spec)
            .with_compression(compression);
    match format_version {
        FormatVersion::V1 => builder.build_v1(),
        FormatVersion::V2 => builder.build_v2_data(),
    }
}
