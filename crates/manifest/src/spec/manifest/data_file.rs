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

use std::fmt;
use std::str::FromStr;

use derive_builder::Builder;

use crate::spec::{Datum, PrimitiveType, StatsMap, Struct};
use crate::{Error, ErrorKind, Result};

/// Data file carries data file path, partition tuple, metrics, …
#[derive(Debug, PartialEq, Clone, Eq, Builder)]
#[builder(build_fn(error = "Error"))]
pub struct DataFile {
    /// field id: 134
    ///
    /// Type of content stored by the data file: data, equality deletes,
    /// or position deletes (all v1 files are data files)
    #[builder(default = "DataContentType::Data")]
    pub(crate) content: DataContentType,
    /// field id: 100
    ///
    /// Full URI for the file with FS scheme
    #[builder(setter(into))]
    pub(crate) file_path: String,
    /// field id: 101
    ///
    /// File format name: avro, orc, parquet or puffin
    pub(crate) file_format: DataFileFormat,
    /// field id: 102
    ///
    /// Partition data tuple, schema based on the partition spec output using
    /// partition field ids for the struct field ids
    #[builder(default)]
    pub(crate) partition: Struct,
    /// field id: 103
    ///
    /// Number of records in this file
    pub(crate) record_count: u64,
    /// field id: 104
    ///
    /// Total file size in bytes
    pub(crate) file_size_in_bytes: u64,
    /// field id: 108
    /// key field id: 117
    /// value field id: 118
    ///
    /// Map from column id to the total size on disk of all regions that
    /// store the column. Leave empty for row-oriented formats (Avro)
    #[builder(default, setter(into))]
    pub(crate) column_sizes: StatsMap<i32, u64>,
    /// field id: 109
    /// key field id: 119
    /// value field id: 120
    ///
    /// Map from column id to number of values in the column (including null
    /// and NaN values)
    #[builder(default, setter(into))]
    pub(crate) value_counts: StatsMap<i32, u64>,
    /// field id: 110
    /// key field id: 121
    /// value field id: 122
    #[builder(default, setter(into))]
    pub(crate) null_value_counts: StatsMap<i32, u64>,
    /// field id: 137
    /// key field id: 138
    /// value field id: 139
    #[builder(default, setter(into))]
    pub(crate) nan_value_counts: StatsMap<i32, u64>,
    /// field id: 125
    /// key field id: 126
    /// value field id: 127
    ///
    /// Map from column id to lower bound in the column, in the binary
    /// single-value serialization of the column type. Each value must be
    /// less than or equal to all non-null, non-NaN values in the column.
    #[builder(default, setter(into))]
    pub(crate) lower_bounds: StatsMap<i32, Vec<u8>>,
    /// field id: 128
    /// key field id: 129
    /// value field id: 130
    ///
    /// Map from column id to upper bound in the column, in the binary
    /// single-value serialization of the column type.
    #[builder(default, setter(into))]
    pub(crate) upper_bounds: StatsMap<i32, Vec<u8>>,
    /// field id: 131
    ///
    /// Implementation-specific key metadata for encryption
    #[builder(default, setter(strip_option))]
    pub(crate) key_metadata: Option<Vec<u8>>,
    /// field id: 132
    /// element field id: 133
    ///
    /// Split offsets for the data file, sorted ascending
    #[builder(default)]
    pub(crate) split_offsets: Vec<i64>,
    /// field id: 135
    /// element field id: 136
    ///
    /// Field ids used to determine row equality in equality delete files.
    /// Required when content is EqualityDeletes.
    #[builder(default, setter(strip_option))]
    pub(crate) equality_ids: Option<Vec<i32>>,
    /// field id: 140
    ///
    /// ID representing sort order for this file.
    #[builder(default, setter(strip_option))]
    pub(crate) sort_order_id: Option<i32>,
    /// Id of the partition spec `partition` was produced by. Not encoded in
    /// the entry: writers require it to match the manifest's spec, readers
    /// set it from the manifest.
    #[builder(default)]
    pub(crate) partition_spec_id: i32,
}

impl DataFile {
    /// Get the content type of the data file (data, equality deletes, or position deletes)
    pub fn content_type(&self) -> DataContentType {
        self.content
    }
    /// Get the file path as full URI with FS scheme
    pub fn file_path(&self) -> &str {
        &self.file_path
    }
    /// Get the file format of the file.
    pub fn file_format(&self) -> DataFileFormat {
        self.file_format
    }
    /// Get the partition values of the file.
    pub fn partition(&self) -> &Struct {
        &self.partition
    }
    /// Get the record count in the data file.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }
    /// Get the file size in bytes.
    pub fn file_size_in_bytes(&self) -> u64 {
        self.file_size_in_bytes
    }
    /// Get the column sizes.
    pub fn column_sizes(&self) -> &StatsMap<i32, u64> {
        &self.column_sizes
    }
    /// Get the columns value counts for the data file.
    pub fn value_counts(&self) -> &StatsMap<i32, u64> {
        &self.value_counts
    }
    /// Get the null value counts of the data file.
    pub fn null_value_counts(&self) -> &StatsMap<i32, u64> {
        &self.null_value_counts
    }
    /// Get the nan value counts of the data file.
    pub fn nan_value_counts(&self) -> &StatsMap<i32, u64> {
        &self.nan_value_counts
    }
    /// Get the serialized lower bounds of the data file values per column.
    pub fn lower_bounds(&self) -> &StatsMap<i32, Vec<u8>> {
        &self.lower_bounds
    }
    /// Get the serialized upper bounds of the data file values per column.
    pub fn upper_bounds(&self) -> &StatsMap<i32, Vec<u8>> {
        &self.upper_bounds
    }
    /// Lower bound of column `field_id` decoded as `ty`.
    pub fn lower_bound(&self, field_id: i32, ty: PrimitiveType) -> Result<Option<Datum>> {
        self.lower_bounds
            .get(&field_id)
            .map(|bytes| Datum::try_from_bytes(bytes, ty))
            .transpose()
    }
    /// Upper bound of column `field_id` decoded as `ty`.
    pub fn upper_bound(&self, field_id: i32, ty: PrimitiveType) -> Result<Option<Datum>> {
        self.upper_bounds
            .get(&field_id)
            .map(|bytes| Datum::try_from_bytes(bytes, ty))
            .transpose()
    }
    /// Get the Implementation-specific key metadata for the data file.
    pub fn key_metadata(&self) -> Option<&[u8]> {
        self.key_metadata.as_deref()
    }
    /// Get the split offsets of the data file.
    pub fn split_offsets(&self) -> &[i64] {
        &self.split_offsets
    }
    /// Get the equality ids of the data file.
    pub fn equality_ids(&self) -> Option<&[i32]> {
        self.equality_ids.as_deref()
    }
    /// Get the sort order id of the data file.
    pub fn sort_order_id(&self) -> Option<i32> {
        self.sort_order_id
    }
    /// Id of the partition spec of this file's partition tuple.
    pub fn partition_spec_id(&self) -> i32 {
        self.partition_spec_id
    }
}

impl DataFileBuilder {
    /// Set a lower bound from a value, serialized with the binary
    /// single-value encoding of its type.
    pub fn lower_bound(&mut self, field_id: i32, value: &Datum) -> &mut Self {
        push_bound(&mut self.lower_bounds, field_id, value);
        self
    }

    /// Set an upper bound from a value, serialized with the binary
    /// single-value encoding of its type.
    pub fn upper_bound(&mut self, field_id: i32, value: &Datum) -> &mut Self {
        push_bound(&mut self.upper_bounds, field_id, value);
        self
    }
}

fn push_bound(bounds: &mut Option<StatsMap<i32, Vec<u8>>>, field_id: i32, value: &Datum) {
    let mut pairs = bounds.take().map(StatsMap::into_inner).unwrap_or_default();
    pairs.retain(|(id, _)| *id != field_id);
    pairs.push((field_id, value.to_bytes()));
    *bounds = Some(pairs.into());
}

/// Type of content stored by the data file: data, equality deletes, or
/// position deletes (all v1 files are data files)
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DataContentType {
    /// Rows of the table. Wire code 0.
    Data,
    /// Positions of deleted rows. Wire code 1.
    PositionDeletes,
    /// Column values identifying deleted rows. Wire code 2.
    EqualityDeletes,
}

impl DataContentType {
    /// Code of this content type in manifests.
    pub fn wire_code(self) -> i32 {
        match self {
            DataContentType::Data => 0,
            DataContentType::PositionDeletes => 1,
            DataContentType::EqualityDeletes => 2,
        }
    }
}

impl TryFrom<i32> for DataContentType {
    type Error = Error;

    fn try_from(v: i32) -> Result<DataContentType> {
        match v {
            0 => Ok(DataContentType::Data),
            1 => Ok(DataContentType::PositionDeletes),
            2 => Ok(DataContentType::EqualityDeletes),
            _ => Err(Error::new(
                ErrorKind::MalformedEntry,
                format!("data content type {v} is invalid"),
            )),
        }
    }
}

/// Format of this data.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum DataFileFormat {
    /// Avro file format: <https://avro.apache.org/>
    Avro,
    /// Orc file format: <https://orc.apache.org/>
    Orc,
    /// Parquet file format: <https://parquet.apache.org/>
    Parquet,
    /// Puffin file format: <https://iceberg.apache.org/puffin-spec/>
    Puffin,
}

impl FromStr for DataFileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "avro" => Ok(Self::Avro),
            "orc" => Ok(Self::Orc),
            "parquet" => Ok(Self::Parquet),
            "puffin" => Ok(Self::Puffin),
            _ => Err(Error::new(
                ErrorKind::MalformedEntry,
                format!("Unsupported data file format: {s}"),
            )),
        }
    }
}

/// Formats as the upper-case name stored in manifests.
impl fmt::Display for DataFileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFileFormat::Avro => write!(f, "AVRO"),
            DataFileFormat::Orc => write!(f, "ORC"),
            DataFileFormat::Parquet => write!(f, "PARQUET"),
            DataFileFormat::Puffin => write!(f, "PUFFIN"),
        }
    }
}
