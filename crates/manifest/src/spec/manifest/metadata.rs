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

use std::sync::Arc;

use typed_builder::TypedBuilder;

use crate::avro::ContainerHeader;
use crate::spec::manifest_list::ManifestContentType;
use crate::spec::{
    FormatVersion, PartitionField, PartitionSpec, Schema, SchemaId, SchemaRef,
};
use crate::{Error, ErrorKind, Result};

pub(crate) const SCHEMA_KEY: &str = "schema";
pub(crate) const SCHEMA_ID_KEY: &str = "schema-id";
pub(crate) const PARTITION_SPEC_KEY: &str = "partition-spec";
pub(crate) const PARTITION_SPEC_ID_KEY: &str = "partition-spec-id";
pub(crate) const FORMAT_VERSION_KEY: &str = "format-version";
pub(crate) const CONTENT_KEY: &str = "content";

/// Meta data of a manifest that is stored in the key-value metadata of the Avro file
#[derive(Debug, PartialEq, Clone, Eq, TypedBuilder)]
pub struct ManifestMetadata {
    /// The table schema at the time the manifest
    /// was written
    pub(crate) schema: SchemaRef,
    /// ID of the schema used to write the manifest as a string
    pub(crate) schema_id: SchemaId,
    /// The partition spec used  to write the manifest
    pub(crate) partition_spec: PartitionSpec,
    /// Table format version number of the manifest as a string
    pub(crate) format_version: FormatVersion,
    /// Type of content files tracked by the manifest: "data" or "deletes"
    pub(crate) content: ManifestContentType,
}

impl ManifestMetadata {
    /// Parse from the metadata of an Avro container header.
    ///
    /// A missing `format-version` means version 1, a missing `content` means
    /// a data manifest. The schema and the partition spec fields are required.
    pub fn parse(header: &ContainerHeader) -> Result<Self> {
        let schema = {
            let bs = header.get(SCHEMA_KEY).ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "schema is required in manifest metadata but not found",
                )
            })?;
            serde_json::from_slice::<Schema>(bs).map_err(|err| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "Fail to parse schema in manifest metadata",
                )
                .with_source(err)
            })?
        };
        let schema_id: i32 = header
            .get_str(SCHEMA_ID_KEY)?
            .map(str::parse)
            .transpose()?
            .unwrap_or_else(|| schema.schema_id());
        let partition_spec = {
            let fs = header.get(PARTITION_SPEC_KEY).ok_or_else(|| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "partition-spec is required in manifest metadata but not found",
                )
            })?;
            let fields = serde_json::from_slice::<Vec<PartitionField>>(fs).map_err(|err| {
                Error::new(
                    ErrorKind::DataInvalid,
                    "Fail to parse partition spec in manifest metadata",
                )
                .with_source(err)
            })?;
            let spec_id: i32 = header
                .get_str(PARTITION_SPEC_ID_KEY)?
                .map(str::parse)
                .transpose()?
                .unwrap_or(0);
            fields
                .into_iter()
                .fold(PartitionSpec::builder().with_spec_id(spec_id), |builder, field| {
                    builder.add_unbound_field(field)
                })
                .build()
        };
        let format_version = match header.get_str(FORMAT_VERSION_KEY)? {
            Some(version) => FormatVersion::try_from(version.trim().parse::<i32>().map_err(
                |err| {
                    Error::new(
                        ErrorKind::UnsupportedFormatVersion,
                        format!("Invalid format version '{version}' in manifest metadata"),
                    )
                    .with_source(err)
                },
            )?)?,
            None => FormatVersion::V1,
        };
        let content = match header.get_str(CONTENT_KEY)? {
            Some(content) => content.parse()?,
            None => ManifestContentType::Data,
        };
        Ok(ManifestMetadata {
            schema: Arc::new(schema),
            schema_id,
            partition_spec,
            format_version,
            content,
        })
    }

    /// Key-value pairs written to the Avro header.
    pub(crate) fn to_header_entries(&self) -> Result<Vec<(&'static str, String)>> {
        let mut entries = vec![
            (SCHEMA_KEY, serde_json::to_string(self.schema.as_ref())?),
            (SCHEMA_ID_KEY, self.schema_id.to_string()),
            (
                PARTITION_SPEC_KEY,
                serde_json::to_string(self.partition_spec.fields())?,
            ),
            (
                PARTITION_SPEC_ID_KEY,
                self.partition_spec.spec_id().to_string(),
            ),
            (FORMAT_VERSION_KEY, self.format_version.to_string()),
        ];
        if self.format_version == FormatVersion::V2 {
            entries.push((CONTENT_KEY, self.content.to_string()));
        }
        Ok(entries)
    }

    /// The table schema the manifest was written with.
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// Id of the table schema.
    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    /// The partition spec of every entry in the manifest.
    pub fn partition_spec(&self) -> &PartitionSpec {
        &self.partition_spec
    }

    /// Format version of the manifest.
    pub fn format_version(&self) -> FormatVersion {
        self.format_version
    }

    /// Whether the manifest tracks data files or delete files.
    pub fn content(&self) -> ManifestContentType {
        self.content
    }
}
