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

use std::collections::HashMap;

use super::format_version::FormatVersion;
use crate::codec::CompressionCodec;

// Helper function to parse a property from a HashMap
// If the property is not found, use the default value
fn parse_property<T: std::str::FromStr>(
    properties: &HashMap<String, String>,
    key: &str,
    default: T,
) -> std::result::Result<T, anyhow::Error>
where
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    properties.get(key).map_or(Ok(default), |value| {
        value
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {key}: {e}"))
    })
}

/// Table properties that drive how manifests are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProperties {
    /// Format version of new manifests.
    pub format_version: FormatVersion,
    /// Codec for manifest and manifest list files.
    pub avro_compression_codec: CompressionCodec,
}

impl TableProperties {
    /// Reserved table property for table format version.
    ///
    /// Decides which fields manifests carry, see [`FormatVersion`].
    pub const PROPERTY_FORMAT_VERSION: &str = "format-version";
    /// Default format version of new tables.
    pub const PROPERTY_FORMAT_VERSION_DEFAULT: FormatVersion = FormatVersion::V2;

    /// Compression codec of Avro metadata files: manifests and manifest lists.
    ///
    /// Accepts every name [`CompressionCodec::resolve`] does.
    pub const PROPERTY_AVRO_COMPRESSION: &str = "write.avro.compression-codec";
    /// Default Avro compression codec.
    pub const PROPERTY_AVRO_COMPRESSION_DEFAULT: &str = "gzip";
}

impl Default for TableProperties {
    fn default() -> Self {
        Self {
            format_version: Self::PROPERTY_FORMAT_VERSION_DEFAULT,
            avro_compression_codec: CompressionCodec::Deflate,
        }
    }
}

impl TryFrom<&HashMap<String, String>> for TableProperties {
    // parse by entry key or use default value
    type Error = anyhow::Error;

    fn try_from(props: &HashMap<String, String>) -> std::result::Result<Self, Self::Error> {
        Ok(TableProperties {
            format_version: parse_property(
                props,
                TableProperties::PROPERTY_FORMAT_VERSION,
                TableProperties::PROPERTY_FORMAT_VERSION_DEFAULT,
            )?,
            avro_compression_codec: parse_property(
                props,
                TableProperties::PROPERTY_AVRO_COMPRESSION,
                TableProperties::PROPERTY_AVRO_COMPRESSION_DEFAULT.parse()?,
            )?,
        })
    }
}
