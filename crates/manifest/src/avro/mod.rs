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

//! Avro utilities
mod schema;
pub(crate) mod value;

use std::collections::HashMap;

use apache_avro::types::Value;
use apache_avro::{from_avro_datum, Schema as AvroSchema};
pub(crate) use schema::RecordLayout;
pub use schema::{avro_schema_json, sanitize_avro_name, schema_to_avro_schema};

use crate::codec::CompressionCodec;
use crate::{Error, ErrorKind, Result};

const AVRO_MAGIC: &[u8; 4] = b"Obj\x01";
const AVRO_SCHEMA_KEY: &str = "avro.schema";
const AVRO_CODEC_KEY: &str = "avro.codec";

/// Metadata block at the start of an Avro object container file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerHeader {
    metadata: HashMap<String, Vec<u8>>,
}

impl ContainerHeader {
    /// Reads the header of an Avro object container file.
    ///
    /// Only the magic and the metadata map are decoded; data blocks are left
    /// alone, so this is cheap enough to run before choosing how to decode
    /// the rest of the file.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let Some(body) = bytes.strip_prefix(AVRO_MAGIC.as_slice()) else {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Not an avro object container file: bad magic",
            ));
        };

        let map_schema = AvroSchema::parse_str(r#"{"type": "map", "values": "bytes"}"#)?;
        let mut cursor = body;
        let value = from_avro_datum(&map_schema, &mut cursor, None).map_err(|err| {
            Error::new(
                ErrorKind::DataInvalid,
                "Failed to decode avro container metadata",
            )
            .with_source(err)
        })?;

        let Value::Map(entries) = value else {
            return Err(Error::new(
                ErrorKind::DataInvalid,
                "Avro container metadata is not a map",
            ));
        };
        let metadata = entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::Bytes(bytes) => Ok((key, bytes)),
                other => Err(Error::new(
                    ErrorKind::DataInvalid,
                    format!("Avro container metadata value is not bytes: {other:?}"),
                )
                .with_context("key", key)),
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Self { metadata })
    }

    /// Raw value of a metadata key.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.metadata.get(key).map(Vec::as_slice)
    }

    /// Value of a metadata key as UTF-8.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>> {
        self.get(key)
            .map(|bytes| {
                std::str::from_utf8(bytes).map_err(|err| {
                    Error::new(
                        ErrorKind::DataInvalid,
                        format!("Avro container metadata '{key}' is not valid utf-8"),
                    )
                    .with_source(err)
                })
            })
            .transpose()
    }

    /// All metadata entries, including the reserved `avro.*` ones.
    pub fn metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.metadata
    }

    /// Codec recorded in `avro.codec`. A missing entry means no compression.
    pub fn codec(&self) -> Result<CompressionCodec> {
        match self.get_str(AVRO_CODEC_KEY)? {
            Some(name) => CompressionCodec::resolve(name),
            None => Ok(CompressionCodec::None),
        }
    }

    /// Writer schema recorded in `avro.schema`.
    pub fn schema_json(&self) -> Result<serde_json::Value> {
        let schema = self.get(AVRO_SCHEMA_KEY).ok_or_else(|| {
            Error::new(
                ErrorKind::DataInvalid,
                "Avro container header has no writer schema",
            )
        })?;
        Ok(serde_json::from_slice(schema)?)
    }
}

#[cfg(test)]
mod tests {
    use apache_avro::{Codec, Writer};

    use super::*;

    fn container(codec: Codec) -> Vec<u8> {
        let schema = AvroSchema::parse_str(
            r#"{"type": "record", "name": "r", "fields": [{"name": "a", "type": "int", "field-id": 1}]}"#,
        )
        .unwrap();
        let mut writer = Writer::with_codec(&schema, Vec::new(), codec);
        writer
            .add_user_metadata("format-version".to_string(), "2")
            .unwrap();
        writer
            .append(Value::Record(vec![("a".to_string(), Value::Int(7))]))
            .unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_read_header() {
        let header = ContainerHeader::read(&container(Codec::Null)).unwrap();
        assert_eq!(header.get_str("format-version").unwrap(), Some("2"));
        assert_eq!(header.codec().unwrap(), CompressionCodec::None);

        let schema = header.schema_json().unwrap();
        let layout = RecordLayout::parse(&schema).unwrap();
        assert_eq!(layout.fields[0].name, "a");
        assert_eq!(layout.fields[0].field_id, Some(1));
    }

    #[test]
    fn test_read_header_bad_magic() {
        let err = ContainerHeader::read(b"PAR1....").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataInvalid);
        assert!(ContainerHeader::read(b"").is_err());
    }

    #[test]
    fn test_unknown_codec_in_header() {
        let mut metadata = HashMap::new();
        metadata.insert(AVRO_CODEC_KEY.to_string(), b"lzo".to_vec());
        let header = ContainerHeader { metadata };
        assert_eq!(
            header.codec().unwrap_err().kind(),
            ErrorKind::CodecUnavailable
        );
    }
}
