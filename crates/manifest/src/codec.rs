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

//! Compression codecs for manifest and manifest list files.
//!
//! The codec chosen by a writer is recorded in the Avro container header
//! (`avro.codec`), so readers resolve it from the file itself and never from
//! their own configuration.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use apache_avro::Codec;

use crate::{Error, ErrorKind, Result};

/// Compression codec applied to the blocks of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionCodec {
    /// Blocks are stored uncompressed.
    #[default]
    None,
    /// Raw deflate (RFC 1951). Also selected by the table property value `gzip`.
    Deflate,
    /// Snappy with a trailing CRC32 per block.
    Snappy,
    /// Zstandard.
    Zstd,
}

impl CompressionCodec {
    /// Every codec this build can read and write.
    pub const AVAILABLE: [CompressionCodec; 4] = [
        CompressionCodec::None,
        CompressionCodec::Deflate,
        CompressionCodec::Snappy,
        CompressionCodec::Zstd,
    ];

    /// Resolve a codec by name.
    ///
    /// Names are case-insensitive and accept both the Avro spelling
    /// (`null`, `deflate`, `snappy`, `zstandard`) and the table property
    /// spelling (`none`, `gzip`, `zstd`).
    ///
    /// # Errors
    ///
    /// [`ErrorKind::CodecUnavailable`] when the name is unknown, or when the
    /// format knows it (`bzip2`, `xz`) but this build does not ship it.
    pub fn resolve(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let codec = match normalized.as_str() {
            "" | "null" | "none" | "uncompressed" => CompressionCodec::None,
            "deflate" | "gzip" => CompressionCodec::Deflate,
            "snappy" => CompressionCodec::Snappy,
            "zstd" | "zstandard" => CompressionCodec::Zstd,
            "bzip2" | "xz" => {
                return Err(Error::new(
                    ErrorKind::CodecUnavailable,
                    format!("Compression codec '{name}' is not enabled in this build"),
                ));
            }
            _ => {
                return Err(Error::new(
                    ErrorKind::CodecUnavailable,
                    format!("Unknown compression codec '{name}'"),
                ));
            }
        };

        // Fail before anything is written if the avro runtime lacks the codec.
        codec.to_avro()?;
        Ok(codec)
    }

    /// Name of the codec as recorded in the `avro.codec` header entry.
    pub fn avro_name(&self) -> &'static str {
        match self {
            CompressionCodec::None => "null",
            CompressionCodec::Deflate => "deflate",
            CompressionCodec::Snappy => "snappy",
            CompressionCodec::Zstd => "zstandard",
        }
    }

    /// Compress a single block.
    pub fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut buf = bytes.to_vec();
        self.to_avro()?.compress(&mut buf)?;
        Ok(buf)
    }

    /// Decompress a single block produced by [`CompressionCodec::compress`].
    pub fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut buf = bytes.to_vec();
        self.to_avro()?.decompress(&mut buf)?;
        Ok(buf)
    }

    pub(crate) fn to_avro(self) -> Result<Codec> {
        Codec::from_str(self.avro_name()).map_err(|err| {
            Error::new(
                ErrorKind::CodecUnavailable,
                format!(
                    "Compression codec '{}' is not supported by the avro runtime",
                    self.avro_name()
                ),
            )
            .with_source(err)
        })
    }
}

impl FromStr for CompressionCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CompressionCodec::resolve(s)
    }
}

impl Display for CompressionCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.avro_name())
    }
}
