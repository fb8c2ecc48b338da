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
use std::path::{Path, PathBuf};

use anyhow::Context;
use iceberg_manifest::spec::{FormatVersion, TableProperties};
use iceberg_manifest::CompressionCodec;
use serde_derive::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableConfigFile {
    /// Optional table name (used only for logging/debugging).
    pub name: Option<String>,

    /// Table properties, e.g. `format-version` or
    /// `write.avro.compression-codec`.
    #[serde(default)]
    pub props: HashMap<String, String>,
}

impl TableConfigFile {
    pub fn table_properties(&self) -> anyhow::Result<TableProperties> {
        TableProperties::try_from(&self.props).with_context(|| match &self.name {
            Some(name) => format!("invalid properties of table {name}"),
            None => "invalid table properties".to_string(),
        })
    }
}

/// Write settings after applying command line overrides to the table
/// properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSettings {
    pub format_version: FormatVersion,
    pub codec: CompressionCodec,
}

impl WriteSettings {
    pub fn resolve(
        config: Option<&TableConfigFile>,
        format_version: Option<u8>,
        codec: Option<&str>,
    ) -> anyhow::Result<Self> {
        let props = match config {
            Some(cfg) => cfg.table_properties()?,
            None => TableProperties::default(),
        };
        let codec = match codec {
            Some(name) => CompressionCodec::resolve(name)?,
            None => props.avro_compression_codec,
        };
        let format_version = match format_version {
            Some(version) => FormatVersion::try_from(version)?,
            None => props.format_version,
        };
        Ok(Self {
            format_version,
            codec,
        })
    }
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    let Some(path_str) = path.to_str() else {
        return path.to_path_buf();
    };

    if path_str == "~" {
        return dirs::home_dir().unwrap_or_else(|| path.to_path_buf());
    }

    let Some(rest) = path_str.strip_prefix("~/") else {
        return path.to_path_buf();
    };

    let Some(home) = dirs::home_dir() else {
        return path.to_path_buf();
    };

    home.join(rest)
}

pub fn load_table_config_file(path: &Path) -> anyhow::Result<TableConfigFile> {
    let path = expand_tilde(path);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read table config: {}", path.display()))?;
    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse table config: {}", path.display()))
}
