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

use crate::{Error, ErrorKind, Result};

/// Iceberg format version
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FormatVersion {
    /// Iceberg spec version 1
    V1 = 1u8,
    /// Iceberg spec version 2
    V2 = 2u8,
}

impl FormatVersion {
    /// The numeric form written to manifest headers.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FormatVersion {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(FormatVersion::V1),
            2 => Ok(FormatVersion::V2),
            other => Err(Error::new(
                ErrorKind::UnsupportedFormatVersion,
                format!("Format version {other} is not supported, expected 1 or 2"),
            )),
        }
    }
}

impl TryFrom<i32> for FormatVersion {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match u8::try_from(value) {
            Ok(v) => FormatVersion::try_from(v),
            Err(_) => Err(Error::new(
                ErrorKind::UnsupportedFormatVersion,
                format!("Format version {value} is not supported, expected 1 or 2"),
            )),
        }
    }
}

impl FromStr for FormatVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: i32 = s.trim().parse().map_err(|err| {
            Error::new(
                ErrorKind::UnsupportedFormatVersion,
                format!("Invalid format version '{s}'"),
            )
            .with_source(err)
        })?;
        FormatVersion::try_from(value)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}
