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

//! Apache Iceberg manifest files in native Rust.
//!
//! Manifests list the data and delete files of a snapshot together with
//! their partition tuple and column statistics. This crate projects a table
//! schema and partition spec onto the manifest layout of format version 1
//! or 2, writes entries into Avro container files and reads them back.
//!
//! ```no_run
//! use iceberg_manifest::io::FileIOBuilder;
//! use iceberg_manifest::spec::{
//!     write_manifest, DataFileBuilder, DataFileFormat, PartitionSpec, Schema,
//! };
//!
//! # async fn example(schema: Schema) -> iceberg_manifest::Result<()> {
//! let io = FileIOBuilder::new_fs_io().build()?;
//! let output = io.new_output("/tmp/table/metadata/m0.avro")?;
//! let mut writer = write_manifest(2, PartitionSpec::unpartition_spec(), schema, output, 1, "deflate")?;
//! writer.add_file(
//!     DataFileBuilder::default()
//!         .file_path("/tmp/table/data/00000.parquet")
//!         .file_format(DataFileFormat::Parquet)
//!         .record_count(10)
//!         .file_size_in_bytes(1024)
//!         .build()?,
//!     None,
//! )?;
//! let summary = writer.write_manifest_file().await?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod error;
pub use error::{Error, ErrorKind, Result};

pub mod avro;
pub mod codec;
pub use codec::CompressionCodec;
pub mod io;
pub mod spec;
