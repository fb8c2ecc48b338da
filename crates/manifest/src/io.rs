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

//! File io used by manifest writers and readers.
//!
//! The manifest core only needs a sequential byte sink with `close` and a
//! sequential byte source. [`FileIO`] provides both for the local filesystem
//! and for an in-memory store:
//!
//! | scheme | storage |
//! |--------|---------|
//! | `file://` or bare path | local filesystem |
//! | `memory://` | process-local map, shared by clones of the same [`FileIO`] |
//!
//! Written data becomes visible at its location only once the writer is
//! closed. The local filesystem writer stages bytes in a sibling temporary
//! file and renames it on close.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

use crate::{Error, ErrorKind, Result};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Sequential byte sink.
#[async_trait]
pub trait FileWrite: Send + Unpin + 'static {
    /// Append bytes to the sink.
    async fn write(&mut self, bs: Bytes) -> Result<()>;

    /// Flush and publish the written bytes. Must be called exactly once.
    async fn close(&mut self) -> Result<()>;
}

/// Sequential byte source.
#[async_trait]
pub trait FileRead: Send + Unpin + 'static {
    /// Read at most `n` bytes. An empty buffer means the source is exhausted.
    async fn read(&mut self, n: usize) -> Result<Bytes>;
}

#[derive(Debug, Clone)]
enum Storage {
    LocalFs,
    Memory(Arc<Mutex<HashMap<String, Bytes>>>),
}

impl Storage {
    fn scheme(&self) -> &'static str {
        match self {
            Storage::LocalFs => "file",
            Storage::Memory(_) => "memory",
        }
    }
}

/// Builder for [`FileIO`].
#[derive(Debug, Clone)]
pub struct FileIOBuilder {
    scheme: String,
}

impl FileIOBuilder {
    /// Creates a builder for the given scheme (`file` or `memory`).
    pub fn new(scheme: impl ToString) -> Self {
        Self {
            scheme: scheme.to_string(),
        }
    }

    /// Creates a builder for the local filesystem.
    pub fn new_fs_io() -> Self {
        Self::new("file")
    }

    /// Creates a builder for the in-memory store.
    pub fn new_memory_io() -> Self {
        Self::new("memory")
    }

    /// Builds the [`FileIO`].
    pub fn build(self) -> Result<FileIO> {
        let storage = match self.scheme.to_ascii_lowercase().as_str() {
            "file" | "" => Storage::LocalFs,
            "memory" => Storage::Memory(Arc::default()),
            other => {
                return Err(Error::new(
                    ErrorKind::FeatureUnsupported,
                    format!("Storage scheme {other} is not supported"),
                ));
            }
        };
        Ok(FileIO {
            storage: Arc::new(storage),
        })
    }
}

/// Entry point to create [`InputFile`]s and [`OutputFile`]s.
#[derive(Debug, Clone)]
pub struct FileIO {
    storage: Arc<Storage>,
}

impl FileIO {
    /// Create a [`FileIO`] whose storage is chosen from the scheme of `path`.
    ///
    /// Paths without a scheme are treated as local filesystem paths.
    pub fn from_path(path: impl AsRef<str>) -> Result<Self> {
        let path = path.as_ref();
        let scheme = match Url::parse(path) {
            Ok(url) => url.scheme().to_string(),
            Err(url::ParseError::RelativeUrlWithoutBase) => "file".to_string(),
            Err(err) => return Err(err.into()),
        };
        FileIOBuilder::new(scheme).build()
    }

    /// Creates an [`InputFile`] for `path`.
    pub fn new_input(&self, path: impl AsRef<str>) -> Result<InputFile> {
        let path = path.as_ref();
        self.check_scheme(path)?;
        Ok(InputFile {
            storage: self.storage.clone(),
            path: path.to_string(),
        })
    }

    /// Creates an [`OutputFile`] for `path`.
    pub fn new_output(&self, path: impl AsRef<str>) -> Result<OutputFile> {
        let path = path.as_ref();
        self.check_scheme(path)?;
        Ok(OutputFile {
            storage: self.storage.clone(),
            path: path.to_string(),
        })
    }

    /// Checks whether a file exists at `path`.
    pub async fn exists(&self, path: impl AsRef<str>) -> Result<bool> {
        self.new_input(path)?.exists().await
    }

    /// Deletes the file at `path`. Missing files are not an error.
    pub async fn delete(&self, path: impl AsRef<str>) -> Result<()> {
        let path = path.as_ref();
        self.check_scheme(path)?;
        match self.storage.as_ref() {
            Storage::LocalFs => match tokio::fs::remove_file(local_path(path)).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(Error::from(err).with_context("path", path)),
            },
            Storage::Memory(files) => {
                lock(files)?.remove(path);
                Ok(())
            }
        }
    }

    fn check_scheme(&self, path: &str) -> Result<()> {
        let scheme = match Url::parse(path) {
            Ok(url) => url.scheme().to_string(),
            Err(_) => return Ok(()),
        };
        // Single letter schemes are windows drive letters.
        if scheme.len() == 1 || scheme == self.storage.scheme() {
            return Ok(());
        }
        Err(Error::new(
            ErrorKind::FeatureUnsupported,
            format!(
                "Path {path} does not match the {} storage of this FileIO",
                self.storage.scheme()
            ),
        ))
    }
}

/// Input file: a location that can be read sequentially.
#[derive(Debug, Clone)]
pub struct InputFile {
    storage: Arc<Storage>,
    path: String,
}

impl InputFile {
    /// Absolute path to the file.
    pub fn location(&self) -> &str {
        &self.path
    }

    /// Checks whether the file exists.
    pub async fn exists(&self) -> Result<bool> {
        match self.storage.as_ref() {
            Storage::LocalFs => Ok(tokio::fs::try_exists(local_path(&self.path)).await?),
            Storage::Memory(files) => Ok(lock(files)?.contains_key(&self.path)),
        }
    }

    /// Opens a sequential reader.
    pub async fn reader(&self) -> Result<Box<dyn FileRead>> {
        match self.storage.as_ref() {
            Storage::LocalFs => {
                let file = tokio::fs::File::open(local_path(&self.path))
                    .await
                    .map_err(|err| Error::from(err).with_context("path", self.path.clone()))?;
                Ok(Box::new(LocalFsReader { file }))
            }
            Storage::Memory(files) => {
                let data = lock(files)?.get(&self.path).cloned().ok_or_else(|| {
                    Error::new(ErrorKind::Io, "File not found in memory storage")
                        .with_context("path", self.path.clone())
                })?;
                Ok(Box::new(MemoryReader { data }))
            }
        }
    }

    /// Reads the whole file through sequential reads.
    pub async fn read(&self) -> Result<Bytes> {
        let mut reader = self.reader().await?;
        let mut buf = BytesMut::new();
        loop {
            let chunk = reader.read(READ_CHUNK_SIZE).await?;
            if chunk.is_empty() {
                break;
            }
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }
}

/// Output file: a location that can be written sequentially and published on close.
#[derive(Debug, Clone)]
pub struct OutputFile {
    storage: Arc<Storage>,
    path: String,
}

impl OutputFile {
    /// Absolute path to the file.
    pub fn location(&self) -> &str {
        &self.path
    }

    /// Checks whether something has already been published at this location.
    pub async fn exists(&self) -> Result<bool> {
        self.to_input_file().exists().await
    }

    /// Converts into an [`InputFile`] for the same location.
    pub fn to_input_file(&self) -> InputFile {
        InputFile {
            storage: self.storage.clone(),
            path: self.path.clone(),
        }
    }

    /// Creates a sequential writer.
    pub async fn writer(&self) -> Result<Box<dyn FileWrite>> {
        match self.storage.as_ref() {
            Storage::LocalFs => {
                let target = local_path(&self.path);
                let staging = staging_path(&target);
                let file = tokio::fs::File::create(&staging)
                    .await
                    .map_err(|err| Error::from(err).with_context("path", self.path.clone()))?;
                Ok(Box::new(LocalFsWriter {
                    file: Some(file),
                    staging,
                    target,
                    published: false,
                }))
            }
            Storage::Memory(files) => Ok(Box::new(MemoryWriter {
                files: files.clone(),
                path: self.path.clone(),
                buf: Some(BytesMut::new()),
            })),
        }
    }

    /// Writes `bs` as the whole content of the file and publishes it.
    pub async fn write(&self, bs: Bytes) -> Result<()> {
        let mut writer = self.writer().await?;
        writer.write(bs).await?;
        writer.close().await
    }
}

fn local_path(path: &str) -> PathBuf {
    PathBuf::from(path.strip_prefix("file://").unwrap_or(path))
}

fn staging_path(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4()))
}

fn lock(
    files: &Mutex<HashMap<String, Bytes>>,
) -> Result<std::sync::MutexGuard<'_, HashMap<String, Bytes>>> {
    files
        .lock()
        .map_err(|_| Error::new(ErrorKind::Unexpected, "Memory storage lock is poisoned"))
}

fn closed_error() -> Error {
    Error::new(ErrorKind::Unexpected, "Writer has already been closed")
}

/// Writes to a staging file next to the target. The staging file is
/// removed unless `close` renamed it onto the target.
struct LocalFsWriter {
    file: Option<tokio::fs::File>,
    staging: PathBuf,
    target: PathBuf,
    published: bool,
}

impl LocalFsWriter {
    async fn publish(&self, mut file: tokio::fs::File) -> Result<()> {
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&self.staging, &self.target)
            .await
            .map_err(|err| {
                Error::from(err).with_context("path", self.target.display().to_string())
            })
    }
}

#[async_trait]
impl FileWrite for LocalFsWriter {
    async fn write(&mut self, bs: Bytes) -> Result<()> {
        let file = self.file.as_mut().ok_or_else(closed_error)?;
        file.write_all(&bs).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or_else(closed_error)?;
        match self.publish(file).await {
            Ok(()) => {
                self.published = true;
                Ok(())
            }
            Err(err) => {
                let _ = tokio::fs::remove_file(&self.staging).await;
                Err(err)
            }
        }
    }
}

impl Drop for LocalFsWriter {
    fn drop(&mut self) {
        if !self.published {
            drop(self.file.take());
            let _ = std::fs::remove_file(&self.staging);
        }
    }
}

struct LocalFsReader {
    file: tokio::fs::File,
}

#[async_trait]
impl FileRead for LocalFsReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let mut buf = vec![0u8; n];
        let len = self.file.read(&mut buf).await?;
        buf.truncate(len);
        Ok(Bytes::from(buf))
    }
}

struct MemoryWriter {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    path: String,
    buf: Option<BytesMut>,
}

#[async_trait]
impl FileWrite for MemoryWriter {
    async fn write(&mut self, bs: Bytes) -> Result<()> {
        self.buf
            .as_mut()
            .ok_or_else(closed_error)?
            .extend_from_slice(&bs);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let buf = self.buf.take().ok_or_else(closed_error)?;
        lock(&self.files)?.insert(self.path.clone(), buf.freeze());
        Ok(())
    }
}

struct MemoryReader {
    data: Bytes,
}

#[async_trait]
impl FileRead for MemoryReader {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        let n = n.min(self.data.len());
        Ok(self.data.split_to(n))
    }
}
