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

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use iceberg_manifest::io::FileIO;
use iceberg_manifest::spec::{
    FormatVersion, ManifestContentType, ManifestEntry, ManifestList, ManifestReader,
    ManifestStatus, ManifestWriterBuilder, Struct,
};
use serde_json::{json, Value};
use tracing::info;

use crate::config::{self, WriteSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "iceberg-manifest",
    about = "Inspect and rewrite Apache Iceberg manifest files",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    pub output: OutputFormat,

    /// Table config file path (YAML) holding table properties.
    #[arg(long, global = true, env = "ICEBERG_MANIFEST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the header and entry counts of a manifest.
    #[command(name = "inspect")]
    Inspect(InspectArgs),

    /// Print the manifests referenced by a manifest list.
    #[command(name = "list", aliases = ["inspect-list"])]
    List(ListArgs),

    /// Rewrite a manifest with another codec or format version.
    #[command(name = "rewrite")]
    Rewrite(RewriteArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Manifest location (local path, file:// or memory://).
    pub path: String,

    /// Also print every entry.
    #[arg(long)]
    pub entries: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Manifest list location.
    pub path: String,
}

#[derive(Debug, Args)]
pub struct RewriteArgs {
    /// Manifest to read.
    pub input: String,

    /// Location of the rewritten manifest.
    #[arg(id = "output_path", value_name = "OUTPUT")]
    pub output: String,

    /// Format version of the rewritten manifest; defaults to the
    /// `format-version` table property.
    #[arg(long)]
    pub format_version: Option<u8>,

    /// Codec of the rewritten manifest; defaults to the
    /// `write.avro.compression-codec` table property.
    #[arg(long)]
    pub codec: Option<String>,

    /// Snapshot id of the rewriting writer; defaults to the snapshot that
    /// added the entries when they all share one.
    #[arg(long)]
    pub snapshot_id: Option<i64>,
}

impl Cli {
    pub async fn run(self) -> std::process::ExitCode {
        match self.run_inner().await {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err:#}");
                std::process::ExitCode::FAILURE
            }
        }
    }

    async fn run_inner(self) -> anyhow::Result<()> {
        let payload = match &self.command {
            Commands::Inspect(args) => inspect(args).await?,
            Commands::List(args) => list(args).await?,
            Commands::Rewrite(args) => {
                let cfg = self
                    .config
                    .as_deref()
                    .map(config::load_table_config_file)
                    .transpose()?;
                rewrite(args, cfg.as_ref()).await?
            }
        };

        if self.output == OutputFormat::Json {
            println!("{}", serde_json::to_string(&payload)?);
        } else {
            print_human(&payload);
        }
        Ok(())
    }
}

async fn inspect(args: &InspectArgs) -> anyhow::Result<Value> {
    let file_io = FileIO::from_path(&args.path)?;
    let reader = ManifestReader::open(&file_io.new_input(&args.path)?).await?;
    let codec = reader.codec();
    let (metadata, entries) = reader.read_all()?;

    let count = |status| entries.iter().filter(|e| e.status() == status).count();
    let mut payload = json!({
        "command": "inspect",
        "path": args.path,
        "format_version": metadata.format_version().as_u8(),
        "content": metadata.content().to_string(),
        "codec": codec.to_string(),
        "schema_id": metadata.schema_id(),
        "partition_spec": serde_json::to_value(metadata.partition_spec())?,
        "result": {
            "entries": entries.len(),
            "added": count(ManifestStatus::Added),
            "existing": count(ManifestStatus::Existing),
            "deleted": count(ManifestStatus::Deleted),
        }
    });
    if args.entries {
        payload["entries"] = entries.iter().map(entry_to_json).collect();
    }
    Ok(payload)
}

async fn list(args: &ListArgs) -> anyhow::Result<Value> {
    let file_io = FileIO::from_path(&args.path)?;
    let bytes = file_io.new_input(&args.path)?.read().await?;
    let manifest_list = ManifestList::parse(&bytes)
        .with_context(|| format!("failed to parse manifest list {}", args.path))?;

    let manifests: Vec<Value> = manifest_list
        .entries()
        .iter()
        .map(|m| {
            json!({
                "path": m.manifest_path,
                "length": m.manifest_length,
                "partition_spec_id": m.partition_spec_id,
                "content": m.content.to_string(),
                "sequence_number": m.sequence_number,
                "min_sequence_number": m.min_sequence_number,
                "added_snapshot_id": m.added_snapshot_id,
                "added_files": m.added_files_count,
                "existing_files": m.existing_files_count,
                "deleted_files": m.deleted_files_count,
            })
        })
        .collect();

    Ok(json!({
        "command": "list",
        "path": args.path,
        "result": {
            "manifests": manifests.len(),
        },
        "manifests": manifests,
    }))
}

async fn rewrite(
    args: &RewriteArgs,
    cfg: Option<&config::TableConfigFile>,
) -> anyhow::Result<Value> {
    let settings = WriteSettings::resolve(cfg, args.format_version, args.codec.as_deref())?;
    let start = Instant::now();

    let input_io = FileIO::from_path(&args.input)?;
    let (metadata, entries) = ManifestReader::open(&input_io.new_input(&args.input)?)
        .await?
        .read_all()?;

    let snapshot_id = args.snapshot_id.or_else(|| shared_added_snapshot_id(&entries));
    let output_io = FileIO::from_path(&args.output)?;
    let output = output_io.new_output(&args.output)?;
    let builder = ManifestWriterBuilder::new(
        output,
        snapshot_id,
        None,
        metadata.schema().clone(),
        metadata.partition_spec().clone(),
    )
    .with_compression(settings.codec);
    let mut writer = match (settings.format_version, metadata.content()) {
        (FormatVersion::V1, _) => builder.build_v1()?,
        (FormatVersion::V2, ManifestContentType::Data) => builder.build_v2_data()?,
        (FormatVersion::V2, ManifestContentType::Deletes) => builder.build_v2_deletes()?,
    };

    let upgrade = metadata.format_version() == FormatVersion::V1
        && settings.format_version == FormatVersion::V2;
    let total = entries.len();
    for mut entry in entries {
        if upgrade {
            entry.inherit_initial_sequence_number();
        }
        let path = entry.file_path().to_string();
        writer
            .add_entry(entry)
            .with_context(|| format!("cannot rewrite entry of {path}"))?;
    }
    let summary = writer.write_manifest_file().await?;
    let duration_ms = start.elapsed().as_millis() as u64;
    info!(
        input = %args.input,
        output = %args.output,
        entries = total,
        "rewrote manifest"
    );

    Ok(json!({
        "command": "rewrite",
        "input": args.input,
        "output": summary.manifest_path,
        "format_version": settings.format_version.as_u8(),
        "codec": settings.codec.to_string(),
        "result": {
            "entries": total,
            "length": summary.manifest_length,
            "duration_ms": duration_ms,
        }
    }))
}

/// The snapshot that added every `Added` entry, if there is exactly one.
fn shared_added_snapshot_id(entries: &[ManifestEntry]) -> Option<i64> {
    let mut ids = entries
        .iter()
        .filter(|e| e.status() == ManifestStatus::Added)
        .map(ManifestEntry::snapshot_id);
    let first = ids.next()??;
    ids.all(|id| id == Some(first)).then_some(first)
}

fn entry_to_json(entry: &ManifestEntry) -> Value {
    let data_file = entry.data_file();
    json!({
        "status": format!("{:?}", entry.status()),
        "snapshot_id": entry.snapshot_id(),
        "sequence_number": entry.sequence_number(),
        "file_sequence_number": entry.file_sequence_number(),
        "content": format!("{:?}", entry.content_type()),
        "file_path": data_file.file_path(),
        "file_format": data_file.file_format().to_string(),
        "partition": partition_to_json(data_file.partition()),
        "record_count": data_file.record_count(),
        "file_size_in_bytes": data_file.file_size_in_bytes(),
    })
}

fn partition_to_json(partition: &Struct) -> Value {
    partition
        .iter()
        .map(|value| value.map_or(Value::Null, |datum| Value::String(datum.to_string())))
        .collect()
}

fn print_human(payload: &Value) {
    match payload["command"].as_str() {
        Some("inspect") => {
            let result = &payload["result"];
            println!(
                "{} manifest v{} ({}), schema {}, {} entries: {} added, {} existing, {} deleted",
                payload["content"].as_str().unwrap_or_default(),
                payload["format_version"],
                payload["codec"].as_str().unwrap_or_default(),
                payload["schema_id"],
                result["entries"],
                result["added"],
                result["existing"],
                result["deleted"],
            );
            for entry in payload["entries"].as_array().into_iter().flatten() {
                println!(
                    "  {:<8} {} ({} rows) partition {}",
                    entry["status"].as_str().unwrap_or_default(),
                    entry["file_path"].as_str().unwrap_or_default(),
                    entry["record_count"],
                    entry["partition"],
                );
            }
        }
        Some("list") => {
            for manifest in payload["manifests"].as_array().into_iter().flatten() {
                println!(
                    "{} seq {} snapshot {} ({} manifest, {} added files)",
                    manifest["path"].as_str().unwrap_or_default(),
                    manifest["sequence_number"],
                    manifest["added_snapshot_id"],
                    manifest["content"].as_str().unwrap_or_default(),
                    manifest["added_files"],
                );
            }
        }
        Some("rewrite") => {
            println!(
                "Rewrote {} entries to {}",
                payload["result"]["entries"],
                payload["output"].as_str().unwrap_or_default()
            );
        }
        _ => println!("{payload}"),
    }
}
