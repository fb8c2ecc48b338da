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

//! Write manifests through [`FileIO`] and read them back.

use iceberg_manifest::io::{FileIO, FileIOBuilder, OutputFile};
use iceberg_manifest::spec::{
    write_manifest, DataContentType, DataFile, DataFileBuilder, DataFileFormat, Datum,
    FormatVersion, Manifest, ManifestContentType, ManifestEntry, ManifestReader, ManifestStatus,
    ManifestWriterBuilder, NestedField, PartitionSpec, PrimitiveLiteral, PrimitiveType, Schema,
    Struct, Transform,
};
use iceberg_manifest::{CompressionCodec, ErrorKind};
use uuid::Uuid;

fn memory_io() -> FileIO {
    FileIOBuilder::new_memory_io().build().unwrap()
}

fn output(io: &FileIO, name: &str) -> OutputFile {
    io.new_output(format!("memory://table/metadata/{name}"))
        .unwrap()
}

fn wide_schema() -> Schema {
    Schema::builder()
        .with_schema_id(3)
        .with_fields(vec![
            NestedField::required(1, "id", PrimitiveType::Int.into()).into(),
            NestedField::optional(2, "data", PrimitiveType::String.into()).into(),
            NestedField::optional(3, "b", PrimitiveType::Boolean.into()).into(),
            NestedField::optional(4, "l", PrimitiveType::Long.into()).into(),
            NestedField::optional(5, "f", PrimitiveType::Float.into()).into(),
            NestedField::optional(6, "d", PrimitiveType::Double.into()).into(),
            NestedField::optional(
                7,
                "dec",
                PrimitiveType::Decimal {
                    precision: 10,
                    scale: 2,
                }
                .into(),
            )
            .into(),
            NestedField::optional(8, "dt", PrimitiveType::Date.into()).into(),
            NestedField::optional(9, "t", PrimitiveType::Time.into()).into(),
            NestedField::optional(10, "ts", PrimitiveType::Timestamp.into()).into(),
            NestedField::optional(11, "tstz", PrimitiveType::Timestamptz.into()).into(),
            NestedField::optional(12, "u", PrimitiveType::Uuid.into()).into(),
            NestedField::optional(13, "fx", PrimitiveType::Fixed(4).into()).into(),
            NestedField::optional(14, "bin", PrimitiveType::Binary.into()).into(),
            NestedField::optional(
                15,
                "big",
                PrimitiveType::Decimal {
                    precision: 38,
                    scale: 0,
                }
                .into(),
            )
            .into(),
        ])
        .build()
        .unwrap()
}

fn id_spec() -> PartitionSpec {
    PartitionSpec::builder()
        .with_spec_id(1)
        .add_partition_field(1, "id", Transform::Identity)
        .build()
}

fn data_file(path: &str, id: i32, spec_id: i32) -> DataFile {
    DataFileBuilder::default()
        .file_path(format!("memory://table/data/{path}"))
        .file_format(DataFileFormat::Parquet)
        .partition(Struct::from_iter([Some(Datum::int(id))]))
        .record_count(10)
        .file_size_in_bytes(1024)
        .partition_spec_id(spec_id)
        .build()
        .unwrap()
}

async fn read_entries(output: &OutputFile) -> Vec<ManifestEntry> {
    let input = output.to_input_file();
    ManifestReader::open(&input)
        .await
        .unwrap()
        .entries()
        .unwrap()
        .collect::<iceberg_manifest::Result<Vec<_>>>()
        .unwrap()
}

#[tokio::test]
async fn test_identity_partition_round_trip() {
    let io = memory_io();
    let out = output(&io, "m0.avro");
    let mut writer =
        write_manifest(2, id_spec(), wide_schema(), out.clone(), 100, "deflate").unwrap();
    writer
        .add_file(data_file("00000.parquet", 5, 1), Some(7))
        .unwrap();
    let summary = writer.write_manifest_file().await.unwrap();

    assert_eq!(summary.manifest_path, "memory://table/metadata/m0.avro");
    assert_eq!(summary.partition_spec_id, 1);
    assert_eq!(summary.content, ManifestContentType::Data);
    assert_eq!(summary.added_snapshot_id, 100);
    assert_eq!(summary.added_files_count, Some(1));
    assert_eq!(summary.added_rows_count, Some(10));
    assert_eq!(summary.min_sequence_number, 7);

    let reader = ManifestReader::open(&out.to_input_file()).await.unwrap();
    assert_eq!(reader.codec(), CompressionCodec::Deflate);
    assert_eq!(reader.metadata().format_version(), FormatVersion::V2);
    assert_eq!(reader.metadata().schema_id(), 3);
    assert_eq!(reader.metadata().content(), ManifestContentType::Data);

    let entries: Vec<_> = reader.entries().unwrap().map(Result::unwrap).collect();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.status(), ManifestStatus::Added);
    assert_eq!(entry.snapshot_id(), Some(100));
    assert_eq!(entry.sequence_number(), Some(7));
    assert_eq!(entry.content_type(), DataContentType::Data);
    assert_eq!(entry.data_file().record_count(), 10);
    assert_eq!(entry.data_file().file_size_in_bytes(), 1024);
    assert_eq!(
        entry.data_file().partition(),
        &Struct::from_iter([Some(Datum::int(5))])
    );
}

#[tokio::test]
async fn test_v2_entries_round_trip_with_all_fields() {
    let schema = wide_schema();
    let spec = PartitionSpec::builder()
        .with_spec_id(4)
        .add_partition_field(8, "dt", Transform::Identity)
        .add_partition_field(7, "dec", Transform::Identity)
        .add_partition_field(12, "u", Transform::Identity)
        .add_partition_field(2, "data", Transform::Identity)
        .build();

    let file = DataFileBuilder::default()
        .file_path("memory://table/data/full.parquet")
        .file_format(DataFileFormat::Orc)
        .partition(Struct::from_iter([
            Some(Datum::date_from_ymd(2024, 2, 29).unwrap()),
            Some(Datum::decimal(-12345, 10, 2).unwrap()),
            Some(Datum::uuid(Uuid::from_u128(0x1234_5678))),
            None,
        ]))
        .record_count(300)
        .file_size_in_bytes(65536)
        .column_sizes(vec![(1, 100u64), (2, 200)])
        .value_counts(vec![(1, 300u64), (2, 300)])
        .null_value_counts(vec![(1, 0u64), (2, 12)])
        .nan_value_counts(vec![(5, 3u64)])
        .lower_bound(1, &Datum::int(-3))
        .upper_bound(1, &Datum::int(9000))
        .lower_bound(2, &Datum::string("aardvark"))
        .key_metadata(vec![0xde, 0xad])
        .split_offsets(vec![4, 1024, 4096])
        .sort_order_id(2)
        .partition_spec_id(4)
        .build()
        .unwrap();

    let added = ManifestEntry::builder()
        .status(ManifestStatus::Added)
        .snapshot_id(9)
        .sequence_number(3)
        .file_sequence_number(3)
        .data_file(file.clone())
        .build();
    let existing = ManifestEntry::builder()
        .status(ManifestStatus::Existing)
        .snapshot_id(2)
        .sequence_number(1)
        .file_sequence_number(1)
        .data_file(file.clone())
        .build();
    let deleted = ManifestEntry::builder()
        .status(ManifestStatus::Deleted)
        .snapshot_id(9)
        .sequence_number(2)
        .file_sequence_number(1)
        .data_file(file)
        .build();

    let io = memory_io();
    let out = output(&io, "full.avro");
    let mut writer = ManifestWriterBuilder::new(out.clone(), Some(9), None, schema, spec)
        .with_compression(CompressionCodec::Snappy)
        .build_v2_data()
        .unwrap();
    for entry in [added.clone(), existing.clone(), deleted.clone()] {
        writer.add_entry(entry).unwrap();
    }
    let summary = writer.write_manifest_file().await.unwrap();
    assert_eq!(summary.added_files_count, Some(1));
    assert_eq!(summary.existing_files_count, Some(1));
    assert_eq!(summary.deleted_files_count, Some(1));
    assert_eq!(summary.min_sequence_number, 1);

    let partitions = summary.partitions.unwrap();
    assert_eq!(partitions.len(), 4);
    assert!(!partitions[0].contains_null);
    assert!(partitions[3].contains_null);
    assert_eq!(partitions[3].lower_bound, None);

    assert_eq!(read_entries(&out).await, vec![added, existing, deleted]);
}

#[tokio::test]
async fn test_codecs_produce_identical_entries() {
    let io = memory_io();
    let mut decoded = Vec::new();
    for codec in ["null", "deflate", "snappy", "zstd"] {
        let out = output(&io, &format!("{codec}.avro"));
        let mut writer =
            write_manifest(2, id_spec(), wide_schema(), out.clone(), 1, codec).unwrap();
        for id in 0..20 {
            writer
                .add_file(data_file(&format!("{id}.parquet"), id, 1), Some(1))
                .unwrap();
        }
        writer.write_manifest_file().await.unwrap();

        let reader = ManifestReader::open(&out.to_input_file()).await.unwrap();
        assert_eq!(reader.codec(), CompressionCodec::resolve(codec).unwrap());
        decoded.push(reader.read_all().unwrap().1);
    }
    assert!(decoded.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(decoded[0].len(), 20);
}

#[tokio::test]
async fn test_v1_manifest_reads_as_data_without_sequence_numbers() {
    let io = memory_io();
    let out = output(&io, "v1.avro");
    let mut writer = write_manifest(1, id_spec(), wide_schema(), out.clone(), 42, "null").unwrap();
    writer
        .add_file(data_file("a.parquet", 1, 1), None)
        .unwrap();
    writer
        .add_existing_file(data_file("b.parquet", 2, 1), 41, 0, None)
        .unwrap();
    writer.write_manifest_file().await.unwrap();

    for _ in 0..2 {
        let reader = ManifestReader::open(&out.to_input_file()).await.unwrap();
        assert_eq!(reader.metadata().format_version(), FormatVersion::V1);
        assert_eq!(reader.metadata().content(), ManifestContentType::Data);
        let entries: Vec<_> = reader.entries().unwrap().map(Result::unwrap).collect();
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            assert_eq!(entry.content_type(), DataContentType::Data);
            assert_eq!(entry.sequence_number(), None);
            assert_eq!(entry.file_sequence_number(), None);
        }
        assert_eq!(entries[0].snapshot_id(), Some(42));
        assert_eq!(entries[1].snapshot_id(), Some(41));
        assert_eq!(entries[1].status(), ManifestStatus::Existing);
    }
}

#[tokio::test]
async fn test_bounds_round_trip_for_every_primitive_type() {
    let bounds = vec![
        (1, PrimitiveType::Int, Datum::int(-7)),
        (2, PrimitiveType::String, Datum::string("iceberg")),
        (3, PrimitiveType::Boolean, Datum::bool(true)),
        (4, PrimitiveType::Long, Datum::long(i64::MIN)),
        (5, PrimitiveType::Float, Datum::float(1.5f32)),
        (6, PrimitiveType::Double, Datum::double(-2.25f64)),
        (
            7,
            PrimitiveType::Decimal {
                precision: 10,
                scale: 2,
            },
            Datum::decimal(-101, 10, 2).unwrap(),
        ),
        (8, PrimitiveType::Date, Datum::date(-365)),
        (9, PrimitiveType::Time, Datum::time_micros(86_399_999_999).unwrap()),
        (10, PrimitiveType::Timestamp, Datum::timestamp_micros(1)),
        (
            11,
            PrimitiveType::Timestamptz,
            Datum::timestamptz_micros(1_700_000_000_000_000),
        ),
        (12, PrimitiveType::Uuid, Datum::uuid(Uuid::from_u128(u128::MAX))),
        (13, PrimitiveType::Fixed(4), Datum::fixed(vec![0, 1, 2, 3])),
        (14, PrimitiveType::Binary, Datum::binary(vec![9u8; 40])),
        (
            15,
            PrimitiveType::Decimal {
                precision: 38,
                scale: 0,
            },
            Datum::decimal(-(10i128.pow(37)), 38, 0).unwrap(),
        ),
    ];

    let mut builder = DataFileBuilder::default();
    builder
        .file_path("memory://table/data/bounds.parquet")
        .file_format(DataFileFormat::Parquet)
        .record_count(1)
        .file_size_in_bytes(10);
    for (id, _, value) in &bounds {
        builder.lower_bound(*id, value).upper_bound(*id, value);
    }
    let file = builder.build().unwrap();

    let io = memory_io();
    let out = output(&io, "bounds.avro");
    let mut writer = write_manifest(
        2,
        PartitionSpec::unpartition_spec(),
        wide_schema(),
        out.clone(),
        1,
        "zstandard",
    )
    .unwrap();
    writer.add_file(file, None).unwrap();
    writer.write_manifest_file().await.unwrap();

    let entries = read_entries(&out).await;
    let read_back = entries[0].data_file();
    assert_eq!(read_back.partition(), &Struct::empty());
    for (id, ty, value) in bounds {
        assert_eq!(read_back.lower_bound(id, ty).unwrap(), Some(value.clone()));
        assert_eq!(read_back.upper_bound(id, ty).unwrap(), Some(value));
    }
    assert_eq!(read_back.lower_bound(99, PrimitiveType::Int).unwrap(), None);
}

#[tokio::test]
async fn test_incomplete_data_file_is_rejected_before_writing() {
    let err = DataFileBuilder::default()
        .file_path("memory://table/data/a.parquet")
        .file_format(DataFileFormat::Parquet)
        .record_count(1)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    let io = memory_io();
    let out = output(&io, "never.avro");
    let mut writer = write_manifest(2, id_spec(), wide_schema(), out.clone(), 1, "null").unwrap();

    let wrong_arity = DataFileBuilder::default()
        .file_path("memory://table/data/b.parquet")
        .file_format(DataFileFormat::Parquet)
        .partition_spec_id(1)
        .partition(Struct::from_iter([Some(Datum::int(1)), Some(Datum::int(2))]))
        .record_count(1)
        .file_size_in_bytes(1)
        .build()
        .unwrap();
    let err = writer.add_file(wrong_arity, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    let wrong_type = DataFileBuilder::default()
        .file_path("memory://table/data/c.parquet")
        .file_format(DataFileFormat::Parquet)
        .partition_spec_id(1)
        .partition(Struct::from_iter([Some(Datum::long(1))]))
        .record_count(1)
        .file_size_in_bytes(1)
        .build()
        .unwrap();
    let err = writer.add_file(wrong_type, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    assert!(writer.is_empty());
    assert!(!out.exists().await.unwrap());
}

fn file_with_stats(
    name: &str,
    value_counts: Vec<(i32, u64)>,
    lower_bounds: Vec<(i32, Vec<u8>)>,
) -> DataFile {
    DataFileBuilder::default()
        .file_path(format!("memory://table/data/{name}"))
        .file_format(DataFileFormat::Parquet)
        .partition(Struct::from_iter([Some(Datum::int(1))]))
        .record_count(1)
        .file_size_in_bytes(1)
        .partition_spec_id(1)
        .value_counts(value_counts)
        .lower_bounds(lower_bounds)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_bounds_must_match_the_column_width() {
    let io = memory_io();
    let out = output(&io, "widths.avro");
    let mut writer = write_manifest(2, id_spec(), wide_schema(), out.clone(), 1, "null").unwrap();

    let wrong_widths = [
        (1, 7i64.to_le_bytes().to_vec()),
        (4, 7i32.to_le_bytes().to_vec()),
        (6, 2.5f32.to_le_bytes().to_vec()),
        (8, 19000i64.to_le_bytes().to_vec()),
        (10, 1i32.to_le_bytes().to_vec()),
    ];
    for (id, bytes) in wrong_widths {
        let err = writer
            .add_file(file_with_stats("narrow.parquet", vec![], vec![(id, bytes)]), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedEntry, "bound of column {id}");
    }
    assert!(writer.is_empty());

    writer
        .add_file(
            file_with_stats("exact.parquet", vec![], vec![(4, Datum::long(7).to_bytes())]),
            None,
        )
        .unwrap();
    writer.write_manifest_file().await.unwrap();

    let entries = read_entries(&out).await;
    assert_eq!(
        entries[0].data_file().lower_bound(4, PrimitiveType::Long).unwrap(),
        Some(Datum::long(7))
    );
}

#[tokio::test]
async fn test_time_values_stay_within_a_day() {
    assert!(Datum::new(PrimitiveType::Time, PrimitiveLiteral::Long(-1)).is_err());
    assert!(Datum::time_micros(86_400_000_000).is_err());

    let spec = PartitionSpec::builder()
        .with_spec_id(2)
        .add_partition_field(9, "t", Transform::Identity)
        .build();
    let io = memory_io();
    let out = output(&io, "time.avro");
    let mut writer = write_manifest(2, spec, wide_schema(), out.clone(), 1, "null").unwrap();

    let last = Datum::time_micros(86_399_999_999).unwrap();
    let time_file = |name: &str, lower: Vec<u8>| {
        DataFileBuilder::default()
            .file_path(format!("memory://table/data/{name}"))
            .file_format(DataFileFormat::Parquet)
            .partition(Struct::from_iter([Some(last.clone())]))
            .record_count(1)
            .file_size_in_bytes(1)
            .partition_spec_id(2)
            .lower_bounds(vec![(9, lower)])
            .build()
            .unwrap()
    };

    let err = writer
        .add_file(time_file("before-midnight.parquet", (-1i64).to_le_bytes().to_vec()), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    writer
        .add_file(time_file("in-range.parquet", last.to_bytes()), None)
        .unwrap();
    writer.write_manifest_file().await.unwrap();

    let entries = read_entries(&out).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].data_file().partition(), &Struct::from_iter([Some(last.clone())]));
    assert_eq!(last.to_string(), "23:59:59.999999");
}

#[tokio::test]
async fn test_partition_spec_id_must_match_the_manifest() {
    let io = memory_io();
    let out = output(&io, "spec-ids.avro");
    let mut writer = write_manifest(2, id_spec(), wide_schema(), out.clone(), 6, "null").unwrap();

    let err = writer
        .add_file(data_file("other-spec.parquet", 1, 9), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);
    assert!(writer.is_empty());

    let own = data_file("own-spec.parquet", 1, 1);
    writer.add_file(own.clone(), None).unwrap();
    writer.write_manifest_file().await.unwrap();

    let entries = read_entries(&out).await;
    assert_eq!(entries[0].data_file(), &own);
    assert_eq!(entries[0].data_file().partition_spec_id(), 1);
}

#[tokio::test]
async fn test_duplicate_stats_keys_are_rejected() {
    let io = memory_io();
    let out = output(&io, "duplicates.avro");
    let mut writer = write_manifest(2, id_spec(), wide_schema(), out.clone(), 1, "null").unwrap();

    let err = writer
        .add_file(file_with_stats("counts.parquet", vec![(1, 1), (1, 2)], vec![]), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    let bound = Datum::int(3).to_bytes();
    let err = writer
        .add_file(
            file_with_stats("bounds.parquet", vec![], vec![(1, bound.clone()), (1, bound)]),
            None,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);
    assert!(writer.is_empty());
    assert!(!out.exists().await.unwrap());
}

#[tokio::test]
async fn test_v1_entries_upgrade_with_initial_sequence_number() {
    let io = memory_io();
    let v1 = output(&io, "upgrade-v1.avro");
    let mut writer = write_manifest(1, id_spec(), wide_schema(), v1.clone(), 42, "null").unwrap();
    writer
        .add_existing_file(data_file("kept.parquet", 1, 1), 41, 0, None)
        .unwrap();
    writer
        .add_delete_file(data_file("gone.parquet", 2, 1), 0, None)
        .unwrap();
    writer.write_manifest_file().await.unwrap();
    let entries = read_entries(&v1).await;

    let v2 = output(&io, "upgrade-v2.avro");
    let mut writer =
        ManifestWriterBuilder::new(v2.clone(), Some(43), None, wide_schema(), id_spec())
            .build_v2_data()
            .unwrap();
    let err = writer.add_entry(entries[0].clone()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    for mut entry in entries {
        entry.inherit_initial_sequence_number();
        writer.add_entry(entry).unwrap();
    }
    let summary = writer.write_manifest_file().await.unwrap();
    assert_eq!(summary.existing_files_count, Some(1));
    assert_eq!(summary.deleted_files_count, Some(1));
    assert_eq!(summary.min_sequence_number, 0);

    let upgraded = read_entries(&v2).await;
    let tracking: Vec<_> = upgraded
        .iter()
        .map(|e| (e.status(), e.snapshot_id(), e.sequence_number(), e.file_sequence_number()))
        .collect();
    assert_eq!(
        tracking,
        vec![
            (ManifestStatus::Existing, Some(41), Some(0), Some(0)),
            (ManifestStatus::Deleted, Some(42), Some(0), Some(0)),
        ]
    );
}

#[tokio::test]
async fn test_added_and_deleted_counts() {
    let io = memory_io();
    let out = output(&io, "mixed.avro");
    let mut writer =
        write_manifest(2, id_spec(), wide_schema(), out.clone(), 8, "deflate").unwrap();
    writer
        .add_file(data_file("new.parquet", 1, 1), Some(8))
        .unwrap();
    writer
        .add_delete_file(data_file("old.parquet", 2, 1), 8, Some(3))
        .unwrap();
    let summary = writer.write_manifest_file().await.unwrap();

    assert_eq!(summary.added_files_count, Some(1));
    assert_eq!(summary.deleted_files_count, Some(1));
    assert_eq!(summary.existing_files_count, Some(0));
    assert_eq!(summary.deleted_rows_count, Some(10));
    assert!(summary.has_added_files());
    assert!(summary.has_deleted_files());
    assert!(!summary.has_existing_files());

    let statuses: Vec<_> = read_entries(&out).await.iter().map(|e| e.status()).collect();
    assert_eq!(statuses, vec![ManifestStatus::Added, ManifestStatus::Deleted]);
}

#[tokio::test]
async fn test_delete_manifest_tracks_delete_files() {
    let io = memory_io();
    let out = output(&io, "deletes.avro");
    let mut writer =
        ManifestWriterBuilder::new(out.clone(), Some(3), None, wide_schema(), id_spec())
            .build_v2_deletes()
            .unwrap();

    let err = writer
        .add_file(data_file("data.parquet", 1, 1), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedEntry);

    let equality = DataFileBuilder::default()
        .content(DataContentType::EqualityDeletes)
        .file_path("memory://table/data/eq-del.parquet")
        .file_format(DataFileFormat::Parquet)
        .partition(Struct::from_iter([Some(Datum::int(1))]))
        .record_count(4)
        .file_size_in_bytes(256)
        .equality_ids(vec![1, 2])
        .partition_spec_id(1)
        .build()
        .unwrap();
    writer.add_file(equality.clone(), None).unwrap();
    let summary = writer.write_manifest_file().await.unwrap();
    assert_eq!(summary.content, ManifestContentType::Deletes);

    let manifest = Manifest::parse_avro(&out.to_input_file().read().await.unwrap()).unwrap();
    assert_eq!(manifest.metadata().content(), ManifestContentType::Deletes);
    let entry = &manifest.entries()[0];
    assert_eq!(entry.content_type(), DataContentType::EqualityDeletes);
    assert_eq!(entry.data_file().equality_ids(), Some(&[1, 2][..]));
    assert_eq!(entry.sequence_number(), None);
}

#[tokio::test]
async fn test_fs_io_round_trip() {
    let tmp_dir = tempfile::TempDir::new().unwrap();
    let path = tmp_dir.path().join("fs.avro");
    let location = path.to_str().unwrap().to_string();

    let io = FileIOBuilder::new_fs_io().build().unwrap();
    let out = io.new_output(&location).unwrap();
    let mut writer = write_manifest(2, id_spec(), wide_schema(), out, 5, "deflate").unwrap();
    writer
        .add_file(data_file("fs.parquet", 11, 1), None)
        .unwrap();
    let summary = writer.write_manifest_file().await.unwrap();

    assert!(io.exists(&location).await.unwrap());
    assert_eq!(
        summary.manifest_length,
        std::fs::metadata(&path).unwrap().len() as i64
    );

    let entries = read_entries(&io.new_output(&location).unwrap()).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].snapshot_id(), Some(5));
    assert_eq!(entries[0].sequence_number(), None);

    io.delete(&location).await.unwrap();
    assert!(!io.exists(&location).await.unwrap());
}
