//! In-memory PBF fixtures.

#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use prost::Message;

use pbf_loader::osm_pbf::{self, blob::Data};

pub struct StreamBuilder {
    bytes: Vec<u8>,
}

impl StreamBuilder {
    pub fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    pub fn record(mut self, kind: &str, blob: osm_pbf::Blob) -> Self {
        let blob_bytes = blob.encode_to_vec();
        let header = osm_pbf::BlobHeader {
            r#type: kind.to_string(),
            indexdata: None,
            datasize: blob_bytes.len() as i32,
        }
        .encode_to_vec();
        self.bytes.extend((header.len() as u32).to_be_bytes());
        self.bytes.extend(header);
        self.bytes.extend(blob_bytes);
        self
    }

    pub fn header(self, required: &[&str]) -> Self {
        let block = osm_pbf::HeaderBlock {
            bbox: None,
            required_features: required.iter().map(|f| f.to_string()).collect(),
            optional_features: vec![],
            writingprogram: Some("fixture".to_string()),
            source: None,
            osmosis_replication_timestamp: None,
            osmosis_replication_sequence_number: None,
            osmosis_replication_base_url: None,
        };
        self.record("OSMHeader", zlib_blob(&block.encode_to_vec()))
    }

    pub fn standard_header(self) -> Self {
        self.header(&["OsmSchema-V0.6", "DenseNodes"])
    }

    pub fn data(self, block: &osm_pbf::PrimitiveBlock) -> Self {
        self.record("OSMData", zlib_blob(&block.encode_to_vec()))
    }

    pub fn raw_data(self, block: &osm_pbf::PrimitiveBlock) -> Self {
        self.record("OSMData", raw_blob(&block.encode_to_vec()))
    }

    pub fn bytes(self) -> Vec<u8> {
        self.bytes
    }
}

pub fn raw_blob(payload: &[u8]) -> osm_pbf::Blob {
    osm_pbf::Blob { raw_size: None, data: Some(Data::Raw(payload.to_vec())) }
}

pub fn zlib_blob(payload: &[u8]) -> osm_pbf::Blob {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    osm_pbf::Blob {
        raw_size: Some(payload.len() as i32),
        data: Some(Data::ZlibData(encoder.finish().unwrap())),
    }
}

/// A block of `count` consecutive points starting at `first_id`, one way over
/// all of them with id `first_id`, and one relation with id `first_id` that
/// has the way as its only member.
pub fn block(first_id: i64, count: usize) -> osm_pbf::PrimitiveBlock {
    let strings = ["", "name", "highway", "residential", "type", "route", "outer"];
    // first_id, first_id + 1, ... once decoded.
    let ids: Vec<i64> = (0..count).map(|i| if i == 0 { first_id } else { 1 }).collect();

    // Every point gets name=residential.
    let mut keys_vals = Vec::new();
    for _ in 0..count {
        keys_vals.extend([1, 3, 0]);
    }

    osm_pbf::PrimitiveBlock {
        stringtable: osm_pbf::StringTable {
            s: strings.iter().map(|s| s.as_bytes().to_vec()).collect(),
        },
        primitivegroup: vec![osm_pbf::PrimitiveGroup {
            nodes: vec![],
            dense: Some(osm_pbf::DenseNodes {
                id: ids.clone(),
                // 0.5 degrees north, 0.25 degrees east of the previous point.
                lat: vec![5_000_000; count],
                lon: vec![2_500_000; count],
                keys_vals,
            }),
            ways: vec![osm_pbf::Way {
                id: first_id,
                keys: vec![2],
                vals: vec![3],
                refs: ids,
            }],
            relations: vec![osm_pbf::Relation {
                id: first_id,
                keys: vec![4],
                vals: vec![5],
                roles_sid: vec![6],
                memids: vec![first_id],
                types: vec![1],
            }],
        }],
        granularity: Some(100),
        date_granularity: None,
        lat_offset: None,
        lon_offset: None,
    }
}

/// A block whose first point references a string index past the table.
pub fn corrupt_block() -> osm_pbf::PrimitiveBlock {
    let mut bad = block(9_000, 2);
    if let Some(dense) = bad.primitivegroup[0].dense.as_mut() {
        dense.keys_vals[0] = 99;
    }
    bad
}
