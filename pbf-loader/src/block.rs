//! Turns one decompressed `PrimitiveBlock` into entities.
//!
//! Ids, coordinates, way refs and relation member ids are delta coded: each
//! stored value is the difference to the previous one in the same sequence,
//! so every sequence is decoded front to back with a running total.

use prost::Message;
use tracing::{span, trace, Level};

use crate::config::AttributeFilter;
use crate::entity::{Attribute, Attributes, Member, MemberKind, Point, Relation, Way};
use crate::error::BlockError;
use crate::osm_pbf;

/// Entities decoded from one block, not yet merged into the store.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Fragment {
    pub points: Vec<Point>,
    pub ways: Vec<Way>,
    pub relations: Vec<Relation>,
}

/// Per-block decoding context.
#[derive(Debug, Clone)]
pub struct BlockParams {
    strings: Vec<String>,
    granularity: i64,
    lat_offset: i64,
    lon_offset: i64,
}

impl BlockParams {
    pub fn new(strings: Vec<String>, granularity: i64, lat_offset: i64, lon_offset: i64) -> Self {
        Self { strings, granularity, lat_offset, lon_offset }
    }

    pub fn from_block(block: &osm_pbf::PrimitiveBlock) -> Self {
        let strings = block
            .stringtable
            .s
            .iter()
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        Self::new(
            strings,
            i64::from(block.granularity()),
            block.lat_offset(),
            block.lon_offset(),
        )
    }

    pub fn string(&self, index: i64) -> Result<&str, BlockError> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.strings.get(i))
            .map(String::as_str)
            .ok_or(BlockError::StringIndex { index, len: self.strings.len() })
    }

    pub fn lat_degrees(&self, unit: i64) -> f64 {
        scaled_degrees(self.lat_offset, self.granularity, unit)
    }

    pub fn lon_degrees(&self, unit: i64) -> f64 {
        scaled_degrees(self.lon_offset, self.granularity, unit)
    }
}

fn scaled_degrees(offset: i64, granularity: i64, unit: i64) -> f64 {
    1e-9 * offset.wrapping_add(granularity.wrapping_mul(unit)) as f64
}

/// Undo delta coding. Wrapping arithmetic keeps corrupt input from panicking
/// a worker; well-formed extracts never get near the limits.
pub fn delta_decode(deltas: &[i64]) -> Vec<i64> {
    let mut last = 0i64;
    deltas
        .iter()
        .map(|delta| {
            last = last.wrapping_add(*delta);
            last
        })
        .collect()
}

/// Decode a raw block payload.
pub fn decode_block(data: &[u8], filter: &AttributeFilter) -> Result<Fragment, BlockError> {
    let block = osm_pbf::PrimitiveBlock::decode(data)?;
    decode_primitive_block(&block, filter)
}

pub fn decode_primitive_block(
    block: &osm_pbf::PrimitiveBlock,
    filter: &AttributeFilter,
) -> Result<Fragment, BlockError> {
    let _span = span!(Level::TRACE, "decode_primitive_block").entered();

    let params = BlockParams::from_block(block);
    let mut fragment = Fragment::default();
    for group in &block.primitivegroup {
        if let Some(node) = group.nodes.first() {
            return Err(BlockError::NonDenseNode(node.id));
        }
        if let Some(dense) = &group.dense {
            fragment.points.extend(decode_dense_nodes(dense, &params, filter)?);
        }
        for way in &group.ways {
            fragment.ways.push(decode_way(way, &params, filter)?);
        }
        for relation in &group.relations {
            fragment.relations.push(decode_relation(relation, &params, filter)?);
        }
    }
    trace!(
        "Decoded block: {} points, {} ways, {} relations",
        fragment.points.len(),
        fragment.ways.len(),
        fragment.relations.len()
    );
    Ok(fragment)
}

pub fn decode_dense_nodes(
    dense: &osm_pbf::DenseNodes,
    params: &BlockParams,
    filter: &AttributeFilter,
) -> Result<Vec<Point>, BlockError> {
    let (ids, lats, lons) = (&dense.id, &dense.lat, &dense.lon);
    if ids.len() != lats.len() || ids.len() != lons.len() {
        return Err(BlockError::DenseLengths {
            ids: ids.len(),
            lats: lats.len(),
            lons: lons.len(),
        });
    }

    let kvs = &dense.keys_vals;
    let mut kvi = 0usize;
    let (mut lid, mut llat, mut llon) = (0i64, 0i64, 0i64);
    let mut points = Vec::with_capacity(ids.len());
    for i in 0..ids.len() {
        lid = lid.wrapping_add(ids[i]);
        llat = llat.wrapping_add(lats[i]);
        llon = llon.wrapping_add(lons[i]);

        // Blocks without any tags leave keys_vals empty altogether.
        let mut attrs = Attributes::new();
        if kvi < kvs.len() {
            while kvi < kvs.len() && kvs[kvi] != 0 {
                let value_index = *kvs.get(kvi + 1).ok_or(BlockError::DanglingKey(kvi))?;
                let key = params.string(i64::from(kvs[kvi]))?;
                let value = params.string(i64::from(value_index))?;
                if filter.keep_point(key) {
                    attrs.push(Attribute::new(key, value));
                }
                kvi += 2;
            }
            // Skip the terminating 0.
            kvi += 1;
        }

        points.push(Point::new(lid, params.lat_degrees(llat), params.lon_degrees(llon), attrs));
    }
    Ok(points)
}

fn decode_attrs(
    kind: &'static str,
    id: i64,
    keys: &[u32],
    vals: &[u32],
    params: &BlockParams,
    keep: impl Fn(&str) -> bool,
) -> Result<Attributes, BlockError> {
    if keys.len() != vals.len() {
        return Err(BlockError::AttributeLengths { kind, id, keys: keys.len(), vals: vals.len() });
    }
    let mut attrs = Attributes::new();
    for (key_index, value_index) in keys.iter().zip(vals) {
        let key = params.string(i64::from(*key_index))?;
        let value = params.string(i64::from(*value_index))?;
        if keep(key) {
            attrs.push(Attribute::new(key, value));
        }
    }
    Ok(attrs)
}

pub fn decode_way(
    way: &osm_pbf::Way,
    params: &BlockParams,
    filter: &AttributeFilter,
) -> Result<Way, BlockError> {
    let attrs = decode_attrs("Way", way.id, &way.keys, &way.vals, params, |k| filter.keep_way(k))?;
    Ok(Way { id: way.id, attrs, refs: delta_decode(&way.refs) })
}

pub fn decode_relation(
    relation: &osm_pbf::Relation,
    params: &BlockParams,
    filter: &AttributeFilter,
) -> Result<Relation, BlockError> {
    let id = relation.id;
    let attrs = decode_attrs("Relation", id, &relation.keys, &relation.vals, params, |k| {
        filter.keep_relation(k)
    })?;

    let (memids, roles, types) = (&relation.memids, &relation.roles_sid, &relation.types);
    if memids.len() != roles.len() || memids.len() != types.len() {
        return Err(BlockError::MemberLengths {
            id,
            memids: memids.len(),
            roles: roles.len(),
            types: types.len(),
        });
    }

    let members = delta_decode(memids)
        .into_iter()
        .zip(roles.iter().zip(types))
        .map(|(member_id, (role, tag))| -> Result<Member, BlockError> {
            let kind = MemberKind::try_from(*tag)
                .map_err(|tag| BlockError::UnknownMemberType { id, tag })?;
            Ok(Member {
                id: member_id,
                kind,
                role: params.string(i64::from(*role))?.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Relation { id, attrs, members })
}
