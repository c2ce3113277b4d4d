use prost::Message;
use tracing::{info, span, Level};

use crate::decompress::decompress_blob;
use crate::error::HeaderError;
use crate::osm_pbf;

// REQUIRED FEATURES understood by this loader
pub const OSM_SCHEMA_V06: &str = "OsmSchema-V0.6";
pub const DENSE_NODES: &str = "DenseNodes";

/// Header bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl From<&osm_pbf::HeaderBBox> for BoundingBox {
    fn from(bbox: &osm_pbf::HeaderBBox) -> Self {
        Self {
            left: 1e-9 * bbox.left as f64,
            right: 1e-9 * bbox.right as f64,
            top: 1e-9 * bbox.top as f64,
            bottom: 1e-9 * bbox.bottom as f64,
        }
    }
}

/// What the header block says about the extract.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HeaderInfo {
    pub required_features: Vec<String>,
    pub optional_features: Vec<String>,
    pub writing_program: Option<String>,
    pub source: Option<String>,
    pub bbox: Option<BoundingBox>,
}

/// Unpack the header blob and check that every required feature is one this
/// loader implements, and that both of them are present.
pub fn read_header(blob: osm_pbf::Blob) -> Result<HeaderInfo, HeaderError> {
    let _span = span!(Level::DEBUG, "read_header").entered();

    let data = decompress_blob(blob)?;
    let block = osm_pbf::HeaderBlock::decode(&data[..])?;
    validate_features(&block.required_features)?;

    let header = HeaderInfo {
        bbox: block.bbox.as_ref().map(BoundingBox::from),
        required_features: block.required_features,
        optional_features: block.optional_features,
        writing_program: block.writingprogram,
        source: block.source,
    };
    info!(
        writing_program = header.writing_program.as_deref().unwrap_or("-"),
        optional = ?header.optional_features,
        "Accepted map header"
    );
    Ok(header)
}

fn validate_features(required: &[String]) -> Result<(), HeaderError> {
    let mut have_version = false;
    let mut have_dense = false;
    for feature in required {
        match feature.as_str() {
            OSM_SCHEMA_V06 => have_version = true,
            DENSE_NODES => have_dense = true,
            other => return Err(HeaderError::UnknownFeature(other.to_string())),
        }
    }
    if !have_version {
        return Err(HeaderError::MissingFeature(OSM_SCHEMA_V06));
    }
    if !have_dense {
        return Err(HeaderError::MissingFeature(DENSE_NODES));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::osm_pbf::blob::Data;

    fn header_blob(required: &[&str]) -> osm_pbf::Blob {
        let block = osm_pbf::HeaderBlock {
            bbox: Some(osm_pbf::HeaderBBox {
                left: -1_000_000_000,
                right: 2_000_000_000,
                top: 52_000_000_000,
                bottom: 50_500_000_000,
            }),
            required_features: required.iter().map(|f| f.to_string()).collect(),
            optional_features: vec!["Sort.Type_then_ID".to_string()],
            writingprogram: Some("osmium/1.14".to_string()),
            source: None,
            osmosis_replication_timestamp: None,
            osmosis_replication_sequence_number: None,
            osmosis_replication_base_url: None,
        };
        osm_pbf::Blob { raw_size: None, data: Some(Data::Raw(block.encode_to_vec())) }
    }

    #[test]
    fn accepts_schema_and_dense() {
        let header = read_header(header_blob(&[OSM_SCHEMA_V06, DENSE_NODES])).unwrap();
        assert_eq!(header.writing_program.as_deref(), Some("osmium/1.14"));
        assert_eq!(header.optional_features, vec!["Sort.Type_then_ID"]);
        let bbox = header.bbox.unwrap();
        assert!((bbox.left + 1.0).abs() < 1e-9);
        assert!((bbox.top - 52.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_feature() {
        match read_header(header_blob(&[OSM_SCHEMA_V06, DENSE_NODES, "HistoricalInformation"])) {
            Err(HeaderError::UnknownFeature(f)) => assert_eq!(f, "HistoricalInformation"),
            other => panic!("expected unknown feature, got {:?}", other),
        }
    }

    #[test]
    fn requires_both_features() {
        assert!(matches!(
            read_header(header_blob(&[OSM_SCHEMA_V06])),
            Err(HeaderError::MissingFeature(DENSE_NODES))
        ));
        assert!(matches!(
            read_header(header_blob(&[DENSE_NODES])),
            Err(HeaderError::MissingFeature(OSM_SCHEMA_V06))
        ));
    }

    #[test]
    fn garbage_payload_is_rejected() {
        let blob = osm_pbf::Blob { raw_size: None, data: Some(Data::Raw(vec![0xff; 8])) };
        assert!(matches!(read_header(blob), Err(HeaderError::Decode(_))));
    }

    #[test]
    fn unsupported_compression_is_rejected() {
        let blob = osm_pbf::Blob { raw_size: Some(4), data: Some(Data::ZstdData(vec![1, 2])) };
        assert!(matches!(read_header(blob), Err(HeaderError::Blob(_))));
    }
}
