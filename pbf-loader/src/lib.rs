//! Loader for OpenStreetMap PBF extracts.
//!
//! `read_map` parses the blob container, validates the header, decodes the data
//! blocks on a worker pool and collects points, ways and relations into an
//! id-keyed `EntityStore`, ready to be handed to a spatial index.

pub mod block;
pub mod config;
pub mod container;
pub mod decompress;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod header;
pub mod index;
pub mod osm_pbf;
pub mod pipeline;
pub mod progress;
pub mod store;

pub use block::Fragment;
pub use config::{AttributeFilter, LoaderConfig};
pub use entity::{Attribute, Member, MemberKind, Point, PointId, Relation, Way};
pub use error::{BlockError, FramingError, HeaderError, LoadError, LoadErrorKind, LoadProgress};
pub use header::HeaderInfo;
pub use index::{IndexBuilder, Vertex};
pub use pipeline::{read_map, LoadStats, OsmMap};
pub use store::{AttributeHistogram, EntityStore};
