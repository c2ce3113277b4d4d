use std::collections::HashMap;

use crate::block::Fragment;
use crate::entity::{Attributes, Point, PointId, Relation, RelationId, Way, WayId};

/// Every entity read from an extract, keyed by id.
///
/// Ids are expected to be unique per kind. A repeated id is not an error: the
/// record merged last replaces the earlier one, and which one that is depends
/// on worker timing.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    points: HashMap<PointId, Point>,
    ways: HashMap<WayId, Way>,
    relations: HashMap<RelationId, Relation>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, fragment: Fragment) {
        self.points.extend(fragment.points.into_iter().map(|p| (p.id, p)));
        self.ways.extend(fragment.ways.into_iter().map(|w| (w.id, w)));
        self.relations.extend(fragment.relations.into_iter().map(|r| (r.id, r)));
    }

    pub fn points(&self) -> &HashMap<PointId, Point> {
        &self.points
    }

    pub fn ways(&self) -> &HashMap<WayId, Way> {
        &self.ways
    }

    pub fn relations(&self) -> &HashMap<RelationId, Relation> {
        &self.relations
    }

    pub fn point(&self, id: PointId) -> Option<&Point> {
        self.points.get(&id)
    }

    pub fn way(&self, id: WayId) -> Option<&Way> {
        self.ways.get(&id)
    }

    pub fn relation(&self, id: RelationId) -> Option<&Relation> {
        self.relations.get(&id)
    }

    pub(crate) fn points_mut(&mut self) -> impl Iterator<Item = &mut Point> + '_ {
        self.points.values_mut()
    }

    /// Points of a way in path order. Refs missing from the store are skipped.
    pub fn way_points<'a>(&'a self, way: &'a Way) -> impl Iterator<Item = &'a Point> + 'a {
        way.refs.iter().filter_map(move |id| self.points.get(id))
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.ways.is_empty() && self.relations.is_empty()
    }

    /// How often each `key=value` pair occurs, per entity kind.
    pub fn attribute_histogram(&self) -> AttributeHistogram {
        fn count<'a>(attrs: impl Iterator<Item = &'a Attributes>) -> HashMap<String, usize> {
            let mut counts = HashMap::new();
            for attr in attrs.flatten() {
                *counts.entry(format!("{}={}", attr.key, attr.value)).or_insert(0) += 1;
            }
            counts
        }
        AttributeHistogram {
            points: count(self.points.values().map(|p| &p.attrs)),
            ways: count(self.ways.values().map(|w| &w.attrs)),
            relations: count(self.relations.values().map(|r| &r.attrs)),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AttributeHistogram {
    pub points: HashMap<String, usize>,
    pub ways: HashMap<String, usize>,
    pub relations: HashMap<String, usize>,
}
