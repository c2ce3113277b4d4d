use std::fmt;

use crate::geometry::{Coord3D, CoordGeo, Projection, SphereProjection};

pub type PointId = i64;
pub type WayId = i64;
pub type RelationId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

pub type Attributes = Vec<Attribute>;

fn lookup<'a>(attrs: &'a [Attribute], key: &str) -> Option<&'a str> {
    attrs.iter().find(|a| a.key == key).map(|a| a.value.as_str())
}

// --------------------------------------------------------------------------
// Point

/// Child slots a spatial index may fill in. The loader never reads them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexLinks {
    pub left: Option<PointId>,
    pub right: Option<PointId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: PointId,
    /// Degrees.
    pub lat: f64,
    /// Degrees.
    pub lon: f64,
    pub attrs: Attributes,
    pub(crate) links: IndexLinks,
}

impl Point {
    pub fn new(id: PointId, lat: f64, lon: f64, attrs: Attributes) -> Self {
        Self { id, lat, lon, attrs, links: IndexLinks::default() }
    }

    pub fn coords(&self) -> CoordGeo {
        CoordGeo { latitude: self.lat, longitude: self.lon }
    }

    /// Position on the spherical Earth model, in meters.
    pub fn location(&self) -> Coord3D {
        SphereProjection::default().project(&self.coords())
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        lookup(&self.attrs, key)
    }

    pub fn links(&self) -> IndexLinks {
        self.links
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[id={} ({:.3},{:.3})]", self.id, self.lat, self.lon)
    }
}

// --------------------------------------------------------------------------
// Way

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: WayId,
    pub attrs: Attributes,
    /// Point ids in path order. Resolved against the store by the consumer.
    pub refs: Vec<PointId>,
}

impl Way {
    pub fn attr(&self, key: &str) -> Option<&str> {
        lookup(&self.attrs, key)
    }
}

// --------------------------------------------------------------------------
// Relation

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Point,
    Way,
    Relation,
}

impl TryFrom<i32> for MemberKind {
    type Error = i32;

    fn try_from(tag: i32) -> Result<Self, i32> {
        match tag {
            0 => Ok(MemberKind::Point),
            1 => Ok(MemberKind::Way),
            2 => Ok(MemberKind::Relation),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    pub kind: MemberKind,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: RelationId,
    pub attrs: Attributes,
    pub members: Vec<Member>,
}

impl Relation {
    pub fn attr(&self, key: &str) -> Option<&str> {
        lookup(&self.attrs, key)
    }

    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &Member> + '_ {
        self.members.iter().filter(move |m| m.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_kind_tags() {
        assert_eq!(MemberKind::try_from(0), Ok(MemberKind::Point));
        assert_eq!(MemberKind::try_from(1), Ok(MemberKind::Way));
        assert_eq!(MemberKind::try_from(2), Ok(MemberKind::Relation));
        assert_eq!(MemberKind::try_from(3), Err(3));
        assert_eq!(MemberKind::try_from(-1), Err(-1));
    }

    #[test]
    fn attribute_lookup_returns_first_match() {
        let point = Point::new(
            1,
            0.0,
            0.0,
            vec![Attribute::new("name", "a"), Attribute::new("name", "b")],
        );
        assert_eq!(point.attr("name"), Some("a"));
        assert_eq!(point.attr("ref"), None);
    }

    #[test]
    fn relation_members_by_kind() {
        let rel = Relation {
            id: 9,
            attrs: vec![],
            members: vec![
                Member { id: 1, kind: MemberKind::Way, role: "outer".into() },
                Member { id: 2, kind: MemberKind::Point, role: "label".into() },
                Member { id: 3, kind: MemberKind::Way, role: "inner".into() },
            ],
        };
        let ways: Vec<i64> = rel.members_of(MemberKind::Way).map(|m| m.id).collect();
        assert_eq!(ways, vec![1, 3]);
    }

    #[test]
    fn new_points_have_empty_links() {
        let point = Point::new(5, 10.0, 20.0, vec![]);
        assert_eq!(point.links(), IndexLinks::default());
        assert_eq!(point.to_string(), "[id=5 (10.000,20.000)]");
    }
}
