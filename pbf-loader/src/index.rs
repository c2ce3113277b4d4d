//! Contract with the spatial index that is built from the loaded points.
//!
//! The index keeps its tree shape in the points' `IndexLinks`, referring to
//! children by id. Points never own each other, so the store stays a flat
//! id-keyed arena.

use crate::entity::{Point, PointId};
use crate::geometry::Coord3D;

/// What an index builder needs from a point.
pub trait Vertex {
    fn id(&self) -> PointId;
    fn location(&self) -> Coord3D;
    fn left(&self) -> Option<PointId>;
    fn right(&self) -> Option<PointId>;
    fn set_left(&mut self, child: Option<PointId>);
    fn set_right(&mut self, child: Option<PointId>);
}

impl Vertex for Point {
    fn id(&self) -> PointId {
        self.id
    }

    fn location(&self) -> Coord3D {
        Point::location(self)
    }

    fn left(&self) -> Option<PointId> {
        self.links.left
    }

    fn right(&self) -> Option<PointId> {
        self.links.right
    }

    fn set_left(&mut self, child: Option<PointId>) {
        self.links.left = child;
    }

    fn set_right(&mut self, child: Option<PointId>) {
        self.links.right = child;
    }
}

/// Builds an index over a set of located points. Implemented outside this crate.
pub trait IndexBuilder {
    /// Called once with every stored point, in no particular order. The
    /// builder may rewrite the points' child links and returns the root.
    fn build(&mut self, points: Vec<&mut Point>) -> Option<PointId>;
}
