use std::fmt;
use std::ops;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

// --------------------------------------------------------------------------
// CoordGeo

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CoordGeo {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for CoordGeo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.latitude, self.longitude)
    }
}

// --------------------------------------------------------------------------
// Coord3D

/// Earth-centered cartesian position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Coord3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord3D {
    pub fn norm(&self) -> f64 {
        f64::sqrt(self.x * self.x + self.y * self.y + self.z * self.z)
    }

    pub fn distance(&self, other: &Coord3D) -> f64 {
        (self - other).norm()
    }

    /// Component along `axis` (0 = x, 1 = y, 2 = z), for index builders that
    /// split space one axis at a time.
    pub fn axis(&self, axis: usize) -> f64 {
        match axis % 3 {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

impl ops::Sub<&Coord3D> for &Coord3D {
    type Output = Coord3D;

    fn sub(self, rhs: &Coord3D) -> Coord3D {
        Coord3D {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl fmt::Display for Coord3D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ x: {}, y: {}, z: {} }}", self.x, self.y, self.z)
    }
}

// --------------------------------------------------------------------------
// Projection

pub trait Projection<From, To> {
    fn project(&self, input: &From) -> To;
}

/// Spherical Earth model. Chord distances between projected points are in the
/// unit of `radius`.
#[derive(Debug, Copy, Clone)]
pub struct SphereProjection {
    pub radius: f64,
}

impl Default for SphereProjection {
    fn default() -> Self {
        Self { radius: EARTH_RADIUS_M }
    }
}

impl Projection<CoordGeo, Coord3D> for SphereProjection {
    fn project(&self, input: &CoordGeo) -> Coord3D {
        let r = self.radius;
        let [lat, lon] = [input.latitude, input.longitude].map(f64::to_radians);
        Coord3D {
            x: r * f64::cos(lat) * f64::cos(lon),
            y: r * f64::cos(lat) * f64::sin(lon),
            z: r * f64::sin(lat),
        }
    }
}

impl Projection<Coord3D, CoordGeo> for SphereProjection {
    fn project(&self, input: &Coord3D) -> CoordGeo {
        let r = input.norm();
        CoordGeo {
            latitude: f64::asin(input.z / r).to_degrees(),
            longitude: f64::atan2(input.y, input.x).to_degrees(),
        }
    }
}
