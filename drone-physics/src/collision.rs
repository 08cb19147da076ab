//! Ray queries against external geometry.

use na::{Point3, Unit, Vector3};

/// Anything the vehicle can fly into.
///
/// The simulator only ever asks one question of the world: how far along this
/// ray is the first surface?
pub trait Collidable {
    /// Distance from `origin` along the unit `direction` to the nearest
    /// intersection, or `None` if the ray misses.
    fn cast_ray(&self, origin: &Point3<f64>, direction: &Unit<Vector3<f64>>) -> Option<f64>;
}

/// Nearest hit among all `collidables`.
pub fn nearest_hit(
    collidables: &[&dyn Collidable],
    origin: &Point3<f64>,
    direction: &Unit<Vector3<f64>>,
) -> Option<f64> {
    collidables
        .iter()
        .filter_map(|c| c.cast_ray(origin, direction))
        .filter(|d| d.is_finite() && *d >= 0.0)
        .min_by(|a, b| a.total_cmp(b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphereCollider {
    pub center: Point3<f64>,
    pub radius: f64,
}

impl SphereCollider {
    pub fn new(center: Point3<f64>, radius: f64) -> Self {
        SphereCollider { center, radius }
    }
}

impl Collidable for SphereCollider {
    fn cast_ray(&self, origin: &Point3<f64>, direction: &Unit<Vector3<f64>>) -> Option<f64> {
        let oc = origin - self.center;
        let b = oc.dot(direction.as_ref());
        let c = oc.norm_squared() - self.radius * self.radius;
        if c <= 0.0 {
            // Starting inside the sphere counts as an immediate hit.
            return Some(0.0);
        }
        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }
        let t = -b - disc.sqrt();
        (t >= 0.0).then_some(t)
    }
}

/// Axis-aligned box, intersected with the slab method.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxCollider {
    pub min: Point3<f64>,
    pub max: Point3<f64>,
}

impl BoxCollider {
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        BoxCollider {
            min: min.inf(&max),
            max: min.sup(&max),
        }
    }

    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }
}

impl Collidable for BoxCollider {
    fn cast_ray(&self, origin: &Point3<f64>, direction: &Unit<Vector3<f64>>) -> Option<f64> {
        let mut t_near = f64::NEG_INFINITY;
        let mut t_far = f64::INFINITY;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < 1e-12 {
                // Parallel to this slab: either inside it for the whole ray or never.
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let t1 = (lo - o) / d;
            let t2 = (hi - o) / d;
            t_near = t_near.max(t1.min(t2));
            t_far = t_far.min(t1.max(t2));
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0.0 {
            return None;
        }
        Some(t_near.max(0.0))
    }
}
