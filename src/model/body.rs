use std::f64::consts::{PI, TAU};
use std::fmt;

use nalgebra::{Unit, Vector3};

use crate::astro::orbit::Orbit;
use crate::astro::HasMass;

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct BodyID(pub usize);

/// The physical description of a celestial body, as provided by a loader.
#[derive(Debug, Clone)]
pub struct BodyInfo {
    pub name: String,
    /// Standard gravitational parameter, m^3/s^2
    pub mu: f64,
    /// m
    pub radius: f64,
    /// s; 0 means tidally locked when the body has an orbit
    pub rotational_period: f64,
    /// Direction of the rotation axis, in the reference frame
    pub north_pole: Option<Unit<Vector3<f64>>>,
}

/// A celestial body placed in a [System](super::System).
///
/// The sphere of influence and the solar day depend on the body's orbit
/// around its parent, so they are resolved once at system construction and
/// stored here; everything else is the caller-provided [BodyInfo].
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyID,
    pub info: BodyInfo,
    /// Radius (m) of the region where this body's gravity dominates its
    /// parent's: a * (mu / mu_parent)^(2/5). +inf for the root body.
    pub sphere_of_influence: f64,
    /// Duration (s) between two solar noons; +inf when the body shows its
    /// parent a fixed face, 0 for the root body.
    pub solar_day: f64,
}

impl HasMass for Body {
    fn mu(&self) -> f64 {
        self.info.mu
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.info.name)
    }
}

impl Body {
    /// Gravitational acceleration (m/s^2) at `distance` from the center.
    ///
    /// Below the surface only the inner shells attract, so the effective mu
    /// scales by (distance / radius)^3 and gravity falls off linearly
    /// towards the center.
    // see https://en.wikipedia.org/wiki/Shell_theorem
    pub fn gravity(&self, distance: f64) -> f64 {
        if distance < self.info.radius {
            // mu (d/R)^3 / d^2, kept well-defined down to the center
            self.info.mu * distance / self.info.radius.powi(3)
        } else {
            self.info.mu / (distance * distance)
        }
    }

    /// Gravitational acceleration at the surface (m/s^2).
    pub fn surface_gravity(&self) -> f64 {
        self.gravity(self.info.radius)
    }

    /// Speed (m/s) of a point on the equator due to the body's rotation.
    pub fn surface_velocity(&self) -> f64 {
        if self.info.rotational_period == 0.0 {
            f64::INFINITY
        } else {
            TAU * self.info.radius / self.info.rotational_period
        }
    }

    /// Escape velocity (m/s) at a given distance (m) from the center.
    pub fn escape_velocity(&self, distance: f64) -> f64 {
        (2.0 * self.info.mu / distance).sqrt()
    }

    /// Angular diameter (rad) of the body seen from a given distance (m).
    pub fn angular_diameter(&self, distance: f64) -> f64 {
        (self.info.radius / distance).atan()
    }

    /// Fewest satellites a circular relay constellation around this body
    /// needs so that neighbors stay within `communication_range` of each
    /// other on a line of sight clearing the surface.
    ///
    /// With n satellites evenly spread on a circle of radius a, the chord
    /// between neighbors is 2 a sin(pi/n) and passes within a cos(pi/n) of
    /// the center; some a satisfies both constraints iff
    /// 2 R tan(pi/n) <= range. Never fewer than 3: a two-satellite ring
    /// always has the body in the way.
    pub fn constellation_minimum_size(&self, communication_range: f64) -> u32 {
        let n = PI / (communication_range / (2.0 * self.info.radius)).atan();
        (n.ceil() as u32).max(3)
    }

    /// Smallest and largest circle radii a relay constellation of `size`
    /// satellites can use, or `None` when even the tightest ring cannot
    /// close with that range.
    pub fn constellation_radius(
        &self,
        communication_range: f64,
        size: u32,
    ) -> Option<(f64, f64)> {
        let half_angle = PI / size as f64;
        let min = self.info.radius / half_angle.cos();
        let max = communication_range / (2.0 * half_angle.sin());
        (min <= max).then_some((min, max))
    }
}

impl Orbit<Body> {
    /// True anomaly at which the trajectory leaves the primary's sphere of
    /// influence; `None` when it never does.
    pub fn true_anomaly_at_escape(&self) -> Option<f64> {
        self.true_anomaly_at_distance(self.primary().sphere_of_influence)
    }
}
