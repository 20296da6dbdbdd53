mod angles;
mod state;
mod target;

use std::f64::consts::{PI, TAU};
use std::fmt;

use nalgebra::{Rotation3, Unit, Vector3};
use thiserror::Error;

use super::anomaly::Conic;
use super::HasMass;
use crate::math::geometry::{self, from_euler_angles, oriented_angle};

/// A requested combination of elements is inconsistent with the kind of
/// orbit it would describe. Raised by the alternative constructors; never
/// silently corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidElements {
    #[error("eccentricity < 1 but semi-major axis <= 0")]
    ClosedWithNonPositiveAxis,
    #[error("eccentricity > 1 but semi-major axis >= 0")]
    OpenWithNonNegativeAxis,
    #[error("cannot define a parabolic trajectory from its semi-major axis")]
    ParabolicFromSemiMajorAxis,
    #[error("cannot define an open trajectory from its period")]
    OpenFromPeriod,
    #[error("cannot define an orbit from an infinite period")]
    InfinitePeriod,
}

/// A Kepler orbit: the two-body trajectory of a secondary around `primary`.
///
/// The primary is generically typed so the same orbit works around a bare
/// [PointMass](crate::astro::PointMass) (handy in tests) or around a full
/// celestial body. Orbits are immutable once constructed; all the derived
/// quantities are computed up front.
#[derive(Debug, Clone)]
pub struct Orbit<P> {
    primary: P,

    // Defining elements. Distances in m, angles in rad, epoch in seconds
    // (J2000 convention: seconds since 2000-01-01 12:00 TT).
    periapsis: f64,
    eccentricity: f64,
    inclination: f64,
    longitude_of_ascending_node: f64,
    argument_of_periapsis: f64,
    epoch: f64,
    mean_anomaly_at_epoch: f64,

    // Derived quantities
    conic: Conic,
    semi_major_axis: f64,
    apoapsis: f64,
    semi_latus_rectum: f64,
    semi_minor_axis: f64,
    focal_distance: f64,
    mean_motion: f64,
    period: f64,
    /// Moves the xy plane to the orbital plane, x pointing at periapsis.
    transform: Rotation3<f64>,
}

///////////////////////////////////////////////////////////////////////////////
// Construction
///////////////////////////////////////////////////////////////////////////////

impl<P: HasMass> Orbit<P> {
    /// Orbit from periapsis (m) and the remaining orbital elements.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        primary: P,
        periapsis: f64,
        eccentricity: f64,
        inclination: f64,
        longitude_of_ascending_node: f64,
        argument_of_periapsis: f64,
        epoch: f64,
        mean_anomaly_at_epoch: f64,
    ) -> Self {
        let mu = primary.mu();
        let conic = Conic::from_eccentricity(eccentricity);

        // Fold retrograde-and-then-some inclinations back into [0, pi].
        // Inclination of exactly pi is a valid retrograde equatorial plane
        // and keeps its node and periapsis angles untouched.
        let mut inclination = inclination.rem_euclid(TAU);
        let mut longitude_of_ascending_node = longitude_of_ascending_node;
        let mut argument_of_periapsis = argument_of_periapsis;
        if inclination > PI {
            inclination -= PI;
            longitude_of_ascending_node = (longitude_of_ascending_node - PI).rem_euclid(TAU);
            argument_of_periapsis = (argument_of_periapsis - PI).rem_euclid(TAU);
        }

        let (semi_major_axis, mean_motion, period) = match conic {
            Conic::Parabolic => {
                // No semi-major axis to hang the mean motion on; Barker's
                // equation uses this rate on the semi-latus rectum instead
                let n = 1.5 * (mu / (2.0 * periapsis.powi(3))).sqrt();
                (f64::INFINITY, n, f64::INFINITY)
            }
            _ => {
                let a = periapsis / (1.0 - eccentricity);
                let n = (mu / a.abs().powi(3)).sqrt();
                (a, n, TAU / n)
            }
        };

        let apoapsis = semi_major_axis * (1.0 + eccentricity);
        let semi_latus_rectum = periapsis * (1.0 + eccentricity);
        let semi_minor_axis = match conic {
            Conic::Parabolic => f64::INFINITY,
            _ => semi_major_axis * (1.0 - eccentricity * eccentricity).abs().sqrt(),
        };
        let focal_distance = semi_major_axis * eccentricity;

        let transform = from_euler_angles(
            longitude_of_ascending_node,
            inclination,
            argument_of_periapsis,
        );

        Orbit {
            primary,
            periapsis,
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
            conic,
            semi_major_axis,
            apoapsis,
            semi_latus_rectum,
            semi_minor_axis,
            focal_distance,
            mean_motion,
            period,
            transform,
        }
    }

    /// Orbit from semi-major axis (m) and eccentricity.
    #[allow(clippy::too_many_arguments)]
    pub fn from_semi_major_axis(
        primary: P,
        semi_major_axis: f64,
        eccentricity: f64,
        inclination: f64,
        longitude_of_ascending_node: f64,
        argument_of_periapsis: f64,
        epoch: f64,
        mean_anomaly_at_epoch: f64,
    ) -> Result<Self, InvalidElements> {
        if eccentricity < 1.0 && semi_major_axis <= 0.0 {
            return Err(InvalidElements::ClosedWithNonPositiveAxis);
        }
        if eccentricity > 1.0 && semi_major_axis >= 0.0 {
            return Err(InvalidElements::OpenWithNonNegativeAxis);
        }
        if eccentricity == 1.0 {
            return Err(InvalidElements::ParabolicFromSemiMajorAxis);
        }

        Ok(Self::new(
            primary,
            semi_major_axis * (1.0 - eccentricity),
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
        ))
    }

    /// Orbit from two apses (m). Any apsis may be infinite, giving a
    /// parabolic trajectory; the order does not matter.
    #[allow(clippy::too_many_arguments)]
    pub fn from_apses(
        primary: P,
        apsis1: f64,
        apsis2: f64,
        inclination: f64,
        longitude_of_ascending_node: f64,
        argument_of_periapsis: f64,
        epoch: f64,
        mean_anomaly_at_epoch: f64,
    ) -> Self {
        let periapsis = apsis1.abs().min(apsis2.abs());
        let eccentricity = if apsis1.is_infinite() || apsis2.is_infinite() {
            1.0
        } else {
            (apsis1 - apsis2).abs() / (apsis1 + apsis2).abs()
        };

        Self::new(
            primary,
            periapsis,
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
        )
    }

    /// Orbit from orbital period (s) and eccentricity. Only closed orbits
    /// have a period, so e >= 1 is rejected.
    #[allow(clippy::too_many_arguments)]
    pub fn from_period(
        primary: P,
        period: f64,
        eccentricity: f64,
        inclination: f64,
        longitude_of_ascending_node: f64,
        argument_of_periapsis: f64,
        epoch: f64,
        mean_anomaly_at_epoch: f64,
    ) -> Result<Self, InvalidElements> {
        if eccentricity >= 1.0 {
            return Err(InvalidElements::OpenFromPeriod);
        }

        let mu = primary.mu();
        let semi_major_axis = ((period / TAU).powi(2) * mu).cbrt();

        Self::from_semi_major_axis(
            primary,
            semi_major_axis,
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
        )
    }

    /// Orbit from orbital period (s) and one apsis (m).
    #[allow(clippy::too_many_arguments)]
    pub fn from_period_apsis(
        primary: P,
        period: f64,
        apsis: f64,
        inclination: f64,
        longitude_of_ascending_node: f64,
        argument_of_periapsis: f64,
        epoch: f64,
        mean_anomaly_at_epoch: f64,
    ) -> Result<Self, InvalidElements> {
        if period.is_infinite() {
            return Err(InvalidElements::InfinitePeriod);
        }

        let mu = primary.mu();
        let semi_major_axis = ((period / TAU).powi(2) * mu).cbrt();
        let eccentricity = (apsis / semi_major_axis - 1.0).abs();

        Self::from_semi_major_axis(
            primary,
            semi_major_axis,
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
        )
    }

    /// Orbit from a state vector, in a referential centered on the primary.
    ///
    /// `epoch` is the time (s) at which the position (m) and velocity (m/s)
    /// were taken.
    // inspired from https://space.stackexchange.com/questions/1904/#1919
    pub fn from_state(
        primary: P,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        epoch: f64,
    ) -> Self {
        let mu = primary.mu();
        let distance = position.norm();
        let speed = velocity.norm();

        let x_axis = Vector3::x();
        let z_axis = Vector3::z();
        let normal = position.cross(&velocity);

        // eccentricity vector, pointing from focus to periapsis
        let radial_speed = geometry::dot(&position, &velocity);
        let eccentricity_vector =
            (position * speed * speed - velocity * radial_speed) / mu - position / distance;
        let eccentricity = eccentricity_vector.norm();

        // periapsis, from r(v) = (h^2 / mu) / (1 + e cos v)
        let specific_angular_momentum = normal.norm();
        let periapsis = specific_angular_momentum.powi(2) / mu / (1.0 + eccentricity);
        let periapsis_dir = if eccentricity != 0.0 {
            eccentricity_vector
        } else {
            x_axis
        };

        let inclination = geometry::angle(&normal, &z_axis);

        // direction of the ascending node; arbitrary when the orbital plane
        // coincides with the reference plane
        let ascending_node_dir = if inclination == 0.0 || inclination == PI {
            x_axis
        } else {
            z_axis.cross(&normal)
        };

        let mut longitude_of_ascending_node = geometry::angle(&x_axis, &ascending_node_dir);
        if normal.x < 0.0 {
            longitude_of_ascending_node = -longitude_of_ascending_node;
        }

        let argument_of_periapsis = oriented_angle(&ascending_node_dir, &periapsis_dir, &normal);

        let true_anomaly_at_epoch = oriented_angle(&periapsis_dir, &position, &normal);

        let conic = Conic::from_eccentricity(eccentricity);
        let mean_anomaly_at_epoch = conic.mean_anomaly_at_true_anomaly(true_anomaly_at_epoch);

        Self::new(
            primary,
            periapsis,
            eccentricity,
            inclination,
            longitude_of_ascending_node,
            argument_of_periapsis,
            epoch,
            mean_anomaly_at_epoch,
        )
    }
}

///////////////////////////////////////////////////////////////////////////////
// Elements and derived quantities
///////////////////////////////////////////////////////////////////////////////

impl<P> Orbit<P> {
    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn periapsis(&self) -> f64 {
        self.periapsis
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination(&self) -> f64 {
        self.inclination
    }

    pub fn longitude_of_ascending_node(&self) -> f64 {
        self.longitude_of_ascending_node
    }

    pub fn argument_of_periapsis(&self) -> f64 {
        self.argument_of_periapsis
    }

    pub fn epoch(&self) -> f64 {
        self.epoch
    }

    pub fn mean_anomaly_at_epoch(&self) -> f64 {
        self.mean_anomaly_at_epoch
    }

    pub fn conic(&self) -> Conic {
        self.conic
    }

    pub fn is_closed(&self) -> bool {
        self.conic.is_closed()
    }

    /// Positive for bound orbits, negative for hyperbolic, +inf parabolic.
    pub fn semi_major_axis(&self) -> f64 {
        self.semi_major_axis
    }

    /// Negative for hyperbolic trajectories, a non-physical marker.
    pub fn apoapsis(&self) -> f64 {
        self.apoapsis
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.semi_latus_rectum
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_minor_axis
    }

    pub fn focal_distance(&self) -> f64 {
        self.focal_distance
    }

    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    /// +inf for parabolic trajectories; a non-physical marker for
    /// hyperbolic ones.
    pub fn period(&self) -> f64 {
        self.period
    }

    /// Rotation taking the orbital-plane parametrisation (periapsis along
    /// x) to the reference frame: Rz(lan) * Rx(incl) * Rz(argp).
    pub fn transform(&self) -> Rotation3<f64> {
        self.transform
    }

    pub fn ejection_angle(&self) -> f64 {
        self.conic.ejection_angle()
    }

    /// Unit vector from the focus towards the periapsis.
    pub fn periapsis_direction(&self) -> Unit<Vector3<f64>> {
        self.transform * Vector3::x_axis()
    }

    /// Unit normal of the orbital plane, oriented with the motion.
    pub fn normal(&self) -> Unit<Vector3<f64>> {
        self.transform * Vector3::z_axis()
    }

    /// Unit vector towards the ascending node; falls back to the reference
    /// direction when the orbit is equatorial and has no node.
    pub fn ascending_node_direction(&self) -> Unit<Vector3<f64>> {
        let node = Vector3::z().cross(&self.normal().into_inner());
        Unit::try_new(node, 1e-20).unwrap_or_else(|| Vector3::x_axis())
    }

    /// The same elements around another primary. The derived quantities
    /// are recomputed from the new gravitational parameter.
    pub fn with_primary<Q: HasMass>(&self, new_primary: Q) -> Orbit<Q> {
        Orbit::new(
            new_primary,
            self.periapsis,
            self.eccentricity,
            self.inclination,
            self.longitude_of_ascending_node,
            self.argument_of_periapsis,
            self.epoch,
            self.mean_anomaly_at_epoch,
        )
    }
}

impl<P> fmt::Display for Orbit<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Orbit(periapsis={:e}, eccentricity={}, inclination={}, \
             longitude_of_ascending_node={}, argument_of_periapsis={}, \
             epoch={}, mean_anomaly_at_epoch={})",
            self.periapsis,
            self.eccentricity,
            self.inclination,
            self.longitude_of_ascending_node,
            self.argument_of_periapsis,
            self.epoch,
            self.mean_anomaly_at_epoch,
        )
    }
}
