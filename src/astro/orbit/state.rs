//! Position and velocity along an orbit.

use nalgebra::Vector3;

use super::Orbit;
use crate::astro::HasMass;

impl<P: HasMass> Orbit<P> {
    /// Distance from the focus (m) at a given true anomaly (rad).
    pub fn distance_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.semi_latus_rectum / (1.0 + self.eccentricity * true_anomaly.cos())
    }

    /// Orbital speed (m/s) at a given distance from the focus.
    ///
    /// This is the vis-viva equation:
    /// speed^2 / mu = 2/distance - 1/semi_major_axis
    pub fn speed_at_distance(&self, distance: f64) -> f64 {
        let mu = self.primary.mu();
        (mu * (2.0 / distance - 1.0 / self.semi_major_axis)).sqrt()
    }

    /// Orbital speed (m/s) at a given true anomaly (rad).
    pub fn speed_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.speed_at_distance(self.distance_at_true_anomaly(true_anomaly))
    }

    /// Orbital speed at periapsis, the fastest point of the orbit.
    pub fn speed_at_periapsis(&self) -> f64 {
        self.speed_at_distance(self.periapsis)
    }

    /// Orbital speed at apoapsis, the slowest point of a closed orbit.
    pub fn speed_at_apoapsis(&self) -> f64 {
        self.speed_at_distance(self.apoapsis)
    }

    /// Position vector at a given true anomaly (rad).
    pub fn position_at_true_anomaly(&self, true_anomaly: f64) -> Vector3<f64> {
        let distance = self.distance_at_true_anomaly(true_anomaly);
        let (s, c) = true_anomaly.sin_cos();
        self.transform * Vector3::new(distance * c, distance * s, 0.0)
    }

    /// Velocity vector at a given true anomaly (rad).
    ///
    /// The direction comes from differentiating the conic parametrisation;
    /// its norm is then set from the vis-viva speed, which is cheaper and
    /// better conditioned than differentiating the norm too.
    pub fn velocity_at_true_anomaly(&self, true_anomaly: f64) -> Vector3<f64> {
        let distance = self.distance_at_true_anomaly(true_anomaly);
        let (s, c) = true_anomaly.sin_cos();
        let e = self.eccentricity;

        let radial_rate = self.semi_latus_rectum * e * s / (1.0 + e * c).powi(2);
        let direction = Vector3::new(
            -distance * s + radial_rate * c,
            distance * c + radial_rate * s,
            0.0,
        );

        let speed = self.speed_at_true_anomaly(true_anomaly);
        self.transform * (direction * (speed / direction.norm()))
    }

    /// Position vector at a given time (s).
    pub fn position_at_time(&self, time: f64) -> Vector3<f64> {
        self.position_at_true_anomaly(self.true_anomaly_at_time(time))
    }

    /// Velocity vector at a given time (s).
    pub fn velocity_at_time(&self, time: f64) -> Vector3<f64> {
        self.velocity_at_true_anomaly(self.true_anomaly_at_time(time))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{PI, TAU};

    use approx::assert_relative_eq;

    use super::*;
    use crate::astro::PointMass;
    use crate::consts::{circular_velocity, orbital_period, AU};

    #[test]
    fn test_earth_year() {
        // The Sun and a nearly-circular one-au orbit
        let sun = PointMass::with_mu(1.3271244018e20);
        let earth = Orbit::from_semi_major_axis(sun, AU, 0.016, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();

        // One sidereal year
        let period = earth.period();
        assert_relative_eq!(period, 3.1558e7, max_relative = 5e-4);
        assert_relative_eq!(period, orbital_period(AU, 1.3271244018e20), max_relative = 1e-12);

        // After a full period we are back where we started
        let start = earth.position_at_time(0.0);
        let end = earth.position_at_time(period);
        assert_relative_eq!(start, end, max_relative = 1e-6);
    }

    #[test]
    fn test_visviva() {
        let primary = PointMass::with_mu(1e20);
        let orbit = Orbit::new(primary, 1e9, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0);

        assert_relative_eq!(orbit.apoapsis(), 3e9);
        assert!(orbit.speed_at_periapsis() > orbit.speed_at_apoapsis());

        // Conservation: the same energy at both apses
        let energy = |r: f64, v: f64| v * v / 2.0 - 1e20 / r;
        assert_relative_eq!(
            energy(orbit.periapsis(), orbit.speed_at_periapsis()),
            energy(orbit.apoapsis(), orbit.speed_at_apoapsis()),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_position_geometry() {
        let primary = PointMass::with_mu(1e20);
        let orbit = Orbit::new(primary, 1e9, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0);

        // Periapsis on +x, apoapsis on -x, both at their distances
        assert_relative_eq!(
            orbit.position_at_true_anomaly(0.0),
            Vector3::new(1e9, 0.0, 0.0)
        );
        assert_relative_eq!(
            orbit.position_at_true_anomaly(PI),
            Vector3::new(-3e9, 0.0, 0.0),
            epsilon = 1e-5
        );

        // An inclined orbit leaves the xy plane
        let inclined = Orbit::new(primary, 1e9, 0.0, PI / 4.0, 0.0, 0.0, 0.0, 0.0);
        let p = inclined.position_at_true_anomaly(PI / 2.0);
        assert_relative_eq!(p.y, p.z, max_relative = 1e-12);
    }

    #[test]
    fn test_velocity_is_tangent() {
        let primary = PointMass::with_mu(1e20);
        let orbit = Orbit::new(primary, 1e9, 0.3, 0.5, 1.0, 2.0, 0.0, 0.0);

        // Finite-difference check of the velocity direction and magnitude
        let t = 1e4;
        let h = 1e-2;
        let numeric =
            (orbit.position_at_time(t + h) - orbit.position_at_time(t - h)) / (2.0 * h);
        let analytic = orbit.velocity_at_time(t);
        assert_relative_eq!(numeric, analytic, max_relative = 1e-7);
    }

    #[test]
    fn test_circular_speed() {
        let primary = PointMass::with_mu(1e20);
        let orbit = Orbit::new(primary, 1e9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for i in 0..8 {
            let v = i as f64 * TAU / 8.0;
            assert_relative_eq!(
                orbit.speed_at_true_anomaly(v),
                circular_velocity(1e9, 1e20),
                max_relative = 1e-12
            );
        }
    }
}
