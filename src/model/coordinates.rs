//! Celestial coordinates of a point or a direction.
//!
//! Celestial coordinates are spherical coordinates; the referential is an
//! origin, a fundamental plane and a primary direction:
//!
//! * ecliptic coordinates: planet center, ecliptic, vernal equinox
//! * equatorial coordinates: planet center, celestial equator, vernal
//!   equinox
//!
//! The vernal equinox, celestial equator and ecliptic are respectively
//! the northward equinox, the equatorial plane and the orbital plane *of
//! the Earth*: the north pole of Mars is given in a referential centered
//! on Mars but oriented with Earth.

use nalgebra::{Unit, Vector3};

/// The obliquity of the ecliptic is Earth's axial tilt: the angle between
/// the celestial equator and the ecliptic.
pub const OBLIQUITY_OF_THE_ECLIPTIC: f64 = 0.40910517666747087;

#[derive(Debug, Clone, Copy)]
pub struct CelestialCoordinates {
    pub right_ascension: f64,
    pub declination: f64,
    pub ecliptic_longitude: f64,
    pub ecliptic_latitude: f64,
    /// +inf for a point infinitely far away, or a pure direction
    pub distance: f64,
}

impl CelestialCoordinates {
    /// Locate an object from its equatorial coordinates (see module doc).
    pub fn from_equatorial(right_ascension: f64, declination: f64, distance: f64) -> Self {
        let e = OBLIQUITY_OF_THE_ECLIPTIC;
        let ecliptic_longitude = (right_ascension.tan() * e.cos()
            + declination.tan() * e.sin() / right_ascension.cos())
        .atan();
        let ecliptic_latitude = (declination.sin() * e.cos()
            - declination.cos() * e.sin() * right_ascension.sin())
        .asin();
        CelestialCoordinates {
            right_ascension,
            declination,
            ecliptic_longitude,
            ecliptic_latitude,
            distance,
        }
    }

    /// Locate an object from its ecliptic coordinates (see module doc).
    pub fn from_ecliptic(ecliptic_longitude: f64, ecliptic_latitude: f64, distance: f64) -> Self {
        let e = OBLIQUITY_OF_THE_ECLIPTIC;
        let right_ascension = (ecliptic_longitude.tan() * e.cos()
            - ecliptic_latitude.tan() * e.sin() / ecliptic_longitude.cos())
        .atan();
        let declination = (ecliptic_latitude.sin() * e.cos()
            + ecliptic_latitude.cos() * e.sin() * ecliptic_longitude.sin())
        .asin();
        CelestialCoordinates {
            right_ascension,
            declination,
            ecliptic_longitude,
            ecliptic_latitude,
            distance,
        }
    }

    /// Unit direction in the ecliptic frame.
    pub fn ecliptic_direction(&self) -> Unit<Vector3<f64>> {
        let (s_lat, c_lat) = self.ecliptic_latitude.sin_cos();
        let (s_lon, c_lon) = self.ecliptic_longitude.sin_cos();
        Unit::new_normalize(Vector3::new(c_lat * c_lon, c_lat * s_lon, s_lat))
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;

    #[test]
    fn test_equinox_direction() {
        // The primary direction is shared by both referentials
        let coords = CelestialCoordinates::from_equatorial(0.0, 0.0, f64::INFINITY);
        assert_abs_diff_eq!(coords.ecliptic_longitude, 0.0);
        assert_abs_diff_eq!(coords.ecliptic_latitude, 0.0);
        assert_relative_eq!(
            coords.ecliptic_direction().into_inner(),
            Vector3::x(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_celestial_pole() {
        // The celestial north pole sits at an obliquity's tilt from the
        // ecliptic pole
        let coords = CelestialCoordinates::from_equatorial(0.0, FRAC_PI_2, f64::INFINITY);
        assert_relative_eq!(
            coords.ecliptic_latitude,
            FRAC_PI_2 - OBLIQUITY_OF_THE_ECLIPTIC,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            coords.ecliptic_direction().z,
            OBLIQUITY_OF_THE_ECLIPTIC.cos(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_equatorial_ecliptic_round_trip() {
        for i in -3..=3 {
            for j in -2..=2 {
                let right_ascension = i as f64 * 0.4;
                let declination = j as f64 * 0.35;
                let coords =
                    CelestialCoordinates::from_equatorial(right_ascension, declination, 1e12);
                let back = CelestialCoordinates::from_ecliptic(
                    coords.ecliptic_longitude,
                    coords.ecliptic_latitude,
                    coords.distance,
                );
                assert_abs_diff_eq!(back.right_ascension, right_ascension, epsilon = 1e-9);
                assert_abs_diff_eq!(back.declination, declination, epsilon = 1e-9);
            }
        }
    }
}
