use std::collections::HashMap;

use log::debug;
use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::body::{Body, BodyID, BodyInfo};
use super::coordinates::CelestialCoordinates;
use crate::astro::orbit::{InvalidElements, Orbit};
use crate::astro::{HasMass, PointMass};

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("body {0:?} is not in the record map")]
    UnknownBody(String),
    #[error("body {0:?} is part of an orbit cycle")]
    CircularHierarchy(String),
    #[error("orbit of {0:?} has neither a periapsis nor a semi-major axis")]
    MissingShape(String),
    #[error("orbit of {name:?} is invalid: {source}")]
    InvalidOrbit {
        name: String,
        source: InvalidElements,
    },
}

/// Description of a celestial body in the interchange map consumed by
/// [System::from_records]. Distances are in metres, angles in radians,
/// times in seconds (J2000 epochs); loaders are responsible for converting
/// any other convention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyRecord {
    pub gravitational_parameter: f64,
    #[serde(default)]
    pub radius: f64,
    /// 0 (the default) means tidally locked for orbiting bodies
    #[serde(default)]
    pub rotational_period: f64,
    #[serde(default)]
    pub north_pole: Option<NorthPoleRecord>,
    #[serde(default)]
    pub orbit: Option<OrbitRecord>,
}

/// Direction of a body's rotation axis, in equatorial coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NorthPoleRecord {
    pub right_ascension: f64,
    pub declination: f64,
}

/// Orbital elements in the interchange map. Exactly one of `periapsis` and
/// `semi_major_axis` must be given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrbitRecord {
    pub primary: String,
    #[serde(default)]
    pub periapsis: Option<f64>,
    #[serde(default)]
    pub semi_major_axis: Option<f64>,
    #[serde(default)]
    pub eccentricity: f64,
    #[serde(default)]
    pub inclination: f64,
    #[serde(default)]
    pub longitude_of_ascending_node: f64,
    #[serde(default)]
    pub argument_of_periapsis: f64,
    #[serde(default)]
    pub epoch: f64,
    #[serde(default)]
    pub mean_anomaly_at_epoch: f64,
}

impl OrbitRecord {
    fn to_orbit(&self, name: &str, primary: PointMass) -> Result<Orbit<PointMass>, SystemError> {
        if let Some(periapsis) = self.periapsis {
            Ok(Orbit::new(
                primary,
                periapsis,
                self.eccentricity,
                self.inclination,
                self.longitude_of_ascending_node,
                self.argument_of_periapsis,
                self.epoch,
                self.mean_anomaly_at_epoch,
            ))
        } else if let Some(semi_major_axis) = self.semi_major_axis {
            Orbit::from_semi_major_axis(
                primary,
                semi_major_axis,
                self.eccentricity,
                self.inclination,
                self.longitude_of_ascending_node,
                self.argument_of_periapsis,
                self.epoch,
                self.mean_anomaly_at_epoch,
            )
            .map_err(|source| SystemError::InvalidOrbit {
                name: name.to_owned(),
                source,
            })
        } else {
            Err(SystemError::MissingShape(name.to_owned()))
        }
    }
}

impl NorthPoleRecord {
    /// Unit direction of the axis in the ecliptic frame.
    fn to_direction(self) -> Unit<Vector3<f64>> {
        CelestialCoordinates::from_equatorial(
            self.right_ascension,
            self.declination,
            f64::INFINITY,
        )
        .ecliptic_direction()
    }
}

#[derive(Debug, Clone)]
struct BodyState {
    body: Body,
    orbit: Option<Orbit<Body>>,
    satellites: Vec<BodyID>,
}

/// The tree of celestial bodies: an arena indexed by [BodyID] handles.
///
/// Each body optionally orbits a parent; parents hold the handles of their
/// satellites. Bodies are built once at load time and are read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct System {
    bodies: HashMap<BodyID, BodyState>,
    names: HashMap<String, BodyID>,
    next_body_id: usize,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the whole tree from an interchange map, resolving parents by
    /// name in dependency order.
    pub fn from_records(records: &HashMap<String, BodyRecord>) -> Result<Self, SystemError> {
        let mut system = System::new();
        let mut loading = Vec::new();
        for name in records.keys() {
            system.load_record(records, name, &mut loading)?;
        }
        Ok(system)
    }

    fn load_record(
        &mut self,
        records: &HashMap<String, BodyRecord>,
        name: &str,
        loading: &mut Vec<String>,
    ) -> Result<BodyID, SystemError> {
        if let Some(&id) = self.names.get(name) {
            return Ok(id);
        }
        if loading.iter().any(|loaded| loaded == name) {
            return Err(SystemError::CircularHierarchy(name.to_owned()));
        }
        let record = records
            .get(name)
            .ok_or_else(|| SystemError::UnknownBody(name.to_owned()))?;

        let info = BodyInfo {
            name: name.to_owned(),
            mu: record.gravitational_parameter,
            radius: record.radius,
            rotational_period: record.rotational_period,
            north_pole: record.north_pole.map(NorthPoleRecord::to_direction),
        };

        let id = match &record.orbit {
            None => self.add_fixed_body(info),
            Some(orbit_record) => {
                loading.push(name.to_owned());
                let parent_id = self.load_record(records, &orbit_record.primary, loading)?;
                loading.pop();

                let parent_mu = self.body(parent_id).info.mu;
                let orbit = orbit_record.to_orbit(name, PointMass::with_mu(parent_mu))?;
                self.add_body(info, orbit, parent_id)
            }
        };
        Ok(id)
    }

    /// Adds a body without a parent (the root of a tree).
    pub fn add_fixed_body(&mut self, info: BodyInfo) -> BodyID {
        self.insert_new_body(info, None, None)
    }

    /// Adds a body on the given orbit around an already-loaded parent.
    pub fn add_body(&mut self, info: BodyInfo, orbit: Orbit<PointMass>, parent_id: BodyID) -> BodyID {
        let parent = self.body(parent_id).clone();
        debug_assert_eq!(parent.info.mu, orbit.primary().mu());
        let orbit = orbit.with_primary(parent);
        self.insert_new_body(info, Some(orbit), Some(parent_id))
    }

    fn insert_new_body(
        &mut self,
        mut info: BodyInfo,
        orbit: Option<Orbit<Body>>,
        parent_id: Option<BodyID>,
    ) -> BodyID {
        let id = BodyID(self.next_body_id);
        self.next_body_id += 1;

        // tidal lock: an unspecified rotational period means one rotation
        // per orbit
        if info.rotational_period == 0.0 {
            if let Some(orbit) = &orbit {
                info.rotational_period = orbit.period();
            }
        }

        let sphere_of_influence = match &orbit {
            None => f64::INFINITY,
            Some(orbit) => {
                orbit.semi_major_axis() * (info.mu / orbit.primary().info.mu).powf(0.4)
            }
        };

        let solar_day = match &orbit {
            None => 0.0,
            Some(orbit) => {
                let sidereal_day = info.rotational_period;
                let sidereal_year = orbit.period();
                let solar_year = sidereal_year - sidereal_day;
                if solar_year == 0.0 {
                    f64::INFINITY
                } else {
                    sidereal_day * sidereal_year / solar_year
                }
            }
        };

        debug!(
            "loaded body {} (sphere of influence {:e} m)",
            info.name, sphere_of_influence
        );

        let body = Body {
            id,
            info,
            sphere_of_influence,
            solar_day,
        };

        self.names.insert(body.info.name.clone(), id);
        self.bodies.insert(
            id,
            BodyState {
                body,
                orbit,
                satellites: Vec::new(),
            },
        );
        if let Some(parent_id) = parent_id {
            self.bodies.get_mut(&parent_id).unwrap().satellites.push(id);
        }
        id
    }

    ///////////////////////////////////////////////////////////////////////////
    // Lookups
    ///////////////////////////////////////////////////////////////////////////

    pub fn body(&self, id: BodyID) -> &Body {
        &self.bodies[&id].body
    }

    pub fn lookup(&self, name: &str) -> Option<BodyID> {
        self.names.get(name).copied()
    }

    pub fn orbit(&self, id: BodyID) -> Option<&Orbit<Body>> {
        self.bodies[&id].orbit.as_ref()
    }

    pub fn parent(&self, id: BodyID) -> Option<BodyID> {
        self.bodies[&id]
            .orbit
            .as_ref()
            .map(|orbit| orbit.primary().id)
    }

    pub fn satellites(&self, id: BodyID) -> &[BodyID] {
        &self.bodies[&id].satellites
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> + '_ {
        self.bodies.values().map(|state| &state.body)
    }

    /// Position of a body in the frame of the tree's root, by walking the
    /// chain of primaries and summing each level's position.
    pub fn global_position_at_time(&self, id: BodyID, time: f64) -> Vector3<f64> {
        let mut position = Vector3::zeros();
        let mut current = Some(id);
        while let Some(id) = current {
            let state = &self.bodies[&id];
            if let Some(orbit) = &state.orbit {
                position += orbit.position_at_time(time);
            }
            current = self.parent(id);
        }
        position
    }

    ///////////////////////////////////////////////////////////////////////////
    // Local time
    ///////////////////////////////////////////////////////////////////////////

    /// Formats a duration (s) as `[+-]Yy,Dd,HH:MM:SS.s`, with local years
    /// (the body's orbital period) and local days (its rotational period).
    pub fn time_to_string(&self, id: BodyID, seconds: f64) -> String {
        let sign = if seconds < 0.0 { "-" } else { "+" };
        let mut seconds = seconds.abs();

        let year = self
            .orbit(id)
            .map(|orbit| orbit.period())
            .unwrap_or(f64::INFINITY);
        let day = match self.body(id).info.rotational_period {
            0.0 => f64::INFINITY,
            period => period,
        };

        let mut div_mod = |divisor: f64| {
            let quotient = (seconds / divisor).floor();
            seconds -= quotient * divisor;
            quotient
        };
        let y = div_mod(year);
        let d = div_mod(day);
        let h = div_mod(3600.0);
        let m = div_mod(60.0);

        format!("{}{}y,{:4}d,{:3}:{:02}:{:04.1}", sign, y, d, h, m, seconds)
    }

    /// Parses a duration formatted by [Self::time_to_string] back to
    /// seconds. `None` when the string does not match the grammar.
    pub fn string_to_time(&self, id: BodyID, formatted: &str) -> Option<f64> {
        let negative = formatted.starts_with('-');
        let unsigned = formatted.trim_start_matches(['+', '-']);

        let year = self
            .orbit(id)
            .map(|orbit| orbit.period())
            .unwrap_or(f64::INFINITY);
        let day = match self.body(id).info.rotational_period {
            0.0 => f64::INFINITY,
            period => period,
        };

        let mut seconds = 0.0;
        for token in unsigned.split(',') {
            let token = token.trim();
            if let Some(years) = token.strip_suffix('y') {
                seconds += years.trim().parse::<f64>().ok()? * year;
            } else if let Some(days) = token.strip_suffix('d') {
                seconds += days.trim().parse::<f64>().ok()? * day;
            } else {
                // HH:MM:SS.s, with the leading fields optional
                let mut value = 0.0;
                for field in token.split(':') {
                    value = value * 60.0 + field.trim().parse::<f64>().ok()?;
                }
                seconds += value;
            }
        }

        Some(if negative { -seconds } else { seconds })
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn star_info() -> BodyInfo {
        BodyInfo {
            name: "star".to_owned(),
            mu: 1e20,
            radius: 7e8,
            rotational_period: 0.0,
            north_pole: None,
        }
    }

    fn planet_record(primary: &str) -> BodyRecord {
        BodyRecord {
            gravitational_parameter: 4e14,
            radius: 6e6,
            rotational_period: 86400.0,
            north_pole: None,
            orbit: Some(OrbitRecord {
                primary: primary.to_owned(),
                periapsis: Some(1e11),
                semi_major_axis: None,
                eccentricity: 0.0,
                inclination: 0.0,
                longitude_of_ascending_node: 0.0,
                argument_of_periapsis: 0.0,
                epoch: 0.0,
                mean_anomaly_at_epoch: 0.0,
            }),
        }
    }

    fn star_record() -> BodyRecord {
        BodyRecord {
            gravitational_parameter: 1e20,
            radius: 7e8,
            rotational_period: 0.0,
            north_pole: None,
            orbit: None,
        }
    }

    #[test]
    fn test_from_records() {
        let mut records = HashMap::new();
        records.insert("star".to_owned(), star_record());
        records.insert("planet".to_owned(), planet_record("star"));

        let system = System::from_records(&records).unwrap();
        let star = system.lookup("star").unwrap();
        let planet = system.lookup("planet").unwrap();

        assert_eq!(system.parent(planet), Some(star));
        assert_eq!(system.parent(star), None);
        assert_eq!(system.satellites(star), &[planet]);
        assert_eq!(system.body(star).sphere_of_influence, f64::INFINITY);

        // r_soi = a (mu / mu_parent)^(2/5)
        assert_relative_eq!(
            system.body(planet).sphere_of_influence,
            1e11 * (4e14_f64 / 1e20).powf(0.4),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_unknown_primary() {
        let mut records = HashMap::new();
        records.insert("planet".to_owned(), planet_record("nothing"));
        assert!(matches!(
            System::from_records(&records),
            Err(SystemError::UnknownBody(_))
        ));
    }

    #[test]
    fn test_orbit_cycle() {
        let mut records = HashMap::new();
        let mut a = planet_record("b");
        a.gravitational_parameter = 1e12;
        let mut b = planet_record("a");
        b.gravitational_parameter = 1e12;
        records.insert("a".to_owned(), a);
        records.insert("b".to_owned(), b);
        assert!(matches!(
            System::from_records(&records),
            Err(SystemError::CircularHierarchy(_))
        ));
    }

    #[test]
    fn test_tidal_lock() {
        let mut records = HashMap::new();
        records.insert("star".to_owned(), star_record());
        let mut moon = planet_record("star");
        moon.rotational_period = 0.0;
        records.insert("moon".to_owned(), moon);

        let system = System::from_records(&records).unwrap();
        let moon = system.lookup("moon").unwrap();
        assert_relative_eq!(
            system.body(moon).info.rotational_period,
            system.orbit(moon).unwrap().period()
        );
        // a locked rotation means the sun never moves in the sky
        assert_eq!(system.body(moon).solar_day, f64::INFINITY);
    }

    #[test]
    fn test_global_position() {
        let mut system = System::new();
        let star = system.add_fixed_body(star_info());

        let planet_orbit = Orbit::new(PointMass::with_mu(1e20), 1e11, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let planet = system.add_body(
            BodyInfo {
                name: "planet".to_owned(),
                mu: 4e14,
                radius: 6e6,
                rotational_period: 86400.0,
                north_pole: None,
            },
            planet_orbit,
            star,
        );

        let moon_orbit = Orbit::new(PointMass::with_mu(4e14), 4e8, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        let moon = system.add_body(
            BodyInfo {
                name: "moon".to_owned(),
                mu: 5e12,
                radius: 1.7e6,
                rotational_period: 0.0,
                north_pole: None,
            },
            moon_orbit,
            planet,
        );

        // At t = 0 everything sits on the x axis
        let expected = Vector3::new(1e11 + 4e8, 0.0, 0.0);
        assert_relative_eq!(
            system.global_position_at_time(moon, 0.0),
            expected,
            max_relative = 1e-12
        );
        assert_relative_eq!(system.global_position_at_time(star, 0.0), Vector3::zeros());
    }

    #[test]
    fn test_local_time_round_trip() {
        let mut records = HashMap::new();
        records.insert("star".to_owned(), star_record());
        records.insert("planet".to_owned(), planet_record("star"));
        let system = System::from_records(&records).unwrap();
        let planet = system.lookup("planet").unwrap();

        for &time in &[0.0, 59.9, 3601.0, 90_000.0, 2e7, 3.456789e9] {
            let formatted = system.time_to_string(planet, time);
            let parsed = system.string_to_time(planet, &formatted).unwrap();
            assert_relative_eq!(parsed, time, epsilon = 0.1);
        }

        let formatted = system.time_to_string(planet, -90_000.0);
        assert!(formatted.starts_with('-'));
        let parsed = system.string_to_time(planet, &formatted).unwrap();
        assert_relative_eq!(parsed, -90_000.0, epsilon = 0.1);
    }

    #[test]
    fn test_kerbol_system() {
        // Reference values from the KSP wiki
        let mut records = HashMap::new();
        records.insert(
            "Kerbol".to_owned(),
            BodyRecord {
                gravitational_parameter: 1.1723328e18,
                radius: 2.616e8,
                rotational_period: 432_000.0,
                north_pole: None,
                orbit: None,
            },
        );
        records.insert(
            "Kerbin".to_owned(),
            BodyRecord {
                gravitational_parameter: 3.5316e12,
                radius: 600e3,
                rotational_period: 21_549.425,
                north_pole: None,
                orbit: Some(OrbitRecord {
                    primary: "Kerbol".to_owned(),
                    periapsis: None,
                    semi_major_axis: Some(13_599_840_256.0),
                    eccentricity: 0.0,
                    inclination: 0.0,
                    longitude_of_ascending_node: 0.0,
                    argument_of_periapsis: 0.0,
                    epoch: 0.0,
                    mean_anomaly_at_epoch: 3.14,
                }),
            },
        );

        let system = System::from_records(&records).unwrap();
        let kerbin = system.lookup("Kerbin").unwrap();

        assert_relative_eq!(
            system.orbit(kerbin).unwrap().period(),
            9_203_545.0,
            epsilon = 1.0
        );
        assert_relative_eq!(
            system.body(kerbin).sphere_of_influence,
            84_159_286.0,
            epsilon = 1.0
        );
    }

    #[test]
    fn test_north_pole_direction() {
        // Zero right ascension and declination: the direction lies in the
        // equatorial x axis, which the obliquity rotation leaves in place
        let record = NorthPoleRecord {
            right_ascension: 0.0,
            declination: 0.0,
        };
        assert_relative_eq!(
            record.to_direction().into_inner(),
            Vector3::x(),
            epsilon = 1e-12
        );

        // The celestial north pole tilts towards the ecliptic one by the
        // obliquity
        let record = NorthPoleRecord {
            right_ascension: 0.0,
            declination: std::f64::consts::FRAC_PI_2,
        };
        let direction = record.to_direction();
        assert_relative_eq!(
            direction.z,
            super::super::coordinates::OBLIQUITY_OF_THE_ECLIPTIC.cos(),
            max_relative = 1e-12
        );
    }
}
