use std::f64::consts::FRAC_PI_2;

use log::{debug, info};
use nalgebra::{Rotation3, Vector3, Vector6};

use super::body::Body;
use super::system::System;
use crate::astro::orbit::Orbit;
use crate::consts::STANDARD_GRAVITY;
use crate::math::geometry;
use crate::math::integrate::rk4;

/// A rocket part. Engines and tanks are both parts; an engine is a part
/// with thrust, a tank is a part with propellant, and a rocket just sums
/// whatever its parts provide.
#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub title: String,
    /// kg
    pub dry_mass: f64,
    /// N
    pub max_thrust: f64,
    /// s
    pub specific_impulse: f64,
    /// m/s
    pub exhaust_velocity: f64,
    /// kg/s at full throttle
    pub expulsion_rate: f64,
    /// kg
    pub propellant: f64,
}

impl Part {
    pub fn engine(
        name: &str,
        title: &str,
        dry_mass: f64,
        max_thrust: f64,
        specific_impulse: f64,
    ) -> Self {
        let exhaust_velocity = specific_impulse * STANDARD_GRAVITY;
        Part {
            name: name.to_owned(),
            title: title.to_owned(),
            dry_mass,
            max_thrust,
            specific_impulse,
            exhaust_velocity,
            expulsion_rate: max_thrust / exhaust_velocity,
            propellant: 0.0,
        }
    }

    pub fn tank(name: &str, title: &str, dry_mass: f64, propellant: f64) -> Self {
        Part {
            name: name.to_owned(),
            title: title.to_owned(),
            dry_mass,
            max_thrust: 0.0,
            specific_impulse: 0.0,
            exhaust_velocity: 0.0,
            expulsion_rate: 0.0,
            propellant,
        }
    }
}

/// What a polled resume condition says about the flight program.
#[derive(Debug, Clone, Copy)]
pub enum Resume {
    /// Condition satisfied: draw the next stage now
    Now,
    /// Not yet: poll again on the next simulation step
    NextStep,
    /// Sleep at least this many seconds before polling again
    After(f64),
}

impl From<bool> for Resume {
    fn from(satisfied: bool) -> Self {
        if satisfied {
            Resume::Now
        } else {
            Resume::NextStep
        }
    }
}

impl From<f64> for Resume {
    fn from(delay: f64) -> Self {
        Resume::After(delay)
    }
}

/// A resume condition, polled against the rocket's current state.
pub type Condition = Box<dyn Fn(&Rocket) -> Resume>;

/// A flight program: a lazy sequence of stages.
///
/// Each `next_stage` call applies the stage's control actions to the rocket
/// (set the throttle, turn...) and returns the condition to wait on before
/// the following stage; `None` ends the program.
pub trait FlightProgram {
    fn next_stage(&mut self, rocket: &mut Rocket) -> Option<Condition>;
}

/// A rocket, or a spaceship, or a duck.
///
/// Behaves like a satellite of its primary: it always carries the Kepler
/// orbit matching its current state, which [Rocket::simulate] keeps up to
/// date through thrust and sphere-of-influence changes.
pub struct Rocket {
    pub name: String,
    parts: Vec<Part>,
    /// in [0, 1]
    pub throttle: f64,

    // cached sums over parts
    pub dry_mass: f64,
    pub max_thrust: f64,
    pub expulsion_rate: f64,
    pub propellant: f64,

    // state vectors, in the primary's frame
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,

    pub orientation: Rotation3<f64>,
    /// Unit vector the engines push along: the orientation's z axis.
    pub prograde: Vector3<f64>,

    orbit: Orbit<Body>,
    program: Option<Box<dyn FlightProgram>>,
    condition: Option<Condition>,

    resume_time_program: f64,
    resume_time_escape: f64,
    resume_time_encounter: f64,
    /// Next time anything scheduled happens: the earliest of the program,
    /// escape and encounter resume times.
    pub resume_time: f64,
}

impl Rocket {
    /// A rocket sitting on the surface of `primary`, at (radius, 0, 0),
    /// moving with the surface.
    pub fn new(primary: Body, program: Option<Box<dyn FlightProgram>>) -> Rocket {
        let position = Vector3::new(primary.info.radius, 0.0, 0.0);
        let velocity = Vector3::new(0.0, primary.surface_velocity(), 0.0);

        // point up
        let orientation = geometry::rotation(FRAC_PI_2, 0.0, 1.0, 0.0);
        let prograde = orientation * Vector3::z();

        let orbit = Orbit::from_state(primary, position, velocity, 0.0);

        let mut rocket = Rocket {
            name: "rocket".to_owned(),
            parts: Vec::new(),
            throttle: 1.0,
            dry_mass: 0.0,
            max_thrust: 0.0,
            expulsion_rate: 0.0,
            propellant: 0.0,
            position,
            velocity,
            acceleration: Vector3::zeros(),
            orientation,
            prograde,
            orbit,
            program,
            condition: None,
            resume_time_program: 0.0,
            resume_time_escape: f64::INFINITY,
            resume_time_encounter: f64::INFINITY,
            resume_time: f64::INFINITY,
        };
        rocket.update_orbit(0.0);

        // draw the first stage
        if let Some(mut program) = rocket.program.take() {
            rocket.condition = program.next_stage(&mut rocket);
            rocket.program = Some(program);
        }
        rocket.update_program(0.0, 1e-6);

        rocket
    }

    pub fn primary(&self) -> &Body {
        self.orbit.primary()
    }

    pub fn orbit(&self) -> &Orbit<Body> {
        &self.orbit
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Total mass (kg): dry mass plus remaining propellant.
    pub fn mass(&self) -> f64 {
        self.dry_mass + self.propellant
    }

    pub fn add_parts(&mut self, parts: impl IntoIterator<Item = Part>) {
        self.parts.extend(parts);
        self.update_parts();
    }

    pub fn remove_parts(&mut self, names: &[&str]) {
        self.parts.retain(|part| !names.contains(&part.name.as_str()));
        self.update_parts();
    }

    fn update_parts(&mut self) {
        self.dry_mass = self.parts.iter().map(|part| part.dry_mass).sum();
        self.max_thrust = self.parts.iter().map(|part| part.max_thrust).sum();
        self.expulsion_rate = self.parts.iter().map(|part| part.expulsion_rate).sum();
        self.propellant = self.parts.iter().map(|part| part.propellant).sum();
    }

    /// Places the rocket on the given state vectors at `time` and rebuilds
    /// its orbit around the current primary.
    pub fn set_state(&mut self, position: Vector3<f64>, velocity: Vector3<f64>, time: f64) {
        self.position = position;
        self.velocity = velocity;
        self.update_orbit(time);
    }

    /// Turn `angle` radians around axis (x, y, z), dragging the prograde
    /// direction along.
    pub fn rotate(&mut self, angle: f64, x: f64, y: f64, z: f64) {
        self.orientation *= geometry::rotation(angle, x, y, z);
        self.prograde = self.orientation * Vector3::z();
    }

    /// Runs one simulation step from `t` to `t + dt`.
    ///
    /// Steps of the same rocket must be issued with non-decreasing times;
    /// the system is only read, except that re-parenting on a
    /// sphere-of-influence change updates which body counts this rocket
    /// among its satellites.
    pub fn simulate(&mut self, system: &System, t: f64, dt: f64) {
        // run the flight program
        self.update_program(t, dt);

        // update the state vectors
        self.update_physics(t, dt);

        // schedule the next encounter with a sibling
        self.update_encounter(system, t + dt);

        // handle a change of sphere of influence
        self.update_sphere_of_influence(system, t, dt);
    }

    fn update_program(&mut self, t: f64, dt: f64) {
        while self.resume_time_program <= t + dt {
            let delay = match &self.condition {
                None => f64::INFINITY,
                Some(condition) => match condition(self) {
                    Resume::Now => 0.0,
                    Resume::NextStep => dt,
                    Resume::After(delay) => delay,
                },
            };
            self.resume_time_program = t + delay;

            if delay >= dt {
                break;
            }

            debug!("{}: program advances to the next stage", self.name);
            match self.program.take() {
                None => self.condition = None,
                Some(mut program) => {
                    self.condition = program.next_stage(self);
                    self.program = Some(program);
                }
            }
        }
        self.update_resume_time();
    }

    fn update_physics(&mut self, t: f64, dt: f64) {
        if self.throttle == 0.0 {
            // coasting: follow the cached Kepler orbit analytically
            self.position = self.orbit.position_at_time(t + dt);
            self.velocity = self.orbit.velocity_at_time(t + dt);
            return;
        }

        // propulsion, scaled down if the tanks run dry mid-step
        let thrust = if self.propellant > 0.0 && self.expulsion_rate > 0.0 {
            let required_propellant = self.expulsion_rate * dt * self.throttle;
            let used_propellant = self.propellant.min(required_propellant);
            self.propellant -= used_propellant;
            let thrust_ratio = self.throttle * used_propellant / required_propellant;
            let mass = self.dry_mass + self.propellant;
            self.prograde * (self.max_thrust * thrust_ratio / mass)
        } else {
            Vector3::zeros()
        };

        let primary = self.primary().clone();
        let f = |_t: f64, y: &Vector6<f64>| {
            let position: Vector3<f64> = y.fixed_rows::<3>(0).into_owned();
            let velocity: Vector3<f64> = y.fixed_rows::<3>(3).into_owned();

            let distance = position.norm();
            let gravity = primary.gravity(distance);
            let acceleration = position * (-gravity / distance) + thrust;

            let mut derivative = Vector6::zeros();
            derivative.fixed_rows_mut::<3>(0).copy_from(&velocity);
            derivative.fixed_rows_mut::<3>(3).copy_from(&acceleration);
            derivative
        };

        let mut y = Vector6::zeros();
        y.fixed_rows_mut::<3>(0).copy_from(&self.position);
        y.fixed_rows_mut::<3>(3).copy_from(&self.velocity);
        let y = rk4(f, t, &y, dt);
        self.position = y.fixed_rows::<3>(0).into_owned();
        self.velocity = y.fixed_rows::<3>(3).into_owned();

        let distance = self.position.norm();
        self.acceleration = self.position * (-primary.gravity(distance) / distance) + thrust;

        self.update_orbit(t + dt);
    }

    fn update_encounter(&mut self, system: &System, time: f64) {
        let mut soonest = f64::INFINITY;
        for &sibling_id in system.satellites(self.primary().id) {
            let sibling = system.body(sibling_id);
            let Some(sibling_orbit) = system.orbit(sibling_id) else {
                continue;
            };
            let encounter =
                self.orbit
                    .time_at_next_encounter(sibling_orbit, time, sibling.sphere_of_influence);
            soonest = soonest.min(encounter);
        }
        self.resume_time_encounter = soonest;
        self.update_resume_time();
    }

    /// Handles a change of sphere of influence, in either direction.
    /// Returns true when the rocket was re-parented.
    fn update_sphere_of_influence(&mut self, system: &System, t: f64, dt: f64) -> bool {
        // entering the sphere of influence of a sibling
        for &sibling_id in system.satellites(self.primary().id) {
            let sibling = system.body(sibling_id);
            let Some(sibling_orbit) = system.orbit(sibling_id) else {
                continue;
            };

            // in most situations, orbits do not reach satellites
            if 0.0 < self.orbit.apoapsis() && self.orbit.apoapsis() < sibling_orbit.periapsis() {
                continue;
            }

            let sibling_position = sibling_orbit.position_at_time(t + dt);
            if (self.position - sibling_position).norm() > sibling.sphere_of_influence {
                continue;
            }

            info!(
                "{}: entering the sphere of influence of {}",
                self.name, sibling.info.name
            );
            self.position -= sibling_position;
            self.velocity -= sibling_orbit.velocity_at_time(t + dt);
            let new_primary = sibling.clone();
            self.orbit = Orbit::from_state(new_primary, self.position, self.velocity, t + dt);
            self.update_escape_time();
            return true;
        }

        // in most situations, orbits do not reach the sphere of influence
        let primary = self.primary().clone();
        if 0.0 < self.orbit.apoapsis() && self.orbit.apoapsis() < primary.sphere_of_influence {
            return false;
        }

        // escaping the sphere of influence of the primary
        if self.position.norm() > primary.sphere_of_influence {
            let Some(primary_orbit) = system.orbit(primary.id) else {
                // nothing above the root body to escape to
                return false;
            };

            info!(
                "{}: escaping the sphere of influence of {}",
                self.name, primary.info.name
            );
            self.position += primary_orbit.position_at_time(t + dt);
            self.velocity += primary_orbit.velocity_at_time(t + dt);
            let new_primary = primary_orbit.primary().clone();
            self.orbit = Orbit::from_state(new_primary, self.position, self.velocity, t + dt);
            self.update_escape_time();
            return true;
        }

        false
    }

    /// Rebuilds the cached orbit from the current state vectors.
    fn update_orbit(&mut self, epoch: f64) {
        let primary = self.primary().clone();
        self.orbit = Orbit::from_state(primary, self.position, self.velocity, epoch);
        self.update_escape_time();
    }

    fn update_escape_time(&mut self) {
        self.resume_time_escape = match self.orbit.true_anomaly_at_escape() {
            Some(true_anomaly) => {
                let time = self.orbit.time_at_true_anomaly(true_anomaly);
                if time.is_nan() {
                    f64::INFINITY
                } else {
                    time
                }
            }
            None => f64::INFINITY,
        };
        self.update_resume_time();
    }

    fn update_resume_time(&mut self) {
        self.resume_time = self
            .resume_time_program
            .min(self.resume_time_escape)
            .min(self.resume_time_encounter);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::model::body::{BodyID, BodyInfo};

    fn kerbin() -> Body {
        Body {
            id: BodyID(0),
            info: BodyInfo {
                name: "Kerbin".to_owned(),
                mu: 3.5316e12,
                radius: 600e3,
                rotational_period: 21_549.425,
                north_pole: None,
            },
            sphere_of_influence: 84_159_286.0,
            solar_day: 0.0,
        }
    }

    #[test]
    fn test_initial_state() {
        let rocket = Rocket::new(kerbin(), None);
        assert_relative_eq!(rocket.position, Vector3::new(600e3, 0.0, 0.0));
        assert_relative_eq!(
            rocket.velocity,
            Vector3::new(0.0, kerbin().surface_velocity(), 0.0)
        );
        // launchpad attitude: engines push radially out
        assert_relative_eq!(rocket.prograde, Vector3::x(), epsilon = 1e-12);
        // nothing scheduled without a program or an escape
        assert_eq!(rocket.resume_time, f64::INFINITY);
    }

    #[test]
    fn test_parts() {
        let mut rocket = Rocket::new(kerbin(), None);
        rocket.add_parts([
            Part::tank("tank", "Big Tank", 5_000.0, 30_000.0),
            Part::engine("engine", "Big Engine", 2_000.0, 1e6, 300.0),
        ]);

        assert_relative_eq!(rocket.dry_mass, 7_000.0);
        assert_relative_eq!(rocket.propellant, 30_000.0);
        assert_relative_eq!(rocket.max_thrust, 1e6);
        assert_relative_eq!(
            rocket.expulsion_rate,
            1e6 / (300.0 * STANDARD_GRAVITY),
            max_relative = 1e-12
        );
        assert_relative_eq!(rocket.mass(), 37_000.0);

        rocket.remove_parts(&["engine"]);
        assert_relative_eq!(rocket.max_thrust, 0.0);
        assert_relative_eq!(rocket.dry_mass, 5_000.0);
    }

    #[test]
    fn test_rotate() {
        let mut rocket = Rocket::new(kerbin(), None);
        // pitch the launchpad attitude over, towards the surface velocity
        rocket.rotate(-FRAC_PI_2, 1.0, 0.0, 0.0);
        assert_relative_eq!(rocket.prograde, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_burn_consumes_propellant() {
        let mut system = System::new();
        let kerbin_id = system.add_fixed_body(kerbin().info);
        let mut rocket = Rocket::new(system.body(kerbin_id).clone(), None);
        rocket.add_parts([
            Part::tank("tank", "Tank", 5_000.0, 10_000.0),
            Part::engine("engine", "Engine", 2_000.0, 1e6, 300.0),
        ]);
        rocket.throttle = 1.0;

        let before = rocket.propellant;
        rocket.simulate(&system, 0.0, 1.0);
        let burned = before - rocket.propellant;
        assert_relative_eq!(burned, rocket.expulsion_rate, max_relative = 1e-12);

        // the state vectors moved and the orbit was rebuilt around them
        assert!(rocket.position.x > 600e3);
        assert_relative_eq!(
            rocket.orbit().position_at_time(1.0),
            rocket.position,
            max_relative = 1e-6
        );
    }
}
