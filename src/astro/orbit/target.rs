//! Relative state and rendezvous searches between two orbits of the same
//! primary.

use nalgebra::Vector3;

use super::Orbit;
use crate::astro::HasMass;
use crate::math::root_finding::{bisection, golden_section_search};

impl<P: HasMass> Orbit<P> {
    /// Position of the target relative to this orbit's body (m).
    pub fn position_to_target<Q: HasMass>(
        &self,
        target: &Orbit<Q>,
        time: f64,
    ) -> Vector3<f64> {
        target.position_at_time(time) - self.position_at_time(time)
    }

    /// Distance to the target (m).
    pub fn distance_to_target<Q: HasMass>(&self, target: &Orbit<Q>, time: f64) -> f64 {
        self.position_to_target(target, time).norm()
    }

    /// Velocity of the target relative to this orbit's body (m/s).
    pub fn velocity_to_target<Q: HasMass>(
        &self,
        target: &Orbit<Q>,
        time: f64,
    ) -> Vector3<f64> {
        target.velocity_at_time(time) - self.velocity_at_time(time)
    }

    /// Closing speed with the target (m/s).
    pub fn speed_to_target<Q: HasMass>(&self, target: &Orbit<Q>, time: f64) -> f64 {
        self.velocity_to_target(target, time).norm()
    }

    /// Searches the next half-period after `time` for an approach within
    /// `tolerance` metres of the target.
    ///
    /// An open trajectory has no period to bound the search, so the search
    /// runs on the target's orbit instead when only this one is open; when
    /// both are open there is no bounded window at all and the result is
    /// `None`. `None` also means the orbits' radial shells are too far
    /// apart, or that no approach within tolerance exists in the window.
    pub fn time_at_next_approach<Q: HasMass>(
        &self,
        target: &Orbit<Q>,
        time: f64,
        tolerance: f64,
    ) -> Option<f64> {
        if !self.is_closed() {
            if !target.is_closed() {
                return None;
            }
            return target.time_at_next_approach(self, time, tolerance);
        }

        // basic pruning: disjoint radial shells can never approach
        if target.periapsis() - self.apoapsis() > tolerance {
            return None;
        }
        if target.is_closed() && self.periapsis() - target.apoapsis() > tolerance {
            return None;
        }

        // Although the distance is not strictly unimodal on a half-period,
        // golden section search works because it has at most one real local
        // minimum there.
        let distance = |t: f64| self.distance_to_target(target, t);
        golden_section_search(distance, time, time + self.period() / 2.0, tolerance)
    }

    /// Searches the next half-period after `time` for the instant the
    /// distance to the target first crosses below `encounter_radius`.
    ///
    /// Returns +inf when no approach gets that close.
    pub fn time_at_next_encounter<Q: HasMass>(
        &self,
        target: &Orbit<Q>,
        time: f64,
        encounter_radius: f64,
    ) -> f64 {
        // first, find a near approach with just enough precision
        let next_approach = match self.time_at_next_approach(target, time, encounter_radius) {
            Some(t) => t,
            None => return f64::INFINITY,
        };

        // second, walk back to the crossing of the encounter radius
        let distance_to_encounter =
            |t: f64| self.distance_to_target(target, t) - encounter_radius;
        bisection(distance_to_encounter, time, next_approach)
    }
}
