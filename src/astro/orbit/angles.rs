//! Mapping between times, mean anomalies and the other anomalies of an
//! orbit. The anomaly-to-anomaly conversions themselves live on
//! [Conic](crate::astro::anomaly::Conic); this module anchors them to the
//! orbit's epoch and mean motion.

use super::Orbit;
use crate::astro::HasMass;

impl<P: HasMass> Orbit<P> {
    pub fn mean_anomaly_at_time(&self, time: f64) -> f64 {
        self.mean_anomaly_at_epoch + self.mean_motion * (time - self.epoch)
    }

    pub fn eccentric_anomaly_at_time(&self, time: f64) -> f64 {
        self.conic
            .eccentric_anomaly_at_mean_anomaly(self.mean_anomaly_at_time(time))
    }

    pub fn true_anomaly_at_time(&self, time: f64) -> f64 {
        self.conic
            .true_anomaly_at_mean_anomaly(self.mean_anomaly_at_time(time))
    }

    pub fn time_at_mean_anomaly(&self, mean_anomaly: f64) -> f64 {
        self.epoch + (mean_anomaly - self.mean_anomaly_at_epoch) / self.mean_motion
    }

    pub fn time_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> f64 {
        self.time_at_mean_anomaly(self.conic.mean_anomaly_at_eccentric_anomaly(eccentric_anomaly))
    }

    pub fn time_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        self.time_at_mean_anomaly(self.conic.mean_anomaly_at_true_anomaly(true_anomaly))
    }

    /// The positive true anomaly at which the orbit is `distance` away from
    /// the focus, if any.
    ///
    /// A non-circular orbit reaches a given distance either once (the
    /// apses), twice (anything in between, at opposite anomalies; the
    /// positive one is returned) or never. A circular orbit is either
    /// always or never at the distance, so it always gets `None`.
    pub fn true_anomaly_at_distance(&self, distance: f64) -> Option<f64> {
        if self.eccentricity == 0.0 {
            return None;
        }

        // too high a periapsis
        if distance < self.periapsis {
            return None;
        }

        // too low an apoapsis (apoapsis is negative for open trajectories)
        if 0.0 < self.apoapsis && self.apoapsis < distance {
            return None;
        }

        let cosine = (self.semi_latus_rectum / distance - 1.0) / self.eccentricity;
        Some(cosine.clamp(-1.0, 1.0).acos())
    }
}
