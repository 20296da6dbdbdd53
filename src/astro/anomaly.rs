//! Anomaly conversions on an eccentricity-classed conic.
//!
//! All three anomalies (mean, eccentric, true) are related by formulas that
//! change shape with the kind of conic, so the conversions live on a tagged
//! union rather than behind `if e < 1.0` chains scattered around the crate.

use std::f64::consts::{PI, TAU};

use log::trace;

use crate::math::root_finding::{bisection, newton_raphson};

/// Below this magnitude, Kepler's equation is solved by its first-order
/// Taylor expansion instead of Newton's method, whose slope vanishes at
/// periapsis when the eccentricity approaches 1.
const TAYLOR_GUARD: f64 = 1.4901161193847656e-8; // 2^-26

/// Iterative solutions of Kepler's equation are converged when the residual
/// is below this, relative to max(1, |M|).
const RESIDUAL_TOLERANCE: f64 = 2.842170943040401e-14; // 2^-45

/// A conic section classed by eccentricity.
///
/// The variants carry the eccentricity so that the anomaly transforms and
/// the Kepler solvers can dispatch on the class exactly once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conic {
    /// e < 1; includes circular orbits (e = 0)
    Elliptic(f64),
    /// e = 1
    Parabolic,
    /// e > 1
    Hyperbolic(f64),
}

impl Conic {
    pub fn from_eccentricity(eccentricity: f64) -> Self {
        assert!(
            eccentricity >= 0.0 && eccentricity.is_finite(),
            "eccentricity must be finite and non-negative, got {}",
            eccentricity
        );
        if eccentricity < 1.0 {
            Conic::Elliptic(eccentricity)
        } else if eccentricity == 1.0 {
            Conic::Parabolic
        } else {
            Conic::Hyperbolic(eccentricity)
        }
    }

    pub fn eccentricity(&self) -> f64 {
        match *self {
            Conic::Elliptic(e) => e,
            Conic::Parabolic => 1.0,
            Conic::Hyperbolic(e) => e,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Conic::Elliptic(_))
    }

    /// True anomaly at infinity, for open trajectories: acos(-1/e).
    ///
    /// Closed orbits never reach infinity and get +inf instead.
    pub fn ejection_angle(&self) -> f64 {
        match *self {
            Conic::Elliptic(_) => f64::INFINITY,
            // when inf = p / (1 + e cos v), 1 + e cos v = 0
            _ => (-1.0 / self.eccentricity()).acos(),
        }
    }

    pub fn mean_anomaly_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> f64 {
        let ea = eccentric_anomaly;
        match *self {
            Conic::Elliptic(e) => ea - e * ea.sin(),
            Conic::Parabolic => (ea.powi(3) + 3.0 * ea) / 2.0,
            Conic::Hyperbolic(e) => e * ea.sinh() - ea,
        }
    }

    pub fn true_anomaly_at_eccentric_anomaly(&self, eccentric_anomaly: f64) -> f64 {
        let ea = eccentric_anomaly;
        match *self {
            Conic::Elliptic(e) => {
                let x = (1.0 - e).sqrt() * (ea / 2.0).cos();
                let y = (1.0 + e).sqrt() * (ea / 2.0).sin();
                2.0 * y.atan2(x)
            }
            Conic::Parabolic => 2.0 * ea.atan(),
            Conic::Hyperbolic(e) => {
                let x = (e - 1.0).sqrt() * (ea / 2.0).cosh();
                let y = (e + 1.0).sqrt() * (ea / 2.0).sinh();
                2.0 * y.atan2(x)
            }
        }
    }

    /// Inverse of [Self::true_anomaly_at_eccentric_anomaly].
    ///
    /// In the hyperbolic case the atanh argument leaves [-1, 1] when the
    /// true anomaly reaches past the asymptote; the signed infinity returned
    /// there encodes "at (or beyond) infinite distance".
    pub fn eccentric_anomaly_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        let v = true_anomaly;
        match *self {
            Conic::Elliptic(e) => {
                let x = (1.0 + e).sqrt() * (v / 2.0).cos();
                let y = (1.0 - e).sqrt() * (v / 2.0).sin();
                2.0 * y.atan2(x)
            }
            Conic::Parabolic => (v / 2.0).tan(),
            Conic::Hyperbolic(e) => {
                let ratio = ((e - 1.0) / (e + 1.0)).sqrt() * (v / 2.0).tan();
                if ratio.abs() <= 1.0 {
                    2.0 * ratio.atanh()
                } else {
                    f64::INFINITY.copysign(ratio)
                }
            }
        }
    }

    /// Solves Kepler's equation for the eccentric anomaly.
    ///
    /// Elliptic and hyperbolic cases run Newton's method, falling back to
    /// bisection (followed by a Newton polish) when the iteration cap is hit
    /// without reaching the residual tolerance; the parabolic case has a
    /// closed form (Barker's equation).
    pub fn eccentric_anomaly_at_mean_anomaly(&self, mean_anomaly: f64) -> f64 {
        match *self {
            Conic::Elliptic(e) => {
                // M = E - e sin E
                let m = mean_anomaly.rem_euclid(TAU);

                // sin(E) = E -> M = (1 - e) E
                if m.abs() < TAYLOR_GUARD {
                    return m / (1.0 - e);
                }

                let f = |x: f64| x - e * x.sin() - m;
                let f_prime = |x: f64| 1.0 - e * x.cos();
                // The root is always bracketed by [0, 2pi] once M is
                // normalized, so the fallback needs no bracket search.
                solve_kepler(PI, 0.0, TAU, m, &f, &f_prime)
            }
            Conic::Parabolic => {
                let m = mean_anomaly;
                let z = (m + (m * m + 1.0).sqrt()).cbrt();
                z - 1.0 / z
            }
            Conic::Hyperbolic(e) => {
                // M = e sinh E - E
                let m = mean_anomaly;

                // sinh(E) = E -> M = (e - 1) E
                if m.abs() < TAYLOR_GUARD {
                    return m / (e - 1.0);
                }

                let f = |x: f64| e * x.sinh() - x - m;
                let f_prime = |x: f64| e * x.cosh() - 1.0;
                let (lo, hi) = grow_bracket(&f);
                solve_kepler(1.0, lo, hi, m, &f, &f_prime)
            }
        }
    }

    pub fn mean_anomaly_at_true_anomaly(&self, true_anomaly: f64) -> f64 {
        let ea = self.eccentric_anomaly_at_true_anomaly(true_anomaly);
        self.mean_anomaly_at_eccentric_anomaly(ea)
    }

    pub fn true_anomaly_at_mean_anomaly(&self, mean_anomaly: f64) -> f64 {
        let ea = self.eccentric_anomaly_at_mean_anomaly(mean_anomaly);
        self.true_anomaly_at_eccentric_anomaly(ea)
    }
}

fn solve_kepler(
    x_0: f64,
    bracket_lo: f64,
    bracket_hi: f64,
    mean_anomaly: f64,
    f: &impl Fn(f64) -> f64,
    f_prime: &impl Fn(f64) -> f64,
) -> f64 {
    let x = newton_raphson(x_0, f, f_prime);
    if converged(f(x), mean_anomaly) {
        return x;
    }

    // Newton stalled (this happens when e is barely above 1, or when a large
    // mean anomaly puts the root far from the seed). Bisection cannot stall;
    // a final Newton pass from its midpoint recovers the last few bits.
    trace!(
        "Kepler iteration stalled at residual {:e}, falling back to bisection",
        f(x)
    );
    let x = bisection(f, bracket_lo, bracket_hi);
    newton_raphson(x, f, f_prime)
}

fn converged(residual: f64, mean_anomaly: f64) -> bool {
    residual.abs() <= RESIDUAL_TOLERANCE * mean_anomaly.abs().max(1.0)
}

/// Doubles a radius around zero until `f` changes sign across it. `f` must
/// be increasing and unbounded both ways, so this always terminates; sinh
/// overflows to infinity long before the cap.
fn grow_bracket(f: &impl Fn(f64) -> f64) -> (f64, f64) {
    let mut radius = 1.0;
    for _ in 0..64 {
        if f(-radius) * f(radius) < 0.0 {
            break;
        }
        radius *= 2.0;
    }
    (-radius, radius)
}
