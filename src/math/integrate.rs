use nalgebra::SVector;

/// One step of the classical four-stage Runge-Kutta method.
///
/// Advances the state `y` of derivative `y' = f(t, y)` by a step `h`.
pub fn rk4<const N: usize>(
    f: impl Fn(f64, &SVector<f64, N>) -> SVector<f64, N>,
    t: f64,
    y: &SVector<f64, N>,
    h: f64,
) -> SVector<f64, N> {
    // notations from https://en.wikipedia.org/wiki/Runge%E2%80%93Kutta_methods
    let k1 = f(t, y);
    let k2 = f(t + h / 2.0, &(y + k1 * (h / 2.0)));
    let k3 = f(t + h / 2.0, &(y + k2 * (h / 2.0)));
    let k4 = f(t + h, &(y + k3 * h));
    y + (k1 + (k2 + k3) * 2.0 + k4) * (h / 6.0)
}
