use nalgebra::{Matrix3, Rotation3, Vector3};

/// Dot product with compensated summation, so that nearly-cancelling
/// components (common when orbital planes nearly coincide) don't lose
/// precision to intermediate rounding.
pub fn dot(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    // Neumaier's variant of Kahan summation
    let terms = [u.x * v.x, u.y * v.y, u.z * v.z];
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for term in terms {
        let t = sum + term;
        if sum.abs() >= term.abs() {
            compensation += (sum - t) + term;
        } else {
            compensation += (term - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Returns the angle between u and v, in [0, pi].
///
/// The cosine is clamped to [-1, 1] before acos, to absorb the rounding
/// of the norms.
pub fn angle(u: &Vector3<f64>, v: &Vector3<f64>) -> f64 {
    let cosine = dot(u, v) / u.norm() / v.norm();
    cosine.clamp(-1.0, 1.0).acos()
}

/// Returns the angle between u and v, signed by orientation around `normal`:
/// negative iff (u, v, normal) form a left-handed triple.
pub fn oriented_angle(u: &Vector3<f64>, v: &Vector3<f64>, normal: &Vector3<f64>) -> f64 {
    let geometric_angle = angle(u, v);
    if dot(normal, &u.cross(v)) < 0.0 {
        -geometric_angle
    } else {
        geometric_angle
    }
}

/// Rotation of `angle` radians around the axis (x, y, z). The axis does not
/// need to be normalized.
pub fn rotation(angle: f64, x: f64, y: f64, z: f64) -> Rotation3<f64> {
    let s = angle.sin();
    let c = angle.cos();
    let d = (x * x + y * y + z * z).sqrt();
    let (x, y, z) = (x / d, y / d, z / d);
    Rotation3::from_matrix_unchecked(Matrix3::new(
        x * x * (1.0 - c) + c,
        x * y * (1.0 - c) - z * s,
        x * z * (1.0 - c) + y * s,
        y * x * (1.0 - c) + z * s,
        y * y * (1.0 - c) + c,
        y * z * (1.0 - c) - x * s,
        z * x * (1.0 - c) - y * s,
        z * y * (1.0 - c) + x * s,
        z * z * (1.0 - c) + c,
    ))
}

/// The composite Z1-X2-Z3 rotation Rz(alpha) * Rx(beta) * Rz(gamma), written
/// out analytically.
///
/// Multiplying three rotation matrices instead would let roundoff couple
/// alpha and gamma when beta is zero; the closed form keeps them exact.
pub fn from_euler_angles(alpha: f64, beta: f64, gamma: f64) -> Rotation3<f64> {
    // see https://en.wikipedia.org/wiki/Euler_angles#Rotation_matrix
    let (s1, c1) = alpha.sin_cos();
    let (s2, c2) = beta.sin_cos();
    let (s3, c3) = gamma.sin_cos();
    Rotation3::from_matrix_unchecked(Matrix3::new(
        c1 * c3 - c2 * s1 * s3,
        -c1 * s3 - c2 * c3 * s1,
        s1 * s2,
        c3 * s1 + c1 * c2 * s3,
        c1 * c2 * c3 - s1 * s3,
        -c1 * s2,
        s2 * s3,
        c3 * s2,
        c2,
    ))
}
