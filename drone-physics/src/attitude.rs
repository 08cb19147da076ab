//! Orientation integration and Euler decomposition.
//!
//! Axes follow a Y-up, right handed frame with the nose pointing down -Z:
//! pitch is about body X, yaw about body Y and roll about body Z.

use na::{UnitQuaternion, Vector3};

/// Advance `orientation` by body-frame angular velocity `omega` over `dt`.
///
/// The three rates are applied as separate body-axis rotations, always in the
/// order pitch (X), then yaw (Y), then roll (Z). Changing that order changes
/// trajectories, so reference runs depend on it.
pub fn rotate(
    orientation: &UnitQuaternion<f64>,
    omega: &Vector3<f64>,
    dt: f64,
) -> UnitQuaternion<f64> {
    let pitch = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), omega.x * dt);
    let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), omega.y * dt);
    let roll = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), omega.z * dt);

    let mut q = orientation * pitch * yaw * roll;
    // Drift from repeated products would otherwise accumulate.
    q.renormalize();
    q
}

/// Euler angles of a yaw-outer decomposition, `q = Ry(yaw) * Rx(pitch) * Rz(roll)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YawPitchRoll {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl YawPitchRoll {
    /// Decompose `q` with yaw taken first, so pitch and roll read the same
    /// whatever heading the vehicle has.
    pub fn from_quaternion(q: &UnitQuaternion<f64>) -> Self {
        let m = q.to_rotation_matrix();
        let m = m.matrix();

        let sin_pitch = -m[(1, 2)].clamp(-1.0, 1.0);
        let pitch = sin_pitch.asin();

        if m[(1, 2)].abs() < 0.999_999_9 {
            YawPitchRoll {
                yaw: m[(0, 2)].atan2(m[(2, 2)]),
                pitch,
                roll: m[(1, 0)].atan2(m[(1, 1)]),
            }
        } else {
            // Gimbal lock: fold all remaining rotation into yaw.
            YawPitchRoll {
                yaw: (-m[(2, 0)]).atan2(m[(0, 0)]),
                pitch,
                roll: 0.0,
            }
        }
    }

    pub fn to_quaternion(self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), self.yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.pitch)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.roll)
    }
}
