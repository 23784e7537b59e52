use super::{Equation, EquationKind};
use crate::{body::{Body, BodyHandle}, math, Fp, Vec2};

pub(super) fn angle_lock_gq(bi: &Body, bj: &Body, angle: Fp, ratio: Fp) -> Fp {
   ratio * bi.angle - bj.angle + angle
}

pub(super) fn rotational_lock_gq(bi: &Body, bj: &Body, angle: Fp) -> Fp {
   let world_a = math::rotate(Vec2::X, bi.angle + angle);
   let world_b = math::rotate(Vec2::Y, bj.angle);
   world_a.dot(world_b)
}

impl Equation {
   pub fn angle_lock(body_a: BodyHandle, body_b: BodyHandle, angle: Fp, ratio: Fp) -> Equation {
      let mut eq = Equation::new(body_a, body_b, -Fp::MAX, Fp::MAX, EquationKind::AngleLock { angle, ratio });
      eq.g[2] = ratio;
      eq.g[5] = -1.0;
      eq
   }

   pub fn rotational_lock(body_a: BodyHandle, body_b: BodyHandle, angle: Fp) -> Equation {
      let mut eq = Equation::new(body_a, body_b, -Fp::MAX, Fp::MAX, EquationKind::RotationalLock { angle });
      eq.g[2] = 1.0;
      eq.g[5] = -1.0;
      eq
   }

   pub fn rotational_velocity(body_a: BodyHandle, body_b: BodyHandle, ratio: Fp) -> Equation {
      let mut eq = Equation::new(body_a, body_b, -Fp::MAX, Fp::MAX, EquationKind::RotationalVelocity { ratio });
      eq.g[2] = -1.0;
      eq.g[5] = ratio;
      eq
   }

   /// Updates the gear ratio of angle lock and rotational velocity equations.
   pub fn set_ratio(&mut self, new_ratio: Fp) {
      match &mut self.kind {
         EquationKind::AngleLock { ratio, .. } => {
            *ratio = new_ratio;
            self.g[2] = new_ratio;
         }
         EquationKind::RotationalVelocity { ratio } => {
            *ratio = new_ratio;
            self.g[5] = new_ratio;
         }
         _ => {}
      }
   }

   /// Target angle of angle lock and rotational lock equations.
   pub fn set_angle(&mut self, new_angle: Fp) {
      match &mut self.kind {
         EquationKind::AngleLock { angle, .. } | EquationKind::RotationalLock { angle } => *angle = new_angle,
         _ => {}
      }
   }
}

#[cfg(test)]
mod tests {
   use crate::equation::{tests::two_bodies, Equation};
   use approx::assert_relative_eq;

   #[test]
   fn angle_lock_error() {
      let mut bodies = two_bodies();
      bodies[0].angle = 0.5;
      bodies[1].angle = 0.2;
      let mut eq = Equation::angle_lock(bodies[0].handle(), bodies[1].handle(), 0.0, 2.0);
      eq.index_b = 1;
      assert_relative_eq!(eq.compute_gq(&bodies), 0.8);
      eq.set_ratio(1.0);
      assert_eq!(eq.g[2], 1.0);
      assert_relative_eq!(eq.compute_gq(&bodies), 0.3);
   }

   #[test]
   fn rotational_lock_is_sine_of_error() {
      let mut bodies = two_bodies();
      bodies[1].angle = 0.3;
      let mut eq = Equation::rotational_lock(bodies[0].handle(), bodies[1].handle(), 0.1);
      eq.index_b = 1;
      assert_relative_eq!(eq.compute_gq(&bodies), (0.1_f64 - 0.3).sin() as crate::Fp, epsilon = 1e-12);
   }
}
