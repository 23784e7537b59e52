use super::{Constraint, ConstraintKind};
use crate::{
   body::Body,
   equation::{Equation, EquationKind},
   math, Fp, Vec2,
};

const X: usize = 0;
const Y: usize = 1;
const ROTATION: usize = 2;

/// Welds `b` to `a` at a fixed offset and relative angle, both expressed in `a`'s frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LockConstraint {
   pub local_offset_b: Vec2,
   pub local_angle_b: Fp,
}

impl LockConstraint {
   pub(super) fn update(&mut self, equations: &mut [Equation], bi: &Body) {
      let l = math::rotate(self.local_offset_b, bi.angle);

      for (row, axis) in [(X, 0), (Y, 1)] {
         let eq = &mut equations[row];
         eq.kind = EquationKind::LockAxis { local_offset_b: self.local_offset_b, axis };
         eq.g = [0.0; 6];
         eq.g[axis] = -1.0;
         eq.g[3 + axis] = 1.0;
      }
      equations[X].g[2] = l.y;
      equations[Y].g[2] = -l.x;

      let rot = &mut equations[ROTATION];
      rot.kind = EquationKind::LockRotation { local_angle_b: self.local_angle_b };
      rot.g = [0.0, 0.0, -1.0, 0.0, 0.0, 1.0];
   }
}

impl Constraint {
   /// Locks `b` to `a` in their current relative pose.
   pub fn lock(a: &Body, b: &Body) -> Constraint {
      let local_offset_b = a.to_local_frame(b.position);
      let local_angle_b = b.angle - a.angle;
      Constraint::lock_with(a, b, local_offset_b, local_angle_b)
   }

   pub fn lock_with(a: &Body, b: &Body, local_offset_b: Vec2, local_angle_b: Fp) -> Constraint {
      let (ha, hb) = (a.handle(), b.handle());
      let equations = vec![
         Equation::new(ha, hb, -Fp::MAX, Fp::MAX, EquationKind::LockAxis { local_offset_b, axis: 0 }),
         Equation::new(ha, hb, -Fp::MAX, Fp::MAX, EquationKind::LockAxis { local_offset_b, axis: 1 }),
         Equation::new(ha, hb, -Fp::MAX, Fp::MAX, EquationKind::LockRotation { local_angle_b }),
      ];
      let mut constraint =
         Constraint::from_parts(ha, hb, equations, ConstraintKind::Lock(LockConstraint { local_offset_b, local_angle_b }));
      if let ConstraintKind::Lock(lock) = &mut constraint.kind {
         lock.update(&mut constraint.equations, a);
      }
      constraint
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::constraint::tests::{pair, simulate};
   use approx::assert_relative_eq;

   #[test]
   fn keeps_relative_pose() {
      let mut bodies = pair(Vec2::new(1.0, 1.0));
      let mut c = Constraint::lock(&bodies[0], &bodies[1]);
      bodies[0].angular_velocity = 1.0;
      bodies[1].velocity = Vec2::new(-1.0, 0.5);
      simulate(&mut c, &mut bodies, 120);

      let offset = bodies[0].to_local_frame(bodies[1].position);
      assert_relative_eq!(offset.x, 1.0, epsilon = 2e-2);
      assert_relative_eq!(offset.y, 1.0, epsilon = 2e-2);
      assert_relative_eq!(bodies[1].angle - bodies[0].angle, 0.0, epsilon = 2e-2);
   }

   #[test]
   fn initial_jacobian() {
      let bodies = pair(Vec2::new(2.0, 0.0));
      let c = Constraint::lock(&bodies[0], &bodies[1]);
      assert_eq!(c.equations()[0].g, [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
      assert_eq!(c.equations()[1].g, [0.0, -1.0, -2.0, 0.0, 1.0, 0.0]);
      assert_eq!(c.equations()[2].g, [0.0, 0.0, -1.0, 0.0, 0.0, 1.0]);
   }
}
