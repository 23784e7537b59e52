use super::{Constraint, ConstraintKind};
use crate::{
   body::Body,
   equation::Equation,
   Fp,
};

pub(super) const ANGLE: usize = 0;

/// Couples the rotation of two bodies: `angle_b = ratio * angle_a + angle`.
#[derive(Debug, Clone, PartialEq)]
pub struct GearConstraint {
   pub ratio: Fp,
   /// Angle offset between the two bodies.
   pub angle: Fp,
}

impl GearConstraint {
   pub(super) fn update(&mut self, equations: &mut [Equation]) {
      let eq = &mut equations[ANGLE];
      eq.set_ratio(self.ratio);
      eq.set_angle(self.angle);
   }
}

impl Constraint {
   /// Gear between `a` and `b`. The offset angle defaults to the bodies' current relation.
   pub fn gear(a: &Body, b: &Body, ratio: Fp, angle: Option<Fp>) -> Constraint {
      let angle = angle.unwrap_or(b.angle - ratio * a.angle);
      let eq = Equation::angle_lock(a.handle(), b.handle(), angle, ratio);
      Constraint::from_parts(a.handle(), b.handle(), vec![eq], ConstraintKind::Gear(GearConstraint { ratio, angle }))
   }

   /// Maximum torque of a gear's angle equation.
   pub fn set_max_torque(&mut self, torque: Fp) {
      if let ConstraintKind::Gear(_) = self.kind {
         self.equations[ANGLE].set_max_force(torque);
      }
   }
}
