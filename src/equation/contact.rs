use crate::{body::Body, math, shape::ShapeId, Fp, Vec2};

/// Geometry of one contact point.
///
/// `contact_point_a`/`contact_point_b` run from each body's origin to the
/// contact point, in world orientation. `normal_a` points out of `a` into `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactData {
   pub contact_point_a: Vec2,
   pub contact_point_b: Vec2,
   pub normal_a: Vec2,
   pub restitution: Fp,
   /// Set when the two bodies were not touching in the previous step.
   pub first_impact: bool,
   pub shape_a: ShapeId,
   pub shape_b: ShapeId,
}

impl ContactData {
   pub fn new(shape_a: ShapeId, shape_b: ShapeId) -> ContactData {
      ContactData {
         contact_point_a: Vec2::ZERO,
         contact_point_b: Vec2::ZERO,
         normal_a: Vec2::ZERO,
         restitution: 0.0,
         first_impact: false,
         shape_a,
         shape_b,
      }
   }

   pub(super) fn jacobian(&self) -> [Fp; 6] {
      let n = self.normal_a;
      let rixn = math::cross(self.contact_point_a, n);
      let rjxn = math::cross(self.contact_point_b, n);
      [-n.x, -n.y, -rixn, n.x, n.y, rjxn]
   }

   /// Penetration along the normal, negative when overlapping.
   pub(super) fn compute_gq(&self, bi: &Body, bj: &Body) -> Fp {
      let penetration = bj.position + self.contact_point_b - bi.position - self.contact_point_a;
      self.normal_a.dot(penetration)
   }

   /// Approach speed along the normal, positive when closing.
   pub fn velocity_along_normal(&self, bi: &Body, bj: &Body) -> Fp {
      let vi = bi.velocity_at_point(self.contact_point_a);
      let vj = bj.velocity_at_point(self.contact_point_b);
      self.normal_a.dot(vi - vj)
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::equation::{tests::{between, two_bodies}, EquationKind};
   use approx::assert_relative_eq;

   fn touching(bodies: &[Body]) -> ContactData {
      let mut c = ContactData::new(bodies[0].shapes()[0].id(), bodies[1].shapes()[0].id());
      c.normal_a = Vec2::X;
      c.contact_point_a = Vec2::new(0.6, 0.0); // overlapping by 0.1
      c.contact_point_b = Vec2::new(-0.5, 0.0);
      c
   }

   #[test]
   fn penetration_is_negative() {
      let bodies = two_bodies();
      let eq = between(&bodies, EquationKind::Contact(touching(&bodies)));
      assert_relative_eq!(eq.compute_gq(&bodies), -0.1, epsilon = 1e-12);
   }

   #[test]
   fn restitution_on_first_impact() {
      let mut bodies = two_bodies();
      bodies[0].velocity = Vec2::new(2.0, 0.0);
      let mut c = touching(&bodies);
      c.restitution = 0.5;
      c.first_impact = true;
      assert_relative_eq!(c.velocity_along_normal(&bodies[0], &bodies[1]), 2.0);

      let mut eq = between(&bodies, EquationKind::Contact(c));
      // GW = -2, so B = (1 + e) * 2 regardless of penetration or a
      assert_relative_eq!(eq.compute_b(1000.0, 0.8, 1.0 / 60.0, &bodies), 3.0, epsilon = 1e-12);
      assert_eq!(eq.g, [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
   }
}
