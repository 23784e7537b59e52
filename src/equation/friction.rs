use crate::{math, shape::ShapeId, Fp, Vec2};
use smallvec::SmallVec;

/// Geometry of a friction constraint. The tangent `t` is the contact normal
/// rotated 90° clockwise.
#[derive(Debug, Clone, PartialEq)]
pub struct FrictionData {
   pub contact_point_a: Vec2,
   pub contact_point_b: Vec2,
   pub t: Vec2,
   /// Indices of the contact equations this friction belongs to, in the
   /// narrowphase contact list of the same step.
   pub contact_equations: SmallVec<[usize; 4]>,
   pub shape_a: ShapeId,
   pub shape_b: ShapeId,
   pub friction_coefficient: Fp,
}

impl FrictionData {
   pub fn new(shape_a: ShapeId, shape_b: ShapeId) -> FrictionData {
      FrictionData {
         contact_point_a: Vec2::ZERO,
         contact_point_b: Vec2::ZERO,
         t: Vec2::ZERO,
         contact_equations: SmallVec::new(),
         shape_a,
         shape_b,
         friction_coefficient: 0.3,
      }
   }

   pub(super) fn jacobian(&self) -> [Fp; 6] {
      let t = self.t;
      [
         -t.x,
         -t.y,
         -math::cross(self.contact_point_a, t),
         t.x,
         t.y,
         math::cross(self.contact_point_b, t),
      ]
   }
}

impl super::Equation {
   /// Symmetric bounds on the tangential force.
   #[inline]
   pub fn set_slip_force(&mut self, slip_force: Fp) {
      self.max_force = slip_force;
      self.min_force = -slip_force;
   }

   #[inline]
   pub fn slip_force(&self) -> Fp {
      self.max_force
   }
}
