use super::{Constraint, ConstraintKind};
use crate::{
   body::Body,
   equation::{ContactData, Equation, EquationKind},
   math,
   shape::ShapeId,
   Fp, Vec2,
};

const TRANSLATION: usize = 0;
const ROTATION: usize = 1;
const UPPER: usize = 2;
const LOWER: usize = 3;
pub(super) const MOTOR: usize = 4;

/// Lets `b` slide along an axis fixed in `a`, with no relative rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct PrismaticConstraint {
   pub local_anchor_a: Vec2,
   pub local_anchor_b: Vec2,
   /// Sliding direction in `a`'s frame.
   pub local_axis_a: Vec2,
   pub upper_limit_enabled: bool,
   pub upper_limit: Fp,
   pub lower_limit_enabled: bool,
   pub lower_limit: Fp,
   pub motor_enabled: bool,
   /// Target speed of `b`'s anchor relative to `a`'s along the axis.
   pub motor_speed: Fp,
   max_force: Fp,
   position: Fp,
}

impl PrismaticConstraint {
   /// Offset of `b`'s anchor from `a`'s along the axis, as of the last update.
   #[inline]
   pub fn position(&self) -> Fp {
      self.position
   }

   pub fn set_limits(&mut self, lower: Option<Fp>, upper: Option<Fp>) {
      self.lower_limit_enabled = lower.is_some();
      self.lower_limit = lower.unwrap_or(0.0);
      self.upper_limit_enabled = upper.is_some();
      self.upper_limit = upper.unwrap_or(0.0);
   }

   pub fn enable_motor(&mut self, speed: Fp) {
      self.motor_enabled = true;
      self.motor_speed = speed;
   }

   pub fn disable_motor(&mut self) {
      self.motor_enabled = false;
   }

   pub(super) fn set_max_force(&mut self, equations: &mut [Equation], force: Fp) {
      self.max_force = force;
      equations[TRANSLATION].set_max_force(force);
      equations[ROTATION].set_max_force(force);
      equations[UPPER].max_force = force;
      equations[LOWER].max_force = force;
   }

   pub(super) fn update(&mut self, equations: &mut [Equation], bi: &Body, bj: &Body) {
      let world_axis = math::rotate(self.local_axis_a, bi.angle);
      let oriented_a = math::rotate(self.local_anchor_a, bi.angle);
      let oriented_b = math::rotate(self.local_anchor_b, bj.angle);
      let world_anchor_a = bi.position + oriented_a;
      let world_anchor_b = bj.position + oriented_b;
      self.position = world_anchor_b.dot(world_axis) - world_anchor_a.dot(world_axis);

      let gg = world_anchor_b - world_anchor_a;
      let t = math::rotate(self.local_axis_a, bi.angle + crate::FRAC_PI_2);
      let trans = &mut equations[TRANSLATION];
      trans.kind = EquationKind::PrismaticTranslation {
         local_anchor_a: self.local_anchor_a,
         local_anchor_b: self.local_anchor_b,
         local_axis_a: self.local_axis_a,
      };
      trans.g = [-t.x, -t.y, -math::cross(oriented_a, t) + math::cross(t, gg), t.x, t.y, math::cross(oriented_b, t)];

      let motor = &mut equations[MOTOR];
      motor.enabled = self.motor_enabled;
      if self.motor_enabled {
         motor.relative_velocity = self.motor_speed;
         motor.g = [
            world_axis.x,
            world_axis.y,
            math::cross(world_axis, oriented_b),
            -world_axis.x,
            -world_axis.y,
            -math::cross(world_axis, oriented_a),
         ];
      }

      let upper_hit = self.upper_limit_enabled && self.position > self.upper_limit;
      equations[UPPER].enabled = upper_hit;
      if upper_hit {
         if let Some(c) = equations[UPPER].contact_mut() {
            c.normal_a = -world_axis;
            c.contact_point_a = oriented_a + world_axis * self.upper_limit;
            c.contact_point_b = oriented_b;
         }
      }

      let lower_hit = self.lower_limit_enabled && self.position < self.lower_limit;
      equations[LOWER].enabled = lower_hit;
      if lower_hit {
         if let Some(c) = equations[LOWER].contact_mut() {
            c.normal_a = world_axis;
            c.contact_point_a = oriented_a;
            c.contact_point_b = oriented_b - world_axis * self.lower_limit;
         }
      }
   }
}

impl Constraint {
   /// Prismatic joint sliding along `local_axis_a`, with anchors given in each body's frame.
   pub fn prismatic(a: &Body, b: &Body, local_anchor_a: Vec2, local_anchor_b: Vec2, local_axis_a: Vec2) -> Constraint {
      let (ha, hb) = (a.handle(), b.handle());
      let local_axis_a = math::normalize_or(local_axis_a, Vec2::X);

      let limit = || {
         let mut eq = Equation::new(ha, hb, 0.0, Fp::MAX, EquationKind::Contact(ContactData::new(ShapeId::NONE, ShapeId::NONE)));
         eq.enabled = false;
         eq
      };
      let mut motor = Equation::new(ha, hb, -Fp::MAX, Fp::MAX, EquationKind::Velocity);
      motor.enabled = false;

      let equations = vec![
         Equation::new(
            ha,
            hb,
            -Fp::MAX,
            Fp::MAX,
            EquationKind::PrismaticTranslation { local_anchor_a, local_anchor_b, local_axis_a },
         ),
         Equation::rotational_lock(ha, hb, 0.0),
         limit(),
         limit(),
         motor,
      ];
      let kind = PrismaticConstraint {
         local_anchor_a,
         local_anchor_b,
         local_axis_a,
         upper_limit_enabled: false,
         upper_limit: 1.0,
         lower_limit_enabled: false,
         lower_limit: 0.0,
         motor_enabled: false,
         motor_speed: 0.0,
         max_force: Fp::MAX,
         position: 0.0,
      };
      Constraint::from_parts(ha, hb, equations, ConstraintKind::Prismatic(kind))
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::constraint::tests::{pair, simulate};
   use approx::assert_relative_eq;

   #[test]
   fn slides_only_along_axis() {
      let mut bodies = pair(Vec2::new(1.0, 0.0));
      bodies[0].set_type(crate::BodyType::Static);
      let mut c = Constraint::prismatic(&bodies[0], &bodies[1], Vec2::ZERO, Vec2::ZERO, Vec2::X);
      bodies[1].velocity = Vec2::new(1.0, 1.0);
      bodies[1].angular_velocity = 1.0;
      simulate(&mut c, &mut bodies, 60);

      assert_relative_eq!(bodies[1].position.y, 0.0, epsilon = 1e-2);
      assert_relative_eq!(bodies[1].angle, 0.0, epsilon = 1e-2);
      assert!(bodies[1].position.x > 1.5);
   }

   #[test]
   fn limits_bound_the_slide() {
      let mut bodies = pair(Vec2::ZERO);
      bodies[0].set_type(crate::BodyType::Static);
      let mut c = Constraint::prismatic(&bodies[0], &bodies[1], Vec2::ZERO, Vec2::ZERO, Vec2::X);
      if let ConstraintKind::Prismatic(p) = c.kind_mut() {
         p.set_limits(Some(-1.0), Some(0.5));
      }
      bodies[1].velocity = Vec2::new(2.0, 0.0);

      let mut furthest: Fp = 0.0;
      for _ in 0..120 {
         simulate(&mut c, &mut bodies, 1);
         let x = bodies[1].position.x;
         assert!(x <= 0.5 + 0.04 && x >= -1.0 - 0.04, "slid to {x}");
         furthest = furthest.max(x);
         let ConstraintKind::Prismatic(p) = c.kind() else { unreachable!() };
         assert_relative_eq!(p.position(), x, epsilon = 0.05);
      }
      // the upper stop was reached and turned the body back
      assert!(furthest > 0.45);
      assert!(bodies[1].velocity.x < 0.0);
   }

   #[test]
   fn motor_drives_translation() {
      let mut bodies = pair(Vec2::ZERO);
      bodies[0].set_type(crate::BodyType::Static);
      let mut c = Constraint::prismatic(&bodies[0], &bodies[1], Vec2::ZERO, Vec2::ZERO, Vec2::X);
      if let ConstraintKind::Prismatic(p) = c.kind_mut() {
         p.enable_motor(1.5);
      }
      simulate(&mut c, &mut bodies, 30);
      assert_relative_eq!(bodies[1].velocity.x, 1.5, epsilon = 1e-3);
   }
}
