use super::{Constraint, ConstraintKind};
use crate::{
   body::Body,
   equation::{Equation, EquationKind},
   math, Fp, Vec2,
};

const X: usize = 0;
const Y: usize = 1;
const MOTOR: usize = 2;
const UPPER: usize = 3;
const LOWER: usize = 4;

/// Pins a point of `a` to a point of `b`, leaving rotation free.
///
/// Optionally limits the relative angle `angle_b - angle_a` and drives it with a motor.
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteConstraint {
   pub local_pivot_a: Vec2,
   pub local_pivot_b: Vec2,
   pub upper_limit_enabled: bool,
   pub upper_limit: Fp,
   pub lower_limit_enabled: bool,
   pub lower_limit: Fp,
   pub motor_enabled: bool,
   /// Target of `angular_velocity_a - angular_velocity_b` while the motor runs.
   pub motor_speed: Fp,
   angle: Fp,
}

impl RevoluteConstraint {
   /// Relative angle as of the last update.
   #[inline]
   pub fn angle(&self) -> Fp {
      self.angle
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

   pub(super) fn update(&mut self, equations: &mut [Equation], bi: &Body, bj: &Body) {
      let relative_angle = bj.angle - bi.angle;
      self.angle = relative_angle;

      let upper = &mut equations[UPPER];
      upper.enabled = self.upper_limit_enabled && relative_angle > self.upper_limit;
      upper.set_angle(self.upper_limit);

      let lower = &mut equations[LOWER];
      lower.enabled = self.lower_limit_enabled && relative_angle < self.lower_limit;
      lower.set_angle(self.lower_limit);

      let motor = &mut equations[MOTOR];
      motor.enabled = self.motor_enabled;
      motor.relative_velocity = self.motor_speed;

      let world_pivot_a = math::rotate(self.local_pivot_a, bi.angle);
      let world_pivot_b = math::rotate(self.local_pivot_b, bj.angle);
      for (row, axis, unit) in [(X, 0, Vec2::X), (Y, 1, Vec2::Y)] {
         let eq = &mut equations[row];
         eq.kind = EquationKind::PivotAxis { local_pivot_a: self.local_pivot_a, local_pivot_b: self.local_pivot_b, axis };
         eq.g = [0.0; 6];
         eq.g[axis] = -1.0;
         eq.g[2] = -math::cross(world_pivot_a, unit);
         eq.g[3 + axis] = 1.0;
         eq.g[5] = math::cross(world_pivot_b, unit);
      }
   }
}

pub(super) fn set_max_force(equations: &mut [Equation], force: Fp) {
   equations[X].set_max_force(force);
   equations[Y].set_max_force(force);
}

impl Constraint {
   /// Revolute joint around a shared world point.
   pub fn revolute(a: &Body, b: &Body, world_pivot: Vec2) -> Constraint {
      Constraint::revolute_local(a, b, a.to_local_frame(world_pivot), b.to_local_frame(world_pivot))
   }

   /// Revolute joint between pivots given in each body's local frame.
   pub fn revolute_local(a: &Body, b: &Body, local_pivot_a: Vec2, local_pivot_b: Vec2) -> Constraint {
      let (ha, hb) = (a.handle(), b.handle());
      let pivot = |axis| EquationKind::PivotAxis { local_pivot_a, local_pivot_b, axis };

      let mut motor = Equation::rotational_velocity(ha, hb, 1.0);
      motor.enabled = false;
      let mut upper = Equation::rotational_lock(ha, hb, 0.0);
      upper.min_force = 0.0;
      upper.enabled = false;
      let mut lower = Equation::rotational_lock(ha, hb, 0.0);
      lower.max_force = 0.0;
      lower.enabled = false;

      let equations = vec![
         Equation::new(ha, hb, -Fp::MAX, Fp::MAX, pivot(0)),
         Equation::new(ha, hb, -Fp::MAX, Fp::MAX, pivot(1)),
         motor,
         upper,
         lower,
      ];
      let kind = RevoluteConstraint {
         local_pivot_a,
         local_pivot_b,
         upper_limit_enabled: false,
         upper_limit: 0.0,
         lower_limit_enabled: false,
         lower_limit: 0.0,
         motor_enabled: false,
         motor_speed: 0.0,
         angle: b.angle - a.angle,
      };
      Constraint::from_parts(ha, hb, equations, ConstraintKind::Revolute(kind))
   }

   /// Caps the torque a revolute or prismatic motor may apply.
   pub fn set_motor_max_force(&mut self, force: Fp) {
      let row = match self.kind {
         ConstraintKind::Revolute(_) => MOTOR,
         ConstraintKind::Prismatic(_) => super::prismatic::MOTOR,
         _ => return,
      };
      self.equations[row].set_max_force(force);
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::constraint::tests::{pair, simulate};
   use approx::assert_relative_eq;

   fn pivot_gap(c: &Constraint, bodies: &[Body]) -> Fp {
      let ConstraintKind::Revolute(r) = c.kind() else { unreachable!() };
      bodies[1].to_world_frame(r.local_pivot_b).distance(bodies[0].to_world_frame(r.local_pivot_a))
   }

   #[test]
   fn pivots_stay_together() {
      let mut bodies = pair(Vec2::new(2.0, 0.0));
      let mut c = Constraint::revolute(&bodies[0], &bodies[1], Vec2::new(1.0, 0.0));
      bodies[1].velocity = Vec2::new(0.0, 2.0);
      simulate(&mut c, &mut bodies, 120);
      assert!(pivot_gap(&c, &bodies) < 1e-2);
   }

   #[test]
   fn motor_spins_relative_to_base() {
      let mut bodies = pair(Vec2::ZERO);
      bodies[0].set_type(crate::BodyType::Static);
      let mut c = Constraint::revolute(&bodies[0], &bodies[1], Vec2::ZERO);
      if let ConstraintKind::Revolute(r) = c.kind_mut() {
         r.enable_motor(-2.0);
      }
      simulate(&mut c, &mut bodies, 30);
      assert_relative_eq!(bodies[1].angular_velocity, 2.0, epsilon = 1e-3);
   }

   #[test]
   fn upper_limit_stops_rotation() {
      let mut bodies = pair(Vec2::ZERO);
      bodies[0].set_type(crate::BodyType::Static);
      let mut c = Constraint::revolute(&bodies[0], &bodies[1], Vec2::ZERO);
      if let ConstraintKind::Revolute(r) = c.kind_mut() {
         r.set_limits(None, Some(0.5));
      }
      bodies[1].angular_velocity = 3.0;

      let mut furthest: Fp = 0.0;
      for _ in 0..120 {
         simulate(&mut c, &mut bodies, 1);
         let angle = bodies[1].angle;
         // at most one step of overshoot before the limit engages
         assert!(angle <= 0.5 + 0.06, "rotated to {angle}");
         furthest = furthest.max(angle);
         assert!(!c.equations()[LOWER].enabled);
      }
      assert!(furthest > 0.45);
      // the limit only pushes back, so the body leaves the stop instead of passing it
      assert!(bodies[1].angular_velocity <= 0.0);
   }
}
