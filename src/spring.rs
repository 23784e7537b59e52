//! Springs push bodies with forces each step. They take no part in the solver.

use crate::{
   body::{Body, BodyHandle},
   math, Fp, Vec2,
};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpringHandle(pub u32);

static NEXT_SPRING_ID: AtomicU32 = AtomicU32::new(1);

impl SpringHandle {
   fn next() -> SpringHandle {
      SpringHandle(NEXT_SPRING_ID.fetch_add(1, Ordering::Relaxed))
   }
}

/// Damped spring between two body-local anchor points.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearSpring {
   pub stiffness: Fp,
   pub damping: Fp,
   pub rest_length: Fp,
   pub local_anchor_a: Vec2,
   pub local_anchor_b: Vec2,
}

impl LinearSpring {
   /// Spring between world points `anchor_a` on `a` and `anchor_b` on `b`.
   /// The rest length defaults to the current anchor distance.
   pub fn new(a: &Body, b: &Body, anchor_a: Vec2, anchor_b: Vec2, rest_length: Option<Fp>) -> LinearSpring {
      LinearSpring {
         stiffness: 100.0,
         damping: 1.0,
         rest_length: rest_length.unwrap_or_else(|| anchor_b.distance(anchor_a)),
         local_anchor_a: a.to_local_frame(anchor_a),
         local_anchor_b: b.to_local_frame(anchor_b),
      }
   }

   pub fn with_stiffness(mut self, stiffness: Fp, damping: Fp) -> LinearSpring {
      self.stiffness = stiffness;
      self.damping = damping;
      self
   }

   pub fn world_anchor_a(&self, a: &Body) -> Vec2 {
      a.to_world_frame(self.local_anchor_a)
   }
   pub fn world_anchor_b(&self, b: &Body) -> Vec2 {
      b.to_world_frame(self.local_anchor_b)
   }

   pub fn apply_force(&self, a: &mut Body, b: &mut Body) {
      let ri = math::rotate(self.local_anchor_a, a.angle);
      let rj = math::rotate(self.local_anchor_b, b.angle);
      let r = b.position + rj - a.position - ri;
      let length = r.length();
      let r_unit = math::normalize_or(r, Vec2::ZERO);

      let u = b.velocity_at_point(rj) - a.velocity_at_point(ri);
      let f = r_unit * (-self.stiffness * (length - self.rest_length) - self.damping * u.dot(r_unit));

      a.force -= f;
      b.force += f;
      a.angular_force -= math::cross(ri, f);
      b.angular_force += math::cross(rj, f);
   }
}

/// Damped torsional spring acting on the bodies' relative angle.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationalSpring {
   pub stiffness: Fp,
   pub damping: Fp,
   pub rest_angle: Fp,
}

impl RotationalSpring {
   /// The rest angle defaults to the current `angle_b - angle_a`.
   pub fn new(a: &Body, b: &Body, rest_angle: Option<Fp>) -> RotationalSpring {
      RotationalSpring { stiffness: 100.0, damping: 1.0, rest_angle: rest_angle.unwrap_or(b.angle - a.angle) }
   }

   pub fn with_stiffness(mut self, stiffness: Fp, damping: Fp) -> RotationalSpring {
      self.stiffness = stiffness;
      self.damping = damping;
      self
   }

   pub fn apply_force(&self, a: &mut Body, b: &mut Body) {
      let error = b.angle - a.angle - self.rest_angle;
      let relative_velocity = b.angular_velocity - a.angular_velocity;
      let torque = -self.stiffness * error - self.damping * relative_velocity;
      a.angular_force -= torque;
      b.angular_force += torque;
   }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpringKind {
   Linear(LinearSpring),
   Rotational(RotationalSpring),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
   handle: SpringHandle,
   body_a: BodyHandle,
   body_b: BodyHandle,
   pub kind: SpringKind,
}

impl Spring {
   pub fn linear(a: &Body, b: &Body, spring: LinearSpring) -> Spring {
      Spring { handle: SpringHandle::next(), body_a: a.handle(), body_b: b.handle(), kind: SpringKind::Linear(spring) }
   }

   pub fn rotational(a: &Body, b: &Body, spring: RotationalSpring) -> Spring {
      Spring { handle: SpringHandle::next(), body_a: a.handle(), body_b: b.handle(), kind: SpringKind::Rotational(spring) }
   }

   #[inline]
   pub fn handle(&self) -> SpringHandle {
      self.handle
   }
   #[inline]
   pub fn body_a(&self) -> BodyHandle {
      self.body_a
   }
   #[inline]
   pub fn body_b(&self) -> BodyHandle {
      self.body_b
   }

   /// Adds the spring's forces to both bodies' accumulators.
   pub fn apply_force(&self, a: &mut Body, b: &mut Body) {
      match &self.kind {
         SpringKind::Linear(s) => s.apply_force(a, b),
         SpringKind::Rotational(s) => s.apply_force(a, b),
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{body::BodyOptions, shape::Shape};
   use approx::assert_relative_eq;

   fn pair() -> (Body, Body) {
      let mut a = Body::new(BodyOptions::dynamic(1.0));
      a.add_shape(Shape::circle(0.5)).unwrap();
      let mut b = Body::new(BodyOptions::dynamic(1.0).with_position(Vec2::new(2.0, 0.0)));
      b.add_shape(Shape::circle(0.5)).unwrap();
      (a, b)
   }

   #[test]
   fn stretched_spring_pulls_together() {
      let (mut a, mut b) = pair();
      let spring = LinearSpring::new(&a, &b, a.position, b.position, Some(1.0)).with_stiffness(10.0, 0.0);
      spring.apply_force(&mut a, &mut b);
      assert_relative_eq!(a.force, Vec2::new(10.0, 0.0));
      assert_relative_eq!(b.force, Vec2::new(-10.0, 0.0));
      assert_eq!(a.angular_force, 0.0);
   }

   #[test]
   fn damping_opposes_separation_speed() {
      let (mut a, mut b) = pair();
      b.velocity = Vec2::new(3.0, 0.0);
      let spring = LinearSpring::new(&a, &b, a.position, b.position, None).with_stiffness(0.0, 2.0);
      spring.apply_force(&mut a, &mut b);
      assert_relative_eq!(b.force, Vec2::new(-6.0, 0.0));
   }

   #[test]
   fn off_center_anchor_makes_torque() {
      let (mut a, mut b) = pair();
      let anchor_a = Vec2::new(0.0, 0.5);
      let spring = LinearSpring::new(&a, &b, anchor_a, b.position, Some(1.0)).with_stiffness(10.0, 0.0);
      spring.apply_force(&mut a, &mut b);
      assert!(a.angular_force.abs() > 0.0);
      assert_relative_eq!(a.force + b.force, Vec2::ZERO);
   }

   #[test]
   fn rotational_spring_restores_angle() {
      let (mut a, mut b) = pair();
      let spring = RotationalSpring::new(&a, &b, None).with_stiffness(5.0, 1.0);
      b.angle = 0.2;
      b.angular_velocity = 1.0;
      spring.apply_force(&mut a, &mut b);
      assert_relative_eq!(b.angular_force, -5.0 * 0.2 - 1.0);
      assert_relative_eq!(a.angular_force, -b.angular_force);
   }
}
