//! Joints between two bodies, each expressed as a fixed set of [`Equation`] rows.
//!
//! A constraint owns its equations. Every step the world resolves the body slots of
//! those equations and calls [`Constraint::update`], which rewrites Jacobians, targets
//! and bounds from the current body transforms and toggles limit and motor rows.

mod distance;
mod gear;
mod lock;
mod prismatic;
mod revolute;

pub use distance::DistanceConstraint;
pub use gear::GearConstraint;
pub use lock::LockConstraint;
pub use prismatic::PrismaticConstraint;
pub use revolute::RevoluteConstraint;

use crate::{
   body::{Body, BodyHandle},
   equation::Equation,
   Fp,
};
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u32);

static NEXT_CONSTRAINT_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
   Distance(DistanceConstraint),
   Gear(GearConstraint),
   Lock(LockConstraint),
   Prismatic(PrismaticConstraint),
   Revolute(RevoluteConstraint),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
   handle: ConstraintHandle,
   body_a: BodyHandle,
   body_b: BodyHandle,
   /// Whether shapes of the two connected bodies still collide with each other.
   pub collide_connected: bool,
   equations: Vec<Equation>,
   kind: ConstraintKind,
}

impl Constraint {
   pub(crate) fn from_parts(body_a: BodyHandle, body_b: BodyHandle, equations: Vec<Equation>, kind: ConstraintKind) -> Constraint {
      Constraint {
         handle: ConstraintHandle(NEXT_CONSTRAINT_ID.fetch_add(1, Ordering::Relaxed)),
         body_a,
         body_b,
         collide_connected: true,
         equations,
         kind,
      }
   }

   #[inline]
   pub fn handle(&self) -> ConstraintHandle {
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
   #[inline]
   pub fn connects(&self, body: BodyHandle) -> bool {
      self.body_a == body || self.body_b == body
   }

   pub fn with_collide_connected(mut self, collide_connected: bool) -> Constraint {
      self.collide_connected = collide_connected;
      self
   }

   #[inline]
   pub fn kind(&self) -> &ConstraintKind {
      &self.kind
   }
   /// Limits, motors and anchors. Changes take effect on the next [`Constraint::update`].
   #[inline]
   pub fn kind_mut(&mut self) -> &mut ConstraintKind {
      &mut self.kind
   }

   #[inline]
   pub fn equations(&self) -> &[Equation] {
      &self.equations
   }
   #[inline]
   pub fn equations_mut(&mut self) -> &mut [Equation] {
      &mut self.equations
   }

   pub fn set_stiffness(&mut self, stiffness: Fp) {
      for eq in self.equations.iter_mut() {
         eq.set_stiffness(stiffness);
      }
   }

   pub fn set_relaxation(&mut self, relaxation: Fp) {
      for eq in self.equations.iter_mut() {
         eq.set_relaxation(relaxation);
      }
   }

   /// Caps the force of the joint's main rows. For a gear this is the maximum torque.
   pub fn set_max_force(&mut self, force: Fp) {
      match &mut self.kind {
         ConstraintKind::Distance(c) => c.set_max_force(&mut self.equations, force),
         ConstraintKind::Gear(_) => self.equations[gear::ANGLE].set_max_force(force),
         ConstraintKind::Lock(_) => {
            for eq in self.equations.iter_mut() {
               eq.set_max_force(force);
            }
         }
         ConstraintKind::Prismatic(c) => c.set_max_force(&mut self.equations, force),
         ConstraintKind::Revolute(_) => revolute::set_max_force(&mut self.equations, force),
      }
   }

   /// Recomputes every row from the bodies' current state.
   ///
   /// Equation body slots must already be resolved against `bodies`.
   pub fn update(&mut self, bodies: &[Body]) {
      let Some(first) = self.equations.first() else { return };
      let (bi, bj) = (&bodies[first.index_a], &bodies[first.index_b]);
      match &mut self.kind {
         ConstraintKind::Distance(c) => c.update(&mut self.equations, bi, bj),
         ConstraintKind::Gear(c) => c.update(&mut self.equations),
         ConstraintKind::Lock(c) => c.update(&mut self.equations, bi),
         ConstraintKind::Prismatic(c) => c.update(&mut self.equations, bi, bj),
         ConstraintKind::Revolute(c) => c.update(&mut self.equations, bi, bj),
      }
   }
}

#[cfg(test)]
pub(crate) mod tests {
   use crate::{
      body::{Body, BodyOptions},
      shape::Shape,
      GsSolver, Vec2,
   };

   use super::Constraint;

   pub(crate) fn pair(position_b: Vec2) -> Vec<Body> {
      let mut a = Body::new(BodyOptions::dynamic(1.0));
      a.add_shape(Shape::circle(0.5)).unwrap();
      let mut b = Body::new(BodyOptions::dynamic(1.0).with_position(position_b));
      b.add_shape(Shape::circle(0.5)).unwrap();
      vec![a, b]
   }

   /// Steps the constraint alone, without gravity or contacts.
   pub(crate) fn simulate(constraint: &mut Constraint, bodies: &mut [Body], steps: usize) {
      let h = 1.0 / 60.0;
      let mut solver = GsSolver::new();
      solver.iterations = 20;
      for eq in constraint.equations_mut() {
         eq.index_a = 0;
         eq.index_b = 1;
      }
      for _ in 0..steps {
         constraint.update(bodies);
         let mut eqs: Vec<_> = constraint.equations_mut().iter_mut().collect();
         let active: Vec<usize> = (0..eqs.len()).filter(|&i| eqs[i].enabled).collect();
         solver.solve(h, &mut eqs, &active, bodies);
         for body in bodies.iter_mut() {
            body.integrate(h);
            body.set_zero_force();
         }
      }
   }
}
