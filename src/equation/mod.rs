//! Constraint equations: one Jacobian row between two bodies, stabilized with SPOOK.
//!
//! An equation stores `G = [Gxa, Gya, Gwa, Gxb, Gyb, Gwb]` and solves for the impulse
//! `lambda` that satisfies `G * v = 0` subject to `min_force * h <= lambda <= max_force * h`.
//! What differs between kinds is how the position error `Gq` and, for contacts and
//! friction, the Jacobian itself are computed.

mod contact;
mod friction;
mod joint;
mod rotational;

pub use contact::ContactData;
pub use friction::FrictionData;

use crate::{body::{Body, BodyHandle}, events::ContactInfo, Fp, Vec2};
use fnv::FnvHashMap;

pub const DEFAULT_STIFFNESS: Fp = 1e6;
pub const DEFAULT_RELAXATION: Fp = 4.0;

#[derive(Debug, Clone, PartialEq)]
pub enum EquationKind {
   /// `Gq = G * [xa, aa, xb, ab] + offset`.
   Generic,
   /// Constrains velocity only, `Gq = 0`. Used for motors driven by `relative_velocity`.
   Velocity,
   /// Non-penetration along a contact normal.
   Contact(ContactData),
   /// Tangential friction at one or more contacts.
   Friction(FrictionData),
   /// `ratio * angle_a - angle_b + angle = 0`.
   AngleLock { angle: Fp, ratio: Fp },
   /// Keeps `angle_b - angle_a` at `angle`, measured as the sine of the error.
   RotationalLock { angle: Fp },
   /// `ratio * w_b - w_a` driven toward `-relative_velocity`.
   RotationalVelocity { ratio: Fp },
   /// Distance between two body-local anchors.
   DistanceAnchor { local_anchor_a: Vec2, local_anchor_b: Vec2, distance: Fp },
   /// One world axis (`0` = x, `1` = y) of `b`'s offset from `a`'s transformed `local_offset_b`.
   LockAxis { local_offset_b: Vec2, axis: usize },
   /// Relative angle held at `local_angle_b`.
   LockRotation { local_angle_b: Fp },
   /// One world axis of the separation between two body-local pivots.
   PivotAxis { local_pivot_a: Vec2, local_pivot_b: Vec2, axis: usize },
   /// Offset of `b`'s anchor from `a`'s anchor across `a`'s sliding axis.
   PrismaticTranslation { local_anchor_a: Vec2, local_anchor_b: Vec2, local_axis_a: Vec2 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
   pub body_a: BodyHandle,
   pub body_b: BodyHandle,
   pub(crate) index_a: usize,
   pub(crate) index_b: usize,

   pub g: [Fp; 6],
   stiffness: Fp,
   relaxation: Fp,
   pub min_force: Fp,
   pub max_force: Fp,
   /// Position error is clamped to `±max_bias` before it enters the right-hand side.
   pub max_bias: Fp,
   /// Added to the position error.
   pub offset: Fp,
   /// Added to the constraint-space velocity.
   pub relative_velocity: Fp,
   pub enabled: bool,

   pub(crate) a: Fp,
   pub(crate) b: Fp,
   pub(crate) epsilon: Fp,
   pub(crate) time_step: Fp,
   pub(crate) needs_update: bool,

   pub(crate) lambda: Fp,
   pub(crate) b_rhs: Fp,
   pub(crate) inv_c: Fp,
   /// Force applied by the equation in the last solve, `lambda / h`.
   pub multiplier: Fp,

   pub kind: EquationKind,
}

impl Equation {
   pub fn new(body_a: BodyHandle, body_b: BodyHandle, min_force: Fp, max_force: Fp, kind: EquationKind) -> Equation {
      Equation {
         body_a,
         body_b,
         index_a: 0,
         index_b: 0,
         g: [0.0; 6],
         stiffness: DEFAULT_STIFFNESS,
         relaxation: DEFAULT_RELAXATION,
         min_force,
         max_force,
         max_bias: Fp::MAX,
         offset: 0.0,
         relative_velocity: 0.0,
         enabled: true,
         a: 0.0,
         b: 0.0,
         epsilon: 0.0,
         time_step: 1.0 / 60.0,
         needs_update: true,
         lambda: 0.0,
         b_rhs: 0.0,
         inv_c: 0.0,
         multiplier: 0.0,
         kind,
      }
   }

   #[inline]
   pub fn stiffness(&self) -> Fp {
      self.stiffness
   }
   #[inline]
   pub fn relaxation(&self) -> Fp {
      self.relaxation
   }
   pub fn set_stiffness(&mut self, stiffness: Fp) {
      self.stiffness = stiffness;
      self.needs_update = true;
   }
   pub fn set_relaxation(&mut self, relaxation: Fp) {
      self.relaxation = relaxation;
      self.needs_update = true;
   }
   pub fn set_time_step(&mut self, time_step: Fp) {
      if self.time_step != time_step {
         self.time_step = time_step;
         self.needs_update = true;
      }
   }

   /// Symmetric force bounds `[-force, force]`.
   pub fn set_max_force(&mut self, force: Fp) {
      self.min_force = -force;
      self.max_force = force;
   }

   pub(crate) fn resolve_indices(&mut self, index: &FnvHashMap<BodyHandle, usize>) -> bool {
      //! Looks up the storage slots of both bodies. Returns `false` if either is missing.
      match (index.get(&self.body_a), index.get(&self.body_b)) {
         (Some(&a), Some(&b)) => {
            self.index_a = a;
            self.index_b = b;
            true
         }
         _ => false,
      }
   }

   /// Recomputes the SPOOK parameters from stiffness, relaxation and time step.
   pub fn update(&mut self) {
      let (k, d, h) = (self.stiffness, self.relaxation, self.time_step);
      self.a = 4.0 / (h * (1.0 + 4.0 * d));
      self.b = (4.0 * d) / (1.0 + 4.0 * d);
      self.epsilon = 4.0 / (h * h * k * (1.0 + 4.0 * d));
      self.needs_update = false;
   }

   #[inline]
   fn gmult(&self, vi: Vec2, wi: Fp, vj: Vec2, wj: Fp) -> Fp {
      let g = &self.g;
      g[0] * vi.x + g[1] * vi.y + g[2] * wi + g[3] * vj.x + g[4] * vj.y + g[5] * wj
   }

   pub fn compute_gq(&self, bodies: &[Body]) -> Fp {
      //! Position-level constraint violation.
      let (bi, bj) = (&bodies[self.index_a], &bodies[self.index_b]);
      match &self.kind {
         EquationKind::Generic => self.gmult(bi.position, bi.angle, bj.position, bj.angle) + self.offset,
         EquationKind::Velocity | EquationKind::RotationalVelocity { .. } | EquationKind::Friction(_) => 0.0,
         EquationKind::Contact(c) => c.compute_gq(bi, bj) + self.offset,
         EquationKind::AngleLock { angle, ratio } => rotational::angle_lock_gq(bi, bj, *angle, *ratio),
         EquationKind::RotationalLock { angle } => rotational::rotational_lock_gq(bi, bj, *angle),
         EquationKind::DistanceAnchor { local_anchor_a, local_anchor_b, distance } => {
            joint::distance_gq(bi, bj, *local_anchor_a, *local_anchor_b, *distance)
         }
         EquationKind::LockAxis { local_offset_b, axis } => joint::lock_axis_gq(bi, bj, *local_offset_b, *axis),
         EquationKind::LockRotation { local_angle_b } => bj.angle - bi.angle - local_angle_b,
         EquationKind::PivotAxis { local_pivot_a, local_pivot_b, axis } => {
            joint::pivot_axis_gq(bi, bj, *local_pivot_a, *local_pivot_b, *axis)
         }
         EquationKind::PrismaticTranslation { local_anchor_a, local_anchor_b, local_axis_a } => {
            joint::prismatic_gq(bi, bj, *local_anchor_a, *local_anchor_b, *local_axis_a)
         }
      }
   }

   /// Constraint-space relative velocity.
   pub fn compute_gw(&self, bodies: &[Body]) -> Fp {
      let (bi, bj) = (&bodies[self.index_a], &bodies[self.index_b]);
      self.gmult(bi.velocity, bi.angular_velocity, bj.velocity, bj.angular_velocity) + self.relative_velocity
   }

   /// Constraint-space velocity accumulated by the solver so far.
   #[inline]
   pub fn compute_gw_lambda(&self, bodies: &[Body]) -> Fp {
      let (bi, bj) = (&bodies[self.index_a], &bodies[self.index_b]);
      self.gmult(bi.vlambda, bi.wlambda, bj.vlambda, bj.wlambda)
   }

   /// Constraint-space contribution of the external forces, `G * M^-1 * f`.
   pub fn compute_gimf(&self, bodies: &[Body]) -> Fp {
      let (bi, bj) = (&bodies[self.index_a], &bodies[self.index_b]);
      let imfi = bi.force * bi.inv_mass_solve * bi.mass_multiplier;
      let imfj = bj.force * bj.inv_mass_solve * bj.mass_multiplier;
      self.gmult(imfi, bi.angular_force * bi.inv_inertia_solve, imfj, bj.angular_force * bj.inv_inertia_solve)
   }

   /// Effective inverse mass along the Jacobian, `G * M^-1 * G'`.
   pub fn compute_gimgt(&self, bodies: &[Body]) -> Fp {
      let (bi, bj) = (&bodies[self.index_a], &bodies[self.index_b]);
      let g = &self.g;
      g[0] * g[0] * bi.inv_mass_solve * bi.mass_multiplier.x
         + g[1] * g[1] * bi.inv_mass_solve * bi.mass_multiplier.y
         + g[2] * g[2] * bi.inv_inertia_solve
         + g[3] * g[3] * bj.inv_mass_solve * bj.mass_multiplier.x
         + g[4] * g[4] * bj.inv_mass_solve * bj.mass_multiplier.y
         + g[5] * g[5] * bj.inv_inertia_solve
   }

   /// Refreshes Jacobians that depend on contact geometry. Other kinds are set up by their constraint.
   pub(crate) fn update_jacobian(&mut self) {
      match &self.kind {
         EquationKind::Contact(c) => self.g = c.jacobian(),
         EquationKind::Friction(f) => self.g = f.jacobian(),
         _ => {}
      }
   }

   /// Solver right-hand side `B = -Gq * a - GW * b - GiMf * h`.
   pub fn compute_b(&mut self, a: Fp, b: Fp, h: Fp, bodies: &[Body]) -> Fp {
      self.update_jacobian();
      let gimf = self.compute_gimf(bodies);

      if let EquationKind::Contact(c) = &self.kind {
         if c.first_impact && c.restitution != 0.0 {
            let gw = (1.0 + c.restitution) / b * self.compute_gw(bodies);
            return -gw * b - gimf * h;
         }
      }

      let gq = self.compute_gq(bodies).clamp(-self.max_bias, self.max_bias);
      let gw = self.compute_gw(bodies);
      -gq * a - gw * b - gimf * h
   }

   #[inline]
   pub fn compute_inv_c(&self, eps: Fp, bodies: &[Body]) -> Fp {
      let c = self.compute_gimgt(bodies) + eps;
      if c != 0.0 { 1.0 / c } else { 0.0 }
   }

   pub(crate) fn add_to_wlambda(&self, delta_lambda: Fp, bodies: &mut [Body]) {
      let g = &self.g;

      let bi = &mut bodies[self.index_a];
      bi.vlambda += Vec2::new(g[0], g[1]) * bi.inv_mass_solve * delta_lambda * bi.mass_multiplier;
      bi.wlambda += bi.inv_inertia_solve * g[2] * delta_lambda;

      let bj = &mut bodies[self.index_b];
      bj.vlambda += Vec2::new(g[3], g[4]) * bj.inv_mass_solve * delta_lambda * bj.mass_multiplier;
      bj.wlambda += bj.inv_inertia_solve * g[5] * delta_lambda;
   }

   #[inline]
   pub fn contact(&self) -> Option<&ContactData> {
      if let EquationKind::Contact(c) = &self.kind { Some(c) } else { None }
   }
   #[inline]
   pub fn contact_mut(&mut self) -> Option<&mut ContactData> {
      if let EquationKind::Contact(c) = &mut self.kind { Some(c) } else { None }
   }
   #[inline]
   pub fn friction(&self) -> Option<&FrictionData> {
      if let EquationKind::Friction(f) = &self.kind { Some(f) } else { None }
   }
   #[inline]
   pub fn friction_mut(&mut self) -> Option<&mut FrictionData> {
      if let EquationKind::Friction(f) = &mut self.kind { Some(f) } else { None }
   }

   pub fn contact_info(&self) -> Option<ContactInfo> {
      self.contact().map(|c| ContactInfo {
         body_a: self.body_a,
         body_b: self.body_b,
         shape_a: c.shape_a,
         shape_b: c.shape_b,
         normal_a: c.normal_a,
         contact_point_a: c.contact_point_a,
         contact_point_b: c.contact_point_b,
      })
   }
}

#[cfg(test)]
pub(crate) mod tests {
   use super::*;
   use crate::{body::BodyOptions, shape::Shape};
   use approx::assert_relative_eq;

   pub(crate) fn two_bodies() -> Vec<Body> {
      let mut a = Body::new(BodyOptions::dynamic(1.0));
      a.add_shape(Shape::circle(0.5)).unwrap();
      let mut b = Body::new(BodyOptions::dynamic(2.0).with_position(Vec2::new(1.0, 0.0)));
      b.add_shape(Shape::circle(0.5)).unwrap();
      vec![a, b]
   }

   pub(crate) fn between(bodies: &[Body], kind: EquationKind) -> Equation {
      let mut eq = Equation::new(bodies[0].handle(), bodies[1].handle(), -Fp::MAX, Fp::MAX, kind);
      eq.index_a = 0;
      eq.index_b = 1;
      eq
   }

   #[test]
   fn spook_parameters() {
      let bodies = two_bodies();
      let mut eq = between(&bodies, EquationKind::Generic);
      eq.set_stiffness(1e6);
      eq.set_relaxation(4.0);
      eq.set_time_step(0.1);
      eq.update();
      assert_relative_eq!(eq.a, 4.0 / (0.1 * 17.0));
      assert_relative_eq!(eq.b, 16.0 / 17.0);
      assert_relative_eq!(eq.epsilon, 4.0 / (0.01 * 1e6 * 17.0));
      assert!(!eq.needs_update);
   }

   #[test]
   fn effective_mass() {
      let bodies = two_bodies();
      let mut eq = between(&bodies, EquationKind::Generic);
      eq.g = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
      assert_relative_eq!(eq.compute_gimgt(&bodies), 1.0 + 0.5);
      assert_relative_eq!(eq.compute_inv_c(0.0, &bodies), 1.0 / 1.5);
      // separation along x
      assert_relative_eq!(eq.compute_gq(&bodies), 1.0);
   }

   #[test]
   fn max_bias_clamps_position_error() {
      let bodies = two_bodies();
      let mut eq = between(&bodies, EquationKind::Generic);
      eq.g = [-1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
      eq.max_bias = 0.25;
      assert_relative_eq!(eq.compute_b(2.0, 0.5, 0.1, &bodies), -0.5);
   }

   #[test]
   fn wlambda_respects_mass_multiplier() {
      let mut bodies = two_bodies();
      bodies[0].set_fixed_axes(true, false);
      let mut eq = between(&bodies, EquationKind::Generic);
      eq.g = [-1.0, -1.0, 0.0, 1.0, 1.0, 0.0];
      eq.add_to_wlambda(1.0, &mut bodies);
      assert_eq!(bodies[0].vlambda, Vec2::new(0.0, -1.0));
      assert_eq!(bodies[1].vlambda, Vec2::new(0.5, 0.5));
   }
}
