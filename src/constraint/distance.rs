use super::{Constraint, ConstraintKind};
use crate::{
   body::Body,
   equation::{Equation, EquationKind},
   math, Fp, Vec2,
};

const DISTANCE: usize = 0;

/// Keeps two body-local anchors at a fixed distance, or within `[lower_limit, upper_limit]`
/// when a limit is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceConstraint {
   pub local_anchor_a: Vec2,
   pub local_anchor_b: Vec2,
   pub distance: Fp,
   pub upper_limit_enabled: bool,
   pub upper_limit: Fp,
   pub lower_limit_enabled: bool,
   pub lower_limit: Fp,
   max_force: Fp,
   position: Fp,
}

impl DistanceConstraint {
   /// Current anchor separation, as of the last update.
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

   pub(super) fn set_max_force(&mut self, equations: &mut [Equation], force: Fp) {
      self.max_force = force;
      equations[DISTANCE].set_max_force(force);
   }

   pub(super) fn update(&mut self, equations: &mut [Equation], bi: &Body, bj: &Body) {
      let ri = math::rotate(self.local_anchor_a, bi.angle);
      let rj = math::rotate(self.local_anchor_b, bj.angle);
      let r = bj.position + rj - bi.position - ri;
      let length = r.length();
      self.position = length;

      let eq = &mut equations[DISTANCE];
      let target = if self.upper_limit_enabled || self.lower_limit_enabled {
         if self.upper_limit_enabled && length > self.upper_limit {
            eq.min_force = -self.max_force;
            eq.max_force = 0.0;
            self.upper_limit
         } else if self.lower_limit_enabled && length < self.lower_limit {
            eq.min_force = 0.0;
            eq.max_force = self.max_force;
            self.lower_limit
         } else {
            eq.enabled = false;
            return;
         }
      } else {
         eq.min_force = -self.max_force;
         eq.max_force = self.max_force;
         self.distance
      };
      eq.enabled = true;

      if let EquationKind::DistanceAnchor { distance, local_anchor_a, local_anchor_b } = &mut eq.kind {
         *distance = target;
         *local_anchor_a = self.local_anchor_a;
         *local_anchor_b = self.local_anchor_b;
      }

      let n = math::normalize_or(r, Vec2::X);
      let rixn = math::cross(ri, n);
      let rjxn = math::cross(rj, n);
      eq.g = [-n.x, -n.y, -rixn, n.x, n.y, rjxn];
   }
}

impl Constraint {
   /// Distance constraint between world anchors `anchor_a` on `a` and `anchor_b` on `b`.
   ///
   /// The held distance is the anchors' current separation unless `distance` is given.
   pub fn distance(a: &Body, b: &Body, anchor_a: Vec2, anchor_b: Vec2, distance: Option<Fp>) -> Constraint {
      let local_anchor_a = a.to_local_frame(anchor_a);
      let local_anchor_b = b.to_local_frame(anchor_b);
      let distance = distance.unwrap_or_else(|| anchor_b.distance(anchor_a));

      let eq = Equation::new(
         a.handle(),
         b.handle(),
         -Fp::MAX,
         Fp::MAX,
         EquationKind::DistanceAnchor { local_anchor_a, local_anchor_b, distance },
      );
      let kind = DistanceConstraint {
         local_anchor_a,
         local_anchor_b,
         distance,
         upper_limit_enabled: false,
         upper_limit: 1.0,
         lower_limit_enabled: false,
         lower_limit: 0.0,
         max_force: Fp::MAX,
         position: distance,
      };
      Constraint::from_parts(a.handle(), b.handle(), vec![eq], ConstraintKind::Distance(kind))
   }

   /// Distance constraint between the two body origins.
   pub fn distance_between_centers(a: &Body, b: &Body) -> Constraint {
      Constraint::distance(a, b, a.position, b.position, None)
   }
}
