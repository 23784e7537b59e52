//! Narrowphase: exact contact geometry between shape pairs, turned into contact and
//! friction equations.
//!
//! Geometry lives in the submodules as pure functions over world-space inputs that return
//! [`ContactPoint`]s. [`contact_manifold`] matches on the two shape kinds and orients the
//! result, and [`Narrowphase`] wraps it with equation creation, pooling and first-impact
//! tracking.

pub mod capsule;
pub mod circle;
pub mod convex;
pub mod heightfield;

use crate::{
   body::{Body, BodyHandle},
   equation::{ContactData, Equation, EquationKind, FrictionData},
   math,
   pool::Pool,
   shape::{Shape, ShapeId, ShapeKind, ShapeType},
   Fp, Vec2,
};
use capsule::WorldCapsule;
use convex::WorldPolygon;
use fnv::FnvHashSet;
use heightfield::PlacedHeightfield;
use smallvec::{smallvec, SmallVec};
use tracing::warn;

/// One contact between two shapes, in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
   /// Unit normal pointing out of the first shape, into the second.
   pub normal: Vec2,
   /// Deepest point of the first shape.
   pub point_a: Vec2,
   /// Deepest point of the second shape.
   pub point_b: Vec2,
}

impl ContactPoint {
   /// Signed gap along the normal, negative while the shapes overlap.
   #[inline]
   pub fn separation(&self) -> Fp {
      self.normal.dot(self.point_b - self.point_a)
   }

   /// The same contact seen from the other shape.
   #[inline]
   pub fn flipped(self) -> ContactPoint {
      ContactPoint { normal: -self.normal, point_a: self.point_b, point_b: self.point_a }
   }
}

pub type Manifold = SmallVec<[ContactPoint; 4]>;

/// A shape at its world transform.
#[derive(Debug, Clone, Copy)]
pub struct Placed<'a> {
   pub shape: &'a Shape,
   pub position: Vec2,
   pub angle: Fp,
}

impl<'a> Placed<'a> {
   pub fn on_body(body: &Body, shape: &'a Shape) -> Placed<'a> {
      let (position, angle) = body.shape_world_transform(shape);
      Placed { shape, position, angle }
   }

   fn capsule(&self, length: Fp, radius: Fp) -> WorldCapsule {
      WorldCapsule { position: self.position, angle: self.angle, length, radius }
   }
}

/// Contacts between two placed shapes, normals pointing from `a` to `b`.
///
/// Returns `None` for shape pairs without contact generation: particle-particle,
/// particle-line, plane-plane, plane-heightfield, line-heightfield,
/// heightfield-heightfield, and line against convex, box, line or capsule.
pub fn contact_manifold(a: &Placed, b: &Placed) -> Option<Manifold> {
   if a.shape.shape_type() <= b.shape.shape_type() {
      dispatch(a, b)
   } else {
      dispatch(b, a).map(|m| m.into_iter().map(ContactPoint::flipped).collect())
   }
}

fn one(contact: Option<ContactPoint>) -> Manifold {
   contact.into_iter().collect()
}

fn flip_all(manifold: Manifold) -> Manifold {
   manifold.into_iter().map(ContactPoint::flipped).collect()
}

/// Expects `a` to have the lower shape type.
fn dispatch(a: &Placed, b: &Placed) -> Option<Manifold> {
   use ShapeKind::*;

   let manifold = match (a.shape.kind(), b.shape.kind()) {
      (Circle { radius: ra }, Circle { radius: rb }) => one(circle::circle_circle(a.position, *ra, b.position, *rb)),
      (Circle { radius }, Particle) => one(circle::circle_circle(a.position, *radius, b.position, 0.0)),
      (Circle { radius }, Plane) => one(circle::circle_plane(a.position, *radius, b.position, b.angle)),
      (Circle { radius }, Convex(poly) | Box { polygon: poly, .. }) => {
         one(convex::circle_polygon(a.position, *radius, &WorldPolygon::new(poly, b.position, b.angle)))
      }
      (Circle { radius }, Line { length }) => {
         let (s0, s1) = circle::segment_ends(*length, b.position, b.angle);
         one(circle::circle_segment(a.position, *radius, s0, s1, 0.0))
      }
      (Circle { radius: r }, Capsule { length, radius }) => {
         one(capsule::circle_capsule(a.position, *r, &b.capsule(*length, *radius)))
      }
      (Circle { radius }, Heightfield(hf)) => {
         heightfield::circle_heightfield(a.position, *radius, &placed_field(hf, b))
      }

      (Particle, Plane) => one(circle::circle_plane(a.position, 0.0, b.position, b.angle)),
      (Particle, Convex(poly) | Box { polygon: poly, .. }) => {
         one(convex::circle_polygon(a.position, 0.0, &WorldPolygon::new(poly, b.position, b.angle)))
      }
      (Particle, Capsule { length, radius }) => {
         one(capsule::circle_capsule(a.position, 0.0, &b.capsule(*length, *radius)))
      }
      (Particle, Heightfield(hf)) => heightfield::circle_heightfield(a.position, 0.0, &placed_field(hf, b)),

      (Plane, Convex(poly) | Box { polygon: poly, .. }) => {
         let vertices = WorldPolygon::new(poly, b.position, b.angle).vertices;
         convex::plane_points(a.position, a.angle, &vertices, 0.0)
      }
      (Plane, Line { length }) => {
         let (s0, s1) = circle::segment_ends(*length, b.position, b.angle);
         convex::plane_points(a.position, a.angle, &[s0, s1], 0.0)
      }
      (Plane, Capsule { length, radius }) => capsule::plane_capsule(a.position, a.angle, &b.capsule(*length, *radius)),

      (Convex(pa) | Box { polygon: pa, .. }, Convex(pb) | Box { polygon: pb, .. }) => convex::polygon_polygon(
         &WorldPolygon::new(pa, a.position, a.angle),
         &WorldPolygon::new(pb, b.position, b.angle),
      ),
      (Convex(poly) | Box { polygon: poly, .. }, Capsule { length, radius }) => flip_all(capsule::capsule_polygon(
         &b.capsule(*length, *radius),
         &WorldPolygon::new(poly, a.position, a.angle),
      )),
      (Convex(poly) | Box { polygon: poly, .. }, Heightfield(hf)) => {
         heightfield::polygon_heightfield(poly, a.position, a.angle, &placed_field(hf, b))
      }

      (Capsule { length: la, radius: ra }, Capsule { length: lb, radius: rb }) => {
         capsule::capsule_capsule(&a.capsule(*la, *ra), &b.capsule(*lb, *rb))
      }
      (Capsule { length, radius }, Heightfield(hf)) => {
         heightfield::capsule_heightfield(&a.capsule(*length, *radius), &placed_field(hf, b))
      }

      _ => return None,
   };
   Some(manifold)
}

fn placed_field<'a>(heightfield: &'a crate::shape::Heightfield, placed: &Placed) -> PlacedHeightfield<'a> {
   PlacedHeightfield { heightfield, position: placed.position, angle: placed.angle }
}

/// Whether any shape of `a` touches any shape of `b`.
pub fn bodies_overlap(a: &Body, b: &Body, check_collision_masks: bool) -> bool {
   a.shapes().iter().any(|sa| {
      b.shapes().iter().any(|sb| {
         if check_collision_masks && !sa.collides_with(sb) {
            return false;
         }
         contact_manifold(&Placed::on_body(a, sa), &Placed::on_body(b, sb)).map_or(false, |m| !m.is_empty())
      })
   })
}

/// A shape on a body, with the body's slot in world storage.
#[derive(Debug, Clone, Copy)]
pub struct Side<'a> {
   pub body: &'a Body,
   pub slot: usize,
   pub shape: &'a Shape,
}

/// Turns shape contacts into solver equations.
///
/// The public fields are per-pair settings, written by the world from the contact material
/// before each call to [`Narrowphase::collide`].
#[derive(Debug)]
pub struct Narrowphase {
   pub contact_equations: Vec<Equation>,
   pub friction_equations: Vec<Equation>,

   /// Produce friction equations alongside contacts.
   pub enable_friction: bool,
   /// One averaged friction equation per shape pair instead of one per contact.
   pub enable_friction_reduction: bool,
   /// Whether new equations take part in solving.
   pub enabled_equations: bool,
   pub friction_coefficient: Fp,
   pub slip_force: Fp,
   /// Tangential speed of the contact surface, handed to friction equations.
   pub surface_velocity: Fp,
   pub restitution: Fp,
   pub stiffness: Fp,
   pub relaxation: Fp,
   pub friction_stiffness: Fp,
   pub friction_relaxation: Fp,
   /// Overlap that contacts settle at.
   pub contact_skin_size: Fp,

   contact_pool: Pool<Equation>,
   friction_pool: Pool<Equation>,
   collided_last_step: FnvHashSet<(BodyHandle, BodyHandle)>,
   unsupported: FnvHashSet<(ShapeType, ShapeType)>,
}

fn blank_contact() -> Equation {
   let data = ContactData::new(ShapeId::NONE, ShapeId::NONE);
   Equation::new(BodyHandle(0), BodyHandle(0), 0.0, Fp::MAX, EquationKind::Contact(data))
}

fn blank_friction() -> Equation {
   let data = FrictionData::new(ShapeId::NONE, ShapeId::NONE);
   Equation::new(BodyHandle(0), BodyHandle(0), 0.0, 0.0, EquationKind::Friction(data))
}

fn reset_equation(eq: &mut Equation) {
   eq.lambda = 0.0;
   eq.multiplier = 0.0;
   eq.relative_velocity = 0.0;
   eq.offset = 0.0;
   eq.enabled = true;
}

impl Default for Narrowphase {
   fn default() -> Self {
      Narrowphase {
         contact_equations: Vec::new(),
         friction_equations: Vec::new(),
         enable_friction: true,
         enable_friction_reduction: true,
         enabled_equations: true,
         friction_coefficient: 0.3,
         slip_force: 10.0,
         surface_velocity: 0.0,
         restitution: 0.0,
         stiffness: crate::equation::DEFAULT_STIFFNESS,
         relaxation: crate::equation::DEFAULT_RELAXATION,
         friction_stiffness: crate::equation::DEFAULT_STIFFNESS,
         friction_relaxation: crate::equation::DEFAULT_RELAXATION,
         contact_skin_size: 0.01,
         contact_pool: Pool::new(blank_contact, reset_equation),
         friction_pool: Pool::new(blank_friction, reset_equation),
         collided_last_step: FnvHashSet::default(),
         unsupported: FnvHashSet::default(),
      }
   }
}

#[inline]
fn pair_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
   if a <= b { (a, b) } else { (b, a) }
}

impl Narrowphase {
   pub fn new() -> Narrowphase {
      Narrowphase::default()
   }

   /// Remembers which bodies touched and hands every equation back to the pools.
   pub fn reset(&mut self) {
      self.collided_last_step.clear();
      for eq in self.contact_equations.iter() {
         self.collided_last_step.insert(pair_key(eq.body_a, eq.body_b));
      }
      self.contact_pool.release_all(self.contact_equations.drain(..));
      self.friction_pool.release_all(self.friction_equations.drain(..));
   }

   /// Forgets contact history, e.g. after the world was cleared.
   pub fn clear(&mut self) {
      self.reset();
      self.collided_last_step.clear();
   }

   /// Whether the two bodies had a contact equation during the previous step.
   pub fn collided_last_step(&self, a: BodyHandle, b: BodyHandle) -> bool {
      self.collided_last_step.contains(&pair_key(a, b))
   }

   /// Generates contacts between two shapes and returns how many were found.
   ///
   /// With `just_test` nothing is created, which is what sensors and overlap queries use.
   pub fn collide(&mut self, a: Side, b: Side, just_test: bool) -> usize {
      let pa = Placed::on_body(a.body, a.shape);
      let pb = Placed::on_body(b.body, b.shape);
      let Some(manifold) = contact_manifold(&pa, &pb) else {
         self.warn_unsupported(a.shape.shape_type(), b.shape.shape_type());
         return 0;
      };
      if just_test || manifold.is_empty() {
         return manifold.len();
      }

      let first = self.contact_equations.len();
      for contact in manifold.iter() {
         let eq = self.create_contact(&a, &b, contact);
         self.contact_equations.push(eq);
         if self.enable_friction && !self.enable_friction_reduction {
            let index = self.contact_equations.len() - 1;
            let (point_a, point_b) = (contact.point_a - a.body.position, contact.point_b - b.body.position);
            let friction = self.friction_at(&a, &b, point_a, point_b, contact.normal, smallvec![index]);
            self.friction_equations.push(friction);
         }
      }
      if self.enable_friction && self.enable_friction_reduction {
         let friction = self.create_friction_from_average(&a, &b, first);
         self.friction_equations.push(friction);
      }
      manifold.len()
   }

   fn warn_unsupported(&mut self, a: ShapeType, b: ShapeType) {
      let key = if a <= b { (a, b) } else { (b, a) };
      if self.unsupported.insert(key) {
         warn!(shape_a = ?key.0, shape_b = ?key.1, "no contact generation for shape pair, it never collides");
      }
   }

   fn create_contact(&mut self, a: &Side, b: &Side, contact: &ContactPoint) -> Equation {
      let first_impact = !self.collided_last_step(a.body.handle(), b.body.handle());
      let mut eq = self.contact_pool.acquire();
      eq.body_a = a.body.handle();
      eq.body_b = b.body.handle();
      eq.index_a = a.slot;
      eq.index_b = b.slot;
      eq.min_force = 0.0;
      eq.max_force = Fp::MAX;
      eq.offset = self.contact_skin_size;
      eq.enabled = self.enabled_equations;
      eq.set_stiffness(self.stiffness);
      eq.set_relaxation(self.relaxation);
      eq.kind = EquationKind::Contact(ContactData {
         contact_point_a: contact.point_a - a.body.position,
         contact_point_b: contact.point_b - b.body.position,
         normal_a: contact.normal,
         restitution: self.restitution,
         first_impact,
         shape_a: a.shape.id(),
         shape_b: b.shape.id(),
      });
      eq
   }

   fn create_friction_from_average(&mut self, a: &Side, b: &Side, first: usize) -> Equation {
      let (mut point_a, mut point_b, mut normal) = (Vec2::ZERO, Vec2::ZERO, Vec2::ZERO);
      let mut contacts = SmallVec::new();
      for (i, eq) in self.contact_equations.iter().enumerate().skip(first) {
         if let Some(c) = eq.contact() {
            point_a += c.contact_point_a;
            point_b += c.contact_point_b;
            normal += c.normal_a;
            contacts.push(i);
         }
      }
      let n = contacts.len().max(1) as Fp;
      let normal = math::normalize_or(normal, Vec2::Y);
      self.friction_at(a, b, point_a / n, point_b / n, normal, contacts)
   }

   fn friction_at(
      &mut self,
      a: &Side,
      b: &Side,
      point_a: Vec2,
      point_b: Vec2,
      normal: Vec2,
      contacts: SmallVec<[usize; 4]>,
   ) -> Equation {
      let mut eq = self.friction_pool.acquire();
      eq.body_a = a.body.handle();
      eq.body_b = b.body.handle();
      eq.index_a = a.slot;
      eq.index_b = b.slot;
      eq.set_slip_force(self.slip_force);
      eq.relative_velocity = self.surface_velocity;
      eq.enabled = self.enabled_equations;
      eq.set_stiffness(self.friction_stiffness);
      eq.set_relaxation(self.friction_relaxation);
      eq.kind = EquationKind::Friction(FrictionData {
         contact_point_a: point_a,
         contact_point_b: point_b,
         t: math::rotate90cw(normal),
         contact_equations: contacts,
         shape_a: a.shape.id(),
         shape_b: b.shape.id(),
         friction_coefficient: self.friction_coefficient,
      });
      eq
   }
}
