//! Collision shapes: geometry, mass distribution, bounds and point queries.

mod convex;
mod heightfield;
mod raycast;

pub use convex::ConvexPolygon;
pub use heightfield::Heightfield;

use crate::{aabb::Aabb, body::BodyHandle, error::PhysicsResult, material::MaterialId, math, Fp, Vec2, PI};
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique shape identity, issued at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeId(pub u32);

static NEXT_SHAPE_ID: AtomicU32 = AtomicU32::new(1);

impl ShapeId {
   /// Placeholder for contact rows that do not come from a shape pair, such as joint limits.
   pub const NONE: ShapeId = ShapeId(0);

   fn next() -> ShapeId {
      ShapeId(NEXT_SHAPE_ID.fetch_add(1, Ordering::Relaxed))
   }
}

/// Shape tags. Values are distinct powers of two and their order decides
/// which shape plays the `a` role in the narrowphase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ShapeType {
   Circle = 1,
   Particle = 2,
   Plane = 4,
   Convex = 8,
   Line = 16,
   Box = 32,
   Capsule = 64,
   Heightfield = 128,
}

/// Shape geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
   Circle { radius: Fp },
   /// A zero-extent point.
   Particle,
   /// The half-space below local y = 0, normal along local +y.
   Plane,
   Convex(ConvexPolygon),
   /// A segment of `length` centered on the origin along local x.
   Line { length: Fp },
   /// A `width` x `height` rectangle with a matching convex representation.
   Box { width: Fp, height: Fp, polygon: ConvexPolygon },
   /// Two circles of `radius` centered at `(±length/2, 0)` joined by a rectangle.
   Capsule { length: Fp, radius: Fp },
   Heightfield(Heightfield),
}

impl ShapeKind {
   pub fn shape_type(&self) -> ShapeType {
      match self {
         ShapeKind::Circle { .. } => ShapeType::Circle,
         ShapeKind::Particle => ShapeType::Particle,
         ShapeKind::Plane => ShapeType::Plane,
         ShapeKind::Convex(_) => ShapeType::Convex,
         ShapeKind::Line { .. } => ShapeType::Line,
         ShapeKind::Box { .. } => ShapeType::Box,
         ShapeKind::Capsule { .. } => ShapeType::Capsule,
         ShapeKind::Heightfield(_) => ShapeType::Heightfield,
      }
   }
}

/// A shape, positioned relative to the body that owns it.
#[derive(Debug)]
pub struct Shape {
   id: ShapeId,
   kind: ShapeKind,
   bounding_radius: Fp,
   area: Fp,
   pub(crate) body: Option<BodyHandle>,

   /// Offset from the owning body's origin, in body space.
   pub position: Vec2,
   pub angle: Fp,
   pub collision_group: u32,
   pub collision_mask: u32,
   /// Whether contacts involving this shape produce solver equations.
   pub collision_response: bool,
   /// Sensors report overlaps but never generate contact forces.
   pub sensor: bool,
   pub material: Option<MaterialId>,
}

impl Shape {
   pub fn new(kind: ShapeKind) -> Shape {
      let mut shape = Shape {
         id: ShapeId::next(),
         kind,
         bounding_radius: 0.0,
         area: 0.0,
         body: None,
         position: Vec2::ZERO,
         angle: 0.0,
         collision_group: 1,
         collision_mask: 1,
         collision_response: true,
         sensor: false,
         material: None,
      };
      shape.update_bounding_radius();
      shape.update_area();
      shape
   }

   pub fn circle(radius: Fp) -> Shape {
      Shape::new(ShapeKind::Circle { radius })
   }
   pub fn particle() -> Shape {
      Shape::new(ShapeKind::Particle)
   }
   pub fn plane() -> Shape {
      Shape::new(ShapeKind::Plane)
   }
   pub fn line(length: Fp) -> Shape {
      Shape::new(ShapeKind::Line { length })
   }
   pub fn capsule(length: Fp, radius: Fp) -> Shape {
      Shape::new(ShapeKind::Capsule { length, radius })
   }
   pub fn rectangle(width: Fp, height: Fp) -> Shape {
      Shape::new(ShapeKind::Box { width, height, polygon: ConvexPolygon::rectangle(width, height) })
   }
   /// Fails if `vertices` are wound clockwise or are fewer than three.
   pub fn convex(vertices: Vec<Vec2>) -> PhysicsResult<Shape> {
      Ok(Shape::new(ShapeKind::Convex(ConvexPolygon::new(vertices)?)))
   }
   pub fn heightfield(heights: Vec<Fp>, element_width: Fp) -> PhysicsResult<Shape> {
      Ok(Shape::new(ShapeKind::Heightfield(Heightfield::new(heights, element_width)?)))
   }

   pub fn with_position(mut self, position: Vec2) -> Shape {
      self.position = position;
      self
   }
   pub fn with_angle(mut self, angle: Fp) -> Shape {
      self.angle = angle;
      self
   }
   pub fn with_collision(mut self, group: u32, mask: u32) -> Shape {
      self.collision_group = group;
      self.collision_mask = mask;
      self
   }
   pub fn with_material(mut self, material: MaterialId) -> Shape {
      self.material = Some(material);
      self
   }
   pub fn as_sensor(mut self) -> Shape {
      self.sensor = true;
      self
   }

   #[inline]
   pub fn id(&self) -> ShapeId {
      self.id
   }
   #[inline]
   pub fn kind(&self) -> &ShapeKind {
      &self.kind
   }
   #[inline]
   pub fn shape_type(&self) -> ShapeType {
      self.kind.shape_type()
   }
   #[inline]
   pub fn body(&self) -> Option<BodyHandle> {
      self.body
   }
   #[inline]
   pub fn bounding_radius(&self) -> Fp {
      self.bounding_radius
   }
   #[inline]
   pub fn area(&self) -> Fp {
      self.area
   }

   /// Replaces the geometry, refreshing derived values. The owning body must
   /// recompute its mass properties afterwards.
   pub fn set_kind(&mut self, kind: ShapeKind) {
      self.kind = kind;
      self.update_bounding_radius();
      self.update_area();
   }

   /// The convex representation of `Convex` and `Box` shapes.
   pub fn polygon(&self) -> Option<&ConvexPolygon> {
      match &self.kind {
         ShapeKind::Convex(poly) | ShapeKind::Box { polygon: poly, .. } => Some(poly),
         _ => None,
      }
   }

   pub fn collides_with(&self, other: &Shape) -> bool {
      //! Collision group/mask filter, symmetric.
      self.collision_group & other.collision_mask != 0 && other.collision_group & self.collision_mask != 0
   }

   pub fn update_bounding_radius(&mut self) {
      self.bounding_radius = match &self.kind {
         ShapeKind::Circle { radius } => *radius,
         ShapeKind::Particle => 0.0,
         ShapeKind::Plane | ShapeKind::Heightfield(_) => Fp::INFINITY,
         ShapeKind::Convex(poly) => poly.bounding_radius(),
         ShapeKind::Line { length } => length * 0.5,
         ShapeKind::Box { width, height, .. } => (width * width + height * height).sqrt() * 0.5,
         ShapeKind::Capsule { length, radius } => radius + length * 0.5,
      };
   }

   pub fn update_area(&mut self) {
      self.area = match &self.kind {
         ShapeKind::Circle { radius } => PI * radius * radius,
         ShapeKind::Particle | ShapeKind::Line { .. } => 0.0,
         ShapeKind::Plane => Fp::INFINITY,
         ShapeKind::Convex(poly) => poly.area(),
         ShapeKind::Box { width, height, .. } => width * height,
         ShapeKind::Capsule { length, radius } => PI * radius * radius + 2.0 * radius * length,
         ShapeKind::Heightfield(hf) => hf.area(),
      };
   }

   pub fn compute_moment_of_inertia(&self) -> Fp {
      //! Moment of inertia about the shape's own origin for unit mass.
      match &self.kind {
         ShapeKind::Circle { radius } => radius * radius * 0.5,
         ShapeKind::Particle | ShapeKind::Plane => 0.0,
         ShapeKind::Convex(poly) => poly.moment_of_inertia(),
         ShapeKind::Line { length } => length * length / 12.0,
         ShapeKind::Box { width, height, .. } => (width * width + height * height) / 12.0,
         ShapeKind::Capsule { length, radius } => capsule_inertia(*length, *radius),
         ShapeKind::Heightfield(_) => Fp::INFINITY,
      }
   }

   pub fn compute_aabb(&self, out: &mut Aabb, position: Vec2, angle: Fp) {
      //! Fits `out` around the shape placed at world `position` and `angle`.
      match &self.kind {
         ShapeKind::Circle { radius } => {
            out.lower_bound = position - Vec2::splat(*radius);
            out.upper_bound = position + Vec2::splat(*radius);
         }
         ShapeKind::Particle => {
            out.lower_bound = position;
            out.upper_bound = position;
         }
         ShapeKind::Plane => plane_aabb(out, position, angle),
         ShapeKind::Convex(poly) => poly.compute_aabb(out, position, angle),
         ShapeKind::Line { length } => {
            let h = Vec2::new(length * 0.5, 0.0);
            out.set_from_points(&[-h, h], position, angle, 0.0);
         }
         ShapeKind::Box { width, height, .. } => {
            let (s, c) = angle.sin_cos();
            let (s, c) = (s.abs(), c.abs());
            let extents = Vec2::new(width * c + height * s, width * s + height * c) * 0.5;
            out.lower_bound = position - extents;
            out.upper_bound = position + extents;
         }
         ShapeKind::Capsule { length, radius } => {
            let h = Vec2::new(length * 0.5, 0.0);
            out.set_from_points(&[-h, h], position, angle, *radius);
         }
         ShapeKind::Heightfield(hf) => hf.compute_aabb(out, position, angle),
      }
   }

   pub fn point_test(&self, local_point: Vec2) -> bool {
      //! Whether `local_point`, in shape space, lies inside the shape. Zero-extent shapes never contain points.
      match &self.kind {
         ShapeKind::Circle { radius } => local_point.length_squared() <= radius * radius,
         ShapeKind::Particle | ShapeKind::Line { .. } => false,
         ShapeKind::Plane => local_point.y <= 0.0,
         ShapeKind::Convex(poly) | ShapeKind::Box { polygon: poly, .. } => poly.point_test(local_point),
         ShapeKind::Capsule { length, radius } => {
            let x = local_point.x.clamp(-length * 0.5, length * 0.5);
            (local_point - Vec2::new(x, 0.0)).length_squared() <= radius * radius
         }
         ShapeKind::Heightfield(hf) => hf.point_test(local_point),
      }
   }
}

fn capsule_inertia(length: Fp, radius: Fp) -> Fp {
   let area = PI * radius * radius + 2.0 * radius * length;
   if area <= 0.0 {
      return 0.0;
   }
   let density = 1.0 / area;

   let box_mass = length * 2.0 * radius * density;
   let box_inertia = box_mass * (length * length + 4.0 * radius * radius) / 12.0;

   // half disk: inertia about its flat-edge center, moved to its centroid, then to the capsule center
   let semi_mass = PI * radius * radius * 0.5 * density;
   let semi_centroid = 4.0 * radius / (3.0 * PI);
   let offset = length * 0.5 + semi_centroid;
   let semi_inertia = semi_mass * (radius * radius * 0.5 - semi_centroid * semi_centroid + offset * offset);

   box_inertia + 2.0 * semi_inertia
}

fn plane_aabb(out: &mut Aabb, position: Vec2, angle: Fp) {
   const MAX: Fp = 1e7;
   out.lower_bound = Vec2::splat(-MAX);
   out.upper_bound = Vec2::splat(MAX);

   let normal = math::rotate(Vec2::Y, angle);
   if math::scalars_equal(normal.x, 0.0, math::EPSILON) {
      if normal.y > 0.0 {
         out.upper_bound.y = position.y;
      } else {
         out.lower_bound.y = position.y;
      }
   } else if math::scalars_equal(normal.y, 0.0, math::EPSILON) {
      if normal.x > 0.0 {
         out.upper_bound.x = position.x;
      } else {
         out.lower_bound.x = position.x;
      }
   }
}
