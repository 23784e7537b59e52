use crate::{aabb::Aabb, error::{PhysicsError, PhysicsResult}, math, polygon, Fp, Vec2};

/// A convex polygon, vertices wound counter-clockwise, with unit-length outward edge normals.
///
/// `normals[i]` belongs to the edge `vertices[i] -> vertices[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon {
   vertices: Vec<Vec2>,
   normals: Vec<Vec2>,
   triangles: Vec<[usize; 3]>,
   center_of_mass: Vec2,
   area: Fp,
   bounding_radius: Fp,
}

impl ConvexPolygon {
   /// Fails on clockwise winding or fewer than three vertices. Winding is never corrected silently.
   pub fn new(vertices: Vec<Vec2>) -> PhysicsResult<ConvexPolygon> {
      if vertices.len() < 3 {
         return Err(PhysicsError::TooFewVertices { count: vertices.len() });
      }
      let area = polygon::signed_area(&vertices);
      if area < 0.0 {
         return Err(PhysicsError::ClockwiseWinding { area });
      }
      Ok(ConvexPolygon::new_from_wound(vertices))
   }

   pub fn rectangle(width: Fp, height: Fp) -> ConvexPolygon {
      //! An origin-centered `width` x `height` rectangle.
      let (hw, hh) = (width * 0.5, height * 0.5);
      ConvexPolygon::new_from_wound(vec![
         Vec2::new(-hw, -hh),
         Vec2::new(hw, -hh),
         Vec2::new(hw, hh),
         Vec2::new(-hw, hh),
      ])
   }

   pub(crate) fn new_from_wound(vertices: Vec<Vec2>) -> ConvexPolygon {
      let mut poly = ConvexPolygon {
         vertices,
         normals: Vec::new(),
         triangles: Vec::new(),
         center_of_mass: Vec2::ZERO,
         area: 0.0,
         bounding_radius: 0.0,
      };
      poly.update();
      poly
   }

   pub fn set_vertices(&mut self, vertices: Vec<Vec2>) -> PhysicsResult<()> {
      *self = ConvexPolygon::new(vertices)?;
      Ok(())
   }

   pub(crate) fn translate(&mut self, offset: Vec2) {
      for v in self.vertices.iter_mut() {
         *v += offset;
      }
      self.update();
   }

   fn update(&mut self) {
      let n = self.vertices.len();
      self.normals.clear();
      for i in 0..n {
         let edge = self.vertices[(i + 1) % n] - self.vertices[i];
         self.normals.push(math::normalize_or(math::rotate90cw(edge), Vec2::ZERO));
      }

      self.triangles = polygon::triangulate(&self.vertices);

      let mut area = 0.0;
      let mut weighted = Vec2::ZERO;
      for t in self.triangles.iter() {
         let (a, b, c) = (self.vertices[t[0]], self.vertices[t[1]], self.vertices[t[2]]);
         let ta = polygon::triangle_area(a, b, c) * 0.5;
         weighted += math::centroid(a, b, c) * ta;
         area += ta;
      }
      self.area = area;
      self.center_of_mass = if area > 0.0 { weighted / area } else { Vec2::ZERO };

      self.bounding_radius = self.vertices.iter().map(|v| v.length_squared()).fold(0.0, Fp::max).sqrt();
   }

   #[inline]
   pub fn vertices(&self) -> &[Vec2] {
      &self.vertices
   }
   #[inline]
   pub fn normals(&self) -> &[Vec2] {
      &self.normals
   }
   #[inline]
   pub fn triangles(&self) -> &[[usize; 3]] {
      &self.triangles
   }
   #[inline]
   pub fn center_of_mass(&self) -> Vec2 {
      self.center_of_mass
   }
   #[inline]
   pub fn area(&self) -> Fp {
      self.area
   }
   #[inline]
   pub fn bounding_radius(&self) -> Fp {
      self.bounding_radius
   }

   pub fn moment_of_inertia(&self) -> Fp {
      //! Unit-mass moment of inertia about the local origin.
      let n = self.vertices.len();
      let (mut numer, mut denom) = (0.0, 0.0);
      let mut j = n - 1;
      for i in 0..n {
         let (p0, p1) = (self.vertices[j], self.vertices[i]);
         let a = math::cross(p0, p1).abs();
         let b = p1.dot(p1) + p1.dot(p0) + p0.dot(p0);
         numer += a * b;
         denom += a;
         j = i;
      }
      if denom > 0.0 { numer / (6.0 * denom) } else { 0.0 }
   }

   #[inline]
   pub fn compute_aabb(&self, out: &mut Aabb, position: Vec2, angle: Fp) {
      out.set_from_points(&self.vertices, position, angle, 0.0);
   }

   pub fn point_test(&self, local_point: Vec2) -> bool {
      //! Whether `local_point` lies inside or on the polygon.
      (0..self.vertices.len()).all(|i| self.normals[i].dot(local_point - self.vertices[i]) <= 0.0)
   }

   pub fn project_onto_axis(&self, local_axis: Vec2) -> (Fp, Fp) {
      //! Minimum and maximum of the vertices projected onto `local_axis`.
      self.vertices.iter().fold((Fp::MAX, Fp::MIN), |(lo, hi), v| {
         let d = v.dot(local_axis);
         (lo.min(d), hi.max(d))
      })
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   #[test]
   fn ccw_required() {
      let ccw = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
      let poly = ConvexPolygon::new(ccw.clone()).unwrap();
      assert!(poly.area() > 0.0);

      let mut cw = ccw;
      cw.reverse();
      assert!(matches!(ConvexPolygon::new(cw), Err(PhysicsError::ClockwiseWinding { .. })));
      assert!(matches!(ConvexPolygon::new(vec![Vec2::ZERO, Vec2::X]), Err(PhysicsError::TooFewVertices { count: 2 })));
   }

   #[test]
   fn rectangle_properties() {
      let rect = ConvexPolygon::rectangle(2.0, 1.0);
      assert_relative_eq!(rect.area(), 2.0);
      assert_relative_eq!(rect.center_of_mass(), Vec2::ZERO, epsilon = 1e-12);
      assert_relative_eq!(rect.normals()[0], Vec2::new(0.0, -1.0));
      assert_relative_eq!(rect.normals()[1], Vec2::new(1.0, 0.0));
      assert_relative_eq!(rect.moment_of_inertia(), (4.0 + 1.0) / 12.0, epsilon = 1e-9);
      assert!(rect.point_test(Vec2::new(0.9, 0.4)));
      assert!(!rect.point_test(Vec2::new(1.1, 0.0)));
   }

   #[test]
   fn centroid_of_offset_triangle() {
      let tri = ConvexPolygon::new(vec![Vec2::new(1.0, 1.0), Vec2::new(4.0, 1.0), Vec2::new(1.0, 4.0)]).unwrap();
      assert_relative_eq!(tri.center_of_mass(), Vec2::new(2.0, 2.0), epsilon = 1e-9);
      assert_relative_eq!(tri.area(), 4.5, epsilon = 1e-9);
   }
}
