use crate::{math, ray::Ray, Fp, Vec2};

/// Axis-aligned bounding box. `lower_bound <= upper_bound` component-wise.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
   pub lower_bound: Vec2,
   pub upper_bound: Vec2,
}

impl Default for Aabb {
   fn default() -> Self {
      Aabb { lower_bound: Vec2::ZERO, upper_bound: Vec2::ZERO }
   }
}

impl Aabb {
   #[inline]
   pub fn new(lower_bound: Vec2, upper_bound: Vec2) -> Aabb {
      debug_assert!(lower_bound.x <= upper_bound.x && lower_bound.y <= upper_bound.y);
      Aabb { lower_bound, upper_bound }
   }

   pub fn from_points(points: &[Vec2]) -> Aabb {
      let mut aabb = Aabb::default();
      aabb.set_from_points(points, Vec2::ZERO, 0.0, 0.0);
      aabb
   }

   pub fn set_from_points(&mut self, points: &[Vec2], position: Vec2, angle: Fp, skin_size: Fp) {
      //! Fits the box around `points` after transforming them by `position`/`angle`, padded by `skin_size`.
      let (mut l, mut u) = (Vec2::splat(Fp::MAX), Vec2::splat(Fp::MIN));
      for p in points.iter() {
         let p = math::to_global_frame(*p, position, angle);
         l = l.min(p);
         u = u.max(p);
      }
      if points.is_empty() {
         l = position;
         u = position;
      }
      self.lower_bound = l - Vec2::splat(skin_size);
      self.upper_bound = u + Vec2::splat(skin_size);
   }

   #[inline]
   pub fn copy(&mut self, other: &Aabb) {
      self.lower_bound = other.lower_bound;
      self.upper_bound = other.upper_bound;
   }

   #[inline]
   pub fn extend(&mut self, other: &Aabb) {
      //! Grows the box to also enclose `other`.
      self.lower_bound = self.lower_bound.min(other.lower_bound);
      self.upper_bound = self.upper_bound.max(other.upper_bound);
   }

   #[inline]
   pub fn translate(self, offset: Vec2) -> Aabb {
      Aabb {
         lower_bound: self.lower_bound + offset,
         upper_bound: self.upper_bound + offset,
      }
   }

   #[inline]
   pub fn overlaps(&self, other: &Aabb) -> bool {
      //! Touching boxes count as overlapping. Symmetric in its arguments.
      self.lower_bound.x <= other.upper_bound.x
         && other.lower_bound.x <= self.upper_bound.x
         && self.lower_bound.y <= other.upper_bound.y
         && other.lower_bound.y <= self.upper_bound.y
   }

   #[inline]
   pub fn contains_point(&self, point: Vec2) -> bool {
      point.x >= self.lower_bound.x
         && point.x <= self.upper_bound.x
         && point.y >= self.lower_bound.y
         && point.y <= self.upper_bound.y
   }

   pub fn overlaps_ray(&self, ray: &Ray) -> Option<Fp> {
      //! Returns the fraction along `ray` at which it enters the box, if it does at all.
      // slab test
      let dir_frac = Vec2::ONE / (ray.to - ray.from);
      let t1 = (self.lower_bound.x - ray.from.x) * dir_frac.x;
      let t2 = (self.upper_bound.x - ray.from.x) * dir_frac.x;
      let t3 = (self.lower_bound.y - ray.from.y) * dir_frac.y;
      let t4 = (self.upper_bound.y - ray.from.y) * dir_frac.y;

      let tmin = nan_max(nan_min(t1, t2), nan_min(t3, t4));
      let tmax = nan_min(nan_max(t1, t2), nan_max(t3, t4));

      if tmax < 0.0 || tmin > tmax {
         None
      } else {
         Some(tmin)
      }
   }
}

// 0 * inf produces NaN for rays lying on a slab boundary, treat those as unbounded.
#[inline]
fn nan_min(a: Fp, b: Fp) -> Fp {
   if a.is_nan() { b } else if b.is_nan() { a } else { a.min(b) }
}
#[inline]
fn nan_max(a: Fp, b: Fp) -> Fp {
   if a.is_nan() { b } else if b.is_nan() { a } else { a.max(b) }
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   #[test]
   fn overlap_is_symmetric() {
      let boxes = [
         Aabb::new(Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0)),
         Aabb::new(Vec2::new(1.0, 1.0), Vec2::new(2.0, 2.0)),
         Aabb::new(Vec2::new(0.5, -3.0), Vec2::new(0.6, 3.0)),
         Aabb::new(Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0)),
         Aabb::new(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0)),
      ];
      for a in boxes.iter() {
         for b in boxes.iter() {
            assert_eq!(a.overlaps(b), b.overlaps(a));
         }
      }
      assert!(boxes[0].overlaps(&boxes[1])); // touching
      assert!(!boxes[1].overlaps(&boxes[2]));
   }

   #[test]
   fn set_from_points() {
      let mut aabb = Aabb::default();
      aabb.set_from_points(&[Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)], Vec2::new(0.0, 2.0), crate::FRAC_PI_2, 0.0);
      assert_relative_eq!(aabb.lower_bound, Vec2::new(0.0, 1.0), epsilon = 1e-6);
      assert_relative_eq!(aabb.upper_bound, Vec2::new(0.0, 3.0), epsilon = 1e-6);
   }

   #[test]
   fn extend_and_copy() {
      let mut a = Aabb::new(Vec2::ZERO, Vec2::ONE);
      a.extend(&Aabb::new(Vec2::new(-1.0, 0.5), Vec2::new(0.5, 4.0)));
      assert_eq!(a, Aabb::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 4.0)));
      let mut b = Aabb::default();
      b.copy(&a);
      assert_eq!(a, b);
   }

   #[test]
   fn ray_overlap() {
      let aabb = Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0));
      let ray = Ray::new(Vec2::new(-2.0, 0.0), Vec2::new(0.0, 0.0));
      assert_relative_eq!(aabb.overlaps_ray(&ray).unwrap(), 0.5, epsilon = 1e-9);

      let miss = Ray::new(Vec2::new(-2.0, 3.0), Vec2::new(2.0, 3.0));
      assert!(aabb.overlaps_ray(&miss).is_none());
   }
}
