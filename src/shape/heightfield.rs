use crate::{aabb::Aabb, error::{PhysicsError, PhysicsResult}, Fp, Vec2};

/// Terrain described by height samples spaced `element_width` apart, starting at local x = 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
   heights: Vec<Fp>,
   element_width: Fp,
   max_value: Fp,
   min_value: Fp,
}

impl Heightfield {
   pub fn new(heights: Vec<Fp>, element_width: Fp) -> PhysicsResult<Heightfield> {
      if heights.len() < 2 {
         return Err(PhysicsError::TooFewSamples { count: heights.len() });
      }
      let max_value = heights.iter().cloned().fold(Fp::MIN, Fp::max);
      let min_value = heights.iter().cloned().fold(Fp::MAX, Fp::min);
      Ok(Heightfield { heights, element_width, max_value, min_value })
   }

   #[inline]
   pub fn heights(&self) -> &[Fp] {
      &self.heights
   }
   #[inline]
   pub fn element_width(&self) -> Fp {
      self.element_width
   }
   #[inline]
   pub fn max_value(&self) -> Fp {
      self.max_value
   }
   #[inline]
   pub fn min_value(&self) -> Fp {
      self.min_value
   }
   #[inline]
   pub fn segment_count(&self) -> usize {
      self.heights.len() - 1
   }

   #[inline]
   pub fn segment(&self, i: usize) -> (Vec2, Vec2) {
      //! Local endpoints of the `i`th sample interval.
      let w = self.element_width;
      (
         Vec2::new(i as Fp * w, self.heights[i]),
         Vec2::new((i + 1) as Fp * w, self.heights[i + 1]),
      )
   }

   pub fn segment_range(&self, lower_x: Fp, upper_x: Fp) -> Option<(usize, usize)> {
      //! Indices of the first and last segments whose x-span intersects `[lower_x, upper_x]`.
      let w = self.element_width;
      if w <= 0.0 {
         return None;
      }
      let last = self.segment_count() as isize - 1;
      let a = ((lower_x / w).floor() as isize).max(0);
      let b = ((upper_x / w).floor() as isize).min(last);
      if a > b || b < 0 || a > last {
         None
      } else {
         Some((a as usize, b as usize))
      }
   }

   pub fn area(&self) -> Fp {
      //! Area between the samples and local y = 0.
      (0..self.segment_count())
         .map(|i| (self.heights[i] + self.heights[i + 1]) * 0.5 * self.element_width)
         .sum()
   }

   pub fn compute_aabb(&self, out: &mut Aabb, position: Vec2, angle: Fp) {
      let right = self.segment_count() as Fp * self.element_width;
      out.set_from_points(
         &[
            Vec2::new(0.0, self.min_value),
            Vec2::new(right, self.min_value),
            Vec2::new(right, self.max_value),
            Vec2::new(0.0, self.max_value),
         ],
         position,
         angle,
         0.0,
      );
   }

   pub fn height_at(&self, x: Fp) -> Option<Fp> {
      //! Linearly interpolated surface height at local `x`.
      let w = self.element_width;
      if x < 0.0 || w <= 0.0 {
         return None;
      }
      let i = (x / w).floor() as usize;
      if i >= self.segment_count() {
         return if i == self.segment_count() && x == i as Fp * w { Some(self.heights[i]) } else { None };
      }
      let t = (x - i as Fp * w) / w;
      Some(self.heights[i] + (self.heights[i + 1] - self.heights[i]) * t)
   }

   #[inline]
   pub fn point_test(&self, local_point: Vec2) -> bool {
      self.height_at(local_point.x).map_or(false, |h| local_point.y <= h)
   }
}
