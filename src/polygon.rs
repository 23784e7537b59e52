//! Simple-polygon utilities: winding, convexity, ear-clipping triangulation and
//! convex decomposition. Used when constructing shapes, never per step.

use tracing::warn;

use crate::{math, Fp, Vec2};

/// Recursion bound for [`quick_decomp`].
pub const DEFAULT_MAX_LEVEL: usize = 100;

#[inline]
fn at(poly: &[Vec2], i: isize) -> Vec2 {
   let len = poly.len() as isize;
   poly[i.rem_euclid(len) as usize]
}

#[inline]
pub fn triangle_area(a: Vec2, b: Vec2, c: Vec2) -> Fp {
   //! Twice the signed area of triangle `abc`, positive when counter-clockwise.
   (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}
#[inline]
fn is_left(a: Vec2, b: Vec2, c: Vec2) -> bool { triangle_area(a, b, c) > 0.0 }
#[inline]
fn is_left_on(a: Vec2, b: Vec2, c: Vec2) -> bool { triangle_area(a, b, c) >= 0.0 }
#[inline]
fn is_right(a: Vec2, b: Vec2, c: Vec2) -> bool { triangle_area(a, b, c) < 0.0 }
#[inline]
fn is_right_on(a: Vec2, b: Vec2, c: Vec2) -> bool { triangle_area(a, b, c) <= 0.0 }

pub fn signed_area(poly: &[Vec2]) -> Fp {
   //! Shoelace area, positive for counter-clockwise winding.
   let n = poly.len();
   let mut sum = 0.0;
   for i in 0..n {
      sum += math::cross(poly[i], poly[(i + 1) % n]);
   }
   sum * 0.5
}

pub fn is_ccw(poly: &[Vec2]) -> bool {
   signed_area(poly) > 0.0
}

pub fn make_ccw(poly: &mut [Vec2]) -> bool {
   //! Reverses `poly` if it is wound clockwise. Returns whether it was reversed.
   if poly.len() < 3 {
      return false;
   }
   let mut br = 0;
   for i in 1..poly.len() {
      if poly[i].y < poly[br].y || (poly[i].y == poly[br].y && poly[i].x > poly[br].x) {
         br = i;
      }
   }
   let b = br as isize;
   if !is_left(at(poly, b - 1), at(poly, b), at(poly, b + 1)) {
      poly.reverse();
      true
   } else {
      false
   }
}

pub fn is_convex(poly: &[Vec2]) -> bool {
   //! Whether a counter-clockwise polygon has no reflex vertices.
   (0..poly.len() as isize).all(|i| !is_reflex(poly, i))
}

#[inline]
fn is_reflex(poly: &[Vec2], i: isize) -> bool {
   is_right(at(poly, i - 1), at(poly, i), at(poly, i + 1))
}

pub fn is_simple(poly: &[Vec2]) -> bool {
   //! Whether no two non-adjacent edges intersect.
   let n = poly.len();
   if n < 4 {
      return n == 3;
   }
   for i in 0..n {
      let (a1, a2) = (poly[i], poly[(i + 1) % n]);
      for j in (i + 2)..n {
         if i == 0 && j == n - 1 {
            continue; // adjacent through the wrap
         }
         if math::segments_intersect(a1, a2, poly[j], poly[(j + 1) % n]) {
            return false;
         }
      }
   }
   true
}

pub fn remove_collinear_points(poly: &mut Vec<Vec2>, precision: Fp) -> usize {
   //! Drops vertices whose neighbours are collinear with them. Returns the number removed.
   let mut removed = 0;
   let mut i = poly.len() as isize - 1;
   while poly.len() > 3 && i >= 0 {
      let (a, b, c) = (at(poly, i - 1), at(poly, i), at(poly, i + 1));
      if math::scalars_equal(triangle_area(a, b, c), 0.0, precision) {
         poly.remove(i as usize);
         removed += 1;
      }
      i -= 1;
   }
   removed
}

pub fn triangulate(poly: &[Vec2]) -> Vec<[usize; 3]> {
   //! Ear-clipping triangulation of a simple counter-clockwise polygon, as vertex index triples.
   let n = poly.len();
   let mut triangles = Vec::with_capacity(n.saturating_sub(2));
   if n < 3 {
      return triangles;
   }
   let mut remaining: Vec<usize> = (0..n).collect();
   let mut guard = 0;
   while remaining.len() > 3 {
      let m = remaining.len();
      let mut clipped = false;
      for k in 0..m {
         let ip = remaining[(k + m - 1) % m];
         let ic = remaining[k];
         let inx = remaining[(k + 1) % m];
         let (a, b, c) = (poly[ip], poly[ic], poly[inx]);
         if triangle_area(a, b, c) <= 0.0 {
            continue; // reflex or degenerate corner
         }
         let contains_other = remaining.iter().any(|&j| {
            j != ip && j != ic && j != inx && point_in_triangle(poly[j], a, b, c)
         });
         if !contains_other {
            triangles.push([ip, ic, inx]);
            remaining.remove(k);
            clipped = true;
            break;
         }
      }
      if !clipped {
         // Degenerate input, fall back to a fan over what is left.
         guard += 1;
         if guard > 1 {
            for k in 1..remaining.len() - 1 {
               triangles.push([remaining[0], remaining[k], remaining[k + 1]]);
            }
            return triangles;
         }
         let ic = remaining.remove(1);
         triangles.push([remaining[0], ic, remaining[1]]);
      }
   }
   triangles.push([remaining[0], remaining[1], remaining[2]]);
   triangles
}

#[inline]
fn point_in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
   is_left_on(a, b, p) && is_left_on(b, c, p) && is_left_on(c, a, p)
}

fn intersection_point(p1: Vec2, p2: Vec2, q1: Vec2, q2: Vec2) -> Vec2 {
   let a1 = p2.y - p1.y;
   let b1 = p1.x - p2.x;
   let c1 = a1 * p1.x + b1 * p1.y;
   let a2 = q2.y - q1.y;
   let b2 = q1.x - q2.x;
   let c2 = a2 * q1.x + b2 * q1.y;
   let det = a1 * b2 - a2 * b1;
   if math::scalars_equal(det, 0.0, 0.0) {
      Vec2::ZERO
   } else {
      Vec2::new((b2 * c1 - b1 * c2) / det, (a1 * c2 - a2 * c1) / det)
   }
}

fn can_see(poly: &[Vec2], a: isize, b: isize) -> bool {
   let len = poly.len() as isize;
   for i in 0..len {
      let next = (i + 1) % len;
      if next == a.rem_euclid(len) || i == a.rem_euclid(len) || next == b.rem_euclid(len) || i == b.rem_euclid(len) {
         continue;
      }
      if math::segments_intersect(at(poly, a), at(poly, b), at(poly, i), at(poly, i + 1)) {
         return false;
      }
   }
   true
}

/// Decomposes a simple counter-clockwise polygon into convex pieces (Bayazit's algorithm).
///
/// Hitting `max_level` logs a warning and returns the pieces found so far.
pub fn quick_decomp(poly: &[Vec2], max_level: usize) -> Vec<Vec<Vec2>> {
   let mut result = Vec::new();
   quick_decomp_rec(poly, &mut result, max_level, 0);
   result
}

fn quick_decomp_rec(poly: &[Vec2], result: &mut Vec<Vec<Vec2>>, max_level: usize, level: usize) {
   let len = poly.len() as isize;
   if len < 3 {
      return;
   }
   let level = level + 1;
   if level > max_level {
      warn!(max_level, "convex decomposition reached its recursion bound, result is partial");
      return;
   }

   let mut lower_poly = Vec::new();
   let mut upper_poly = Vec::new();

   for i in 0..len {
      if !is_reflex(poly, i) {
         continue;
      }
      let (mut upper_dist, mut lower_dist) = (Fp::MAX, Fp::MAX);
      let (mut upper_int, mut lower_int) = (Vec2::ZERO, Vec2::ZERO);
      let (mut upper_index, mut lower_index) = (0isize, 0isize);

      for j in 0..len {
         if is_left(at(poly, i - 1), at(poly, i), at(poly, j))
            && is_right_on(at(poly, i - 1), at(poly, i), at(poly, j - 1))
         {
            let p = intersection_point(at(poly, i - 1), at(poly, i), at(poly, j), at(poly, j - 1));
            if is_right(at(poly, i + 1), at(poly, i), p) {
               let d = (at(poly, i) - p).length_squared();
               if d < lower_dist {
                  lower_dist = d;
                  lower_int = p;
                  lower_index = j;
               }
            }
         }
         if is_left(at(poly, i + 1), at(poly, i), at(poly, j + 1))
            && is_right_on(at(poly, i + 1), at(poly, i), at(poly, j))
         {
            let p = intersection_point(at(poly, i + 1), at(poly, i), at(poly, j), at(poly, j + 1));
            if is_left(at(poly, i - 1), at(poly, i), p) {
               let d = (at(poly, i) - p).length_squared();
               if d < upper_dist {
                  upper_dist = d;
                  upper_int = p;
                  upper_index = j;
               }
            }
         }
      }

      let iu = i as usize;
      if lower_index == (upper_index + 1) % len {
         // nothing visible to connect to, split through a steiner point
         let p = (lower_int + upper_int) * 0.5;
         if i < upper_index {
            lower_poly.extend_from_slice(&poly[iu..=upper_index as usize]);
            lower_poly.push(p);
            upper_poly.push(p);
            if lower_index != 0 {
               upper_poly.extend_from_slice(&poly[lower_index as usize..]);
            }
            upper_poly.extend_from_slice(&poly[..=iu]);
         } else {
            if i != 0 {
               lower_poly.extend_from_slice(&poly[iu..]);
            }
            lower_poly.extend_from_slice(&poly[..=upper_index as usize]);
            lower_poly.push(p);
            upper_poly.push(p);
            upper_poly.extend_from_slice(&poly[lower_index as usize..=iu]);
         }
      } else {
         if lower_index > upper_index {
            upper_index += len;
         }
         if upper_index < lower_index {
            return;
         }
         let mut closest_dist = Fp::MAX;
         let mut closest_index = None;
         for j in lower_index..=upper_index {
            if is_left_on(at(poly, i - 1), at(poly, i), at(poly, j))
               && is_right_on(at(poly, i + 1), at(poly, i), at(poly, j))
            {
               let d = (at(poly, i) - at(poly, j)).length_squared();
               if d < closest_dist && can_see(poly, i, j) {
                  closest_dist = d;
                  closest_index = Some((j % len) as usize);
               }
            }
         }
         let closest = match closest_index {
            Some(c) => c,
            None => continue,
         };
         if iu < closest {
            lower_poly.extend_from_slice(&poly[iu..=closest]);
            if closest != 0 {
               upper_poly.extend_from_slice(&poly[closest..]);
            }
            upper_poly.extend_from_slice(&poly[..=iu]);
         } else {
            if iu != 0 {
               lower_poly.extend_from_slice(&poly[iu..]);
            }
            lower_poly.extend_from_slice(&poly[..=closest]);
            upper_poly.extend_from_slice(&poly[closest..=iu]);
         }
      }

      // smallest piece first
      if lower_poly.len() < upper_poly.len() {
         quick_decomp_rec(&lower_poly, result, max_level, level);
         quick_decomp_rec(&upper_poly, result, max_level, level);
      } else {
         quick_decomp_rec(&upper_poly, result, max_level, level);
         quick_decomp_rec(&lower_poly, result, max_level, level);
      }
      return;
   }
   result.push(poly.to_vec());
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   fn l_shape() -> Vec<Vec2> {
      vec![
         Vec2::new(0.0, 0.0),
         Vec2::new(2.0, 0.0),
         Vec2::new(2.0, 1.0),
         Vec2::new(1.0, 1.0),
         Vec2::new(1.0, 2.0),
         Vec2::new(0.0, 2.0),
      ]
   }

   #[test]
   fn winding() {
      let mut poly = l_shape();
      assert!(is_ccw(&poly));
      assert_relative_eq!(signed_area(&poly), 3.0);
      poly.reverse();
      assert!(!is_ccw(&poly));
      assert!(make_ccw(&mut poly));
      assert!(is_ccw(&poly));
   }

   #[test]
   fn convexity() {
      assert!(!is_convex(&l_shape()));
      assert!(is_convex(&[Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0)]));
   }

   #[test]
   fn simplicity() {
      assert!(is_simple(&l_shape()));
      let bowtie = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
      assert!(!is_simple(&bowtie));
   }

   #[test]
   fn triangulation_covers_area() {
      let poly = l_shape();
      let tris = triangulate(&poly);
      assert_eq!(tris.len(), poly.len() - 2);
      let total: Fp = tris.iter().map(|t| triangle_area(poly[t[0]], poly[t[1]], poly[t[2]]) * 0.5).sum();
      assert_relative_eq!(total, 3.0, epsilon = 1e-9);
   }

   #[test]
   fn decomposition_yields_convex_pieces() {
      let poly = l_shape();
      let pieces = quick_decomp(&poly, DEFAULT_MAX_LEVEL);
      assert!(pieces.len() >= 2);
      let total: Fp = pieces.iter().map(|p| signed_area(p)).sum();
      assert_relative_eq!(total, 3.0, epsilon = 1e-9);
      for p in pieces.iter() {
         assert!(is_convex(p));
      }
   }

   #[test]
   fn collinear_removal() {
      let mut poly = vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0), Vec2::new(2.0, 2.0), Vec2::new(0.0, 2.0)];
      assert_eq!(remove_collinear_points(&mut poly, 1e-9), 1);
      assert_eq!(poly.len(), 4);
   }
}
