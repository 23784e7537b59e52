use super::{bounding_volume_check, can_collide, Broadphase, BoundingVolume};
use crate::{aabb::Aabb, body::Body};

/// Sweep and prune along one axis.
///
/// Keeps the body slots ordered by AABB lower bound between calls. Bodies move little
/// from one step to the next, so the list stays nearly sorted and insertion sort is
/// close to linear.
#[derive(Debug, Clone, Default)]
pub struct SapBroadphase {
   axis: usize,
   order: Vec<usize>,
   volume: BoundingVolume,
}

impl SapBroadphase {
   pub fn new() -> SapBroadphase {
      SapBroadphase::default()
   }

   /// Sweep along x (`0`) or y (`1`).
   pub fn with_axis(mut self, axis: usize) -> SapBroadphase {
      self.axis = axis.min(1);
      self
   }

   pub fn axis(&self) -> usize {
      self.axis
   }

   fn sync(&mut self, count: usize) {
      // slots the world never reported, e.g. a broadphase swapped in mid-simulation
      if self.order.len() != count {
         self.order.clear();
         self.order.extend(0..count);
      }
   }
}

// code based off of https://en.wikipedia.org/wiki/Insertion_sort#Algorithm
fn insertion_sort(order: &mut [usize], bodies: &[Body], axis: usize) {
   let key = |slot: usize| bodies[slot].aabb().lower_bound[axis];
   for i in 1..order.len() {
      let val = order[i];
      let val_key = key(val);
      let mut j = i;
      while j != 0 && key(order[j - 1]) > val_key {
         order[j] = order[j - 1];
         j -= 1;
      }
      order[j] = val;
   }
}

impl Broadphase for SapBroadphase {
   fn collision_pairs(&mut self, bodies: &[Body], out: &mut Vec<(usize, usize)>) {
      self.sync(bodies.len());
      insertion_sort(&mut self.order, bodies, self.axis);

      let axis = self.axis;
      for (n, &i) in self.order.iter().enumerate() {
         let a = &bodies[i];
         let upper = a.aabb().upper_bound[axis];
         for &j in self.order[n + 1..].iter() {
            let b = &bodies[j];
            if b.aabb().lower_bound[axis] > upper {
               break;
            }
            if can_collide(a, b) && bounding_volume_check(a, b, self.volume) {
               out.push((i, j));
            }
         }
      }
   }

   fn aabb_query(&mut self, bodies: &[Body], aabb: &Aabb, out: &mut Vec<usize>) {
      self.sync(bodies.len());
      insertion_sort(&mut self.order, bodies, self.axis);

      for &i in self.order.iter() {
         let body_aabb = bodies[i].aabb();
         if body_aabb.lower_bound[self.axis] > aabb.upper_bound[self.axis] {
            break;
         }
         if body_aabb.overlaps(aabb) {
            out.push(i);
         }
      }
   }

   fn bounding_volume(&self) -> BoundingVolume {
      self.volume
   }

   fn set_bounding_volume(&mut self, volume: BoundingVolume) {
      self.volume = volume;
   }

   fn body_added(&mut self, slot: usize) {
      self.order.push(slot);
   }

   fn body_removed(&mut self, slot: usize) {
      self.order.retain(|&s| s != slot);
      for s in self.order.iter_mut() {
         if *s > slot {
            *s -= 1;
         }
      }
   }

   fn clear(&mut self) {
      self.order.clear();
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{
      aabb::Aabb,
      broad::{
         tests::{ball, sorted},
         NaiveBroadphase,
      },
      Vec2,
   };

   fn scattered() -> Vec<Body> {
      let mut bodies = Vec::new();
      for i in 0..24 {
         let x = ((i * 7) % 11) as crate::Fp * 0.6;
         let y = ((i * 5) % 3) as crate::Fp * 0.7;
         bodies.push(ball(x, y));
      }
      bodies
   }

   #[test]
   fn matches_naive() {
      let bodies = scattered();
      let mut sap = SapBroadphase::new();
      for i in 0..bodies.len() {
         sap.body_added(i);
      }
      let (mut a, mut b) = (Vec::new(), Vec::new());
      sap.collision_pairs(&bodies, &mut a);
      NaiveBroadphase::new().collision_pairs(&bodies, &mut b);
      assert!(!a.is_empty());
      let expected = sorted(b);
      assert_eq!(sorted(a), expected);

      let mut sap_y = SapBroadphase::new().with_axis(1);
      let mut c = Vec::new();
      sap_y.collision_pairs(&bodies, &mut c);
      assert_eq!(sorted(c), expected);
   }

   #[test]
   fn removal_shifts_slots() {
      let mut sap = SapBroadphase::new();
      for i in 0..4 {
         sap.body_added(i);
      }
      sap.body_removed(1);
      let mut order = sap.order.clone();
      order.sort_unstable();
      assert_eq!(order, vec![0, 1, 2]);
   }

   #[test]
   fn query_by_box() {
      let bodies = vec![ball(0.0, 0.0), ball(3.0, 0.0), ball(6.0, 0.0)];
      let mut sap = SapBroadphase::new();
      let mut hits = Vec::new();
      sap.aabb_query(&bodies, &Aabb::new(Vec2::new(2.0, -1.0), Vec2::new(4.0, 1.0)), &mut hits);
      assert_eq!(hits, vec![1]);
   }
}
