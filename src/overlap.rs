//! Shape overlap bookkeeping between consecutive steps, driving begin and end contact events.

use crate::{body::BodyHandle, shape::ShapeId};
use fnv::FnvBuildHasher;
use indexmap::IndexMap;

/// Two overlapping shapes and the bodies that own them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlapRecord {
   pub body_a: BodyHandle,
   pub shape_a: ShapeId,
   pub body_b: BodyHandle,
   pub shape_b: ShapeId,
}

impl OverlapRecord {
   #[inline]
   pub fn involves(&self, body: BodyHandle) -> bool {
      self.body_a == body || self.body_b == body
   }

   /// The body on the other side from `body`.
   #[inline]
   pub fn other(&self, body: BodyHandle) -> BodyHandle {
      if self.body_a == body { self.body_b } else { self.body_a }
   }
}

type Overlaps = IndexMap<(ShapeId, ShapeId), OverlapRecord, FnvBuildHasher>;

#[inline]
fn key(a: ShapeId, b: ShapeId) -> (ShapeId, ShapeId) {
   if a <= b { (a, b) } else { (b, a) }
}

/// Keeps the shape overlaps of the current and the previous step, in the order they were
/// first reported.
#[derive(Debug, Clone, Default)]
pub struct OverlapKeeper {
   current: Overlaps,
   last: Overlaps,
}

impl OverlapKeeper {
   pub fn new() -> OverlapKeeper {
      OverlapKeeper::default()
   }

   /// Starts a new step: the current overlaps become the previous ones.
   pub fn tick(&mut self) {
      std::mem::swap(&mut self.current, &mut self.last);
      self.current.clear();
   }

   pub fn set_overlapping(&mut self, body_a: BodyHandle, shape_a: ShapeId, body_b: BodyHandle, shape_b: ShapeId) {
      self.current
         .entry(key(shape_a, shape_b))
         .or_insert(OverlapRecord { body_a, shape_a, body_b, shape_b });
   }

   /// Overlaps present this step but not the previous one.
   pub fn new_overlaps(&self) -> impl Iterator<Item = &OverlapRecord> + '_ {
      self.current.iter().filter(|(k, _)| !self.last.contains_key(*k)).map(|(_, r)| r)
   }

   /// Overlaps present the previous step that ended this step.
   pub fn end_overlaps(&self) -> impl Iterator<Item = &OverlapRecord> + '_ {
      self.last.iter().filter(|(k, _)| !self.current.contains_key(*k)).map(|(_, r)| r)
   }

   pub fn is_new_overlap(&self, shape_a: ShapeId, shape_b: ShapeId) -> bool {
      let k = key(shape_a, shape_b);
      self.current.contains_key(&k) && !self.last.contains_key(&k)
   }

   /// Whether any shapes of the two bodies overlap this step.
   pub fn bodies_are_overlapping(&self, a: BodyHandle, b: BodyHandle) -> bool {
      self.current.values().any(|r| (r.body_a == a && r.body_b == b) || (r.body_a == b && r.body_b == a))
   }

   /// Every body overlapping `body` this step, each listed once.
   pub fn overlapping_bodies(&self, body: BodyHandle) -> Vec<BodyHandle> {
      let mut out = Vec::new();
      for r in self.current.values().filter(|r| r.involves(body)) {
         let other = r.other(body);
         if !out.contains(&other) {
            out.push(other);
         }
      }
      out
   }

   pub fn current(&self) -> impl Iterator<Item = &OverlapRecord> + '_ {
      self.current.values()
   }

   /// Drops every overlap involving `body`, so no end event is reported for a removed body.
   pub fn remove_body(&mut self, body: BodyHandle) {
      self.current.retain(|_, r| !r.involves(body));
      self.last.retain(|_, r| !r.involves(body));
   }

   pub fn clear(&mut self) {
      self.current.clear();
      self.last.clear();
   }
}
