use crate::{body::Body, equation::Equation};
use indexmap::IndexMap;

/// Disjoint sets over body slots, with path compression and union by rank.
#[derive(Debug, Clone, Default)]
pub struct UnionFind {
   parent: Vec<usize>,
   rank: Vec<u8>,
}

impl UnionFind {
   pub fn new(size: usize) -> UnionFind {
      let mut uf = UnionFind::default();
      uf.reset(size);
      uf
   }

   pub fn reset(&mut self, size: usize) {
      self.parent.clear();
      self.parent.extend(0..size);
      self.rank.clear();
      self.rank.resize(size, 0);
   }

   pub fn find(&mut self, mut i: usize) -> usize {
      let mut root = i;
      while self.parent[root] != root {
         root = self.parent[root];
      }
      while self.parent[i] != root {
         let next = self.parent[i];
         self.parent[i] = root;
         i = next;
      }
      root
   }

   pub fn union(&mut self, a: usize, b: usize) {
      let (ra, rb) = (self.find(a), self.find(b));
      if ra == rb {
         return;
      }
      match self.rank[ra].cmp(&self.rank[rb]) {
         std::cmp::Ordering::Less => self.parent[ra] = rb,
         std::cmp::Ordering::Greater => self.parent[rb] = ra,
         std::cmp::Ordering::Equal => {
            self.parent[rb] = ra;
            self.rank[ra] += 1;
         }
      }
   }
}

/// Groups the equations in `active` into islands of dynamic bodies.
///
/// Every dynamic body gets its union-find root as `island_id`, other bodies get `-1`.
/// Returns one batch of equation indices per island, in order of first appearance,
/// each batch keeping the relative order of `active`.
pub fn split_islands(uf: &mut UnionFind, equations: &[&mut Equation], active: &[usize], bodies: &mut [Body]) -> Vec<Vec<usize>> {
   uf.reset(bodies.len());
   for &i in active {
      let eq = &equations[i];
      if bodies[eq.index_a].is_dynamic() && bodies[eq.index_b].is_dynamic() {
         uf.union(eq.index_a, eq.index_b);
      }
   }

   for (i, body) in bodies.iter_mut().enumerate() {
      body.island_id = if body.is_dynamic() { uf.find(i) as i32 } else { -1 };
   }

   let mut batches: IndexMap<i32, Vec<usize>> = IndexMap::new();
   for &i in active {
      let eq = &equations[i];
      let key = match (bodies[eq.index_a].island_id, bodies[eq.index_b].island_id) {
         (-1, b) => b,
         (a, _) => a,
      };
      batches.entry(key).or_default().push(i);
   }
   batches.into_values().collect()
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn union_find() {
      let mut uf = UnionFind::new(6);
      uf.union(0, 1);
      uf.union(2, 3);
      uf.union(1, 3);
      assert_eq!(uf.find(0), uf.find(2));
      assert_ne!(uf.find(0), uf.find(4));
      assert_eq!(uf.find(5), 5);
   }
}
