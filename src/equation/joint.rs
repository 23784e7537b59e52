use crate::{body::Body, math, Fp, Vec2, FRAC_PI_2};

pub(super) fn distance_gq(bi: &Body, bj: &Body, local_anchor_a: Vec2, local_anchor_b: Vec2, distance: Fp) -> Fp {
   let xi = bi.to_world_frame(local_anchor_a);
   let xj = bj.to_world_frame(local_anchor_b);
   xj.distance(xi) - distance
}

pub(super) fn lock_axis_gq(bi: &Body, bj: &Body, local_offset_b: Vec2, axis: usize) -> Fp {
   let l = math::rotate(local_offset_b, bi.angle);
   let g = bj.position - bi.position - l;
   g[axis]
}

pub(super) fn pivot_axis_gq(bi: &Body, bj: &Body, local_pivot_a: Vec2, local_pivot_b: Vec2, axis: usize) -> Fp {
   let g = bj.to_world_frame(local_pivot_b) - bi.to_world_frame(local_pivot_a);
   g[axis]
}

pub(super) fn prismatic_gq(bi: &Body, bj: &Body, local_anchor_a: Vec2, local_anchor_b: Vec2, local_axis_a: Vec2) -> Fp {
   let gg = bj.to_world_frame(local_anchor_b) - bi.to_world_frame(local_anchor_a);
   let t = math::rotate(local_axis_a, bi.angle + FRAC_PI_2);
   gg.dot(t)
}
