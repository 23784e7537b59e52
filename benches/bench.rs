use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fulcrum::{narrow::{contact_manifold, Placed}, Body, BodyOptions, Fp, Shape, Vec2, World, WorldOptions};

fn box_stack(height: usize) -> World {
   let mut world = World::new(WorldOptions::default().with_gravity(Vec2::new(0.0, -10.0)));
   let mut ground = Body::new(BodyOptions::default());
   ground.add_shape(Shape::plane()).unwrap();
   world.add_body(ground).unwrap();

   for i in 0..height {
      let mut body = Body::new(BodyOptions::dynamic(1.0).with_position(Vec2::new(0.0, 0.5 + i as Fp * 1.01)));
      body.add_shape(Shape::rectangle(1.0, 1.0)).unwrap();
      world.add_body(body).unwrap();
   }
   world
}

fn criterion_benchmark(c: &mut Criterion) {
   let a = Shape::rectangle(1.0, 1.0);
   let b = Shape::convex(vec![Vec2::new(-0.5, -0.4), Vec2::new(0.6, -0.5), Vec2::new(0.4, 0.5), Vec2::new(-0.6, 0.4)]).unwrap();
   c.bench_function("convex convex manifold", |bench| {
      bench.iter(|| {
         contact_manifold(
            black_box(&Placed { shape: &a, position: Vec2::ZERO, angle: 0.0 }),
            black_box(&Placed { shape: &b, position: Vec2::new(0.8, 0.3), angle: 0.3 }),
         )
      })
   });

   let mut world = box_stack(10);
   for _ in 0..60 {
      world.step(1.0 / 60.0);
   }
   c.bench_function("step box stack of 10", |bench| bench.iter(|| world.step(black_box(1.0 / 60.0))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
