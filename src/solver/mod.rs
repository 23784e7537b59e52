//! Projected Gauss-Seidel solver over [`Equation`]s, with optional island splitting.

mod island;

pub use island::{split_islands, UnionFind};

use crate::{body::Body, equation::{Equation, EquationKind}, Fp};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct GsSolver {
   /// Upper bound on Gauss-Seidel sweeps per solve.
   pub iterations: usize,
   /// Stop once the summed change in lambda over one sweep falls below `tolerance * N`.
   pub tolerance: Fp,
   /// Sweeps used to estimate normal forces before scaling friction bounds. `0` disables.
   pub friction_iterations: usize,
   /// Solve with a zero right-hand side, useful for relaxation passes.
   pub use_zero_rhs: bool,
   used_iterations: usize,
   touched: Vec<usize>,
}

impl Default for GsSolver {
   fn default() -> Self {
      GsSolver { iterations: 10, tolerance: 1e-7, friction_iterations: 0, use_zero_rhs: false, used_iterations: 0, touched: Vec::new() }
   }
}

impl GsSolver {
   pub fn new() -> GsSolver {
      GsSolver::default()
   }

   /// Sweeps performed by the last call to [`GsSolver::solve`].
   #[inline]
   pub fn used_iterations(&self) -> usize {
      self.used_iterations
   }

   /// Solves the equations listed in `batch` for the time step `h` and applies the
   /// resulting constraint velocities to the bodies involved.
   ///
   /// Friction equations refer to their contacts by index into `equations`.
   pub fn solve(&mut self, h: Fp, equations: &mut [&mut Equation], batch: &[usize], bodies: &mut [Body]) {
      self.used_iterations = 0;
      if batch.is_empty() {
         return;
      }

      self.touched.clear();
      for &i in batch {
         self.touched.push(equations[i].index_a);
         self.touched.push(equations[i].index_b);
      }
      self.touched.sort_unstable();
      self.touched.dedup();
      for &b in self.touched.iter() {
         bodies[b].update_solve_mass_properties();
         bodies[b].reset_constraint_velocity();
      }

      for &i in batch {
         let eq = &mut *equations[i];
         if eq.time_step != h || eq.needs_update {
            eq.time_step = h;
            eq.update();
         }
         let (a, b, eps) = (eq.a, eq.b, eq.epsilon);
         eq.b_rhs = eq.compute_b(a, b, h, bodies);
         eq.inv_c = eq.compute_inv_c(eps, bodies);
         eq.lambda = 0.0;
      }

      let tol_squared = (self.tolerance * batch.len() as Fp).powi(2);

      if self.friction_iterations > 0 {
         for _ in 0..self.friction_iterations {
            let mut delta_total = 0.0;
            for &i in batch {
               if matches!(equations[i].kind, EquationKind::Friction(_)) {
                  continue;
               }
               delta_total += iterate_equation(&mut *equations[i], bodies, h, self.use_zero_rhs).abs();
            }
            self.used_iterations += 1;
            if delta_total * delta_total <= tol_squared {
               break;
            }
         }
         update_multipliers(equations, batch, h);
         set_friction_bounds(equations, batch);
      }

      for _ in 0..self.iterations {
         let mut delta_total = 0.0;
         for &i in batch {
            delta_total += iterate_equation(&mut *equations[i], bodies, h, self.use_zero_rhs).abs();
         }
         self.used_iterations += 1;
         if delta_total * delta_total <= tol_squared {
            break;
         }
      }

      for &b in self.touched.iter() {
         bodies[b].add_constraint_velocity();
      }
      update_multipliers(equations, batch, h);
      trace!(equations = batch.len(), iterations = self.used_iterations, "solved batch");
   }
}

fn iterate_equation(eq: &mut Equation, bodies: &mut [Body], h: Fp, use_zero_rhs: bool) -> Fp {
   let b = if use_zero_rhs { 0.0 } else { eq.b_rhs };
   let gw_lambda = eq.compute_gw_lambda(bodies);
   let mut delta = eq.inv_c * (b - gw_lambda - eq.epsilon * eq.lambda);

   let next = eq.lambda + delta;
   if next < eq.min_force * h {
      delta = eq.min_force * h - eq.lambda;
   } else if next > eq.max_force * h {
      delta = eq.max_force * h - eq.lambda;
   }
   eq.lambda += delta;
   eq.add_to_wlambda(delta, bodies);
   delta
}

fn update_multipliers(equations: &mut [&mut Equation], batch: &[usize], h: Fp) {
   let inv_h = 1.0 / h;
   for &i in batch {
      equations[i].multiplier = equations[i].lambda * inv_h;
   }
}

fn set_friction_bounds(equations: &mut [&mut Equation], batch: &[usize]) {
   // friction bound = coefficient * mean normal force over the friction's contacts
   let bounds: Vec<(usize, Fp)> = batch
      .iter()
      .filter_map(|&i| {
         let f = equations[i].friction()?;
         if f.contact_equations.is_empty() {
            return None;
         }
         let sum: Fp = f.contact_equations.iter().map(|&c| equations[c].multiplier).sum();
         Some((i, sum * f.friction_coefficient / f.contact_equations.len() as Fp))
      })
      .collect();
   for (i, force) in bounds {
      equations[i].set_slip_force(force);
   }
}
