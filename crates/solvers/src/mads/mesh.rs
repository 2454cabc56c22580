use mads_core::InputType;

/// Mesh and poll sizes of a run.
///
/// Both sizes scale a per-variable base size `s_i`. The poll fraction `p`
/// sets the poll size `Δ_i = p·s_i` and the mesh size is `δ_i = min(p, p²)·s_i`,
/// so `δ ≤ Δ` always holds and the mesh shrinks faster than the poll frame.
/// Integer and binary variables use sizes of at least 1, and their mesh size
/// is integral.
#[derive(Debug, Clone)]
pub(super) struct Mesh {
    base: Vec<f64>,
    input_types: Vec<InputType>,
    poll_fraction: f64,
    max_poll_fraction: f64,
    expansion: f64,
    contraction: f64,
    min_mesh_size: f64,
    min_poll_size: f64,
    index: i32,
}

impl Mesh {
    pub(super) fn new(
        base: Vec<f64>,
        input_types: Vec<InputType>,
        expansion: f64,
        contraction: f64,
        min_mesh_size: f64,
        min_poll_size: f64,
    ) -> Self {
        Self {
            base,
            input_types,
            poll_fraction: 1.0,
            max_poll_fraction: 1.0,
            expansion,
            contraction,
            min_mesh_size,
            min_poll_size,
            index: 0,
        }
    }

    fn mesh_fraction(&self) -> f64 {
        self.poll_fraction.min(self.poll_fraction * self.poll_fraction)
    }

    /// Per-variable mesh sizes `δ_i`.
    pub(super) fn mesh_sizes(&self) -> Vec<f64> {
        let m = self.mesh_fraction();
        self.base
            .iter()
            .zip(&self.input_types)
            .map(|(&s, kind)| {
                let size = m * s;
                if kind.is_discrete() && s > 0.0 {
                    size.round().max(1.0)
                } else {
                    size
                }
            })
            .collect()
    }

    /// Per-variable poll sizes `Δ_i`.
    pub(super) fn poll_sizes(&self) -> Vec<f64> {
        let p = self.poll_fraction;
        self.base
            .iter()
            .zip(&self.input_types)
            .map(|(&s, kind)| {
                let size = p * s;
                if kind.is_discrete() && s > 0.0 {
                    size.max(1.0)
                } else {
                    size
                }
            })
            .collect()
    }

    /// Largest per-variable mesh size.
    pub(super) fn mesh_size(&self) -> f64 {
        self.mesh_sizes().into_iter().fold(0.0, f64::max)
    }

    /// Largest per-variable poll size.
    pub(super) fn poll_size(&self) -> f64 {
        self.poll_sizes().into_iter().fold(0.0, f64::max)
    }

    /// Net number of refinements since the start of the run.
    pub(super) fn index(&self) -> i32 {
        self.index
    }

    /// Shrinks the mesh after a failed iteration.
    pub(super) fn refine(&mut self) {
        self.poll_fraction *= self.contraction;
        self.index += 1;
    }

    /// Enlarges the mesh after a successful iteration.
    ///
    /// The mesh never becomes coarser than the initial one.
    pub(super) fn coarsen(&mut self) {
        let enlarged = (self.poll_fraction * self.expansion).min(self.max_poll_fraction);
        if enlarged > self.poll_fraction {
            self.poll_fraction = enlarged;
            self.index -= 1;
        }
    }

    /// Returns `true` once the mesh cannot be meaningfully refined further.
    ///
    /// Continuous variables converge when their mesh size drops below the
    /// minimum mesh size or their poll size below the minimum poll size.
    /// Discrete variables converge once their unrounded poll size is below 1,
    /// meaning a poll at unit step has already failed. Fixed variables
    /// (zero base size) are always converged.
    pub(super) fn is_converged(&self) -> bool {
        let m = self.mesh_fraction();
        let p = self.poll_fraction;
        self.base
            .iter()
            .zip(&self.input_types)
            .all(|(&s, kind)| {
                if s == 0.0 {
                    true
                } else if kind.is_discrete() {
                    p * s < 1.0
                } else {
                    m * s < self.min_mesh_size || p * s < self.min_poll_size
                }
            })
    }

    /// Rounds `x` onto the mesh centered at `center`, variable by variable.
    pub(super) fn project(&self, center: &[f64], x: &mut [f64]) {
        for ((xi, &ci), (delta, kind)) in x
            .iter_mut()
            .zip(center)
            .zip(self.mesh_sizes().into_iter().zip(&self.input_types))
        {
            if delta > 0.0 {
                *xi = ci + ((*xi - ci) / delta).round() * delta;
            } else {
                *xi = ci;
            }
            if kind.is_discrete() {
                *xi = xi.round();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;

    fn continuous(base: Vec<f64>) -> Mesh {
        let n = base.len();
        Mesh::new(base, vec![InputType::Real; n], 2.0, 0.5, 1e-9, 0.0)
    }

    #[test]
    fn mesh_never_exceeds_poll() {
        let mut mesh = continuous(vec![1.0, 10.0]);
        for _ in 0..20 {
            for (d, p) in mesh.mesh_sizes().iter().zip(mesh.poll_sizes()) {
                assert!(*d <= p);
            }
            mesh.refine();
        }
    }

    #[test]
    fn refine_and_coarsen() {
        let mut mesh = continuous(vec![1.0]);

        mesh.refine();
        assert_relative_eq!(mesh.poll_size(), 0.5);
        assert_relative_eq!(mesh.mesh_size(), 0.25);
        assert_eq!(mesh.index(), 1);

        mesh.coarsen();
        assert_relative_eq!(mesh.poll_size(), 1.0);
        assert_eq!(mesh.index(), 0);

        // Capped at the initial mesh.
        mesh.coarsen();
        assert_relative_eq!(mesh.poll_size(), 1.0);
        assert_eq!(mesh.index(), 0);
    }

    #[test]
    fn converges_after_enough_refinements() {
        let mut mesh = continuous(vec![1.0]);
        let mut refinements = 0;
        while !mesh.is_converged() {
            mesh.refine();
            refinements += 1;
        }
        // 0.25^k < 1e-9 first holds at k = 15.
        assert_eq!(refinements, 15);
    }

    #[test]
    fn integer_sizes_are_at_least_one() {
        let mut mesh = Mesh::new(vec![4.0], vec![InputType::Integer], 2.0, 0.5, 1e-9, 0.0);

        assert_relative_eq!(mesh.mesh_sizes()[0], 4.0);
        mesh.refine();
        assert_relative_eq!(mesh.poll_sizes()[0], 2.0);
        assert_relative_eq!(mesh.mesh_sizes()[0], 1.0);
        assert!(!mesh.is_converged());

        mesh.refine();
        assert_relative_eq!(mesh.poll_sizes()[0], 1.0);
        assert!(!mesh.is_converged());

        mesh.refine();
        assert_relative_eq!(mesh.poll_sizes()[0], 1.0);
        assert!(mesh.is_converged());
    }

    #[test]
    fn projects_onto_mesh() {
        let mut mesh = continuous(vec![1.0]);
        mesh.refine();

        let mut x = [1.3];
        mesh.project(&[0.0], &mut x);
        assert_relative_eq!(x[0], 1.25);
    }

    #[test]
    fn fixed_variables_are_converged() {
        let mesh = continuous(vec![0.0, 0.0]);
        assert!(mesh.is_converged());
    }
}
