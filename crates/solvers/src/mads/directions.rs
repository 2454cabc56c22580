use mads_core::InputType;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::mesh::Mesh;

/// Rule used to build the poll directions of each iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionType {
    /// The `2n` coordinate directions `±e_i`.
    Coordinate,

    /// `2n` directions from a Householder reflection of a random unit vector,
    /// redrawn every iteration from the seeded generator.
    #[default]
    #[serde(rename = "ortho_2n")]
    Ortho2N,

    /// The `n + 1` directions `e_1, …, e_n` and `-(e_1 + … + e_n)`.
    NPlusOne,
}

/// Builds a positive spanning set of unit directions (infinity norm 1).
pub(super) fn unit_directions<R: Rng + ?Sized>(
    kind: DirectionType,
    n: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    match kind {
        DirectionType::Coordinate => {
            let mut dirs = Vec::with_capacity(2 * n);
            for sign in [1.0, -1.0] {
                for i in 0..n {
                    let mut d = vec![0.0; n];
                    d[i] = sign;
                    dirs.push(d);
                }
            }
            dirs
        }
        DirectionType::Ortho2N => {
            let basis = householder(&random_unit_vector(n, rng));
            let mut dirs = Vec::with_capacity(2 * n);
            dirs.extend(basis.iter().cloned());
            dirs.extend(basis.iter().map(|d| d.iter().map(|v| -v).collect()));
            dirs
        }
        DirectionType::NPlusOne => {
            let mut dirs: Vec<Vec<f64>> = (0..n)
                .map(|i| {
                    let mut d = vec![0.0; n];
                    d[i] = 1.0;
                    d
                })
                .collect();
            dirs.push(vec![-1.0; n]);
            dirs
        }
    }
}

fn random_unit_vector<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    loop {
        let v: Vec<f64> = (0..n).map(|_| rng.gen_range(-1.0..=1.0)).collect();
        let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 1e-3 {
            return v.into_iter().map(|x| x / norm).collect();
        }
    }
}

/// Columns of `H = I - 2vvᵀ`, each scaled to infinity norm 1.
fn householder(v: &[f64]) -> Vec<Vec<f64>> {
    let n = v.len();
    (0..n)
        .map(|j| {
            let column: Vec<f64> = (0..n)
                .map(|i| f64::from(u8::from(i == j)) - 2.0 * v[i] * v[j])
                .collect();
            let scale = column.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
            column.into_iter().map(|x| x / scale).collect()
        })
        .collect()
}

/// Bounds and kinds of the variables, used to turn directions into points.
#[derive(Debug, Clone, Copy)]
pub(super) struct Domain<'a> {
    pub(super) lower: &'a [f64],
    pub(super) upper: &'a [f64],
    pub(super) input_types: &'a [InputType],
}

impl Domain<'_> {
    /// Clamps `x` into the bounds and rounds discrete variables.
    pub(super) fn snap(&self, x: &mut [f64]) {
        for (i, xi) in x.iter_mut().enumerate() {
            if self.input_types[i].is_discrete() {
                *xi = xi.round();
            }
            *xi = xi.clamp(self.lower[i], self.upper[i]);
        }
    }
}

/// Turns unit directions into trial points around `center`.
///
/// Each component becomes `δ_i · round(d_i Δ_i / δ_i)`, so the step is a mesh
/// multiple close to `Δ_i d_i`. Points are then snapped to the bounds. Points
/// that collapse onto the center are dropped. Returned pairs keep the index of
/// the direction that produced them.
pub(super) fn trial_points(
    center: &[f64],
    directions: &[Vec<f64>],
    mesh: &Mesh,
    domain: &Domain<'_>,
) -> Vec<(usize, Vec<f64>)> {
    let mesh_sizes = mesh.mesh_sizes();
    let poll_sizes = mesh.poll_sizes();

    let mut points: Vec<(usize, Vec<f64>)> = Vec::with_capacity(directions.len());
    for (k, d) in directions.iter().enumerate() {
        let mut x: Vec<f64> = center
            .iter()
            .zip(d)
            .zip(mesh_sizes.iter().zip(&poll_sizes))
            .map(|((&c, &di), (&delta, &big_delta))| {
                if delta > 0.0 {
                    c + delta * (di * big_delta / delta).round()
                } else {
                    c
                }
            })
            .collect();
        domain.snap(&mut x);

        if x.as_slice() == center || points.iter().any(|(_, p)| *p == x) {
            continue;
        }
        points.push((k, x));
    }
    points
}

/// Moves trial points whose displacement agrees with the last successful
/// displacement to the front, keeping direction order otherwise.
pub(super) fn order_by_success(
    center: &[f64],
    points: &mut [(usize, Vec<f64>)],
    last_success: Option<&[f64]>,
) {
    let Some(last) = last_success else {
        return;
    };
    let alignment = |x: &[f64]| -> f64 {
        x.iter()
            .zip(center)
            .zip(last)
            .map(|((xi, ci), li)| (xi - ci) * li)
            .sum()
    };
    points.sort_by(|(_, a), (_, b)| alignment(b).total_cmp(&alignment(a)));
}
