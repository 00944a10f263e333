//! Derivative-free minimisation used for ARIMA parameter estimation.

use std::cmp::Ordering;

/// Result of a Nelder-Mead run.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// Best vertex found.
    pub optimal_point: Vec<f64>,
    /// Objective value at `optimal_point`.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the simplex collapsed below the tolerance.
    pub converged: bool,
}

/// Nelder-Mead coefficients and stopping rules.
#[derive(Debug, Clone)]
pub struct NelderMeadConfig {
    pub max_iter: usize,
    /// Stop once the spread of objective values and of vertex positions
    /// both fall below this.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrink coefficient.
    pub sigma: f64,
    /// Relative step used to build the initial simplex.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            tolerance: 1e-8,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.05,
        }
    }
}

/// Box constraints, one `(min, max)` pair per coordinate.
type Bounds<'a> = Option<&'a [(f64, f64)]>;

/// Minimise `objective` starting from `initial`.
///
/// Every trial point is clamped into `bounds` before evaluation, so the
/// objective is never called outside the box.
///
/// ```
/// use scrobble_forecast::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2),
///     &[0.0, 0.0],
///     None,
///     NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 2.0).abs() < 1e-3);
/// assert!((result.optimal_point[1] + 1.0).abs() < 1e-3);
/// ```
pub fn nelder_mead<F>(
    objective: F,
    initial: &[f64],
    bounds: Bounds<'_>,
    config: NelderMeadConfig,
) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let dim = initial.len();
    if dim == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let eval = |point: Vec<f64>| -> (Vec<f64>, f64) {
        let point = clamp(point, bounds);
        let value = objective(&point);
        (point, if value.is_nan() { f64::INFINITY } else { value })
    };

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(dim + 1);
    simplex.push(eval(initial.to_vec()));
    for i in 0..dim {
        let mut vertex = initial.to_vec();
        vertex[i] += if initial[i].abs() > 1e-10 {
            config.initial_step * initial[i].abs()
        } else {
            config.initial_step
        };
        simplex.push(eval(vertex));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        simplex.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        let best = simplex[0].1;
        let worst = simplex[dim].1;
        let second_worst = simplex[dim - 1].1;
        let centroid = centroid(&simplex[..dim]);

        let value_spread = worst - best;
        let size = simplex
            .iter()
            .map(|(v, _)| distance(v, &centroid))
            .fold(0.0, f64::max);
        if value_spread.abs() < config.tolerance || size < config.tolerance {
            converged = true;
            break;
        }

        let reflected = eval(along(&centroid, &simplex[dim].0, -config.alpha));

        if reflected.1 < best {
            let expanded = eval(along(&centroid, &reflected.0, config.gamma));
            simplex[dim] = if expanded.1 < reflected.1 {
                expanded
            } else {
                reflected
            };
            continue;
        }

        if reflected.1 < second_worst {
            simplex[dim] = reflected;
            continue;
        }

        let contracted = if reflected.1 < worst {
            eval(along(&centroid, &reflected.0, config.rho))
        } else {
            eval(along(&centroid, &simplex[dim].0, config.rho))
        };
        if contracted.1 < worst.min(reflected.1) {
            simplex[dim] = contracted;
            continue;
        }

        let anchor = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk = along(&anchor, &vertex.0, config.sigma);
            *vertex = eval(shrunk);
        }
    }

    let (optimal_point, optimal_value) = simplex
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .unwrap_or_else(|| (initial.to_vec(), f64::NAN));

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

/// `origin + t * (point - origin)`; negative `t` reflects through `origin`.
fn along(origin: &[f64], point: &[f64], t: f64) -> Vec<f64> {
    origin
        .iter()
        .zip(point)
        .map(|(o, p)| o + t * (p - o))
        .collect()
}

fn centroid(vertices: &[(Vec<f64>, f64)]) -> Vec<f64> {
    let dim = vertices[0].0.len();
    let mut c = vec![0.0; dim];
    for (v, _) in vertices {
        for (ci, vi) in c.iter_mut().zip(v) {
            *ci += vi;
        }
    }
    let count = vertices.len() as f64;
    c.iter_mut().for_each(|ci| *ci /= count);
    c
}

fn clamp(mut point: Vec<f64>, bounds: Bounds<'_>) -> Vec<f64> {
    if let Some(b) = bounds {
        for (x, &(lo, hi)) in point.iter_mut().zip(b) {
            *x = x.clamp(lo, hi);
        }
    }
    point
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}
