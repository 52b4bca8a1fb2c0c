//! Numeric kernels shared by the estimation engines
//!
//! Logistic math, Shannon entropy, a scalar Newton-Raphson driver, and
//! Gauss-Hermite quadrature tables. All kernels are synchronous, pure and
//! operate in f64 end to end; the 41-node Hermite weights reach subnormal
//! magnitudes and must not pass through a narrower type.

use logos_types::{LogosError, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use once_cell::sync::Lazy;

/// Floor applied to probabilities before logs are taken
pub const PROB_FLOOR: f64 = 1e-10;

/// Logistic sigmoid clamped to [PROB_FLOOR, 1 - PROB_FLOOR] so that
/// downstream log-likelihoods stay finite
pub fn sigmoid(x: f64) -> f64 {
    let p = 1.0 / (1.0 + (-x).exp());
    p.clamp(PROB_FLOOR, 1.0 - PROB_FLOOR)
}

/// Inverse of the logistic sigmoid
pub fn logit(p: f64) -> f64 {
    let p = p.clamp(PROB_FLOOR, 1.0 - PROB_FLOOR);
    (p / (1.0 - p)).ln()
}

/// Shannon entropy in bits over a set of non-negative counts.
///
/// Zero counts contribute nothing; an empty or all-zero slice has zero
/// entropy.
pub fn shannon_entropy(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().filter(|c| **c > 0.0).sum();
    if total <= 0.0 {
        return 0.0;
    }
    counts
        .iter()
        .filter(|c| **c > 0.0)
        .map(|c| {
            let p = c / total;
            -p * p.log2()
        })
        .sum()
}

/// Entropy normalized by the maximum achievable over the non-zero
/// categories: 1.0 iff all non-zero counts are equal, 0.0 iff at most one
/// category is non-zero.
pub fn normalized_entropy(counts: &[f64]) -> f64 {
    let nonzero = counts.iter().filter(|c| **c > 0.0).count();
    if nonzero <= 1 {
        return 0.0;
    }
    let h = shannon_entropy(counts);
    let h_max = (nonzero as f64).log2();
    (h / h_max).clamp(0.0, 1.0)
}

/// Outcome of a Newton-Raphson run
#[derive(Debug, Clone, Copy)]
pub struct NewtonOutcome {
    /// Final (possibly clamped) argument value
    pub value: f64,
    /// Iterations actually performed
    pub iterations: usize,
    /// Whether the unclamped step size fell below tolerance
    pub converged: bool,
    /// Whether a vanishing derivative stopped the iteration
    pub singular: bool,
}

/// Options for [`newton_raphson`]
#[derive(Debug, Clone, Copy)]
pub struct NewtonOptions {
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Inclusive clamp applied to the argument after every step
    pub bounds: (f64, f64),
}

impl Default for NewtonOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-3,
            max_iterations: 50,
            bounds: (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}

/// Scalar Newton-Raphson ascent on a function given by its first and
/// second derivatives.
///
/// `grad_hess` returns (gradient, second derivative) at the current
/// argument. Convergence is judged on the unclamped step so that an
/// estimate pinned against a bound does not report spurious convergence.
/// A second derivative within `1e-12` of zero stops the iteration with
/// `singular = true`; the caller decides how to degrade.
pub fn newton_raphson<F>(start: f64, grad_hess: F, options: &NewtonOptions) -> NewtonOutcome
where
    F: Fn(f64) -> (f64, f64),
{
    let (lo, hi) = options.bounds;
    let mut x = start.clamp(lo, hi);
    for iteration in 1..=options.max_iterations {
        let (grad, hess) = grad_hess(x);
        if hess.abs() < 1e-12 {
            return NewtonOutcome {
                value: x,
                iterations: iteration,
                converged: false,
                singular: true,
            };
        }
        let step = -grad / hess;
        x = (x + step).clamp(lo, hi);
        if step.abs() < options.tolerance {
            return NewtonOutcome {
                value: x,
                iterations: iteration,
                converged: true,
                singular: false,
            };
        }
    }
    NewtonOutcome {
        value: x,
        iterations: options.max_iterations,
        converged: false,
        singular: false,
    }
}

/// Node counts for the pre-built Gauss-Hermite tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuadratureGrade {
    /// 5 nodes, coarse screening only
    Coarse,
    /// 11 nodes, real-time feedback
    Fast,
    /// 21 nodes, default for in-session updates
    Session,
    /// 41 nodes, end-of-session scoring
    Final,
}

impl QuadratureGrade {
    pub fn node_count(&self) -> usize {
        match self {
            QuadratureGrade::Coarse => 5,
            QuadratureGrade::Fast => 11,
            QuadratureGrade::Session => 21,
            QuadratureGrade::Final => 41,
        }
    }
}

/// A Gauss-Hermite quadrature rule for weight function exp(-x^2)
#[derive(Debug, Clone)]
pub struct GaussHermite {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
}

impl GaussHermite {
    /// Build an n-node rule with the Golub-Welsch algorithm: the nodes are
    /// the eigenvalues of the symmetric tridiagonal Jacobi matrix with
    /// off-diagonal sqrt(i/2), and each weight is sqrt(pi) times the
    /// squared first component of the corresponding unit eigenvector.
    pub fn build(n: usize) -> Result<Self> {
        if n < 2 {
            return Err(LogosError::InvalidInput(format!(
                "Gauss-Hermite rule needs at least 2 nodes, got {}",
                n
            )));
        }
        let mut jacobi = DMatrix::<f64>::zeros(n, n);
        for i in 1..n {
            let beta = (i as f64 / 2.0).sqrt();
            jacobi[(i - 1, i)] = beta;
            jacobi[(i, i - 1)] = beta;
        }
        let eigen = SymmetricEigen::new(jacobi);
        let sqrt_pi = std::f64::consts::PI.sqrt();
        let mut pairs: Vec<(f64, f64)> = (0..n)
            .map(|i| {
                let first = eigen.eigenvectors[(0, i)];
                (eigen.eigenvalues[i], sqrt_pi * first * first)
            })
            .collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self {
            nodes: pairs.iter().map(|p| p.0).collect(),
            weights: pairs.iter().map(|p| p.1).collect(),
        })
    }

    /// Pre-built rule for one of the supported grades
    pub fn for_grade(grade: QuadratureGrade) -> &'static GaussHermite {
        match grade {
            QuadratureGrade::Coarse => &HERMITE_5,
            QuadratureGrade::Fast => &HERMITE_11,
            QuadratureGrade::Session => &HERMITE_21,
            QuadratureGrade::Final => &HERMITE_41,
        }
    }

    /// Nodes transformed to integrate against a Normal(mean, sd) density:
    /// x_i = mean + sd * sqrt(2) * node_i
    pub fn transformed_nodes(&self, mean: f64, sd: f64) -> Vec<f64> {
        let scale = sd * std::f64::consts::SQRT_2;
        self.nodes.iter().map(|x| mean + scale * x).collect()
    }
}

static HERMITE_5: Lazy<GaussHermite> =
    Lazy::new(|| GaussHermite::build(5).expect("static 5-node rule"));
static HERMITE_11: Lazy<GaussHermite> =
    Lazy::new(|| GaussHermite::build(11).expect("static 11-node rule"));
static HERMITE_21: Lazy<GaussHermite> =
    Lazy::new(|| GaussHermite::build(21).expect("static 21-node rule"));
static HERMITE_41: Lazy<GaussHermite> =
    Lazy::new(|| GaussHermite::build(41).expect("static 41-node rule"));
