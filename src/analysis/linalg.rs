//! Small dense routines for the normal equations.
//!
//! Matrices are row-major `Vec<f64>` of size `n * n`.

/// Maximum number of Jacobi sweeps.
const MAX_SWEEPS: usize = 100;

/// Eigenvalues below `RCOND * largest` are treated as zero.
const RCOND: f64 = 1e-10;

/// Eigendecomposition of a symmetric matrix, `A = V diag(d) V^T`.
#[derive(Debug, Clone)]
pub struct SymmetricEigen {
    pub eigenvalues: Vec<f64>,
    /// Eigenvectors as columns, row-major.
    pub eigenvectors: Vec<f64>,
}

/// Cyclic Jacobi eigenvalue algorithm. `a` must be symmetric.
#[allow(clippy::many_single_char_names)]
pub fn symmetric_eigen(a: &[f64], n: usize) -> SymmetricEigen {
    debug_assert_eq!(a.len(), n * n);
    let mut s = a.to_vec();
    let mut v = vec![0.0; n * n];
    for i in 0..n {
        v[i * n + i] = 1.0;
    }

    let scale = s.iter().fold(0.0_f64, |m, x| m.max(x.abs())).max(1.0);
    let tol = f64::EPSILON * scale;

    for _sweep in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += s[i * n + j] * s[i * n + j];
            }
        }
        if off.sqrt() < tol {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = s[p * n + q];
                if apq.abs() < tol * 1e-3 {
                    continue;
                }
                let app = s[p * n + p];
                let aqq = s[q * n + q];

                let theta = (aqq - app) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let sn = t * c;

                s[p * n + p] = app - t * apq;
                s[q * n + q] = aqq + t * apq;
                s[p * n + q] = 0.0;
                s[q * n + p] = 0.0;

                for r in 0..n {
                    if r == p || r == q {
                        continue;
                    }
                    let srp = s[r * n + p];
                    let srq = s[r * n + q];
                    s[r * n + p] = c * srp - sn * srq;
                    s[p * n + r] = s[r * n + p];
                    s[r * n + q] = sn * srp + c * srq;
                    s[q * n + r] = s[r * n + q];
                }

                for i in 0..n {
                    let vp = v[i * n + p];
                    let vq = v[i * n + q];
                    v[i * n + p] = c * vp - sn * vq;
                    v[i * n + q] = sn * vp + c * vq;
                }
            }
        }
    }

    SymmetricEigen {
        eigenvalues: (0..n).map(|i| s[i * n + i]).collect(),
        eigenvectors: v,
    }
}

/// Minimum-norm solution of `A x = b` for symmetric positive semi-definite
/// `A`, via the pseudo-inverse `V diag(1/d) V^T`.
pub fn solve_psd(a: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let eig = symmetric_eigen(a, n);
    let largest = eig
        .eigenvalues
        .iter()
        .fold(0.0_f64, |m, d| m.max(d.abs()));
    let cutoff = largest * RCOND;

    let mut x = vec![0.0; n];
    for k in 0..n {
        let d = eig.eigenvalues[k];
        if d <= cutoff || d <= 0.0 {
            continue;
        }
        // (v_k . b) / d_k
        let mut proj = 0.0;
        for i in 0..n {
            proj += eig.eigenvectors[i * n + k] * b[i];
        }
        let w = proj / d;
        for i in 0..n {
            x[i] += w * eig.eigenvectors[i * n + k];
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &[f64], b: &[f64], tol: f64) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| (x - y).abs() < tol)
    }

    #[test]
    fn eigenvalues_of_2x2() {
        let eig = symmetric_eigen(&[2.0, 1.0, 1.0, 3.0], 2);
        let mut vals = eig.eigenvalues.clone();
        vals.sort_by(f64::total_cmp);
        let r5 = 5.0_f64.sqrt();
        assert!(approx_eq(&vals, &[(5.0 - r5) / 2.0, (5.0 + r5) / 2.0], 1e-12));
    }

    #[test]
    fn reconstructs_matrix() {
        let a = [4.0, 1.0, 2.0, 1.0, 3.0, 0.5, 2.0, 0.5, 5.0];
        let eig = symmetric_eigen(&a, 3);
        let mut back = [0.0; 9];
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    back[i * 3 + j] += eig.eigenvectors[i * 3 + k]
                        * eig.eigenvalues[k]
                        * eig.eigenvectors[j * 3 + k];
                }
            }
        }
        assert!(approx_eq(&back, &a, 1e-10));
    }

    #[test]
    fn solves_full_rank_system() {
        // [[2, 1], [1, 3]] x = [3, 5]  =>  x = [0.8, 1.4]
        let x = solve_psd(&[2.0, 1.0, 1.0, 3.0], &[3.0, 5.0], 2);
        assert!(approx_eq(&x, &[0.8, 1.4], 1e-12));
    }

    #[test]
    fn singular_system_gets_minimum_norm() {
        // [[1, 1], [1, 1]] x = [2, 2]: every x with x0 + x1 = 2 solves it,
        // the smallest is [1, 1].
        let x = solve_psd(&[1.0, 1.0, 1.0, 1.0], &[2.0, 2.0], 2);
        assert!(approx_eq(&x, &[1.0, 1.0], 1e-12));
    }
}
