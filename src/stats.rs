//! Goodness-of-fit helpers used by the sampler tests: does an observed face
//! distribution plausibly come from the configured weights?

use claim::{debug_assert_ge, debug_assert_le};
use statrs::distribution::{ChiSquared, ContinuousCDF};

const EPS: f64 = 1e-10;

/// Return true iff `supp(p) ⊆ supp(q)` for dense PMFs `p` and `q`.
pub(crate) fn is_pmf_subset(p: &[f64], q: &[f64]) -> bool {
    // (q_i = 0 ==> p_i = 0) <==> (q_i > 0 ∨ p_i <= 0)
    p.iter()
        .zip(q.iter())
        .all(|(&p_i, &q_i)| (q_i > 0.0) || (p_i <= 0.0))
}

/// `D_{KL}(p || q) = Σ_i p_i * ln(p_i / q_i)` between dense PMFs `p` and `q`.
/// Requires absolute continuity: `q_i = 0` implies `p_i = 0`.
pub(crate) fn kl_divergence(p: &[f64], q: &[f64]) -> f64 {
    debug_assert!(is_pmf_subset(p, q));

    p.iter()
        .zip(q.iter())
        .map(|(&p_i, &q_i)| {
            if p_i > EPS && q_i > EPS {
                p_i * (p_i / q_i).ln()
            } else {
                0.0
            }
        })
        .sum()
}

/// The G-test statistic for `n` samples: asymptotically chi-squared, used to
/// compare an observed multinomial distribution `p_hat` against the expected
/// distribution `p`.
pub(crate) fn g_test(n: usize, p: &[f64], p_hat: &[f64]) -> f64 {
    (n as f64) * (2.0 * kl_divergence(p_hat, p))
}

/// The CDF of the chi-squared distribution with `dof` degrees of freedom.
pub(crate) fn chisq_cdf(dof: f64, x: f64) -> f64 {
    ChiSquared::new(dof).unwrap().cdf(x)
}

/// Goodness-of-fit test between a hypothesized multinomial distribution `p`
/// and an observed distribution `p_hat` built from `n` samples. Returns a
/// p-value; small values mean `p_hat` is implausible under `p`.
pub(crate) fn multinomial_test(n: usize, p: &[f64], p_hat: &[f64]) -> f64 {
    assert_eq!(p.len(), p_hat.len());

    // impossible to have drawn p_hat from p at all
    if !is_pmf_subset(p_hat, p) {
        return 0.0;
    }

    // dof = (# faces with positive probability) - 1
    let nnz = p.iter().filter(|&&p_i| p_i > 0.0).count() as f64;
    let dof = nnz - 1.0;

    debug_assert_le!(nnz, p.len() as f64);
    debug_assert_ge!(dof, 1.0);

    let g = g_test(n, p, p_hat);
    1.0 - chisq_cdf(dof, g)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use claim::{assert_gt, assert_lt};

    #[test]
    fn test_is_pmf_subset() {
        let p = [0.0, 0.0, 1.0];
        let q = [0.0, 0.5, 0.5];

        assert!(is_pmf_subset(&p, &p));
        assert!(is_pmf_subset(&q, &q));
        assert!(is_pmf_subset(&p, &q));
        assert!(!is_pmf_subset(&q, &p));
    }

    #[test]
    fn test_kl_divergence() {
        let p = [0.1, 0.3, 0.6];
        let q = [0.3, 0.3, 0.4];

        assert_relative_eq!(0.0_f64, kl_divergence(&p, &p));
        assert_relative_eq!(0.0_f64, kl_divergence(&q, &q));

        // 0.1*ln(0.1/0.3) + 0.3*ln(0.3/0.3) + 0.6*ln(0.6/0.4)
        assert_relative_eq!(0.13341783599808757_f64, kl_divergence(&p, &q));
        // 0.3*ln(0.3/0.1) + 0.3*ln(0.3/0.3) + 0.4*ln(0.4/0.6)
        assert_relative_eq!(0.16739764335716714_f64, kl_divergence(&q, &p));
    }

    #[test]
    fn test_multinomial_test_extremes() {
        let p = [0.5, 0.25, 0.25];

        // a perfect match can't be rejected at any level
        assert_gt!(multinomial_test(1_000, &p, &p), 0.999);

        // observed mass outside the hypothesis support is impossible
        let outside = [0.0, 0.5, 0.5];
        let p_degen = [1.0, 0.0, 0.0];
        assert_eq!(0.0, multinomial_test(1_000, &p_degen, &outside));

        // a blatant mismatch at large n is rejected
        let far = [0.05, 0.05, 0.9];
        assert_lt!(multinomial_test(10_000, &p, &far), 1e-6);
    }
}
