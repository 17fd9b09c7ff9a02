use crate::data::model::{EconomicTable, HealthTable};

use super::merge::join_on_country_year;

/// Pearson product-moment correlation.
///
/// `None` with fewer than two pairs, mismatched lengths, a non-finite
/// value, or a series with no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return None;
    }
    if !xs.iter().chain(ys).all(|v| v.is_finite()) {
        return None;
    }
    let nf = n as f64;
    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    // Rounding can push |r| a hair past 1.
    Some(r.clamp(-1.0, 1.0))
}

/// Correlation between a health column and the economic values over the
/// country-years both tables share.
pub fn indicator_correlation(
    health: &HealthTable,
    economic: &EconomicTable,
    column: &str,
) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = join_on_country_year(health, economic)
        .into_iter()
        .filter_map(|j| Some((j.health.value(column)?, j.economic_value)))
        .unzip();
    pearson(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn perfect_positive_and_negative() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0));
        assert!(approx_eq(pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0));
    }

    #[test]
    fn symmetric() {
        let a = [3.0, 1.5, 9.0, 4.2, 7.7, 0.3];
        let b = [10.0, 2.0, 13.0, 8.0, 1.0, 5.5];
        assert_eq!(pearson(&a, &b), pearson(&b, &a));
    }

    #[test]
    fn undefined_cases() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn non_finite_input_is_undefined() {
        assert_eq!(pearson(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 4.0]), None);
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[1.0, f64::INFINITY, 4.0]), None);
    }

    #[test]
    fn known_value() {
        // numpy.corrcoef([1, 2, 3, 4, 5], [2, 4, 5, 4, 5])[0, 1]
        let r = pearson(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 4.0, 5.0, 4.0, 5.0]).unwrap();
        assert!((r - 0.774_596_669_241_483_4).abs() < 1e-12);
    }
}
