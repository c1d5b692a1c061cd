/**
 * Euclidean (L2) norm of a sequence of values.
 */
pub fn norm<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    values.into_iter().map(|v| v * v).sum::<f64>().sqrt()
}

/**
 * L2 norm of the elementwise difference of two equally long sequences.
 */
pub fn diff_norm(first: &[f64], second: &[f64]) -> Result<f64, String> {
    match first.len() == second.len() {
        false => Err(format!(
            "Length mismatch; {} vs {}",
            first.len(),
            second.len()
        )),
        true => Ok(norm(first.iter().zip(second).map(|(a, b)| a - b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(left: f64, right: f64, d: f64) -> bool {
        (left - right).abs() < d
    }

    #[test]
    fn test_norm_pythagorean() {
        assert!(close(norm([3., 4.]), 5., 1e-12));
    }

    #[test]
    fn test_norm_empty() {
        assert_eq!(norm(std::iter::empty()), 0.);
    }

    #[test]
    fn test_diff_norm() {
        let d = diff_norm(&[2., 3., 1., 1., 1.], &[4., 2., 1., 2., 1.]).unwrap();
        assert!(close(d, 6_f64.sqrt(), 1e-12));
    }

    #[test]
    #[should_panic]
    fn test_diff_norm_length_mismatch() {
        diff_norm(&[1., 2.], &[1.]).unwrap();
    }
}
