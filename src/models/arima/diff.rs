//! Differencing utilities for ARIMA models.

/// Difference `series` `d` times. Each pass shortens the series by one.
pub fn difference(series: &[f64], d: usize) -> Vec<f64> {
    let mut result = series.to_vec();
    for _ in 0..d {
        if result.len() <= 1 {
            break;
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

/// Undo `d` rounds of differencing on a continuation of `history`.
///
/// `differenced` holds values on the `d`-times differenced scale that follow
/// the end of `history`; the result is on the scale of `history`.
pub fn integrate(differenced: &[f64], history: &[f64], d: usize) -> Vec<f64> {
    let mut result = differenced.to_vec();
    for level in (0..d).rev() {
        let anchor = difference(history, level).last().copied().unwrap_or(0.0);
        result = result
            .iter()
            .scan(anchor, |acc, &step| {
                *acc += step;
                Some(*acc)
            })
            .collect();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_second_differences() {
        let x = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&x, 0), x.to_vec());
        assert_eq!(difference(&x, 1), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&x, 2), vec![2.0, 2.0, 2.0]);
        assert_eq!(difference(&[1.0], 3), vec![1.0]);
    }

    #[test]
    fn integrate_continues_squares() {
        let history = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(integrate(&[2.0, 2.0], &history, 2), vec![36.0, 49.0]);
        assert_eq!(integrate(&[11.0], &history, 1), vec![36.0]);
        assert_eq!(integrate(&[7.0], &history, 0), vec![7.0]);
    }
}
