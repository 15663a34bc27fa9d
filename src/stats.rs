// stats.rs
// Basic reductions shared by the experiment reducers

/// Division with the zero-denominator policy used throughout the crate:
/// a zero denominator is replaced by 1.
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        numerator
    } else {
        numerator / denominator
    }
}

pub fn sum(values: &[f64]) -> f64 {
    values.iter().sum()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(sum(values) / values.len() as f64)
}

/// Median of samples; averages the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// `n - 1` cut points dividing `values` into `n` groups (exclusive method).
///
/// Returns `None` for an empty sample or `n == 0`. A single sample yields
/// that sample repeated.
pub fn quantiles(values: &[f64], n: usize) -> Option<Vec<f64>> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    exclusive_quantiles(sorted.len(), n, |i| sorted[i])
}

/// Exclusive quantiles of the sample described by per-class counts, where
/// class `i` stands for the value `i` repeated `counts[i]` times.
pub fn frequency_quantiles(counts: &[u64], n: usize) -> Option<Vec<f64>> {
    let mut cumulative = Vec::with_capacity(counts.len());
    let mut running = 0u64;
    for &count in counts {
        running += count;
        cumulative.push(running);
    }
    let total = usize::try_from(running).ok()?;
    exclusive_quantiles(total, n, |position| {
        let rank = position as u64;
        cumulative.partition_point(|&seen| seen <= rank) as f64
    })
}

fn exclusive_quantiles<F>(len: usize, n: usize, sample: F) -> Option<Vec<f64>>
where
    F: Fn(usize) -> f64,
{
    if len == 0 || n == 0 {
        return None;
    }
    if len == 1 {
        return Some(vec![sample(0); n - 1]);
    }
    let m = len + 1;
    let cuts = (1..n)
        .map(|i| {
            let j = (i * m / n).clamp(1, len - 1);
            let delta = (i * m) as f64 - (j * n) as f64;
            (sample(j - 1) * (n as f64 - delta) + sample(j) * delta) / n as f64
        })
        .collect();
    Some(cuts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn safe_div_replaces_zero_denominator() {
        assert_eq!(safe_div(6.0, 3.0), 2.0);
        assert_eq!(safe_div(6.0, 0.0), 6.0);
        assert_eq!(safe_div(0.0, 0.0), 0.0);
    }

    #[test]
    fn mean_and_median() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn quartiles_match_exclusive_method() {
        // reference: statistics.quantiles([1..=10], n=4) == [2.75, 5.5, 8.25]
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        let q = quantiles(&data, 4).unwrap();
        assert!(close(q[0], 2.75) && close(q[1], 5.5) && close(q[2], 8.25), "{q:?}");

        // reference: statistics.quantiles([1, 2, 3], n=4) == [1.0, 2.0, 3.0]
        let q = quantiles(&[3.0, 1.0, 2.0], 4).unwrap();
        assert_eq!(q, vec![1.0, 2.0, 3.0]);

        // reference: statistics.quantiles([10, 20], n=4) == [7.5, 15.0, 22.5]
        let q = quantiles(&[20.0, 10.0], 4).unwrap();
        assert_eq!(q, vec![7.5, 15.0, 22.5]);
    }

    #[test]
    fn quantiles_edge_cases() {
        assert_eq!(quantiles(&[], 4), None);
        assert_eq!(quantiles(&[7.0], 4), Some(vec![7.0, 7.0, 7.0]));
        assert_eq!(quantiles(&[1.0, 2.0], 1), Some(vec![]));
    }

    #[test]
    fn frequency_quantiles_match_flattened_sample() {
        let counts = [0u64, 3, 0, 2, 5, 1];
        let mut flat = Vec::new();
        for (class, &count) in counts.iter().enumerate() {
            flat.extend(std::iter::repeat(class as f64).take(count as usize));
        }
        assert_eq!(frequency_quantiles(&counts, 4), quantiles(&flat, 4));
        assert_eq!(frequency_quantiles(&[0, 0], 4), None);
    }
}
