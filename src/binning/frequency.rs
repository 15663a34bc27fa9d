// binning/frequency.rs
// Median of a pre-aggregated (value, frequency) table

/// Median of a table of `(value, frequency)` pairs.
///
/// Walks the value-sorted table accumulating frequency until the lower
/// median rank `ceil(n/2)` and the upper median rank `floor(n/2) + 1` are
/// reached, then returns the floored average of the two values found.
/// Returns `None` when the table holds no samples.
pub fn frequency_median(table: &[(i64, u64)]) -> Option<i64> {
    let total: u64 = table.iter().map(|&(_, freq)| freq).sum();
    if total == 0 {
        return None;
    }
    let lower_rank = total.div_ceil(2);
    let upper_rank = total / 2 + 1;

    let mut sorted: Vec<(i64, u64)> = table.to_vec();
    sorted.sort_by_key(|&(value, _)| value);

    let mut lower = None;
    let mut upper = None;
    let mut seen = 0u64;
    for (value, freq) in sorted {
        seen += freq;
        if lower.is_none() && seen >= lower_rank {
            lower = Some(value);
        }
        if upper.is_none() && seen >= upper_rank {
            upper = Some(value);
        }
        if let (Some(a), Some(b)) = (lower, upper) {
            return Some((a + b).div_euclid(2));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_walks_multiplicities() {
        assert_eq!(frequency_median(&[(1, 1), (2, 2), (3, 1)]), Some(2));
    }

    #[test]
    fn split_pairs_give_same_median() {
        assert_eq!(frequency_median(&[(3, 4)]), Some(3));
        assert_eq!(frequency_median(&[(3, 2), (3, 2)]), Some(3));
        assert_eq!(
            frequency_median(&[(5, 3), (9, 1), (2, 2)]),
            frequency_median(&[(5, 1), (2, 1), (9, 1), (5, 2), (2, 1)])
        );
    }

    #[test]
    fn unsorted_input_is_sorted_by_value() {
        // samples: 1 1 4 4 4 10 -> ranks 3 and 4 -> 4 and 4
        assert_eq!(frequency_median(&[(10, 1), (4, 3), (1, 2)]), Some(4));
    }

    #[test]
    fn even_count_averages_and_floors() {
        // samples: 1 2 -> (1 + 2) / 2 floored
        assert_eq!(frequency_median(&[(1, 1), (2, 1)]), Some(1));
        // samples: 2 2 5 5 -> (2 + 5) / 2 floored
        assert_eq!(frequency_median(&[(2, 2), (5, 2)]), Some(3));
    }

    #[test]
    fn odd_count_picks_middle_sample() {
        assert_eq!(frequency_median(&[(1, 1), (2, 1), (3, 1)]), Some(2));
    }

    #[test]
    fn zero_value_is_a_real_value() {
        assert_eq!(frequency_median(&[(0, 5), (7, 1)]), Some(0));
    }

    #[test]
    fn empty_table_has_no_median() {
        assert_eq!(frequency_median(&[]), None);
        assert_eq!(frequency_median(&[(4, 0)]), None);
    }

    #[test]
    fn zero_frequencies_are_skipped() {
        assert_eq!(frequency_median(&[(1, 0), (6, 3), (9, 0)]), Some(6));
    }
}
