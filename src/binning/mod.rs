// binning/mod.rs
// Half-open interval binning of numeric observations

use serde::Serialize;
use thiserror::Error;

use crate::stats::safe_div;

pub mod frequency;

pub use frequency::frequency_median;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BinningError {
    #[error("bin edges must not be empty")]
    NoEdges,

    #[error("bin edge {index} is not finite")]
    NonFiniteEdge { index: usize },

    #[error("bin edges must be strictly increasing (edge {index}: {previous} >= {current})")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("bin step must be positive, got {0}")]
    InvalidStep(f64),

    #[error("{policy:?} binning needs at least two edges")]
    NoFiniteBins { policy: RangePolicy },

    #[error("value {value} is outside the binned range [{low}, {high})")]
    OutOfRange { value: f64, low: f64, high: f64 },

    #[error("cannot bin a NaN value")]
    NotANumber,
}

/// What happens to values that fall outside the finite edge range.
///
/// `OpenTail` treats the last edge as the start of an unbounded final bin,
/// so `N` edges give `N` bins. Every other policy only knows the `N - 1`
/// finite intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum RangePolicy {
    /// Values `>= edges[N-1]` go to bin `N-1`; values below `edges[0]` are an error.
    #[default]
    OpenTail,
    /// Out-of-range values are skipped and counted as dropped.
    Drop,
    /// Below-range values go to the first bin, above-range values to the last finite bin.
    Clamp,
    /// Any out-of-range value is an error.
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    pub fn new(edges: Vec<f64>) -> Result<Self, BinningError> {
        if edges.is_empty() {
            return Err(BinningError::NoEdges);
        }
        for (index, edge) in edges.iter().enumerate() {
            if !edge.is_finite() {
                return Err(BinningError::NonFiniteEdge { index });
            }
        }
        for (index, pair) in edges.windows(2).enumerate() {
            if pair[0] >= pair[1] {
                return Err(BinningError::NotIncreasing {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        Ok(Self { edges })
    }

    /// Edges `start, start + step, ...` strictly below `stop`.
    pub fn uniform(start: f64, stop: f64, step: f64) -> Result<Self, BinningError> {
        if step <= 0.0 || !step.is_finite() {
            return Err(BinningError::InvalidStep(step));
        }
        let count = ((stop - start) / step).ceil().max(0.0) as usize;
        let edges = (0..count).map(|i| start + i as f64 * step).collect();
        Self::new(edges)
    }

    /// Append one more boundary past the current last edge.
    pub fn with_closing_edge(self, edge: f64) -> Result<Self, BinningError> {
        let mut edges = self.edges;
        edges.push(edge);
        Self::new(edges)
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Lower boundary of a bin.
    pub fn lower(&self, bin: usize) -> f64 {
        self.edges[bin]
    }

    pub fn bin_count(&self, policy: RangePolicy) -> usize {
        match policy {
            RangePolicy::OpenTail => self.edges.len(),
            _ => self.edges.len() - 1,
        }
    }

    /// Bin index of `value` under `policy`. `Ok(None)` means the value was dropped.
    pub fn locate(&self, value: f64, policy: RangePolicy) -> Result<Option<usize>, BinningError> {
        if value.is_nan() {
            return Err(BinningError::NotANumber);
        }
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        // number of edges <= value; left-inclusive
        let at_or_below = self.edges.partition_point(|&edge| edge <= value);

        if policy == RangePolicy::OpenTail {
            if at_or_below == 0 {
                return Err(BinningError::OutOfRange {
                    value,
                    low: first,
                    high: f64::INFINITY,
                });
            }
            return Ok(Some(at_or_below - 1));
        }

        if self.edges.len() < 2 {
            return Err(BinningError::NoFiniteBins { policy });
        }
        if value >= first && value < last {
            return Ok(Some(at_or_below - 1));
        }
        match policy {
            RangePolicy::Drop => Ok(None),
            RangePolicy::Clamp if value < first => Ok(Some(0)),
            RangePolicy::Clamp => Ok(Some(self.edges.len() - 2)),
            _ => Err(BinningError::OutOfRange {
                value,
                low: first,
                high: last,
            }),
        }
    }
}

/// Per-bin counts produced by [`assign`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    counts: Vec<usize>,
    dropped: usize,
}

impl Assignment {
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn count(&self, bin: usize) -> usize {
        self.counts.get(bin).copied().unwrap_or(0)
    }

    /// Values skipped under [`RangePolicy::Drop`].
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Number of values placed in a bin.
    pub fn binned(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Occupied bins in index order.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(bin, &count)| (bin, count))
    }

    pub fn fractions(&self) -> Vec<f64> {
        fractions(&self.counts, self.binned())
    }
}

pub fn assign<I>(edges: &BinEdges, values: I, policy: RangePolicy) -> Result<Assignment, BinningError>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = vec![0usize; edges.bin_count(policy)];
    let mut dropped = 0usize;
    for value in values {
        match edges.locate(value, policy)? {
            Some(bin) => counts[bin] += 1,
            None => dropped += 1,
        }
    }
    Ok(Assignment { counts, dropped })
}

/// One occupied bin, reported in the order its first value was seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Occurrence {
    pub bin: usize,
    pub lower: f64,
    pub count: usize,
}

/// Bin `values` and list the occupied bins in first-seen order.
pub fn discretise<I>(edges: &BinEdges, values: I, policy: RangePolicy) -> Result<Vec<Occurrence>, BinningError>
where
    I: IntoIterator<Item = f64>,
{
    let mut slot: Vec<Option<usize>> = vec![None; edges.bin_count(policy)];
    let mut occurrences: Vec<Occurrence> = Vec::new();
    for value in values {
        let Some(bin) = edges.locate(value, policy)? else {
            continue;
        };
        match slot[bin] {
            Some(position) => occurrences[position].count += 1,
            None => {
                slot[bin] = Some(occurrences.len());
                occurrences.push(Occurrence {
                    bin,
                    lower: edges.lower(bin),
                    count: 1,
                });
            }
        }
    }
    Ok(occurrences)
}

/// `count / total` per bin. A zero total yields all zeros.
pub fn fractions(counts: &[usize], total: usize) -> Vec<f64> {
    counts
        .iter()
        .map(|&count| safe_div(count as f64, total as f64))
        .collect()
}
