//! Isolation forest outlier model for one-dimensional data.
//!
//! Points that are easy to separate from the rest by random axis splits end
//! up close to the root of random trees; their average path length is short
//! and their score low. The decision offset is the `contamination`
//! percentile of the training scores, so roughly that fraction of the
//! training set is labelled anomalous.
//!
//! Scores follow the usual convention: `-2^(-E[h(x)] / c(psi))`, in
//! `[-1, 0)`, lower is more anomalous.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{AnomalyLabel, SatmonError};

/// Euler–Mascheroni constant, for the harmonic-number approximation.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Upper bound on points drawn per tree.
pub const DEFAULT_MAX_SAMPLES: usize = 256;

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsolationForestParams {
    pub n_estimators: usize,
    /// Expected outlier fraction, in `(0, 0.5]`.
    pub contamination: f64,
    pub random_seed: u64,
    pub max_samples: usize,
}

impl Default for IsolationForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            contamination: 0.01,
            random_seed: 42,
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

impl IsolationForestParams {
    pub fn validate(&self) -> Result<(), SatmonError> {
        if self.n_estimators == 0 {
            return Err(SatmonError::invalid_parameter(
                "n_estimators",
                "must be at least 1",
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(SatmonError::invalid_parameter(
                "contamination",
                format!("must be in (0, 0.5], got {}", self.contamination),
            ));
        }
        if self.max_samples == 0 {
            return Err(SatmonError::invalid_parameter(
                "max_samples",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Trees
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

fn build_tree(values: Vec<f64>, depth: usize, max_depth: usize, rng: &mut StdRng) -> Node {
    if depth >= max_depth || values.len() <= 1 {
        return Node::Leaf { size: values.len() };
    }

    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    if max <= min {
        // constant node, nothing left to isolate
        return Node::Leaf { size: values.len() };
    }

    let mut threshold = min + rng.gen_range(0.0..1.0) * (max - min);
    if threshold >= max {
        threshold = min;
    }

    let (left, right): (Vec<f64>, Vec<f64>) = values.into_iter().partition(|&v| v <= threshold);

    Node::Split {
        threshold,
        left: Box::new(build_tree(left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(right, depth + 1, max_depth, rng)),
    }
}

fn path_length(tree: &Node, x: f64) -> f64 {
    let mut node = tree;
    let mut depth = 0.0;
    loop {
        match node {
            Node::Leaf { size } => return depth + average_path_length(*size),
            Node::Split {
                threshold,
                left,
                right,
            } => {
                node = if x <= *threshold { left } else { right };
                depth += 1.0;
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree
/// of `n` points. Used both to normalise scores and to credit leaves that
/// still hold several points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile (`q` in `[0, 100]`) of unsorted values.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Some(sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo]))
}

// ============================================================================
// Forest
// ============================================================================

/// Isolation forest over one feature.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    params: IsolationForestParams,
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    pub fn new(params: IsolationForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            sample_size: 0,
            offset: 0.0,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Decision offset derived from the training scores.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Grow the forest on `data` and set the decision offset.
    ///
    /// Each tree draws `min(max_samples, n)` points without replacement and
    /// is limited to `ceil(log2(sample_size))` levels.
    pub fn fit(&mut self, data: &[f64]) -> Result<(), SatmonError> {
        self.params.validate()?;
        if data.is_empty() {
            return Err(SatmonError::invalid_parameter(
                "data",
                "cannot fit on zero points",
            ));
        }

        let n = data.len();
        let sample_size = self.params.max_samples.min(n);
        let max_depth = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.params.random_seed);

        self.trees = (0..self.params.n_estimators)
            .map(|_| {
                let sample: Vec<f64> = rand::seq::index::sample(&mut rng, n, sample_size)
                    .into_iter()
                    .map(|i| data[i])
                    .collect();
                build_tree(sample, 0, max_depth, &mut rng)
            })
            .collect();
        self.sample_size = sample_size;

        let scores = self.score(data)?;
        self.offset = percentile(&scores, 100.0 * self.params.contamination)
            .ok_or_else(|| SatmonError::invalid_parameter("data", "no scores computed"))?;

        Ok(())
    }

    /// Raw scores, lower is more anomalous.
    pub fn score(&self, data: &[f64]) -> Result<Vec<f64>, SatmonError> {
        if !self.is_fitted() {
            return Err(SatmonError::invalid_parameter(
                "model",
                "not fitted: call fit() before score()",
            ));
        }

        let normaliser = average_path_length(self.sample_size);
        let n_trees = self.trees.len() as f64;

        Ok(data
            .iter()
            .map(|&x| {
                let mean_depth =
                    self.trees.iter().map(|t| path_length(t, x)).sum::<f64>() / n_trees;
                let ratio = if normaliser > 0.0 {
                    mean_depth / normaliser
                } else {
                    1.0
                };
                -(2f64.powf(-ratio))
            })
            .collect())
    }

    /// Label each point: anomalous iff its score falls below the offset.
    pub fn predict(&self, data: &[f64]) -> Result<Vec<AnomalyLabel>, SatmonError> {
        Ok(self
            .score(data)?
            .into_iter()
            .map(|s| label_for(s, self.offset))
            .collect())
    }

    /// Fit on `data` and return `(scores, labels)` for the same points.
    pub fn fit_predict(
        &mut self,
        data: &[f64],
    ) -> Result<(Vec<f64>, Vec<AnomalyLabel>), SatmonError> {
        self.fit(data)?;
        let scores = self.score(data)?;
        let labels = scores.iter().map(|&s| label_for(s, self.offset)).collect();
        Ok((scores, labels))
    }
}

fn label_for(score: f64, offset: f64) -> AnomalyLabel {
    if score - offset < 0.0 {
        AnomalyLabel::Anomaly
    } else {
        AnomalyLabel::Normal
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn params(contamination: f64) -> IsolationForestParams {
        IsolationForestParams {
            contamination,
            ..IsolationForestParams::default()
        }
    }

    fn anomaly_indices(labels: &[AnomalyLabel]) -> Vec<usize> {
        labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.is_anomaly().then_some(i))
            .collect()
    }

    #[test]
    fn test_average_path_length_small_cases() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // 2 * (ln 3 + gamma) - 2 * 3/4
        let expected = 2.0 * (3f64.ln() + EULER_GAMMA) - 1.5;
        assert!((average_path_length(4) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_interpolates_linearly() {
        let values = [5.0, 1.0, 3.0, 2.0, 4.0];
        assert_eq!(percentile(&values, 0.0), Some(1.0));
        assert_eq!(percentile(&values, 100.0), Some(5.0));
        assert_eq!(percentile(&values, 50.0), Some(3.0));
        let p20 = percentile(&values, 20.0).unwrap();
        assert!((p20 - 1.8).abs() < 1e-12, "rank 0.8 between 1 and 2, got {}", p20);
        assert_eq!(percentile(&[], 10.0), None);
    }

    #[test]
    fn test_single_step_is_the_only_anomaly() {
        // diffs: 0, 0, 0, 25, 0
        let diffs = [0.0, 0.0, 0.0, 25.0, 0.0];
        let mut forest = IsolationForest::new(params(0.2));
        let (scores, labels) = forest.fit_predict(&diffs).expect("fit should succeed");

        assert_eq!(anomaly_indices(&labels), vec![3]);
        assert!(scores[3] < scores[0]);
    }

    #[test]
    fn test_spike_flags_only_large_differences() {
        // [70, 70, 70, 95, 70] differenced
        let diffs = [0.0, 0.0, 0.0, 25.0, -25.0];

        let mut forest = IsolationForest::new(params(0.2));
        let labels = {
            forest.fit(&diffs).unwrap();
            forest.predict(&diffs).unwrap()
        };
        let flagged = anomaly_indices(&labels);
        assert_eq!(flagged.len(), 1, "one in five must be flagged, got {:?}", flagged);
        assert!(flagged.iter().all(|&i| i == 3 || i == 4), "flagged {:?}", flagged);

        let mut forest = IsolationForest::new(params(0.4));
        let (_, labels) = forest.fit_predict(&diffs).unwrap();
        assert_eq!(anomaly_indices(&labels), vec![3, 4]);
    }

    #[test]
    fn test_same_seed_same_scores() {
        let data: Vec<f64> = (0..400)
            .map(|i| ((i * 37) % 11) as f64 * 0.1 + if i % 97 == 0 { 8.0 } else { 0.0 })
            .collect();

        let mut a = IsolationForest::new(params(0.01));
        let mut b = IsolationForest::new(params(0.01));
        let (scores_a, labels_a) = a.fit_predict(&data).unwrap();
        let (scores_b, labels_b) = b.fit_predict(&data).unwrap();

        assert_eq!(scores_a, scores_b);
        assert_eq!(labels_a, labels_b);
        assert_eq!(a.offset(), b.offset());
    }

    #[test]
    fn test_constant_data_has_no_anomalies() {
        let data = [0.0; 50];
        let mut forest = IsolationForest::new(params(0.1));
        let (scores, labels) = forest.fit_predict(&data).unwrap();
        assert!(scores.iter().all(|&s| s == scores[0]));
        assert!(labels.iter().all(|l| !l.is_anomaly()));
    }

    #[test]
    fn test_single_point_is_normal() {
        let mut forest = IsolationForest::new(params(0.1));
        let (scores, labels) = forest.fit_predict(&[0.0]).unwrap();
        assert_eq!(scores, vec![-0.5]);
        assert_eq!(labels, vec![AnomalyLabel::Normal]);
    }

    #[test]
    fn test_scores_are_in_unit_range() {
        let data: Vec<f64> = (0..300).map(|i| (i as f64 * 0.7).sin()).collect();
        let mut forest = IsolationForest::new(params(0.05));
        forest.fit(&data).unwrap();
        for s in forest.score(&data).unwrap() {
            assert!((-1.0..0.0).contains(&s), "score {} out of range", s);
        }
    }

    #[test]
    fn test_score_before_fit_is_an_error() {
        let forest = IsolationForest::new(IsolationForestParams::default());
        assert!(forest.score(&[1.0]).is_err());
    }

    #[test]
    fn test_fit_rejects_empty_and_bad_params() {
        let mut forest = IsolationForest::new(IsolationForestParams::default());
        assert!(forest.fit(&[]).is_err());

        let mut forest = IsolationForest::new(params(0.9));
        assert!(matches!(
            forest.fit(&[1.0, 2.0]),
            Err(SatmonError::InvalidParameter { .. })
        ));
    }
}
