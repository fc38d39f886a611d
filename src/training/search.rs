//! Exhaustive hyperparameter grid search with k-fold cross-validation.
//!
//! Every (candidate, fold) pair is an independent fit-and-score task;
//! the set of tasks fans out over the rayon pool with no shared mutable
//! state, and selection is a plain arg-max over mean fold scores. The
//! winning combination is refit on the full training split.
//!
//! Equal-best ties resolve to the first candidate in enumeration order
//! ([`ParamGrid::candidates`]: `n_trees` outermost, `min_samples_leaf`
//! innermost).

use ndarray::{ArrayView1, ArrayView2};
use thiserror::Error;

use crate::forest::{ConfigError, ForestError, RandomForestConfig, RandomForestRegressor};
use crate::utils::Parallelism;

use super::logger::SearchLogger;
use super::metrics::MetricFn;
use super::split::{take_rows, take_values, KFoldPlan, SplitError};

/// Errors from grid-search execution.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("parameter grid axis `{0}` is empty")]
    EmptyGridAxis(&'static str),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Split(#[from] SplitError),

    #[error(transparent)]
    Forest(#[from] ForestError),
}

// =============================================================================
// ParamGrid
// =============================================================================

/// Enumerated hyperparameter axes for the forest.
///
/// The default grid is the full 81-combination sweep used by the
/// production fitting job; tests shrink the axes for speed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamGrid {
    pub n_trees: Vec<usize>,
    pub max_depth: Vec<usize>,
    pub min_samples_split: Vec<usize>,
    pub min_samples_leaf: Vec<usize>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            n_trees: vec![100, 200, 300],
            max_depth: vec![10, 20, 30],
            min_samples_split: vec![2, 5, 10],
            min_samples_leaf: vec![1, 2, 4],
        }
    }
}

impl ParamGrid {
    /// Number of combinations in the grid.
    pub fn len(&self) -> usize {
        self.n_trees.len()
            * self.max_depth.len()
            * self.min_samples_split.len()
            * self.min_samples_leaf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Enumerate all combinations in nested-axis order.
    ///
    /// `seed` becomes the forest seed of every candidate, so fold scores
    /// differ only through the hyperparameters.
    ///
    /// # Errors
    ///
    /// Returns an error if any axis is empty or a combination fails
    /// config validation.
    pub fn candidates(&self, seed: u64) -> Result<Vec<RandomForestConfig>, SearchError> {
        if self.n_trees.is_empty() {
            return Err(SearchError::EmptyGridAxis("n_trees"));
        }
        if self.max_depth.is_empty() {
            return Err(SearchError::EmptyGridAxis("max_depth"));
        }
        if self.min_samples_split.is_empty() {
            return Err(SearchError::EmptyGridAxis("min_samples_split"));
        }
        if self.min_samples_leaf.is_empty() {
            return Err(SearchError::EmptyGridAxis("min_samples_leaf"));
        }

        let mut candidates = Vec::with_capacity(self.len());
        for &n_trees in &self.n_trees {
            for &max_depth in &self.max_depth {
                for &min_samples_split in &self.min_samples_split {
                    for &min_samples_leaf in &self.min_samples_leaf {
                        let config = RandomForestConfig::builder()
                            .n_trees(n_trees)
                            .max_depth(max_depth)
                            .min_samples_split(min_samples_split)
                            .min_samples_leaf(min_samples_leaf)
                            .seed(seed)
                            .build()?;
                        candidates.push(config);
                    }
                }
            }
        }
        Ok(candidates)
    }
}

// =============================================================================
// GridSearch
// =============================================================================

/// Cross-validated score for one grid combination.
#[derive(Debug, Clone)]
pub struct CandidateScore {
    pub config: RandomForestConfig,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Outcome of a grid search.
#[derive(Debug)]
pub struct GridSearchResult {
    /// Winning combination refit on the full training split.
    pub best_model: RandomForestRegressor,
    /// Index of the winner within `candidates`.
    pub best_index: usize,
    /// Mean cross-validated score of the winner.
    pub best_score: f64,
    /// Scores for every combination, in enumeration order.
    pub candidates: Vec<CandidateScore>,
}

impl GridSearchResult {
    /// The winning hyperparameters.
    pub fn best_config(&self) -> &RandomForestConfig {
        &self.candidates[self.best_index].config
    }
}

/// Exhaustive cross-validated search over a [`ParamGrid`].
#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    n_folds: usize,
    seed: u64,
}

impl GridSearch {
    /// Search over `grid` with the default 3 folds and seed 42.
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            n_folds: 3,
            seed: 42,
        }
    }

    /// Set the number of cross-validation folds.
    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    /// Set the seed used for fold shuffling and forest fitting.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Run the search on training features/targets.
    ///
    /// Each (candidate, fold) fit runs with sequential tree growth so
    /// that the task pool itself provides the parallelism; only the final
    /// refit fans its trees out.
    ///
    /// # Errors
    ///
    /// Fails on an invalid grid, an infeasible fold plan, or any fold
    /// fit failure. No partial results are returned.
    pub fn run<M>(
        &self,
        features: ArrayView2<f32>,
        targets: ArrayView1<f32>,
        metric: &M,
        parallelism: Parallelism,
        logger: &SearchLogger,
    ) -> Result<GridSearchResult, SearchError>
    where
        M: MetricFn + Sync,
    {
        let candidates = self.grid.candidates(self.seed)?;
        let plan = KFoldPlan::new(features.nrows(), self.n_folds, self.seed)?;

        logger.info(format_args!(
            "[search] fitting {} candidates x {} folds = {} fits",
            candidates.len(),
            plan.n_folds(),
            candidates.len() * plan.n_folds()
        ));

        // One task per (candidate, fold); fold partitions are shared.
        let tasks: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..plan.n_folds()).map(move |f| (c, f)))
            .collect();

        let fold_results: Vec<Result<f64, SearchError>> =
            parallelism.maybe_par_map(tasks, |(cand_idx, fold_idx)| {
                score_fold(
                    features,
                    targets,
                    &candidates[cand_idx],
                    &plan,
                    fold_idx,
                    metric,
                )
            });

        let n_folds = plan.n_folds();
        let n_candidates = candidates.len();
        let mut scored = Vec::with_capacity(n_candidates);
        for (cand_idx, config) in candidates.into_iter().enumerate() {
            let mut fold_scores = Vec::with_capacity(n_folds);
            for fold_idx in 0..n_folds {
                let score = fold_results[cand_idx * n_folds + fold_idx]
                    .as_ref()
                    .map_err(clone_search_error)?;
                fold_scores.push(*score);
            }
            let mean_score = fold_scores.iter().sum::<f64>() / n_folds as f64;
            logger.debug(format_args!(
                "[cv] candidate {}/{} ({}) mean {}={:.6}",
                cand_idx + 1,
                n_candidates,
                config,
                metric.name(),
                mean_score
            ));
            scored.push(CandidateScore {
                config,
                fold_scores,
                mean_score,
            });
        }

        // Arg-max over mean scores; strict comparison keeps the first of
        // equal-best combinations.
        let mut best_index = 0;
        for (idx, candidate) in scored.iter().enumerate() {
            let better = if metric.higher_is_better() {
                candidate.mean_score > scored[best_index].mean_score
            } else {
                candidate.mean_score < scored[best_index].mean_score
            };
            if better {
                best_index = idx;
            }
        }

        let best_score = scored[best_index].mean_score;
        logger.info(format_args!(
            "[search] best candidate #{} ({}) cv-{}={:.6}",
            best_index + 1,
            scored[best_index].config,
            metric.name(),
            best_score
        ));

        let best_model = RandomForestRegressor::fit(
            features,
            targets,
            &scored[best_index].config,
            parallelism,
        )?;

        Ok(GridSearchResult {
            best_model,
            best_index,
            best_score,
            candidates: scored,
        })
    }
}

/// Fit one candidate on one fold's training slice and score the held-out
/// slice.
fn score_fold<M: MetricFn>(
    features: ArrayView2<f32>,
    targets: ArrayView1<f32>,
    config: &RandomForestConfig,
    plan: &KFoldPlan,
    fold_idx: usize,
    metric: &M,
) -> Result<f64, SearchError> {
    let train_idx = plan.training_indices(fold_idx);
    let valid_idx = plan.validation_indices(fold_idx);

    let train_x = take_rows(features, &train_idx);
    let train_y = take_values(targets, &train_idx);
    let valid_x = take_rows(features, valid_idx);
    let valid_y = take_values(targets, valid_idx);

    let model = RandomForestRegressor::fit(
        train_x.view(),
        train_y.view(),
        config,
        Parallelism::Sequential,
    )?;
    let predictions = model.predict(valid_x.view())?;

    Ok(metric.compute(predictions.view(), valid_y.view()))
}

/// `SearchError` holds non-`Clone` sources; rebuild the cloneable cases
/// for fan-in of per-task results.
fn clone_search_error(err: &SearchError) -> SearchError {
    match err {
        &SearchError::EmptyGridAxis(axis) => SearchError::EmptyGridAxis(axis),
        SearchError::Config(e) => SearchError::Config(e.clone()),
        SearchError::Split(e) => SearchError::Split(e.clone()),
        SearchError::Forest(e) => SearchError::Forest(e.clone()),
    }
}

// =============================================================================
// Tests
// =============================================================================
