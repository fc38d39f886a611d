//! Integration tests for splitting and grid search on synthetic data.

use geoforest::testing::{random_dense_f32, synthetic_regression_targets_linear};
use geoforest::training::{
    train_test_split, GridSearch, ParamGrid, RSquared, SearchLogger,
};
use geoforest::utils::Parallelism;
use ndarray::{Array1, Array2};

fn synthetic(n: usize, f: usize, seed: u64) -> (Array2<f32>, Array1<f32>) {
    let flat = random_dense_f32(n, f, seed, -1.0, 1.0);
    let (targets, _, _) = synthetic_regression_targets_linear(&flat, n, f, seed + 100, 0.02);
    (
        Array2::from_shape_vec((n, f), flat).unwrap(),
        Array1::from_vec(targets),
    )
}

#[test]
fn split_is_reproducible_and_proportioned() {
    let first = train_test_split(200, 0.2, 42).unwrap();
    let second = train_test_split(200, 0.2, 42).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.train.len(), 160);
    assert_eq!(first.test.len(), 40);
}

#[test]
fn reduced_grid_search_end_to_end() {
    let (features, targets) = synthetic(90, 4, 7);
    let split = train_test_split(features.nrows(), 0.2, 42).unwrap();

    let train_x = geoforest::training::take_rows(features.view(), &split.train);
    let train_y = geoforest::training::take_values(targets.view(), &split.train);
    let test_x = geoforest::training::take_rows(features.view(), &split.test);
    let test_y = geoforest::training::take_values(targets.view(), &split.test);

    // 2-point-per-axis grid, reduced for test speed.
    let grid = ParamGrid {
        n_trees: vec![5, 10],
        max_depth: vec![3, 6],
        min_samples_split: vec![2, 4],
        min_samples_leaf: vec![1, 2],
    };
    let result = GridSearch::new(grid.clone())
        .with_folds(3)
        .with_seed(42)
        .run(
            train_x.view(),
            train_y.view(),
            &RSquared,
            Parallelism::Parallel,
            &SearchLogger::silent(),
        )
        .unwrap();

    // The winner is one of the enumerated combinations.
    let best = result.best_config();
    assert!(grid.n_trees.contains(&best.n_trees));
    assert!(grid.max_depth.contains(&best.max_depth));
    assert!(grid.min_samples_split.contains(&best.min_samples_split));
    assert!(grid.min_samples_leaf.contains(&best.min_samples_leaf));

    // Held-out metrics are finite.
    use geoforest::training::{MetricFn, Mse};
    let predictions = result.best_model.predict(test_x.view()).unwrap();
    let mse = Mse.compute(predictions.view(), test_y.view());
    let r2 = RSquared.compute(predictions.view(), test_y.view());
    assert!(mse.is_finite());
    assert!(r2.is_finite());
    assert!(mse >= 0.0);

    // A near-noiseless linear target should be learnable.
    assert!(
        result.best_score > 0.0,
        "cv r2 {} should beat the mean predictor",
        result.best_score
    );
}

#[test]
fn tie_break_prefers_first_enumerated_candidate() {
    // Constant targets: every candidate scores identically (r2 = 0.0 by
    // definition on constant folds), so the first combination must win.
    let features = Array2::from_shape_vec(
        (30, 2),
        random_dense_f32(30, 2, 3, 0.0, 1.0),
    )
    .unwrap();
    let targets = Array1::from_elem(30, 4.2f32);

    let grid = ParamGrid {
        n_trees: vec![3, 6],
        max_depth: vec![2, 4],
        min_samples_split: vec![2],
        min_samples_leaf: vec![1],
    };
    let result = GridSearch::new(grid)
        .with_folds(3)
        .with_seed(0)
        .run(
            features.view(),
            targets.view(),
            &RSquared,
            Parallelism::Sequential,
            &SearchLogger::silent(),
        )
        .unwrap();

    assert_eq!(result.best_index, 0);
    assert_eq!(result.best_config().n_trees, 3);
    assert_eq!(result.best_config().max_depth, 2);
}
