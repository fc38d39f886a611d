//! Synthetic data helpers shared by unit and integration tests.

use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use rand::prelude::*;

/// Generate random dense features in row-major order.
///
/// Values are uniform in `[min, max]`.
pub fn random_dense_f32(rows: usize, cols: usize, seed: u64, min: f32, max: f32) -> Vec<f32> {
    assert!(max >= min);
    let mut rng = StdRng::seed_from_u64(seed);
    let width = max - min;
    (0..rows * cols)
        .map(|_| min + rng.r#gen::<f32>() * width)
        .collect()
}

/// Generate regression targets as a linear model of features plus uniform noise.
///
/// Returns `(targets, weights, bias)`.
pub fn synthetic_regression_targets_linear(
    features_row_major: &[f32],
    rows: usize,
    cols: usize,
    seed: u64,
    noise_amplitude: f32,
) -> (Vec<f32>, Vec<f32>, f32) {
    assert_eq!(features_row_major.len(), rows * cols);
    let mut rng = StdRng::seed_from_u64(seed);

    let weights: Vec<f32> = (0..cols).map(|_| rng.r#gen::<f32>() * 2.0 - 1.0).collect();
    let bias: f32 = rng.r#gen::<f32>() * 0.5 - 0.25;

    let mut targets = Vec::with_capacity(rows);
    for r in 0..rows {
        let mut y = bias;
        let base = r * cols;
        for c in 0..cols {
            y += features_row_major[base + c] * weights[c];
        }
        if noise_amplitude > 0.0 {
            y += (rng.r#gen::<f32>() * 2.0 - 1.0) * noise_amplitude;
        }
        targets.push(y);
    }

    (targets, weights, bias)
}

/// Write `n` small gradient PNGs plus a matching manifest into `dir`.
///
/// Image `i` is an `edge x edge` PNG whose red channel encodes the sample
/// index, and its manifest label is `i as f32`. Returns the manifest path.
pub fn write_gradient_images(dir: &Path, n: usize, edge: u32) -> PathBuf {
    let mut csv = String::from("image,score\n");
    for i in 0..n {
        let name = format!("img_{i:03}.png");
        let mut img = RgbImage::new(edge, edge);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = Rgb([
                ((i * 40) % 256) as u8,
                ((x * 255) / edge.max(1) as u32) as u8,
                ((y * 255) / edge.max(1) as u32) as u8,
            ]);
        }
        img.save(dir.join(&name)).expect("write test image");
        csv.push_str(&format!("{name},{i}\n"));
    }
    let manifest = dir.join("valid_images.csv");
    std::fs::write(&manifest, csv).expect("write test manifest");
    manifest
}
