use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices for the two halves of a train/test split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a fixed seed and carves off `ceil(test_fraction * n)`
/// rows for testing, keeping at least one row on each side.
///
/// A single row is used for both training and testing.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Split {
    match n {
        0 => Split {
            train: Vec::new(),
            test: Vec::new(),
        },
        1 => Split {
            train: vec![0],
            test: vec![0],
        },
        _ => {
            let n_test = ((test_fraction * n as f64).ceil() as usize).clamp(1, n - 1);
            let mut indices: Vec<usize> = (0..n).collect();
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);

            let train = indices.split_off(n_test);
            Split {
                train,
                test: indices,
            }
        }
    }
}
