//! Seedable sampling streams for the simulation model.
//!
//! Every stream owns a private `StdRng`, so no two distributions ever share
//! generator state. Given the same seed vector a run draws an identical
//! sequence from every stream, which is what makes whole-model determinism
//! possible.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::{LogNormal, Poisson as PoissonDist};

use crate::error::{CoreError, Result};

/// Smallest value produced by [`generate_seed_vector`].
const SEED_LOW: u64 = 1_000;
/// Exclusive upper bound for [`generate_seed_vector`] values (10^10).
const SEED_HIGH: u64 = 10_000_000_000;

/// Generate a controllable vector of integer seeds for the model's streams.
///
/// Values are drawn from a master `StdRng` and lie in `[1000, 10^10)`.
/// The result is fully determined by `master_seed`.
pub fn generate_seed_vector(master_seed: u64, size: usize) -> Vec<u64> {
    let mut rng = StdRng::seed_from_u64(master_seed);
    (0..size).map(|_| rng.gen_range(SEED_LOW..SEED_HIGH)).collect()
}

/// Seeded Bernoulli stream.
#[derive(Debug, Clone)]
pub struct Bernoulli {
    dist: rand_distr::Bernoulli,
    rng: StdRng,
}

impl Bernoulli {
    pub fn new(p: f64, seed: u64) -> Result<Self> {
        let dist = rand_distr::Bernoulli::new(p).map_err(|_| {
            CoreError::DistributionDomain(format!("bernoulli probability {p} outside [0, 1]"))
        })?;
        Ok(Self {
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn sample(&mut self) -> bool {
        self.dist.sample(&mut self.rng)
    }
}

/// Seeded categorical stream over arbitrary element indices.
///
/// Probabilities are normalised defensively: callers may pass empirical
/// proportions that do not sum exactly to 1.0.
#[derive(Debug, Clone)]
pub struct Discrete {
    elements: Vec<usize>,
    dist: WeightedIndex<f64>,
    rng: StdRng,
}

impl Discrete {
    pub fn new(elements: Vec<usize>, probs: &[f64], seed: u64) -> Result<Self> {
        if elements.len() != probs.len() {
            return Err(CoreError::DistributionDomain(format!(
                "discrete distribution has {} elements but {} probabilities",
                elements.len(),
                probs.len()
            )));
        }
        if probs.iter().any(|p| *p < 0.0 || !p.is_finite()) {
            return Err(CoreError::DistributionDomain(
                "discrete probabilities must be finite and non-negative".into(),
            ));
        }
        let total: f64 = probs.iter().sum();
        if total <= 0.0 {
            return Err(CoreError::DistributionDomain(
                "discrete probabilities must not all be zero".into(),
            ));
        }
        let normalised: Vec<f64> = probs.iter().map(|p| p / total).collect();
        let dist = WeightedIndex::new(&normalised).map_err(|e| {
            CoreError::DistributionDomain(format!("invalid discrete weights: {e}"))
        })?;
        Ok(Self {
            elements,
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn sample(&mut self) -> usize {
        self.elements[self.dist.sample(&mut self.rng)]
    }
}

/// Seeded Poisson stream of non-negative counts.
#[derive(Debug, Clone)]
pub struct Poisson {
    dist: PoissonDist<f64>,
    rng: StdRng,
}

impl Poisson {
    pub fn new(mean: f64, seed: u64) -> Result<Self> {
        let dist = PoissonDist::new(mean).map_err(|_| {
            CoreError::DistributionDomain(format!("poisson mean {mean} must be positive"))
        })?;
        Ok(Self {
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn sample(&mut self) -> u32 {
        self.dist.sample(&mut self.rng) as u32
    }
}

/// Seeded lognormal stream.
///
/// `mean` and `stdev` parameterise the distribution itself, not the
/// underlying normal; the conversion is
/// mu = ln(mean^2 / sqrt(stdev^2 + mean^2)) and
/// sigma^2 = ln(1 + stdev^2 / mean^2).
#[derive(Debug, Clone)]
pub struct Lognormal {
    dist: LogNormal<f64>,
    rng: StdRng,
}

impl Lognormal {
    pub fn new(mean: f64, stdev: f64, seed: u64) -> Result<Self> {
        if mean <= 0.0 || stdev <= 0.0 || !mean.is_finite() || !stdev.is_finite() {
            return Err(CoreError::DistributionDomain(format!(
                "lognormal requires positive finite mean and stdev (mean={mean}, stdev={stdev})"
            )));
        }
        let mu = (mean * mean / (stdev * stdev + mean * mean).sqrt()).ln();
        let sigma = (1.0 + stdev * stdev / (mean * mean)).ln().sqrt();
        let dist = LogNormal::new(mu, sigma).map_err(|e| {
            CoreError::DistributionDomain(format!("invalid lognormal parameters: {e}"))
        })?;
        Ok(Self {
            dist,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    pub fn sample(&mut self) -> f64 {
        self.dist.sample(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_vector_is_deterministic() {
        let a = generate_seed_vector(42, 20);
        let b = generate_seed_vector(42, 20);
        assert_eq!(a, b);
        assert_eq!(a.len(), 20);
    }

    #[test]
    fn seed_vector_values_in_range() {
        for seed in generate_seed_vector(7, 100) {
            assert!((SEED_LOW..SEED_HIGH).contains(&seed));
        }
    }

    #[test]
    fn different_master_seeds_differ() {
        assert_ne!(generate_seed_vector(1, 20), generate_seed_vector(2, 20));
    }

    #[test]
    fn bernoulli_streams_with_same_seed_match() {
        let mut a = Bernoulli::new(0.3, 99).unwrap();
        let mut b = Bernoulli::new(0.3, 99).unwrap();
        for _ in 0..200 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn bernoulli_extremes() {
        let mut never = Bernoulli::new(0.0, 1).unwrap();
        let mut always = Bernoulli::new(1.0, 1).unwrap();
        for _ in 0..50 {
            assert!(!never.sample());
            assert!(always.sample());
        }
    }

    #[test]
    fn bernoulli_rejects_bad_probability() {
        assert!(Bernoulli::new(1.5, 1).is_err());
        assert!(Bernoulli::new(-0.1, 1).is_err());
    }

    #[test]
    fn discrete_never_samples_zero_weight() {
        let mut dist = Discrete::new(vec![0, 1, 2], &[0.5, 0.0, 0.5], 11).unwrap();
        for _ in 0..500 {
            assert_ne!(dist.sample(), 1);
        }
    }

    #[test]
    fn discrete_normalises_unscaled_weights() {
        // Weights summing to 2.0 are accepted and behave proportionally.
        let mut dist = Discrete::new(vec![5, 9], &[2.0, 0.0], 3).unwrap();
        for _ in 0..50 {
            assert_eq!(dist.sample(), 5);
        }
    }

    #[test]
    fn discrete_rejects_degenerate_weights() {
        assert!(Discrete::new(vec![0, 1], &[0.0, 0.0], 1).is_err());
        assert!(Discrete::new(vec![0, 1], &[-1.0, 2.0], 1).is_err());
        assert!(Discrete::new(vec![0], &[0.5, 0.5], 1).is_err());
    }

    #[test]
    fn poisson_mean_is_close() {
        let mut dist = Poisson::new(4.0, 123).unwrap();
        let n = 20_000;
        let total: u64 = (0..n).map(|_| dist.sample() as u64).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 4.0).abs() < 0.1, "sample mean {mean} too far from 4.0");
    }

    #[test]
    fn poisson_rejects_non_positive_mean() {
        assert!(Poisson::new(0.0, 1).is_err());
        assert!(Poisson::new(-2.0, 1).is_err());
    }

    #[test]
    fn lognormal_moments_match_requested() {
        // Parameters are the distribution's own mean/stdev, so the sample
        // mean must come out near the requested mean (not near exp(mu)).
        let mut dist = Lognormal::new(10.0, 6.0, 321).unwrap();
        let n = 50_000;
        let total: f64 = (0..n).map(|_| dist.sample()).sum();
        let mean = total / n as f64;
        assert!((mean - 10.0).abs() < 0.2, "sample mean {mean} too far from 10.0");
    }

    #[test]
    fn lognormal_rejects_non_positive_parameters() {
        assert!(Lognormal::new(0.0, 1.0, 1).is_err());
        assert!(Lognormal::new(10.0, 0.0, 1).is_err());
        assert!(Lognormal::new(-1.0, 1.0, 1).is_err());
    }
}
