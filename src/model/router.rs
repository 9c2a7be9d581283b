//! A/B model router
//!
//! Sends a configured fraction of traffic to the secondary (candidate)
//! model version; everything else goes to the primary. The random source
//! is injected by the caller so tests can drive the split with a seeded
//! generator.

use rand::Rng;

#[derive(Debug, Clone)]
pub struct ModelRouter {
    primary: String,
    secondary: String,
    /// Fraction of requests routed to the secondary version, in [0, 1]
    split: f64,
}

impl ModelRouter {
    pub fn new(primary: &str, secondary: &str, split: f64) -> Self {
        Self {
            primary: primary.to_string(),
            secondary: secondary.to_string(),
            split: split.clamp(0.0, 1.0),
        }
    }

    /// Pick a version label for one request
    pub fn select<R: Rng>(&self, rng: &mut R) -> &str {
        if self.split > 0.0 && rng.gen::<f64>() < self.split {
            &self.secondary
        } else {
            &self.primary
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    pub fn split(&self) -> f64 {
        self.split
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn router(split: f64) -> ModelRouter {
        ModelRouter::new("v1.0", "v1.1-beta", split)
    }

    #[test]
    fn test_split_converges_to_configured_fraction() {
        let router = router(0.2);
        let mut rng = SmallRng::seed_from_u64(42);

        let draws = 10_000;
        let secondary = (0..draws)
            .filter(|_| router.select(&mut rng) == "v1.1-beta")
            .count();

        let fraction = secondary as f64 / draws as f64;
        assert!(
            (fraction - 0.2).abs() < 0.02,
            "secondary fraction {fraction} not near 0.2"
        );
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let router = router(0.2);

        let mut a = SmallRng::seed_from_u64(7);
        let mut b = SmallRng::seed_from_u64(7);

        for _ in 0..1_000 {
            assert_eq!(router.select(&mut a), router.select(&mut b));
        }
    }

    #[test]
    fn test_zero_split_always_primary() {
        let router = router(0.0);
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..1_000 {
            assert_eq!(router.select(&mut rng), "v1.0");
        }
    }

    #[test]
    fn test_full_split_always_secondary() {
        let router = router(1.0);
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..1_000 {
            assert_eq!(router.select(&mut rng), "v1.1-beta");
        }
    }

    #[test]
    fn test_split_clamped_into_unit_interval() {
        assert_eq!(router(-0.5).split(), 0.0);
        assert_eq!(router(1.5).split(), 1.0);
    }
}
