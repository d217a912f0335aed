use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::init::{AnyFiller, ConstantFiller, Filler, VarScaleFiller};

// InitConfig: which filler initialises which kind of parameter
//
// A plain record resolved once, when a ParamInitializer is built:
//
//   option           default
//   overall filler   none
//   weight filler    overall filler, else VarScale(1.0, scale mode, distribution)
//   bias filler      overall filler, else Constant(0)
//   random source    Entropy
//   scale mode       FanAvg
//   distribution     Uniform
//
// The random source seeds every resolved filler that was not pinned with its
// own `with_source`, so a Seeded config makes the whole initialisation
// reproducible and an explicitly seeded filler keeps its own stream.

/// Where random fillers draw their seed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RandomSource {
    /// A generator seeded from the operating system.
    #[default]
    Entropy,
    /// A fixed seed, for reproducible fills.
    Seeded(u64),
}

impl RandomSource {
    pub fn rng(&self) -> StdRng {
        match *self {
            RandomSource::Entropy => StdRng::from_entropy(),
            RandomSource::Seeded(seed) => StdRng::seed_from_u64(seed),
        }
    }

    /// A source for the `stream`-th filler of one configuration. Seeded
    /// sources give every stream its own seed.
    pub fn stream(&self, stream: u64) -> RandomSource {
        match *self {
            RandomSource::Entropy => RandomSource::Entropy,
            RandomSource::Seeded(seed) => RandomSource::Seeded(seed.wrapping_add(stream)),
        }
    }
}

/// Which fan a variance-scaled filler divides by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleMode {
    FanIn,
    FanOut,
    /// Mean of fan-in and fan-out.
    #[default]
    FanAvg,
}

impl ScaleMode {
    pub fn fan(&self, fan_in: usize, fan_out: usize) -> f64 {
        match self {
            ScaleMode::FanIn => fan_in as f64,
            ScaleMode::FanOut => fan_out as f64,
            ScaleMode::FanAvg => (fan_in + fan_out) as f64 / 2.0,
        }
    }
}

/// Distribution a variance-scaled filler samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Distribution {
    #[default]
    Uniform,
    Normal,
}

/// Initialiser settings, built with chained `with_*` calls.
#[derive(Debug, Clone, Default)]
pub struct InitConfig {
    overall: Option<AnyFiller>,
    weight: Option<AnyFiller>,
    bias: Option<AnyFiller>,
    source: RandomSource,
    scale_mode: ScaleMode,
    distribution: Distribution,
}

impl InitConfig {
    /// Filler used for both weights and biases unless overridden.
    pub fn with_overall(mut self, filler: impl Into<AnyFiller>) -> Self {
        self.overall = Some(filler.into());
        self
    }

    pub fn with_weight(mut self, filler: impl Into<AnyFiller>) -> Self {
        self.weight = Some(filler.into());
        self
    }

    pub fn with_bias(mut self, filler: impl Into<AnyFiller>) -> Self {
        self.bias = Some(filler.into());
        self
    }

    pub fn with_random_source(mut self, source: RandomSource) -> Self {
        self.source = source;
        self
    }

    /// Scale mode of the default weight filler.
    pub fn with_scale_mode(mut self, mode: ScaleMode) -> Self {
        self.scale_mode = mode;
        self
    }

    /// Distribution of the default weight filler.
    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn random_source(&self) -> RandomSource {
        self.source
    }

    /// The weight filler after fallbacks, seeded from the random source
    /// unless it was pinned.
    pub fn resolve_weight(&self) -> AnyFiller {
        let mut filler = self
            .weight
            .clone()
            .or_else(|| self.overall.clone())
            .unwrap_or_else(|| {
                VarScaleFiller::default()
                    .with_mode(self.scale_mode)
                    .with_distribution(self.distribution)
                    .into()
            });
        filler.reseed(self.source.stream(0));
        filler
    }

    /// The bias filler after fallbacks, seeded from the random source
    /// unless it was pinned.
    pub fn resolve_bias(&self) -> AnyFiller {
        let mut filler = self
            .bias
            .clone()
            .or_else(|| self.overall.clone())
            .unwrap_or_else(|| ConstantFiller::new(0.0).into());
        filler.reseed(self.source.stream(1));
        filler
    }
}
