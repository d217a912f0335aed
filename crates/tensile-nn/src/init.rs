// Fillers: parameter initialisation strategies
//
// A filler writes every element of a Matrix given the fan-in and fan-out of
// the layer the matrix belongs to. Fillers refuse matrices whose storage is
// shared (SharedWrite) and write through the privileged access layer, one
// row at a time, so sub-matrices are filled correctly.
//
// AVAILABLE FILLERS:
//
//   ConstantFiller(value)           all elements = value
//   UniformFiller(min, max)         U(min, max), min < max
//   GaussianFiller(mean, std)       N(mean, std), std > 0
//   VarScaleFiller(factor)          variance scaling:
//                                     fan   = fan_in | fan_out | (fan_in + fan_out) / 2
//                                     U(-sqrt(3 * factor / fan), +sqrt(3 * factor / fan))
//                                     or N(0, sqrt(factor / fan))
//
// Values are drawn as f64 and converted to the matrix element type.

use rand::rngs::StdRng;
use rand_distr::{Distribution as _, Normal, Uniform};
use tensile_core::{lower_access, Device, Element, Error, Matrix, Result};

use crate::config::{Distribution, RandomSource, ScaleMode};

/// Something that can initialise a matrix.
pub trait Filler {
    /// Overwrite every element of `m`.
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<()>;

    /// Draw from `source` unless a source was already set with
    /// `with_source`. Deterministic fillers ignore this.
    fn reseed(&mut self, _source: RandomSource) {}
}

/// Write `next()` into every element of `m`, row by row.
fn write_each<T: Element, D: Device>(
    m: &mut Matrix<T, D>,
    mut next: impl FnMut() -> f64,
) -> Result<()> {
    m.buffer().ensure_exclusive()?;
    let low = lower_access(&*m);
    for r in 0..m.rows() {
        let row = r * low.row_stride();
        for c in 0..m.cols() {
            // SAFETY: exclusivity was checked above.
            unsafe { low.write(row + c, T::from_f64(next())) };
        }
    }
    Ok(())
}

/// Fills with one value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantFiller {
    value: f64,
}

impl ConstantFiller {
    pub fn new(value: f64) -> Self {
        ConstantFiller { value }
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Filler for ConstantFiller {
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        _fan_in: usize,
        _fan_out: usize,
    ) -> Result<()> {
        log::debug!("constant fill {} with {}", m.rows() * m.cols(), self.value);
        let value = self.value;
        write_each(m, || value)
    }
}

/// Samples from `U(min, max)`.
#[derive(Debug, Clone)]
pub struct UniformFiller {
    dist: Uniform<f64>,
    rng: StdRng,
    pinned: bool,
}

impl UniformFiller {
    /// Fails unless `min < max`.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !(min < max) || !min.is_finite() || !max.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "uniform filler needs finite min < max, got [{}, {})",
                min, max
            )));
        }
        Ok(UniformFiller {
            dist: Uniform::new(min, max),
            rng: RandomSource::default().rng(),
            pinned: false,
        })
    }

    /// Pin the generator to `source`. A pinned filler keeps it when an
    /// InitConfig resolves it.
    pub fn with_source(mut self, source: RandomSource) -> Self {
        self.rng = source.rng();
        self.pinned = true;
        self
    }
}

impl Filler for UniformFiller {
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        _fan_in: usize,
        _fan_out: usize,
    ) -> Result<()> {
        log::debug!("uniform fill {}x{}", m.rows(), m.cols());
        let (dist, rng) = (&self.dist, &mut self.rng);
        write_each(m, || dist.sample(rng))
    }

    fn reseed(&mut self, source: RandomSource) {
        if !self.pinned {
            self.rng = source.rng();
        }
    }
}

/// Samples from `N(mean, std)`.
#[derive(Debug, Clone)]
pub struct GaussianFiller {
    dist: Normal<f64>,
    rng: StdRng,
    pinned: bool,
}

impl GaussianFiller {
    /// Fails unless `std > 0`.
    pub fn new(mean: f64, std: f64) -> Result<Self> {
        if !(std > 0.0) || !std.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "gaussian filler needs std > 0, got {}",
                std
            )));
        }
        let dist = Normal::new(mean, std).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        Ok(GaussianFiller {
            dist,
            rng: RandomSource::default().rng(),
            pinned: false,
        })
    }

    /// Pin the generator to `source`. A pinned filler keeps it when an
    /// InitConfig resolves it.
    pub fn with_source(mut self, source: RandomSource) -> Self {
        self.rng = source.rng();
        self.pinned = true;
        self
    }
}

impl Filler for GaussianFiller {
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        _fan_in: usize,
        _fan_out: usize,
    ) -> Result<()> {
        log::debug!("gaussian fill {}x{}", m.rows(), m.cols());
        let (dist, rng) = (&self.dist, &mut self.rng);
        write_each(m, || dist.sample(rng))
    }

    fn reseed(&mut self, source: RandomSource) {
        if !self.pinned {
            self.rng = source.rng();
        }
    }
}

/// Variance scaling: the spread shrinks as the layer's fan grows.
#[derive(Debug, Clone)]
pub struct VarScaleFiller {
    factor: f64,
    mode: ScaleMode,
    distribution: Distribution,
    rng: StdRng,
    pinned: bool,
}

impl Default for VarScaleFiller {
    fn default() -> Self {
        VarScaleFiller {
            factor: 1.0,
            mode: ScaleMode::default(),
            distribution: Distribution::default(),
            rng: RandomSource::default().rng(),
            pinned: false,
        }
    }
}

impl VarScaleFiller {
    /// Fails unless `factor > 0`.
    pub fn new(factor: f64) -> Result<Self> {
        if !(factor > 0.0) || !factor.is_finite() {
            return Err(Error::InvalidArgument(format!(
                "variance scale factor must be positive, got {}",
                factor
            )));
        }
        Ok(VarScaleFiller {
            factor,
            ..Default::default()
        })
    }

    pub fn with_mode(mut self, mode: ScaleMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Pin the generator to `source`. A pinned filler keeps it when an
    /// InitConfig resolves it.
    pub fn with_source(mut self, source: RandomSource) -> Self {
        self.rng = source.rng();
        self.pinned = true;
        self
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn mode(&self) -> ScaleMode {
        self.mode
    }

    pub fn distribution(&self) -> Distribution {
        self.distribution
    }
}

impl Filler for VarScaleFiller {
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<()> {
        let fan = self.mode.fan(fan_in, fan_out);
        if fan <= 0.0 {
            return Err(Error::InvalidArgument(format!(
                "variance scaling with {:?} needs a non-zero fan (fan_in={}, fan_out={})",
                self.mode, fan_in, fan_out
            )));
        }
        log::debug!(
            "var-scale fill {}x{}: factor={} fan={} {:?}",
            m.rows(),
            m.cols(),
            self.factor,
            fan,
            self.distribution
        );
        let rng = &mut self.rng;
        match self.distribution {
            Distribution::Uniform => {
                let limit = (3.0 * self.factor / fan).sqrt();
                let dist = Uniform::new(-limit, limit);
                write_each(m, || dist.sample(rng))
            }
            Distribution::Normal => {
                let std = (self.factor / fan).sqrt();
                let dist =
                    Normal::new(0.0, std).map_err(|e| Error::InvalidArgument(e.to_string()))?;
                write_each(m, || dist.sample(rng))
            }
        }
    }

    fn reseed(&mut self, source: RandomSource) {
        if !self.pinned {
            self.rng = source.rng();
        }
    }
}

/// Any of the fillers above, so a configuration can own one.
#[derive(Debug, Clone)]
pub enum AnyFiller {
    Constant(ConstantFiller),
    Uniform(UniformFiller),
    Gaussian(GaussianFiller),
    VarScale(VarScaleFiller),
}

impl Filler for AnyFiller {
    fn fill<T: Element, D: Device>(
        &mut self,
        m: &mut Matrix<T, D>,
        fan_in: usize,
        fan_out: usize,
    ) -> Result<()> {
        match self {
            AnyFiller::Constant(f) => f.fill(m, fan_in, fan_out),
            AnyFiller::Uniform(f) => f.fill(m, fan_in, fan_out),
            AnyFiller::Gaussian(f) => f.fill(m, fan_in, fan_out),
            AnyFiller::VarScale(f) => f.fill(m, fan_in, fan_out),
        }
    }

    fn reseed(&mut self, source: RandomSource) {
        match self {
            AnyFiller::Constant(f) => f.reseed(source),
            AnyFiller::Uniform(f) => f.reseed(source),
            AnyFiller::Gaussian(f) => f.reseed(source),
            AnyFiller::VarScale(f) => f.reseed(source),
        }
    }
}

impl From<ConstantFiller> for AnyFiller {
    fn from(f: ConstantFiller) -> Self {
        AnyFiller::Constant(f)
    }
}

impl From<UniformFiller> for AnyFiller {
    fn from(f: UniformFiller) -> Self {
        AnyFiller::Uniform(f)
    }
}

impl From<GaussianFiller> for AnyFiller {
    fn from(f: GaussianFiller) -> Self {
        AnyFiller::Gaussian(f)
    }
}

impl From<VarScaleFiller> for AnyFiller {
    fn from(f: VarScaleFiller) -> Self {
        AnyFiller::VarScale(f)
    }
}
