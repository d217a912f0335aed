use std::collections::BTreeMap;

use tensile_core::{data_copy, Cpu, Data, Device, Element, Error, Matrix, Result};

use crate::config::InitConfig;
use crate::init::{AnyFiller, Filler};

// ParamInitializer: named parameter store plus the configured fillers
//
// Layers ask the initializer to fill their weight and bias matrices, and
// may also look up pre-trained values by name. Stored matrices never share
// storage with the caller: `set_matrix` copies in and `get_matrix` copies
// out, so later writes on either side stay local.

/// Owns the resolved fillers and a map of named parameter matrices.
#[derive(Debug)]
pub struct ParamInitializer<T: Element, D: Device = Cpu> {
    weight: AnyFiller,
    bias: AnyFiller,
    params: BTreeMap<String, Matrix<T, D>>,
}

impl<T: Element, D: Device> ParamInitializer<T, D> {
    pub fn new(config: InitConfig) -> Self {
        ParamInitializer {
            weight: config.resolve_weight(),
            bias: config.resolve_bias(),
            params: BTreeMap::new(),
        }
    }

    /// Store a deep copy of `value` under `name`.
    pub fn set_matrix(&mut self, name: impl Into<String>, value: &Matrix<T, D>) -> Result<()> {
        let name = name.into();
        if self.params.contains_key(&name) {
            return Err(Error::DuplicateParam(name));
        }
        let mut copy = Matrix::new(value.rows(), value.cols())?;
        data_copy(value, &mut copy)?;
        log::debug!("stored parameter {} {}", name, copy.shape());
        self.params.insert(name, copy);
        Ok(())
    }

    /// Copy the parameter `name` into `res`, which must have its shape.
    pub fn get_matrix(&self, name: &str, res: &mut Matrix<T, D>) -> Result<()> {
        let stored = self
            .params
            .get(name)
            .ok_or_else(|| Error::ParamNotFound(name.to_string()))?;
        if stored.shape() != res.shape() {
            return Err(Error::ShapeMismatch {
                expected: stored.shape(),
                got: res.shape(),
            });
        }
        log::debug!("retrieved parameter {} {}", name, stored.shape());
        data_copy(stored, res)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Stored parameter names, in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    /// Initialise a weight matrix with the configured weight filler.
    pub fn fill_weight(&mut self, m: &mut Matrix<T, D>, fan_in: usize, fan_out: usize) -> Result<()> {
        self.weight.fill(m, fan_in, fan_out)
    }

    /// Initialise a bias matrix with the configured bias filler.
    pub fn fill_bias(&mut self, m: &mut Matrix<T, D>, fan_in: usize, fan_out: usize) -> Result<()> {
        self.bias.fill(m, fan_in, fan_out)
    }
}

impl<T: Element, D: Device> Default for ParamInitializer<T, D> {
    fn default() -> Self {
        Self::new(InitConfig::default())
    }
}
