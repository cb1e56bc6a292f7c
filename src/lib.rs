#![doc = include_str!("../README.md")]

pub mod calibration;
pub use calibration::{CalTable, GainCache, GainSegmentation, ScanTable};

mod error;
pub use error::{
    CalTableError, ClosureError, CorruptionError, FormatError, GainCacheError, LikelihoodError,
    ModelError, ParamsError, RegistryError, SamplerError, SparseError, TransformError,
};

pub mod likelihood;
pub use likelihood::{DataProduct, DataProductTrait, LikelihoodTrait, RadioLikelihood};

pub mod model;
pub use model::{CorruptedModel, SkyModel, UvCoverage, VisModel, VisibilityModelTrait};

mod params;
pub use params::{ParamLayout, Params};

pub mod posterior;
pub use posterior::{Posterior, TransformedPosterior};

pub mod prior;
pub use prior::{LnPrior1D, LnPrior1DTrait, Prior};

mod registry;
pub use registry::{CalTableFormatter, JsonFormatter, Registry, TsvFormatter};

mod sampler;
pub use sampler::{EmceeProb, EmceeSettings, McmcChain, run_emcee};

pub mod transforms;
pub use transforms::{Transform, TransformTrait};

pub use ndarray;
pub use num_complex;
