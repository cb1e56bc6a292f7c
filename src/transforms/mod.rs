//! Reparametrizations of the natural parameter space
//!
//! Samplers and optimizers work in a flat working space, a [Transform] maps it to structured
//! [crate::Params] and reports the log-Jacobian of the map.

pub mod bijector;
pub use bijector::Bijector;

pub mod cube;
pub use cube::CubeTransform;

pub mod flat;
pub use flat::{FlatComponent, FlatTransform};

pub mod raw;
pub use raw::RawTransform;

pub mod transform;
pub use transform::{Transform, TransformTrait};
