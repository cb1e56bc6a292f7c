pub mod ln_prior;
pub use ln_prior::Prior;

pub mod ln_prior_1d;
pub use ln_prior_1d::{LnPrior1D, LnPrior1DTrait, Support};
