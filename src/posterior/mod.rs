#[allow(clippy::module_inception)]
mod posterior;
pub use posterior::Posterior;

mod transformed;
pub use transformed::TransformedPosterior;
