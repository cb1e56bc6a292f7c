mod data_product;
pub use data_product::{
    Amplitudes, ClosurePhases, ComplexVisibilities, DataProduct, DataProductTrait,
    LogClosureAmplitudes,
};

mod radio;
pub use radio::{LikelihoodTrait, RadioLikelihood};
