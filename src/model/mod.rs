//! Visibility models: sky models and their gain-corrupted versions

mod closure;
pub use closure::{
    Quadrangle, Triangle, closure_phase_design, independent_quadrangles, log_closure_amplitude_design,
    reference_triangles,
};

mod uv;
pub use uv::UvCoverage;

mod visibility;
pub use visibility::{CorruptedModel, SkyModel, VisModel, VisibilityModelTrait};
