//! Station gain corruption of model visibilities
//!
//! A [GainCache] is built once per observation from its [ScanTable]. It maps a flat vector of
//! complex station gains onto the two endpoints of every measurement row through a pair of
//! sparse design matrices. [corrupt] then applies `g1 · V · conj(g2)` row by row, and
//! [corrupt_jvp] / [corrupt_vjp] give its derivatives in closed form.

mod caltable;
pub use caltable::CalTable;

mod corrupt;
pub use corrupt::{complex_gains, corrupt, corrupt_jvp, corrupt_vjp};

mod gain_cache;
pub use gain_cache::{GainCache, GainSegmentation, GainSlot};

mod scan;
pub use scan::{Baseline, Row, Scan, ScanTable};

mod sparse;
pub use sparse::SparseMatrix;
