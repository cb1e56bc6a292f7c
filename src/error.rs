/// Error returned when building or reading structured parameters
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamsError {
    #[error("parameter block {0:?} is declared more than once")]
    DuplicateBlock(String),

    #[error("parameter block {0:?} is not part of the layout")]
    UnknownBlock(String),

    #[error("parameter block {0:?} is not given")]
    MissingBlock(String),

    #[error("flat vector has length {actual}, layout requires {expected}")]
    LengthMismatch { actual: usize, expected: usize },
}

/// Error returned from [crate::SparseMatrix] construction and products
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SparseError {
    #[error("triplet arrays have different lengths: rows {rows}, cols {cols}, values {values}")]
    TripletLengthMismatch {
        rows: usize,
        cols: usize,
        values: usize,
    },

    #[error("entry ({row}, {col}) is outside of the {nrows}x{ncols} matrix")]
    OutOfBounds {
        row: usize,
        col: usize,
        nrows: usize,
        ncols: usize,
    },

    #[error("vector has length {actual}, matrix requires {expected}")]
    VectorLength { actual: usize, expected: usize },
}

/// Error returned from [crate::GainCache] construction
///
/// These are data-quality problems of the input observation, they are never retried.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum GainCacheError {
    #[error("scan {scan} has a NaN timestamp")]
    InvalidTime { scan: usize },

    #[error("station {station:?} has more than one gain slot at time {time}")]
    DuplicateSlot { time: f64, station: String },

    #[error("no gain slot for station {station:?} at time {time} (measurement row {row})")]
    MissingSlot {
        row: usize,
        time: f64,
        station: String,
    },

    #[error("measurement row {row} correlates station {station:?} with itself")]
    Autocorrelation { row: usize, station: String },

    #[error(transparent)]
    Sparse(#[from] SparseError),
}

/// Error returned from gain corruption of model visibilities
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CorruptionError {
    #[error("{what} has length {actual}, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error(transparent)]
    Sparse(#[from] SparseError),
}

/// Error returned from [crate::CalTable] construction
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CalTableError {
    #[error("gains have length {actual}, gain cache has {expected} slots")]
    GainLength { actual: usize, expected: usize },
}

/// Error returned from closure design construction
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ClosureError {
    #[error("scan {scan} is out of range, scan table has {num_scans} scans")]
    ScanOutOfRange { scan: usize, num_scans: usize },

    #[error("scan {scan} has no baseline between {station1:?} and {station2:?}")]
    MissingBaseline {
        scan: usize,
        station1: String,
        station2: String,
    },
}

/// Error returned from visibility model queries and model construction
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error(transparent)]
    Corruption(#[from] CorruptionError),

    #[error(transparent)]
    Sparse(#[from] SparseError),

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Error returned from transforms and transformed posteriors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("working-space vector has length {actual}, transform dimension is {expected}")]
    DimensionMismatch { actual: usize, expected: usize },

    #[error("transform parameter blocks {transform:?} differ from posterior blocks {posterior:?}")]
    LayoutMismatch {
        transform: Vec<String>,
        posterior: Vec<String>,
    },

    #[error(transparent)]
    Params(#[from] ParamsError),
}

/// Error returned from likelihood construction
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LikelihoodError {
    #[error("data product {index} ({kind}) has {actual} values but {expected} noise levels")]
    SigmaLength {
        index: usize,
        kind: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("data product {index} ({kind}) expects {expected} visibility rows, uv coverage has {actual}")]
    RowMismatch {
        index: usize,
        kind: &'static str,
        actual: usize,
        expected: usize,
    },

    #[error("data product {index} ({kind}) has non-positive or non-finite noise level")]
    InvalidSigma { index: usize, kind: &'static str },

    #[error("data product {index} ({kind}) has {actual} values but its design matrix has {expected} rows")]
    DesignRows {
        index: usize,
        kind: &'static str,
        actual: usize,
        expected: usize,
    },
}

/// Error returned from [crate::Registry]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler {0:?} is already registered")]
    Duplicate(String),

    #[error("no handler registered as {name:?}, known handlers: {known:?}")]
    Unknown { name: String, known: Vec<String> },
}

/// Error returned from [crate::CalTableFormatter] implementations
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Fmt(#[from] std::fmt::Error),
}

/// Error returned from [crate::run_emcee]
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SamplerError {
    #[error("ensemble of {nwalkers} walkers is invalid for {dimension} dimensions, it must be even and at least twice the dimension")]
    InvalidWalkers { nwalkers: usize, dimension: usize },

    #[error("number of steps must be positive")]
    NoSteps,

    #[error("burn-in of {burn} steps leaves nothing of {steps} steps")]
    BurnTooLong { burn: usize, steps: usize },

    #[error("no prior draw of finite posterior density found for walker {walker} in {attempts} attempts")]
    InitialPosition { walker: usize, attempts: usize },

    #[error("emcee failure: {0}")]
    Emcee(String),

    #[error(transparent)]
    Transform(#[from] TransformError),
}
