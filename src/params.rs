use crate::error::ParamsError;

use ndarray::{Array1, ArrayView1, s};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;

/// Ordered named blocks of the natural parameter space
///
/// A layout fixes how a structured parameter value is flattened: blocks are stored one after
/// another in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(try_from = "ParamLayoutParameters", into = "ParamLayoutParameters")]
pub struct ParamLayout {
    names: Vec<String>,
    offsets: Vec<usize>,
}

impl ParamLayout {
    pub fn new<S>(blocks: impl IntoIterator<Item = (S, usize)>) -> Result<Self, ParamsError>
    where
        S: Into<String>,
    {
        let mut names: Vec<String> = vec![];
        let mut offsets = vec![0];
        for (name, size) in blocks {
            let name = name.into();
            if names.contains(&name) {
                return Err(ParamsError::DuplicateBlock(name));
            }
            names.push(name);
            offsets.push(offsets[offsets.len() - 1] + size);
        }
        Ok(Self { names, offsets })
    }

    /// Total number of scalar parameters
    pub fn size(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn num_blocks(&self) -> usize {
        self.names.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|s| s.as_str())
    }

    /// Iterate over `(name, range in the flat vector)` pairs
    pub fn blocks(&self) -> impl Iterator<Item = (&str, Range<usize>)> {
        self.names
            .iter()
            .zip(self.offsets.windows(2))
            .map(|(name, w)| (name.as_str(), w[0]..w[1]))
    }

    pub fn range(&self, name: &str) -> Result<Range<usize>, ParamsError> {
        self.blocks()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| r)
            .ok_or_else(|| ParamsError::UnknownBlock(name.to_string()))
    }
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(rename = "ParamLayout")]
struct ParamLayoutParameters {
    blocks: Vec<(String, usize)>,
}

impl From<ParamLayout> for ParamLayoutParameters {
    fn from(layout: ParamLayout) -> Self {
        Self {
            blocks: layout
                .blocks()
                .map(|(name, r)| (name.to_string(), r.len()))
                .collect(),
        }
    }
}

impl TryFrom<ParamLayoutParameters> for ParamLayout {
    type Error = ParamsError;

    fn try_from(p: ParamLayoutParameters) -> Result<Self, Self::Error> {
        Self::new(p.blocks)
    }
}

/// A point of the natural parameter space: a shared layout and the flat values
#[derive(Clone, Debug, PartialEq)]
pub struct Params {
    layout: Arc<ParamLayout>,
    values: Array1<f64>,
}

impl Params {
    pub fn from_flat(
        layout: Arc<ParamLayout>,
        values: impl Into<Array1<f64>>,
    ) -> Result<Self, ParamsError> {
        let values = values.into();
        if values.len() != layout.size() {
            return Err(ParamsError::LengthMismatch {
                actual: values.len(),
                expected: layout.size(),
            });
        }
        Ok(Self { layout, values })
    }

    /// Build from `(name, values)` pairs, every block of the layout must be given exactly once
    pub fn from_blocks<'a>(
        layout: Arc<ParamLayout>,
        blocks: impl IntoIterator<Item = (&'a str, &'a [f64])>,
    ) -> Result<Self, ParamsError> {
        let mut values = Array1::from_elem(layout.size(), f64::NAN);
        let mut seen = vec![false; layout.num_blocks()];
        for (name, block) in blocks {
            let (idx, range) = layout
                .blocks()
                .enumerate()
                .find_map(|(i, (n, r))| (n == name).then_some((i, r)))
                .ok_or_else(|| ParamsError::UnknownBlock(name.to_string()))?;
            if seen[idx] {
                return Err(ParamsError::DuplicateBlock(name.to_string()));
            }
            if block.len() != range.len() {
                return Err(ParamsError::LengthMismatch {
                    actual: block.len(),
                    expected: range.len(),
                });
            }
            seen[idx] = true;
            values
                .slice_mut(s![range])
                .assign(&ArrayView1::from(block));
        }
        if let Some(missing) = layout
            .names()
            .zip(seen)
            .find_map(|(name, seen)| (!seen).then_some(name))
        {
            return Err(ParamsError::MissingBlock(missing.to_string()));
        }
        Ok(Self { layout, values })
    }

    pub fn layout(&self) -> &Arc<ParamLayout> {
        &self.layout
    }

    pub fn block(&self, name: &str) -> Result<ArrayView1<'_, f64>, ParamsError> {
        let range = self.layout.range(name)?;
        Ok(self.values.slice(s![range]))
    }

    pub fn as_flat(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn into_flat(self) -> Array1<f64> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
