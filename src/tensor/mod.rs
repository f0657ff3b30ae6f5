//! Borrowed views over raw inference outputs.
//!
//! `TensorView` pairs a flat `f32` buffer with its shape. The buffer belongs to
//! the inference engine; the pipeline only reads it for the duration of one
//! call, so releasing the native tensor stays with the caller. `OutputMap`
//! keeps outputs in the order the engine reported them, which is the
//! encounter order the shape and positional resolvers rely on.

use crate::util::{DetDecodeError, DetDecodeResult};

/// Borrowed float tensor with an explicit shape.
#[derive(Copy, Clone, Debug)]
pub struct TensorView<'a> {
    data: &'a [f32],
    shape: &'a [usize],
}

impl<'a> TensorView<'a> {
    /// Creates a view, checking that `data` holds at least `product(shape)`
    /// elements.
    pub fn new(data: &'a [f32], shape: &'a [usize]) -> DetDecodeResult<Self> {
        let needed = element_count(shape)?;
        if data.len() < needed {
            return Err(DetDecodeError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            shape,
        })
    }

    /// Returns the flat data, trimmed to the shape's element count.
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the shape.
    pub fn shape(&self) -> &'a [usize] {
        self.shape
    }

    /// Returns the number of dimensions.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the size of the last dimension, if any.
    pub fn last_dim(&self) -> Option<usize> {
        self.shape.last().copied()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the element at flat index `idx`.
    pub fn get(&self, idx: usize) -> Option<f32> {
        self.data.get(idx).copied()
    }

    /// Number of per-candidate entries in a scores or classes tensor.
    ///
    /// `[N]` and `[1, N]` give `N`; any other shape falls back to the element
    /// count.
    pub fn candidate_count(&self) -> usize {
        match self.shape {
            [n] => *n,
            [1, n] => *n,
            _ => self.data.len(),
        }
    }
}

fn element_count(shape: &[usize]) -> DetDecodeResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(DetDecodeError::InvalidShape {
            reason: "element count overflows usize",
        })
}

/// Owned tensor for callers that copy data out of a native tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedTensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl OwnedTensor {
    /// Creates an owned tensor, validating the buffer against the shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> DetDecodeResult<Self> {
        TensorView::new(&data, &shape)?;
        Ok(Self { data, shape })
    }

    /// Returns a borrowed view.
    pub fn view(&self) -> TensorView<'_> {
        TensorView {
            data: &self.data[..self.data.len().min(self.shape.iter().product())],
            shape: &self.shape,
        }
    }

    /// Returns the flat data.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Returns the shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }
}

/// Named outputs in engine order.
#[derive(Clone, Debug, Default)]
pub struct OutputMap<'a> {
    entries: Vec<(String, TensorView<'a>)>,
}

impl<'a> OutputMap<'a> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an output. A repeated name replaces the earlier view in place.
    pub fn insert(&mut self, name: impl Into<String>, view: TensorView<'a>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = view,
            None => self.entries.push((name, view)),
        }
    }

    /// Builder-style variant of [`OutputMap::insert`].
    pub fn with(mut self, name: impl Into<String>, view: TensorView<'a>) -> Self {
        self.insert(name, view);
        self
    }

    /// Looks up an output by exact name.
    pub fn get(&self, name: &str) -> Option<TensorView<'a>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, view)| *view)
    }

    /// Returns the output at encounter position `idx`.
    pub fn get_index(&self, idx: usize) -> Option<(&str, TensorView<'a>)> {
        self.entries
            .get(idx)
            .map(|(name, view)| (name.as_str(), *view))
    }

    /// Iterates `(name, view)` pairs in encounter order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, TensorView<'a>)> + '_ {
        self.entries.iter().map(|(name, view)| (name.as_str(), *view))
    }

    /// Returns the number of outputs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no outputs were supplied.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(String, TensorView<'a>)> for OutputMap<'a> {
    fn from_iter<I: IntoIterator<Item = (String, TensorView<'a>)>>(iter: I) -> Self {
        let mut map = OutputMap::new();
        for (name, view) in iter {
            map.insert(name, view);
        }
        map
    }
}
