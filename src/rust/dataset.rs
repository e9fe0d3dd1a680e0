//! Labeled dataset with batch iteration.

use std::borrow::Cow;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::classifier::ClassifierError;
use crate::vectorizer::{BatchInput, Encoded, Vectorizer};

/// Whether records are vectorized up front or on every access.
///
/// Both policies return identical records; eager trades memory for speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Eager,
    Lazy,
}

/// A vectorized record and its class position.
#[derive(Debug, Clone, PartialEq)]
pub struct Example<'a> {
    pub input: Cow<'a, Encoded>,
    pub label: usize,
}

/// Stacked records ready for a forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub inputs: BatchInput,
    pub labels: Vec<usize>,
    /// Dataset positions the rows were drawn from
    pub indices: Vec<usize>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Record order for one pass over the dataset.
pub enum BatchOrder<'r, R: Rng + ?Sized> {
    Sequential,
    /// Shuffle once before partitioning
    Shuffled(&'r mut R),
}

/// Texts paired with class positions, vectorized through a shared [`Vectorizer`].
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    texts: Vec<String>,
    labels: Vec<usize>,
    vectorizer: Vectorizer,
    materialized: Option<Vec<Encoded>>,
}

impl LabeledDataset {
    /// Creates a dataset. Bag-of-words records are materialized eagerly,
    /// sequence records lazily.
    ///
    /// # Errors
    /// `ValidationError` if `texts` and `labels` differ in length.
    pub fn new(texts: Vec<String>, labels: Vec<usize>, vectorizer: Vectorizer) -> Result<Self, ClassifierError> {
        if texts.len() != labels.len() {
            return Err(ClassifierError::ValidationError(format!(
                "Got {} texts but {} labels",
                texts.len(),
                labels.len()
            )));
        }
        let storage = match vectorizer.mode() {
            crate::VectorizeMode::BagOfWords => Storage::Eager,
            crate::VectorizeMode::Sequence => Storage::Lazy,
        };
        let dataset = Self {
            texts,
            labels,
            vectorizer,
            materialized: None,
        };
        Ok(dataset.with_storage(storage))
    }

    /// Switches the storage policy.
    pub fn with_storage(mut self, storage: Storage) -> Self {
        self.materialized = match storage {
            Storage::Eager => Some(self.texts.iter().map(|t| self.vectorizer.encode(t)).collect()),
            Storage::Lazy => None,
        };
        self
    }

    pub fn storage(&self) -> Storage {
        if self.materialized.is_some() {
            Storage::Eager
        } else {
            Storage::Lazy
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn vectorizer(&self) -> &Vectorizer {
        &self.vectorizer
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Record at `index`.
    ///
    /// # Errors
    /// `IndexOutOfRange` when `index >= len()`.
    pub fn get(&self, index: usize) -> Result<Example<'_>, ClassifierError> {
        let label = *self.labels.get(index).ok_or(ClassifierError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;
        let input = match &self.materialized {
            Some(records) => Cow::Borrowed(&records[index]),
            None => Cow::Owned(self.vectorizer.encode(&self.texts[index])),
        };
        Ok(Example { input, label })
    }

    /// Stacks the records at `indices` into one batch.
    pub fn batch(&self, indices: &[usize]) -> Result<Batch, ClassifierError> {
        let examples = indices
            .iter()
            .map(|&i| self.get(i))
            .collect::<Result<Vec<_>, _>>()?;
        let records: Vec<&Encoded> = examples.iter().map(|e| e.input.as_ref()).collect();
        Ok(Batch {
            inputs: BatchInput::stack(&records)?,
            labels: examples.iter().map(|e| e.label).collect(),
            indices: indices.to_vec(),
        })
    }

    /// Number of batches one pass yields: `ceil(len / batch_size)`.
    pub fn num_batches(&self, batch_size: usize) -> usize {
        if batch_size == 0 {
            0
        } else {
            self.len().div_ceil(batch_size)
        }
    }

    /// Partitions the dataset into batches of `batch_size` records for one
    /// pass. The last batch keeps the remainder.
    ///
    /// # Errors
    /// `ValidationError` when `batch_size` is zero.
    pub fn batches<R: Rng + ?Sized>(
        &self,
        batch_size: usize,
        order: BatchOrder<'_, R>,
    ) -> Result<Batches<'_>, ClassifierError> {
        if batch_size == 0 {
            return Err(ClassifierError::ValidationError("Batch size must be greater than zero".into()));
        }
        let mut indices: Vec<usize> = (0..self.len()).collect();
        if let BatchOrder::Shuffled(rng) = order {
            indices.shuffle(rng);
        }
        Ok(Batches {
            dataset: self,
            indices,
            batch_size,
            position: 0,
        })
    }
}

/// Iterator over the batches of one pass.
pub struct Batches<'a> {
    dataset: &'a LabeledDataset,
    indices: Vec<usize>,
    batch_size: usize,
    position: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch, ClassifierError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.indices.len() {
            return None;
        }
        let end = (self.position + self.batch_size).min(self.indices.len());
        let batch = self.dataset.batch(&self.indices[self.position..end]);
        self.position = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.indices.len() - self.position).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}
