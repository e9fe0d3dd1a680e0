//! Tab-separated training corpus.
//!
//! One record per line, `text<TAB>label`, no header row. Blank lines are
//! skipped and the split happens at the first tab.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::{debug, info};

use crate::classifier::ClassifierError;

/// A labeled text record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub text: String,
    pub label: String,
}

impl Record {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
        }
    }
}

/// An ordered collection of labeled records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    records: Vec<Record>,
}

impl Corpus {
    /// Builds a corpus from in-memory `(text, label)` pairs.
    ///
    /// ```
    /// use charcls::Corpus;
    ///
    /// let corpus = Corpus::from_pairs([("播放音乐", "Music-Play")]);
    /// assert_eq!(corpus.len(), 1);
    /// ```
    pub fn from_pairs<I, T, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, L)>,
        T: Into<String>,
        L: Into<String>,
    {
        Self {
            records: pairs.into_iter().map(|(text, label)| Record::new(text, label)).collect(),
        }
    }

    /// Parses tab-separated records from any reader.
    ///
    /// # Errors
    /// - `IoError` if reading fails
    /// - `CorpusError` naming the 1-based line number of a non-blank line
    ///   without a tab separator
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ClassifierError> {
        let mut records = Vec::new();
        for (i, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if line.trim().is_empty() {
                continue;
            }
            let (text, label) = line.split_once('\t').ok_or_else(|| {
                ClassifierError::CorpusError(format!("line {}: missing tab separator", i + 1))
            })?;
            records.push(Record::new(text, label));
        }
        debug!("Parsed {} corpus records", records.len());
        Ok(Self { records })
    }

    /// Reads a tab-separated corpus file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let corpus = Self::from_reader(File::open(path)?)?;
        info!("Loaded {} records from {}", corpus.len(), path.display());
        Ok(corpus)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.text.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.records.iter().map(|r| r.label.as_str())
    }
}
