use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Arc;

pub type AnalyzerRef = Arc<dyn Analyzer>;

/// Splits text into the words a search index is built over.
pub trait Analyzer: Debug + Send + Sync {
    fn segment(&self, text: &str) -> BTreeSet<String>;
}

/// Lower-cased runs of alphanumeric chars.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordAnalyzer;

impl Analyzer for WordAnalyzer {
    fn segment(&self, text: &str) -> BTreeSet<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect()
    }
}
