use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One question from `problems.json`. Fields the indexer does not use
/// (`image`, `lecture`, `solution`, ...) are ignored on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub choices: Vec<String>,
    pub answer: i64,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub grade: Option<String>,
}

/// Records keyed by question id, in file order.
pub type Dataset = IndexMap<String, QuestionRecord>;

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionEntry {
    pub id: String,
    pub document: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub collection: String,
    pub records_loaded: usize,
    pub upserted: usize,
    pub dimension: Option<usize>,
    pub entries_in_collection: u64,
    pub dry_run: bool,
}
