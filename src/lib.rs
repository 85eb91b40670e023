pub mod config;
pub mod error;
pub mod indexer;
pub mod models;
pub mod rag;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use models::{Collection, CollectionEntry, Dataset, IngestReport, QuestionRecord};
pub use rag::Ingestor;
