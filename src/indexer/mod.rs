pub mod fetch;
pub mod loader;
pub mod synthesizer;

pub use fetch::{ensure_dataset, FetchOutcome};
pub use loader::load_dataset;
pub use synthesizer::synthesize_document;
