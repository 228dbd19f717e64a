pub mod types;

pub use types::{ClassificationResult, Label, LastCheck, TabId};
