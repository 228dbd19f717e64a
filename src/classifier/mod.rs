mod client;
pub mod wire;

pub use client::{classify_or_fail_open, ClassificationClient, HttpClassifier};
