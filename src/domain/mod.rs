pub mod article;
pub mod types;

pub use article::{CandidateArticle, ValidatedArticle, ValidationReport, ValidationStats};
pub use types::{
    ClassificationOutcome, ClassificationResult, ClassificationSource, WasteCategory, WasteImage,
};
