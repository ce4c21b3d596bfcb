pub mod category;
pub mod connectivity;
pub mod local;
pub mod pipeline;

pub use connectivity::{Connectivity, HttpConnectivity, StaticConnectivity};
pub use local::{CommandBackend, LocalClassifier, DEFAULT_INFERENCE_TIMEOUT};
pub use pipeline::{ClassificationPipeline, DEFAULT_CONFIDENCE_THRESHOLD};
