//! Services - sign interpretation logic
//!
//! Leaf-first order of the data flow:
//! - `normalizer` - OCR text cleanup
//! - `classifier` - one line to one `Rule`
//! - `clusterer` - OCR blocks to panels
//! - `color` - pixel ratios to sign color and red-ink flag
//! - `temporal` - does a day rule apply right now
//! - `resolver` - panels to a `Determination`
//! - `pipeline` - wires the above together for one image

pub mod classifier;
pub mod clusterer;
pub mod color;
pub mod normalizer;
pub mod pipeline;
pub mod resolver;
pub mod temporal;

// Re-export commonly used types
pub use classifier::classify;
pub use clusterer::{ClusterParams, Clusterer};
pub use color::{ColorClassifier, ColorRatios, ColorThresholds};
pub use pipeline::{PixelAnalyzer, Pipeline, PipelineOutcome};
pub use resolver::Resolver;
