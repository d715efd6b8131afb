//! Tag Contact - pairwise contact estimation from tag positioning and ranging data
//!
//! Two independent sensing systems observe a pair of tagged persons: an absolute
//! positioning system reporting (x, y) per tag, and a direct inter-tag ranging
//! system reporting the distance between the tags. The crate reconciles both
//! recordings through a deterministic batch pipeline: verification → tag id
//! repair → noise filtering → distance cross-validation → contact segmentation.
//!
//! ## Modules
//!
//! - **table**: Load position and ranging tables, export contact records
//! - **pipeline**: Run the full analysis over one recorded session
//! - **segmenter**: Contact interval extraction and statistics

pub mod config;
pub mod cross_validation;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod reconciler;
pub mod report;
pub mod segmenter;
pub mod table;
pub mod types;
pub mod verification;

pub use config::{AnalysisConfig, ThresholdComparison};
pub use error::AnalysisError;
pub use pipeline::{analyze_session, ContactAnalyzer};
pub use reconciler::CyclePattern;
pub use report::ReportEncoder;
pub use segmenter::ContactSegmenter;

/// Crate version embedded in all reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "tag-contact";
