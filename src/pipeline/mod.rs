//! Concurrent read → transform → output pipeline

pub mod error_slot;
pub mod output_stage;
pub mod pipeline_handle;
pub mod read_stage;
pub mod transform_stage;

pub use error_slot::{report_upstream_closure, ErrorSlot, StageError};
pub use output_stage::run_output_stage;
pub use pipeline_handle::{ChordPipeline, PipelineError};
pub use read_stage::run_read_stage;
pub use transform_stage::run_transform_stage;
