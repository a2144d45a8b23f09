pub mod extractor;
pub mod normalize;
pub mod selection;
pub mod tool;

pub use extractor::run;
pub use tool::{MetadataTool, SubprocessMetadataTool, ToolError};
