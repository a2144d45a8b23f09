pub mod duplicates;
pub mod file_date;
pub mod folder_resolve;
pub mod planner;
pub mod sidecars;
pub mod target_path;

pub use planner::run;
