pub mod extractor;
pub mod task;
