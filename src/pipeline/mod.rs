pub mod extraction;
pub mod processor;
pub mod segmentation;
