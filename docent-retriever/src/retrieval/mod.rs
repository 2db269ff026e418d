pub mod chunking_strategy;
pub mod engine;
pub mod index;
pub mod loader;
