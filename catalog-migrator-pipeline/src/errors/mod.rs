mod allocator;
mod loader;
mod orchestrator;
mod reader;

pub use allocator::AllocatorError;
pub use loader::LoaderError;
pub use orchestrator::OrchestratorError;
pub use reader::ReaderError;
