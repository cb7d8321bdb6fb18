// Visual generation: image model calls, object storage uploads, per-visual
// status rows, and the progress view the client polls.

pub mod handlers;
pub mod image_client;
pub mod job;
pub mod progress;
pub mod storage;
pub mod store;
