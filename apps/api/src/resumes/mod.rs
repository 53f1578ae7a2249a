// Resume library: uploads and the single-default invariant.

pub mod default_coordinator;
pub mod handlers;
pub mod upload;

pub use default_coordinator::DefaultResumeCoordinator;
pub use upload::{ResumeUpload, ResumeUploads, UploadSlot};
