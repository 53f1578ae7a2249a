use std::sync::Arc;

use crate::config::Config;
use crate::jobs::JobLifecycle;
use crate::resumes::{DefaultResumeCoordinator, ResumeUploads};

/// Shared application state injected into all route handlers via Axum extractors.
/// Holds no request data; every piece of mutable state lives in the document store.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobLifecycle>,
    pub resumes: Arc<DefaultResumeCoordinator>,
    pub uploads: Arc<ResumeUploads>,
    pub config: Config,
}
