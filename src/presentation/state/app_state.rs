use std::sync::Arc;

use crate::application::ports::{LlmClient, MediaFetcher};
use crate::application::services::RecipePipeline;

pub struct AppState<M: ?Sized, L: ?Sized>
where
    M: MediaFetcher,
    L: LlmClient,
{
    pub pipeline: Arc<RecipePipeline<M, L>>,
    pub differentiate_error_status: bool,
}

impl<M: ?Sized, L: ?Sized> AppState<M, L>
where
    M: MediaFetcher,
    L: LlmClient,
{
    pub fn new(pipeline: Arc<RecipePipeline<M, L>>) -> Self {
        Self {
            pipeline,
            differentiate_error_status: false,
        }
    }

    pub fn with_differentiated_errors(mut self, enabled: bool) -> Self {
        self.differentiate_error_status = enabled;
        self
    }
}

impl<M: ?Sized, L: ?Sized> Clone for AppState<M, L>
where
    M: MediaFetcher,
    L: LlmClient,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
            differentiate_error_status: self.differentiate_error_status,
        }
    }
}
