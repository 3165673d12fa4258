use crate::presentation::config::Environment;

/// Configuration for tracing initialization.
pub struct TracingConfig {
    pub environment: String,
    pub json_format: bool,
}

impl TracingConfig {
    pub fn new(environment: Environment, json_format: bool) -> Self {
        Self {
            environment: environment.to_string(),
            json_format,
        }
    }
}
