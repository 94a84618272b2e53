use std::fmt;

/// A named stage of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Rewrites `$`-leading and dotted keys in query and body
    Sanitize,
    /// Loads and persists the server-side session
    Session,
    /// Adds the content security policy and hardening headers
    SecurityHeaders,
    /// Resolves the session's identity reference to the current user
    Authenticate,
    /// Binds the flash message handle
    Flash,
    /// Builds the per-request rendering context
    Context,
    /// Route groups (auth, campgrounds, reviews)
    Router,
    /// Fallback for unmatched requests
    NotFound,
    /// Renders every forwarded error
    ErrorHandler,
}

impl Stage {
    /// Short name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Sanitize => "sanitize",
            Stage::Session => "session",
            Stage::SecurityHeaders => "security-headers",
            Stage::Authenticate => "authenticate",
            Stage::Flash => "flash",
            Stage::Context => "context",
            Stage::Router => "router",
            Stage::NotFound => "not-found",
            Stage::ErrorHandler => "error-handler",
        }
    }

    /// Stages that must run before this one.
    pub fn requires(self) -> &'static [Stage] {
        match self {
            Stage::Sanitize | Stage::Session | Stage::SecurityHeaders => &[],
            Stage::Authenticate => &[Stage::Sanitize, Stage::Session],
            Stage::Flash => &[Stage::Session],
            Stage::Context => &[Stage::Authenticate, Stage::Flash],
            Stage::Router => &[
                Stage::Sanitize,
                Stage::Session,
                Stage::SecurityHeaders,
                Stage::Authenticate,
                Stage::Flash,
                Stage::Context,
            ],
            Stage::NotFound => &[Stage::Router],
            Stage::ErrorHandler => &[Stage::NotFound],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors found while validating a stage ordering
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    /// A stage appears before a stage it depends on
    #[error("stage `{stage}` must come after `{requires}`")]
    MissingDependency {
        /// The misplaced stage
        stage: Stage,
        /// The stage it needs to follow
        requires: Stage,
    },

    /// A stage appears more than once
    #[error("stage `{0}` is registered twice")]
    Duplicate(Stage),

    /// The error handler is missing or not last
    #[error("the error handler must be the last stage")]
    ErrorHandlerNotLast,
}

/// Ordered list of request stages, first to last.
///
/// [`crate::build_app`] registers its middleware in the order of
/// [`Pipeline::standard`]; the server validates that ordering before binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// The ordering every request goes through.
    pub fn standard() -> Self {
        Self::new(vec![
            Stage::Sanitize,
            Stage::Session,
            Stage::SecurityHeaders,
            Stage::Authenticate,
            Stage::Flash,
            Stage::Context,
            Stage::Router,
            Stage::NotFound,
            Stage::ErrorHandler,
        ])
    }

    /// A pipeline with an arbitrary ordering, to be checked with [`Pipeline::validate`].
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// The stages in execution order.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Checks every dependency is satisfied by an earlier stage.
    pub fn validate(&self) -> Result<(), PipelineError> {
        for (index, stage) in self.stages.iter().enumerate() {
            let earlier = &self.stages[..index];
            if earlier.contains(stage) {
                return Err(PipelineError::Duplicate(*stage));
            }
            if let Some(missing) = stage.requires().iter().find(|dep| !earlier.contains(dep)) {
                return Err(PipelineError::MissingDependency {
                    stage: *stage,
                    requires: *missing,
                });
            }
        }

        match self.stages.last() {
            Some(Stage::ErrorHandler) => Ok(()),
            _ => Err(PipelineError::ErrorHandlerNotLast),
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|stage| stage.name()).collect();
        f.write_str(&names.join(" → "))
    }
}
