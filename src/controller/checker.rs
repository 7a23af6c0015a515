//! Result checkers
//!
//! A checker turns `(action, method, reason, return)` into success or a
//! classified [`ControllerError`]. Classification only ever looks at the
//! reason text: the controller does not report absence through HTTP status.

use crate::error::ControllerError;

/// Reason fragment the controller uses for absent objects
pub const DOES_NOT_EXIST: &str = "does not exist";

/// Classifies a completed controller call
pub trait ResultChecker: Send + Sync {
    fn check(&self, action: &str, method: &str, reason: &str, ok: bool) -> Result<(), ControllerError>;
}

impl<F> ResultChecker for F
where
    F: Fn(&str, &str, &str, bool) -> Result<(), ControllerError> + Send + Sync,
{
    fn check(&self, action: &str, method: &str, reason: &str, ok: bool) -> Result<(), ControllerError> {
        self(action, method, reason, ok)
    }
}

/// Default checker: any `return=false` is a generic rejection
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCheck;

impl ResultChecker for BasicCheck {
    fn check(&self, action: &str, method: &str, reason: &str, ok: bool) -> Result<(), ControllerError> {
        if ok {
            return Ok(());
        }
        Err(ControllerError::ApiRejected {
            action: action.to_string(),
            method: method.to_string(),
            reason: reason.to_string(),
        })
    }
}

/// Maps failures whose reason contains one of `patterns` to
/// [`ControllerError::NotFound`]; everything else falls back to [`BasicCheck`].
#[derive(Debug, Clone)]
pub struct NotFoundCheck {
    patterns: Vec<String>,
}

impl NotFoundCheck {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Checker recognising the controller's "does not exist" phrase
    pub fn does_not_exist() -> Self {
        Self::new([DOES_NOT_EXIST])
    }

    /// Add another reason fragment
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    fn matches(&self, reason: &str) -> bool {
        self.patterns.iter().any(|p| reason.contains(p.as_str()))
    }
}

impl Default for NotFoundCheck {
    fn default() -> Self {
        Self::does_not_exist()
    }
}

impl ResultChecker for NotFoundCheck {
    fn check(&self, action: &str, method: &str, reason: &str, ok: bool) -> Result<(), ControllerError> {
        if !ok && self.matches(reason) {
            tracing::debug!("{} {}: treating '{}' as not found", action, method, reason);
            return Err(ControllerError::NotFound);
        }
        BasicCheck.check(action, method, reason, ok)
    }
}
