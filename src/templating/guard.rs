//! Recursion guard for template loading.
//!
//! A template that includes itself asks the loader for its own name over and
//! over. [`RecursionGuard`] counts *consecutive* identical requests and aborts
//! once the count exceeds a threshold. Requests for a different name reset the
//! counter, so wide trees that reuse many partials are never flagged.

use crate::constants::DEFAULT_RECURSION_THRESHOLD;
use crate::core::TemplateId;

use super::error::TemplateError;

/// Consecutive-request counter for one compilation pass.
#[derive(Debug, Clone)]
pub struct RecursionGuard {
    threshold: usize,
    last_requested: Option<TemplateId>,
    consecutive: usize,
    attempts: usize,
}

impl RecursionGuard {
    /// Create a guard that fails once a name is requested more than `threshold` times in a row.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            last_requested: None,
            consecutive: 0,
            attempts: 0,
        }
    }

    /// Record a loader request for `name`.
    ///
    /// # Errors
    ///
    /// [`TemplateError::RecursionDetected`] when the consecutive count for
    /// `name` goes above the threshold.
    pub fn record(&mut self, name: &TemplateId) -> Result<(), TemplateError> {
        self.attempts += 1;

        if self.last_requested.as_ref() == Some(name) {
            self.consecutive += 1;
        } else {
            self.last_requested = Some(name.clone());
            self.consecutive = 1;
        }

        if self.consecutive > self.threshold {
            tracing::warn!(
                template = %name,
                count = self.consecutive,
                "Recursion guard tripped"
            );
            return Err(TemplateError::RecursionDetected {
                name: name.clone(),
                count: self.consecutive,
            });
        }

        Ok(())
    }

    /// Current consecutive count for the last requested name.
    #[must_use]
    pub fn consecutive(&self) -> usize {
        self.consecutive
    }

    /// Total number of requests seen, including the one that tripped the guard.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// The configured threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}

impl Default for RecursionGuard {
    fn default() -> Self {
        Self::new(DEFAULT_RECURSION_THRESHOLD)
    }
}
