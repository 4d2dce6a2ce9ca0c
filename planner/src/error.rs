use thiserror::Error;

/// Failures a planner can report. Expected control flow (a rejected sample,
/// a degenerate steering direction) never produces one of these; those are
/// ordinary no-op steps.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("a start configuration is required")]
    MissingStart,

    #[error("a goal configuration is required")]
    MissingGoal,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },

    /// A tree walk exceeded the node count or a reparent would have created
    /// a cycle. Either one means the cost accounting is broken, so it is
    /// reported instead of being silently truncated.
    #[error("tree inconsistency: {0}")]
    Inconsistency(&'static str),
}

impl PlannerError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        PlannerError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
