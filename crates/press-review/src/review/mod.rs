//! Human review of generated digests.
//!
//! - [`ReviewCoordinator`] owns the one live [`ReviewSession`] and applies
//!   approve/regenerate actions to it
//! - [`ReviewWorkflow`] runs generate → post for review → wait → publish or
//!   regenerate, with a deadline

pub mod session;
pub mod workflow;

pub use session::{
    ActionKind, ActionOutcome, Decision, ReviewAction, ReviewCoordinator, ReviewSession,
};
pub use workflow::{ReviewWorkflow, WorkflowOutcome, WorkflowSettings};
