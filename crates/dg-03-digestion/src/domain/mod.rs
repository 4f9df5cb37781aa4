pub mod commit_plan;
pub mod errors;
pub mod session;

pub use commit_plan::{commit_order, CommitStep, StepSource, COMMIT_PLAN};
pub use errors::{DigestError, DigestFailure, SessionError};
pub use session::{digest_block, discard_height, BatchSession};
