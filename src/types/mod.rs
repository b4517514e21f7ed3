// src/types/mod.rs
// Value types that flow through the action pipeline

mod artifact;
mod outcome;
mod proposal;
mod request;
mod stream;

pub use artifact::{Artifact, ProviderResult, ProviderUsage};
pub use outcome::{ExecutionResult, Rejection};
pub use proposal::{Placement, Proposal, ProposalScope, ProposedOperation};
pub use request::{ActionRequest, Modality, ProviderHints, RequestContext, TextRange};
pub use stream::{StreamEvent, StreamFailure};
