// src/mapping.rs
// Turns provider output into a reviewable proposal

use chrono::Utc;
use uuid::Uuid;

use crate::actions::AiAction;
use crate::router::RouteDecision;
use crate::types::{ActionRequest, Placement, Proposal, ProposedOperation};

/// Provider output after images have been registered in the artifact store
#[derive(Debug, Clone, Default)]
pub struct MappedOutput {
    pub text: Option<String>,
    pub artifact_ids: Vec<String>,
}

/// Build the proposal for `output`.
///
/// Text becomes one `ReplaceTextRange` over the request's target range (an
/// insertion when the range is empty); each stored artifact becomes an
/// `AttachArtifact` at the request's placement.
pub fn to_proposal(
    action: &dyn AiAction,
    request: &ActionRequest,
    route: &RouteDecision,
    output: MappedOutput,
) -> Proposal {
    let ctx = request.context();
    let mut operations = Vec::new();

    let proposed_text = output.text.map(|text| {
        let new_text = if ctx.target.is_empty() {
            insertion_text(text.trim(), ctx.target.start, ctx.placement)
        } else {
            text.trim().to_string()
        };
        operations.push(ProposedOperation::ReplaceTextRange {
            section_id: ctx.section_id.clone(),
            range: ctx.target,
            new_text: new_text.clone(),
        });
        new_text
    });

    for artifact_id in &output.artifact_ids {
        operations.push(ProposedOperation::AttachArtifact {
            section_id: ctx.section_id.clone(),
            artifact_id: artifact_id.clone(),
            placement: ctx.placement,
        });
    }

    let summary = operations
        .iter()
        .map(ProposedOperation::describe)
        .collect::<Vec<_>>()
        .join("; ");

    Proposal {
        id: Uuid::new_v4().to_string(),
        section_id: ctx.section_id.clone(),
        label: action.display_name().to_string(),
        action_id: request.action_id().to_string(),
        provider_id: route.provider_id.clone(),
        request_id: request.request_id().to_string(),
        created_at: Utc::now(),
        reason: ctx.instruction.clone(),
        operations,
        artifact_ids: output.artifact_ids,
        summary,
        scope: action.scope(),
        original_text: proposed_text.as_ref().map(|_| ctx.original_text.clone()),
        proposed_text,
        was_fallback_used: route.was_fallback_used,
        route_reason: route.reason.clone(),
    }
}

/// Separate inserted text from its neighbours
fn insertion_text(text: &str, offset: usize, placement: Placement) -> String {
    match placement {
        Placement::SectionStart => format!("{}\n\n", text),
        Placement::SectionEnd if offset > 0 => format!("\n\n{}", text),
        _ if offset > 0 => format!(" {}", text),
        _ => text.to_string(),
    }
}
