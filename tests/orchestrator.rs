//! Integration tests for blocking execution through the orchestrator
//!
//! These run real actions against spy providers and in-memory collaborators.


use draftsmith::AiOrchestrator;
use draftsmith::applier::InMemoryDocument;
use draftsmith::config::AiConfig;
use draftsmith::error::ErrorKind;
use draftsmith::providers::{MockTextProvider, ProviderRegistry};
use draftsmith::types::{ExecutionResult, Placement, ProposedOperation, TextRange};
use draftsmith::usage::{Entitlement, InMemoryUsageService};
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestContext, section_input, selection_input};
use tokio_util::sync::CancellationToken;

fn blocked_code(result: &ExecutionResult) -> &str {
    match result {
        ExecutionResult::Blocked(r) => &r.code,
        other => panic!("expected Blocked, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rewrite_shorten_scenario() {
    let ctx = TestContext::new();
    let input = selection_input("The cat sat.")
        .with_instruction("shorten")
        .with_option("max_words", json!(12));

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &input, &CancellationToken::new())
        .await;
    let proposal = result.proposal().expect("rewrite should succeed");

    assert_eq!(proposal.operations.len(), 1);
    match &proposal.operations[0] {
        ProposedOperation::ReplaceTextRange {
            section_id,
            range,
            new_text,
        } => {
            assert_eq!(section_id, "section-1");
            assert_eq!(*range, TextRange::new(0, 12));
            assert!(new_text.contains("[shortened]"));
            assert!(new_text.split_whitespace().count() <= 12);
        }
        other => panic!("expected a text replacement, got {:?}", other),
    }
    assert_eq!(proposal.provider_id, "mock-text");
    assert!(!proposal.was_fallback_used);
    assert_eq!(proposal.original_text.as_deref(), Some("The cat sat."));
    assert_eq!(ctx.text.call_count(), 1);
    assert_eq!(ctx.usage.event_count().await, 1);
}

#[tokio::test]
async fn test_proposal_applies_to_document() {
    let ctx = TestContext::new();
    let mut document = InMemoryDocument::new("doc-1", "Tides").with_section(
        "section-1",
        "Opening",
        "The cat sat. The dog barked.",
    );
    let input = document
        .input_for("user-1", "section-1")
        .unwrap()
        .with_selection(TextRange::new(0, 12))
        .with_instruction("shorten");

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &input, &CancellationToken::new())
        .await;
    let proposal = result.into_proposal().unwrap();

    // Nothing changes until the proposal is applied
    assert_eq!(document.section_text("section-1"), Some("The cat sat. The dog barked."));

    let report = ctx.orchestrator.applier().apply(&proposal, &mut document).await.unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(
        document.section_text("section-1"),
        Some("[shortened] The cat sat. The dog barked.")
    );
}

#[tokio::test]
async fn test_blank_selection_never_reaches_provider() {
    let ctx = TestContext::new();
    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &section_input("The cat sat."), &CancellationToken::new())
        .await;

    assert_eq!(blocked_code(&result), "ai.selection_required");
    assert_eq!(result.rejection().unwrap().kind, ErrorKind::Validation);
    assert_eq!(ctx.text.call_count(), 0);
    assert_eq!(ctx.usage.event_count().await, 0);
}

#[tokio::test]
async fn test_mismatched_selection_never_reaches_provider() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    // Range over text, but nothing reported as selected
    let mut missing_text = section_input("The cat sat.");
    missing_text.selection = TextRange::new(0, 12);
    let result = ctx.orchestrator.execute("rewrite-selection", &missing_text, &cancel).await;
    assert_eq!(blocked_code(&result), "ai.selection_required");

    // Caret only, with text reported as selected
    let mut caret = section_input("The cat sat.");
    caret.selected_text = "The cat sat.".into();
    let result = ctx.orchestrator.execute("rewrite-selection", &caret, &cancel).await;
    assert_eq!(blocked_code(&result), "ai.invalid_selection");

    let result = ctx
        .orchestrator
        .execute("translate-selection", &caret.clone().with_language("fr"), &cancel)
        .await;
    assert_eq!(blocked_code(&result), "ai.invalid_selection");

    assert_eq!(ctx.text.call_count(), 0);
    assert_eq!(ctx.usage.event_count().await, 0);
}

#[tokio::test]
async fn test_quota_exceeded_blocks_before_provider() {
    let usage = InMemoryUsageService::with_default_entitlement(Entitlement::unlimited().with_max_requests(0));
    let ctx = TestContext::build(
        AiConfig::default(),
        MockTextProvider::new("mock-text").billable(true),
        usage,
    );

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;

    assert_eq!(blocked_code(&result), "ai.quota_exceeded");
    assert_eq!(result.rejection().unwrap().kind, ErrorKind::Policy);
    assert!(result.proposal().is_none());
    assert_eq!(ctx.text.call_count(), 0);
    assert_eq!(ctx.usage.event_count().await, 0);
}

#[tokio::test]
async fn test_non_billable_provider_skips_quota() {
    let usage = InMemoryUsageService::with_default_entitlement(Entitlement::unlimited().with_max_requests(0));
    let ctx = TestContext::build(AiConfig::default(), MockTextProvider::new("mock-text"), usage);

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;
    assert!(result.is_success());
}

#[tokio::test]
async fn test_caller_disabled_applies_to_non_billable() {
    let usage = InMemoryUsageService::with_default_entitlement(Entitlement::disabled());
    let ctx = TestContext::build(AiConfig::default(), MockTextProvider::new("mock-text"), usage);

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;
    assert_eq!(blocked_code(&result), "ai.disabled");
    assert_eq!(ctx.text.call_count(), 0);
}

#[tokio::test]
async fn test_globally_disabled() {
    let ctx = TestContext::with_config(AiConfig {
        enabled: false,
        ..AiConfig::default()
    });

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;
    assert_eq!(blocked_code(&result), "ai.disabled");
    assert!(!ctx.orchestrator.can_run("rewrite-selection"));
    assert_eq!(ctx.text.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_action() {
    let ctx = TestContext::new();
    let result = ctx
        .orchestrator
        .execute("make-coffee", &section_input("x"), &CancellationToken::new())
        .await;
    assert_eq!(blocked_code(&result), "ai.action_not_found");
    assert!(ctx.orchestrator.get_action("make-coffee").is_none());
    assert!(!ctx.orchestrator.can_run("make-coffee"));
}

#[tokio::test]
async fn test_fallback_is_recorded_on_proposal() {
    let ctx = TestContext::with_config(AiConfig {
        default_text_provider_id: Some("retired-model".into()),
        ..AiConfig::default()
    });

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;
    let proposal = result.proposal().unwrap();
    assert_eq!(proposal.provider_id, "mock-text");
    assert!(proposal.was_fallback_used);
    assert!(proposal.route_reason.contains("retired-model"));
}

#[tokio::test]
async fn test_fallback_disabled_blocks() {
    let ctx = TestContext::with_config(AiConfig {
        default_text_provider_id: Some("retired-model".into()),
        allow_provider_fallback: false,
        ..AiConfig::default()
    });

    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;
    assert_eq!(blocked_code(&result), "ai.fallback_disabled");
    assert_eq!(result.rejection().unwrap().kind, ErrorKind::Routing);
    assert_eq!(ctx.text.call_count(), 0);
}

#[tokio::test]
async fn test_no_image_provider() {
    let registry = ProviderRegistry::new()
        .with(Arc::new(MockTextProvider::new("mock-text")))
        .unwrap();
    let orchestrator = AiOrchestrator::builder(AiConfig::default()).registry(registry).build();

    let result = orchestrator
        .execute("generate-cover-image", &section_input("Body"), &CancellationToken::new())
        .await;
    assert_eq!(blocked_code(&result), "ai.no_provider");
    assert!(result.rejection().unwrap().message.contains("image"));
    assert!(!orchestrator.can_run("generate-cover-image"));
    assert!(orchestrator.can_run("rewrite-selection"));
}

#[tokio::test]
async fn test_cover_image_is_stored_and_attached() {
    let ctx = TestContext::new();
    let result = ctx
        .orchestrator
        .execute("generate-cover-image", &section_input("Body"), &CancellationToken::new())
        .await;
    let proposal = result.into_proposal().unwrap();

    assert_eq!(proposal.artifact_ids.len(), 1);
    let artifact_id = &proposal.artifact_ids[0];
    assert_eq!(
        proposal.operations,
        vec![ProposedOperation::AttachArtifact {
            section_id: "section-1".into(),
            artifact_id: artifact_id.clone(),
            placement: Placement::Cover,
        }]
    );
    assert_eq!(ctx.artifacts.len().await, 1);
    assert_eq!(ctx.image.call_count(), 1);

    let mut document = InMemoryDocument::new("doc-1", "Tides").with_section("section-1", "", "Body");
    ctx.orchestrator.applier().apply(&proposal, &mut document).await.unwrap();
    assert_eq!(document.cover.unwrap().mime_type, "image/svg+xml");
}

#[tokio::test]
async fn test_provider_failure() {
    let ctx = TestContext::with_text_provider(MockTextProvider::new("mock-text").failing("upstream 500"));
    let result = ctx
        .orchestrator
        .execute("rewrite-selection", &selection_input("The cat sat."), &CancellationToken::new())
        .await;

    match &result {
        ExecutionResult::Failed(r) => {
            assert_eq!(r.code, "ai.provider_error");
            assert_eq!(r.provider_id.as_deref(), Some("mock-text"));
            assert!(r.message.contains("upstream 500"));
        }
        other => panic!("expected Failed, got {:?}", other),
    }
    assert_eq!(ctx.usage.event_count().await, 0);
}

#[tokio::test]
async fn test_one_usage_record_per_success() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    for _ in 0..3 {
        let result = ctx
            .orchestrator
            .execute("rewrite-selection", &selection_input("The cat sat."), &cancel)
            .await;
        assert!(result.is_success());
    }
    // A rejection records nothing
    ctx.orchestrator
        .execute("translate-selection", &selection_input("The cat sat."), &cancel)
        .await;

    let events = ctx.usage.events().await;
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.action_id == "rewrite-selection"));
    assert!(events.iter().all(|e| e.caller_id == "user-1"));
}

#[tokio::test]
async fn test_translate_requires_language() {
    let ctx = TestContext::new();
    let cancel = CancellationToken::new();

    let result = ctx
        .orchestrator
        .execute("translate-selection", &selection_input("Good morning"), &cancel)
        .await;
    assert_eq!(blocked_code(&result), "ai.language_required");

    let result = ctx
        .orchestrator
        .execute(
            "translate-selection",
            &selection_input("Good morning").with_language("fr"),
            &cancel,
        )
        .await;
    assert_eq!(result.proposal().unwrap().proposed_text.as_deref(), Some("[fr] Good morning"));
}

#[tokio::test]
async fn test_summarize_inserts_at_section_end() {
    let ctx = TestContext::new();
    let result = ctx
        .orchestrator
        .execute("summarize-section", &section_input("Waves rose. Boats left."), &CancellationToken::new())
        .await;
    let proposal = result.into_proposal().unwrap();

    match &proposal.operations[0] {
        ProposedOperation::ReplaceTextRange { range, new_text, .. } => {
            assert_eq!(*range, TextRange::at(23));
            assert_eq!(new_text, "\n\n[summary] Waves rose. Boats left.");
        }
        other => panic!("expected an insertion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_repeat_runs_give_equivalent_proposals() {
    let ctx = TestContext::new();
    let input = selection_input("The cat sat.").with_instruction("shorten");
    let cancel = CancellationToken::new();

    let a = ctx.orchestrator.execute("rewrite-selection", &input, &cancel).await.into_proposal().unwrap();
    let b = ctx.orchestrator.execute("rewrite-selection", &input, &cancel).await.into_proposal().unwrap();

    assert_ne!(a.id, b.id);
    assert_ne!(a.request_id, b.request_id);
    assert_eq!(a.operations, b.operations);
}

#[tokio::test]
async fn test_catalog_listing() {
    let ctx = TestContext::new();
    let actions = ctx.orchestrator.list_actions();
    assert_eq!(actions.len(), 5);
    assert!(actions.iter().all(|a| ctx.orchestrator.can_run(&a.id)));

    let rewrite = ctx.orchestrator.get_action("rewrite-selection").unwrap();
    assert!(rewrite.requires_selection);
}
