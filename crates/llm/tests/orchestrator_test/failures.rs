use std::sync::Arc;

use study_core::{Caller, Classify, ErrorClass, ExtractionStatus, KnowledgeLevel, Outcome};
use study_llm::{AiError, ConversationContext, LlmError, StudyContext};

use crate::helpers::{content, make_orchestrator, ScriptedClient, GUIDE_JSON};

#[tokio::test]
async fn transient_failures_are_retried() {
    let client = Arc::new(
        ScriptedClient::replying(GUIDE_JSON)
            .then(Err(LlmError::Timeout))
            .then(Err(LlmError::from_status(503, "overloaded".into()))),
    );
    let (orchestrator, _store) = make_orchestrator(client.clone());

    let guide = orchestrator
        .generate_study_guide(Caller::Guest, "Plan", &StudyContext::default())
        .await
        .unwrap();
    assert_eq!(guide.value.feedback.summary, "Good grasp of limits");
    assert_eq!(client.calls(), 3);
}

#[tokio::test]
async fn retries_stop_after_three_attempts() {
    let client = Arc::new(
        ScriptedClient::replying(GUIDE_JSON)
            .then(Err(LlmError::from_status(429, "slow down".into())))
            .then(Err(LlmError::from_status(429, "slow down".into())))
            .then(Err(LlmError::from_status(429, "slow down".into()))),
    );
    let (orchestrator, _store) = make_orchestrator(client.clone());

    let result = orchestrator
        .generate_study_guide(Caller::Guest, "Plan", &StudyContext::default())
        .await;
    assert_eq!(client.calls(), 3);
    let err = result.unwrap_err();
    assert!(matches!(err, AiError::Transient { attempts: 3, .. }));

    let outcome: Outcome<()> = Outcome::from(Err::<(), _>(err));
    assert_eq!(outcome.reason(), Some("AI service unavailable, please try again"));
    assert!(matches!(outcome, Outcome::RecoverableError { .. }));
}

#[tokio::test]
async fn bad_request_fails_immediately() {
    let client = Arc::new(
        ScriptedClient::replying(GUIDE_JSON)
            .then(Err(LlmError::from_status(400, "bad prompt".into()))),
    );
    let (orchestrator, _store) = make_orchestrator(client.clone());

    let err = orchestrator
        .generate_study_guide(Caller::Guest, "Plan", &StudyContext::default())
        .await
        .unwrap_err();
    assert_eq!(client.calls(), 1);
    assert_eq!(err.class(), ErrorClass::Fatal);
}

#[tokio::test]
async fn malformed_response_is_not_retried_or_cached() {
    let client = Arc::new(
        ScriptedClient::replying(GUIDE_JSON).then(Ok("Sorry, I can only answer in prose.")),
    );
    let (orchestrator, store) = make_orchestrator(client.clone());
    let ctx = StudyContext::default();

    let err = orchestrator
        .generate_study_guide(Caller::User(8), "Plan", &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::ResponseParse { .. }));
    assert_eq!(err.class(), ErrorClass::Recoverable);
    assert_eq!(client.calls(), 1);
    assert!(store.all().is_empty());

    // Re-prompting the same request reaches the provider again.
    orchestrator
        .generate_study_guide(Caller::User(8), "Plan", &ctx)
        .await
        .unwrap();
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn empty_input_is_rejected_before_any_call() {
    let client = Arc::new(ScriptedClient::replying("unused"));
    let (orchestrator, _store) = make_orchestrator(client.clone());

    let err = orchestrator
        .chat(Caller::Guest, "   ", &ConversationContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Validation(_)));

    let mut failed = content(4, "");
    failed.extraction_status = ExtractionStatus::Failed;
    let err = orchestrator
        .analyze_file(Caller::Guest, &failed, "Math", KnowledgeLevel::new(2).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::Validation(_)));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn crashed_call_does_not_block_the_next_request() {
    let client = Arc::new(ScriptedClient::replying("Fine now.").panicking(1));
    let (orchestrator, store) = make_orchestrator(client.clone());
    let ctx = ConversationContext::default();

    let first = orchestrator.chat(Caller::User(3), "Explain entropy", &ctx).await;
    assert!(matches!(first, Err(AiError::Provider(_))));
    assert!(store.all().is_empty());

    let second = orchestrator
        .chat(Caller::User(3), "Explain entropy", &ctx)
        .await
        .unwrap();
    assert_eq!(second.value.message, "Fine now.");
    assert_eq!(client.calls(), 2);
}
