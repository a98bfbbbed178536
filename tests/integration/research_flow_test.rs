//! Conversation flow, progress, and finalization tests against a scripted
//! advisor and an in-memory database.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use conviction::services::ResearchEngine;
use conviction::storage::Database;
use conviction::utils::error::AppError;
use conviction_advisor::AdvisorError;
use conviction_research::{FinalizerState, Taxonomy, ThesisStance};

use crate::support::{ScriptedAdvisor, ScriptedReply};

fn engine_with(replies: Vec<ScriptedReply>) -> (Arc<ResearchEngine>, Arc<ScriptedAdvisor>) {
    let backend = Arc::new(ScriptedAdvisor::new(replies));
    let db = Database::new_in_memory().unwrap();
    let engine = Arc::new(ResearchEngine::new(backend.clone(), db));
    (engine, backend)
}

#[tokio::test]
async fn test_streamed_reply_lands_in_transcript() {
    let (engine, _) = engine_with(vec![ScriptedReply::text("Cameco mines uranium.")]);
    let session = engine.open_session("u1", "CCJ", Some("Cameco".to_string()));

    let outcome = session.send_message("What does Cameco do?").await.unwrap();
    assert_eq!(outcome.reply, "Cameco mines uranium.");
    assert!(outcome.completed);

    let transcript = session.transcript().await;
    assert_eq!(transcript.turns().len(), 2);
    assert_eq!(
        transcript.last_assistant_text(),
        Some("Cameco mines uranium.")
    );
}

#[tokio::test]
async fn test_follow_up_attachment_without_text_change() {
    let reply = ScriptedReply {
        chunks: vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Here you go.\"}}]}\n".to_vec(),
            b"data: {\"type\":\"follow_ups\",\"options\":[{\"label\":\"Show news\",\"type\":\"news\",\"ticker\":\"CCJ\"}]}\n".to_vec(),
            b"data: [DONE]\n".to_vec(),
        ],
        ..Default::default()
    };
    let (engine, _) = engine_with(vec![reply]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("Anything new?").await.unwrap();
    assert_eq!(outcome.follow_ups.len(), 1);
    assert_eq!(outcome.follow_ups[0].label, "Show news");

    let transcript = session.transcript().await;
    let carrying: Vec<_> = transcript
        .turns()
        .iter()
        .filter(|t| !t.follow_ups.is_empty())
        .collect();
    assert_eq!(carrying.len(), 1);
    assert_eq!(carrying[0].text, "Here you go.");
}

#[tokio::test]
async fn test_unlock_and_finalize_end_to_end() {
    let taxonomy = Taxonomy::default();
    let cells: Vec<_> = taxonomy.cells().collect();

    // Five questions per cell, cell by cell, 45 exchanges in total.
    let mut replies = Vec::new();
    for cell in &cells {
        for i in 0..5 {
            replies.push(
                ScriptedReply::text("Good question. Here is what matters.").with_classification(
                    cell.section.as_str(),
                    &cell.subsection,
                    &format!("{} insight {}", cell.subsection, i),
                ),
            );
        }
    }

    let (engine, _) = engine_with(replies);
    let session = engine.open_session("u1", "CCJ", Some("Cameco".to_string()));

    let mut first_unlocked_at = None;
    for i in 0..45 {
        let outcome = session
            .send_message(&format!("research question {}", i))
            .await
            .unwrap();
        assert!(outcome.progress_updated);
        assert!(outcome.overall_completion <= 100.0);
        if outcome.unlocked && first_unlocked_at.is_none() {
            first_unlocked_at = Some(i + 1);
        }
    }

    // Overall completion crosses 60 with the 27th classified exchange:
    // five full cells (55.6 overall) plus two questions in the sixth.
    assert_eq!(first_unlocked_at, Some(27));

    let progress = engine.progress("u1", "CCJ").unwrap();
    assert_eq!(
        progress.overall_completion(engine.taxonomy(), &Default::default()),
        100.0
    );

    // Custom stance with empty text is rejected; bullish is accepted.
    let err = session
        .finalize_thesis(ThesisStance::Custom, Some("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let finalized = session
        .finalize_thesis(ThesisStance::Bullish, None)
        .await
        .unwrap();
    assert_eq!(finalized.record.stance, ThesisStance::Bullish);
    assert!(finalized.supporting.iter().any(|s| !s.points.is_empty()));

    assert_eq!(
        engine.thesis().state("u1", "CCJ").unwrap(),
        FinalizerState::Finalized
    );

    // The confirmation turn reached the transcript.
    let transcript = session.transcript().await;
    assert!(transcript
        .last_assistant_text()
        .unwrap()
        .contains("thesis for Cameco is saved"));
}

#[tokio::test]
async fn test_rate_limit_surfaces_before_any_content() {
    let (engine, backend) = engine_with(vec![]);
    *backend.fail_with.lock().unwrap() = Some(AdvisorError::RateLimited {
        message: "too many requests".to_string(),
    });

    let session = engine.open_session("u1", "CCJ", None);
    let err = session.send_message("hello").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Advisor(AdvisorError::RateLimited { .. })
    ));

    // Only the user turn exists; no assistant turn was opened.
    let transcript = session.transcript().await;
    assert_eq!(transcript.turns().len(), 1);
}

#[tokio::test]
async fn test_interrupted_stream_keeps_content_and_skips_classification() {
    let reply = ScriptedReply {
        // No terminal marker: the transport dropped mid-reply.
        chunks: vec![b"data: {\"choices\":[{\"delta\":{\"content\":\"Partial ans\"}}]}\n".to_vec()],
        ..Default::default()
    };
    let (engine, backend) = engine_with(vec![reply]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("question").await.unwrap();
    assert!(!outcome.completed);
    assert_eq!(outcome.reply, "Partial ans");
    assert!(!outcome.progress_updated);
    assert_eq!(backend.classify_calls.load(Ordering::SeqCst), 0);

    // The partial content was kept, not discarded.
    let transcript = session.transcript().await;
    assert_eq!(transcript.last_assistant_text(), Some("Partial ans"));
}

#[tokio::test]
async fn test_in_stream_metadata_replaces_classifier_round_trip() {
    let reply = ScriptedReply {
        chunks: vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Risks below.\"}}]}\n".to_vec(),
            b"data: {\"type\":\"advisor_metadata\",\"classification\":{\"category\":\"risks\",\"subcategory\":\"market_risks\",\"summary\":\"Spot prices swing hard.\"},\"suggested_questions\":[\"What about contracts?\"]}\n".to_vec(),
            b"data: [DONE]\n".to_vec(),
        ],
        ..Default::default()
    };
    let (engine, backend) = engine_with(vec![reply]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("What are the risks?").await.unwrap();
    assert!(outcome.progress_updated);
    assert_eq!(outcome.suggested_questions, vec!["What about contracts?"]);
    // Metadata carried the label, so no second round-trip happened.
    assert_eq!(backend.classify_calls.load(Ordering::SeqCst), 0);

    let progress = engine.progress("u1", "CCJ").unwrap();
    let cell = progress
        .cell(conviction_research::Section::Risks, "market_risks")
        .unwrap();
    assert_eq!(cell.questions_asked, 1);
    assert_eq!(cell.summary_points, vec!["Spot prices swing hard."]);
}

#[tokio::test]
async fn test_milestones_flip_once_and_skip_redundant_writes() {
    let (engine, _) = engine_with(vec![
        ScriptedReply::text("a"),
        ScriptedReply::text("b"),
        ScriptedReply::text("c"),
    ]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("What are the risks here?").await.unwrap();
    assert!(outcome.milestones_updated);

    // Same keyword again: flag already set, nothing to write.
    let outcome = session.send_message("more about risks please").await.unwrap();
    assert!(!outcome.milestones_updated);

    // A different keyword flips a different flag.
    let outcome = session
        .send_message("how does the valuation compare to peers?")
        .await
        .unwrap();
    assert!(outcome.milestones_updated);
}

#[tokio::test]
async fn test_close_mid_stream_stops_deltas_and_keeps_content() {
    let reply = ScriptedReply {
        chunks: vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Partial \"}}]}\n".to_vec(),
            b"data: {\"choices\":[{\"delta\":{\"content\":\"answer.\"}}]}\n".to_vec(),
            b"data: [DONE]\n".to_vec(),
        ],
        // The stream parks after the first chunk until the session closes.
        wait_for_cancel_after: Some(0),
        ..Default::default()
    };
    let (engine, backend) = engine_with(vec![reply]);
    let session = Arc::new(engine.open_session("u1", "CCJ", None));

    let handle = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_message("tell me everything").await }
    });

    // Wait until the first delta is visible, then close the conversation.
    loop {
        let transcript = session.transcript().await;
        if transcript.last_assistant_text() == Some("Partial ") {
            break;
        }
        tokio::task::yield_now().await;
    }
    session.close();

    let outcome = handle.await.unwrap().unwrap();
    assert!(!outcome.completed);
    assert_eq!(outcome.reply, "Partial ");
    assert!(!outcome.progress_updated);
    assert_eq!(backend.classify_calls.load(Ordering::SeqCst), 0);

    // The second delta never reached the transcript.
    let transcript = session.transcript().await;
    assert_eq!(transcript.last_assistant_text(), Some("Partial "));
}

#[tokio::test]
async fn test_dropped_classification_leaves_turn_standing() {
    // The round-trip yields nothing parseable: the turn stands on its own.
    let (engine, backend) = engine_with(vec![ScriptedReply::text("A fine answer.")]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("tell me something").await.unwrap();
    assert!(outcome.completed);
    assert!(!outcome.progress_updated);
    assert_eq!(backend.classify_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        session.transcript().await.last_assistant_text(),
        Some("A fine answer.")
    );

    let progress = engine.progress("u1", "CCJ").unwrap();
    assert_eq!(
        progress.overall_completion(engine.taxonomy(), &Default::default()),
        0.0
    );
}

#[tokio::test]
async fn test_label_outside_taxonomy_is_dropped() {
    let reply = ScriptedReply::text("Vibes are immeasurable.").with_classification(
        "vibes",
        "immaculate",
        "Numbers cannot capture this.",
    );
    let (engine, _) = engine_with(vec![reply]);
    let session = engine.open_session("u1", "CCJ", None);

    let outcome = session.send_message("how are the vibes?").await.unwrap();
    assert!(!outcome.progress_updated);

    let progress = engine.progress("u1", "CCJ").unwrap();
    assert_eq!(
        progress.overall_completion(engine.taxonomy(), &Default::default()),
        0.0
    );
}

#[tokio::test]
async fn test_closed_session_rejects_messages() {
    let (engine, _) = engine_with(vec![ScriptedReply::text("hi")]);
    let session = engine.open_session("u1", "CCJ", None);

    session.close();
    assert!(session.is_closed());

    let err = session.send_message("anyone there?").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(session.transcript().await.is_empty());
}
