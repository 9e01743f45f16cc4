use study_compute::{analyze, Evidence};
use study_core::{ChangeReason, KnowledgeStore};

use crate::helpers::{level, make_quiz, make_tracker, seed_profile};

#[tokio::test]
async fn math_quiz_at_95_percent_moves_two_to_three() {
    let (tracker, store) = make_tracker();
    seed_profile(&store, 42, "Math", 2).await;

    let transition = tracker
        .record_quiz(&make_quiz(42, 1, "Math", 95.0, 4))
        .await
        .unwrap();

    assert_eq!(transition.profile.knowledge_level, level(3));
    let log = store.progressions_for(42, "Math");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].previous_level, level(2));
    assert_eq!(log[0].new_level, level(3));
    assert_eq!(log[0].change_reason, ChangeReason::QuizCompletion);

    let stored = store.get_profile(42, "Math").await.unwrap().unwrap();
    assert_eq!(stored.knowledge_level, level(3));
    assert_eq!(store.quiz_performances().len(), 1);
}

#[tokio::test]
async fn weak_quiz_lowers_level() {
    let (tracker, store) = make_tracker();
    seed_profile(&store, 5, "Math", 4).await;

    // 4 * 0.5 + (5 * 0.2) * 0.5 = 2.5 -> 3
    let transition = tracker
        .apply(5, "Math", Evidence::Quiz { score: 20.0, difficulty: level(5) })
        .await
        .unwrap();
    assert_eq!(transition.profile.knowledge_level, level(3));
    assert_eq!(store.progressions_for(5, "Math").len(), 1);
}

#[tokio::test]
async fn content_analysis_feeds_the_tracker() {
    let (tracker, store) = make_tracker();
    seed_profile(&store, 8, "Biology", 0).await;

    let text = "Photosynthesis in the chloroplast converts light energy; the enzyme \
                cascade regulating metabolism depends on protein synthesis, and \
                mitochondria oxidize substrates through the electron transport chain \
                to sustain the organism's cellular metabolism and chromosome replication.";
    let analysis = analyze(11, text);
    assert!(analysis.knowledge_level >= level(4), "got {:?}", analysis);

    let transition = tracker.apply_content_analysis(8, "Biology", &analysis).await.unwrap();
    // 0 * 0.7 + >=4 * 0.3 >= 1.2 -> at least 1
    assert!(transition.profile.knowledge_level >= level(1));
    assert_eq!(
        transition.progression.map(|p| p.change_reason),
        Some(ChangeReason::ContentAnalysis)
    );
}

#[tokio::test]
async fn subjects_are_independent() {
    let (tracker, store) = make_tracker();
    seed_profile(&store, 1, "Math", 2).await;
    seed_profile(&store, 1, "History", 2).await;

    tracker.override_level(1, "History", 5).await.unwrap();

    let math = store.get_profile(1, "Math").await.unwrap().unwrap();
    assert_eq!(math.knowledge_level, level(2));
    assert!(store.progressions_for(1, "Math").is_empty());
    assert_eq!(store.progressions_for(1, "History").len(), 1);
}
