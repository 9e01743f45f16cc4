use std::time::Duration;

use study_compute::Evidence;
use study_core::KnowledgeStore;

use crate::helpers::{level, make_tracker};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_quizzes_for_one_subject_are_serialized() {
    let (tracker, store) = make_tracker();

    // From a fresh profile (level 0) two perfect difficulty-5 quizzes give
    // 0 -> 3 (2.5 rounds up) and 3 -> 4, whichever lands first.
    let evidence = Evidence::Quiz { score: 100.0, difficulty: level(5) };
    let a = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.apply(9, "Physics", evidence).await })
    };
    let b = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.apply(9, "Physics", evidence).await })
    };
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let log = store.progressions_for(9, "Physics");
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].new_level, log[1].previous_level);
    assert_eq!(log[1].new_level, level(4));

    let stored = store.get_profile(9, "Physics").await.unwrap().unwrap();
    assert_eq!(stored.knowledge_level, level(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_updates_never_lose_a_step() {
    let (tracker, store) = make_tracker();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                let target = if i % 2 == 0 { 5 } else { 0 };
                tracker.override_level(3, "Chemistry", target).await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let log = store.progressions_for(3, "Chemistry");
    assert_eq!(log.len(), 16);
    // Every entry starts where the previous one ended.
    for pair in log.windows(2) {
        assert_eq!(pair[0].new_level, pair[1].previous_level);
    }
    let stored = store.get_profile(3, "Chemistry").await.unwrap().unwrap();
    assert_eq!(stored.knowledge_level, log[15].new_level);
}

#[tokio::test]
async fn cancelled_caller_leaves_a_consistent_profile() {
    let (tracker, store) = make_tracker();

    let evidence = Evidence::Quiz { score: 100.0, difficulty: level(4) };
    let pending = tracker.apply(6, "Art", evidence);
    // Either the update completes as a whole or not at all.
    let _ = tokio::time::timeout(Duration::from_nanos(1), pending).await;
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(20)).await;

    let log = store.progressions_for(6, "Art");
    let profile = store.get_profile(6, "Art").await.unwrap();
    match profile {
        Some(p) => {
            assert_eq!(p.knowledge_level, level(2));
            assert_eq!(log.len(), 1);
        }
        None => assert!(log.is_empty()),
    }
}
