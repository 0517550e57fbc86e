mod helpers;

use std::sync::Arc;

use helpers::{test_engine, test_engine_with, BagOfWordsEmbedder, DownEmbedder, StubVision};
use memoria::memory::engine::EngineError;
use memoria::memory::types::PhotoUpload;

fn photo(url: &str) -> PhotoUpload {
    PhotoUpload {
        url: url.to_string(),
        provenance_id: None,
        metadata: None,
    }
}

#[tokio::test]
async fn dinner_with_mom_gets_family_and_food_categories() {
    let (engine, _dir) = test_engine();

    let id = engine
        .add_memory("Had dinner with Mom at the new Italian restaurant", "u1", vec![])
        .await
        .unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(recent.len(), 1);
    let record = &recent[0];
    assert_eq!(record.id, id);
    assert_eq!(record.content, "Had dinner with Mom at the new Italian restaurant");
    assert!(record.categories.contains("family"));
    assert!(record.categories.contains("food"));
    assert!(record.importance > 0.3);
    assert_eq!(record.vector_position, 0);
    assert!(record.entities.contains("Mom"));
    assert!(record.entities.contains("restaurant"));
}

#[tokio::test]
async fn photo_only_memory_synthesizes_content() {
    let vision = StubVision::new().with(
        "https://img.example/walk.jpg",
        &["dog", "park"],
        &["outdoors"],
    );
    let (engine, _dir) = test_engine_with(Arc::new(BagOfWordsEmbedder), Some(Arc::new(vision)));

    engine
        .add_memory("", "u1", vec![photo("https://img.example/walk.jpg")])
        .await
        .unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(recent[0].content, "A photo of dog and park");
    assert!(recent[0].entities.contains("dog"));
    assert!(recent[0].entities.contains("park"));
    assert_eq!(recent[0].photos.len(), 1);
}

#[tokio::test]
async fn photo_only_memory_with_three_objects_uses_oxford_join() {
    let vision = StubVision::new().with(
        "https://img.example/picnic.jpg",
        &["dog", "park", "ball"],
        &[],
    );
    let (engine, _dir) = test_engine_with(Arc::new(BagOfWordsEmbedder), Some(Arc::new(vision)));

    engine
        .add_memory("", "u1", vec![photo("https://img.example/picnic.jpg")])
        .await
        .unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(recent[0].content, "A photo of dog, park, and ball");
}

#[tokio::test]
async fn failing_photo_is_skipped_not_fatal() {
    // Only one of the two photos is describable
    let vision = StubVision::new().with("https://img.example/ok.jpg", &["cake"], &["birthday"]);
    let (engine, _dir) = test_engine_with(Arc::new(BagOfWordsEmbedder), Some(Arc::new(vision)));

    let id = engine
        .add_memory(
            "",
            "u1",
            vec![
                photo("https://img.example/broken.jpg"),
                photo("https://img.example/ok.jpg"),
            ],
        )
        .await
        .unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(recent[0].id, id);
    assert_eq!(recent[0].content, "A photo of cake");
    // Both attachments are stored; only the describable one contributed signal
    assert_eq!(recent[0].photos.len(), 2);
}

#[tokio::test]
async fn all_photos_failing_still_creates_the_memory() {
    let vision = StubVision::new(); // every describe fails
    let (engine, _dir) = test_engine_with(Arc::new(BagOfWordsEmbedder), Some(Arc::new(vision)));

    engine
        .add_memory("", "u1", vec![photo("https://img.example/broken.jpg")])
        .await
        .unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(recent[0].content, "A photo");
}

#[tokio::test]
async fn empty_text_and_no_photos_is_rejected() {
    let (engine, _dir) = test_engine();
    let err = engine.add_memory("   ", "u1", vec![]).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn down_embedding_service_fails_ingestion_with_specific_reason() {
    let (engine, _dir) = test_engine_with(Arc::new(DownEmbedder), None);
    let err = engine.add_memory("some text", "u1", vec![]).await.unwrap_err();
    assert!(matches!(err, EngineError::Embedding(_)));

    // Nothing was persisted on either side
    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_memories, 0);
    assert_eq!(stats.index_size, 0);
}

#[tokio::test]
async fn positions_are_gapless_and_in_insertion_order() {
    let (engine, _dir) = test_engine();

    for i in 0..5 {
        engine
            .add_memory(&format!("memory number {i}"), "u1", vec![])
            .await
            .unwrap();
    }

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_memories, 5);
    assert_eq!(stats.index_size, 5);

    let mut positions: Vec<i64> = engine
        .recent_memories("u1", 10)
        .await
        .unwrap()
        .iter()
        .map(|r| r.vector_position)
        .collect();
    positions.sort_unstable();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn importance_is_always_within_bounds() {
    let (engine, _dir) = test_engine();

    let texts = [
        "x",
        "Had dinner with Mom at the new Italian restaurant and then walked home through the park talking about work and family and everything else that came to mind",
        "doctor gym workout therapy diet exercise medicine sick",
    ];
    for text in texts {
        engine.add_memory(text, "u1", vec![]).await.unwrap();
    }

    for record in engine.recent_memories("u1", 10).await.unwrap() {
        assert!(
            (0.1..=1.0).contains(&record.importance),
            "importance {} out of bounds for {:?}",
            record.importance,
            record.content
        );
    }
}

#[tokio::test]
async fn no_keyword_match_defaults_to_personal() {
    let (engine, _dir) = test_engine();
    engine.add_memory("zzz qqq xyzzy", "u1", vec![]).await.unwrap();

    let recent = engine.recent_memories("u1", 10).await.unwrap();
    assert_eq!(
        recent[0].categories.iter().collect::<Vec<_>>(),
        vec!["personal"]
    );
}

#[tokio::test]
async fn snapshot_file_is_written_on_every_ingestion() {
    let (engine, dir) = test_engine();
    let snapshot = dir.path().join("index.bin");
    assert!(!snapshot.exists());

    engine.add_memory("first memory", "u1", vec![]).await.unwrap();
    assert!(snapshot.exists());

    let after_first = std::fs::metadata(&snapshot).unwrap().len();
    engine.add_memory("second memory", "u1", vec![]).await.unwrap();
    let after_second = std::fs::metadata(&snapshot).unwrap().len();
    assert!(after_second > after_first);
}
