mod helpers;

use std::sync::Arc;

use helpers::{retrieval_config, BagOfWordsEmbedder, StubTagger, TEST_DIM};
use memoria::db;
use memoria::features::FeatureExtractor;
use memoria::index::VectorIndex;
use memoria::memory::engine::MemoryEngine;
use memoria::memory::records;

fn build_engine(db_path: &std::path::Path, index: VectorIndex, index_path: std::path::PathBuf) -> MemoryEngine {
    let conn = db::open_database(db_path).unwrap();
    MemoryEngine::with_parts(
        conn,
        index,
        index_path,
        Arc::new(BagOfWordsEmbedder),
        Arc::new(FeatureExtractor::new(Some(Arc::new(StubTagger)), None)),
        None,
        retrieval_config(),
    )
}

#[tokio::test]
async fn engine_state_survives_restart_via_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memories.db");
    let index_path = dir.path().join("index.bin");

    let texts = [
        "Had dinner with Mom at the new Italian restaurant",
        "Finished the quarterly report for work",
        "Long hike up the mountain trail at sunrise",
    ];

    // First life: ingest, record the search results
    let before = {
        let engine = build_engine(&db_path, VectorIndex::new(TEST_DIM), index_path.clone());
        for text in texts {
            engine.add_memory(text, "u1", vec![]).await.unwrap();
        }
        engine
            .search_memories("restaurant dinner", "u1", 10, Some(0.0))
            .await
            .unwrap()
    };
    assert!(!before.is_empty());

    // Second life: restore the index from the snapshot and search again
    let restored = VectorIndex::restore(&index_path, TEST_DIM).unwrap();
    assert_eq!(restored.len(), texts.len());

    let engine = build_engine(&db_path, restored, index_path);
    let after = engine
        .search_memories("restaurant dinner", "u1", 10, Some(0.0))
        .await
        .unwrap();

    assert_eq!(before.len(), after.len());
    for (b, a) in before.iter().zip(after.iter()) {
        assert_eq!(b.record.id, a.record.id);
        assert!((b.similarity_score - a.similarity_score).abs() < 1e-9);
        assert_eq!(b.record.vector_position, a.record.vector_position);
    }
}

#[tokio::test]
async fn restored_index_continues_ordinal_assignment() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memories.db");
    let index_path = dir.path().join("index.bin");

    {
        let engine = build_engine(&db_path, VectorIndex::new(TEST_DIM), index_path.clone());
        engine.add_memory("first life memory", "u1", vec![]).await.unwrap();
        engine.add_memory("another first life memory", "u1", vec![]).await.unwrap();
    }

    let restored = VectorIndex::restore(&index_path, TEST_DIM).unwrap();
    let engine = build_engine(&db_path, restored, index_path);
    engine.add_memory("second life memory", "u1", vec![]).await.unwrap();

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_memories, 3);
    assert_eq!(stats.index_size, 3);

    // Positions stay gapless across the restart
    let conn = db::open_database(&db_path).unwrap();
    let (count, min, max) = records::position_stats(&conn).unwrap();
    assert_eq!((count, min, max), (3, Some(0), Some(2)));
}

#[tokio::test]
async fn snapshot_dimension_skew_is_fatal_on_restore() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("memories.db");
    let index_path = dir.path().join("index.bin");

    {
        let engine = build_engine(&db_path, VectorIndex::new(TEST_DIM), index_path.clone());
        engine.add_memory("a memory", "u1", vec![]).await.unwrap();
    }

    // A differently-dimensioned model cannot load this index
    let err = VectorIndex::restore(&index_path, TEST_DIM * 2).unwrap_err();
    assert!(err.to_string().contains("rebuild the index"));
}
