//! End-to-end pipeline tests: ingest through search against a temporary
//! SQLite collection, using the deterministic hashing embedder.

use documind::config::Config;
use documind::engine::RetrievalEngine;
use documind::models::DocumentMeta;
use documind::themes::group_themes;
use tempfile::TempDir;

fn test_config(dir: &TempDir, max_chars: usize, overlap_chars: usize) -> Config {
    let mut config = Config::default();
    config.storage.path = dir.path().join("collection.sqlite");
    config.chunking.max_chars = max_chars;
    config.chunking.overlap_chars = overlap_chars;
    config.embedding.dims = Some(384);
    config
}

#[tokio::test]
async fn ingest_short_text_stores_nothing() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "tiny.txt");
    assert_eq!(engine.ingest("too short", &meta).await.unwrap(), 0);
    assert_eq!(engine.ingest("   \n  ", &meta).await.unwrap(), 0);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_chunks, 0);
    assert_eq!(stats.total_documents, 0);
    engine.close().await;
}

#[tokio::test]
async fn ingest_then_search_returns_relevant_chunk() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "order1.pdf");
    let text = "The penalty for non-compliance with SEBI LODR regulations is a statutory fine.";
    assert_eq!(engine.ingest(text, &meta).await.unwrap(), 1);

    let results = engine.search("what is the penalty", 3).await.unwrap();
    assert_eq!(results.len(), 1);

    let hit = &results[0];
    assert!(hit.text.contains("statutory fine"));
    assert_eq!(hit.metadata.filename, "order1.pdf");
    assert!(hit.distance <= 0.8, "distance {}", hit.distance);
    let expected_score = ((1.0 - hit.distance) * 1000.0).round() / 1000.0;
    assert!((hit.relevance_score - expected_score).abs() < 1e-9);
    engine.close().await;
}

#[tokio::test]
async fn empty_query_returns_no_results() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "order1.pdf");
    engine
        .ingest("The penalty for the violation is a statutory fine levied here.", &meta)
        .await
        .unwrap();

    assert!(engine.search("", 3).await.unwrap().is_empty());
    assert!(engine.search("@#$%", 3).await.unwrap().is_empty());
    assert!(engine.search("penalty", 0).await.unwrap().is_empty());
    engine.close().await;
}

#[tokio::test]
async fn irrelevant_matches_fall_below_distance_cutoff() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "recipes.txt");
    engine
        .ingest("Simmer the onions gently until golden, then add the crushed tomatoes.", &meta)
        .await
        .unwrap();

    let results = engine
        .search("quarterly kubernetes deployment pipeline", 3)
        .await
        .unwrap();
    assert!(results.is_empty());
    engine.close().await;
}

#[tokio::test]
async fn diversity_cap_limits_chunks_per_document() {
    let dir = TempDir::new().unwrap();
    // Small chunks, no overlap: each paragraph below becomes its own chunk.
    let engine = RetrievalEngine::open(&test_config(&dir, 60, 0))
        .await
        .unwrap();

    let d1 = DocumentMeta::new("D1", "order1.pdf");
    let d1_text = "The penalty fine sanction applies to alpha cases today.\n\n\
                   The penalty fine sanction applies to beta cases today.\n\n\
                   The penalty fine sanction applies to gamma cases today.";
    assert_eq!(engine.ingest(d1_text, &d1).await.unwrap(), 3);

    let d2 = DocumentMeta::new("D2", "order2.pdf");
    engine
        .ingest("The penalty fine sanction applies to delta cases today.", &d2)
        .await
        .unwrap();

    let results = engine.search("penalty fine sanction", 5).await.unwrap();
    assert_eq!(results.len(), 3);

    let from_d1 = results
        .iter()
        .filter(|r| r.metadata.document_id == "D1")
        .count();
    assert_eq!(from_d1, 2);
    assert!(results.iter().any(|r| r.metadata.document_id == "D2"));
    engine.close().await;
}

#[tokio::test]
async fn identical_text_across_documents_deduplicated() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let shared = "The penalty for the violation is a statutory fine under the act.";
    engine
        .ingest(shared, &DocumentMeta::new("D1", "order1.pdf"))
        .await
        .unwrap();
    engine
        .ingest(shared, &DocumentMeta::new("D2", "order2.pdf"))
        .await
        .unwrap();

    let results = engine.search("what is the penalty", 5).await.unwrap();
    assert_eq!(results.len(), 1);
    engine.close().await;
}

#[tokio::test]
async fn cap_skipped_text_still_served_from_another_document() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 60, 0))
        .await
        .unwrap();

    // D1: two close chunks that fill its diversity cap, then a farther one
    // whose text D2 shares. D1's copy is cap-skipped; D2's copy must still
    // be accepted, not shadowed by the skipped duplicate.
    let shared = "The penalty fine rules for gamma cases are written here.";
    let d1_text = format!(
        "The penalty fine sanction applies to alpha cases today.\n\n\
         The penalty fine sanction applies to beta cases today.\n\n\
         {}",
        shared
    );
    assert_eq!(
        engine
            .ingest(&d1_text, &DocumentMeta::new("D1", "order1.pdf"))
            .await
            .unwrap(),
        3
    );
    assert_eq!(
        engine
            .ingest(shared, &DocumentMeta::new("D2", "order2.pdf"))
            .await
            .unwrap(),
        1
    );

    let results = engine.search("penalty fine sanction", 5).await.unwrap();
    assert_eq!(results.len(), 3);

    let from_d1 = results
        .iter()
        .filter(|r| r.metadata.document_id == "D1")
        .count();
    assert_eq!(from_d1, 2);
    assert!(results
        .iter()
        .any(|r| r.metadata.document_id == "D2" && r.text == shared));
    engine.close().await;
}

#[tokio::test]
async fn reingesting_a_document_replaces_its_chunks() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 60, 0))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "order1.pdf");
    let long_text = "The penalty fine sanction applies to alpha cases today.\n\n\
                     The penalty fine sanction applies to beta cases today.\n\n\
                     The penalty fine sanction applies to gamma cases today.";
    assert_eq!(engine.ingest(long_text, &meta).await.unwrap(), 3);

    let short_text = "The penalty fine sanction applies to alpha cases today.";
    assert_eq!(engine.ingest(short_text, &meta).await.unwrap(), 1);

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_chunks, 1);
    assert_eq!(stats.total_documents, 1);
    engine.close().await;
}

#[tokio::test]
async fn changing_dimensions_recreates_the_collection() {
    let dir = TempDir::new().unwrap();

    let mut config = test_config(&dir, 1000, 200);
    config.embedding.dims = Some(64);
    let engine = RetrievalEngine::open(&config).await.unwrap();
    engine
        .ingest(
            "The penalty for the violation is a statutory fine under the act.",
            &DocumentMeta::new("D1", "order1.pdf"),
        )
        .await
        .unwrap();
    assert_eq!(engine.stats().await.unwrap().total_chunks, 1);
    engine.close().await;

    config.embedding.dims = Some(128);
    let engine = RetrievalEngine::open(&config).await.unwrap();
    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.total_documents, 0);
    assert_eq!(stats.total_chunks, 0);
    assert_eq!(stats.dims, 128);
    engine.close().await;
}

#[tokio::test]
async fn page_markers_flow_through_to_results() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    let meta = DocumentMeta::new("D1", "order1.pdf");
    engine
        .ingest(
            "[Page 4] The penalty for the violation is a statutory fine under the act.",
            &meta,
        )
        .await
        .unwrap();

    let results = engine.search("what is the penalty", 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].page, 4);
    assert_eq!(results[0].metadata.page, 4);
    engine.close().await;
}

#[tokio::test]
async fn stats_report_collection_identity() {
    let dir = TempDir::new().unwrap();
    let engine = RetrievalEngine::open(&test_config(&dir, 1000, 200))
        .await
        .unwrap();

    engine
        .ingest(
            "The penalty for the violation is a statutory fine under the act.",
            &DocumentMeta::new("D1", "order1.pdf"),
        )
        .await
        .unwrap();

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.collection_name, "documents");
    assert_eq!(stats.embedding_model, "feature-hashing");
    assert_eq!(stats.dims, 384);
    assert_eq!(stats.total_documents, 1);
    assert_eq!(stats.total_chunks, 1);
    engine.close().await;
}

#[tokio::test]
async fn search_results_group_into_themes() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, 1000, 200);
    let engine = RetrievalEngine::open(&config).await.unwrap();

    engine
        .ingest(
            "[Page 4] The penalty for non-compliance with SEBI LODR regulations is a statutory fine.",
            &DocumentMeta::new("D1", "order1.pdf"),
        )
        .await
        .unwrap();

    let results = engine.search("what is the penalty", 3).await.unwrap();
    let themes = group_themes(&results, &config.themes);

    let penalty = themes
        .iter()
        .find(|t| t.name == "Penalty Justification")
        .expect("penalty theme matched");
    assert_eq!(penalty.citations, vec!["order1.pdf (page 4)".to_string()]);
    engine.close().await;
}
