use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use approx::assert_relative_eq;
use clipscape::retrieval::{self, axis_direction, step};
use clipscape::{
    load_index_json, save_index_json, vector, EmbeddingProvider, ErrorKind, Explorer, FlatIndex,
    HashEmbedder, MetadataStore, Metric, RetrievalConfig, RetrievalError, Snapshot,
    SqliteMetadataStore, VectorId, VectorIndex,
};
use rusqlite::{params, Connection};

const DIM: usize = 32;

/// Write a metadata database with one row per caption, in index order.
fn write_metadata_db(path: &Path, captions: &[String]) -> Result<()> {
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE metadata (id TEXT PRIMARY KEY, url TEXT NOT NULL, description TEXT);",
    )?;
    for (i, caption) in captions.iter().enumerate() {
        conn.execute(
            "INSERT INTO metadata (id, url, description) VALUES (?1, ?2, ?3)",
            params![
                format!("img-{i}"),
                format!("https://images.example/{i}.jpg"),
                caption
            ],
        )?;
    }
    Ok(())
}

fn captions(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("photo {i}")).collect()
}

fn embedded_index(embedder: &HashEmbedder, captions: &[String]) -> Result<FlatIndex> {
    let vectors = captions
        .iter()
        .map(|c| embedder.embed_text(c))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FlatIndex::from_vectors(
        Metric::InnerProduct,
        embedder.dimension(),
        vectors,
    )?)
}

/// Index JSON + SQLite metadata on disk, loaded back through the public API.
fn explorer_on_disk(dir: &Path, n: usize) -> Result<Explorer> {
    let embedder = HashEmbedder::new(DIM);
    let caps = captions(n);
    let index_path = dir.join("index.json");
    let db_path = dir.join("metadata.db");
    save_index_json(&embedded_index(&embedder, &caps)?, &index_path)?;
    write_metadata_db(&db_path, &caps)?;

    let index = load_index_json(&index_path)?;
    let store = SqliteMetadataStore::open(&db_path)?;
    Ok(Explorer::new(
        Arc::new(embedder),
        Snapshot::new(Arc::new(index), Arc::new(store)),
        RetrievalConfig::default(),
    )?)
}

#[test]
fn text_search_joins_metadata_through_row_offset() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let explorer = explorer_on_disk(dir.path(), 40)?;

    let result = explorer.search_by_text("photo 7")?;
    let best = result.best_match.as_ref().expect("best match");
    assert_eq!(best.id, VectorId(7));
    assert_eq!(best.metadata.id, "img-7");
    assert_eq!(best.metadata.description.as_deref(), Some("photo 7"));
    assert_relative_eq!(best.score, 1.0, epsilon = 1e-4);

    assert!(!result.clusters.is_empty() && result.clusters.len() <= 6);
    for entry in &result.clusters {
        assert_ne!(entry.id, best.id);
        assert_eq!(entry.metadata.id, format!("img-{}", entry.id.0));
        assert_eq!(entry.embedding.len(), DIM);
    }
    assert_eq!(result.len(), 1 + result.clusters.len());
    Ok(())
}

#[test]
fn response_uses_wire_field_names() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let explorer = explorer_on_disk(dir.path(), 12)?;
    let result = explorer.search_by_text("photo 0")?;
    let json = serde_json::to_value(&result)?;
    assert_eq!(json["best_match"]["index"], 0);
    assert_eq!(json["best_match"]["metadata"]["id"], "img-0");
    assert_eq!(json["best_match"]["metadata"]["desc"], "photo 0");
    assert!(json["best_match"]["embeddings"].is_array());
    assert!(json["clusters"].is_array());
    Ok(())
}

#[test]
fn missing_metadata_row_fails_whole_request() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(DIM);
    let caps = captions(10);
    let index = embedded_index(&embedder, &caps)?;
    let db_path = dir.path().join("metadata.db");
    write_metadata_db(&db_path, &caps)?;
    Connection::open(&db_path)?.execute("DELETE FROM metadata WHERE rowid = 1", [])?;

    let store = SqliteMetadataStore::open(&db_path)?;
    assert_eq!(store.len()?, 9);

    let query = index.reconstruct(VectorId(0))?;
    let err = retrieval::run(&index, &store, &query, &RetrievalConfig::default()).unwrap_err();
    match err {
        RetrievalError::MetadataInconsistency { vector_id, row } => {
            assert_eq!(vector_id, VectorId(0));
            assert_eq!(row.0, 1);
        }
        other => panic!("expected metadata inconsistency, got {other}"),
    }

    // The same snapshot is refused at startup.
    let startup = Explorer::new(
        Arc::new(embedder),
        Snapshot::new(Arc::new(index), Arc::new(store)),
        RetrievalConfig::default(),
    );
    assert_eq!(
        startup.err().map(|e| e.kind()),
        Some(ErrorKind::InvalidConfig)
    );
    Ok(())
}

#[test]
fn shifted_rows_with_matching_count_rejected_at_startup() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(DIM);
    let caps = captions(10);
    let db_path = dir.path().join("metadata.db");
    write_metadata_db(&db_path, &caps)?;
    // Rows now run 2..=11: the count still matches the index.
    let conn = Connection::open(&db_path)?;
    conn.execute("DELETE FROM metadata WHERE rowid = 1", [])?;
    conn.execute(
        "INSERT INTO metadata (id, url) VALUES (?1, ?2)",
        params!["img-extra", "https://images.example/extra.jpg"],
    )?;
    drop(conn);

    let store = SqliteMetadataStore::open(&db_path)?;
    assert_eq!(store.len()?, 10);

    let err = Explorer::new(
        Arc::new(embedder.clone()),
        Snapshot::new(Arc::new(embedded_index(&embedder, &caps)?), Arc::new(store)),
        RetrievalConfig::default(),
    )
    .err()
    .expect("row gap");
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    assert!(err.to_string().contains("2..=11"));

    // A running explorer refuses the same pair on reload.
    let live = dir.path().join("live");
    std::fs::create_dir(&live)?;
    let explorer = explorer_on_disk(&live, 10)?;
    let shifted = Snapshot::new(
        Arc::new(embedded_index(&embedder, &caps)?),
        Arc::new(SqliteMetadataStore::open(&db_path)?),
    );
    assert!(explorer.reload(shifted).is_err());
    let best = explorer.search_by_text("photo 0")?.best_match.expect("best");
    assert_eq!(best.metadata.id, "img-0");
    Ok(())
}

#[test]
fn navigation_steps_and_degenerate_direction() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let explorer = explorer_on_disk(dir.path(), 30)?;
    let start = explorer.snapshot().index.reconstruct(VectorId(3))?;

    // Walking a single axis returns a full result around the new point.
    let direction = axis_direction(DIM, 5, 1)?;
    let result = explorer.navigate(&start, &direction, Some(0.25))?;
    assert!(result.best_match.is_some());

    // Stepping by zero lands back on the start vector.
    let moved = step(&start, &direction, Some(0.0), DIM)?;
    let expected = vector::normalized(&start).expect("unit");
    for (a, b) in moved.iter().zip(&expected) {
        assert_relative_eq!(*a, *b, epsilon = 1e-6);
    }
    let result = explorer.navigate(&start, &direction, Some(0.0))?;
    assert_eq!(result.best_match.map(|e| e.id), Some(VectorId(3)));

    // Walking exactly backwards cancels the vector out.
    let opposite: Vec<f32> = start.iter().map(|x| -x).collect();
    let err = explorer.navigate(&start, &opposite, Some(1.0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DegenerateVector);
    assert!(err.is_caller_error());

    let err = explorer.navigate(&start, &[1.0, 0.0], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    Ok(())
}

#[test]
fn stepped_vectors_are_unit_norm() -> Result<()> {
    let embedder = HashEmbedder::new(DIM);
    for i in 0..20 {
        let v = embedder.embed_text(&format!("start {i}"))?;
        let d = embedder.embed_image(format!("direction {i}").as_bytes())?;
        let s = 0.1 * i as f32;
        let out = step(&v, &d, Some(s), DIM)?;
        assert_relative_eq!(vector::l2_norm(&out), 1.0, epsilon = 1e-5);
    }
    Ok(())
}

#[test]
fn index_snapshot_roundtrip_preserves_search() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let embedder = HashEmbedder::new(DIM);
    let index = embedded_index(&embedder, &captions(25))?;
    let path = dir.path().join("index.json");
    save_index_json(&index, &path)?;
    let loaded = load_index_json(&path)?;

    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.metric(), Metric::InnerProduct);
    let query = embedder.embed_text("photo 11")?;
    assert_eq!(index.search(&query, 10)?, loaded.search(&query, 10)?);

    let raw: serde_json::Value = serde_json::from_reader(std::fs::File::open(&path)?)?;
    assert_eq!(raw["metadata"]["format_version"], "clipscape-index-1");
    assert_eq!(raw["metric"], "inner_product");
    assert_eq!(raw["dimension"], DIM);
    Ok(())
}

#[test]
fn metric_mismatch_rejected_at_startup() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let db_path = dir.path().join("metadata.db");
    write_metadata_db(&db_path, &captions(2))?;
    let index = FlatIndex::from_vectors(Metric::L2, 2, vec![vec![3.0, 4.0], vec![1.0, 1.0]])?;

    let err = Explorer::new(
        Arc::new(HashEmbedder::new(2)),
        Snapshot::new(
            Arc::new(index),
            Arc::new(SqliteMetadataStore::open(&db_path)?),
        ),
        RetrievalConfig::default(),
    )
    .err()
    .expect("metric mismatch");
    assert_eq!(err.kind(), ErrorKind::InvalidConfig);
    assert!(err.to_string().contains("l2"));
    Ok(())
}

#[test]
fn reload_swaps_snapshot_and_keeps_old_one_on_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let explorer = explorer_on_disk(dir.path(), 10)?;
    let before = explorer.snapshot();
    assert_eq!(explorer.info().vectors, 10);

    let embedder = HashEmbedder::new(DIM);
    let caps = captions(15);
    let db_path = dir.path().join("metadata-15.db");
    write_metadata_db(&db_path, &caps)?;
    let bigger = Snapshot::new(
        Arc::new(embedded_index(&embedder, &caps)?),
        Arc::new(SqliteMetadataStore::open(&db_path)?),
    );
    explorer.reload(bigger)?;
    assert_eq!(explorer.info().vectors, 15);
    // Holders of the previous snapshot still see it.
    assert_eq!(before.index.len(), 10);

    let best = explorer.search_by_text("photo 13")?.best_match.expect("best");
    assert_eq!(best.metadata.id, "img-13");

    // Size mismatch: 15 vectors against 10 rows.
    let broken = Snapshot::new(
        Arc::new(embedded_index(&embedder, &caps)?),
        Arc::new(SqliteMetadataStore::open(&dir.path().join("metadata.db"))?),
    );
    assert!(explorer.reload(broken).is_err());
    assert_eq!(explorer.info().vectors, 15);
    Ok(())
}
