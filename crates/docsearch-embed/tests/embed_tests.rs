use docsearch_core::config::{EmbeddingConfig, EmbeddingProvider};
use docsearch_core::traits::Embedder;
use docsearch_embed::{embedder_from_config, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let config = EmbeddingConfig {
        provider: EmbeddingProvider::Hash,
        dimension: 1024,
        ..Default::default()
    };
    let embedder = embedder_from_config(&config).expect("embedder");
    assert_eq!(embedder.dim(), 1024);

    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];
    assert_eq!(v1.len(), 1024);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn shared_words_bring_texts_closer() {
    let e = HashEmbedder::new(1024);
    let texts = vec![
        "price".to_string(),
        "The annual price is $500.".to_string(),
        "Welcome to the docs.".to_string(),
    ];
    let v = e.embed_batch(&texts).unwrap();
    assert!(cosine(&v[0], &v[1]) > cosine(&v[0], &v[2]));
}

#[test]
fn empty_batch_is_empty() {
    let e = HashEmbedder::new(16);
    assert!(e.embed_batch(&[]).unwrap().is_empty());
}
