use ragdb_core::config::EmbeddingSettings;
use ragdb_core::traits::Embedder;
use ragdb_embed::{get_default_embedder, FakeEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 { a.iter().zip(b).map(|(x, y)| x * y).sum() }

#[test]
fn fake_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { model: "fake".to_string(), dimension: 64, ..EmbeddingSettings::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), 64, "embedding dim follows settings");
    assert_eq!(embedder.dim(), 64);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) { assert!((a - b).abs() <= 1e-6); }
}

#[test]
fn fake_embedder_prefers_shared_words() {
    let e = FakeEmbedder::new(256).expect("fake");
    let q = e.embed("Where did the cat sit?").expect("q");
    let cat = e.embed("The cat sat on the mat").expect("cat");
    let dog = e.embed("A dog ran in the park").expect("dog");
    assert!(cosine(&q, &cat) > cosine(&q, &dog));
}

#[test]
fn fake_embedder_case_and_punctuation_insensitive() {
    let e = FakeEmbedder::new(32).expect("fake");
    assert_eq!(e.embed("Hello, World!").expect("a"), e.embed("hello world").expect("b"));
}

#[test]
fn zero_dimension_is_rejected() {
    assert!(FakeEmbedder::new(0).is_err());
}

#[test]
fn empty_text_embeds_to_zero_vector() {
    let e = FakeEmbedder::new(8).expect("fake");
    assert!(e.embed("").expect("empty").iter().all(|x| *x == 0.0));
}
