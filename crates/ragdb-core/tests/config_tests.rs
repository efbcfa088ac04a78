use figment::Jail;
use ragdb_core::config::{resolve_with_base, Config, Settings};
use ragdb_core::error::Error;

#[test]
fn defaults_mirror_the_reference_pipeline() {
    let s = Settings::default();
    assert_eq!(s.chunking.chunk_size, 1600);
    assert_eq!(s.chunking.chunk_overlap, 200);
    assert_eq!(s.retrieval.top_k, 3);
    assert_eq!(s.embedding.model, "all-MiniLM-L6-v2");
    assert_eq!(s.generation.model, "gpt-3.5-turbo");
    assert!(s.validate().is_ok());
}

#[test]
fn toml_and_env_are_merged() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
            [chunking]
            chunk_size = 800
            chunk_overlap = 100

            [storage]
            index_path = "idx/index.arrow"
            "#,
        )?;
        jail.set_env("APP_RETRIEVAL__TOP_K", "5");
        let cfg = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
        let s = cfg.settings().map_err(|e| e.to_string())?;
        assert_eq!(s.chunking.chunk_size, 800);
        assert_eq!(s.chunking.chunk_overlap, 100);
        assert_eq!(s.retrieval.top_k, 5);
        assert_eq!(s.storage.index_path, jail.directory().join("idx/index.arrow"));
        let k: usize = cfg.get("retrieval.top_k").map_err(|e| e.to_string())?;
        assert_eq!(k, 5);
        Ok(())
    });
}

#[test]
fn overlap_not_smaller_than_size_is_invalid() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n")?;
        let cfg = Config::load_from(jail.directory()).map_err(|e| e.to_string())?;
        assert!(matches!(cfg.settings(), Err(Error::InvalidConfiguration(_))));
        Ok(())
    });
}

#[test]
fn missing_api_key_fails_fast() {
    Jail::expect_with(|jail| {
        jail.set_env("RAGDB_TEST_MISSING_KEY", "");
        let mut s = Settings::default();
        s.generation.api_key_env = "RAGDB_TEST_MISSING_KEY".to_string();
        assert!(matches!(s.require_api_key(), Err(Error::InvalidConfiguration(_))));
        jail.set_env("RAGDB_TEST_MISSING_KEY", "sk-test");
        assert_eq!(s.require_api_key().map_err(|e| e.to_string())?, "sk-test");
        Ok(())
    });
}

#[test]
fn relative_paths_resolve_against_base() {
    let base = std::path::Path::new("/srv/rag");
    assert_eq!(resolve_with_base(base, "vector_db/index.arrow"), base.join("vector_db/index.arrow"));
    assert_eq!(resolve_with_base(base, "/abs/index.arrow"), std::path::PathBuf::from("/abs/index.arrow"));
}

#[test]
fn explicit_missing_file_is_source_not_found() {
    let tmp = tempfile::tempdir().expect("tmp");
    let path = tmp.path().join("nope.toml");
    assert!(matches!(Config::load_file(&path), Err(Error::SourceNotFound(_))));
}
