//! Integration tests for config

#[cfg(test)]
mod tests {
    use lobup_config::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for var in [
            "LOBUP_REGISTRY_URL",
            "LOBUP_CHUNK_SIZE",
            "LOBUP_RENEWAL_FAILURE",
            "LOBUP_SCRATCH_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[registry]
base_url = "https://registry.test/beta"

[upload]
chunk_size = 1048576
renewal_failure = "abort"

[polling]
max_attempts = 10
processing_interval_secs = 1
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.registry.base_url, "https://registry.test/beta");
        assert_eq!(config.upload.chunk_size, 1_048_576);
        assert_eq!(config.upload.renewal_failure, RenewalFailure::Abort);
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.processing_interval_secs, 1);
        // Untouched sections keep their defaults
        assert_eq!(config.polling.negotiation_interval_secs, 10);
        assert_eq!(config.upload.max_chunk_attempts, 5);
    }

    #[tokio::test]
    async fn test_invalid_file_values_are_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[upload]\nchunk_size = 0").unwrap();
        assert!(Config::load_from_file(temp_file.path()).await.is_err());

        let missing = Config::load_from_file(std::path::Path::new("/nonexistent/lobup.toml")).await;
        assert!(missing.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("LOBUP_REGISTRY_URL", "http://127.0.0.1:9999");
        std::env::set_var("LOBUP_CHUNK_SIZE", "2097152");
        std::env::set_var("LOBUP_RENEWAL_FAILURE", "abort");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.registry.base_url, "http://127.0.0.1:9999");
        assert_eq!(config.upload.chunk_size, 2_097_152);
        assert_eq!(config.upload.renewal_failure, RenewalFailure::Abort);

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("LOBUP_RENEWAL_FAILURE", "sometimes");

        let mut config = Config::default();
        assert!(config.merge_env().is_err());

        clear_env();
    }
}
