//! Server settings, read from flags or the environment

use clap::Parser;
use memory_core::memory::{DEFAULT_BASE_URL, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_MODEL};
use memory_core::{EmbeddingService, QdrantConfig, EMBEDDING_DIM};

/// mem0 memory server
#[derive(Parser, Clone)]
#[command(name = "mem0-server", version, about = "REST API for per-user semantic memory")]
pub struct Settings {
    /// Qdrant endpoint
    #[arg(long, env = "QDRANT_URL")]
    pub qdrant_url: String,

    /// Qdrant API key
    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true)]
    pub qdrant_api_key: Option<String>,

    /// API key for the embeddings provider
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Embedding model
    #[arg(long, env = "OPENAI_EMBEDDING_MODEL", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Vector size produced by the embedding model
    #[arg(
        long,
        env = "OPENAI_EMBEDDING_DIM",
        default_value_t = EMBEDDING_DIM as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub embedding_dim: u64,

    /// Base URL of the OpenAI-compatible embeddings API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Qdrant collection holding the memories
    #[arg(long, env = "MEM0_COLLECTION", default_value = DEFAULT_COLLECTION)]
    pub collection: String,

    /// Address to bind
    #[arg(long, env = "MEM0_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MEM0_PORT", default_value_t = 8002)]
    pub port: u16,

    /// Comma-separated allowed CORS origins, `*` for any
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Log level used when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Include internal error details in responses
    #[arg(long, env = "DEBUG", default_value_t = false, value_parser = parse_debug_flag)]
    pub debug: bool,
}

/// Only "true" and "1" turn debug on; any other `DEBUG` value leaves it off
fn parse_debug_flag(value: &str) -> Result<bool, std::convert::Infallible> {
    Ok(matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1"
    ))
}

// Keeps API keys out of logs
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("qdrant_url", &self.qdrant_url)
            .field("qdrant_api_key", &self.qdrant_api_key.as_ref().map(|_| "***"))
            .field("embedding_model", &self.embedding_model)
            .field("embedding_dim", &self.embedding_dim)
            .field("openai_base_url", &self.openai_base_url)
            .field("collection", &self.collection)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("cors_origins", &self.cors_origins)
            .field("log_level", &self.log_level)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// `host:port` the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Allowed origins; `None` means any origin
    pub fn cors_origin_list(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    pub fn qdrant_config(&self) -> QdrantConfig {
        QdrantConfig::new(&self.qdrant_url)
            .with_api_key(self.qdrant_api_key.clone())
            .with_collection(&self.collection)
            .with_vector_size(self.embedding_dim)
    }

    pub fn embedding_service(&self) -> EmbeddingService {
        EmbeddingService::new_custom(
            &self.openai_api_key,
            &self.openai_base_url,
            &self.embedding_model,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn parse(extra: &[&str]) -> Settings {
        let mut args = vec![
            "mem0-server",
            "--qdrant-url",
            "http://qdrant:6334",
            "--openai-api-key",
            "sk-test",
        ];
        args.extend_from_slice(extra);
        Settings::try_parse_from(args).unwrap()
    }

    #[test]
    #[serial]
    fn test_defaults() {
        let settings = parse(&[]);
        assert_eq!(settings.collection, "user_memories");
        assert_eq!(settings.port, 8002);
        assert_eq!(settings.embedding_model, "text-embedding-3-small");
        assert_eq!(settings.bind_addr(), "0.0.0.0:8002");
    }

    #[test]
    #[serial]
    fn test_cors_origins() {
        assert!(parse(&[]).cors_origin_list().is_none());

        let settings = parse(&["--cors-origins", "http://a.test, http://b.test,"]);
        assert_eq!(
            settings.cors_origin_list().unwrap(),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    #[serial]
    fn test_debug_hides_keys() {
        let settings = parse(&["--qdrant-api-key", "qdrant-secret"]);
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("qdrant-secret"));
        assert!(!rendered.contains("sk-test"));
    }

    #[test]
    #[serial]
    fn test_debug_env_is_lenient() {
        for (value, expected) in [
            ("true", true),
            ("TRUE", true),
            ("1", true),
            ("false", false),
            ("0", false),
            ("yes please", false),
            ("express:*", false),
        ] {
            std::env::set_var("DEBUG", value);
            let settings = Settings::try_parse_from([
                "mem0-server",
                "--qdrant-url",
                "http://qdrant:6334",
                "--openai-api-key",
                "sk-test",
            ]);
            std::env::remove_var("DEBUG");

            let settings = settings.unwrap_or_else(|e| panic!("DEBUG={value} rejected: {e}"));
            assert_eq!(settings.debug, expected, "DEBUG={value}");
        }

        assert!(!parse(&[]).debug);
        assert!(parse(&["--debug"]).debug);
    }

    #[test]
    #[serial]
    fn test_embedding_dim_reaches_qdrant_config() {
        assert_eq!(parse(&[]).qdrant_config().vector_size, 1536);

        let settings = parse(&[
            "--embedding-model",
            "text-embedding-3-large",
            "--embedding-dim",
            "3072",
        ]);
        assert_eq!(settings.qdrant_config().vector_size, 3072);
        assert_eq!(settings.embedding_service().model(), "text-embedding-3-large");

        let args = [
            "mem0-server",
            "--qdrant-url",
            "http://qdrant:6334",
            "--openai-api-key",
            "sk-test",
            "--embedding-dim",
            "0",
        ];
        assert!(Settings::try_parse_from(args).is_err());
    }

    #[test]
    #[serial]
    fn test_qdrant_config() {
        let settings = parse(&["--collection", "mine", "--qdrant-api-key", ""]);
        let config = settings.qdrant_config();
        assert_eq!(config.collection, "mine");
        assert!(config.api_key.is_none());
    }
}
