use anyhow::{bail, Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorBackend {
    Template,
    Llm,
}

/// Application configuration loaded from environment variables.
/// Built once in `main` and handed to constructors; nothing reads the environment later.
#[derive(Debug, Clone)]
pub struct Config {
    pub document_store: StoreBackend,
    pub database_url: Option<String>,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub content_generator: GeneratorBackend,
    pub anthropic_api_key: Option<String>,
    /// How long a job may sit in `generating` before another `generate` call may reclaim it.
    pub generation_stale_after_secs: Option<u64>,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let document_store = match lookup("DOCUMENT_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => bail!("DOCUMENT_STORE must be 'postgres' or 'memory', got '{other}'"),
        };
        let database_url = match document_store {
            StoreBackend::Postgres => Some(require("DATABASE_URL")?),
            StoreBackend::Memory => lookup("DATABASE_URL"),
        };

        let content_generator = match lookup("CONTENT_GENERATOR").as_deref().map(str::trim) {
            None | Some("") | Some("template") => GeneratorBackend::Template,
            Some("llm") => GeneratorBackend::Llm,
            Some(other) => bail!("CONTENT_GENERATOR must be 'template' or 'llm', got '{other}'"),
        };
        let anthropic_api_key = match content_generator {
            GeneratorBackend::Llm => Some(require("ANTHROPIC_API_KEY")?),
            GeneratorBackend::Template => lookup("ANTHROPIC_API_KEY"),
        };

        let generation_stale_after_secs = lookup("GENERATION_STALE_AFTER_SECS")
            .map(|v| {
                v.parse::<u64>()
                    .context("GENERATION_STALE_AFTER_SECS must be a whole number of seconds")
            })
            .transpose()?;

        let max_upload_bytes = lookup("MAX_UPLOAD_BYTES")
            .map(|v| {
                v.parse::<usize>()
                    .context("MAX_UPLOAD_BYTES must be a positive integer")
            })
            .transpose()?
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

        Ok(Config {
            document_store,
            database_url,
            s3_bucket: require("S3_BUCKET")?,
            s3_endpoint: require("S3_ENDPOINT")?,
            aws_access_key_id: require("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require("AWS_SECRET_ACCESS_KEY")?,
            content_generator,
            anthropic_api_key,
            generation_stale_after_secs,
            max_upload_bytes,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    pub fn generation_stale_after(&self) -> Option<chrono::Duration> {
        self.generation_stale_after_secs
            .and_then(|secs| i64::try_from(secs).ok())
            .map(chrono::Duration::seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    const S3: [(&str, &str); 4] = [
        ("S3_BUCKET", "resumes"),
        ("S3_ENDPOINT", "http://localhost:9000"),
        ("AWS_ACCESS_KEY_ID", "minio"),
        ("AWS_SECRET_ACCESS_KEY", "minio123"),
    ];

    #[test]
    fn test_defaults_with_postgres() {
        let mut vars = S3.to_vec();
        vars.push(("DATABASE_URL", "postgres://localhost/applytrack"));
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();

        assert_eq!(config.document_store, StoreBackend::Postgres);
        assert_eq!(config.content_generator, GeneratorBackend::Template);
        assert_eq!(config.port, 8080);
        assert_eq!(config.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(config.generation_stale_after().is_none());
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&S3)).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_memory_store_needs_no_database() {
        let mut vars = S3.to_vec();
        vars.push(("DOCUMENT_STORE", "memory"));
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.document_store, StoreBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_llm_generator_requires_api_key() {
        let mut vars = S3.to_vec();
        vars.push(("DOCUMENT_STORE", "memory"));
        vars.push(("CONTENT_GENERATOR", "llm"));
        let err = Config::from_lookup(lookup_from(&vars)).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_stale_ttl_and_unknown_backends() {
        let mut vars = S3.to_vec();
        vars.push(("DOCUMENT_STORE", "memory"));
        vars.push(("GENERATION_STALE_AFTER_SECS", "900"));
        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(
            config.generation_stale_after(),
            Some(chrono::Duration::seconds(900))
        );

        let mut vars = S3.to_vec();
        vars.push(("DOCUMENT_STORE", "dynamo"));
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }
}
