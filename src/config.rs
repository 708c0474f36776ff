//! Pipeline configuration ("valves").
//!
//! Values resolve in three layers, lowest first: built-in defaults, an
//! optional TOML file with a `[valves]` table, then environment variables.
//! Resolution only rejects values that are present but malformed; whether
//! the document path exists is left to ingestion.
//!
//! ```toml
//! [valves]
//! document_path = "/srv/docs"
//! model_name = "llama3"
//! embedding_model_name = "nomic-embed-text"
//! base_url = "http://localhost:11434"
//! top_k = 4
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use globset::Glob;
use serde::Deserialize;

use crate::error::{PipelineError, Result};

pub const DEFAULT_DOCUMENT_PATH: &str = "/app/backend/data/documents";
pub const DEFAULT_MODEL_NAME: &str = "llama3";
pub const DEFAULT_EMBEDDING_MODEL_NAME: &str = "nomic-embed-text";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Resolved, validated settings. Immutable once the pipeline is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Valves {
    pub document_path: PathBuf,
    pub model_name: String,
    pub embedding_model_name: String,
    /// Base URL of the Ollama-compatible server, without a trailing `/`.
    pub base_url: String,
    pub api_key: Option<String>,
    /// Glob patterns (relative to `document_path`) selecting eligible files.
    pub include_globs: Vec<String>,
    /// Chunk size limit, in approximate tokens.
    pub max_tokens: usize,
    /// Passages retrieved per query.
    pub top_k: usize,
    /// Completion length limit sent as `options.max_tokens`.
    pub num_output: u32,
    pub stop: Vec<String>,
    pub timeout_secs: u64,
    /// Response mode used when the request body does not say.
    pub stream: bool,
}

impl Default for Valves {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from(DEFAULT_DOCUMENT_PATH),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            embedding_model_name: DEFAULT_EMBEDDING_MODEL_NAME.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            include_globs: default_include_globs(),
            max_tokens: 256,
            top_k: 4,
            num_output: 256,
            stop: Vec::new(),
            timeout_secs: 120,
            stream: true,
        }
    }
}

fn default_include_globs() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.txt".to_string(),
        "**/*.pdf".to_string(),
    ]
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    valves: FileValves,
}

/// The `[valves]` table. Every key is optional; absent keys keep their default.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileValves {
    document_path: Option<PathBuf>,
    model_name: Option<String>,
    embedding_model_name: Option<String>,
    base_url: Option<String>,
    api_key: Option<String>,
    include_globs: Option<Vec<String>>,
    max_tokens: Option<usize>,
    top_k: Option<usize>,
    num_output: Option<u32>,
    stop: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    stream: Option<bool>,
}

/// Resolve valves from an optional TOML file and the process environment.
pub fn load_valves(path: Option<&Path>) -> Result<Valves> {
    resolve_valves(path, |key| std::env::var(key).ok())
}

/// Resolve valves with an injectable environment lookup.
///
/// Blank environment values count as unset.
pub fn resolve_valves<F>(path: Option<&Path>, env: F) -> Result<Valves>
where
    F: Fn(&str) -> Option<String>,
{
    let mut valves = Valves::default();

    if let Some(path) = path {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let file: ConfigFile = toml::from_str(&content).map_err(|e| {
            PipelineError::Configuration(format!("failed to parse config file: {}", e))
        })?;
        apply_file(&mut valves, file.valves);
    }

    let lookup = |keys: &[&str]| -> Option<String> {
        keys.iter()
            .filter_map(|k| env(k))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    };

    if let Some(v) = lookup(&["DOCUMENT_PATH"]) {
        valves.document_path = PathBuf::from(v);
    }
    if let Some(v) = lookup(&["MODEL_NAME", "LLAMAINDEX_MODEL_NAME"]) {
        valves.model_name = v;
    }
    if let Some(v) = lookup(&["EMBEDDING_MODEL_NAME", "LLAMAINDEX_EMBEDDING_MODEL_NAME"]) {
        valves.embedding_model_name = v;
    }
    if let Some(v) = lookup(&["BASE_URL", "LLAMAINDEX_OLLAMA_BASE_URL"]) {
        valves.base_url = v;
    }
    if let Some(v) = lookup(&["API_KEY"]) {
        valves.api_key = Some(v);
    }
    if let Some(v) = lookup(&["INCLUDE_GLOBS"]) {
        valves.include_globs = v
            .split(',')
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
    }
    if let Some(v) = lookup(&["CHUNK_MAX_TOKENS"]) {
        valves.max_tokens = parse_number("CHUNK_MAX_TOKENS", &v)?;
    }
    if let Some(v) = lookup(&["TOP_K"]) {
        valves.top_k = parse_number("TOP_K", &v)?;
    }
    if let Some(v) = lookup(&["NUM_OUTPUT"]) {
        valves.num_output = parse_number("NUM_OUTPUT", &v)?;
    }
    if let Some(v) = lookup(&["TIMEOUT_SECS"]) {
        valves.timeout_secs = parse_number("TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = lookup(&["STREAM"]) {
        valves.stream = parse_bool("STREAM", &v)?;
    }

    valves.base_url = valves.base_url.trim_end_matches('/').to_string();
    validate(&valves)?;
    Ok(valves)
}

fn apply_file(valves: &mut Valves, file: FileValves) {
    if let Some(v) = file.document_path {
        valves.document_path = v;
    }
    if let Some(v) = file.model_name {
        valves.model_name = v;
    }
    if let Some(v) = file.embedding_model_name {
        valves.embedding_model_name = v;
    }
    if let Some(v) = file.base_url {
        valves.base_url = v;
    }
    if file.api_key.is_some() {
        valves.api_key = file.api_key;
    }
    if let Some(v) = file.include_globs {
        valves.include_globs = v;
    }
    if let Some(v) = file.max_tokens {
        valves.max_tokens = v;
    }
    if let Some(v) = file.top_k {
        valves.top_k = v;
    }
    if let Some(v) = file.num_output {
        valves.num_output = v;
    }
    if let Some(v) = file.stop {
        valves.stop = v;
    }
    if let Some(v) = file.timeout_secs {
        valves.timeout_secs = v;
    }
    if let Some(v) = file.stream {
        valves.stream = v;
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        PipelineError::Configuration(format!(
            "{} must be a non-negative integer, got '{}'",
            key, value
        ))
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(PipelineError::Configuration(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

fn validate(valves: &Valves) -> Result<()> {
    let url = reqwest::Url::parse(&valves.base_url).map_err(|e| {
        PipelineError::Configuration(format!(
            "base_url '{}' is not a valid URL: {}",
            valves.base_url, e
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PipelineError::Configuration(format!(
            "base_url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    if valves.model_name.trim().is_empty() {
        return Err(PipelineError::Configuration("model_name must not be empty".into()));
    }
    if valves.embedding_model_name.trim().is_empty() {
        return Err(PipelineError::Configuration(
            "embedding_model_name must not be empty".into(),
        ));
    }
    if valves.max_tokens == 0 {
        return Err(PipelineError::Configuration("max_tokens must be > 0".into()));
    }
    if valves.top_k == 0 {
        return Err(PipelineError::Configuration("top_k must be >= 1".into()));
    }
    if valves.include_globs.is_empty() {
        return Err(PipelineError::Configuration(
            "include_globs must name at least one pattern".into(),
        ));
    }
    for pattern in &valves.include_globs {
        Glob::new(pattern).map_err(|e| {
            PipelineError::Configuration(format!("invalid include glob '{}': {}", pattern, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env_or_file() {
        let valves = resolve_valves(None, env_from(&[])).unwrap();
        assert_eq!(valves, Valves::default());
        assert_eq!(valves.base_url, "http://localhost:11434");
        assert!(valves.api_key.is_none());
    }

    #[test]
    fn test_env_overrides_defaults() {
        let valves = resolve_valves(
            None,
            env_from(&[
                ("DOCUMENT_PATH", "/tmp/docs"),
                ("MODEL_NAME", "llama2"),
                ("BASE_URL", "http://host.docker.internal:11434/"),
                ("API_KEY", "secret"),
                ("TOP_K", "2"),
                ("STREAM", "false"),
            ]),
        )
        .unwrap();
        assert_eq!(valves.document_path, PathBuf::from("/tmp/docs"));
        assert_eq!(valves.model_name, "llama2");
        assert_eq!(valves.base_url, "http://host.docker.internal:11434");
        assert_eq!(valves.api_key.as_deref(), Some("secret"));
        assert_eq!(valves.top_k, 2);
        assert!(!valves.stream);
    }

    #[test]
    fn test_alias_keys_and_precedence() {
        let valves = resolve_valves(
            None,
            env_from(&[
                ("LLAMAINDEX_MODEL_NAME", "mistral"),
                ("EMBEDDING_MODEL_NAME", "all-minilm"),
                ("LLAMAINDEX_EMBEDDING_MODEL_NAME", "ignored"),
            ]),
        )
        .unwrap();
        assert_eq!(valves.model_name, "mistral");
        assert_eq!(valves.embedding_model_name, "all-minilm");
    }

    #[test]
    fn test_blank_env_is_unset() {
        let valves = resolve_valves(None, env_from(&[("MODEL_NAME", "  ")])).unwrap();
        assert_eq!(valves.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn test_malformed_values_rejected() {
        let cases: &[(&str, &str)] = &[
            ("BASE_URL", "not a url"),
            ("BASE_URL", "ftp://example.com"),
            ("TOP_K", "0"),
            ("TOP_K", "many"),
            ("CHUNK_MAX_TOKENS", "0"),
            ("STREAM", "maybe"),
            ("INCLUDE_GLOBS", "**/*.{md"),
        ];
        for (key, value) in cases {
            let err = resolve_valves(None, env_from(&[(key, value)])).unwrap_err();
            assert!(
                matches!(err, PipelineError::Configuration(_)),
                "{}={} should be a configuration error, got {:?}",
                key,
                value,
                err
            );
        }
    }

    #[test]
    fn test_missing_document_path_is_not_a_config_error() {
        let valves = resolve_valves(
            None,
            env_from(&[("DOCUMENT_PATH", "/definitely/not/here")]),
        )
        .unwrap();
        assert_eq!(valves.document_path, PathBuf::from("/definitely/not/here"));
    }

    #[test]
    fn test_file_layer_then_env() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ragpipe.toml");
        std::fs::write(
            &path,
            r#"[valves]
document_path = "/srv/docs"
model_name = "phi3"
include_globs = ["**/*.md"]
stop = ["\n\n"]
"#,
        )
        .unwrap();

        let valves = resolve_valves(Some(&path), env_from(&[("MODEL_NAME", "llama3.1")])).unwrap();
        assert_eq!(valves.document_path, PathBuf::from("/srv/docs"));
        assert_eq!(valves.model_name, "llama3.1");
        assert_eq!(valves.include_globs, vec!["**/*.md".to_string()]);
        assert_eq!(valves.stop, vec!["\n\n".to_string()]);
    }

    #[test]
    fn test_unreadable_or_invalid_file() {
        let err =
            resolve_valves(Some(Path::new("/no/such/ragpipe.toml")), env_from(&[])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[valves]\nunknown_key = 1\n").unwrap();
        let err = resolve_valves(Some(&path), env_from(&[])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
