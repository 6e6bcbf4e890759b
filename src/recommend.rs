//! Bridge to the external recommendation engine.
//!
//! The engine is a script invoked as `<command> <script> <preferences-json>`
//! that prints a JSON document on stdout.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, error};

/// How long the engine may run before it is killed.
pub const DEFAULT_ENGINE_TIMEOUT: Duration = Duration::from_secs(30);

/// How to launch the engine.
#[derive(Debug, Clone)]
pub struct RecommenderConfig {
    pub command: String,
    pub script: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("Recommendation engine script not found: {0}")]
    ScriptMissing(String),
    #[error("Failed to start recommendation engine: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("Recommendation engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Recommendation engine returned invalid JSON: {0}")]
    InvalidOutput(#[source] serde_json::Error),
    #[error("Recommendation engine timed out after {0:?}")]
    Timeout(Duration),
}

/// Which ranked list of the engine output a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendationKind {
    Mountains,
    Trails,
}

impl RecommendationKind {
    fn output_key(self) -> &'static str {
        match self {
            RecommendationKind::Mountains => "rekomendasi_gunung",
            RecommendationKind::Trails => "rekomendasi_jalur",
        }
    }
}

/// Ranked list and metadata extracted from the engine output.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendations {
    pub items: Vec<Value>,
    pub metadata: Value,
}

impl Recommendations {
    /// Pick the list for `kind`; absent or non-array values become empty.
    pub fn from_output(output: &Value, kind: RecommendationKind) -> Self {
        let items = output
            .get(kind.output_key())
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let metadata = output
            .get("metadata")
            .filter(|m| m.is_object())
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default()));
        Self { items, metadata }
    }
}

/// Runs the engine once per call. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Recommender {
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Self {
        Self { config }
    }

    /// Run the engine with the given preferences and parse its stdout.
    pub async fn run(&self, preferences: &Value) -> Result<Value, RecommendError> {
        if !tokio::fs::try_exists(&self.config.script)
            .await
            .unwrap_or(false)
        {
            return Err(RecommendError::ScriptMissing(
                self.config.script.display().to_string(),
            ));
        }

        let child = Command::new(&self.config.command)
            .arg(&self.config.script)
            .arg(preferences.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(RecommendError::Spawn)?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| RecommendError::Timeout(self.config.timeout))?
            .map_err(RecommendError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            error!(status = %output.status, stderr = %stderr, "Recommendation engine failed");
            return Err(RecommendError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!(bytes = output.stdout.len(), "Recommendation engine finished");
        serde_json::from_slice(&output.stdout).map_err(RecommendError::InvalidOutput)
    }

    /// Run the engine and extract the list for `kind`.
    pub async fn recommend(
        &self,
        preferences: &Value,
        kind: RecommendationKind,
    ) -> Result<Recommendations, RecommendError> {
        let output = self.run(preferences).await?;
        Ok(Recommendations::from_output(&output, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_output_picks_list_by_kind() {
        let output = json!({
            "rekomendasi_gunung": [{"id_gunung": 1}],
            "rekomendasi_jalur": [{"id_jalur": 7}, {"id_jalur": 8}],
            "metadata": {"total": 2}
        });

        let mountains = Recommendations::from_output(&output, RecommendationKind::Mountains);
        assert_eq!(mountains.items, vec![json!({"id_gunung": 1})]);
        assert_eq!(mountains.metadata, json!({"total": 2}));

        let trails = Recommendations::from_output(&output, RecommendationKind::Trails);
        assert_eq!(trails.items.len(), 2);
    }

    #[test]
    fn test_from_output_defaults() {
        let empty = Recommendations::from_output(&json!({}), RecommendationKind::Trails);
        assert!(empty.items.is_empty());
        assert_eq!(empty.metadata, json!({}));

        let wrong = Recommendations::from_output(
            &json!({"rekomendasi_gunung": "none", "metadata": 3}),
            RecommendationKind::Mountains,
        );
        assert!(wrong.items.is_empty());
        assert_eq!(wrong.metadata, json!({}));
    }

    #[tokio::test]
    async fn test_missing_script() {
        let recommender = Recommender::new(RecommenderConfig {
            command: "sh".to_string(),
            script: PathBuf::from("/nonexistent/engine.py"),
            timeout: DEFAULT_ENGINE_TIMEOUT,
        });
        let err = recommender.run(&json!({})).await.unwrap_err();
        assert!(matches!(err, RecommendError::ScriptMissing(_)));
    }
}
