//! Chatbot integration: a proxy to the intent-detection service and the
//! payload helpers used by the fulfillment webhook.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use url::Url;

/// Language sent with every detection request.
pub const DEFAULT_LANGUAGE_CODE: &str = "id-ID";

/// Most recommendation cards returned to the chatbot.
pub const MAX_CARDS: usize = 3;

pub const INTRO_TEXT: &str =
    "Tentu, berdasarkan preferensimu, ini beberapa rekomendasi yang paling cocok:";
pub const NO_MATCH_TEXT: &str = "Maaf, saya tidak menemukan rekomendasi yang cocok dengan preferensi Anda. Coba ubah kriteria pencarianmu.";
pub const FAILURE_TEXT: &str =
    "Maaf, terjadi masalah saat menghitung rekomendasi. Coba lagi nanti.";

#[derive(Debug, Clone)]
pub struct ChatbotConfig {
    pub endpoint: Url,
    /// Bearer credential for the endpoint.
    pub token: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatbotError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Intent detection request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Intent detection returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentRequest<'a> {
    session: &'a str,
    query_input: QueryInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryInput<'a> {
    text: TextInput<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TextInput<'a> {
    text: &'a str,
    language_code: &'a str,
}

/// Fulfillment data returned by the intent-detection service.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Fulfillment {
    #[serde(default)]
    pub fulfillment_text: String,
    #[serde(default)]
    pub fulfillment_messages: Vec<Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectIntentResponse {
    query_result: Option<Fulfillment>,
    #[serde(flatten)]
    top_level: Fulfillment,
}

/// Client for the intent-detection service.
#[derive(Clone)]
pub struct ChatbotClient {
    client: Client,
    config: ChatbotConfig,
}

impl ChatbotClient {
    pub fn new(config: ChatbotConfig) -> Result<Self, ChatbotError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ChatbotError::Client)?;
        Ok(Self { client, config })
    }

    /// Forward a user utterance and return the fulfillment of the matched intent.
    pub async fn detect_intent(
        &self,
        text: &str,
        session_id: &str,
    ) -> Result<Fulfillment, ChatbotError> {
        let body = DetectIntentRequest {
            session: session_id,
            query_input: QueryInput {
                text: TextInput {
                    text,
                    language_code: DEFAULT_LANGUAGE_CODE,
                },
            },
        };

        let mut request = self.client.post(self.config.endpoint.clone()).json(&body);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatbotError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: DetectIntentResponse = response.json().await?;
        debug!(session_id = %session_id, "Intent detected");
        Ok(parsed.query_result.unwrap_or(parsed.top_level))
    }
}

/// Translate chatbot parameters into engine filters.
///
/// Difficulty `beginner`/`pemula` caps the difficulty scale at 4 and
/// `intermediate`/`menengah` at 7. Safety `safe`/`aman` requires at least 6.
pub fn translate_parameters(params: &Value) -> Value {
    let text = |keys: &[&str]| {
        keys.iter()
            .find_map(|key| params.get(*key).and_then(Value::as_str))
            .map(|v| v.trim().to_lowercase())
    };

    let mut filters = Map::new();
    match text(&["kesulitan", "difficulty"]).as_deref() {
        Some("pemula" | "beginner") => {
            filters.insert("max_kesulitan_skala".into(), json!(4));
        }
        Some("menengah" | "intermediate") => {
            filters.insert("max_kesulitan_skala".into(), json!(7));
        }
        _ => {}
    }
    if let Some("aman" | "safe") = text(&["keamanan", "safety"]).as_deref() {
        filters.insert("min_keamanan_skala".into(), json!(6));
    }
    Value::Object(filters)
}

fn plain(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Build the webhook reply for a ranked mountain list.
pub fn webhook_response(recommendations: &[Value]) -> Value {
    if recommendations.is_empty() {
        return json!({ "fulfillmentText": NO_MATCH_TEXT });
    }

    let mut messages = vec![json!({ "text": { "text": [INTRO_TEXT] } })];
    messages.extend(recommendations.iter().take(MAX_CARDS).map(|rec| {
        json!({
            "card": {
                "title": plain(rec.get("nama_gunung")),
                "subtitle": format!("Skor Rekomendasi: {}", plain(rec.get("skor_agregat"))),
                "buttons": [{
                    "text": "Lihat Detail",
                    "postback": format!("/gunung/{}", plain(rec.get("id_gunung"))),
                }],
            }
        })
    }));

    json!({ "fulfillmentMessages": messages })
}

/// Webhook reply used when anything goes wrong.
pub fn webhook_failure() -> Value {
    json!({ "fulfillmentText": FAILURE_TEXT })
}
