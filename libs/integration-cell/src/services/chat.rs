use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;

use crate::models::IntegrationError;

/// Thin proxy in front of the internal chat service. The route accepts a few
/// body shapes from older clients and normalizes them to `{messages}` before
/// forwarding.
pub struct ChatProxyService {
    client: reqwest::Client,
    url: String,
}

impl ChatProxyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.chat_service_url.clone(),
        }
    }

    pub async fn relay(&self, body: &Value) -> Result<Value, IntegrationError> {
        let messages = extract_messages(body).ok_or_else(|| {
            IntegrationError::MissingFields(
                "messages, text, or message is required".to_string(),
            )
        })?;

        debug!("Relaying {} message(s) to chat service", messages.len());

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "messages": messages }))
            .send()
            .await
            .map_err(|e| IntegrationError::UpstreamUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(IntegrationError::UpstreamUnavailable(format!(
                "status {}",
                response.status()
            )));
        }

        let upstream: Value = response
            .json()
            .await
            .map_err(|e| IntegrationError::UpstreamUnavailable(e.to_string()))?;

        if upstream.get("ok").and_then(Value::as_bool) == Some(false) {
            let reason = upstream
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unspecified");
            return Err(IntegrationError::UpstreamRejected(reason.to_string()));
        }

        let result = upstream.get("result").cloned().unwrap_or(upstream);

        let mut relayed = json!({ "ok": true, "result": result });
        if let Some(conversation_id) = body.get("conversationId") {
            relayed["conversationId"] = conversation_id.clone();
        }

        Ok(relayed)
    }
}

/// `messages` passes through as-is; a bare `text` or `message` string becomes
/// a single user message.
fn extract_messages(body: &Value) -> Option<Vec<Value>> {
    if let Some(messages) = body.get("messages").and_then(Value::as_array) {
        if !messages.is_empty() {
            return Some(messages.clone());
        }
    }

    let text = body
        .get("text")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)?;
    if text.is_empty() {
        return None;
    }

    Some(vec![json!({ "role": "user", "content": text })])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_array_passes_through() {
        let body = json!({"messages": [{"role": "user", "content": "hi"}]});
        let messages = extract_messages(&body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["content"], "hi");
    }

    #[test]
    fn bare_text_becomes_a_user_message() {
        for key in ["text", "message"] {
            let body = json!({ key: "hello there" });
            let messages = extract_messages(&body).unwrap();
            assert_eq!(messages[0]["role"], "user");
            assert_eq!(messages[0]["content"], "hello there");
        }
    }

    #[test]
    fn empty_bodies_yield_nothing() {
        assert!(extract_messages(&json!({})).is_none());
        assert!(extract_messages(&json!({"text": ""})).is_none());
        assert!(extract_messages(&json!({"messages": []})).is_none());
    }
}
