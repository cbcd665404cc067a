use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Reply from the `search_reddit` endpoint. Both fields are optional:
/// the backend omits `steps` when it has no trace to show and may send
/// `final_output` as null.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchReply {
    #[serde(default)]
    pub steps: Option<serde_json::Value>,
    #[serde(default)]
    pub final_output: Option<String>,
}

impl SearchReply {
    /// The steps payload as displayable text. Preformatted strings come
    /// through as-is; any other JSON shape is pretty-printed. `None` for
    /// null, missing, or blank steps.
    pub fn steps_text(&self) -> Option<String> {
        match self.steps.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(text) if text.trim().is_empty() => None,
            serde_json::Value::String(text) => Some(text.clone()),
            other => serde_json::to_string_pretty(other).ok(),
        }
    }
}

/// Thin HTTP client for the agent backend.
#[derive(Clone)]
pub struct AgentClient {
    base_url: String,
    client: reqwest::Client,
}

impl AgentClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// POST the user's query to `search_reddit` and decode the reply.
    /// The message goes out exactly as given, one request per call.
    pub async fn search(&self, message: &str) -> Result<SearchReply> {
        let url = format!("{}/search_reddit", self.base_url);
        let payload = serde_json::json!({ "message": message });

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("agent returned {}: {}", status, body));
        }

        response
            .json::<SearchReply>()
            .await
            .context("could not decode agent reply")
    }

    /// GET the backend root and return its hello body. Used by the
    /// `check` subcommand for reachability reporting.
    pub async fn check(&self) -> Result<String> {
        let url = format!("{}/", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("agent returned {}", response.status()));
        }

        response.text().await.context("could not read agent response")
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_full_reply() {
        // `"###` inside the payload would close a one-hash raw string.
        let raw = r####"{"steps": "### Plan\n1. search", "final_output": "Done."}"####;
        let reply: SearchReply = serde_json::from_str(raw).expect("valid reply");
        assert_eq!(reply.steps_text().as_deref(), Some("### Plan\n1. search"));
        assert_eq!(reply.final_output.as_deref(), Some("Done."));
    }

    #[test]
    fn decodes_a_backend_trace_with_null_final() {
        let raw = r####"{"steps": "### Tools\n- **search:reddit**", "final_output": null}"####;
        let reply: SearchReply = serde_json::from_str(raw).expect("valid reply");
        assert_eq!(reply.steps_text().as_deref(), Some("### Tools\n- **search:reddit**"));
        assert_eq!(reply.final_output, None);
    }

    #[test]
    fn tolerates_missing_fields() {
        let reply: SearchReply = serde_json::from_str("{}").expect("valid reply");
        assert_eq!(reply.steps_text(), None);
        assert_eq!(reply.final_output, None);
    }

    #[test]
    fn tolerates_null_fields() {
        let reply: SearchReply =
            serde_json::from_str(r#"{"steps": null, "final_output": null}"#).expect("valid reply");
        assert_eq!(reply.steps_text(), None);
        assert_eq!(reply.final_output, None);
    }

    #[test]
    fn blank_steps_count_as_absent() {
        let reply: SearchReply =
            serde_json::from_str(r#"{"steps": "  ", "final_output": "x"}"#).expect("valid reply");
        assert_eq!(reply.steps_text(), None);
    }

    #[test]
    fn structured_steps_are_pretty_printed() {
        let raw = r#"{"steps": {"plan": ["search", "summarize"]}, "final_output": "x"}"#;
        let reply: SearchReply = serde_json::from_str(raw).expect("valid reply");
        let text = reply.steps_text().expect("steps text");
        assert!(text.starts_with('{'));
        assert!(text.contains("\"plan\""));
    }

    #[test]
    fn ignores_unknown_fields() {
        let raw = r#"{"final_output": "x", "elapsed_ms": 42}"#;
        let reply: SearchReply = serde_json::from_str(raw).expect("valid reply");
        assert_eq!(reply.final_output.as_deref(), Some("x"));
    }

    #[test]
    fn trims_trailing_slash_off_the_base_url() {
        let client =
            AgentClient::new("http://localhost:8000/", Duration::from_secs(5)).expect("client");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
