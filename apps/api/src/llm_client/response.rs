//! Pulls the model's answer out of a raw chat completion response.

use serde_json::Value;
use tracing::error;

use super::error::LlmError;

/// Reads `choices[0].message.content` from a raw JSON response and strips any
/// markdown fences the model wrapped around its answer.
pub fn extract_answer_text(raw_response: &str) -> Result<String, LlmError> {
    let root: Value = serde_json::from_str(raw_response).map_err(|e| {
        error!(error = %e, "GigaChat response is not valid JSON");
        LlmError::Request {
            message: "GigaChat response is not valid JSON".to_string(),
            status: None,
            source: Some(Box::new(e)),
        }
    })?;

    let content = root
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            error!("GigaChat response has no choices[0].message.content");
            LlmError::request("Unexpected response shape: missing choices[0].message.content")
        })?;

    Ok(strip_json_fences(content).to_string())
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(stripped) = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
    else {
        return text;
    };

    let stripped = stripped.trim_start();
    stripped
        .strip_suffix("```")
        .map(str::trim)
        .unwrap_or(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extracts_first_choice_content() {
        let raw = json!({
            "choices": [
                { "message": { "role": "assistant", "content": "{\"skills\":[\"Rust\"]}" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ],
            "usage": { "total_tokens": 42 }
        })
        .to_string();

        assert_eq!(extract_answer_text(&raw).unwrap(), "{\"skills\":[\"Rust\"]}");
    }

    #[test]
    fn test_missing_path_is_request_failure() {
        for raw in [r#"{"choices":[]}"#, r#"{"result":"ok"}"#, r#"{"choices":[{"message":{}}]}"#] {
            let err = extract_answer_text(raw).expect_err(raw);
            assert!(matches!(err, LlmError::Request { .. }));
        }
    }

    #[test]
    fn test_invalid_json_is_request_failure() {
        assert!(matches!(
            extract_answer_text("<html>502</html>"),
            Err(LlmError::Request { .. })
        ));
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }
}
