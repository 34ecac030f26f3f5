use std::str::FromStr;

use serde::Serialize;

/// GigaChat model tiers selectable per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GigaModel {
    #[default]
    GigaChat,
    GigaChatPro,
    GigaChatMax,
}

impl GigaModel {
    /// Model identifier as the API expects it.
    pub fn api_name(self) -> &'static str {
        match self {
            GigaModel::GigaChat => "GigaChat",
            GigaModel::GigaChatPro => "GigaChat-Pro",
            GigaModel::GigaChatMax => "GigaChat-Max",
        }
    }
}

impl FromStr for GigaModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GIGA_CHAT" | "GIGACHAT" => Ok(GigaModel::GigaChat),
            "GIGA_CHAT_PRO" | "GIGACHAT-PRO" => Ok(GigaModel::GigaChatPro),
            "GIGA_CHAT_MAX" | "GIGACHAT-MAX" => Ok(GigaModel::GigaChatMax),
            other => Err(format!("Unsupported model type: {other}")),
        }
    }
}

/// Body of a chat completion request.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> ChatRequest<'a> {
    /// A non-streaming request with the system instructions first and the document second.
    pub fn analysis(model: &'a str, system_prompt: &'a str, document_text: &'a str) -> Self {
        Self {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: document_text,
                },
            ],
            stream: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analysis_request_shape() {
        let request = ChatRequest::analysis("GigaChat-Pro", "You are an HR expert", "resume text");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "GigaChat-Pro",
                "messages": [
                    { "role": "system", "content": "You are an HR expert" },
                    { "role": "user", "content": "resume text" }
                ],
                "stream": false
            })
        );
    }

    #[test]
    fn test_model_parsing() {
        assert_eq!("GIGA_CHAT_MAX".parse::<GigaModel>(), Ok(GigaModel::GigaChatMax));
        assert_eq!("giga_chat".parse::<GigaModel>(), Ok(GigaModel::GigaChat));
        assert_eq!("GigaChat-Pro".parse::<GigaModel>(), Ok(GigaModel::GigaChatPro));
        assert!("GPT-4".parse::<GigaModel>().is_err());
        assert_eq!(GigaModel::default().api_name(), "GigaChat");
    }
}
