use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;

use crate::closure::Seeds;
use crate::error::{RelsearchError, Result};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const EXTRACTION_PROMPT: &str = "You are a named entity recognition expert. Extract two lists from the given text:\n\
1. List of person names in nominative case without Polish characters\n\
2. List of city names without Polish characters\n\
Format your response exactly like this example:\n\
names = ['JOHN', 'ALICE']\n\
cities = ['LONDON', 'PARIS']";

/// Single chat message
#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Request structure for OpenAI chat completions API
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Response structure from OpenAI chat completions API
#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Extracts seed people and places from a free-text note with a chat model
pub struct SeedExtractor {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl SeedExtractor {
    pub fn new(api_key: String, model: String, temperature: f32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RelsearchError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            temperature,
        })
    }

    /// Ask the model for the people and cities named in `text`.
    pub async fn extract(&self, text: &str) -> Result<Seeds> {
        let user_prompt = format!("Extract names and cities from this text:\n\n{}", text);
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: EXTRACTION_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: 1500,
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| RelsearchError::Http(format!("Network error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(RelsearchError::Http(format!("OpenAI API error {}: {}", status, body)));
        }

        let result: CompletionResponse = response
            .json()
            .await
            .map_err(|e| RelsearchError::Parse(format!("Failed to parse response: {}", e)))?;
        log::debug!("Completion API call took {:?}", start.elapsed());

        let content = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| RelsearchError::Parse("Empty completion from OpenAI API".to_string()))?;

        Ok(parse_seed_reply(&content))
    }
}

/// Parse `names = [...]` / `cities = [...]` lines out of a model reply.
///
/// Missing lists give empty seeds; the reply is never evaluated.
pub fn parse_seed_reply(reply: &str) -> Seeds {
    static LIST: OnceLock<Regex> = OnceLock::new();
    static ITEM: OnceLock<Regex> = OnceLock::new();
    let list = LIST.get_or_init(|| {
        Regex::new(r"(?m)^\s*(names|cities)\s*=\s*\[([^\]]*)\]").expect("Invalid regex pattern")
    });
    let item = ITEM.get_or_init(|| Regex::new(r#"['"]([^'"]+)['"]"#).expect("Invalid regex pattern"));

    let mut seeds = Seeds::default();
    for cap in list.captures_iter(reply) {
        let items = item
            .captures_iter(&cap[2])
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty());
        match &cap[1] {
            "names" => seeds.people.extend(items),
            _ => seeds.places.extend(items),
        }
    }
    seeds
}
