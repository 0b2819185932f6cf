//! Candidate generation from a topic via the OpenAI chat completions API.
//!
//! An external collaborator of the pool: it only produces the candidate
//! list. The API key is read from `OPENAI_API_KEY`, with `.env` files
//! honored via dotenvy.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::source::filter_candidates;

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const MODEL: &str = "gpt-3.5-turbo";
const KEY_ENV_VAR: &str = "OPENAI_API_KEY";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors that can occur while generating candidates.
#[derive(Debug)]
#[non_exhaustive]
pub enum GenerateError {
    /// `OPENAI_API_KEY` is not set in the environment or a `.env` file.
    MissingApiKey,
    /// The completions request failed or its body could not be parsed.
    Transport(Box<ureq::Error>),
    /// The API answered without any completion choices.
    EmptyResponse,
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingApiKey => {
                write!(f, "{KEY_ENV_VAR} not set (environment or .env file)")
            }
            Self::Transport(e) => write!(f, "plate generation request failed: {e}"),
            Self::EmptyResponse => write!(f, "plate generation returned no choices"),
        }
    }
}

impl std::error::Error for GenerateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e.as_ref()),
            Self::MissingApiKey | Self::EmptyResponse => None,
        }
    }
}

impl From<ureq::Error> for GenerateError {
    fn from(e: ureq::Error) -> Self {
        Self::Transport(Box::new(e))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Generate candidate plates for a topic.
///
/// Asks the model for `num_plates` ideas, one per line, then keeps only
/// trimmed, lowercased, fully alphanumeric lines within the service's
/// accepted length range, deduplicated and sorted like file-loaded input.
/// The model may return fewer usable lines than requested.
///
/// # Errors
///
/// Returns [`GenerateError`] when the API key is missing, the request
/// fails, or the response carries no choices.
pub fn generate_plates(topic: &str, num_plates: usize) -> Result<Vec<String>, GenerateError> {
    dotenvy::dotenv().ok();
    let api_key =
        std::env::var(KEY_ENV_VAR).map_err(|_| GenerateError::MissingApiKey)?;

    let prompt = build_prompt(topic, num_plates);
    let request = ChatRequest {
        model: MODEL,
        messages: vec![ChatMessage {
            role: "user",
            content: prompt,
        }],
    };

    let agent_config = Agent::config_builder()
        .timeout_global(Some(REQUEST_TIMEOUT))
        .build();
    let agent = Agent::new_with_config(agent_config);

    let response: ChatResponse = agent
        .post(COMPLETIONS_URL)
        .header("Authorization", format!("Bearer {api_key}"))
        .send_json(&request)?
        .body_mut()
        .read_json()?;

    let content = response
        .choices
        .into_iter()
        .next()
        .ok_or(GenerateError::EmptyResponse)?
        .message
        .content;

    Ok(filter_generated(content.lines()))
}

fn build_prompt(topic: &str, num_plates: usize) -> String {
    use crate::config::{MAX_PLATE_LENGTH, MIN_PLATE_LENGTH};
    format!(
        "Generate a list of {num_plates} creative license plate ideas related to \
         '{topic}'. Each plate must be between {MIN_PLATE_LENGTH} and \
         {MAX_PLATE_LENGTH} characters long, using only letters and numbers. \
         Return only the list, one plate per line. Do not number the list, or \
         include any other characters."
    )
}

/// Keep only fully alphanumeric lines, then normalize like file input.
fn filter_generated<'a, I>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let alnum: Vec<&str> = lines
        .into_iter()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.chars().all(char::is_alphanumeric))
        .collect();
    filter_candidates(alnum)
}
