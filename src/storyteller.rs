//! Natural-language scouting text on top of the similarity engine.
//!
//! The network side is hidden behind [`TextGenerator`] so the prompt
//! building and lookups can run against a canned generator in tests.

use std::fmt::Write as _;
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dataset::Population;
use crate::error::{LlmError, Result};
use crate::http_client::{classify_send_error, http_client};
use crate::player::{PlayerId, PlayerRecord};
use crate::similarity::SimilarPlayer;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CONTEXT: &str = "You are a professional football analyst and experienced scout. \
Give in-depth analysis of football players based on the statistics provided. \
Write clearly and give insight that is useful to managers and scouts.";

/// Players listed in a recommendation explanation.
const EXPLAINED_RECOMMENDATIONS: usize = 5;

pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> std::result::Result<String, LlmError>;
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        (**self).generate(prompt)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first call, only for rate limiting.
    pub max_retries: u32,
    /// Wait before retry n (0-based) is `(n + 1) * backoff`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(15),
        }
    }
}

impl RetryPolicy {
    pub fn run<T>(
        &self,
        mut call: impl FnMut() -> std::result::Result<T, LlmError>,
    ) -> std::result::Result<T, LlmError> {
        let mut attempt = 0u32;
        loop {
            match call() {
                Err(LlmError::RateLimited) if attempt < self.max_retries => {
                    let wait = self.backoff * (attempt + 1);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        wait_secs = wait.as_secs_f64(),
                        "rate limited, backing off"
                    );
                    if !wait.is_zero() {
                        thread::sleep(wait);
                    }
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Joins the text parts of the first candidate.
pub fn parse_generate_response(body: &str) -> std::result::Result<String, LlmError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("no candidates in response".to_string()))?;
    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::InvalidResponse("candidate has no text".to_string()));
    }
    Ok(text)
}

/// Maps a non-success HTTP reply onto an error; quota exhaustion counts as
/// rate limiting whatever the status code.
pub fn classify_error_response(status: u16, body: &str) -> LlmError {
    let (message, api_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (body.trim().to_string(), String::new()),
    };
    if status == 429 || api_status == "RESOURCE_EXHAUSTED" || message.contains("RESOURCE_EXHAUSTED")
    {
        return LlmError::RateLimited;
    }
    LlmError::Api { status, message }
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> std::result::Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        Ok(Self {
            api_key: api_key.trim().to_string(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn request_once(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        let client = http_client()?;
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };
        let resp = client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(classify_send_error)?;

        let status = resp.status();
        let text = resp.text().map_err(classify_send_error)?;
        if !status.is_success() {
            return Err(classify_error_response(status.as_u16(), &text));
        }
        parse_generate_response(&text)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> std::result::Result<String, LlmError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "gemini request");
        self.retry.run(|| self.request_once(prompt))
    }
}

/// Builds scouting prompts from the population and forwards them to a
/// generator. Unknown players fail before any generator call.
pub struct Storyteller<G> {
    generator: G,
    context: String,
}

impl<G: TextGenerator> Storyteller<G> {
    pub fn new(generator: G) -> Self {
        Self {
            generator,
            context: DEFAULT_CONTEXT.to_string(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    fn ask(&self, prompt: &str) -> Result<String> {
        let full = format!("{}\n\n{}", self.context, prompt);
        Ok(self.generator.generate(&full)?)
    }

    pub fn player_description(&self, population: &Population, id: PlayerId) -> Result<String> {
        let player = population.get(id)?;
        let prompt = format!(
            "Based on the statistics below, write an engaging and informative player profile.\n\n\
             {}\n\
             Output format:\n\
             1. **Overview**: a short description of the player and playing style\n\
             2. **Strengths**: three key strengths backed by the statistics\n\
             3. **Development areas**: two areas to improve\n\
             4. **Conclusion**: one paragraph on potential and value",
            stats_block(player)
        );
        self.ask(&prompt)
    }

    pub fn comparison_narrative(
        &self,
        population: &Population,
        a: PlayerId,
        b: PlayerId,
    ) -> Result<String> {
        let pa = population.get(a)?;
        let pb = population.get(b)?;
        let prompt = format!(
            "Compare the following two players in depth.\n\n\
             === PLAYER 1 ===\n{}\n\
             === PLAYER 2 ===\n{}\n\
             Analysis format:\n\
             1. **Head-to-head**: key statistics side by side\n\
             2. **Comparative analysis**: playing style and contribution\n\
             3. **Edges**: where each player is stronger\n\
             4. **Verdict**: who suits which situation\n\
             Keep the analysis objective and grounded in the data.",
            stats_block(pa),
            stats_block(pb)
        );
        self.ask(&prompt)
    }

    pub fn recommendation_explanation(
        &self,
        population: &Population,
        target: PlayerId,
        similar: &[SimilarPlayer],
        criteria: Option<&str>,
    ) -> Result<String> {
        let player = population.get(target)?;
        let mut listed = String::new();
        for rec in similar.iter().take(EXPLAINED_RECOMMENDATIONS) {
            let Some(p) = population.try_get(rec.id) else {
                continue;
            };
            let _ = writeln!(
                listed,
                "- {} ({}, {}) - Similarity: {:.1}%, G: {}, A: {}",
                p.name,
                p.squad,
                p.position,
                rec.score * 100.0,
                fmt_stat(p, "Gls"),
                fmt_stat(p, "Ast"),
            );
        }
        let criteria = criteria
            .filter(|c| !c.trim().is_empty())
            .map(|c| format!("\nSearch criteria: {c}\n"))
            .unwrap_or_default();
        let prompt = format!(
            "Explain the following recommendations for a club looking for a replacement or alternative.\n\n\
             === TARGET PLAYER ===\n{}\n\
             === RECOMMENDED PLAYERS ===\n{}{}\n\
             Explanation format:\n\
             1. **Why these picks**: the logic behind the recommendation\n\
             2. **Short profiles**: one line per recommended player\n\
             3. **Fit analysis**: how well each fits as a replacement\n\
             4. **Scouting advice**: who to prioritise for further scouting",
            stats_block(player),
            listed,
            criteria
        );
        self.ask(&prompt)
    }

    pub fn scout_report(&self, population: &Population, id: PlayerId) -> Result<String> {
        let player = population.get(id)?;
        let prompt = format!(
            "Write a professional scouting report for this player.\n\n\
             {}\n\
             Report format:\n\
             **SCOUT REPORT**\n\
             **1. BASICS** - profile summary\n\
             **2. TECHNICAL ANALYSIS** - finishing, creativity, defensive contribution, ball progression\n\
             **3. RATINGS (1-10)** - Finishing, Playmaking, Defensive Work, Physical Presence\n\
             **4. RECOMMENDATION** - suitable team profile, transfer value estimate, development potential\n\
             **5. FINAL VERDICT** - two or three sentences",
            stats_block(player)
        );
        self.ask(&prompt)
    }

    pub fn quick_summary(&self, population: &Population, id: PlayerId) -> Result<String> {
        let player = population.get(id)?;
        let prompt = format!(
            "Give a VERY SHORT summary (at most three sentences) of this player.\n\n\
             {}\n\
             Focus on position, main playing style and one statistical highlight. \
             Answer as a single short paragraph without bullet points.",
            stats_block(player)
        );
        self.ask(&prompt)
    }
}

fn fmt_stat(player: &PlayerRecord, key: &str) -> String {
    let v = player.stat_or_zero(key);
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

/// Identity plus headline stats, the shared body of every prompt.
pub fn stats_block(player: &PlayerRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Name: {}", player.name);
    let _ = writeln!(out, "Club: {}", player.squad);
    let _ = writeln!(out, "League: {}", player.comp);
    let _ = writeln!(out, "Position: {}", player.position);
    out.push_str("Key statistics:\n");
    let _ = writeln!(out, "- Goals: {}", fmt_stat(player, "Gls"));
    let _ = writeln!(out, "- Assists: {}", fmt_stat(player, "Ast"));
    let _ = writeln!(out, "- Goals + Assists: {}", fmt_stat(player, "G+A"));
    let _ = writeln!(out, "- Expected Goals (xG): {:.2}", player.stat_or_zero("xG"));
    let _ = writeln!(out, "- Expected Assists (xAG): {:.2}", player.stat_or_zero("xAG"));
    let _ = writeln!(out, "- Shots: {}", fmt_stat(player, "Sh"));
    let _ = writeln!(out, "- Shots on Target: {}", fmt_stat(player, "SoT"));
    let _ = writeln!(out, "- Progressive Carries: {}", fmt_stat(player, "PrgC"));
    let _ = writeln!(out, "- Progressive Passes: {}", fmt_stat(player, "PrgP"));
    let _ = writeln!(out, "- Tackles: {}", fmt_stat(player, "Tkl"));
    let _ = writeln!(out, "- Interceptions: {}", fmt_stat(player, "Int"));
    let _ = writeln!(out, "- Minutes Played: {}", fmt_stat(player, "Min"));
    out
}

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#{1,6}\s*").expect("valid regex"));
static BOLD_ITALIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*").expect("valid regex"));
static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static BOLD_UNDERSCORE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__(.+?)__").expect("valid regex"));
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b_(.+?)_\b").expect("valid regex"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Strips markdown emphasis and headings so model output reads cleanly in a
/// plain-text pane.
pub fn clean_markdown(text: &str) -> String {
    let s = HEADING.replace_all(text, "");
    let s = BOLD_ITALIC.replace_all(&s, "$1");
    let s = BOLD.replace_all(&s, "$1");
    let s = ITALIC.replace_all(&s, "$1");
    let s = BOLD_UNDERSCORE.replace_all(&s, "$1");
    let s = ITALIC_UNDERSCORE.replace_all(&s, "$1");
    let s = BLANK_RUN.replace_all(&s, "\n\n");
    s.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_returns_first_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::ZERO,
        };
        let out = policy.run(|| {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(LlmError::RateLimited)
            } else {
                Ok("done")
            }
        });
        assert_eq!(out, Ok("done"));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn retry_gives_up_after_limit() {
        let calls = Cell::new(0);
        let policy = RetryPolicy {
            max_retries: 2,
            backoff: Duration::ZERO,
        };
        let out: std::result::Result<(), _> = policy.run(|| {
            calls.set(calls.get() + 1);
            Err(LlmError::RateLimited)
        });
        assert_eq!(out, Err(LlmError::RateLimited));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn other_errors_are_not_retried() {
        let calls = Cell::new(0);
        let out: std::result::Result<(), _> = RetryPolicy::default().run(|| {
            calls.set(calls.get() + 1);
            Err(LlmError::Timeout)
        });
        assert_eq!(out, Err(LlmError::Timeout));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn parses_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}],"role":"model"}}]}"#;
        assert_eq!(parse_generate_response(body).unwrap(), "Hello world");
        assert!(matches!(
            parse_generate_response(r#"{"candidates":[]}"#),
            Err(LlmError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_generate_response("not json"),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[test]
    fn quota_errors_are_rate_limits() {
        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(classify_error_response(429, body), LlmError::RateLimited);
        assert_eq!(classify_error_response(400, body), LlmError::RateLimited);
        let bad = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            classify_error_response(400, bad),
            LlmError::Api {
                status: 400,
                message: "API key not valid".to_string()
            }
        );
    }

    #[test]
    fn blank_key_is_rejected() {
        assert_eq!(GeminiClient::new("  ").unwrap_err(), LlmError::MissingApiKey);
        let c = GeminiClient::new("k")
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            c.endpoint(),
            "http://localhost:8080/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn clean_markdown_strips_emphasis() {
        let raw = "## Overview\n**Strong** finisher with *great* pace.\n\n\n\n__Note__: ***key*** player";
        assert_eq!(
            clean_markdown(raw),
            "Overview\nStrong finisher with great pace.\n\nNote: key player"
        );
    }
}
