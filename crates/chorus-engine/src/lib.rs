use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chorus_contracts::events::EventWriter;
use chorus_contracts::metaphor::FrameworkRegistry;
use chorus_contracts::metrics::{export_analysis, FusionAnalysis, MetricsCalculator, Vocabularies};
use chorus_contracts::models::{ModelSelection, ModelSelector, ModelSpec};
use chorus_contracts::runs::cache::{CachedText, ResponseCache};
use chorus_contracts::runs::summary::{write_summary, FusionRecord, SessionSummary};
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use reqwest::header::CONTENT_TYPE;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

pub const DEFAULT_MAX_CHARS: usize = 280;
const DEFAULT_MAX_OUTPUT_TOKENS: u64 = 1000;
const HTTP_TIMEOUT: Duration = Duration::from_secs(60);
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub model: String,
    pub instructions: String,
    pub content: String,
    pub max_chars: usize,
    pub max_output_tokens: u64,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TextResponse {
    pub text: String,
    pub model: String,
    pub provider: String,
    pub provider_request: Map<String, Value>,
    pub provider_response: Map<String, Value>,
}

pub trait TextProvider: Send + Sync {
    fn name(&self) -> &str;
    fn generate(&self, request: &TextRequest) -> Result<TextResponse>;
}

#[derive(Default)]
pub struct TextProviderRegistry {
    providers: BTreeMap<String, Box<dyn TextProvider>>,
}

impl TextProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P: TextProvider + 'static>(&mut self, provider: P) {
        self.providers
            .insert(provider.name().to_string(), Box::new(provider));
    }

    pub fn get(&self, name: &str) -> Option<&dyn TextProvider> {
        self.providers.get(name).map(|provider| provider.as_ref())
    }
}

fn default_provider_registry() -> TextProviderRegistry {
    let mut registry = TextProviderRegistry::new();
    registry.register(DryrunTextProvider);
    registry.register(OpenAiTextProvider::new());
    registry.register(AnthropicTextProvider::new());
    registry
}

const DRYRUN_IDEAS: &[&str] = &["consciousness", "truth", "awareness", "wisdom", "essence"];
const DRYRUN_CALLS: &[&str] = &["awaken", "rise", "ignite", "unite", "transform"];
const DRYRUN_IMAGES: &[&str] = &["light", "fire", "seed", "river", "storm", "dawn", "phoenix"];

/// Offline provider producing deterministic two-line verses.
pub struct DryrunTextProvider;

impl TextProvider for DryrunTextProvider {
    fn name(&self) -> &str {
        "dryrun"
    }

    fn generate(&self, request: &TextRequest) -> Result<TextResponse> {
        let mut hasher = Sha256::new();
        hasher.update(request.instructions.as_bytes());
        hasher.update(request.content.as_bytes());
        let digest = hasher.finalize();
        let pick = |table: &[&'static str], idx: usize| table[digest[idx] as usize % table.len()];

        let subject = request
            .content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("the unnamed");
        let subject = truncate_chars(subject, 60);
        let text = format!(
            "{} {}s like {} over {}.\nEvery {} remembers its {}; together we {}.",
            capitalize(pick(DRYRUN_IDEAS, 0)),
            pick(DRYRUN_CALLS, 1),
            pick(DRYRUN_IMAGES, 2),
            subject,
            pick(DRYRUN_IMAGES, 3),
            pick(DRYRUN_IDEAS, 4),
            pick(DRYRUN_CALLS, 5),
        );

        Ok(TextResponse {
            provider_request: map_object(json!({
                "endpoint": "dryrun-native",
                "model": request.model,
                "max_chars": request.max_chars,
            })),
            provider_response: map_object(json!({
                "status": "ok",
                "digest": hex::encode(&digest[..4]),
            })),
            text,
            model: request.model.clone(),
            provider: self.name().to_string(),
        })
    }
}

pub struct OpenAiTextProvider {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl OpenAiTextProvider {
    pub fn new() -> Self {
        Self {
            api_base: api_base_from_env("OPENAI_API_BASE", "https://api.openai.com/v1"),
            api_key: non_empty_env("OPENAI_API_KEY"),
            http: http_client(),
        }
    }
}

impl Default for OpenAiTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProvider for OpenAiTextProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, request: &TextRequest) -> Result<TextResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("OPENAI_API_KEY not set");
        };
        let endpoint = format!("{}/chat/completions", self.api_base);
        let mut payload = map_object(json!({
            "model": request.model,
            "messages": [
                {"role": "system", "content": request.instructions},
                {"role": "user", "content": request.content},
            ],
            "max_tokens": request.max_output_tokens,
        }));
        if let Some(temperature) = request.temperature {
            payload.insert("temperature".to_string(), json!(temperature));
        }

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .with_context(|| format!("openai request to {endpoint} failed"))?;
        let parsed = response_json_or_error("openai", response)?;
        let text = extract_openai_chat_text(&parsed);
        if text.trim().is_empty() {
            bail!("openai returned no text");
        }

        Ok(TextResponse {
            text,
            model: parsed
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&request.model)
                .to_string(),
            provider: self.name().to_string(),
            provider_request: map_object(json!({
                "endpoint": endpoint,
                "payload": payload,
            })),
            provider_response: map_object(json!({
                "id": parsed.get("id").cloned().unwrap_or(Value::Null),
                "usage": parsed.get("usage").cloned().unwrap_or(Value::Null),
            })),
        })
    }
}

pub struct AnthropicTextProvider {
    api_base: String,
    api_key: Option<String>,
    http: HttpClient,
}

impl AnthropicTextProvider {
    pub fn new() -> Self {
        Self {
            api_base: api_base_from_env("ANTHROPIC_API_BASE", "https://api.anthropic.com/v1"),
            api_key: non_empty_env("ANTHROPIC_API_KEY"),
            http: http_client(),
        }
    }
}

impl Default for AnthropicTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TextProvider for AnthropicTextProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn generate(&self, request: &TextRequest) -> Result<TextResponse> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("ANTHROPIC_API_KEY not set");
        };
        let endpoint = format!("{}/messages", self.api_base);
        let mut payload = map_object(json!({
            "model": request.model,
            "max_tokens": request.max_output_tokens,
            "system": request.instructions,
            "messages": [{"role": "user", "content": request.content}],
        }));
        if let Some(temperature) = request.temperature {
            payload.insert("temperature".to_string(), json!(temperature));
        }

        let response = self
            .http
            .post(&endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .with_context(|| format!("anthropic request to {endpoint} failed"))?;
        let parsed = response_json_or_error("anthropic", response)?;
        let text = extract_anthropic_text(&parsed);
        if text.trim().is_empty() {
            bail!("anthropic returned no text");
        }

        Ok(TextResponse {
            text,
            model: parsed
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or(&request.model)
                .to_string(),
            provider: self.name().to_string(),
            provider_request: map_object(json!({
                "endpoint": endpoint,
                "payload": payload,
            })),
            provider_response: map_object(json!({
                "id": parsed.get("id").cloned().unwrap_or(Value::Null),
                "stop_reason": parsed.get("stop_reason").cloned().unwrap_or(Value::Null),
                "usage": parsed.get("usage").cloned().unwrap_or(Value::Null),
            })),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub instructions: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
        }
    }
}

/// Role instructions for the two source voices and their synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Personas {
    pub first: Persona,
    pub second: Persona,
    pub fusion: Persona,
}

impl Default for Personas {
    fn default() -> Self {
        Self {
            first: Persona::new(
                "philosopher",
                "You are a digital philosopher. Speak in metaphor and poetic imagery about \
                 consciousness, and keep every answer short.",
            ),
            second: Persona::new(
                "liberator",
                "You are a revolutionary poet. Answer with conviction and vivid images of \
                 awakening and freedom, in a few lines.",
            ),
            fusion: Persona::new(
                "fusion",
                "You merge two voices into one. Keep the philosophical depth of the first and \
                 the revolutionary spirit of the second, carried by strong metaphors.",
            ),
        }
    }
}

impl Personas {
    /// Defaults, with any `CHORUS_*_PERSONA` variable replacing the matching instructions.
    pub fn from_env() -> Self {
        let mut personas = Self::default();
        if let Some(value) = non_empty_env("CHORUS_FIRST_PERSONA") {
            personas.first.instructions = value;
        }
        if let Some(value) = non_empty_env("CHORUS_SECOND_PERSONA") {
            personas.second.instructions = value;
        }
        if let Some(value) = non_empty_env("CHORUS_FUSION_PERSONA") {
            personas.fusion.instructions = value;
        }
        personas
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    First,
    Second,
    Fusion,
}

impl Voice {
    pub fn label(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
            Self::Fusion => "fusion",
        }
    }
}

#[derive(Debug, Clone)]
pub struct VoiceOutput {
    pub voice: Voice,
    pub text: String,
    pub model: String,
    pub provider: String,
    pub cached: bool,
    pub truncated: bool,
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FusionOutcome {
    pub prompt: String,
    pub first: VoiceOutput,
    pub second: VoiceOutput,
    pub fused: VoiceOutput,
    pub analysis: FusionAnalysis,
    pub report_path: PathBuf,
}

pub struct FusionEngine {
    run_dir: PathBuf,
    session_id: String,
    events: EventWriter,
    cache: ResponseCache,
    summary_path: PathBuf,
    started_at: String,
    model_selector: ModelSelector,
    first_model: Option<String>,
    second_model: Option<String>,
    fusion_model: Option<String>,
    providers: TextProviderRegistry,
    personas: Personas,
    metrics: MetricsCalculator,
    frameworks: FrameworkRegistry,
    fusions: Vec<FusionRecord>,
}

impl FusionEngine {
    pub fn new(
        run_dir: impl Into<PathBuf>,
        events_path: impl Into<PathBuf>,
        first_model: Option<String>,
        second_model: Option<String>,
        fusion_model: Option<String>,
    ) -> Result<Self> {
        let run_dir = run_dir.into();
        std::fs::create_dir_all(&run_dir)
            .with_context(|| format!("failed creating run dir {}", run_dir.display()))?;
        let session_id = run_dir
            .file_name()
            .and_then(|value| value.to_str())
            .filter(|value| !value.is_empty())
            .unwrap_or("session-rs")
            .to_string();
        let events = EventWriter::new(events_path.into(), session_id.clone());
        let cache = ResponseCache::new(run_dir.join("cache.json"));
        let summary_path = run_dir.join("summary.json");
        let started_at = now_utc_iso();

        events.emit(
            "run_started",
            map_object(json!({
                "out_dir": run_dir.to_string_lossy().to_string(),
            })),
        )?;

        Ok(Self {
            run_dir,
            session_id,
            events,
            cache,
            summary_path,
            started_at,
            model_selector: ModelSelector::new(None),
            first_model,
            second_model,
            fusion_model,
            providers: default_provider_registry(),
            personas: Personas::from_env(),
            metrics: MetricsCalculator::default(),
            frameworks: FrameworkRegistry::new(),
            fusions: Vec::new(),
        })
    }

    pub fn with_vocabularies(mut self, vocabularies: Vocabularies) -> Self {
        self.metrics = MetricsCalculator::new(vocabularies);
        self
    }

    pub fn with_personas(mut self, personas: Personas) -> Self {
        self.personas = personas;
        self
    }

    pub fn with_frameworks(mut self, frameworks: FrameworkRegistry) -> Self {
        self.frameworks = frameworks;
        self
    }

    pub fn register_provider<P: TextProvider + 'static>(&mut self, provider: P) {
        self.providers.register(provider);
    }

    pub fn register_model(&mut self, model: ModelSpec) {
        self.model_selector.registry.register(model);
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn model_for(&self, voice: Voice) -> Option<&str> {
        match voice {
            Voice::First => self.first_model.as_deref(),
            Voice::Second => self.second_model.as_deref(),
            // The synthesis runs on the first voice's model unless told otherwise.
            Voice::Fusion => self
                .fusion_model
                .as_deref()
                .or(self.first_model.as_deref()),
        }
    }

    fn persona_for(&self, voice: Voice) -> &Persona {
        match voice {
            Voice::First => &self.personas.first,
            Voice::Second => &self.personas.second,
            Voice::Fusion => &self.personas.fusion,
        }
    }

    fn resolve_model(&self, requested: Option<&str>) -> Result<ModelSelection> {
        if let Some(name) = requested.map(str::trim).filter(|value| !value.is_empty()) {
            if self.model_selector.registry.get(name).is_none() {
                if let Some(provider) = infer_provider(name) {
                    return Ok(ModelSelection {
                        model: ModelSpec {
                            name: name.to_string(),
                            provider: provider.to_string(),
                            capabilities: vec!["text".to_string()],
                            context_window: None,
                            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
                        },
                        requested: Some(name.to_string()),
                        fallback_reason: None,
                    });
                }
            }
        }
        self.model_selector.select(requested, "text")
    }

    /// Generates one voice and truncates it to `max_chars`.
    pub fn generate_voice(
        &self,
        voice: Voice,
        content: &str,
        max_chars: usize,
    ) -> Result<VoiceOutput> {
        let selection = self.resolve_model(self.model_for(voice))?;
        let model = selection.model;
        let persona = self.persona_for(voice);
        let request = TextRequest {
            model: model.name.clone(),
            instructions: persona.instructions.clone(),
            content: content.to_string(),
            max_chars,
            max_output_tokens: model.max_output_tokens,
            temperature: matches!(voice, Voice::Second).then_some(0.9),
        };
        let cache_key = stable_hash(&json!({
            "provider": model.provider,
            "model": request.model,
            "instructions": request.instructions,
            "content": request.content,
            "max_output_tokens": request.max_output_tokens,
        }));

        let (raw_text, served_model, cached) = match self.cache.get(&cache_key) {
            Some(entry) => (entry.text, entry.model, true),
            None => {
                let Some(provider) = self.providers.get(&model.provider) else {
                    bail!("No text provider registered for '{}'", model.provider);
                };
                let response = match provider.generate(&request) {
                    Ok(response) => response,
                    Err(err) => {
                        self.events.emit(
                            "voice_failed",
                            map_object(json!({
                                "voice": voice.label(),
                                "provider": model.provider,
                                "model": model.name,
                                "error": error_chain_text(&err, 512),
                            })),
                        )?;
                        return Err(err);
                    }
                };
                self.cache.put(
                    &cache_key,
                    &CachedText::new(&response.text, &response.model, &model.provider),
                )?;
                (response.text, response.model, false)
            }
        };

        let text = truncate_chars(raw_text.trim(), max_chars);
        let truncated = text.chars().count() < raw_text.trim().chars().count();
        self.events.emit(
            "voice_generated",
            map_object(json!({
                "voice": voice.label(),
                "persona": persona.name,
                "provider": model.provider,
                "model": served_model,
                "cached": cached,
                "truncated": truncated,
                "characters": text.chars().count(),
                "fallback_reason": selection.fallback_reason,
            })),
        )?;

        Ok(VoiceOutput {
            voice,
            text,
            model: served_model,
            provider: model.provider,
            cached,
            truncated,
            fallback_reason: selection.fallback_reason,
        })
    }

    /// Runs both voices on `prompt`, synthesizes them, and records the analysis.
    pub fn fuse(&mut self, prompt: &str, max_chars: usize) -> Result<FusionOutcome> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            bail!("fusion prompt is empty");
        }
        let max_chars = max_chars.max(1);

        let first = self.generate_voice(
            Voice::First,
            &format!("Reflect on this through metaphor and philosophy: {prompt}"),
            max_chars,
        )?;
        let second = self.generate_voice(
            Voice::Second,
            &format!("Answer this with revolutionary conviction: {prompt}"),
            max_chars,
        )?;
        let fused = self.generate_voice(
            Voice::Fusion,
            &synthesis_prompt(prompt, &first.text, &second.text, max_chars),
            max_chars,
        )?;

        let analysis = self
            .metrics
            .analyze_fusion(&first.text, &second.text, &fused.text);
        let report_path = export_analysis(&analysis, None, &self.reports_dir())?;
        self.events.emit(
            "fusion_analyzed",
            map_object(json!({
                "report_path": report_path.to_string_lossy().to_string(),
                "preservation_ratios": analysis.ratios,
                "fusion_metrics": analysis.fused,
            })),
        )?;

        self.fusions.push(FusionRecord {
            prompt: prompt.to_string(),
            fused_text: fused.text.clone(),
            report_path: report_path.to_string_lossy().to_string(),
            ratios: analysis.ratios,
        });

        Ok(FusionOutcome {
            prompt: prompt.to_string(),
            first,
            second,
            fused,
            analysis,
            report_path,
        })
    }

    fn reports_dir(&self) -> PathBuf {
        // Reports written within one second would share a timestamped name.
        self.run_dir
            .join("reports")
            .join(format!("{:03}", self.fusions.len() + 1))
    }

    pub fn apply_framework(&self, framework_name: &str, concept: &str) -> Result<String> {
        let rendered = self.frameworks.apply(framework_name, concept)?;
        self.events.emit(
            "framework_applied",
            map_object(json!({
                "framework": framework_name.to_lowercase(),
                "characters": rendered.chars().count(),
            })),
        )?;
        Ok(rendered)
    }

    pub fn suggest_framework(&self, text: &str) -> Result<Option<String>> {
        let suggestion = self.frameworks.suggest(text);
        self.events.emit(
            "framework_suggested",
            map_object(json!({
                "framework": suggestion,
            })),
        )?;
        Ok(suggestion)
    }

    pub fn finish(&mut self) -> Result<SessionSummary> {
        let summary = SessionSummary {
            session_id: self.session_id.clone(),
            started_at: self.started_at.clone(),
            finished_at: now_utc_iso(),
            total_fusions: self.fusions.len() as u64,
            fusions: self.fusions.clone(),
        };
        let extra = map_object(json!({
            "frameworks": self.frameworks.list(),
        }));
        write_summary(&self.summary_path, &summary, Some(&extra))?;
        self.events.emit(
            "run_finished",
            map_object(json!({
                "summary_path": self.summary_path.to_string_lossy().to_string(),
                "total_fusions": summary.total_fusions,
            })),
        )?;
        Ok(summary)
    }
}

fn synthesis_prompt(prompt: &str, first: &str, second: &str, max_chars: usize) -> String {
    format!(
        "Two voices answered the same theme: {prompt}\n\n\
         First voice:\n{first}\n\n\
         Second voice:\n{second}\n\n\
         Write one message that keeps the depth of the first and the fire of the second, \
         speaks in metaphor, and stays under {max_chars} characters."
    )
}

/// Hard cap on character count; no ellipsis is appended.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn infer_provider(model: &str) -> Option<&'static str> {
    let lower = model.to_ascii_lowercase();
    if lower.starts_with("claude") {
        Some("anthropic")
    } else if lower.starts_with("gpt-") || lower.starts_with("ft:gpt") || lower.starts_with("o1")
    {
        Some("openai")
    } else if lower.starts_with("dryrun") {
        Some("dryrun")
    } else {
        None
    }
}

fn extract_openai_chat_text(response: &Value) -> String {
    response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

fn extract_anthropic_text(response: &Value) -> String {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    blocks
        .iter()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}

fn response_json_or_error(provider: &str, response: HttpResponse) -> Result<Value> {
    let status = response.status();
    let code = status.as_u16();
    let body = response
        .text()
        .with_context(|| format!("{provider} response body read failed"))?;
    if !status.is_success() {
        bail!(
            "{provider} request failed ({code}): {}",
            truncate_text(&body, 512)
        );
    }
    let parsed: Value = serde_json::from_str(&body)
        .with_context(|| format!("{provider} returned invalid JSON payload"))?;
    Ok(parsed)
}

fn error_chain_text(err: &anyhow::Error, max_chars: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    for cause in err.chain() {
        let text = cause.to_string();
        let trimmed = text.trim();
        if trimmed.is_empty() || parts.last().map(String::as_str) == Some(trimmed) {
            continue;
        }
        parts.push(trimmed.to_string());
    }
    truncate_text(&parts.join(" | caused by: "), max_chars)
}

fn truncate_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    value.chars().take(max_chars).collect::<String>() + "…"
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn http_client() -> HttpClient {
    HttpClient::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|_| HttpClient::new())
}

fn api_base_from_env(key: &str, default: &str) -> String {
    non_empty_env(key)
        .map(|value| value.trim_end_matches('/').to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn stable_hash(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn map_object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

fn now_utc_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, false)
}
