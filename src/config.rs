//! Configuration types for captioning runs and PDF extraction.
//!
//! All captioning behaviour is controlled through [`CaptionConfig`], built
//! via its [`CaptionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across tasks, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.
//!
//! The same hardcoded values this tool once carried per script — endpoint,
//! model, prompt, per-directory overrides — are all fields here, loadable
//! from a JSON file ([`FileConfig`]) and overridable by CLI flags.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::Captioner;
use crate::error::Img2AltError;
use crate::progress::SharedProgress;
use crate::prompts::{self, LOCATION_PLACEHOLDER};

/// Default inference endpoint (LM Studio's local server).
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:1234/v1/chat/completions";

/// Default vision model identifier.
pub const DEFAULT_MODEL: &str = "qwen/qwen3-vl-8b";

/// Default completion budget per caption.
pub const DEFAULT_MAX_TOKENS: u32 = 150;

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Caption length cap used by [`CaptionConfigBuilder::seo_preset`].
pub const SEO_MAX_CAPTION_LEN: usize = 125;

/// Per-directory overrides, keyed by directory name in
/// [`CaptionConfig::directories`].
///
/// Every field is optional; unset fields fall back to the run-level value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryRule {
    /// Model identifier for this directory.
    pub model: Option<String>,
    /// Prompt template for this directory.
    pub prompt: Option<String>,
    /// Location context substituted into the prompt's
    /// `{location}` placeholder.
    pub location: Option<String>,
}

/// Effective settings for one directory after merging its
/// [`DirectoryRule`] over the run-level defaults.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRule<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub location: Option<&'a str>,
}

impl ResolvedRule<'_> {
    /// The prompt with the location placeholder substituted.
    pub fn rendered_prompt(&self) -> String {
        prompts::render_prompt(self.prompt, self.location)
    }
}

/// Configuration for a captioning run.
///
/// Built via [`CaptionConfig::builder()`] or using
/// [`CaptionConfig::default()`].
///
/// # Example
/// ```rust
/// use img2alt::CaptionConfig;
///
/// let config = CaptionConfig::builder()
///     .root("content/blog/engagement-sessions")
///     .model("gemma-3-12b-it")
///     .timeout_secs(90)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct CaptionConfig {
    /// Root directory whose immediate subdirectories are the content
    /// directories. Default: `.`
    pub root: PathBuf,

    /// Chat-completions endpoint URL. Default: [`DEFAULT_ENDPOINT`].
    pub endpoint: String,

    /// Model identifier sent with every request. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Prompt template. May contain `{location}`. Default:
    /// [`crate::prompts::DEFAULT_PROMPT`].
    pub prompt: String,

    /// Run-level location context for the prompt placeholder.
    pub location: Option<String>,

    /// Completion budget per caption. Default: 150.
    ///
    /// One to two sentences of alt text fit comfortably; a larger budget
    /// only invites the option-list rambling that post-processing then has
    /// to strip.
    pub max_tokens: u32,

    /// Sampling temperature. Default: 0.7.
    ///
    /// Descriptive variety helps alt text read naturally. Drop to ~0.3 when
    /// enforcing a strict pattern (the SEO preset does).
    pub temperature: f32,

    /// Per-request timeout in seconds. Default: 60.
    ///
    /// Local vision models routinely take tens of seconds per image on
    /// consumer hardware. A timeout is recorded as a transport failure for
    /// that image and is never retried within the run.
    pub timeout_secs: u64,

    /// Hard cap on stored caption length in characters. Default: none.
    ///
    /// When set, over-long captions are cut and ellipsis-suffixed (see
    /// [`crate::pipeline::postprocess::truncate_caption`]).
    pub max_caption_len: Option<usize>,

    /// Directories processed in parallel. Default: 1 (fully sequential).
    ///
    /// Images within a directory are always sequential — the directory's
    /// store is rewritten after every image and has exactly one writer.
    /// Raising this only helps when the inference host can actually serve
    /// parallel requests.
    pub concurrency: usize,

    /// Per-directory overrides, keyed by directory name.
    pub directories: BTreeMap<String, DirectoryRule>,

    /// Pre-built captioning client. When unset, an HTTP client is built
    /// from `endpoint` and `timeout_secs`. Tests inject scripted
    /// implementations here.
    pub captioner: Option<Arc<dyn Captioner>>,

    /// Progress callback. Default: none.
    pub progress: Option<SharedProgress>,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: prompts::DEFAULT_PROMPT.to_string(),
            location: None,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_caption_len: None,
            concurrency: 1,
            directories: BTreeMap::new(),
            captioner: None,
            progress: None,
        }
    }
}

impl fmt::Debug for CaptionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptionConfig")
            .field("root", &self.root)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("prompt_len", &self.prompt.len())
            .field("location", &self.location)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_caption_len", &self.max_caption_len)
            .field("concurrency", &self.concurrency)
            .field("directories", &self.directories)
            .field("captioner", &self.captioner.as_ref().map(|_| "<dyn Captioner>"))
            .field("progress", &self.progress.as_ref().map(|_| "<dyn CaptionProgress>"))
            .finish()
    }
}

impl CaptionConfig {
    /// Create a new builder for `CaptionConfig`.
    pub fn builder() -> CaptionConfigBuilder {
        CaptionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Effective settings for `dir_name` after applying its override rule.
    pub fn rule_for(&self, dir_name: &str) -> ResolvedRule<'_> {
        let rule = self.directories.get(dir_name);
        ResolvedRule {
            model: rule
                .and_then(|r| r.model.as_deref())
                .unwrap_or(&self.model),
            prompt: rule
                .and_then(|r| r.prompt.as_deref())
                .unwrap_or(&self.prompt),
            location: rule
                .and_then(|r| r.location.as_deref())
                .or(self.location.as_deref()),
        }
    }
}

/// Builder for [`CaptionConfig`].
pub struct CaptionConfigBuilder {
    config: CaptionConfig,
}

impl CaptionConfigBuilder {
    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.root = root.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = Some(location.into());
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs.max(1);
        self
    }

    pub fn max_caption_len(mut self, chars: usize) -> Self {
        self.config.max_caption_len = Some(chars.max(4));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    /// Add or replace the override rule for one directory.
    pub fn directory_rule(mut self, dir_name: impl Into<String>, rule: DirectoryRule) -> Self {
        self.config.directories.insert(dir_name.into(), rule);
        self
    }

    /// Replace the whole per-directory rule map.
    pub fn directories(mut self, rules: BTreeMap<String, DirectoryRule>) -> Self {
        self.config.directories = rules;
        self
    }

    pub fn captioner(mut self, captioner: Arc<dyn Captioner>) -> Self {
        self.config.captioner = Some(captioner);
        self
    }

    pub fn progress(mut self, progress: SharedProgress) -> Self {
        self.config.progress = Some(progress);
        self
    }

    /// Switch to the location-anchored SEO prompt with its companion
    /// settings: 125-char cap, 100-token budget, temperature 0.3.
    pub fn seo_preset(mut self, location: impl Into<String>) -> Self {
        self.config.prompt = prompts::SEO_LOCATION_PROMPT.to_string();
        self.config.location = Some(location.into());
        self.config.max_caption_len = Some(SEO_MAX_CAPTION_LEN);
        self.config.max_tokens = 100;
        self.config.temperature = 0.3;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CaptionConfig, Img2AltError> {
        let c = &self.config;
        if !c.endpoint.starts_with("http://") && !c.endpoint.starts_with("https://") {
            return Err(Img2AltError::InvalidConfig(format!(
                "endpoint must be an HTTP(S) URL, got '{}'",
                c.endpoint
            )));
        }
        if c.model.is_empty() {
            return Err(Img2AltError::InvalidConfig("model must not be empty".into()));
        }
        if c.prompt.trim().is_empty() {
            return Err(Img2AltError::InvalidConfig("prompt must not be empty".into()));
        }
        if c.concurrency == 0 {
            return Err(Img2AltError::InvalidConfig("concurrency must be ≥ 1".into()));
        }

        // Placeholder prompts need a location: check the run-level pair and
        // every directory's effective pair.
        if c.prompt.contains(LOCATION_PLACEHOLDER) && c.location.is_none() {
            let covered = c
                .directories
                .values()
                .all(|r| r.prompt.is_some() || r.location.is_some());
            // Run-level prompt applies to every directory without its own
            // prompt, so a run-level location (or full per-dir coverage) is
            // required.
            if c.directories.is_empty() || !covered {
                return Err(Img2AltError::InvalidConfig(format!(
                    "prompt contains {LOCATION_PLACEHOLDER} but no location is configured"
                )));
            }
        }
        for (name, rule) in &c.directories {
            let prompt = rule.prompt.as_deref().unwrap_or(&c.prompt);
            let location = rule.location.as_deref().or(c.location.as_deref());
            if prompt.contains(LOCATION_PLACEHOLDER) && location.is_none() {
                return Err(Img2AltError::InvalidConfig(format!(
                    "directory '{name}': prompt contains {LOCATION_PLACEHOLDER} but no location is configured"
                )));
            }
        }

        Ok(self.config)
    }
}

// ── File-based run configuration ─────────────────────────────────────────────

/// JSON mirror of [`CaptionConfig`] with every field optional.
///
/// Loaded from the `--config` file; CLI flags override whatever the file
/// sets. The `captioner` and `progress` seams are code-only and have no file
/// representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub root: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub prompt: Option<String>,
    pub location: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_caption_len: Option<usize>,
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub directories: BTreeMap<String, DirectoryRule>,
}

impl FileConfig {
    /// Read and parse a JSON run-config file.
    pub async fn load(path: &Path) -> Result<Self, Img2AltError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| Img2AltError::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            })?;
        serde_json::from_slice(&bytes).map_err(|e| Img2AltError::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply every set field onto `builder`, leaving the rest untouched.
    pub fn apply_to(self, mut builder: CaptionConfigBuilder) -> CaptionConfigBuilder {
        if let Some(root) = self.root {
            builder = builder.root(root);
        }
        if let Some(endpoint) = self.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        if let Some(prompt) = self.prompt {
            builder = builder.prompt(prompt);
        }
        if let Some(location) = self.location {
            builder = builder.location(location);
        }
        if let Some(n) = self.max_tokens {
            builder = builder.max_tokens(n);
        }
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if let Some(secs) = self.timeout_secs {
            builder = builder.timeout_secs(secs);
        }
        if let Some(chars) = self.max_caption_len {
            builder = builder.max_caption_len(chars);
        }
        if let Some(n) = self.concurrency {
            builder = builder.concurrency(n);
        }
        if !self.directories.is_empty() {
            builder = builder.directories(self.directories);
        }
        builder
    }
}

// ── PDF extraction configuration ─────────────────────────────────────────────

/// Keyword prefixes (matched against lowercased inventory paths) that decide
/// extraction order. Earlier is sooner; unmatched paths go last.
pub const DEFAULT_PRIORITY_KEYWORDS: [&str; 5] = [
    "the-marketing-lab",
    "six-figure-photography",
    "find-in-a-box",
    "guides",
    "posing-and-shooting",
];

/// Path keyword → report category name, checked in order.
pub const DEFAULT_CATEGORIES: [(&str, &str); 6] = [
    ("the-marketing-lab", "Marketing Lab"),
    ("six-figure-photography", "Six Figure Photography"),
    ("find-in-a-box", "Film in a Box"),
    ("guides", "Guides"),
    ("email-templates", "Email Templates"),
    ("timelines", "Timeline Templates"),
];

/// Category for paths matching no keyword.
pub const DEFAULT_FALLBACK_CATEGORY: &str = "Other Resources";

/// One path-substring → category-name mapping for the extraction summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRule {
    pub keyword: String,
    pub name: String,
}

/// Configuration for a PDF extraction run.
///
/// Flat enough that no builder is warranted: construct with
/// `PdfConfig { inventory_path, ..Default::default() }`.
#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Inventory JSON listing the candidate files.
    pub inventory_path: PathBuf,
    /// Where to write the aggregate JSON report.
    pub report_path: PathBuf,
    /// Where to write the human-readable markdown summary.
    pub summary_path: PathBuf,
    /// Processing order keywords; see [`DEFAULT_PRIORITY_KEYWORDS`].
    pub priority_keywords: Vec<String>,
    /// Summary grouping rules; see [`DEFAULT_CATEGORIES`].
    pub categories: Vec<CategoryRule>,
    /// Category for files matching no rule.
    pub fallback_category: String,
    /// A successful extraction yielding fewer characters than this from a
    /// file larger than `ocr_min_file_bytes` is classified `needs_ocr`.
    /// Default: 100.
    pub ocr_min_chars: usize,
    /// See `ocr_min_chars`. Default: 100 000.
    pub ocr_min_file_bytes: u64,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            inventory_path: PathBuf::from("inventory.json"),
            report_path: PathBuf::from("pdf-extraction-report.json"),
            summary_path: PathBuf::from("pdf-extraction-summary.md"),
            priority_keywords: DEFAULT_PRIORITY_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(keyword, name)| CategoryRule {
                    keyword: keyword.to_string(),
                    name: name.to_string(),
                })
                .collect(),
            fallback_category: DEFAULT_FALLBACK_CATEGORY.to_string(),
            ocr_min_chars: 100,
            ocr_min_file_bytes: 100_000,
        }
    }
}

impl PdfConfig {
    /// Category name for an inventory path.
    pub fn category_for(&self, path: &str) -> &str {
        self.categories
            .iter()
            .find(|rule| path.contains(&rule.keyword))
            .map(|rule| rule.name.as_str())
            .unwrap_or(&self.fallback_category)
    }

    /// Priority rank for an inventory path (lower runs earlier).
    pub fn priority_for(&self, path: &str) -> usize {
        let lowered = path.to_lowercase();
        self.priority_keywords
            .iter()
            .position(|keyword| lowered.contains(keyword))
            .unwrap_or(self.priority_keywords.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_local_setup() {
        let config = CaptionConfig::default();
        assert_eq!(config.endpoint, "http://127.0.0.1:1234/v1/chat/completions");
        assert_eq!(config.model, "qwen/qwen3-vl-8b");
        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.concurrency, 1);
        assert!(config.max_caption_len.is_none());
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let config = CaptionConfig::builder()
            .temperature(9.0)
            .concurrency(0)
            .timeout_secs(0)
            .max_caption_len(1)
            .build()
            .unwrap();
        assert_eq!(config.temperature, 2.0);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.timeout_secs, 1);
        assert_eq!(config.max_caption_len, Some(4));
    }

    #[test]
    fn non_http_endpoint_is_rejected() {
        let err = CaptionConfig::builder()
            .endpoint("ftp://somewhere/v1")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"), "got: {err}");
    }

    #[test]
    fn placeholder_prompt_requires_location() {
        let err = CaptionConfig::builder()
            .prompt(crate::prompts::SEO_LOCATION_PROMPT)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("location"), "got: {err}");

        let ok = CaptionConfig::builder()
            .prompt(crate::prompts::SEO_LOCATION_PROMPT)
            .location("Boston engagement session")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn directory_rule_location_satisfies_its_own_placeholder() {
        let config = CaptionConfig::builder()
            .directory_rule(
                "4-britton-manor-proposal",
                DirectoryRule {
                    model: Some("gemma-3-12b-it".into()),
                    prompt: Some(crate::prompts::SEO_LOCATION_PROMPT.into()),
                    location: Some("Britton Manor proposal".into()),
                },
            )
            .build()
            .unwrap();

        let rule = config.rule_for("4-britton-manor-proposal");
        assert_eq!(rule.model, "gemma-3-12b-it");
        assert!(rule.rendered_prompt().contains("Britton Manor proposal"));
    }

    #[test]
    fn directory_rule_with_placeholder_but_no_location_is_rejected() {
        let err = CaptionConfig::builder()
            .directory_rule(
                "weddings",
                DirectoryRule {
                    prompt: Some("Describe for {location}.".into()),
                    ..Default::default()
                },
            )
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("weddings"), "got: {err}");
    }

    #[test]
    fn rule_for_unknown_directory_uses_run_defaults() {
        let config = CaptionConfig::builder().model("m1").build().unwrap();
        let rule = config.rule_for("anything");
        assert_eq!(rule.model, "m1");
        assert_eq!(rule.prompt, crate::prompts::DEFAULT_PROMPT);
        assert_eq!(rule.location, None);
    }

    #[test]
    fn seo_preset_sets_companion_knobs() {
        let config = CaptionConfig::builder()
            .seo_preset("Charlotte engagement session")
            .build()
            .unwrap();
        assert_eq!(config.max_caption_len, Some(125));
        assert_eq!(config.max_tokens, 100);
        assert_eq!(config.temperature, 0.3);
        assert!(config.prompt.contains("125 characters"));
    }

    #[test]
    fn file_config_overrides_only_set_fields() {
        let raw = r#"{
            "model": "gemma-3-12b-it",
            "timeout_secs": 90,
            "directories": {
                "4-britton-manor-proposal": {"model": "gemma-3-12b-it"}
            }
        }"#;
        let file: FileConfig = serde_json::from_str(raw).unwrap();
        let config = file.apply_to(CaptionConfig::builder()).build().unwrap();

        assert_eq!(config.model, "gemma-3-12b-it");
        assert_eq!(config.timeout_secs, 90);
        // Untouched fields keep their defaults
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.directories.len(), 1);
    }

    #[test]
    fn pdf_category_and_priority_lookup() {
        let config = PdfConfig::default();
        assert_eq!(
            config.category_for("/kb/the-marketing-lab/pricing.pdf"),
            "Marketing Lab"
        );
        assert_eq!(config.category_for("/kb/random/notes.pdf"), "Other Resources");

        assert_eq!(config.priority_for("/kb/The-Marketing-Lab/pricing.pdf"), 0);
        assert_eq!(config.priority_for("/kb/guides/light.pdf"), 3);
        assert_eq!(config.priority_for("/kb/random/notes.pdf"), 5);
    }
}
