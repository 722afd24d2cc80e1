//! Prompts sent to the vision model alongside each image.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — tweaking the wording (banned adjectives,
//!    sentence count, length cap) requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts and placeholder
//!    substitution directly without spinning up a real vision model.
//!
//! Callers can override the default via
//! [`crate::config::CaptionConfig::prompt`]; the constants here are used only
//! when no override is provided.

/// Placeholder substituted with the per-directory location context.
pub const LOCATION_PLACEHOLDER: &str = "{location}";

/// Default prompt: a 1-2 sentence accessibility description.
pub const DEFAULT_PROMPT: &str = "Describe this wedding/engagement photograph in 1-2 concise sentences for alt text. Focus on: who (couple/people), what they're doing, setting/location, mood/emotion, and any key visual details (lighting, composition). Be specific and descriptive but succinct. This is for SEO and accessibility.";

/// Minimal prompt: exactly one sentence, no option lists.
///
/// Smaller models tend to answer this one without the "Here are a few
/// options" preamble that [`crate::pipeline::postprocess`] otherwise strips.
pub const CONCISE_PROMPT: &str = "Write a single descriptive alt text sentence for this image. No options, no commentary, just the description.";

/// Location-anchored SEO prompt, capped at 125 characters.
///
/// Contains [`LOCATION_PLACEHOLDER`] twice; pair it with a configured
/// location context and a `max_caption_len` of 125.
pub const SEO_LOCATION_PROMPT: &str = r#"Describe this engagement or proposal photo in 125 characters or less.

Requirements:
- Describe what you ACTUALLY SEE in the photo
- Include this location: "{location}"
- Follow pattern: "Couple [action] [location detail] during their {location}"
- Max 125 characters total
- NO generic adjectives like 'beautiful', 'stunning', 'romantic', or 'intimate'
- Be specific about what's happening in the frame
- Use "couple" not names

Examples:
- "Couple sits on navy velvet banquette at bar during their Beacon Hill engagement photos"
- "He leans in to kiss her cheek at the bar during their Charlotte engagement session"
- "Couple walks hand-in-hand down cobblestone alley during their Brooklyn engagement photos"

Return ONLY the alt text description, nothing else."#;

/// Substitute the location context into a prompt template.
///
/// Templates without the placeholder pass through unchanged; a `None`
/// location leaves the template untouched (config validation rejects that
/// combination before a run starts).
pub fn render_prompt(template: &str, location: Option<&str>) -> String {
    match location {
        Some(loc) => template.replace(LOCATION_PLACEHOLDER, loc),
        None => template.to_string(),
    }
}
