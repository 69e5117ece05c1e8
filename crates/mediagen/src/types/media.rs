//! Launch parameters for the image and audio generation endpoints

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use super::GenerationPrompt;

/// Output settings for image generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Name of a style configured on the backend
    pub style: String,
}

impl ImageSettings {
    /// Create image settings.
    pub fn new(width: u32, height: u32, style: impl Into<String>) -> Self {
        Self {
            width,
            height,
            style: style.into(),
        }
    }
}

/// Reference images used to keep characters and scenes consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceImageInfo {
    /// First character reference
    pub character1: String,
    /// Second character reference
    pub character2: String,
    /// Scene reference
    pub scene: String,
}

/// A prompt item as sent to the image endpoint, where the id is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptItem {
    /// Caller id, echoed back in generated file names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Prompt text
    pub prompt: String,
}

impl From<GenerationPrompt> for PromptItem {
    fn from(prompt: GenerationPrompt) -> Self {
        Self {
            id: Some(prompt.id),
            prompt: prompt.prompt,
        }
    }
}

impl From<&GenerationPrompt> for PromptItem {
    fn from(prompt: &GenerationPrompt) -> Self {
        prompt.clone().into()
    }
}

/// Parameters for `POST media/generate_images`.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct GenerateImageParams {
    /// Project the chapter belongs to
    pub project_name: String,

    /// Chapter whose spans are rendered
    pub chapter_name: String,

    /// Output settings
    #[serde(rename = "imageSettings")]
    pub image_settings: ImageSettings,

    /// Optional per-prompt reference images
    #[serde(skip_serializing_if = "Option::is_none")]
    #[builder(default, setter(strip_option, into))]
    pub reference_image_infos: Option<Vec<ReferenceImageInfo>>,

    /// Prompts in processing order
    pub prompts: Vec<PromptItem>,
}

impl GenerateImageParams {
    /// Create a new builder.
    pub fn builder() -> GenerateImageParamsBuilder {
        GenerateImageParamsBuilder::default()
    }
}

impl GenerateImageParamsBuilder {
    /// Set prompts from tracker prompt items, keeping their order.
    pub fn generation_prompts(&mut self, prompts: &[GenerationPrompt]) -> &mut Self {
        self.prompts = Some(prompts.iter().map(PromptItem::from).collect());
        self
    }
}

/// Voice settings for audio generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Voice name
    pub voice: String,
    /// Speaking rate, e.g. `"+0%"`
    pub rate: String,
}

impl AudioSettings {
    /// Create audio settings.
    pub fn new(voice: impl Into<String>, rate: impl Into<String>) -> Self {
        Self {
            voice: voice.into(),
            rate: rate.into(),
        }
    }
}

/// Parameters for `POST media/generate-audio`.
///
/// Unlike images, every audio prompt must carry an id.
#[derive(Debug, Clone, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
pub struct GenerateAudioParams {
    /// Project the chapter belongs to
    pub project_name: String,

    /// Chapter whose spans are narrated
    pub chapter_name: String,

    /// Voice settings
    #[serde(rename = "audioSettings")]
    pub audio_settings: AudioSettings,

    /// Prompts in processing order
    pub prompts: Vec<GenerationPrompt>,
}

impl GenerateAudioParams {
    /// Create a new builder.
    pub fn builder() -> GenerateAudioParamsBuilder {
        GenerateAudioParamsBuilder::default()
    }
}
