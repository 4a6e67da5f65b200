//! Model strategy registry: one formatting/constraint profile per target
//! generative model.
//!
//! `TargetModel` is a closed enumeration; each variant indexes one row of a
//! static table. Adding a target model means adding a variant and a row.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The structural form a target model responds best to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralForm {
    /// JSON-like structure or strict lists.
    Structured,
    /// Free natural language.
    NaturalLanguage,
    /// [Camera Move] + [Subject Action] + [Environment Physics].
    MotionPhysics,
    /// Artistic description followed by `--param value` tokens.
    ParameterizedTokens,
}

/// The fixed contract associated with one target model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelProfile {
    pub id: &'static str,
    pub display_name: &'static str,
    pub structure: StructuralForm,
    /// Hard cap on the English prompt, in characters.
    pub max_chars: Option<usize>,
    /// Whether the template must forbid negative phrasing ("no blur").
    pub avoid_negative_phrasing: bool,
    /// One-line strategy hint interpolated into the task template.
    pub guidance: &'static str,
}

/// Supported target models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetModel {
    #[default]
    Flux,
    NanoBanana,
    Seedream,
    Video,
    Midjourney,
}

const PROFILES: [ModelProfile; 5] = [
    ModelProfile {
        id: "flux",
        display_name: "Flux.2",
        structure: StructuralForm::Structured,
        max_chars: None,
        avoid_negative_phrasing: true,
        guidance: "The Architect: physical accuracy, lighting physics and material texture. \
                   Describe what exists, not what doesn't.",
    },
    ModelProfile {
        id: "gemini",
        display_name: "Nano Banana",
        structure: StructuralForm::NaturalLanguage,
        max_chars: None,
        avoid_negative_phrasing: true,
        guidance: "The Logician: logical steps, explain why each component is there. \
                   Put any rendered text in quotes.",
    },
    ModelProfile {
        id: "seedream",
        display_name: "Seedream",
        structure: StructuralForm::NaturalLanguage,
        max_chars: Some(800),
        avoid_negative_phrasing: false,
        guidance: "The Commercial Director: reference-first commercial photography, \
                   describe the visual beauty directly.",
    },
    ModelProfile {
        id: "video",
        display_name: "Video Model",
        structure: StructuralForm::MotionPhysics,
        max_chars: None,
        avoid_negative_phrasing: false,
        guidance: "The Cinematographer: motion, time and physics. \
                   Name the camera movement (Pan, Tilt, Dolly In, Tracking Shot).",
    },
    ModelProfile {
        id: "midjourney",
        display_name: "Midjourney",
        structure: StructuralForm::ParameterizedTokens,
        max_chars: None,
        avoid_negative_phrasing: false,
        guidance: "Artistic composition and style fusion: \
                   [Subject] + [Environment] + [Lighting/Color] + [Art Style] + [Parameters].",
    },
];

impl TargetModel {
    /// Every supported model, in registry order.
    pub fn all() -> [TargetModel; 5] {
        [
            Self::Flux,
            Self::NanoBanana,
            Self::Seedream,
            Self::Video,
            Self::Midjourney,
        ]
    }

    fn index(self) -> usize {
        match self {
            Self::Flux => 0,
            Self::NanoBanana => 1,
            Self::Seedream => 2,
            Self::Video => 3,
            Self::Midjourney => 4,
        }
    }

    pub fn profile(self) -> &'static ModelProfile {
        &PROFILES[self.index()]
    }

    pub fn id(self) -> &'static str {
        self.profile().id
    }

    /// Exact-match lookup. An unknown id is a configuration error.
    pub fn from_id(id: &str) -> Result<Self, EngineError> {
        Self::all()
            .into_iter()
            .find(|m| m.id() == id)
            .ok_or_else(|| {
                EngineError::Configuration(format!(
                    "Unknown target model '{id}' (expected one of: {})",
                    Self::all().map(|m| m.id()).join(", ")
                ))
            })
    }
}

impl fmt::Display for TargetModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for TargetModel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

impl TryFrom<String> for TargetModel {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_id(&value)
    }
}

impl From<TargetModel> for String {
    fn from(model: TargetModel) -> Self {
        model.id().to_string()
    }
}
