use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// MusicGen model size tiers accepted by the API
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Deserialize,
    Serialize,
    strum::EnumIter,
    strum::IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ModelSize {
    #[default]
    Small,
    Medium,
    Large,
    Melody,
}

/// Read-only description of a model tier
#[derive(Debug, Serialize)]
pub struct ModelDescriptor {
    /// Published checkpoint name
    pub name: &'static str,
    /// Approximate parameter count
    pub parameters: &'static str,
    /// Human-readable summary
    pub description: &'static str,
    /// Identifier sent to the remote API as `model_version`
    pub upstream_version: &'static str,
}

static SMALL: ModelDescriptor = ModelDescriptor {
    name: "facebook/musicgen-small",
    parameters: "300M",
    description: "Fastest generation, good for quick drafts",
    upstream_version: "small",
};

static MEDIUM: ModelDescriptor = ModelDescriptor {
    name: "facebook/musicgen-medium",
    parameters: "1.5B",
    description: "Balanced quality and speed",
    upstream_version: "medium",
};

static LARGE: ModelDescriptor = ModelDescriptor {
    name: "facebook/musicgen-large",
    parameters: "3.3B",
    description: "Highest quality, slowest generation",
    upstream_version: "large",
};

static MELODY: ModelDescriptor = ModelDescriptor {
    name: "facebook/musicgen-melody",
    parameters: "1.5B",
    description: "Follows melodic cues described in the prompt",
    upstream_version: "melody",
};

impl ModelSize {
    /// Static metadata for this tier
    pub const fn descriptor(self) -> &'static ModelDescriptor {
        match self {
            Self::Small => &SMALL,
            Self::Medium => &MEDIUM,
            Self::Large => &LARGE,
            Self::Melody => &MELODY,
        }
    }
}

/// Every model tier keyed by its API name, smallest first
pub fn catalog() -> IndexMap<&'static str, &'static ModelDescriptor> {
    ModelSize::iter()
        .map(|size| (<&'static str>::from(size), size.descriptor()))
        .collect()
}
