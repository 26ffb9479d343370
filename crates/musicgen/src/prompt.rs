//! Prompt construction from structured musical fields

use serde::{Deserialize, Serialize};

/// Structured description of the desired music
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PromptFields {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub mood: Option<String>,
    #[serde(default)]
    pub instruments: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tempo: Option<String>,
}

/// Where the final prompt comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptSource {
    /// Text supplied verbatim by the caller
    Raw(String),
    /// Fields composed by [`build_prompt`]
    Structured(PromptFields),
}

impl PromptSource {
    /// Pick the source for a request: a non-blank raw prompt wins
    pub fn resolve(prompt: Option<String>, fields: PromptFields) -> Self {
        match prompt {
            Some(prompt) if !prompt.trim().is_empty() => Self::Raw(prompt),
            _ => Self::Structured(fields),
        }
    }

    /// Short label for logs
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Raw(_) => "direct",
            Self::Structured(_) => "structured",
        }
    }

    /// Canonical prompt text; empty when nothing usable was supplied
    pub fn into_prompt(self) -> String {
        match self {
            Self::Raw(prompt) => prompt.trim().to_string(),
            Self::Structured(fields) => build_prompt(&fields),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Compose structured fields into one natural-language prompt
///
/// Parts appear in a fixed order: mood and genre, instruments, tempo,
/// description. Absent or blank fields are skipped. Returns an empty string
/// when every field is absent.
pub fn build_prompt(fields: &PromptFields) -> String {
    let genre = present(fields.genre.as_deref());
    let mood = present(fields.mood.as_deref());
    let tempo = present(fields.tempo.as_deref());
    let description = present(fields.description.as_deref());
    let instruments: Vec<&str> = fields
        .instruments
        .iter()
        .flatten()
        .map(|i| i.trim())
        .filter(|i| !i.is_empty())
        .collect();

    let head = match (mood, genre) {
        (Some(mood), Some(genre)) => Some(format!("{mood} {genre} music")),
        (None, Some(genre)) => Some(format!("{genre} music")),
        (Some(mood), None) => Some(format!("{mood} music")),
        (None, None) if !instruments.is_empty() || tempo.is_some() => Some("music".to_string()),
        (None, None) => None,
    };

    let head = head.map(|head| match join_list(&instruments) {
        Some(list) => format!("{head} featuring {list}"),
        None => head,
    });

    let parts: Vec<String> = [head, tempo.map(|t| format!("{t} tempo")), description.map(str::to_string)]
        .into_iter()
        .flatten()
        .collect();

    parts.join(", ")
}

/// "a", "a and b", "a, b, and c"
fn join_list(items: &[&str]) -> Option<String> {
    match items {
        [] => None,
        [only] => Some((*only).to_string()),
        [first, second] => Some(format!("{first} and {second}")),
        [rest @ .., last] => Some(format!("{}, and {last}", rest.join(", "))),
    }
}

/// Example request shapes offered to clients for inspiration
#[derive(Debug, Serialize)]
pub struct PromptExample {
    pub title: &'static str,
    pub genre: &'static str,
    pub mood: &'static str,
    pub instruments: &'static str,
    pub description: &'static str,
}

static EXAMPLES: [PromptExample; 6] = [
    PromptExample {
        title: "Upbeat Electronic",
        genre: "electronic",
        mood: "energetic",
        instruments: "synth, drums, bass",
        description: "pulsing dance track with a driving four-on-the-floor beat",
    },
    PromptExample {
        title: "Lo-fi Study Session",
        genre: "lo-fi hip hop",
        mood: "relaxed",
        instruments: "piano, vinyl crackle, soft drums",
        description: "mellow beat for late-night studying",
    },
    PromptExample {
        title: "Cinematic Score",
        genre: "orchestral",
        mood: "epic",
        instruments: "strings, brass, timpani",
        description: "swelling build-up for a movie trailer",
    },
    PromptExample {
        title: "Acoustic Morning",
        genre: "folk",
        mood: "happy",
        instruments: "acoustic guitar, harmonica",
        description: "warm sunrise melody with a gentle strum",
    },
    PromptExample {
        title: "Midnight Jazz",
        genre: "jazz",
        mood: "smooth",
        instruments: "saxophone, upright bass, brushed drums",
        description: "smoky club atmosphere with a walking bass line",
    },
    PromptExample {
        title: "Ambient Drift",
        genre: "ambient",
        mood: "calm",
        instruments: "pads, field recordings",
        description: "slowly evolving textures for meditation",
    },
];

/// Fixed list of example prompts
pub fn example_prompts() -> &'static [PromptExample] {
    &EXAMPLES
}
