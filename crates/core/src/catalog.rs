//! Tag catalog: the static vocabulary of style tags a caller can enforce.
//!
//! Tags are resolved to their display labels before they reach any prompt
//! text, and always in catalog order so that assembled prompts are
//! deterministic regardless of the order the caller toggled them in.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::EngineError;

/// A style tag: stable identifier plus human-readable label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tag {
    pub id: &'static str,
    pub label: &'static str,
}

const TAGS: &[Tag] = &[
    Tag { id: "35mm", label: "35mm (人文)" },
    Tag { id: "85mm", label: "85mm (人像)" },
    Tag { id: "fisheye", label: "魚眼 (Fisheye)" },
    Tag { id: "low_angle", label: "仰視 (Heroic)" },
    Tag { id: "dutch", label: "荷蘭式 (Tension)" },
    Tag { id: "rembrandt", label: "林布蘭光" },
    Tag { id: "volumetric", label: "丁達爾光 (God Rays)" },
    Tag { id: "cyberpunk", label: "賽博龐克" },
    Tag { id: "y2k", label: "Y2K 風格" },
    Tag { id: "wes_anderson", label: "韋斯安德森" },
    Tag { id: "film_grain", label: "底片顆粒 (Realism)" },
    Tag { id: "robustness", label: "魯棒性破壞 (Imperfection)" },
    Tag { id: "cut_words", label: "剪詞 (Negative Space)" },
];

/// The full catalog, in display order.
pub fn catalog() -> &'static [Tag] {
    TAGS
}

/// Look up a tag by its identifier.
pub fn tag(id: &str) -> Option<&'static Tag> {
    TAGS.iter().find(|t| t.id == id)
}

fn position(id: &str) -> Option<usize> {
    TAGS.iter().position(|t| t.id == id)
}

/// The set of tags chosen for the next synthesis request.
///
/// Stored as catalog positions, so iteration is always in catalog order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedTags {
    positions: BTreeSet<usize>,
}

impl SelectedTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a selection from a list of ids. Fails on the first unknown id.
    pub fn from_ids<I, S>(ids: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut selected = Self::new();
        for id in ids {
            let id = id.as_ref();
            let pos = position(id)
                .ok_or_else(|| EngineError::InputValidation(format!("Unknown tag: {id}")))?;
            selected.positions.insert(pos);
        }
        Ok(selected)
    }

    /// Flip membership of `id`. Returns whether the tag is selected afterwards.
    pub fn toggle(&mut self, id: &str) -> Result<bool, EngineError> {
        let pos = position(id)
            .ok_or_else(|| EngineError::InputValidation(format!("Unknown tag: {id}")))?;
        if self.positions.remove(&pos) {
            Ok(false)
        } else {
            self.positions.insert(pos);
            Ok(true)
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        position(id).is_some_and(|pos| self.positions.contains(&pos))
    }

    /// Selected tags in catalog order.
    pub fn tags(&self) -> impl Iterator<Item = &'static Tag> + '_ {
        self.positions.iter().map(|&pos| &TAGS[pos])
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.tags().map(|t| t.id).collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.tags().map(|t| t.label).collect()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}
