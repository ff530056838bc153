use serde::{Deserialize, Serialize};

use super::builder::{PromptTemplate, Section, SectionKind, labelled, lines};

/// Request to draft one chapter of a novel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterRequest {
    pub novel_title: String,
    pub genre: String,
    pub synopsis: String,
    /// Summary of the story so far
    #[serde(default)]
    pub previous_summary: Option<String>,
    pub setting: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default)]
    pub style_notes: String,
    #[serde(default)]
    pub min_words: Option<u32>,
    pub chapter_number: u32,
    /// What should happen in this chapter
    pub chapter_outline: String,
}

/// Model answer for [`ChapterRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub summary: String,
}

impl PromptTemplate for ChapterRequest {
    type Output = ChapterDraft;

    fn system_prompt(&self) -> String {
        "You are a novelist drafting chapters for an ongoing book. \
         Reply with a single JSON object and nothing else."
            .to_owned()
    }

    fn sections() -> Vec<Section<Self>> {
        vec![
            Section::new(SectionKind::Context, |r: &Self| {
                lines([
                    labelled("Novel", &r.novel_title),
                    labelled("Genre", &r.genre),
                    labelled("Synopsis", &r.synopsis),
                ])
            }),
            Section::new(SectionKind::Context, |r: &Self| {
                labelled("Story so far", r.previous_summary.as_deref().unwrap_or_default())
            })
            .when(|r| r.previous_summary.is_some()),
            Section::new(SectionKind::Setting, |r: &Self| {
                lines([
                    labelled("Setting", &r.setting),
                    labelled("Characters", &r.characters.join(", ")),
                ])
            }),
            Section::new(SectionKind::Constraints, |r: &Self| {
                let length = r
                    .min_words
                    .map(|n| format!("Write at least {n} words."))
                    .unwrap_or_default();
                lines([length, labelled("Style", &r.style_notes)])
            }),
            Section::new(SectionKind::Task, |r: &Self| {
                format!(
                    "Write chapter {}. {}\n\n\
                     Respond with JSON: {{\"title\": string, \"content\": string, \"summary\": string}}",
                    r.chapter_number,
                    r.chapter_outline.trim()
                )
            }),
        ]
    }
}
