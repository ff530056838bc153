use serde::{Deserialize, Serialize};

use super::builder::{PromptTemplate, Section, SectionKind, labelled, lines};

/// Request to outline a whole novel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub premise: String,
    pub genre: String,
    #[serde(default)]
    pub setting: String,
    #[serde(default)]
    pub themes: Vec<String>,
    pub chapter_count: u32,
}

/// Model answer for [`OutlineRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outline {
    pub chapters: Vec<OutlineEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub summary: String,
}

impl PromptTemplate for OutlineRequest {
    type Output = Outline;

    fn system_prompt(&self) -> String {
        "You plan novels chapter by chapter. Reply with a single JSON object and nothing else.".to_owned()
    }

    fn sections() -> Vec<Section<Self>> {
        vec![
            Section::new(SectionKind::Context, |r: &Self| {
                lines([labelled("Premise", &r.premise), labelled("Genre", &r.genre)])
            }),
            Section::new(SectionKind::Setting, |r: &Self| labelled("Setting", &r.setting)),
            Section::new(SectionKind::Constraints, |r: &Self| {
                labelled("Themes to carry through", &r.themes.join(", "))
            })
            .when(|r| !r.themes.is_empty()),
            Section::new(SectionKind::Task, |r: &Self| {
                format!(
                    "Outline exactly {} chapters.\n\n\
                     Respond with JSON: {{\"chapters\": [{{\"number\": int, \"title\": string, \"summary\": string}}]}}",
                    r.chapter_count
                )
            }),
        ]
    }
}
