//! Request Builder: domain requests rendered into generation requests
//!
//! A template is an ordered list of optional sections. Each section has a
//! kind, a predicate, and a renderer; rendering sorts by kind and skips
//! sections that do not apply or render blank.

mod builder;
mod chapter;
mod outline;

pub use builder::{PromptTemplate, Section, SectionKind, build, render_sections};
pub use chapter::{ChapterDraft, ChapterRequest};
pub use outline::{Outline, OutlineEntry, OutlineRequest};
