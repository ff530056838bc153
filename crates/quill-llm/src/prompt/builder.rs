use serde::de::DeserializeOwned;

use crate::types::{GenerationRequest, Message, SamplingOptions};

/// Where a section lands in the assembled prompt
///
/// Sections render in this order regardless of how a template lists them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Context,
    Setting,
    Constraints,
    Task,
}

type Predicate<R> = Box<dyn Fn(&R) -> bool + Send + Sync>;
type Renderer<R> = Box<dyn Fn(&R) -> String + Send + Sync>;

/// One optional block of prompt text
pub struct Section<R> {
    kind: SectionKind,
    applies: Predicate<R>,
    render: Renderer<R>,
}

impl<R: 'static> Section<R> {
    /// A section that always applies
    pub fn new(kind: SectionKind, render: impl Fn(&R) -> String + Send + Sync + 'static) -> Self {
        Self {
            kind,
            applies: Box::new(|_| true),
            render: Box::new(render),
        }
    }

    /// Only render when `applies` holds for the request
    #[must_use]
    pub fn when(mut self, applies: impl Fn(&R) -> bool + Send + Sync + 'static) -> Self {
        self.applies = Box::new(applies);
        self
    }

    pub const fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Rendered text, or `None` when the section is skipped or blank
    pub fn render(&self, request: &R) -> Option<String> {
        if !(self.applies)(request) {
            return None;
        }

        let text = (self.render)(request);
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_owned())
    }
}

impl<R> std::fmt::Debug for Section<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Section").field("kind", &self.kind).finish_non_exhaustive()
    }
}

/// A domain request that knows how to phrase itself for the model
pub trait PromptTemplate: Sized + 'static {
    /// Shape the model is asked to answer with
    type Output: DeserializeOwned;

    /// Instructions sent as the system prompt
    fn system_prompt(&self) -> String;

    /// Sections of the user prompt, in any order
    fn sections() -> Vec<Section<Self>>;
}

/// Render `sections` for `request` in kind order, separated by blank lines
///
/// Sections of the same kind keep their listed order.
pub fn render_sections<R: 'static>(request: &R, sections: &[Section<R>]) -> String {
    let mut ordered: Vec<&Section<R>> = sections.iter().collect();
    ordered.sort_by_key(|section| section.kind);

    ordered
        .into_iter()
        .filter_map(|section| section.render(request))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the generation request for a domain request
pub fn build<R: PromptTemplate>(request: &R, options: SamplingOptions) -> GenerationRequest {
    let prompt = render_sections(request, &R::sections());
    GenerationRequest::new(request.system_prompt(), vec![Message::user(prompt)], options)
}

/// `label: value`, or an empty string when `value` is blank
pub(crate) fn labelled(label: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        String::new()
    } else {
        format!("{label}: {value}")
    }
}

/// Join non-empty lines
pub(crate) fn lines<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter(|part| !part.as_ref().trim().is_empty())
        .map(|part| part.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join("\n")
}
