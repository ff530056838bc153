//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod config;
pub mod mock_llm;

use std::sync::{Arc, Mutex};

use quill_llm::{FragmentSink, GenerationRequest, Message, SamplingOptions, StreamFragment, sink_fn};

/// Request with a fixed system prompt and one user turn
pub fn request(user: &str) -> GenerationRequest {
    GenerationRequest::new(
        "Reply with a single JSON object.",
        vec![Message::user(user)],
        SamplingOptions::new("mock-model", 0.2),
    )
}

/// Fragments seen by a recording sink, shared with the test body
#[derive(Clone, Default)]
pub struct Recorded(Arc<Mutex<Vec<StreamFragment>>>);

impl Recorded {
    /// Sink that records every fragment it receives
    pub fn sink(&self) -> impl FragmentSink + use<> {
        let seen = Arc::clone(&self.0);
        sink_fn(move |fragment| {
            seen.lock().unwrap().push(fragment);
            Ok(())
        })
    }

    pub fn record(&self, fragment: StreamFragment) {
        self.0.lock().unwrap().push(fragment);
    }

    pub fn fragments(&self) -> Vec<StreamFragment> {
        self.0.lock().unwrap().clone()
    }

    /// Concatenated text deltas
    pub fn text(&self) -> String {
        self.fragments()
            .into_iter()
            .filter_map(|fragment| match fragment {
                StreamFragment::TextDelta(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Number of terminal fragments seen
    pub fn terminals(&self) -> usize {
        self.fragments().iter().filter(|f| f.is_terminal()).count()
    }
}
