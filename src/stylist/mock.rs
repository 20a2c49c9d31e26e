//! Scripted stylist backend for deterministic tests.
//!
//! Responses are queued up front and every call is recorded so tests can
//! assert on call counts and request payloads.

use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::llm::media::InlineImage;
use crate::stylist::backend::{ResponsePart, StylistBackend, SynthesisRequest, SynthesisResponse};

#[derive(Debug, Clone)]
pub enum MockCall {
    Plan { prompt: String },
    Synthesize(SynthesisRequest),
    Analyze { prompt: String, image: InlineImage },
}

#[derive(Debug, Clone)]
pub enum MockSynthesis {
    Response(SynthesisResponse),
    Failure(String),
}

impl MockSynthesis {
    pub fn image(mime_type: &str, data: &str) -> Self {
        MockSynthesis::Response(SynthesisResponse::from_parts(vec![
            ResponsePart::Text("Here is the look.".to_string()),
            ResponsePart::Inline(InlineImage::new(mime_type, data)),
        ]))
    }

    pub fn text(text: &str) -> Self {
        MockSynthesis::Response(SynthesisResponse::from_parts(vec![ResponsePart::Text(
            text.to_string(),
        )]))
    }

    pub fn empty() -> Self {
        MockSynthesis::Response(SynthesisResponse::default())
    }

    pub fn failure(message: &str) -> Self {
        MockSynthesis::Failure(message.to_string())
    }
}

#[derive(Debug, Clone)]
enum MockText {
    Reply(String),
    Failure(String),
}

impl MockText {
    fn resolve(&self) -> Result<String> {
        match self {
            MockText::Reply(text) => Ok(text.clone()),
            MockText::Failure(message) => Err(anyhow!("{}", message)),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockBackend {
    plan: Option<MockText>,
    analysis: Option<MockText>,
    syntheses: Arc<Mutex<VecDeque<MockSynthesis>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plan_response(mut self, text: impl Into<String>) -> Self {
        self.plan = Some(MockText::Reply(text.into()));
        self
    }

    pub fn with_plan_failure(mut self, message: &str) -> Self {
        self.plan = Some(MockText::Failure(message.to_string()));
        self
    }

    pub fn with_analysis_response(mut self, text: impl Into<String>) -> Self {
        self.analysis = Some(MockText::Reply(text.into()));
        self
    }

    pub fn with_analysis_failure(mut self, message: &str) -> Self {
        self.analysis = Some(MockText::Failure(message.to_string()));
        self
    }

    /// Queues the answer for the next synthesis call. Calls past the end of
    /// the queue get an empty response.
    pub fn with_synthesis(self, synthesis: MockSynthesis) -> Self {
        self.syntheses.lock().push_back(synthesis);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn plan_calls(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Plan { .. }))
    }

    pub fn synthesis_calls(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Synthesize(_)))
    }

    pub fn analysis_calls(&self) -> usize {
        self.count(|call| matches!(call, MockCall::Analyze { .. }))
    }

    pub fn synthesis_requests(&self) -> Vec<SynthesisRequest> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                MockCall::Synthesize(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }
}

#[async_trait]
impl StylistBackend for MockBackend {
    async fn plan_looks(&self, prompt: &str) -> Result<String> {
        self.calls.lock().push(MockCall::Plan {
            prompt: prompt.to_string(),
        });
        match &self.plan {
            Some(plan) => plan.resolve(),
            None => Err(anyhow!("no planning response scripted")),
        }
    }

    async fn synthesize_image(&self, request: &SynthesisRequest) -> Result<SynthesisResponse> {
        self.calls.lock().push(MockCall::Synthesize(request.clone()));
        let next = self.syntheses.lock().pop_front();
        match next {
            Some(MockSynthesis::Response(response)) => Ok(response),
            Some(MockSynthesis::Failure(message)) => Err(anyhow!("{}", message)),
            None => Ok(SynthesisResponse::default()),
        }
    }

    async fn analyze_image(&self, prompt: &str, image: &InlineImage) -> Result<String> {
        self.calls.lock().push(MockCall::Analyze {
            prompt: prompt.to_string(),
            image: image.clone(),
        });
        match &self.analysis {
            Some(analysis) => analysis.resolve(),
            None => Err(anyhow!("no analysis response scripted")),
        }
    }
}
