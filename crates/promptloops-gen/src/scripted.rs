use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::{GenerationError, Generator, OutputKind};

/// One call observed by a [`ScriptedGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedCall {
    pub kind: OutputKind,
    pub system: String,
    pub user: String,
    pub temperature: f64,
}

/// Generator that replays queued responses in order and records each call.
///
/// Queued failures surface as [`GenerationError::ExecutionFailed`]. Once the
/// queue is empty every further call fails the same way.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a generator that answers with `responses`, in order
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let generator = Self::new();
        for response in responses {
            generator.push_response(response);
        }
        generator
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(response.into()));
        }
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.into()));
        }
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of queued responses not yet consumed
    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn next(
        &self,
        kind: OutputKind,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ScriptedCall {
                kind,
                system: system.to_string(),
                user: user.to_string(),
                temperature,
            });
        }

        let next = self
            .responses
            .lock()
            .map_err(|_| GenerationError::ExecutionFailed("script lock poisoned".into()))?
            .pop_front();

        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::ExecutionFailed(message)),
            None => Err(GenerationError::ExecutionFailed(
                "no scripted response left".into(),
            )),
        }
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate_text(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.next(OutputKind::Text, system, user, temperature)
    }

    async fn generate_structured(
        &self,
        system: &str,
        user: &str,
        temperature: f64,
    ) -> Result<String, GenerationError> {
        self.next(OutputKind::Structured, system, user, temperature)
    }

    async fn is_available(&self) -> bool {
        self.remaining() > 0
    }
}
