//! In-process tool session with canned answers
//!
//! Answers are queued per tool name and consumed in order. Every call is
//! recorded so tests can assert what the engine sent.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::session::ToolSession;
use super::types::ToolCall;
use crate::error::{ToolErrorKind, ToolInvocationError};

type Answer = Result<String, (ToolErrorKind, String)>;

#[derive(Debug, Default)]
pub struct ScriptedToolSession {
    answers: Mutex<HashMap<String, VecDeque<Answer>>>,
    calls: Mutex<Vec<ToolCall>>,
}

impl ScriptedToolSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful answer for `tool`
    pub fn respond(&self, tool: &str, text: impl Into<String>) -> &Self {
        lock(&self.answers)
            .entry(tool.to_string())
            .or_default()
            .push_back(Ok(text.into()));
        self
    }

    /// Queue a failure for `tool`
    pub fn fail(&self, tool: &str, kind: ToolErrorKind, message: impl Into<String>) -> &Self {
        lock(&self.answers)
            .entry(tool.to_string())
            .or_default()
            .push_back(Err((kind, message.into())));
        self
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<ToolCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls made to one tool
    pub fn calls_to(&self, tool: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.tool.as_str() == tool)
            .count()
    }
}

#[async_trait]
impl ToolSession for ScriptedToolSession {
    async fn invoke(&self, call: &ToolCall) -> Result<String, ToolInvocationError> {
        lock(&self.calls).push(call.clone());

        let answer = lock(&self.answers)
            .get_mut(call.tool.as_str())
            .and_then(|queue| queue.pop_front());

        match answer {
            Some(Ok(text)) => Ok(text),
            Some(Err((kind, message))) => Err(ToolInvocationError::new(
                &call.server,
                call.tool.as_str(),
                kind,
                message,
            )),
            None => Err(ToolInvocationError::new(
                &call.server,
                call.tool.as_str(),
                ToolErrorKind::ToolReported,
                "no scripted answer left",
            )),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
