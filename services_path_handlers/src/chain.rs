//! Ordered decision chain of handlers

use crate::handler::{HandlerOutcome, PathHandler};
use kernel_api::IoRequest;
use serde_json::Value;

/// Handlers tried in insertion order
///
/// The first handler returning [`HandlerOutcome::Handled`] decides the call;
/// later handlers never run.
#[derive(Default)]
pub struct HandlerChain {
    handlers: Vec<Box<dyn PathHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler
    pub fn with_handler(mut self, handler: impl PathHandler + 'static) -> Self {
        self.push(Box::new(handler));
        self
    }

    pub fn push(&mut self, handler: Box<dyn PathHandler>) {
        self.handlers.push(handler);
    }

    pub fn names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn read(&self, request: &IoRequest) -> HandlerOutcome<Value> {
        self.first(|h| h.handle_read(request))
    }

    pub fn write(&self, request: &IoRequest, data: &Value) -> HandlerOutcome<()> {
        self.first(|h| h.handle_write(request, data))
    }

    pub fn ioctl(&self, request: &IoRequest, code: u32, arg: &Value) -> HandlerOutcome<Value> {
        self.first(|h| h.handle_ioctl(request, code, arg))
    }

    fn first<T>(&self, mut call: impl FnMut(&dyn PathHandler) -> HandlerOutcome<T>) -> HandlerOutcome<T> {
        for handler in &self.handlers {
            let outcome = call(handler.as_ref());
            if outcome.is_handled() {
                return outcome;
            }
        }
        HandlerOutcome::NotHandled
    }
}
