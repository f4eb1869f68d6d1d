//! The handler contract

use core_types::KResult;
use kernel_api::IoRequest;
use serde_json::Value;

/// Answer of a single handler
///
/// `NotHandled` is not an error: it lets the chain ask the next handler.
/// A `Handled` error stops the chain like any other definite answer.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome<T> {
    Handled(KResult<T>),
    NotHandled,
}

impl<T> HandlerOutcome<T> {
    pub fn is_handled(&self) -> bool {
        matches!(self, HandlerOutcome::Handled(_))
    }
}

impl<T> From<KResult<T>> for HandlerOutcome<T> {
    fn from(result: KResult<T>) -> Self {
        HandlerOutcome::Handled(result)
    }
}

/// A resource-type-specific path parser
pub trait PathHandler {
    /// Name used in traces
    fn name(&self) -> &str;

    fn handle_read(&self, request: &IoRequest) -> HandlerOutcome<Value>;

    fn handle_write(&self, request: &IoRequest, data: &Value) -> HandlerOutcome<()>;

    fn handle_ioctl(&self, request: &IoRequest, code: u32, arg: &Value) -> HandlerOutcome<Value>;
}
