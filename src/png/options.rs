//! Per-call write options and the context handed to metadata hooks.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An option passed to [`Encoder::encode_with_options`](super::Encoder::encode_with_options).
///
/// The encoder recognizes [`Metadata`](super::Metadata); any other type is
/// rejected. Options are also forwarded to ICC and XMP hooks, which may
/// downcast them through [`as_any`](WriteOption::as_any).
pub trait WriteOption: fmt::Debug {
    /// Upcast for downcasting to the concrete option type.
    fn as_any(&self) -> &dyn Any;

    /// Short name used in error messages.
    fn name(&self) -> &str {
        std::any::type_name_of_val(self)
    }
}

/// Context for one encode call.
///
/// Only the metadata hooks observe it. The pixel pipeline never checks for
/// cancellation.
#[derive(Debug, Clone, Default)]
pub struct EncodeContext {
    cancel: Option<Arc<AtomicBool>>,
}

impl EncodeContext {
    /// Context without cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context observing `flag`. Setting the flag asks hooks to give up.
    pub fn with_cancel_flag(flag: Arc<AtomicBool>) -> Self {
        Self { cancel: Some(flag) }
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
