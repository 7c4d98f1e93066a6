//! Per-step execution context handed to support code.
//!
//! The context threads the opaque per-scenario world through by reference,
//! exposes explicit skip/todo outcome requests, and routes attachment
//! capture through an [`AttachmentSink`] so the execution layer can stamp
//! the current step's identity onto everything captured.

use std::any::Any;

/// Content being attached to the current step.
pub enum AttachmentData<'a> {
    /// Plain text, carried verbatim.
    Text(&'a str),
    /// Binary content, base64-encoded on the wire.
    Bytes(&'a [u8]),
    /// A reader drained to completion before the step proceeds.
    Reader(&'a mut (dyn std::io::Read + 'a)),
}

impl std::fmt::Debug for AttachmentData<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

/// Declares more information about an attachment.
#[derive(Debug, Clone, Copy)]
pub struct AttachmentOptions<'a> {
    /// MIME type of the content.
    pub media_type: &'a str,
    /// Optional file name used when the content is saved or exported.
    pub file_name: Option<&'a str>,
}

/// Receives attachments, logs and links captured during a step.
///
/// The execution layer implements this to stamp the current test case and
/// step ids onto captured content; tests can use [`NoopAttachmentSink`].
pub trait AttachmentSink {
    /// Capture an attachment.
    fn attach(&self, data: AttachmentData<'_>, options: AttachmentOptions<'_>);
    /// Capture a log line.
    fn log(&self, text: &str);
    /// Capture a URL, optionally titled.
    fn link(&self, url: &str, title: Option<&str>);
}

/// An [`AttachmentSink`] that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAttachmentSink;

impl AttachmentSink for NoopAttachmentSink {
    fn attach(&self, _data: AttachmentData<'_>, _options: AttachmentOptions<'_>) {}
    fn log(&self, _text: &str) {}
    fn link(&self, _url: &str, _title: Option<&str>) {}
}

/// Outcome a step requested through the context, read by the execution
/// engine after the step function returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestedOutcome {
    /// No explicit request; the return value decides.
    #[default]
    Proceed,
    /// The step called [`StepContext::skip`].
    Skip,
    /// The step called [`StepContext::todo`].
    Todo,
}

/// Context injected into every step and hook function.
///
/// # Examples
/// ```
/// use cuke_harness::{NoopAttachmentSink, RequestedOutcome, StepContext};
///
/// let mut world: Box<dyn std::any::Any> = Box::new(5_i32);
/// let sink = NoopAttachmentSink;
/// let mut ctx = StepContext::new(world.as_mut(), &sink);
/// assert_eq!(ctx.world::<i32>(), Some(&5));
/// ctx.skip();
/// assert_eq!(ctx.requested_outcome(), RequestedOutcome::Skip);
/// ```
pub struct StepContext<'a> {
    world: &'a mut dyn Any,
    attachments: &'a dyn AttachmentSink,
    requested: RequestedOutcome,
}

impl<'a> StepContext<'a> {
    /// Create a context over a world and an attachment sink.
    pub fn new(world: &'a mut dyn Any, attachments: &'a dyn AttachmentSink) -> Self {
        Self {
            world,
            attachments,
            requested: RequestedOutcome::Proceed,
        }
    }

    /// Borrow the world as a concrete type.
    #[must_use]
    pub fn world<T: Any>(&self) -> Option<&T> {
        self.world.downcast_ref::<T>()
    }

    /// Mutably borrow the world as a concrete type.
    #[must_use]
    pub fn world_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.world.downcast_mut::<T>()
    }

    /// Mark this step as skipped; subsequent non-always steps will be
    /// skipped too.
    pub fn skip(&mut self) {
        self.requested = RequestedOutcome::Skip;
    }

    /// Mark this step as pending; subsequent non-always steps will be
    /// skipped.
    pub fn todo(&mut self) {
        self.requested = RequestedOutcome::Todo;
    }

    /// The outcome this step requested, if any.
    #[must_use]
    pub fn requested_outcome(&self) -> RequestedOutcome {
        self.requested
    }

    /// Capture an attachment associated with this step.
    pub fn attach(&self, data: AttachmentData<'_>, options: AttachmentOptions<'_>) {
        self.attachments.attach(data, options);
    }

    /// Capture a log line associated with this step.
    pub fn log(&self, text: &str) {
        self.attachments.log(text);
    }

    /// Capture a URL associated with this step.
    pub fn link(&self, url: &str, title: Option<&str>) {
        self.attachments.link(url, title);
    }
}

impl std::fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContext")
            .field("requested", &self.requested)
            .finish_non_exhaustive()
    }
}
