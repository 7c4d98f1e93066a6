//! Local socket relay for cross-process message aggregation.
//!
//! When scenarios execute in isolated processes, each executing process
//! forwards its envelopes to a single listening process over a Unix domain
//! socket derived from the listener's id. The listener deframes incoming
//! NDJSON and republishes into its own [`EnvelopeSubject`]; writers forward
//! everything their local subject produces.
//!
//! Relay failures degrade, never abort: a connect or write error is logged
//! as a warning and the run continues without cross-process messages.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::collector::EnvelopeFromFile;
use crate::deframer::MessagesDeframer;
use crate::socket::derive_socket_path;
use crate::subject::EnvelopeSubject;

/// This process's part in the relay, chosen by explicit run configuration.
///
/// Exactly one process of a run acts as the listener; every other process
/// that executes scenarios writes to it. A run confined to a single process
/// needs no relay at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayRole {
    /// Accept envelopes from writer processes.
    Listener {
        /// Identifier the socket path derives from, conventionally this
        /// process's id.
        id: String,
    },
    /// Forward locally produced envelopes to the listener.
    Writer {
        /// Identifier of the listening process.
        listener_id: String,
    },
    /// No cross-process messaging.
    Disabled,
}

/// Errors raised while setting the relay up.
///
/// Only setup is fallible; once running, transport failures are logged and
/// swallowed.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The relay's IO runtime could not be created.
    #[error("could not initialise the relay runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The listener socket could not be bound.
    #[error("could not bind the relay socket at {path}: {source}")]
    Bind {
        /// The socket path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The listener socket could not be connected to.
    #[error("could not connect to the relay listener at {path}: {source}")]
    Connect {
        /// The socket path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// The listening half of the relay.
///
/// Bound sockets accept any number of sequential or concurrent writers; each
/// connection gets its own deframer so interleaved chunks from different
/// writers cannot corrupt one another. Dropping the listener stops the
/// accept loop and removes the socket file.
#[derive(Debug)]
pub struct RelayListener {
    path: PathBuf,
    shutdown: Arc<Notify>,
    thread: Option<JoinHandle<()>>,
}

impl RelayListener {
    /// Bind the listener socket for the given identifier.
    ///
    /// # Errors
    /// Returns [`RelayError`] when the runtime or socket cannot be set up.
    pub fn for_id(id: &str, subject: Arc<EnvelopeSubject>) -> Result<Self, RelayError> {
        Self::bind(&derive_socket_path(id), subject)
    }

    /// Bind the listener socket at an explicit path.
    ///
    /// A stale socket file from an earlier run is removed first.
    ///
    /// # Errors
    /// Returns [`RelayError`] when the runtime or socket cannot be set up.
    pub fn bind(path: &Path, subject: Arc<EnvelopeSubject>) -> Result<Self, RelayError> {
        let _ = std::fs::remove_file(path);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(RelayError::Runtime)?;
        let listener = {
            let _guard = runtime.enter();
            UnixListener::bind(path).map_err(|source| RelayError::Bind {
                path: path.to_path_buf(),
                source,
            })?
        };

        let shutdown = Arc::new(Notify::new());
        let accept_shutdown = Arc::clone(&shutdown);
        let thread = std::thread::spawn(move || {
            runtime.block_on(accept_loop(listener, subject, accept_shutdown));
        });

        Ok(Self {
            path: path.to_path_buf(),
            shutdown,
            thread: Some(thread),
        })
    }

    /// The socket path this listener is bound to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RelayListener {
    fn drop(&mut self) {
        self.shutdown.notify_one();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("the relay listener thread panicked during shutdown");
            }
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn accept_loop(
    listener: UnixListener,
    subject: Arc<EnvelopeSubject>,
    shutdown: Arc<Notify>,
) {
    loop {
        tokio::select! {
            () = shutdown.notified() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let subject = Arc::clone(&subject);
                    tokio::spawn(read_connection(stream, subject));
                }
                Err(err) => {
                    log::warn!("caught an error while accepting a relay connection: {err}");
                }
            },
        }
    }
}

async fn read_connection(mut stream: UnixStream, subject: Arc<EnvelopeSubject>) {
    let mut deframer = MessagesDeframer::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => {
                for item in deframer.push(chunk.get(..read).unwrap_or_default()) {
                    subject.next(item);
                }
            }
            Err(err) => {
                log::warn!("caught an error while reading from a relay connection: {err}");
                break;
            }
        }
    }
}

enum WriterMessage {
    Item(Box<EnvelopeFromFile>),
    Shutdown,
}

/// The writing half of the relay.
///
/// Connecting subscribes to the local subject; every envelope it produces is
/// serialized as one NDJSON line and streamed to the listener. Dropping the
/// writer flushes queued envelopes and closes the connection.
pub struct RelayWriter {
    sender: UnboundedSender<WriterMessage>,
    thread: Option<JoinHandle<()>>,
}

impl RelayWriter {
    /// Connect to a listener socket and start forwarding the subject's
    /// envelopes.
    ///
    /// # Errors
    /// Returns [`RelayError`] when the runtime cannot be created or the
    /// listener is not reachable.
    pub fn connect(path: &Path, subject: &EnvelopeSubject) -> Result<Self, RelayError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(RelayError::Runtime)?;
        let stream = runtime
            .block_on(UnixStream::connect(path))
            .map_err(|source| RelayError::Connect {
                path: path.to_path_buf(),
                source,
            })?;

        let (sender, receiver) = unbounded_channel();
        let forward = sender.clone();
        subject.subscribe(move |item| {
            let _ = forward.send(WriterMessage::Item(Box::new(item.clone())));
        });

        let thread = std::thread::spawn(move || {
            runtime.block_on(write_loop(stream, receiver));
        });

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }
}

impl Drop for RelayWriter {
    fn drop(&mut self) {
        let _ = self.sender.send(WriterMessage::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("the relay writer thread panicked during shutdown");
            }
        }
    }
}

impl std::fmt::Debug for RelayWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayWriter")
            .field("running", &self.thread.is_some())
            .finish()
    }
}

async fn write_loop(mut stream: UnixStream, mut receiver: UnboundedReceiver<WriterMessage>) {
    while let Some(message) = receiver.recv().await {
        match message {
            WriterMessage::Item(item) => {
                let line = match serde_json::to_string(item.as_ref()) {
                    Ok(mut line) => {
                        line.push('\n');
                        line
                    }
                    Err(err) => {
                        log::warn!("could not serialize an envelope for the relay: {err}");
                        continue;
                    }
                };
                if let Err(err) = stream.write_all(line.as_bytes()).await {
                    log::warn!("caught an error when communicating with the relay listener: {err}");
                    break;
                }
            }
            WriterMessage::Shutdown => break,
        }
    }
    let _ = stream.shutdown().await;
}

/// Set up message writing for a process according to its configured role.
///
/// Listener and disabled roles need no writer and yield `None`. A writer
/// role that cannot reach its listener logs a warning and yields `None`:
/// the run proceeds without cross-process messages.
#[must_use]
pub fn setup_message_writing(role: &RelayRole, subject: &EnvelopeSubject) -> Option<RelayWriter> {
    match role {
        RelayRole::Writer { listener_id } => {
            let path = derive_socket_path(listener_id);
            match RelayWriter::connect(&path, subject) {
                Ok(writer) => Some(writer),
                Err(err) => {
                    log::warn!(
                        "caught an error when connecting to relay listener {listener_id}: {err}"
                    );
                    None
                }
            }
        }
        RelayRole::Listener { .. } | RelayRole::Disabled => None,
    }
}
