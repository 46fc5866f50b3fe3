//! Signal handling for graceful shutdown.
use std::{
    future::Future,
    io,
    pin::Pin,
    task::{Context, Poll},
};

use derive_more::Debug;
use futures::FutureExt;
use tokio::signal::unix::{Signal, SignalKind};
use tracing::{debug, info};

type SignalFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// Resolves once the process receives SIGINT or SIGTERM.
#[derive(Debug)]
pub struct ShutdownSignal {
    /// Resolves on SIGINT
    #[debug(skip)]
    ctrl_c: SignalFuture,
    /// Yields on SIGTERM, absent for signals triggered in-process
    term_signal: Option<Signal>,
}

impl ShutdownSignal {
    /// Install the SIGINT and SIGTERM handlers.
    pub fn new() -> io::Result<Self> {
        let ctrl_c = Box::pin(tokio::signal::ctrl_c());
        let term_signal = tokio::signal::unix::signal(SignalKind::terminate())?;

        Ok(Self { ctrl_c, term_signal: Some(term_signal) })
    }

    /// A signal that fires when `trigger` completes.
    pub fn from_future<F>(trigger: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self { ctrl_c: Box::pin(trigger.map(Ok::<(), io::Error>)), term_signal: None }
    }
}

impl Future for ShutdownSignal {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.ctrl_c.poll_unpin(cx).is_ready() {
            debug!("Received SIGINT signal");
            return Poll::Ready(());
        }

        if let Some(term_signal) = this.term_signal.as_mut() {
            if term_signal.poll_recv(cx).is_ready() {
                debug!("Received SIGTERM signal");
                return Poll::Ready(());
            }
        }

        Poll::Pending
    }
}

/// Drive `fut` until it completes or `shutdown` fires.
///
/// Returns `None` on shutdown. The unfinished future is dropped, together with any state it
/// had not yet persisted.
pub async fn run_until_shutdown<F, O>(fut: F, shutdown: ShutdownSignal) -> Option<O>
where
    F: Future<Output = O>,
{
    tokio::select! {
        // NOTE: wrap with a `Box` so we don't allocate a
        // huge future state machine on the stack.
        result = Box::pin(fut) => Some(result),
        _ = shutdown => {
            info!("Shutdown signal received, dropping in-flight work");
            None
        }
    }
}
