use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Shutdown Coordinator
// ============================================================================
//
// Turns SIGINT/SIGTERM into a cooperative stop request. Nothing is killed:
// the subscriber loop sees the cancelled token on its next poll cycle and
// the HTTP server is stopped gracefully by main. Signals after the first
// are inert.
//
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to the subscriber loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Ask everything to stop. Returns false if a stop was already requested.
    pub fn request_stop(&self, source: &str) -> bool {
        if self.token.is_cancelled() {
            tracing::debug!(source = %source, "Stop already requested, ignoring");
            return false;
        }

        tracing::info!(source = %source, "Caught stop request: terminating");
        self.token.cancel();
        true
    }

    /// Watch for termination signals until the process exits.
    pub fn listen_for_signals(&self) -> std::io::Result<JoinHandle<()>> {
        let mut signals = Signals::register()?;
        let coordinator = self.clone();

        Ok(tokio::spawn(async move {
            loop {
                match signals.recv().await {
                    Some(name) => {
                        coordinator.request_stop(name);
                    }
                    None => {
                        tracing::warn!("Signal stream closed, no longer listening for signals");
                        return;
                    }
                }
            }
        }))
    }
}

#[cfg(unix)]
struct Signals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Signals {
    fn register() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> Option<&'static str> {
        tokio::select! {
            received = self.interrupt.recv() => received.map(|_| "SIGINT"),
            received = self.terminate.recv() => received.map(|_| "SIGTERM"),
        }
    }
}

#[cfg(not(unix))]
struct Signals;

#[cfg(not(unix))]
impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Option<&'static str> {
        tokio::signal::ctrl_c().await.ok().map(|_| "Ctrl-C")
    }
}
