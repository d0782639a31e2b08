use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Exit status after a second SIGINT, following the shell's `128 + n`
pub const SIGINT_EXIT_CODE: i32 = 130;
/// Exit status after a second SIGTERM
pub const SIGTERM_EXIT_CODE: i32 = 143;

/// Turns process signals into a shutdown request for the supervisor loop
pub struct ShutdownCoordinator {
    tx: mpsc::Sender<()>,
}

impl ShutdownCoordinator {
    /// Create a coordinator and the receiver the supervisor listens on.
    pub fn new() -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Install signal handlers and return the shutdown receiver.
    ///
    /// The first SIGINT or SIGTERM (Ctrl-C elsewhere) requests a graceful
    /// stop, which the loop notices at its next wait between polls. A second
    /// one exits the process at once with `128 + signal number`, even while an
    /// engine call is still running.
    pub fn install() -> Result<mpsc::Receiver<()>> {
        let (coordinator, rx) = Self::new();
        coordinator.spawn_signal_listener()?;
        info!("Signal handlers installed - first SIGINT/SIGTERM stops between polls, second exits now");
        Ok(rx)
    }

    /// Ask the supervisor to stop. Returns false if it already stopped.
    pub async fn request_shutdown(&self) -> bool {
        self.tx.send(()).await.is_ok()
    }

    /// Forward the first signal as a shutdown request; exit on any later one.
    async fn escalate(&self, requested: &mut bool, exit_code: i32) {
        if *requested {
            error!(exit_code, "Second signal received, exiting without waiting for the engine");
            std::process::exit(exit_code);
        }
        *requested = true;
        if !self.request_shutdown().await {
            debug!("Supervisor already stopped");
        }
    }

    #[cfg(unix)]
    fn spawn_signal_listener(self) -> Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            let mut requested = false;
            loop {
                let exit_code = tokio::select! {
                    _ = sigint.recv() => {
                        warn!("SIGINT received");
                        SIGINT_EXIT_CODE
                    }
                    _ = sigterm.recv() => {
                        warn!("SIGTERM received");
                        SIGTERM_EXIT_CODE
                    }
                };
                self.escalate(&mut requested, exit_code).await;
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    fn spawn_signal_listener(self) -> Result<()> {
        tokio::spawn(async move {
            let mut requested = false;
            while tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl-C received");
                self.escalate(&mut requested, SIGINT_EXIT_CODE).await;
            }
        });
        Ok(())
    }
}
