use statig::prelude::*;

/// Where the supervisor is in its lifecycle. `Polling` is only left by
/// shutting the process (or the loop) down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorPhase {
    Init,
    Booting,
    Polling,
}

impl std::fmt::Display for SupervisorPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SupervisorPhase::Init => "init",
            SupervisorPhase::Booting => "booting",
            SupervisorPhase::Polling => "polling",
        };
        f.write_str(name)
    }
}

/// Completed engine calls, fed to the phase machine in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// The initial synchronize finished
    Synchronized,
    /// The cold-start boot finished
    Booted,
    /// A polling-phase synchronize finished
    Polled,
}

/// Phase bookkeeping only; the poll count lives on `Supervisor`.
#[derive(Debug, Default)]
pub struct SupervisorPhaseMachine;

impl SupervisorPhaseMachine {
    fn reject(&self, phase: SupervisorPhase, event: &PhaseEvent) {
        tracing::error!(phase = %phase, event = ?event, "Event out of order, ignoring");
    }
}

#[state_machine(
    initial = "State::starting()",
    state(derive(Debug, Clone, PartialEq, Eq))
)]
impl SupervisorPhaseMachine {
    #[state]
    fn starting(&mut self, event: &PhaseEvent) -> Outcome<State> {
        match event {
            PhaseEvent::Synchronized => {
                tracing::info!("Engine state store ready, booting");
                Transition(State::booting())
            }
            _ => {
                self.reject(SupervisorPhase::Init, event);
                Handled
            }
        }
    }

    #[state]
    fn booting(&mut self, event: &PhaseEvent) -> Outcome<State> {
        match event {
            PhaseEvent::Booted => {
                tracing::info!("Cold start booted, entering polling");
                Transition(State::polling())
            }
            _ => {
                self.reject(SupervisorPhase::Booting, event);
                Handled
            }
        }
    }

    #[state]
    fn polling(&mut self, event: &PhaseEvent) -> Outcome<State> {
        match event {
            PhaseEvent::Polled => Handled,
            _ => {
                self.reject(SupervisorPhase::Polling, event);
                Handled
            }
        }
    }
}

/// Owns the running machine and answers "which phase are we in".
pub struct PhaseTracker {
    machine: StateMachine<SupervisorPhaseMachine>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            machine: SupervisorPhaseMachine::default().state_machine(),
        }
    }

    pub fn handle(&mut self, event: PhaseEvent) {
        self.machine.handle(&event);
    }

    pub fn phase(&self) -> SupervisorPhase {
        match self.machine.state() {
            State::Starting { .. } => SupervisorPhase::Init,
            State::Booting { .. } => SupervisorPhase::Booting,
            State::Polling { .. } => SupervisorPhase::Polling,
        }
    }
}
