// Process module - supervision of the single child process

pub mod control;
pub mod monitor;
pub mod spawner;
mod supervisor;
pub mod terminate;
pub mod types;

pub use control::{control_channel, spawn_signal_listener, ControlHandle, ControlReceiver};
pub use monitor::{ProcessUsage, ResourceReader};
pub use spawner::spawn_child;
pub use supervisor::Supervisor;
pub use terminate::terminate_gracefully;
pub use types::{ControlSignal, CycleOutcome, SpawnedProcess, SupervisionCycle, Termination};
