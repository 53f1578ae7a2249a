// Job intake and the generation state machine.

pub mod handlers;
pub mod lifecycle;

pub use lifecycle::{GenerationOutcome, JobLifecycle, NewJob};
