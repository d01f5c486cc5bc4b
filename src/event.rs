use std::fmt;

use crate::vm::Time;

/// Where a printed float was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatSource {
  Stack,
  Inline,
}

/// Everything the machine can tell its host. These are the only externally
/// visible effects of running a program.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
  HelloWorld,
  Set { value: u8 },
  Add { a: u8, b: u8, sum: u8 },
  PrintFloat { value: f32, source: FloatSource },
  Wait { amount: u8 },
  Repeat,
  Finished,
  /// Still asleep; `remaining` is rounded up to whole time units
  Waiting { remaining: Time },
}

impl fmt::Display for Event {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::HelloWorld => write!(f, "Hello World"),
      Self::Set { value } => write!(f, "Set (READ & PUSH: {value})"),
      Self::Add { a, b, sum } => write!(f, "Add (POP: {a}) + (POP: {b}) = (PUSH: {sum})"),
      Self::PrintFloat {
        value,
        source: FloatSource::Stack,
      } => write!(f, "Print Float (POP 4x = {value})"),
      Self::PrintFloat {
        value,
        source: FloatSource::Inline,
      } => write!(f, "Print Float (READ 4x FOLLOWING BYTES = {value})"),
      Self::Wait { amount } => write!(f, "Wait (POP: {amount})"),
      Self::Repeat => write!(f, "Repeat"),
      Self::Finished => write!(f, "Finished"),
      Self::Waiting { remaining } => write!(f, "Waiting {remaining} seconds..."),
    }
  }
}

/// Receives events in the order the machine produces them
pub trait Sink {
  fn emit(&mut self, event: Event);
}

/// Collects events, handy when a test wants to look at the whole log
impl Sink for Vec<Event> {
  fn emit(&mut self, event: Event) {
    self.push(event);
  }
}

/// Forwards every event to `tracing` at `INFO`
#[derive(Debug, Clone, Copy, Default)]
pub struct Tracer;

impl Sink for Tracer {
  fn emit(&mut self, event: Event) {
    tracing::info!(target: "bytevm::event", "{event}");
  }
}
