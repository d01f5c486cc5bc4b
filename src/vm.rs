use tracing::{debug, error, instrument, trace, warn};

use crate::event::{Event, FloatSource, Sink, Tracer};
use crate::opcode::Opcode;
use crate::program::Program;

/// The host's clock, in whatever unit it likes (seconds, frames, ...)
pub type Time = f64;

/// Number of byte slots on the operand stack
pub const STACK_CAPACITY: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
  Active,
  Faulted,
}

/// What to do with a byte that isn't in the instruction set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownOpcodePolicy {
  /// Skip it and carry on with the next byte
  #[default]
  Ignore,
  /// Fault the machine
  Fatal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Config {
  pub unknown_opcode: UnknownOpcodePolicy,
}

/// An error that occurred during execution of instructions. All of them are
/// fatal: the machine refuses to run again until a program is loaded.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
  #[error("stack overflow: all {capacity} slots are occupied")]
  StackOverflow { capacity: usize },

  #[error("stack underflow: needed {needed} value(s) but the stack holds {size}")]
  StackUnderflow { needed: usize, size: usize },

  #[error("operand of {needed} byte(s) at {at} runs past the end of a {len}-byte program")]
  OutOfRange { at: usize, needed: usize, len: usize },

  #[error("unknown opcode {byte:#04x} at {ip}")]
  UnknownOpcode { ip: usize, byte: u8 },

  #[error("machine is faulted, load a program to reset it")]
  Faulted,
}

/// Fixed-size LIFO of untyped bytes
#[derive(Debug, Clone)]
struct Stack {
  slots: [u8; STACK_CAPACITY],
  size: usize,
}

impl Stack {
  fn new() -> Self {
    Self {
      slots: [0; STACK_CAPACITY],
      size: 0,
    }
  }

  fn push(&mut self, value: u8) -> Result<(), Error> {
    let slot = self.slots.get_mut(self.size).ok_or(Error::StackOverflow {
      capacity: STACK_CAPACITY,
    })?;
    *slot = value;
    self.size += 1;
    Ok(())
  }

  fn pop(&mut self) -> Result<u8, Error> {
    self.require(1)?;
    self.size -= 1;
    Ok(self.slots[self.size])
  }

  /// Fails unless at least `needed` values are available to pop
  fn require(&self, needed: usize) -> Result<(), Error> {
    if self.size < needed {
      return Err(Error::StackUnderflow {
        needed,
        size: self.size,
      });
    }
    Ok(())
  }

  fn clear(&mut self) {
    self.slots = [0; STACK_CAPACITY];
    self.size = 0;
  }

  fn as_slice(&self) -> &[u8] {
    &self.slots[..self.size]
  }
}

/// A stack machine that runs a byte program a slice at a time.
///
/// Every call to [`Vm::tick`] runs until an instruction suspends the machine
/// (`WAIT` or `REPEAT`) or the program runs out. All state lives in plain
/// fields, so nothing is lost between ticks.
#[derive(Debug)]
pub struct Vm<S = Tracer> {
  program: Program,
  // index of the next byte to fetch; `program.len()` means finished
  ip: usize,
  stack: Stack,
  wake: Option<Time>,
  state: State,
  config: Config,
  sink: S,
}

impl Vm {
  /// Create a new, empty virtual machine that reports through `tracing`
  pub fn new() -> Self {
    Self::with_sink(Tracer)
  }
}

impl Default for Vm {
  fn default() -> Self {
    Self::new()
  }
}

impl<S> Vm<S>
where
  S: Sink,
{
  /// Create a new, empty virtual machine that reports to `sink`
  pub fn with_sink(sink: S) -> Self {
    Self {
      program: Program::default(),
      ip: 0,
      stack: Stack::new(),
      wake: None,
      state: State::Active,
      config: Config::default(),
      sink,
    }
  }

  pub fn with_config(mut self, config: Config) -> Self {
    self.config = config;
    self
  }

  /// Replace the current program and reset the pointer, stack, pending wait
  /// and any fault. The bytes are not validated.
  pub fn load(&mut self, program: impl Into<Program>) {
    self.program = program.into();
    self.ip = 0;
    self.stack.clear();
    self.wake = None;
    self.state = State::Active;
    debug!(len = self.program.len(), "program loaded");
  }

  /// Run until the next suspension point or the end of the program.
  ///
  /// While a `WAIT` is pending and `now` is earlier than the wake time this
  /// only reports the remaining time. Time is compared, never assumed to be
  /// monotonic.
  #[instrument(skip(self), level = "debug")]
  pub fn tick(&mut self, now: Time) -> Result<(), Error> {
    if self.state == State::Faulted {
      return Err(Error::Faulted);
    }

    if let Some(wake) = self.wake {
      if now < wake {
        self.sink.emit(Event::Waiting {
          remaining: (wake - now).ceil(),
        });
        return Ok(());
      }
      debug!(wake, "resuming");
      self.wake = None;
    }

    if let Err(err) = Task::new(self, now).run() {
      error!(%err, ip = self.ip, "machine faulted");
      self.state = State::Faulted;
      return Err(err);
    }

    if self.is_finished() {
      self.sink.emit(Event::Finished);
    }
    Ok(())
  }

  pub fn program(&self) -> &Program {
    &self.program
  }

  pub fn ip(&self) -> usize {
    self.ip
  }

  /// Occupied stack slots, bottom first
  pub fn stack(&self) -> &[u8] {
    self.stack.as_slice()
  }

  pub fn wake_time(&self) -> Option<Time> {
    self.wake
  }

  pub fn is_finished(&self) -> bool {
    self.ip >= self.program.len()
  }

  pub fn is_faulted(&self) -> bool {
    self.state == State::Faulted
  }

  pub fn config(&self) -> Config {
    self.config
  }

  pub fn sink(&self) -> &S {
    &self.sink
  }

  pub fn sink_mut(&mut self) -> &mut S {
    &mut self.sink
  }

  pub fn into_sink(self) -> S {
    self.sink
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flow {
  Continue,
  Suspend,
}

/// One tick's worth of execution
struct Task<'vm, S> {
  vm: &'vm mut Vm<S>,
  now: Time,
}

impl<'vm, S> Task<'vm, S>
where
  S: Sink,
{
  fn new(vm: &'vm mut Vm<S>, now: Time) -> Self {
    Self { vm, now }
  }

  #[inline]
  fn eat(&mut self) -> Option<u8> {
    let byte = self.vm.program.fetch(self.vm.ip)?;
    self.vm.ip += 1;
    Some(byte)
  }

  fn eat_operand<const N: usize>(&mut self) -> Result<[u8; N], Error> {
    let at = self.vm.ip;
    let bytes = self.vm.program.fetch_n::<N>(at).ok_or(Error::OutOfRange {
      at,
      needed: N,
      len: self.vm.program.len(),
    })?;
    self.vm.ip += N;
    Ok(bytes)
  }

  fn emit(&mut self, event: Event) {
    self.vm.sink.emit(event);
  }

  fn run(&mut self) -> Result<(), Error> {
    while let Some(byte) = self.eat() {
      let at = self.vm.ip - 1;
      let flow = match Opcode::try_from(byte) {
        Ok(op) => {
          trace!(ip = at, ?op, "dispatch");
          match op {
            Opcode::PrintHelloWorld => print_hello_world(self),
            Opcode::Set => set(self)?,
            Opcode::Add => add(self)?,
            Opcode::PrintFloat => print_float(self)?,
            Opcode::PrintFloatNoStack => print_float_no_stack(self)?,
            Opcode::Wait => wait(self)?,
            Opcode::Repeat => repeat(self),
          }
        }
        Err(byte) => unknown(self, at, byte)?,
      };
      if flow == Flow::Suspend {
        debug!(ip = self.vm.ip, wake = ?self.vm.wake, "suspended");
        break;
      }
    }
    Ok(())
  }
}

fn print_hello_world<S: Sink>(task: &mut Task<'_, S>) -> Flow {
  task.emit(Event::HelloWorld);
  Flow::Continue
}

// push(vv)
fn set<S: Sink>(task: &mut Task<'_, S>) -> Result<Flow, Error> {
  let [value] = task.eat_operand::<1>()?;
  task.vm.stack.push(value)?;
  task.emit(Event::Set { value });
  Ok(Flow::Continue)
}

// b ← pop; a ← pop; push(a + b)
fn add<S: Sink>(task: &mut Task<'_, S>) -> Result<Flow, Error> {
  task.vm.stack.require(2)?;
  let b = task.vm.stack.pop()?;
  let a = task.vm.stack.pop()?;
  let sum = a.wrapping_add(b);
  task.vm.stack.push(sum)?;
  task.emit(Event::Add { a, b, sum });
  Ok(Flow::Continue)
}

fn print_float<S: Sink>(task: &mut Task<'_, S>) -> Result<Flow, Error> {
  task.vm.stack.require(4)?;
  // the last byte pushed is the least significant
  let stack = &mut task.vm.stack;
  let encoded = [stack.pop()?, stack.pop()?, stack.pop()?, stack.pop()?];
  let value = f32::from_le_bytes(encoded);
  task.emit(Event::PrintFloat {
    value,
    source: FloatSource::Stack,
  });
  Ok(Flow::Continue)
}

fn print_float_no_stack<S: Sink>(task: &mut Task<'_, S>) -> Result<Flow, Error> {
  // stored in push order, so the first byte is the most significant
  let encoded = task.eat_operand::<4>()?;
  let value = f32::from_be_bytes(encoded);
  task.emit(Event::PrintFloat {
    value,
    source: FloatSource::Inline,
  });
  Ok(Flow::Continue)
}

// wake ← now + pop
fn wait<S: Sink>(task: &mut Task<'_, S>) -> Result<Flow, Error> {
  let amount = task.vm.stack.pop()?;
  task.vm.wake = Some(task.now + Time::from(amount));
  task.emit(Event::Wait { amount });
  Ok(Flow::Suspend)
}

// ip ← 0; stack ← []
fn repeat<S: Sink>(task: &mut Task<'_, S>) -> Flow {
  task.vm.ip = 0;
  task.vm.stack.clear();
  task.emit(Event::Repeat);
  Flow::Suspend
}

fn unknown<S: Sink>(task: &mut Task<'_, S>, ip: usize, byte: u8) -> Result<Flow, Error> {
  match task.vm.config.unknown_opcode {
    UnknownOpcodePolicy::Ignore => {
      warn!(ip, byte, "ignoring unknown opcode");
      Ok(Flow::Continue)
    }
    UnknownOpcodePolicy::Fatal => Err(Error::UnknownOpcode { ip, byte }),
  }
}
