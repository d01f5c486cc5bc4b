use std::path::PathBuf;
use std::process::ExitCode;

use bytevm::program::{Assembler, Program};
use bytevm::vm::{Config, Time, UnknownOpcodePolicy, Vm};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "bytevm")]
#[command(about = "Drive a bytecode program one simulated frame at a time")]
struct Cli {
  /// Raw program bytes to run (runs the built-in demo when omitted)
  program: Option<PathBuf>,

  /// Number of frames to simulate
  #[arg(long, default_value_t = 8)]
  frames: u32,

  /// Clock advance per frame
  #[arg(long, default_value_t = 1.0)]
  frame_time: Time,

  /// Clock value of the first frame
  #[arg(long, default_value_t = 0.0)]
  start_time: Time,

  /// Fault on unknown opcodes instead of skipping them
  #[arg(long)]
  strict: bool,
}

fn main() -> ExitCode {
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cli = Cli::parse();

  let program: Program = match &cli.program {
    Some(path) => match std::fs::read(path) {
      Ok(bytes) => bytes.into(),
      Err(e) => {
        error!("failed to read program {:?}: {}", path, e);
        return ExitCode::FAILURE;
      }
    },
    None => Assembler::demo(),
  };

  let unknown_opcode = if cli.strict {
    UnknownOpcodePolicy::Fatal
  } else {
    UnknownOpcodePolicy::Ignore
  };
  let mut vm = Vm::new().with_config(Config { unknown_opcode });
  vm.load(program);

  for frame in 0..cli.frames {
    let now = cli.start_time + Time::from(frame) * cli.frame_time;
    if let Err(e) = vm.tick(now) {
      error!(frame, now, "{}", e);
      return ExitCode::FAILURE;
    }
  }

  info!(ip = vm.ip(), stack = ?vm.stack(), wake = ?vm.wake_time(), "done");
  ExitCode::SUCCESS
}
