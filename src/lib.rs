//! A tiny stack-based bytecode interpreter that can park itself on a timer.
//!
//! Programs are flat byte arrays of opcodes and their inline operands. The
//! host loads one with [`vm::Vm::load`] and then calls [`vm::Vm::tick`]
//! repeatedly (once per frame, say) with the current time. Each tick runs
//! instructions until a `WAIT` or `REPEAT` suspends the machine or the
//! program runs out.

pub mod event;
pub mod opcode;
pub mod program;
pub mod vm;
