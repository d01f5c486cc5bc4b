/// The instruction set. The discriminants are the wire encoding, so the order
/// here must never change.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
  /// Emits a fixed greeting.
  ///
  /// | Operands | Stack | Effect         |
  /// |----------|-------|----------------|
  /// | none     | none  | `Hello World`  |
  PrintHelloWorld = 0x0,

  /// Pushes the next program byte onto the stack.
  ///
  /// | Operands | Stack     | Effect        |
  /// |----------|-----------|---------------|
  /// | `vv`     | `→ vv`    | `push(vv)`    |
  Set = 0x1,

  /// Pops two bytes and pushes their wrapping sum. The most recently pushed
  /// byte is the right operand.
  ///
  /// | Operands | Stack          | Effect                   |
  /// |----------|----------------|--------------------------|
  /// | none     | `a b → a+b`    | `push((a + b) mod 256)`  |
  Add = 0x2,

  /// Pops four bytes and prints them as an `f32`.
  ///
  /// | Operands | Stack             | Effect                          |
  /// |----------|-------------------|---------------------------------|
  /// | none     | `b0 b1 b2 b3 →`   | `print(f32::be(b0, b1, b2, b3))`|
  PrintFloat = 0x3,

  /// Reads the four following program bytes and prints them as an `f32`,
  /// leaving the stack alone.
  ///
  /// | Operands       | Stack | Effect                          |
  /// |----------------|-------|---------------------------------|
  /// | `b0 b1 b2 b3`  | none  | `print(f32::be(b0, b1, b2, b3))`|
  PrintFloatNoStack = 0x4,

  /// Pops a byte and sleeps for that many time units. Suspends.
  ///
  /// | Operands | Stack   | Effect                  |
  /// |----------|---------|-------------------------|
  /// | none     | `n →`   | `wake ← now + n`        |
  Wait = 0x5,

  /// Jumps back to the start and wipes the stack. Suspends.
  ///
  /// | Operands | Stack   | Effect                  |
  /// |----------|---------|-------------------------|
  /// | none     | `… →`   | `ip ← 0; stack ← []`    |
  Repeat = 0x6,
}

impl Opcode {
  pub const ALL: [Opcode; 7] = [
    Self::PrintHelloWorld,
    Self::Set,
    Self::Add,
    Self::PrintFloat,
    Self::PrintFloatNoStack,
    Self::Wait,
    Self::Repeat,
  ];
}

/// Unknown bytes come back as the `Err` value so the caller can decide what
/// to do with them.
impl TryFrom<u8> for Opcode {
  type Error = u8;

  fn try_from(byte: u8) -> Result<Self, Self::Error> {
    match byte {
      0x0 => Ok(Self::PrintHelloWorld),
      0x1 => Ok(Self::Set),
      0x2 => Ok(Self::Add),
      0x3 => Ok(Self::PrintFloat),
      0x4 => Ok(Self::PrintFloatNoStack),
      0x5 => Ok(Self::Wait),
      0x6 => Ok(Self::Repeat),
      other => Err(other),
    }
  }
}

impl From<Opcode> for u8 {
  fn from(op: Opcode) -> Self {
    op as u8
  }
}
