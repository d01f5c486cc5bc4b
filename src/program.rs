use crate::opcode::Opcode;

/// An immutable run of bytecode that the virtual machine executes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
  bytes: Vec<u8>,
}

impl Program {
  pub fn bytes(&self) -> &[u8] {
    &self.bytes
  }

  pub fn len(&self) -> usize {
    self.bytes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.bytes.is_empty()
  }

  /// The byte at `at`, if there is one
  #[inline]
  pub fn fetch(&self, at: usize) -> Option<u8> {
    self.bytes.get(at).copied()
  }

  /// Exactly `N` bytes starting at `at`, or nothing if the program is too
  /// short
  pub fn fetch_n<const N: usize>(&self, at: usize) -> Option<[u8; N]> {
    let end = at.checked_add(N)?;
    self.bytes.get(at..end)?.try_into().ok()
  }
}

impl From<Vec<u8>> for Program {
  fn from(bytes: Vec<u8>) -> Self {
    Self { bytes }
  }
}

impl From<&[u8]> for Program {
  fn from(bytes: &[u8]) -> Self {
    Self {
      bytes: bytes.to_vec(),
    }
  }
}

impl<const N: usize> From<[u8; N]> for Program {
  fn from(bytes: [u8; N]) -> Self {
    Self {
      bytes: bytes.to_vec(),
    }
  }
}

/// Builds programs from symbolic instructions so nobody has to remember the
/// numeric opcode table.
///
/// ```
/// use bytevm::program::Assembler;
///
/// let program = Assembler::new().set(2).set(1).add().wait().finish();
/// assert_eq!(program.bytes(), &[1, 2, 1, 1, 2, 5]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Assembler {
  bytes: Vec<u8>,
}

impl Assembler {
  pub fn new() -> Self {
    Self::default()
  }

  /// The demo program: greet, add 2 and 1, print 1234567.0 twice, wait on
  /// the sum, then start over.
  pub fn demo() -> Program {
    // 1234567.0 is 0x4996b438
    let float = [0x49, 0x96, 0xb4, 0x38];
    Self::new()
      .print_hello_world()
      .set(2)
      .set(1)
      .add()
      .set(float[0])
      .set(float[1])
      .set(float[2])
      .set(float[3])
      .print_float()
      .print_float_no_stack(float)
      .wait()
      .repeat()
      .finish()
  }

  fn op(mut self, op: Opcode) -> Self {
    self.bytes.push(op.into());
    self
  }

  pub fn print_hello_world(self) -> Self {
    self.op(Opcode::PrintHelloWorld)
  }

  pub fn set(self, value: u8) -> Self {
    self.op(Opcode::Set).raw(&[value])
  }

  pub fn add(self) -> Self {
    self.op(Opcode::Add)
  }

  pub fn print_float(self) -> Self {
    self.op(Opcode::PrintFloat)
  }

  /// Pushes the big-endian bytes of `value`, ready for `print_float`
  pub fn push_float(self, value: f32) -> Self {
    value
      .to_be_bytes()
      .into_iter()
      .fold(self, |asm, byte| asm.set(byte))
  }

  pub fn print_float_no_stack(self, encoded: [u8; 4]) -> Self {
    self.op(Opcode::PrintFloatNoStack).raw(&encoded)
  }

  pub fn wait(self) -> Self {
    self.op(Opcode::Wait)
  }

  pub fn repeat(self) -> Self {
    self.op(Opcode::Repeat)
  }

  /// Appends bytes verbatim, no questions asked
  pub fn raw(mut self, bytes: &[u8]) -> Self {
    self.bytes.extend_from_slice(bytes);
    self
  }

  pub fn finish(self) -> Program {
    self.bytes.into()
  }
}
