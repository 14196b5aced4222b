use java_string::JavaString;
use crate::tree::descriptor::FieldDescriptor;
use crate::tree::instruction::Instruction;
use crate::tree::names::ClassName;

/// The verified body of a method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
	pub max_stack: u16,
	pub max_locals: u16,
	pub code_length: u16,
	/// The raw bytecode, only kept if asked for with [`ReadOptions`](crate::ReadOptions).
	pub bytes: Option<Vec<u8>>,
	pub instructions: Vec<VerifiedInstruction>,
	pub exception_table: Vec<ExceptionHandler>,
	pub line_numbers: Vec<LineNumber>,
	pub local_variables: Vec<LocalVariable>,
	/// The frames of the `StackMapTable` (or `StackMap`) attribute, with absolute offsets.
	pub stack_map_frames: Vec<StackMapFrame>,
}

impl Code {
	/// Finds the instruction starting at `pc`.
	pub fn instruction_at(&self, pc: u16) -> Option<&VerifiedInstruction> {
		self.instructions.binary_search_by_key(&pc, |i| i.pc)
			.ok()
			.map(|index| &self.instructions[index])
	}
}

/// How an instruction changed the operand stack, in slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackEffect {
	/// The instruction neither popped nor pushed anything.
	Unchanged,
	Changed {
		popped: u16,
		pushed: u16,
	},
}

/// An instruction that passed verification, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedInstruction {
	pub pc: u16,
	/// The source line from the `LineNumberTable`, if there is one covering this instruction.
	pub line: Option<u16>,
	pub instruction: Instruction,
	pub effect: StackEffect,
	/// The operand stack depth in slots after this instruction.
	pub depth_after: u16,
}

/// An entry of the exception table. The range `start..end` is protected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
	pub start: u16,
	pub end: u16,
	pub handler: u16,
	/// `None` catches everything, as used for `finally`.
	pub catch_type: Option<ClassName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
	pub start: u16,
	pub line: u16,
}

/// A local variable, from the `LocalVariableTable` and `LocalVariableTypeTable` attributes.
///
/// The variable is live for `start..start + length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
	pub start: u16,
	pub length: u16,
	pub name: JavaString,
	pub index: u16,
	pub descriptor: Option<FieldDescriptor>,
	pub signature: Option<JavaString>,
}

impl LocalVariable {
	pub fn end(&self) -> u32 {
		self.start as u32 + self.length as u32
	}

	pub fn is_live_at(&self, pc: u16) -> bool {
		self.start <= pc && (pc as u32) < self.end()
	}
}

/// The types of the `verification_type_info` structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationType {
	Top,
	Integer,
	Float,
	Long,
	Double,
	Null,
	UninitializedThis,
	Object(ClassName),
	/// An object created by the `new` instruction at the offset.
	Uninitialized(u16),
}

impl VerificationType {
	pub fn is_wide(&self) -> bool {
		matches!(self, VerificationType::Long | VerificationType::Double)
	}
}

/// A stack map frame, with the compressed forms already applied to the previous frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackMapFrame {
	pub offset: u16,
	pub locals: Vec<VerificationType>,
	pub stack: Vec<VerificationType>,
}
