use crate::cursor::{ByteCursor, ClassRead};
use crate::error::{BytecodeError, InvalidOpcodeReason};
use crate::pool::ConstantPool;
use crate::tree::access::MethodAccess;
use crate::tree::code::LocalVariable;
use crate::tree::descriptor::MethodDescriptor;
use crate::tree::names::{ClassName, MethodName};
use crate::verifier::locals::Locals;
use crate::verifier::stack::{Origin, OperandStack, Provenance};
use crate::version::Version;

/// The method whose code is verified.
#[derive(Debug, Clone)]
pub(crate) struct MethodContext {
	pub(crate) version: Version,
	pub(crate) class: ClassName,
	pub(crate) name: MethodName,
	pub(crate) descriptor: MethodDescriptor,
	pub(crate) is_static: bool,
	/// Whether floating point arithmetic is FP-strict: from `ACC_STRICT`, and always since version 61.
	pub(crate) strict: bool,
}

impl MethodContext {
	pub(crate) fn new(version: Version, class: ClassName, name: MethodName, descriptor: MethodDescriptor, access: &MethodAccess) -> MethodContext {
		MethodContext {
			version,
			class,
			name,
			descriptor,
			is_static: access.is_static,
			strict: access.is_strict || version.at_least(61),
		}
	}
}

/// Everything an opcode verifier sees while checking a single instruction.
///
/// The reader is positioned after the opcode byte. Its position is relative to the start of the code,
/// so it is always the offset of the next byte of the instruction.
pub(crate) struct InstructionContext<'a, 'c> {
	pub(crate) pc: u16,
	pub(crate) opcode: u8,
	pub(crate) code_length: u16,
	pub(crate) reader: &'a mut ByteCursor<'c>,
	pub(crate) stack: &'a mut OperandStack,
	pub(crate) locals: &'a mut Locals,
	pub(crate) pool: &'a ConstantPool,
	pub(crate) method: &'a MethodContext,
	pub(crate) bindings: &'a [LocalVariable],
}

impl InstructionContext<'_, '_> {
	pub(crate) fn provenance(&self, origin: Origin) -> Provenance {
		Provenance::new(self.pc, origin)
	}

	pub(crate) fn version(&self) -> Version {
		self.method.version
	}

	/// Checks that an instruction of `length` bytes starting at this pc ends within the code.
	pub(crate) fn require_length(&self, length: u64) -> Result<(), BytecodeError> {
		let end = self.pc as u64 + length;
		if end > self.code_length as u64 {
			return Err(BytecodeError::WrongCodeLength {
				expected: self.code_length as u32,
				actual: u32::try_from(end).unwrap_or(u32::MAX),
			});
		}
		Ok(())
	}

	/// The offset of the byte after what was read so far, the next pc once all operands are read.
	pub(crate) fn next_pc(&self) -> u16 {
		// the length is checked before reading operands, so this is at most code_length
		self.reader.position() as u16
	}

	/// Resolves a branch offset relative to this instruction.
	pub(crate) fn branch_target(&self, offset: i32) -> Result<u16, BytecodeError> {
		let target = self.pc as i64 + offset as i64;
		if target < 0 || target >= self.code_length as i64 {
			return Err(BytecodeError::InvalidBranchTarget { what: "branch target", target });
		}
		Ok(target as u16)
	}

	pub(crate) fn read_branch_i16(&mut self) -> Result<u16, BytecodeError> {
		let offset = self.reader.read_i16()?;
		self.branch_target(offset as i32)
	}

	pub(crate) fn read_branch_i32(&mut self) -> Result<u16, BytecodeError> {
		let offset = self.reader.read_i32()?;
		self.branch_target(offset)
	}

	pub(crate) fn malformed(&self, reason: impl Into<String>) -> BytecodeError {
		BytecodeError::invalid_opcode(self.opcode, InvalidOpcodeReason::Malformed(reason.into()))
	}

	pub(crate) fn not_in_version(&self, mnemonic: &'static str) -> BytecodeError {
		BytecodeError::invalid_opcode(self.opcode, InvalidOpcodeReason::NotInVersion { mnemonic, version: self.version() })
	}
}
