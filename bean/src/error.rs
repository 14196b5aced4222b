use thiserror::Error;
use crate::pool::Tag;
use crate::version::Version;

/// Builds an [`Error::Structure`] from a message or a format string.
macro_rules! structure_error {
	($msg:literal) => {
		$crate::error::Error::Structure(format!($msg))
	};
	($fmt:expr, $($arg:tt)*) => {
		$crate::error::Error::Structure(format!($fmt, $($arg)*))
	};
}
pub(crate) use structure_error;

/// Returns early with an [`Error::Structure`].
macro_rules! bail_structure {
	($($arg:tt)*) => {
		return Err($crate::error::structure_error!($($arg)*))
	};
}
pub(crate) use bail_structure;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while reading and verifying a class file.
///
/// Every variant is terminal for the class file being read: there is no partial result.
/// Context added while unwinding (which method, which attribute) is kept in [`Error::Context`],
/// use [`Error::root`] to get at the violation itself.
#[derive(Debug, Error)]
pub enum Error {
	/// The outer framing is wrong: bad magic, or a version we don't know how to read.
	#[error("malformed class file: {0}")]
	Container(String),

	/// The data ended before a read of `wanted` bytes at `offset` could be satisfied.
	#[error("unexpected end of data: wanted {wanted} bytes at offset {offset}")]
	Truncated {
		offset: usize,
		wanted: usize,
	},

	/// A constant pool entry is malformed, or a reference into the pool is wrong.
	#[error("constant pool entry #{index}: {kind}")]
	Pool {
		index: u16,
		kind: PoolError,
	},

	/// The class file is well-framed, but violates a structural rule: duplicate members,
	/// illegal access flag combinations, attributes at the wrong place, length mismatches.
	#[error("{0}")]
	Structure(String),

	/// The bytecode of a method failed verification at the instruction starting at `pc`.
	#[error("at bytecode offset {pc}: {kind}")]
	Bytecode {
		pc: u16,
		kind: BytecodeError,
	},

	/// A `CONSTANT_Utf8` entry is not valid modified utf8.
	#[error("invalid modified utf8: {0}")]
	Encoding(String),

	/// Wraps another error with information on where it happened.
	#[error("{context}")]
	Context {
		context: String,
		#[source]
		source: Box<Error>,
	},
}

impl Error {
	/// Returns the innermost error, skipping all [`Error::Context`] layers.
	pub fn root(&self) -> &Error {
		let mut error = self;
		while let Error::Context { source, .. } = error {
			error = source;
		}
		error
	}

	/// Returns the kind of bytecode violation, if this error (after context) is one.
	pub fn bytecode(&self) -> Option<(u16, &BytecodeError)> {
		match self.root() {
			Error::Bytecode { pc, kind } => Some((*pc, kind)),
			_ => None,
		}
	}

	/// Returns the kind of constant pool violation, if this error (after context) is one.
	pub fn pool(&self) -> Option<(u16, &PoolError)> {
		match self.root() {
			Error::Pool { index, kind } => Some((*index, kind)),
			_ => None,
		}
	}

	pub(crate) fn pool_error(index: u16, kind: PoolError) -> Error {
		Error::Pool { index, kind }
	}
}

/// Adds context to errors, the way `anyhow` does it, but keeping the closed [`Error`] type.
pub(crate) trait ResultContext<T> {
	fn with_context<C, F>(self, f: F) -> Result<T>
	where
		C: std::fmt::Display,
		F: FnOnce() -> C;
}

impl<T> ResultContext<T> for Result<T> {
	fn with_context<C, F>(self, f: F) -> Result<T>
	where
		C: std::fmt::Display,
		F: FnOnce() -> C,
	{
		self.map_err(|source| Error::Context {
			context: f().to_string(),
			source: Box::new(source),
		})
	}
}

/// Violations of the constant pool rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
	#[error("index is out of range for a constant pool with count {count}")]
	OutOfRange {
		count: u16,
	},
	#[error("index zero doesn't refer to an entry")]
	ZeroIndex,
	#[error("expected {expected}, got {actual}")]
	WrongTag {
		expected: &'static str,
		actual: Tag,
	},
	#[error("entry refers to itself")]
	SelfReference,
	#[error("index is already occupied")]
	DuplicateInsertion,
	#[error("the second slot of this {tag} entry is {reason}")]
	WideSuccessor {
		tag: Tag,
		reason: &'static str,
	},
	#[error("index refers to the unusable second slot of a Long or Double entry")]
	PhantomSlot,
	#[error("index was never filled")]
	Vacant,
	#[error("unknown constant pool tag {0}")]
	UnknownTag(u8),
	#[error("{tag} entries are not allowed before class file version {required}")]
	TagNotAllowed {
		tag: Tag,
		required: Version,
	},
	#[error("bootstrap method index {index} is out of range, there are {count} bootstrap methods")]
	BootstrapIndex {
		index: u16,
		count: u16,
	},
	#[error("{0}")]
	InvalidContent(String),
}

/// Violations found while decoding and verifying bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BytecodeError {
	#[error("operand stack underflow")]
	Underflow,
	#[error("operand stack overflow, max_stack is {max_stack}")]
	Overflow {
		max_stack: u16,
	},
	#[error("type mismatch: expected {expected}, found {found}")]
	MismatchedType {
		expected: String,
		found: String,
	},
	#[error("invalid opcode {opcode:#04x}: {reason}")]
	InvalidOpcode {
		opcode: u8,
		reason: InvalidOpcodeReason,
	},
	#[error("not enough bytes left to decode the instruction")]
	NotEnoughBytes,
	#[error("did not read the correct number of bytes: expected {expected}, read {actual}")]
	WrongCodeLength {
		expected: u32,
		actual: u32,
	},
	#[error("{what} {target} is not the start of an instruction")]
	InvalidBranchTarget {
		what: &'static str,
		target: i64,
	},
	#[error("local variable {index} is out of range, max_locals is {max_locals}")]
	InvalidLocal {
		index: u32,
		max_locals: u16,
	},
	#[error("{what} {pc} exceeds code length {code_length}")]
	ExceedsCodeLength {
		what: &'static str,
		pc: u32,
		code_length: u16,
	},
	#[error("constant pool entry #{index}: {kind}")]
	Pool {
		index: u16,
		kind: PoolError,
	},
	#[error("{0}")]
	Malformed(String),
	#[error("internal invariant violated: {0}")]
	Internal(&'static str),
}

impl BytecodeError {
	pub(crate) fn mismatch(expected: impl std::fmt::Display, found: impl std::fmt::Display) -> BytecodeError {
		BytecodeError::MismatchedType {
			expected: expected.to_string(),
			found: found.to_string(),
		}
	}

	pub(crate) fn invalid_opcode(opcode: u8, reason: InvalidOpcodeReason) -> BytecodeError {
		BytecodeError::InvalidOpcode { opcode, reason }
	}

	pub(crate) fn at(self, pc: u16) -> Error {
		Error::Bytecode { pc, kind: self }
	}
}

impl From<Error> for BytecodeError {
	/// Turns errors of the pool or of the cursor into their bytecode counterpart.
	fn from(value: Error) -> Self {
		match value {
			Error::Truncated { .. } => BytecodeError::NotEnoughBytes,
			Error::Pool { index, kind } => BytecodeError::Pool { index, kind },
			Error::Bytecode { kind, .. } => kind,
			Error::Context { source, .. } => BytecodeError::from(*source),
			other => BytecodeError::Malformed(other.to_string()),
		}
	}
}

/// Why an opcode can't be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOpcodeReason {
	#[error("reserved opcode {0}")]
	Reserved(&'static str),
	#[error("unknown opcode")]
	Unknown,
	#[error("{0} is not yet supported")]
	NotYetSupported(&'static str),
	#[error("{mnemonic} is not allowed in class file version {version}")]
	NotInVersion {
		mnemonic: &'static str,
		version: Version,
	},
	#[error("{0}")]
	Malformed(String),
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::error::{structure_error, BytecodeError, Error, ResultContext};

	#[test]
	fn root_skips_context() {
		let result: Result<(), Error> = Err(BytecodeError::Underflow.at(3));
		let error = result
			.with_context(|| "while verifying code")
			.with_context(|| "while reading method foo ()V")
			.unwrap_err();

		assert_eq!(error.to_string(), "while reading method foo ()V");
		assert_eq!(error.bytecode(), Some((3, &BytecodeError::Underflow)));
		assert!(matches!(error.root(), Error::Bytecode { pc: 3, .. }));
	}

	#[test]
	fn truncation_inside_code() {
		let error = Error::Truncated { offset: 7, wanted: 2 };
		assert_eq!(BytecodeError::from(error), BytecodeError::NotEnoughBytes);
	}

	#[test]
	fn messages() {
		let error = BytecodeError::WrongCodeLength { expected: 10, actual: 9 }.at(8);
		assert_eq!(error.to_string(), "at bytecode offset 8: did not read the correct number of bytes: expected 10, read 9");

		let error = BytecodeError::ExceedsCodeLength { what: "line number start", pc: 4, code_length: 4 };
		assert_eq!(error.to_string(), "line number start 4 exceeds code length 4");
	}

	#[test]
	fn structure_messages_fill_in_values() {
		let count = 3;
		let error = structure_error!("interface {count} is listed twice");
		assert_eq!(error.to_string(), "interface 3 is listed twice");

		let error = structure_error!("range {}..{} is empty", 4, 4);
		assert_eq!(error.to_string(), "range 4..4 is empty");

		let error = structure_error!("no braces");
		assert_eq!(error.to_string(), "no braces");
	}
}
