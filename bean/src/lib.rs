//! A crate for reading and verifying [Java Class Files](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html).
//!
//! [`read_class`] takes the bytes of a class file and either gives back the complete [`TypeInformation`], with the
//! code of every method verified against the operand stack model, or the first violation found.

pub mod cursor;
pub mod error;
pub mod pool;
pub mod tree;
pub mod verifier;
pub mod version;
pub mod class_constants;
mod class_reader;
mod jstring;

mod macros;

use std::fmt::Debug;
use crate::error::bail_structure;

pub use crate::error::{BytecodeError, Error, InvalidOpcodeReason, PoolError, Result};
pub use crate::tree::class::TypeInformation;
pub use crate::version::{Release, Version};

/// Options for [`read_class_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
	/// Whether to keep the raw bytecode in [`Code::bytes`](crate::tree::code::Code::bytes).
	pub keep_code_bytes: bool,
}

/// Reads and verifies a single class file, with the default options.
pub fn read_class(data: &[u8]) -> Result<TypeInformation> {
	read_class_with(data, &ReadOptions::default())
}

/// Reads and verifies a single class file.
///
/// The data must hold exactly one class file, trailing bytes are an error.
pub fn read_class_with(data: &[u8], options: &ReadOptions) -> Result<TypeInformation> {
	class_reader::read(data, options)
}

trait OptionExpansion<T> {
	fn insert_if_empty(&mut self, value: T) -> Result<()>;
}

impl<T> OptionExpansion<T> for Option<T> where T: Debug {
	fn insert_if_empty(&mut self, value: T) -> Result<()> {
		if let Some(old) = self {
			bail_structure!("got {old:?} and {value:?}");
		} else {
			*self = Some(value);
			Ok(())
		}
	}
}
