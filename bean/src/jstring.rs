//! Decoding the modified utf8 format used by `CONSTANT_Utf8` entries.
//!
//! The format is using a 2x3-format for supplementary characters and stores `\0` using two bytes.
//!
//! See <https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.4.7> for the complete specification of
//! the string format used in the Java Virtual Machine Specification.

use java_string::JavaString;
use crate::error::{Error, Result};

/// Takes in a slice of data, tries to read it into a [`JavaString`].
///
/// Raw `0x00` bytes and the bytes `0xf0` to `0xff` never appear in the format.
pub(crate) fn from_modified_utf8(bytes: &[u8]) -> Result<JavaString> {
	if let Some(position) = bytes.iter().position(|&byte| byte == 0 || byte >= 0xf0) {
		return Err(Error::Encoding(format!("forbidden byte {:#04x} at {position} in {} bytes", bytes[position], bytes.len())));
	}
	JavaString::from_modified_utf8(bytes.to_vec())
		.map_err(|e| Error::Encoding(format!("{e} in {} bytes", bytes.len())))
}
