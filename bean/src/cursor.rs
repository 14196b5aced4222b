//! Reading big-endian values from a byte slice.

use crate::error::{bail_structure, Error, Result};

/// A forward-only reader over a byte slice.
///
/// Offsets reported in errors are relative to the start of the outermost slice, even for
/// cursors created with [`ByteCursor::take`].
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
	data: &'a [u8],
	position: usize,
	base: usize,
}

impl<'a> ByteCursor<'a> {
	pub fn new(data: &'a [u8]) -> ByteCursor<'a> {
		ByteCursor { data, position: 0, base: 0 }
	}

	/// The number of bytes left to read.
	pub fn remaining(&self) -> usize {
		self.data.len() - self.position
	}

	pub fn is_empty(&self) -> bool {
		self.remaining() == 0
	}

	/// Reads `n` bytes as a slice.
	pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
		if self.remaining() < n {
			return Err(Error::Truncated { offset: self.base + self.position, wanted: n });
		}
		let slice = &self.data[self.position..self.position + n];
		self.position += n;
		Ok(slice)
	}

	/// Splits off the next `n` bytes into their own cursor, advancing this one past them.
	pub fn take(&mut self, n: usize) -> Result<ByteCursor<'a>> {
		let base = self.base + self.position;
		let data = self.read_slice(n)?;
		Ok(ByteCursor { data, position: 0, base })
	}

	/// Checks that everything was read, naming `what` in the error.
	pub fn finish(&self, what: impl std::fmt::Display) -> Result<()> {
		if !self.is_empty() {
			bail_structure!("{what} has length {} but only {} bytes were read", self.data.len(), self.position);
		}
		Ok(())
	}
}

/// Convenience methods for reading the integer types of the class file format.
pub trait ClassRead {
	/// The number of bytes read so far.
	fn position(&self) -> usize;
	fn skip(&mut self, n: usize) -> Result<()>;
	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]>;

	fn read_u8(&mut self) -> Result<u8> {
		Ok(u8::from_be_bytes(self.read_n()?))
	}
	fn read_u16(&mut self) -> Result<u16> {
		Ok(u16::from_be_bytes(self.read_n()?))
	}
	fn read_u32(&mut self) -> Result<u32> {
		Ok(u32::from_be_bytes(self.read_n()?))
	}
	fn read_u64(&mut self) -> Result<u64> {
		Ok(u64::from_be_bytes(self.read_n()?))
	}
	fn read_i8(&mut self) -> Result<i8> {
		Ok(i8::from_be_bytes(self.read_n()?))
	}
	fn read_i16(&mut self) -> Result<i16> {
		Ok(i16::from_be_bytes(self.read_n()?))
	}
	fn read_i32(&mut self) -> Result<i32> {
		Ok(i32::from_be_bytes(self.read_n()?))
	}
	fn read_i64(&mut self) -> Result<i64> {
		Ok(i64::from_be_bytes(self.read_n()?))
	}

	fn read_u8_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u8()? as usize)
	}
	fn read_u16_as_usize(&mut self) -> Result<usize> {
		Ok(self.read_u16()? as usize)
	}

	fn read_vec<T, S, E>(&mut self, get_size: S, mut get_element: E) -> Result<Vec<T>>
	where
		S: FnOnce(&mut Self) -> Result<usize>,
		E: FnMut(&mut Self) -> Result<T>,
	{
		let size = get_size(self)?;
		let mut vec = Vec::with_capacity(size);
		for _ in 0..size {
			vec.push(get_element(self)?);
		}
		Ok(vec)
	}
}

impl ClassRead for ByteCursor<'_> {
	fn position(&self) -> usize {
		self.position
	}

	fn skip(&mut self, n: usize) -> Result<()> {
		self.read_slice(n).map(|_| ())
	}

	fn read_n<const N: usize>(&mut self) -> Result<[u8; N]> {
		let slice = self.read_slice(N)?;
		let mut buf = [0u8; N];
		buf.copy_from_slice(slice);
		Ok(buf)
	}
}
