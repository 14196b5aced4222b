//! Decoding of the `StackMapTable` attribute, and of the older `StackMap` attribute of CLDC.
//!
//! The compressed frame types of `StackMapTable` are expanded against the previous frame, so every
//! [`StackMapFrame`] carries its full locals and stack, and an absolute offset.

use crate::class_constants::verification_type;
use crate::cursor::{ByteCursor, ClassRead};
use crate::error::{bail_structure, BytecodeError, Result};
use crate::pool::ConstantPool;
use crate::tree::code::{StackMapFrame, VerificationType};
use crate::tree::descriptor::{BaseType, ComputationalCategory, PrimitiveKind};
use crate::tree::names::ClassName;
use crate::verifier::context::MethodContext;

/// The locals of the implicit frame at offset `0`, as given by the method descriptor.
pub(crate) fn initial_locals(method: &MethodContext) -> Vec<VerificationType> {
	let mut locals = Vec::with_capacity(method.descriptor.parameters().len() + 1);
	if !method.is_static {
		locals.push(if method.name.is_init() {
			VerificationType::UninitializedThis
		} else {
			VerificationType::Object(method.class.clone())
		});
	}
	for parameter in method.descriptor.parameters() {
		locals.push(match parameter.base() {
			_ if parameter.is_array() => match ClassName::try_from(parameter.descriptor()) {
				// array classes are named by their descriptor
				Ok(class) => VerificationType::Object(class),
				Err(_) => VerificationType::Top,
			},
			BaseType::Primitive(PrimitiveKind::Float) => VerificationType::Float,
			BaseType::Primitive(PrimitiveKind::Long) => VerificationType::Long,
			BaseType::Primitive(PrimitiveKind::Double) => VerificationType::Double,
			BaseType::Primitive(_) => VerificationType::Integer,
			BaseType::Reference(class) => VerificationType::Object(class.clone()),
			BaseType::Void => VerificationType::Top,
		});
	}
	locals
}

fn read_verification_type(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<VerificationType> {
	Ok(match reader.read_u8()? {
		verification_type::TOP => VerificationType::Top,
		verification_type::INTEGER => VerificationType::Integer,
		verification_type::FLOAT => VerificationType::Float,
		verification_type::DOUBLE => VerificationType::Double,
		verification_type::LONG => VerificationType::Long,
		verification_type::NULL => VerificationType::Null,
		verification_type::UNINITIALIZED_THIS => VerificationType::UninitializedThis,
		verification_type::OBJECT => VerificationType::Object(pool.get_class(reader.read_u16()?)?),
		verification_type::UNINITIALIZED => VerificationType::Uninitialized(reader.read_u16()?),
		tag => bail_structure!("unknown verification_type_info tag {tag}"),
	})
}

fn read_types(reader: &mut ByteCursor, pool: &ConstantPool, count: usize) -> Result<Vec<VerificationType>> {
	reader.read_vec(|_| Ok(count), |r| read_verification_type(r, pool))
}

fn check_offset(offset: u32, code_length: u16) -> Result<u16> {
	if offset >= code_length as u32 {
		let pc = offset.min(u16::MAX as u32) as u16;
		return Err(BytecodeError::ExceedsCodeLength { what: "stack map frame offset", pc: offset, code_length }.at(pc));
	}
	Ok(offset as u16)
}

/// Reads the contents of a `StackMapTable` attribute.
pub(crate) fn read_stack_map_table(
	reader: &mut ByteCursor,
	pool: &ConstantPool,
	initial_locals: Vec<VerificationType>,
	code_length: u16,
) -> Result<Vec<StackMapFrame>> {
	let number_of_entries = reader.read_u16_as_usize()?;
	let mut frames = Vec::with_capacity(number_of_entries);

	let mut locals = initial_locals;
	let mut offset = 0u32;
	for i in 0..number_of_entries {
		let frame_type = reader.read_u8()?;
		let (offset_delta, stack) = match frame_type {
			0..=63 => (frame_type as u16, Vec::new()),
			64..=127 => ((frame_type - 64) as u16, read_types(reader, pool, 1)?),
			128..=246 => bail_structure!("unknown stack map frame type {frame_type}"),
			247 => {
				let offset_delta = reader.read_u16()?;
				(offset_delta, read_types(reader, pool, 1)?)
			},
			248..=250 => {
				let offset_delta = reader.read_u16()?;
				let k = (251 - frame_type) as usize;
				if k > locals.len() {
					bail_structure!("chop frame removes {k} locals, but there are only {}", locals.len());
				}
				locals.truncate(locals.len() - k);
				(offset_delta, Vec::new())
			},
			251 => (reader.read_u16()?, Vec::new()),
			252..=254 => {
				let offset_delta = reader.read_u16()?;
				let count = (frame_type - 251) as usize;
				locals.extend(read_types(reader, pool, count)?);
				(offset_delta, Vec::new())
			},
			255 => {
				let offset_delta = reader.read_u16()?;
				let count = reader.read_u16_as_usize()?;
				locals = read_types(reader, pool, count)?;
				let count = reader.read_u16_as_usize()?;
				(offset_delta, read_types(reader, pool, count)?)
			},
		};

		// frames after the first one are at least one byte apart, so that no two frames share an offset
		offset += offset_delta as u32 + if i == 0 { 0 } else { 1 };
		let offset = check_offset(offset, code_length)?;

		frames.push(StackMapFrame { offset, locals: locals.clone(), stack });
	}
	Ok(frames)
}

/// Reads the contents of a `StackMap` attribute: full frames at absolute offsets, in any order.
pub(crate) fn read_stack_map(reader: &mut ByteCursor, pool: &ConstantPool, code_length: u16) -> Result<Vec<StackMapFrame>> {
	let mut frames = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| {
			let offset = check_offset(r.read_u16()? as u32, code_length)?;
			let count = r.read_u16_as_usize()?;
			let locals = read_types(r, pool, count)?;
			let count = r.read_u16_as_usize()?;
			let stack = read_types(r, pool, count)?;
			Ok(StackMapFrame { offset, locals, stack })
		},
	)?;
	frames.sort_by_key(|frame| frame.offset);
	for pair in frames.windows(2) {
		if pair[0].offset == pair[1].offset {
			bail_structure!("two StackMap frames at offset {}", pair[0].offset);
		}
	}
	Ok(frames)
}

/// The categories of the stack of a frame, bottom first.
pub(crate) fn stack_shape(frame: &StackMapFrame) -> Vec<ComputationalCategory> {
	frame.stack.iter().map(|verification_type| match verification_type {
		VerificationType::Integer => ComputationalCategory::Int,
		VerificationType::Float => ComputationalCategory::Float,
		VerificationType::Long => ComputationalCategory::Long,
		VerificationType::Double => ComputationalCategory::Double,
		_ => ComputationalCategory::Reference,
	}).collect()
}
