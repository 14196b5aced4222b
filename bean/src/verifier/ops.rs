//! The checks of the instruction families. The entries of the opcode table call into these with
//! what their opcode fixes.

use crate::class_constants::{array_type, opcode};
use crate::cursor::ClassRead;
use crate::error::{BytecodeError, PoolError};
use crate::pool::{InterfaceMethodRef, Loadable, Tag};
use crate::tree::descriptor::{BaseType, ComputationalCategory, InternalTypeName, PrimitiveKind, SlotCategory};
use crate::tree::field::FieldRef;
use crate::tree::instruction::{ArrayKind, Condition, Constant, Instruction, InvokeKind, NumericKind, ValueKind};
use crate::tree::method::MethodRef;
use crate::tree::names::ClassName;
use crate::verifier::context::InstructionContext;
use crate::verifier::locals::check_binding;
use crate::verifier::stack::{Origin, StackItem};

pub(crate) type Verified = Result<Instruction, BytecodeError>;

/// The kinds of the typed load, store and return instructions, in opcode order.
pub(crate) const VALUE_KINDS: [ValueKind; 5] = [ValueKind::Int, ValueKind::Long, ValueKind::Float, ValueKind::Double, ValueKind::Reference];

fn known_class(name: &'static str) -> Result<InternalTypeName, BytecodeError> {
	ClassName::try_from(name)
		.map(InternalTypeName::reference)
		.map_err(|_| BytecodeError::Internal("a well known class name failed to parse"))
}

pub(crate) fn nop(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	ctx.stack.unchanged()?;
	Ok(Instruction::Nop)
}

pub(crate) fn constant(ctx: &mut InstructionContext<'_, '_>, constant: Constant) -> Verified {
	let provenance = ctx.provenance(Origin::Constant);
	let item = match constant {
		Constant::Null => StackItem::reference(provenance, None),
		Constant::Int(_) => StackItem::numeric(ComputationalCategory::Int, provenance),
		Constant::Long(_) => StackItem::numeric(ComputationalCategory::Long, provenance),
		Constant::Float(_) => StackItem::numeric(ComputationalCategory::Float, provenance),
		Constant::Double(_) => StackItem::numeric(ComputationalCategory::Double, provenance),
	};
	ctx.stack.push(item)?;
	Ok(Instruction::Constant(constant))
}

fn require_version(ctx: &InstructionContext<'_, '_>, major: u16, what: &str) -> Result<(), BytecodeError> {
	if !ctx.version().at_least(major) {
		return Err(ctx.malformed(format!("loading {what} needs class file version {major}, this is {}", ctx.version())));
	}
	Ok(())
}

/// `ldc`, `ldc_w` and, with `wide`, `ldc2_w`.
pub(crate) fn load_constant(ctx: &mut InstructionContext<'_, '_>, index: u16, wide: bool) -> Verified {
	let constant: Loadable = ctx.pool.resolve(index)?;
	let provenance = ctx.provenance(Origin::Constant);
	let item = match &constant {
		Loadable::Integer(_) => StackItem::numeric(ComputationalCategory::Int, provenance),
		Loadable::Float(_) => StackItem::numeric(ComputationalCategory::Float, provenance),
		Loadable::Long(_) => StackItem::numeric(ComputationalCategory::Long, provenance),
		Loadable::Double(_) => StackItem::numeric(ComputationalCategory::Double, provenance),
		Loadable::String(_) => StackItem::reference(provenance, Some(known_class("java/lang/String")?)),
		Loadable::Class(_) => {
			require_version(ctx, 49, "a Class constant")?;
			StackItem::reference(provenance, Some(known_class("java/lang/Class")?))
		},
		Loadable::MethodHandle(_) => {
			require_version(ctx, 51, "a MethodHandle constant")?;
			StackItem::reference(provenance, Some(known_class("java/lang/invoke/MethodHandle")?))
		},
		Loadable::MethodType(_) => {
			require_version(ctx, 51, "a MethodType constant")?;
			StackItem::reference(provenance, Some(known_class("java/lang/invoke/MethodType")?))
		},
		Loadable::Dynamic(dynamic) => StackItem::of_type(dynamic.descriptor.field_type(), provenance)?,
	};

	if wide != (item.slots() == SlotCategory::Two) {
		let expected = if wide { "a long or double constant" } else { "a category 1 constant" };
		return Err(BytecodeError::mismatch(expected, &item));
	}
	ctx.stack.push(item)?;
	Ok(Instruction::Ldc(constant))
}

fn bound_type(ctx: &InstructionContext<'_, '_>, index: u16) -> Option<InternalTypeName> {
	ctx.bindings.iter()
		.filter(|binding| binding.index == index && binding.is_live_at(ctx.pc))
		.find_map(|binding| binding.descriptor.as_ref())
		.map(|descriptor| descriptor.field_type().clone())
}

pub(crate) fn load(ctx: &mut InstructionContext<'_, '_>, kind: ValueKind, index: u16) -> Verified {
	let category = kind.category();
	ctx.locals.load(index, category)?;
	check_binding(ctx.bindings, ctx.pc, index, category)?;

	let provenance = ctx.provenance(Origin::Local(index));
	let item = if kind == ValueKind::Reference {
		StackItem::reference(provenance, bound_type(ctx, index))
	} else {
		StackItem::numeric(category, provenance)
	};
	ctx.stack.push(item)?;
	Ok(Instruction::Load { kind, index })
}

/// Stores check the `LocalVariableTable` at the next instruction, where the variable starts to be live.
pub(crate) fn store(ctx: &mut InstructionContext<'_, '_>, kind: ValueKind, index: u16) -> Verified {
	let stored = if kind == ValueKind::Reference {
		// astore also stores the return addresses of jsr
		let top = ctx.stack.peek()?;
		if !matches!(top, StackItem::Reference { .. } | StackItem::ReturnAddress { .. }) {
			return Err(BytecodeError::mismatch("reference or returnAddress", top));
		}
		ctx.stack.pop()?
	} else {
		ctx.stack.pop_numeric(kind.category())?
	};

	let category = stored.category();
	ctx.locals.store(index, category)?;
	if category != ComputationalCategory::ReturnAddress {
		check_binding(ctx.bindings, ctx.next_pc(), index, category)?;
	}
	Ok(Instruction::Store { kind, index })
}

fn element_matches(kind: ArrayKind, element: &InternalTypeName) -> bool {
	if element.is_array() {
		return kind == ArrayKind::Reference;
	}
	match element.base() {
		BaseType::Void => false,
		BaseType::Reference(_) => kind == ArrayKind::Reference,
		BaseType::Primitive(primitive) => matches!((kind, primitive),
			(ArrayKind::Int, PrimitiveKind::Int) |
			(ArrayKind::Long, PrimitiveKind::Long) |
			(ArrayKind::Float, PrimitiveKind::Float) |
			(ArrayKind::Double, PrimitiveKind::Double) |
			(ArrayKind::ByteOrBoolean, PrimitiveKind::Byte | PrimitiveKind::Boolean) |
			(ArrayKind::Char, PrimitiveKind::Char) |
			(ArrayKind::Short, PrimitiveKind::Short)
		),
	}
}

/// Checks the array reference, if its type is known, and returns the element type.
fn array_element(array: &StackItem, kind: ArrayKind) -> Result<Option<InternalTypeName>, BytecodeError> {
	let StackItem::Reference { class: Some(array_type), .. } = array else {
		return Ok(None);
	};
	match array_type.component() {
		Some(element) if element_matches(kind, &element) => Ok(Some(element)),
		_ => Err(BytecodeError::mismatch(format!("an array for {kind:?} elements"), array)),
	}
}

pub(crate) fn array_load(ctx: &mut InstructionContext<'_, '_>, kind: ArrayKind) -> Verified {
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	let array = ctx.stack.pop_reference()?;
	let element = array_element(&array, kind)?;

	let provenance = ctx.provenance(Origin::ArrayElement);
	let item = if kind == ArrayKind::Reference {
		StackItem::reference(provenance, element)
	} else {
		StackItem::numeric(kind.category(), provenance)
	};
	ctx.stack.push(item)?;
	Ok(Instruction::ArrayLoad(kind))
}

pub(crate) fn array_store(ctx: &mut InstructionContext<'_, '_>, kind: ArrayKind) -> Verified {
	ctx.stack.pop_value(kind.category())?;
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	let array = ctx.stack.pop_reference()?;
	array_element(&array, kind)?;
	Ok(Instruction::ArrayStore(kind))
}

fn push_computed(ctx: &mut InstructionContext<'_, '_>, category: ComputationalCategory) -> Result<(), BytecodeError> {
	let provenance = ctx.provenance(Origin::Computation);
	ctx.stack.push(StackItem::numeric(category, provenance))
}

/// Pops two values of the kind, pushes one.
pub(crate) fn binary(ctx: &mut InstructionContext<'_, '_>, kind: NumericKind) -> Result<(), BytecodeError> {
	ctx.stack.pop_numeric(kind.category())?;
	ctx.stack.pop_numeric(kind.category())?;
	push_computed(ctx, kind.category())
}

pub(crate) fn is_strict(ctx: &InstructionContext<'_, '_>, kind: NumericKind) -> bool {
	kind.is_floating_point() && ctx.method.strict
}

pub(crate) fn negate(ctx: &mut InstructionContext<'_, '_>, kind: NumericKind) -> Verified {
	ctx.stack.pop_numeric(kind.category())?;
	push_computed(ctx, kind.category())?;
	Ok(Instruction::Negate { kind, strict: is_strict(ctx, kind) })
}

/// The shift distance is always an `int`.
pub(crate) fn shift(ctx: &mut InstructionContext<'_, '_>, kind: NumericKind) -> Result<(), BytecodeError> {
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	ctx.stack.pop_numeric(kind.category())?;
	push_computed(ctx, kind.category())
}

pub(crate) fn increment(ctx: &mut InstructionContext<'_, '_>, index: u16, delta: i16) -> Verified {
	ctx.locals.load(index, ComputationalCategory::Int)?;
	check_binding(ctx.bindings, ctx.pc, index, ComputationalCategory::Int)?;
	ctx.stack.unchanged()?;
	Ok(Instruction::Increment { index, delta })
}

pub(crate) fn convert(ctx: &mut InstructionContext<'_, '_>, from: NumericKind, to: NumericKind) -> Verified {
	ctx.stack.pop_numeric(from.category())?;
	push_computed(ctx, to.category())?;
	let strict = is_strict(ctx, from) || is_strict(ctx, to);
	Ok(Instruction::Convert { from, to, strict })
}

pub(crate) fn truncate(ctx: &mut InstructionContext<'_, '_>, to: PrimitiveKind) -> Verified {
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	push_computed(ctx, ComputationalCategory::Int)?;
	Ok(Instruction::Truncate(to))
}

/// `lcmp`, `fcmp<op>` and `dcmp<op>` all push an `int`.
pub(crate) fn compare(ctx: &mut InstructionContext<'_, '_>, kind: NumericKind) -> Result<(), BytecodeError> {
	ctx.stack.pop_numeric(kind.category())?;
	ctx.stack.pop_numeric(kind.category())?;
	push_computed(ctx, ComputationalCategory::Int)
}

pub(crate) fn if_zero(ctx: &mut InstructionContext<'_, '_>, condition: Condition) -> Verified {
	let target = ctx.read_branch_i16()?;
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	Ok(Instruction::If { condition, target })
}

pub(crate) fn if_int_compare(ctx: &mut InstructionContext<'_, '_>, condition: Condition) -> Verified {
	let target = ctx.read_branch_i16()?;
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	Ok(Instruction::IfIntCompare { condition, target })
}

pub(crate) fn if_reference_compare(ctx: &mut InstructionContext<'_, '_>, equal: bool) -> Verified {
	let target = ctx.read_branch_i16()?;
	ctx.stack.pop_reference()?;
	ctx.stack.pop_reference()?;
	Ok(Instruction::IfReferenceCompare { equal, target })
}

pub(crate) fn if_null(ctx: &mut InstructionContext<'_, '_>, null: bool) -> Verified {
	let target = ctx.read_branch_i16()?;
	ctx.stack.pop_reference()?;
	Ok(Instruction::IfNull { null, target })
}

pub(crate) fn goto(ctx: &mut InstructionContext<'_, '_>, wide: bool) -> Verified {
	let target = if wide { ctx.read_branch_i32()? } else { ctx.read_branch_i16()? };
	ctx.stack.unchanged()?;
	Ok(Instruction::Goto { target })
}

/// Pushes the return address, the offset of the instruction after the `jsr`, for the subroutine to store.
pub(crate) fn jsr(ctx: &mut InstructionContext<'_, '_>, wide: bool) -> Verified {
	let target = if wide { ctx.read_branch_i32()? } else { ctx.read_branch_i16()? };
	let return_to = ctx.next_pc();
	ctx.stack.push(StackItem::ReturnAddress { target: return_to })?;
	Ok(Instruction::Jsr { target })
}

pub(crate) fn ret(ctx: &mut InstructionContext<'_, '_>, index: u16) -> Verified {
	ctx.locals.load(index, ComputationalCategory::ReturnAddress)?;
	ctx.stack.unchanged()?;
	Ok(Instruction::Ret { index })
}

/// The number of padding bytes after the opcode of a switch, so that its operands start at a multiple of four.
fn switch_padding(pc: u16) -> u64 {
	3 - (pc as u64 % 4)
}

fn read_switch_padding(ctx: &mut InstructionContext<'_, '_>, padding: u64) -> Result<(), BytecodeError> {
	for _ in 0..padding {
		if ctx.reader.read_u8()? != 0 {
			return Err(ctx.malformed("switch padding bytes must be zero"));
		}
	}
	Ok(())
}

pub(crate) fn table_switch(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let padding = switch_padding(ctx.pc);
	ctx.require_length(1 + padding + 12)?;
	read_switch_padding(ctx, padding)?;

	let default = ctx.read_branch_i32()?;
	let low = ctx.reader.read_i32()?;
	let high = ctx.reader.read_i32()?;
	if low > high {
		return Err(ctx.malformed(format!("tableswitch has low {low} greater than high {high}")));
	}

	// checked before reading, so that a huge range doesn't allocate
	let count = (high as i64 - low as i64 + 1) as u64;
	ctx.require_length(1 + padding + 12 + 4 * count)?;

	let mut targets = Vec::with_capacity(count as usize);
	for _ in 0..count {
		targets.push(ctx.read_branch_i32()?);
	}

	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	Ok(Instruction::TableSwitch { default, low, high, targets })
}

pub(crate) fn lookup_switch(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let padding = switch_padding(ctx.pc);
	ctx.require_length(1 + padding + 8)?;
	read_switch_padding(ctx, padding)?;

	let default = ctx.read_branch_i32()?;
	let npairs = ctx.reader.read_i32()?;
	if npairs < 0 {
		return Err(ctx.malformed(format!("lookupswitch has a negative number of pairs {npairs}")));
	}
	ctx.require_length(1 + padding + 8 + 8 * npairs as u64)?;

	let mut pairs: Vec<(i32, u16)> = Vec::with_capacity(npairs as usize);
	for _ in 0..npairs {
		let key = ctx.reader.read_i32()?;
		let target = ctx.read_branch_i32()?;
		if let Some(&(previous, _)) = pairs.last() {
			if key <= previous {
				return Err(ctx.malformed(format!("lookupswitch keys must be increasing, got {key} after {previous}")));
			}
		}
		pairs.push((key, target));
	}

	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	Ok(Instruction::LookupSwitch { default, pairs })
}

fn return_mnemonic(kind: Option<ValueKind>) -> &'static str {
	match kind {
		None => "return",
		Some(ValueKind::Int) => "ireturn",
		Some(ValueKind::Long) => "lreturn",
		Some(ValueKind::Float) => "freturn",
		Some(ValueKind::Double) => "dreturn",
		Some(ValueKind::Reference) => "areturn",
	}
}

pub(crate) fn return_value(ctx: &mut InstructionContext<'_, '_>, kind: Option<ValueKind>) -> Verified {
	let return_type = ctx.method.descriptor.return_type();
	match (kind, return_type.category()) {
		(None, None) => ctx.stack.unchanged()?,
		(Some(kind), Some(category)) if kind.category() == category => {
			ctx.stack.pop_value(category)?;
		},
		_ => return Err(BytecodeError::mismatch(
			format!("a return instruction for return type {return_type}"),
			return_mnemonic(kind),
		)),
	}
	Ok(Instruction::Return(kind))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FieldInstruction {
	GetStatic,
	PutStatic,
	GetField,
	PutField,
}

pub(crate) fn field(ctx: &mut InstructionContext<'_, '_>, instruction: FieldInstruction) -> Verified {
	let index = ctx.reader.read_u16()?;
	let field: FieldRef = ctx.pool.resolve(index)?;
	let value_type = field.descriptor.field_type();
	let category = value_type.category()
		.ok_or(BytecodeError::Internal("field of type void"))?;
	let provenance = ctx.provenance(Origin::Field);

	Ok(match instruction {
		FieldInstruction::GetStatic => {
			ctx.stack.push(StackItem::of_type(value_type, provenance)?)?;
			Instruction::GetStatic(field)
		},
		FieldInstruction::PutStatic => {
			ctx.stack.pop_value(category)?;
			Instruction::PutStatic(field)
		},
		FieldInstruction::GetField => {
			ctx.stack.pop_reference()?;
			ctx.stack.push(StackItem::of_type(value_type, provenance)?)?;
			Instruction::GetField(field)
		},
		FieldInstruction::PutField => {
			ctx.stack.pop_value(category)?;
			ctx.stack.pop_reference()?;
			Instruction::PutField(field)
		},
	})
}

pub(crate) fn invoke(ctx: &mut InstructionContext<'_, '_>, kind: InvokeKind) -> Verified {
	let index = ctx.reader.read_u16()?;
	let method = if kind == InvokeKind::Interface {
		ctx.pool.resolve::<InterfaceMethodRef>(index)?.0
	} else {
		let method: MethodRef = ctx.pool.resolve(index)?;
		// invokespecial and invokestatic may call interface methods since version 52
		let interface_allowed = kind != InvokeKind::Virtual && ctx.version().at_least(52);
		if method.interface && !interface_allowed {
			return Err(BytecodeError::Pool {
				index,
				kind: PoolError::WrongTag { expected: "Methodref", actual: Tag::InterfaceMethodRef },
			});
		}
		method
	};

	if kind == InvokeKind::Interface {
		let count = ctx.reader.read_u8()?;
		let zero = ctx.reader.read_u8()?;
		let expected = method.descriptor.parameter_slots() + 1;
		if count as u16 != expected {
			return Err(ctx.malformed(format!("invokeinterface has count {count}, but {} needs {expected}", method.descriptor)));
		}
		if zero != 0 {
			return Err(ctx.malformed("the last operand byte of invokeinterface must be zero"));
		}
	}

	if method.name.is_init() && kind != InvokeKind::Special {
		return Err(ctx.malformed("only invokespecial can call `<init>`"));
	}

	for parameter in method.descriptor.parameters().iter().rev() {
		let category = parameter.category()
			.ok_or(BytecodeError::Internal("parameter of type void"))?;
		ctx.stack.pop_value(category)?;
	}
	if kind != InvokeKind::Static {
		ctx.stack.pop_reference()?;
	}

	let return_type = method.descriptor.return_type();
	if !return_type.is_void() {
		let provenance = ctx.provenance(Origin::Invocation);
		ctx.stack.push(StackItem::of_type(return_type, provenance)?)?;
	}
	Ok(Instruction::Invoke { kind, method })
}

fn read_class(ctx: &mut InstructionContext<'_, '_>) -> Result<ClassName, BytecodeError> {
	let index = ctx.reader.read_u16()?;
	Ok(ctx.pool.get_class(index)?)
}

pub(crate) fn new(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let class = read_class(ctx)?;
	if class.is_array() {
		return Err(ctx.malformed(format!("new can't create an instance of the array class {class}")));
	}
	let provenance = ctx.provenance(Origin::Allocation);
	ctx.stack.push(StackItem::reference(provenance, Some(class.as_type())))?;
	Ok(Instruction::New(class))
}

pub(crate) fn new_array(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let atype = ctx.reader.read_u8()?;
	let element = match atype {
		array_type::T_BOOLEAN => PrimitiveKind::Boolean,
		array_type::T_CHAR => PrimitiveKind::Char,
		array_type::T_FLOAT => PrimitiveKind::Float,
		array_type::T_DOUBLE => PrimitiveKind::Double,
		array_type::T_BYTE => PrimitiveKind::Byte,
		array_type::T_SHORT => PrimitiveKind::Short,
		array_type::T_INT => PrimitiveKind::Int,
		array_type::T_LONG => PrimitiveKind::Long,
		_ => return Err(ctx.malformed(format!("newarray has invalid array type {atype}"))),
	};
	let array_type = InternalTypeName::primitive(element).array_of()
		.map_err(|_| BytecodeError::Internal("a one dimensional array overflowed the dimensions"))?;

	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	let provenance = ctx.provenance(Origin::Allocation);
	ctx.stack.push(StackItem::reference(provenance, Some(array_type)))?;
	Ok(Instruction::NewArray(element))
}

pub(crate) fn a_new_array(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let class = read_class(ctx)?;
	let array_type = class.as_type().array_of()
		.map_err(|e| ctx.malformed(e.to_string()))?;

	ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	let provenance = ctx.provenance(Origin::Allocation);
	ctx.stack.push(StackItem::reference(provenance, Some(array_type)))?;
	Ok(Instruction::ANewArray(class))
}

pub(crate) fn multi_a_new_array(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let class = read_class(ctx)?;
	let dimensions = ctx.reader.read_u8()?;
	let array_type = class.as_type();
	if dimensions == 0 {
		return Err(ctx.malformed("multianewarray needs at least one dimension"));
	}
	if array_type.dimensions() < dimensions {
		return Err(ctx.malformed(format!(
			"multianewarray creates {dimensions} dimensions of {class}, which only has {}", array_type.dimensions()
		)));
	}

	for _ in 0..dimensions {
		ctx.stack.pop_numeric(ComputationalCategory::Int)?;
	}
	let provenance = ctx.provenance(Origin::Allocation);
	ctx.stack.push(StackItem::reference(provenance, Some(array_type)))?;
	Ok(Instruction::MultiANewArray { class, dimensions })
}

pub(crate) fn array_length(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let array = ctx.stack.pop_reference()?;
	if let StackItem::Reference { class: Some(class), .. } = &array {
		if !class.is_array() {
			return Err(BytecodeError::mismatch("an array", &array));
		}
	}
	push_computed(ctx, ComputationalCategory::Int)?;
	Ok(Instruction::ArrayLength)
}

pub(crate) fn check_cast(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let class = read_class(ctx)?;
	ctx.stack.pop_reference()?;
	let provenance = ctx.provenance(Origin::Computation);
	ctx.stack.push(StackItem::reference(provenance, Some(class.as_type())))?;
	Ok(Instruction::CheckCast(class))
}

pub(crate) fn instance_of(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	let class = read_class(ctx)?;
	ctx.stack.pop_reference()?;
	push_computed(ctx, ComputationalCategory::Int)?;
	Ok(Instruction::InstanceOf(class))
}

/// `wide` followed by a load, a store, `ret` or `iinc`, with a two byte index.
pub(crate) fn wide(ctx: &mut InstructionContext<'_, '_>) -> Verified {
	ctx.require_length(2)?;
	let modified = ctx.reader.read_u8()?;
	match modified {
		opcode::ILOAD..=opcode::ALOAD => {
			ctx.require_length(4)?;
			let index = ctx.reader.read_u16()?;
			load(ctx, VALUE_KINDS[(modified - opcode::ILOAD) as usize], index)
		},
		opcode::ISTORE..=opcode::ASTORE => {
			ctx.require_length(4)?;
			let index = ctx.reader.read_u16()?;
			store(ctx, VALUE_KINDS[(modified - opcode::ISTORE) as usize], index)
		},
		opcode::RET => {
			if ctx.version().at_least(51) {
				return Err(ctx.not_in_version("ret"));
			}
			ctx.require_length(4)?;
			let index = ctx.reader.read_u16()?;
			ret(ctx, index)
		},
		opcode::IINC => {
			ctx.require_length(6)?;
			let index = ctx.reader.read_u16()?;
			let delta = ctx.reader.read_i16()?;
			increment(ctx, index, delta)
		},
		_ => Err(ctx.malformed(format!("wide can't modify opcode {modified:#04x}"))),
	}
}
