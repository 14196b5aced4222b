//! Reading and verifying the `Code` attribute of a method.
//!
//! The bytecode is checked in a single linear pass. Branches record the state they leave at their target,
//! and instructions only reachable by a jump take their state from a stack map frame, from a recorded
//! branch, or from the exception table. Afterwards every offset the attributes mention is checked
//! against the instruction boundaries found.

use std::collections::{BTreeMap, BTreeSet};
use crate::class_constants::attribute;
use crate::class_reader::attributes::{read_attribute, skip_contents, Location};
use crate::cursor::{ByteCursor, ClassRead};
use crate::error::{bail_structure, BytecodeError, Error, Result, ResultContext};
use crate::OptionExpansion;
use crate::pool::ConstantPool;
use crate::tree::code::{Code, ExceptionHandler, LineNumber, LocalVariable, StackMapFrame, VerifiedInstruction};
use crate::tree::descriptor::{ComputationalCategory, FieldDescriptor, InternalTypeName};
use crate::tree::instruction::Instruction;
use crate::tree::names::ClassName;
use crate::verifier::context::{InstructionContext, MethodContext};
use crate::verifier::frames::{initial_locals, read_stack_map, read_stack_map_table, stack_shape};
use crate::verifier::locals::{LocalSlot, Locals};
use crate::verifier::stack::{describe_shape, OperandStack, Origin, Provenance, StackItem};
use crate::verifier::table::OpcodeTable;

/// An entry of the `LocalVariableTypeTable`, to be merged into the matching `LocalVariableTable` entry.
struct LocalVariableType {
	start: u16,
	length: u16,
	name: java_string::JavaString,
	index: u16,
	signature: java_string::JavaString,
}

fn read_exception_table(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<Vec<ExceptionHandler>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| {
			let start = r.read_u16()?;
			let end = r.read_u16()?;
			let handler = r.read_u16()?;
			let catch_type = pool.resolve_optional::<ClassName>(r.read_u16()?)
				.with_context(|| format!("catch type of exception handler at {handler}"))?;
			Ok(ExceptionHandler { start, end, handler, catch_type })
		},
	)
}

fn read_line_numbers(reader: &mut ByteCursor, table: &mut Vec<LineNumber>) -> Result<()> {
	let count = reader.read_u16_as_usize()?;
	table.reserve(count);
	for _ in 0..count {
		let start = reader.read_u16()?;
		let line = reader.read_u16()?;
		table.push(LineNumber { start, line });
	}
	Ok(())
}

fn read_local_variables(reader: &mut ByteCursor, pool: &ConstantPool, table: &mut Vec<LocalVariable>) -> Result<()> {
	let count = reader.read_u16_as_usize()?;
	table.reserve(count);
	for _ in 0..count {
		let start = reader.read_u16()?;
		let length = reader.read_u16()?;
		let name = pool.get_utf8(reader.read_u16()?)?.to_owned();
		let descriptor_index = reader.read_u16()?;
		let descriptor = FieldDescriptor::parse(pool.get_utf8(descriptor_index)?)
			.map_err(|kind| Error::pool_error(descriptor_index, kind))?;
		let index = reader.read_u16()?;
		table.push(LocalVariable { start, length, name, index, descriptor: Some(descriptor), signature: None });
	}
	Ok(())
}

fn read_local_variable_types(reader: &mut ByteCursor, pool: &ConstantPool, table: &mut Vec<LocalVariableType>) -> Result<()> {
	let count = reader.read_u16_as_usize()?;
	table.reserve(count);
	for _ in 0..count {
		let start = reader.read_u16()?;
		let length = reader.read_u16()?;
		let name = pool.get_utf8(reader.read_u16()?)?.to_owned();
		let signature = pool.get_utf8(reader.read_u16()?)?.to_owned();
		let index = reader.read_u16()?;
		table.push(LocalVariableType { start, length, name, index, signature });
	}
	Ok(())
}

/// Attaches the generic signatures to their variables. A signature without a matching variable becomes
/// a variable of its own, without descriptor.
fn merge_local_variable_types(variables: &mut Vec<LocalVariable>, types: Vec<LocalVariableType>) {
	for local_type in types {
		let matching = variables.iter_mut().find(|variable| {
			variable.start == local_type.start && variable.length == local_type.length &&
				variable.index == local_type.index && variable.name == local_type.name
		});
		match matching {
			Some(variable) => variable.signature = Some(local_type.signature),
			None => variables.push(LocalVariable {
				start: local_type.start,
				length: local_type.length,
				name: local_type.name,
				index: local_type.index,
				descriptor: None,
				signature: Some(local_type.signature),
			}),
		}
	}
}

/// The state a path brings to an instruction.
#[derive(Debug, Clone)]
struct FlowState {
	stack: Vec<StackItem>,
	locals: Locals,
}

/// The source line of each instruction: the entry with the greatest start at or before it.
struct LineLookup {
	sorted: Vec<LineNumber>,
}

impl LineLookup {
	fn new(line_numbers: &[LineNumber]) -> LineLookup {
		let mut sorted = line_numbers.to_vec();
		sorted.sort_by_key(|entry| entry.start);
		LineLookup { sorted }
	}

	fn line_at(&self, pc: u16) -> Option<u16> {
		let after = self.sorted.partition_point(|entry| entry.start <= pc);
		after.checked_sub(1).map(|index| self.sorted[index].line)
	}
}

fn shape_of(items: &[StackItem]) -> Vec<ComputationalCategory> {
	items.iter().map(StackItem::category).collect()
}

fn check_shape(expected: &[ComputationalCategory], found: &[ComputationalCategory]) -> Result<(), BytecodeError> {
	if expected != found {
		return Err(BytecodeError::mismatch(describe_shape(expected), describe_shape(found)));
	}
	Ok(())
}

fn frame_state(frame: &StackMapFrame, max_locals: u16) -> Result<FlowState, BytecodeError> {
	let stack = frame.stack.iter()
		.map(|verification_type| StackItem::from_verification_type(verification_type, frame.offset))
		.collect::<Result<Vec<_>, _>>()?;
	let locals = Locals::from_frame(max_locals, &frame.locals)?;
	Ok(FlowState { stack, locals })
}

fn describe_slot(index: u16, slot: LocalSlot) -> String {
	match slot {
		LocalSlot::Unset => format!("unset local variable {index}"),
		LocalSlot::Value(category) => format!("{category} in local variable {index}"),
		LocalSlot::Upper => format!("the second slot of a long or double in local variable {index}"),
		LocalSlot::Unknown => format!("unknown local variable {index}"),
	}
}

/// The local variable slots an instruction reads and writes, in the order it does so.
fn local_accesses(instruction: &Instruction) -> (Option<(u16, u16)>, Option<(u16, u16)>) {
	match instruction {
		Instruction::Load { kind, index } => (Some((*index, kind.category().size())), None),
		Instruction::Store { kind, index } => (None, Some((*index, kind.category().size()))),
		Instruction::Increment { index, .. } => (Some((*index, 1)), Some((*index, 1))),
		Instruction::Ret { index } => (Some((*index, 1)), None),
		_ => (None, None),
	}
}

/// Whether the instructions, taken in order, read the slot before writing it.
fn reads_before_writing(instructions: &[VerifiedInstruction], slot: u16) -> bool {
	let covers = |(index, size): (u16, u16)| (index..index + size).contains(&slot);
	for verified in instructions {
		let (read, written) = local_accesses(&verified.instruction);
		if read.is_some_and(covers) {
			return true;
		}
		if written.is_some_and(covers) {
			return false;
		}
	}
	false
}

/// What an instruction was entered with.
struct Entered {
	shape: Vec<ComputationalCategory>,
	locals: Locals,
}

/// Tracks the states recorded for branch targets, and the states instructions were entered with.
struct Flow<'a> {
	max_locals: u16,
	frames: BTreeMap<u16, &'a StackMapFrame>,
	/// The catch type of the handlers starting at an offset. `None` if unknown or mixed.
	handlers: BTreeMap<u16, Option<InternalTypeName>>,
	recorded: BTreeMap<u16, FlowState>,
	entered: BTreeMap<u16, Entered>,
	backward_targets: BTreeSet<u16>,
}

impl<'a> Flow<'a> {
	fn new(max_locals: u16, frames: &'a [StackMapFrame], exception_table: &[ExceptionHandler]) -> Flow<'a> {
		let mut handlers: BTreeMap<u16, Option<InternalTypeName>> = BTreeMap::new();
		for handler in exception_table {
			let catch_type = handler.catch_type.as_ref().map(ClassName::as_type);
			handlers.entry(handler.handler)
				.and_modify(|known| if *known != catch_type { *known = None })
				.or_insert(catch_type);
		}
		Flow {
			max_locals,
			frames: frames.iter().map(|frame| (frame.offset, frame)).collect(),
			handlers,
			recorded: BTreeMap::new(),
			entered: BTreeMap::new(),
			backward_targets: BTreeSet::new(),
		}
	}

	fn caught_exception(&self, pc: u16) -> Option<StackItem> {
		self.handlers.get(&pc).map(|catch_type| {
			StackItem::reference(Provenance::new(pc, Origin::CaughtException), catch_type.clone())
		})
	}

	/// Whether a stack map frame, a branch seen so far, or an exception handler says how `pc` is reached.
	fn is_known(&self, pc: u16) -> bool {
		self.frames.contains_key(&pc) || self.recorded.contains_key(&pc) || self.handlers.contains_key(&pc)
	}

	/// Whether a backward branch seen so far goes to `pc` or beyond.
	fn jumps_back_to_or_after(&self, pc: u16) -> bool {
		self.backward_targets.range(pc..).next().is_some()
	}

	/// Sets up the state of an instruction no path falls into.
	fn enter_after_transfer(&self, pc: u16, stack: &mut OperandStack, locals: &mut Locals) -> Result<(), BytecodeError> {
		let state = if let Some(frame) = self.frames.get(&pc) {
			let state = frame_state(frame, self.max_locals)?;
			if let Some(recorded) = self.recorded.get(&pc) {
				check_shape(&shape_of(&state.stack), &shape_of(&recorded.stack))?;
			}
			state
		} else if let Some(recorded) = self.recorded.get(&pc) {
			recorded.clone()
		} else if let Some(exception) = self.caught_exception(pc) {
			FlowState { stack: vec![exception], locals: Locals::unknown(self.max_locals) }
		} else {
			FlowState { stack: Vec::new(), locals: Locals::unknown(self.max_locals) }
		};
		stack.replace_with(state.stack)?;
		*locals = state.locals;
		Ok(())
	}

	/// Joins the state falling into `pc` with what else is known about it.
	fn enter_by_fall_through(&self, pc: u16, stack: &mut OperandStack, locals: &mut Locals) -> Result<(), BytecodeError> {
		if let Some(frame) = self.frames.get(&pc) {
			check_shape(&stack_shape(frame), &stack.shape())?;
			let state = frame_state(frame, self.max_locals)?;
			stack.replace_with(state.stack)?;
			*locals = state.locals;
		} else if let Some(recorded) = self.recorded.get(&pc) {
			stack.merge(&recorded.stack)?;
			locals.merge(&recorded.locals);
		}
		if self.handlers.contains_key(&pc) {
			check_shape(&[ComputationalCategory::Reference], &stack.shape())?;
		}
		Ok(())
	}

	fn entered(&mut self, pc: u16, stack: &OperandStack, locals: &Locals) {
		self.entered.insert(pc, Entered { shape: stack.shape(), locals: locals.clone() });
	}

	/// Records the state after a branching instruction at `pc` for its target.
	///
	/// `verified` are the instructions before the one at `pc`.
	fn branch(&mut self, pc: u16, target: u16, stack: &OperandStack, locals: &Locals, verified: &[VerifiedInstruction]) -> Result<(), BytecodeError> {
		if target <= pc {
			// the target was already verified, with the state recorded when entering it
			let Some(entered) = self.entered.get(&target) else {
				return Err(BytecodeError::InvalidBranchTarget { what: "branch target", target: target as i64 });
			};
			check_shape(&entered.shape, &stack.shape())?;
			check_loop_locals(&entered.locals, locals, target, verified)?;
			self.backward_targets.insert(target);
			return Ok(());
		}
		match self.recorded.get_mut(&target) {
			Some(recorded) => {
				let mut joined = OperandStack::new(stack.max_stack());
				joined.replace_with(recorded.stack.clone())?;
				joined.merge(stack.items())?;
				recorded.stack = joined.items().to_vec();
				recorded.locals.merge(locals);
			},
			None => {
				self.recorded.insert(target, FlowState { stack: stack.items().to_vec(), locals: locals.clone() });
			},
		}
		Ok(())
	}
}

/// Checks the locals a backward branch brings to `target` against those it was verified with.
///
/// A slot that changed only matters if the loop reads it before writing it again.
fn check_loop_locals(entered: &Locals, incoming: &Locals, target: u16, verified: &[VerifiedInstruction]) -> Result<(), BytecodeError> {
	let start = verified.partition_point(|instruction| instruction.pc < target);
	let body = &verified[start..];
	for index in 0..entered.max_locals() {
		let (Some(before), Some(after)) = (entered.slot(index), incoming.slot(index)) else {
			continue;
		};
		// loads of unset slots were rejected already, unknown slots accept anything
		if before == after || matches!(before, LocalSlot::Unset | LocalSlot::Unknown) || after == LocalSlot::Unknown {
			continue;
		}
		if reads_before_writing(body, index) {
			return Err(BytecodeError::mismatch(describe_slot(index, before), describe_slot(index, after)));
		}
	}
	Ok(())
}

/// Records which offsets start an instruction.
struct Boundaries {
	starts: Vec<bool>,
}

impl Boundaries {
	fn is_start(&self, pc: u32) -> bool {
		self.starts.get(pc as usize).copied().unwrap_or(false)
	}

	/// Checks an offset that must start an instruction.
	fn check_start(&self, what: &'static str, pc: u16) -> Result<()> {
		if !self.is_start(pc as u32) {
			return Err(BytecodeError::InvalidBranchTarget { what, target: pc as i64 }.at(pc));
		}
		Ok(())
	}

	/// Checks an offset that must start an instruction, or be the end of the code.
	fn check_end(&self, what: &'static str, pc: u32, at: u16) -> Result<()> {
		if pc != self.starts.len() as u32 && !self.is_start(pc) {
			return Err(BytecodeError::InvalidBranchTarget { what, target: pc as i64 }.at(at));
		}
		Ok(())
	}
}

/// Reads the contents of a `Code` attribute, and verifies the bytecode in it.
///
/// The raw bytes are only kept in the result if `keep_bytes` is set.
pub(crate) fn read_code(reader: &mut ByteCursor, pool: &ConstantPool, method: &MethodContext, keep_bytes: bool) -> Result<Code> {
	let max_stack = reader.read_u16()?;
	let max_locals = reader.read_u16()?;

	let code_length = reader.read_u32()?;
	if code_length == 0 || code_length > u16::MAX as u32 {
		bail_structure!("code_length must be greater than zero and less than 65536, got {code_length}");
	}
	let code_length = code_length as u16;
	let bytes = reader.read_slice(code_length as usize)?;

	let exception_table = read_exception_table(reader, pool)?;

	let mut line_numbers: Option<Vec<LineNumber>> = None;
	let mut local_variables: Option<Vec<LocalVariable>> = None;
	let mut local_variable_types: Option<Vec<LocalVariableType>> = None;
	let mut stack_map_frames: Option<Vec<StackMapFrame>> = None;

	let attributes_count = reader.read_u16()?;
	for _ in 0..attributes_count {
		let Some((name, mut attribute)) = read_attribute(reader, pool, Location::Code, method.version)? else {
			continue;
		};

		match name {
			attribute::LINE_NUMBER_TABLE => {
				let table = line_numbers.get_or_insert_with(Vec::new);
				read_line_numbers(&mut attribute, table)?;
			},
			attribute::LOCAL_VARIABLE_TABLE => {
				let table = local_variables.get_or_insert_with(Vec::new);
				read_local_variables(&mut attribute, pool, table)
					.with_context(|| "in LocalVariableTable attribute")?;
			},
			attribute::LOCAL_VARIABLE_TYPE_TABLE => {
				let table = local_variable_types.get_or_insert_with(Vec::new);
				read_local_variable_types(&mut attribute, pool, table)
					.with_context(|| "in LocalVariableTypeTable attribute")?;
			},
			attribute::STACK_MAP_TABLE => {
				let frames = read_stack_map_table(&mut attribute, pool, initial_locals(method), code_length)?;
				stack_map_frames.insert_if_empty(frames)
					.with_context(|| "only one StackMapTable or StackMap attribute is allowed")?;
			},
			attribute::STACK_MAP => {
				let frames = read_stack_map(&mut attribute, pool, code_length)?;
				stack_map_frames.insert_if_empty(frames)
					.with_context(|| "only one StackMapTable or StackMap attribute is allowed")?;
			},
			// type annotations
			_ => skip_contents(&mut attribute)?,
		}
		attribute.finish(format_args!("{name} attribute"))?;
	}

	let line_numbers = line_numbers.unwrap_or_default();
	let mut local_variables = local_variables.unwrap_or_default();
	merge_local_variable_types(&mut local_variables, local_variable_types.unwrap_or_default());
	let stack_map_frames = stack_map_frames.unwrap_or_default();

	check_local_variables(&local_variables, max_locals, code_length)?;

	let instructions = verify_instructions(bytes, code_length, max_stack, max_locals, pool, method, &exception_table, &line_numbers, &local_variables, &stack_map_frames)?;

	let boundaries = {
		let mut starts = vec![false; code_length as usize];
		for instruction in &instructions {
			starts[instruction.pc as usize] = true;
		}
		Boundaries { starts }
	};
	check_offsets(&boundaries, code_length, &instructions, &exception_table, &line_numbers, &local_variables, &stack_map_frames)?;

	Ok(Code {
		max_stack,
		max_locals,
		code_length,
		bytes: keep_bytes.then(|| bytes.to_vec()),
		instructions,
		exception_table,
		line_numbers,
		local_variables,
		stack_map_frames,
	})
}

/// Checks the local variable table entries that can be checked before seeing the instructions.
fn check_local_variables(local_variables: &[LocalVariable], max_locals: u16, code_length: u16) -> Result<()> {
	for variable in local_variables {
		let size = variable.descriptor.as_ref()
			.and_then(|descriptor| descriptor.field_type().category())
			.map_or(1, ComputationalCategory::size);
		let last = variable.index as u32 + size as u32 - 1;
		if last >= max_locals as u32 {
			return Err(BytecodeError::InvalidLocal { index: last, max_locals }.at(variable.start));
		}
		if variable.end() > code_length as u32 {
			return Err(BytecodeError::ExceedsCodeLength { what: "local variable end", pc: variable.end(), code_length }.at(variable.start));
		}
	}
	Ok(())
}

#[allow(clippy::too_many_arguments)]
fn verify_instructions(
	bytes: &[u8],
	code_length: u16,
	max_stack: u16,
	max_locals: u16,
	pool: &ConstantPool,
	method: &MethodContext,
	exception_table: &[ExceptionHandler],
	line_numbers: &[LineNumber],
	local_variables: &[LocalVariable],
	stack_map_frames: &[StackMapFrame],
) -> Result<Vec<VerifiedInstruction>> {
	let table = OpcodeTable::for_version(method.version);
	let lines = LineLookup::new(line_numbers);
	let mut flow = Flow::new(max_locals, stack_map_frames, exception_table);

	let mut stack = OperandStack::new(max_stack);
	let mut locals = Locals::for_entry(max_locals, method.is_static, &method.descriptor)
		.map_err(|kind| kind.at(0))?;

	let mut instructions = Vec::new();
	let mut reader = ByteCursor::new(bytes);
	// the start of the method is reached by invocation, so it counts as falling in
	let mut falls_through = true;
	// the start of the instructions after the last transfer that nothing seen so far reaches
	let mut unreached: Option<u16> = None;

	while !reader.is_empty() {
		let pc = reader.position() as u16;

		if flow.is_known(pc) {
			unreached = None;
		} else if !falls_through && unreached.is_none() {
			unreached = Some(pc);
		}

		let entered = if falls_through {
			flow.enter_by_fall_through(pc, &mut stack, &mut locals)
		} else {
			flow.enter_after_transfer(pc, &mut stack, &mut locals)
		};
		entered.map_err(|kind| kind.at(pc))?;
		flow.entered(pc, &stack, &locals);

		let opcode = reader.read_u8()?;
		stack.begin_instruction();
		let mut ctx = InstructionContext {
			pc,
			opcode,
			code_length,
			reader: &mut reader,
			stack: &mut stack,
			locals: &mut locals,
			pool,
			method,
			bindings: local_variables,
		};
		let instruction = table.entry(opcode).verify(&mut ctx).map_err(|kind| kind.at(pc))?;

		let effect = stack.effect();
		let depth_after = stack.depth();

		for target in instruction.branch_targets() {
			flow.branch(pc, target, &stack, &locals, &instructions).map_err(|kind| kind.at(pc))?;
		}
		falls_through = !instruction.is_unconditional_transfer();
		if matches!(instruction, Instruction::Jsr { .. }) {
			// the subroutine comes back here with its return address consumed, and may have changed any local
			stack.pop_value(ComputationalCategory::ReturnAddress).map_err(|kind| kind.at(pc))?;
			locals = Locals::unknown(max_locals);
		}

		instructions.push(VerifiedInstruction {
			pc,
			line: lines.line_at(pc),
			instruction,
			effect,
			depth_after,
		});
	}

	if falls_through {
		// bytes left over after the last reachable instruction make the declared length wrong
		if let Some(start) = unreached.filter(|&start| !flow.jumps_back_to_or_after(start)) {
			return Err(BytecodeError::WrongCodeLength { expected: code_length as u32, actual: start as u32 }.at(start));
		}
		let last = instructions.last().map_or(0, |instruction| instruction.pc);
		return Err(BytecodeError::Malformed("execution can fall off the end of the code".to_owned()).at(last));
	}

	Ok(instructions)
}

/// Checks that the offsets in instructions and attributes point at the starts of instructions.
fn check_offsets(
	boundaries: &Boundaries,
	code_length: u16,
	instructions: &[VerifiedInstruction],
	exception_table: &[ExceptionHandler],
	line_numbers: &[LineNumber],
	local_variables: &[LocalVariable],
	stack_map_frames: &[StackMapFrame],
) -> Result<()> {
	for verified in instructions {
		for target in verified.instruction.branch_targets() {
			if !boundaries.is_start(target as u32) {
				return Err(BytecodeError::InvalidBranchTarget { what: "branch target", target: target as i64 }.at(verified.pc));
			}
		}
	}

	for handler in exception_table {
		if handler.start >= handler.end {
			bail_structure!("exception handler range {}..{} is empty", handler.start, handler.end);
		}
		if handler.end > code_length {
			return Err(BytecodeError::ExceedsCodeLength { what: "exception range end", pc: handler.end as u32, code_length }.at(handler.start));
		}
		boundaries.check_start("exception range start", handler.start)?;
		boundaries.check_end("exception range end", handler.end as u32, handler.start)?;
		boundaries.check_start("exception handler", handler.handler)?;
	}

	for line in line_numbers {
		if line.start >= code_length {
			return Err(BytecodeError::ExceedsCodeLength { what: "line number start", pc: line.start as u32, code_length }.at(line.start));
		}
		boundaries.check_start("line number start", line.start)?;
	}

	for variable in local_variables {
		boundaries.check_start("local variable start", variable.start)?;
		boundaries.check_end("local variable end", variable.end(), variable.start)?;
	}

	for frame in stack_map_frames {
		boundaries.check_start("stack map frame offset", frame.offset)?;
	}
	Ok(())
}

#[cfg(test)]
mod testing {
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::class_constants::opcode;
	use crate::cursor::ByteCursor;
	use crate::error::{BytecodeError, Error, InvalidOpcodeReason};
	use crate::pool::{ConstantPool, PoolEntry};
	use crate::tree::code::StackEffect;
	use crate::tree::descriptor::MethodDescriptor;
	use crate::tree::instruction::{Constant, Instruction};
	use crate::tree::names::{ClassName, MethodName};
	use crate::verifier::code::read_code;
	use crate::verifier::context::MethodContext;
	use crate::version::Version;

	fn method(descriptor: &str) -> MethodContext {
		MethodContext {
			version: Version::V1_8,
			class: ClassName::try_from("a/B").unwrap(),
			name: MethodName::try_from("run").unwrap(),
			descriptor: MethodDescriptor::parse(JavaStr::from_str(descriptor)).unwrap(),
			is_static: true,
			strict: false,
		}
	}

	/// A pool with the attribute names at 1, 2 and 3, then `I` and `x`.
	fn pool() -> ConstantPool {
		let mut pool = ConstantPool::new(6);
		let names = ["LineNumberTable", "LocalVariableTable", "StackMapTable", "I", "x"];
		for (index, name) in names.into_iter().enumerate() {
			pool.insert(index as u16 + 1, PoolEntry::Utf8(JavaStr::from_str(name).to_owned())).unwrap();
		}
		pool
	}

	/// The contents of a `Code` attribute.
	fn code_attribute(max_stack: u16, max_locals: u16, code: &[u8], attributes: &[(u16, Vec<u8>)]) -> Vec<u8> {
		let mut data = Vec::new();
		data.extend(max_stack.to_be_bytes());
		data.extend(max_locals.to_be_bytes());
		data.extend((code.len() as u32).to_be_bytes());
		data.extend(code);
		data.extend(0u16.to_be_bytes());
		data.extend((attributes.len() as u16).to_be_bytes());
		for (name, contents) in attributes {
			data.extend(name.to_be_bytes());
			data.extend((contents.len() as u32).to_be_bytes());
			data.extend(contents);
		}
		data
	}

	fn verify(max_stack: u16, max_locals: u16, code: &[u8], attributes: &[(u16, Vec<u8>)]) -> Result<crate::tree::code::Code, Error> {
		let data = code_attribute(max_stack, max_locals, code, attributes);
		let mut reader = ByteCursor::new(&data);
		let code = read_code(&mut reader, &pool(), &method("()V"), true)?;
		assert!(reader.is_empty());
		Ok(code)
	}

	fn bytecode_error(result: Result<crate::tree::code::Code, Error>) -> (u16, BytecodeError) {
		let error = result.unwrap_err();
		let (pc, kind) = error.bytecode().unwrap_or_else(|| panic!("not a bytecode error: {error}"));
		(pc, kind.clone())
	}

	#[test]
	fn straight_line_code() -> Result<(), Error> {
		let code = verify(2, 1, &[opcode::ICONST_1, opcode::ISTORE_0, opcode::ILOAD_0, opcode::POP, opcode::RETURN], &[])?;
		assert_eq!(code.instructions.len(), 5);
		assert_eq!(code.instructions[0].instruction, Instruction::Constant(Constant::Int(1)));
		assert_eq!(code.instructions[0].effect, StackEffect::Changed { popped: 0, pushed: 1 });
		assert_eq!(code.instructions[1].depth_after, 0);
		assert_eq!(code.instructions[2].depth_after, 1);
		assert_eq!(code.instruction_at(3).map(|i| &i.instruction), Some(&Instruction::Stack(crate::tree::instruction::StackInstruction::Pop)));
		assert_eq!(code.bytes.as_deref(), Some(&[0x04, 0x3b, 0x1a, 0x57, 0xb1][..]));
		Ok(())
	}

	#[test]
	fn overflow_is_reported_at_the_push() {
		let (pc, kind) = bytecode_error(verify(1, 0, &[opcode::ICONST_0, opcode::ICONST_1, opcode::POP2, opcode::RETURN], &[]));
		assert_eq!(pc, 1);
		assert_eq!(kind, BytecodeError::Overflow { max_stack: 1 });
	}

	#[test]
	fn operands_running_past_the_code() {
		// sipush needs two operand bytes, but only one is left
		let (pc, kind) = bytecode_error(verify(1, 0, &[opcode::NOP, opcode::SIPUSH, 0x01], &[]));
		assert_eq!(pc, 1);
		assert_eq!(kind, BytecodeError::WrongCodeLength { expected: 3, actual: 4 });
	}

	#[test]
	fn invokedynamic_is_rejected() {
		let (pc, kind) = bytecode_error(verify(1, 0, &[opcode::INVOKEDYNAMIC, 0, 1, 0, 0, opcode::RETURN], &[]));
		assert_eq!(pc, 0);
		assert!(matches!(kind, BytecodeError::InvalidOpcode { opcode: opcode::INVOKEDYNAMIC, reason: InvalidOpcodeReason::NotYetSupported(_) }));
	}

	#[test]
	fn line_numbers() -> Result<(), Error> {
		let lines = vec![0, 2, 0, 1, 0, 11, 0, 0, 0, 10];
		let code = verify(1, 0, &[opcode::ICONST_0, opcode::POP, opcode::RETURN], &[(1, lines)])?;
		let found: Vec<_> = code.instructions.iter().map(|i| i.line).collect();
		assert_eq!(found, vec![Some(10), Some(11), Some(11)]);
		Ok(())
	}

	#[test]
	fn line_number_at_the_end_of_the_code() {
		let lines = vec![0, 1, 0, 3, 0, 10];
		let (pc, kind) = bytecode_error(verify(1, 0, &[opcode::ICONST_0, opcode::POP, opcode::RETURN], &[(1, lines)]));
		assert_eq!(pc, 3);
		assert_eq!(kind, BytecodeError::ExceedsCodeLength { what: "line number start", pc: 3, code_length: 3 });
	}

	#[test]
	fn local_variable_table() -> Result<(), Error> {
		// x: I in slot 0 for 1..4
		let table = vec![0, 1, 0, 1, 0, 3, 0, 5, 0, 4, 0, 0];
		let code = verify(1, 1, &[opcode::ICONST_0, opcode::ISTORE_0, opcode::ILOAD_0, opcode::POP, opcode::RETURN], &[(2, table)])?;
		assert_eq!(code.local_variables.len(), 1);
		assert_eq!(code.local_variables[0].name, JavaStr::from_str("x").to_owned());

		// a float can't be stored where the table says there is an int
		let table = vec![0, 1, 0, 1, 0, 3, 0, 5, 0, 4, 0, 0];
		let (pc, kind) = bytecode_error(verify(1, 1, &[opcode::FCONST_0, opcode::FSTORE_0, opcode::FLOAD_0, opcode::POP, opcode::RETURN], &[(2, table)]));
		assert_eq!(pc, 1);
		assert!(matches!(kind, BytecodeError::MismatchedType { .. }));

		// slot 1 doesn't exist
		let table = vec![0, 1, 0, 1, 0, 3, 0, 5, 0, 4, 0, 1];
		let (_, kind) = bytecode_error(verify(1, 1, &[opcode::RETURN], &[(2, table)]));
		assert_eq!(kind, BytecodeError::InvalidLocal { index: 1, max_locals: 1 });
		Ok(())
	}

	#[test]
	fn falling_off_the_end() {
		let (pc, kind) = bytecode_error(verify(1, 0, &[opcode::NOP, opcode::ICONST_0, opcode::POP], &[]));
		assert_eq!(pc, 2);
		assert_eq!(kind, BytecodeError::Malformed("execution can fall off the end of the code".to_owned()));
	}

	#[test]
	fn branching_into_an_instruction() {
		// goto +4 lands on the second byte of the sipush
		let code = [opcode::GOTO, 0, 4, opcode::SIPUSH, 0, 1, opcode::POP, opcode::RETURN];
		let (pc, kind) = bytecode_error(verify(1, 0, &code, &[]));
		assert_eq!(pc, 0);
		assert_eq!(kind, BytecodeError::InvalidBranchTarget { what: "branch target", target: 4 });
	}

	#[test]
	fn loops() -> Result<(), Error> {
		// 0: iconst_0, 1: istore_0, 2: iinc 0 1, 5: iload_0, 6: ifne -4, 9: return
		let code = [opcode::ICONST_0, opcode::ISTORE_0, opcode::IINC, 0, 1, opcode::ILOAD_0, opcode::IFNE, 0xff, 0xfc, opcode::RETURN];
		let verified = verify(1, 1, &code, &[])?;
		assert_eq!(verified.instructions[4].instruction.branch_targets(), vec![2]);
		Ok(())
	}

	#[test]
	fn backward_branch_with_another_stack() {
		// 1 is entered with one int, the ifeq at 3 jumps back to it with two
		let code = [opcode::ICONST_0, opcode::ICONST_0, opcode::ICONST_0, opcode::IFEQ, 0xff, 0xfe, opcode::POP, opcode::POP, opcode::RETURN];
		let (pc, kind) = bytecode_error(verify(3, 0, &code, &[]));
		assert_eq!(pc, 3);
		assert!(matches!(kind, BytecodeError::MismatchedType { .. }));
	}

	#[test]
	fn forward_branches_join() -> Result<(), Error> {
		// both paths reach the return with an empty stack
		let code = [
			opcode::ILOAD_0, opcode::IFEQ, 0, 6, // → 7
			opcode::ICONST_1, opcode::ISTORE_0, opcode::NOP,
			opcode::RETURN,
		];
		let (_, kind) = bytecode_error(verify(1, 1, &[opcode::ILOAD_0, opcode::RETURN], &[]));
		assert!(matches!(kind, BytecodeError::MismatchedType { .. }), "slot 0 is unset in a static method without parameters");

		let data = code_attribute(1, 1, &code, &[]);
		let mut reader = ByteCursor::new(&data);
		let verified = read_code(&mut reader, &pool(), &method("(I)V"), false)?;
		assert_eq!(verified.instructions.last().map(|i| i.pc), Some(7));
		assert_eq!(verified.bytes, None);
		Ok(())
	}

	#[test]
	fn joins_need_the_same_stack() {
		// the ifeq reaches 9 with an int on the stack, the goto without
		let code = [
			opcode::ICONST_0, opcode::ICONST_1, opcode::IFEQ, 0, 7, // → 9
			opcode::POP,
			opcode::GOTO, 0, 3, // → 9
			opcode::RETURN,
		];
		let (pc, kind) = bytecode_error(verify(2, 0, &code, &[]));
		assert_eq!(pc, 6);
		assert!(matches!(kind, BytecodeError::MismatchedType { .. }));
	}

	#[test]
	fn exception_handlers() -> Result<(), Error> {
		// 0: aconst_null, 1: athrow, 2: astore_0 (handler), 3: return
		let code = [opcode::ACONST_NULL, opcode::ATHROW, opcode::ASTORE_0, opcode::RETURN];
		let mut data = Vec::new();
		data.extend([0, 1, 0, 1, 0, 0, 0, code.len() as u8]);
		data.extend(code);
		data.extend([0, 1, 0, 0, 0, 2, 0, 2, 0, 0]);
		data.extend([0, 0]);
		let mut reader = ByteCursor::new(&data);
		let verified = read_code(&mut reader, &pool(), &method("()V"), false)?;
		assert_eq!(verified.exception_table.len(), 1);
		assert_eq!(verified.exception_table[0].catch_type, None);
		assert_eq!(verified.instructions[2].effect, StackEffect::Changed { popped: 1, pushed: 0 });

		// a range that doesn't end on an instruction
		let mut data = Vec::new();
		data.extend([0, 1, 0, 1, 0, 0, 0, 6]);
		data.extend([opcode::SIPUSH, 0, 1, opcode::POP, opcode::RETURN, opcode::ATHROW]);
		data.extend([0, 1, 0, 0, 0, 2, 0, 5, 0, 0]);
		data.extend([0, 0]);
		let mut reader = ByteCursor::new(&data);
		let error = read_code(&mut reader, &pool(), &method("()V"), false).unwrap_err();
		assert!(matches!(error.bytecode(), Some((0, BytecodeError::InvalidBranchTarget { what: "exception range end", target: 2 }))));
		Ok(())
	}

	#[test]
	fn code_length_limits() {
		let data = code_attribute(0, 0, &[], &[]);
		let mut reader = ByteCursor::new(&data);
		let error = read_code(&mut reader, &pool(), &method("()V"), false).unwrap_err();
		assert!(matches!(error, Error::Structure(_)));
		assert_eq!(error.to_string(), "code_length must be greater than zero and less than 65536, got 0");
	}

	#[test]
	fn unreachable_bytes_at_the_end() {
		// the nop after the return is never executed, so only 9 of the 10 bytes make up the method
		let mut code = vec![opcode::NOP; 8];
		code.extend([opcode::RETURN, opcode::NOP]);
		let (pc, kind) = bytecode_error(verify(0, 0, &code, &[]));
		assert_eq!(pc, 9);
		assert_eq!(kind, BytecodeError::WrongCodeLength { expected: 10, actual: 9 });

		// unreachable code that doesn't fall off the end is fine
		let verified = verify(0, 0, &[opcode::RETURN, opcode::NOP, opcode::RETURN], &[]);
		assert!(verified.is_ok());
	}

	#[test]
	fn loop_changing_a_local_it_reads() {
		// 2: iload_1 reads an int, but the goto at 6 comes back with a long in slots 1 and 2
		let code = [
			opcode::ICONST_0, opcode::ISTORE_1,
			opcode::ILOAD_1, opcode::POP,
			opcode::LCONST_0, opcode::LSTORE_1,
			opcode::GOTO, 0xff, 0xfc,
		];
		let (pc, kind) = bytecode_error(verify(2, 3, &code, &[]));
		assert_eq!(pc, 6);
		assert_eq!(kind, BytecodeError::MismatchedType {
			expected: "int in local variable 1".to_owned(),
			found: "long in local variable 1".to_owned(),
		});
	}

	#[test]
	fn loop_reusing_a_local() -> Result<(), Error> {
		// slot 1 holds an int when the loop at 2 is first entered, the loop only ever writes a long to it
		let code = [
			opcode::ICONST_0, opcode::ISTORE_1,
			opcode::NOP,
			opcode::LCONST_0, opcode::LSTORE_1,
			opcode::GOTO, 0xff, 0xfd,
		];
		let verified = verify(2, 3, &code, &[])?;
		assert_eq!(verified.instructions[5].instruction.branch_targets(), vec![2]);
		Ok(())
	}

	#[test]
	fn attribute_lengths_are_exact() {
		// a LineNumberTable with a trailing byte
		let lines = vec![0, 1, 0, 0, 0, 10, 0];
		let result = verify(0, 0, &[opcode::RETURN], &[(1, lines)]);
		assert!(matches!(result, Err(Error::Structure(_))));
	}

	#[test]
	fn subroutines() -> Result<(), Error> {
		// 0: jsr +4 → 4, 3: return, 4: astore_0, 5: ret 0
		let code = [opcode::JSR, 0, 4, opcode::RETURN, opcode::ASTORE_0, opcode::RET, 0];
		let data = code_attribute(1, 1, &code, &[]);
		let mut reader = ByteCursor::new(&data);
		let mut legacy = method("()V");
		legacy.version = Version::V1_4;
		let verified = read_code(&mut reader, &pool(), &legacy, false)?;
		assert_eq!(verified.instructions[0].depth_after, 1);
		assert_eq!(verified.instructions[1].effect, StackEffect::Unchanged);

		// gone with version 51
		let mut reader = ByteCursor::new(&data);
		let error = read_code(&mut reader, &pool(), &method("()V"), false).unwrap_err();
		assert!(matches!(error.bytecode(), Some((0, BytecodeError::InvalidOpcode { reason: InvalidOpcodeReason::NotInVersion { .. }, .. }))));
		Ok(())
	}
}
