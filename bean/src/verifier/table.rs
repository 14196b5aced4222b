//! The opcode dispatch table: for each of the 256 byte values, how long the instruction is and how to
//! check it.
//!
//! There is one table for each profile of class file versions. Version 51 dropped `jsr` and `ret`, and
//! introduced `invokedynamic`, which isn't supported yet in either.

use std::fmt::{Debug, Formatter};
use std::sync::OnceLock;
use crate::class_constants::opcode;
use crate::cursor::ClassRead;
use crate::error::{BytecodeError, InvalidOpcodeReason};
use crate::tree::descriptor::PrimitiveKind;
use crate::tree::instruction::{ArithmeticOp, ArrayKind, BitwiseOp, Condition, Constant, Instruction, InvokeKind, NumericKind, ShiftOp, StackInstruction};
use crate::verifier::context::InstructionContext;
use crate::verifier::ops::{self, FieldInstruction, Verified, VALUE_KINDS};
use crate::version::Version;

/// The class file versions sharing an opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
	/// Before version 51: with `jsr` and `ret`, without `invokedynamic`.
	Legacy,
	/// Version 51 and later.
	Modern,
}

impl Profile {
	pub fn of(version: Version) -> Profile {
		if version.at_least(51) { Profile::Modern } else { Profile::Legacy }
	}
}

/// How many bytes an instruction takes, including the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionLength {
	Fixed(u8),
	/// `tableswitch`, `lookupswitch` and `wide`: the length depends on the operands.
	Variable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
	Reserved,
	Unknown,
	NotYetSupported,
	NotInVersion,
}

type Verifier = Box<dyn Fn(&mut InstructionContext<'_, '_>) -> Verified + Send + Sync>;

enum Check {
	Verify(Verifier),
	Reject(Rejection),
}

pub struct OpcodeEntry {
	mnemonic: &'static str,
	length: InstructionLength,
	check: Check,
}

impl OpcodeEntry {
	pub fn mnemonic(&self) -> &'static str {
		self.mnemonic
	}

	pub fn length(&self) -> InstructionLength {
		self.length
	}

	/// Whether this opcode can pass verification at all.
	pub fn is_supported(&self) -> bool {
		matches!(self.check, Check::Verify(_))
	}

	/// Checks the instruction the context is positioned at, after its opcode byte.
	///
	/// Fixed length instructions must fit into the code before any operand is read.
	pub(crate) fn verify(&self, ctx: &mut InstructionContext<'_, '_>) -> Verified {
		match &self.check {
			Check::Reject(rejection) => {
				let reason = match rejection {
					Rejection::Reserved => InvalidOpcodeReason::Reserved(self.mnemonic),
					Rejection::Unknown => InvalidOpcodeReason::Unknown,
					Rejection::NotYetSupported => InvalidOpcodeReason::NotYetSupported(self.mnemonic),
					Rejection::NotInVersion => InvalidOpcodeReason::NotInVersion { mnemonic: self.mnemonic, version: ctx.version() },
				};
				Err(BytecodeError::invalid_opcode(ctx.opcode, reason))
			},
			Check::Verify(verify) => {
				if let InstructionLength::Fixed(length) = self.length {
					ctx.require_length(length as u64)?;
				}
				verify(ctx)
			},
		}
	}
}

impl Debug for OpcodeEntry {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("OpcodeEntry")
			.field("mnemonic", &self.mnemonic)
			.field("length", &self.length)
			.field("supported", &self.is_supported())
			.finish()
	}
}

#[derive(Debug)]
pub struct OpcodeTable {
	profile: Profile,
	entries: Vec<OpcodeEntry>,
}

impl OpcodeTable {
	/// The table for a class file version. Tables are built once and shared between threads.
	pub fn for_version(version: Version) -> &'static OpcodeTable {
		static LEGACY: OnceLock<OpcodeTable> = OnceLock::new();
		static MODERN: OnceLock<OpcodeTable> = OnceLock::new();

		match Profile::of(version) {
			Profile::Legacy => LEGACY.get_or_init(|| OpcodeTable::build(Profile::Legacy)),
			Profile::Modern => MODERN.get_or_init(|| OpcodeTable::build(Profile::Modern)),
		}
	}

	fn build(profile: Profile) -> OpcodeTable {
		let entries = (0..=u8::MAX).map(|opcode| entry(opcode, profile)).collect();
		OpcodeTable { profile, entries }
	}

	pub fn profile(&self) -> Profile {
		self.profile
	}

	pub fn entry(&self, opcode: u8) -> &OpcodeEntry {
		// there is an entry for every u8
		&self.entries[opcode as usize]
	}

	pub fn entries(&self) -> impl Iterator<Item=(u8, &OpcodeEntry)> {
		self.entries.iter().enumerate().map(|(opcode, entry)| (opcode as u8, entry))
	}
}

const MNEMONICS: [&str; 0xcb] = [
	"nop", "aconst_null", "iconst_m1", "iconst_0", "iconst_1", "iconst_2", "iconst_3", "iconst_4",
	"iconst_5", "lconst_0", "lconst_1", "fconst_0", "fconst_1", "fconst_2", "dconst_0", "dconst_1",
	"bipush", "sipush", "ldc", "ldc_w", "ldc2_w", "iload", "lload", "fload",
	"dload", "aload", "iload_0", "iload_1", "iload_2", "iload_3", "lload_0", "lload_1",
	"lload_2", "lload_3", "fload_0", "fload_1", "fload_2", "fload_3", "dload_0", "dload_1",
	"dload_2", "dload_3", "aload_0", "aload_1", "aload_2", "aload_3", "iaload", "laload",
	"faload", "daload", "aaload", "baload", "caload", "saload", "istore", "lstore",
	"fstore", "dstore", "astore", "istore_0", "istore_1", "istore_2", "istore_3", "lstore_0",
	"lstore_1", "lstore_2", "lstore_3", "fstore_0", "fstore_1", "fstore_2", "fstore_3", "dstore_0",
	"dstore_1", "dstore_2", "dstore_3", "astore_0", "astore_1", "astore_2", "astore_3", "iastore",
	"lastore", "fastore", "dastore", "aastore", "bastore", "castore", "sastore", "pop",
	"pop2", "dup", "dup_x1", "dup_x2", "dup2", "dup2_x1", "dup2_x2", "swap",
	"iadd", "ladd", "fadd", "dadd", "isub", "lsub", "fsub", "dsub",
	"imul", "lmul", "fmul", "dmul", "idiv", "ldiv", "fdiv", "ddiv",
	"irem", "lrem", "frem", "drem", "ineg", "lneg", "fneg", "dneg",
	"ishl", "lshl", "ishr", "lshr", "iushr", "lushr", "iand", "land",
	"ior", "lor", "ixor", "lxor", "iinc", "i2l", "i2f", "i2d",
	"l2i", "l2f", "l2d", "f2i", "f2l", "f2d", "d2i", "d2l",
	"d2f", "i2b", "i2c", "i2s", "lcmp", "fcmpl", "fcmpg", "dcmpl",
	"dcmpg", "ifeq", "ifne", "iflt", "ifge", "ifgt", "ifle", "if_icmpeq",
	"if_icmpne", "if_icmplt", "if_icmpge", "if_icmpgt", "if_icmple", "if_acmpeq", "if_acmpne", "goto",
	"jsr", "ret", "tableswitch", "lookupswitch", "ireturn", "lreturn", "freturn", "dreturn",
	"areturn", "return", "getstatic", "putstatic", "getfield", "putfield", "invokevirtual", "invokespecial",
	"invokestatic", "invokeinterface", "invokedynamic", "new", "newarray", "anewarray", "arraylength", "athrow",
	"checkcast", "instanceof", "monitorenter", "monitorexit", "wide", "multianewarray", "ifnull", "ifnonnull",
	"goto_w", "jsr_w", "breakpoint",
];

pub fn mnemonic(opcode: u8) -> &'static str {
	match opcode {
		opcode::NOP..=opcode::BREAKPOINT => MNEMONICS[opcode as usize],
		opcode::IMPDEP1 => "impdep1",
		opcode::IMPDEP2 => "impdep2",
		_ => "unknown",
	}
}

const NUMERIC_KINDS: [NumericKind; 4] = [NumericKind::Int, NumericKind::Long, NumericKind::Float, NumericKind::Double];
const ARRAY_KINDS: [ArrayKind; 8] = [
	ArrayKind::Int, ArrayKind::Long, ArrayKind::Float, ArrayKind::Double,
	ArrayKind::Reference, ArrayKind::ByteOrBoolean, ArrayKind::Char, ArrayKind::Short,
];
const ARITHMETIC_OPS: [ArithmeticOp; 5] = [ArithmeticOp::Add, ArithmeticOp::Sub, ArithmeticOp::Mul, ArithmeticOp::Div, ArithmeticOp::Rem];
const CONDITIONS: [Condition; 6] = [Condition::Eq, Condition::Ne, Condition::Lt, Condition::Ge, Condition::Gt, Condition::Le];

fn fixed<F>(mnemonic: &'static str, length: u8, verify: F) -> OpcodeEntry
where
	F: Fn(&mut InstructionContext<'_, '_>) -> Verified + Send + Sync + 'static,
{
	OpcodeEntry { mnemonic, length: InstructionLength::Fixed(length), check: Check::Verify(Box::new(verify)) }
}

fn variable<F>(mnemonic: &'static str, verify: F) -> OpcodeEntry
where
	F: Fn(&mut InstructionContext<'_, '_>) -> Verified + Send + Sync + 'static,
{
	OpcodeEntry { mnemonic, length: InstructionLength::Variable, check: Check::Verify(Box::new(verify)) }
}

fn rejected(mnemonic: &'static str, length: u8, rejection: Rejection) -> OpcodeEntry {
	OpcodeEntry { mnemonic, length: InstructionLength::Fixed(length), check: Check::Reject(rejection) }
}

fn read_u8_index(ctx: &mut InstructionContext<'_, '_>) -> Result<u16, BytecodeError> {
	Ok(ctx.reader.read_u8()? as u16)
}

fn stack(ctx: &mut InstructionContext<'_, '_>, opcode: u8) -> Verified {
	let instruction = match opcode {
		opcode::POP => {
			ctx.stack.pop_category_1()?;
			StackInstruction::Pop
		},
		opcode::POP2 => StackInstruction::Pop2(ctx.stack.pop2()?),
		opcode::DUP => {
			ctx.stack.dup()?;
			StackInstruction::Dup
		},
		opcode::DUP_X1 => {
			ctx.stack.dup_x1()?;
			StackInstruction::DupX1
		},
		opcode::DUP_X2 => StackInstruction::DupX2(ctx.stack.dup_x2()?),
		opcode::DUP2 => StackInstruction::Dup2(ctx.stack.dup2()?),
		opcode::DUP2_X1 => StackInstruction::Dup2X1(ctx.stack.dup2_x1()?),
		opcode::DUP2_X2 => StackInstruction::Dup2X2(ctx.stack.dup2_x2()?),
		opcode::SWAP => {
			ctx.stack.swap()?;
			StackInstruction::Swap
		},
		_ => return Err(BytecodeError::Internal("stack manipulation entry for another opcode")),
	};
	Ok(Instruction::Stack(instruction))
}

fn entry(opcode: u8, profile: Profile) -> OpcodeEntry {
	let name = mnemonic(opcode);
	let legacy = profile == Profile::Legacy;
	match opcode {
		opcode::NOP => fixed(name, 1, ops::nop),
		opcode::ACONST_NULL => fixed(name, 1, |ctx| ops::constant(ctx, Constant::Null)),
		opcode::ICONST_M1..=opcode::ICONST_5 => {
			let value = opcode as i32 - opcode::ICONST_0 as i32;
			fixed(name, 1, move |ctx| ops::constant(ctx, Constant::Int(value)))
		},
		opcode::LCONST_0 | opcode::LCONST_1 => {
			let value = (opcode - opcode::LCONST_0) as i64;
			fixed(name, 1, move |ctx| ops::constant(ctx, Constant::Long(value)))
		},
		opcode::FCONST_0..=opcode::FCONST_2 => {
			let bits = ((opcode - opcode::FCONST_0) as f32).to_bits();
			fixed(name, 1, move |ctx| ops::constant(ctx, Constant::Float(bits)))
		},
		opcode::DCONST_0 | opcode::DCONST_1 => {
			let bits = ((opcode - opcode::DCONST_0) as f64).to_bits();
			fixed(name, 1, move |ctx| ops::constant(ctx, Constant::Double(bits)))
		},
		opcode::BIPUSH => fixed(name, 2, |ctx| {
			let value = ctx.reader.read_i8()?;
			ops::constant(ctx, Constant::Int(value as i32))
		}),
		opcode::SIPUSH => fixed(name, 3, |ctx| {
			let value = ctx.reader.read_i16()?;
			ops::constant(ctx, Constant::Int(value as i32))
		}),
		opcode::LDC => fixed(name, 2, |ctx| {
			let index = read_u8_index(ctx)?;
			ops::load_constant(ctx, index, false)
		}),
		opcode::LDC_W | opcode::LDC2_W => {
			let wide = opcode == opcode::LDC2_W;
			fixed(name, 3, move |ctx| {
				let index = ctx.reader.read_u16()?;
				ops::load_constant(ctx, index, wide)
			})
		},
		opcode::ILOAD..=opcode::ALOAD => {
			let kind = VALUE_KINDS[(opcode - opcode::ILOAD) as usize];
			fixed(name, 2, move |ctx| {
				let index = read_u8_index(ctx)?;
				ops::load(ctx, kind, index)
			})
		},
		opcode::ILOAD_0..=opcode::ALOAD_3 => {
			let n = opcode - opcode::ILOAD_0;
			let kind = VALUE_KINDS[(n / 4) as usize];
			let index = (n % 4) as u16;
			fixed(name, 1, move |ctx| ops::load(ctx, kind, index))
		},
		opcode::IALOAD..=opcode::SALOAD => {
			let kind = ARRAY_KINDS[(opcode - opcode::IALOAD) as usize];
			fixed(name, 1, move |ctx| ops::array_load(ctx, kind))
		},
		opcode::ISTORE..=opcode::ASTORE => {
			let kind = VALUE_KINDS[(opcode - opcode::ISTORE) as usize];
			fixed(name, 2, move |ctx| {
				let index = read_u8_index(ctx)?;
				ops::store(ctx, kind, index)
			})
		},
		opcode::ISTORE_0..=opcode::ASTORE_3 => {
			let n = opcode - opcode::ISTORE_0;
			let kind = VALUE_KINDS[(n / 4) as usize];
			let index = (n % 4) as u16;
			fixed(name, 1, move |ctx| ops::store(ctx, kind, index))
		},
		opcode::IASTORE..=opcode::SASTORE => {
			let kind = ARRAY_KINDS[(opcode - opcode::IASTORE) as usize];
			fixed(name, 1, move |ctx| ops::array_store(ctx, kind))
		},
		opcode::POP..=opcode::SWAP => fixed(name, 1, move |ctx| stack(ctx, opcode)),
		opcode::IADD..=opcode::DREM => {
			let n = opcode - opcode::IADD;
			let op = ARITHMETIC_OPS[(n / 4) as usize];
			let kind = NUMERIC_KINDS[(n % 4) as usize];
			fixed(name, 1, move |ctx| {
				ops::binary(ctx, kind)?;
				Ok(Instruction::Arithmetic { op, kind, strict: ops::is_strict(ctx, kind) })
			})
		},
		opcode::INEG..=opcode::DNEG => {
			let kind = NUMERIC_KINDS[(opcode - opcode::INEG) as usize];
			fixed(name, 1, move |ctx| ops::negate(ctx, kind))
		},
		opcode::ISHL..=opcode::LUSHR => {
			let n = opcode - opcode::ISHL;
			let op = [ShiftOp::Left, ShiftOp::Right, ShiftOp::UnsignedRight][(n / 2) as usize];
			let kind = NUMERIC_KINDS[(n % 2) as usize];
			fixed(name, 1, move |ctx| {
				ops::shift(ctx, kind)?;
				Ok(Instruction::Shift { op, kind })
			})
		},
		opcode::IAND..=opcode::LXOR => {
			let n = opcode - opcode::IAND;
			let op = [BitwiseOp::And, BitwiseOp::Or, BitwiseOp::Xor][(n / 2) as usize];
			let kind = NUMERIC_KINDS[(n % 2) as usize];
			fixed(name, 1, move |ctx| {
				ops::binary(ctx, kind)?;
				Ok(Instruction::Bitwise { op, kind })
			})
		},
		opcode::IINC => fixed(name, 3, |ctx| {
			let index = read_u8_index(ctx)?;
			let delta = ctx.reader.read_i8()?;
			ops::increment(ctx, index, delta as i16)
		}),
		opcode::I2L..=opcode::D2F => {
			// each kind converts to the three others, in order
			let n = (opcode - opcode::I2L) as usize;
			let from_index = n / 3;
			let to_index = n % 3 + if n % 3 >= from_index { 1 } else { 0 };
			let from = NUMERIC_KINDS[from_index];
			let to = NUMERIC_KINDS[to_index];
			fixed(name, 1, move |ctx| ops::convert(ctx, from, to))
		},
		opcode::I2B => fixed(name, 1, |ctx| ops::truncate(ctx, PrimitiveKind::Byte)),
		opcode::I2C => fixed(name, 1, |ctx| ops::truncate(ctx, PrimitiveKind::Char)),
		opcode::I2S => fixed(name, 1, |ctx| ops::truncate(ctx, PrimitiveKind::Short)),
		opcode::LCMP => fixed(name, 1, |ctx| {
			ops::compare(ctx, NumericKind::Long)?;
			Ok(Instruction::LongCompare)
		}),
		opcode::FCMPL..=opcode::DCMPG => {
			let n = opcode - opcode::FCMPL;
			let kind = if n < 2 { NumericKind::Float } else { NumericKind::Double };
			let nan_result = if n % 2 == 0 { -1 } else { 1 };
			fixed(name, 1, move |ctx| {
				ops::compare(ctx, kind)?;
				Ok(Instruction::FloatingCompare { kind, nan_result })
			})
		},
		opcode::IFEQ..=opcode::IFLE => {
			let condition = CONDITIONS[(opcode - opcode::IFEQ) as usize];
			fixed(name, 3, move |ctx| ops::if_zero(ctx, condition))
		},
		opcode::IF_ICMPEQ..=opcode::IF_ICMPLE => {
			let condition = CONDITIONS[(opcode - opcode::IF_ICMPEQ) as usize];
			fixed(name, 3, move |ctx| ops::if_int_compare(ctx, condition))
		},
		opcode::IF_ACMPEQ | opcode::IF_ACMPNE => {
			let equal = opcode == opcode::IF_ACMPEQ;
			fixed(name, 3, move |ctx| ops::if_reference_compare(ctx, equal))
		},
		opcode::GOTO => fixed(name, 3, |ctx| ops::goto(ctx, false)),
		opcode::JSR if legacy => fixed(name, 3, |ctx| ops::jsr(ctx, false)),
		opcode::JSR => rejected(name, 3, Rejection::NotInVersion),
		opcode::RET if legacy => fixed(name, 2, |ctx| {
			let index = read_u8_index(ctx)?;
			ops::ret(ctx, index)
		}),
		opcode::RET => rejected(name, 2, Rejection::NotInVersion),
		opcode::TABLESWITCH => variable(name, ops::table_switch),
		opcode::LOOKUPSWITCH => variable(name, ops::lookup_switch),
		opcode::IRETURN..=opcode::ARETURN => {
			let kind = VALUE_KINDS[(opcode - opcode::IRETURN) as usize];
			fixed(name, 1, move |ctx| ops::return_value(ctx, Some(kind)))
		},
		opcode::RETURN => fixed(name, 1, |ctx| ops::return_value(ctx, None)),
		opcode::GETSTATIC..=opcode::PUTFIELD => {
			let instruction = [
				FieldInstruction::GetStatic,
				FieldInstruction::PutStatic,
				FieldInstruction::GetField,
				FieldInstruction::PutField,
			][(opcode - opcode::GETSTATIC) as usize];
			fixed(name, 3, move |ctx| ops::field(ctx, instruction))
		},
		opcode::INVOKEVIRTUAL => fixed(name, 3, |ctx| ops::invoke(ctx, InvokeKind::Virtual)),
		opcode::INVOKESPECIAL => fixed(name, 3, |ctx| ops::invoke(ctx, InvokeKind::Special)),
		opcode::INVOKESTATIC => fixed(name, 3, |ctx| ops::invoke(ctx, InvokeKind::Static)),
		opcode::INVOKEINTERFACE => fixed(name, 5, |ctx| ops::invoke(ctx, InvokeKind::Interface)),
		opcode::INVOKEDYNAMIC if legacy => rejected(name, 5, Rejection::NotInVersion),
		opcode::INVOKEDYNAMIC => rejected(name, 5, Rejection::NotYetSupported),
		opcode::NEW => fixed(name, 3, ops::new),
		opcode::NEWARRAY => fixed(name, 2, ops::new_array),
		opcode::ANEWARRAY => fixed(name, 3, ops::a_new_array),
		opcode::ARRAYLENGTH => fixed(name, 1, ops::array_length),
		opcode::ATHROW => fixed(name, 1, |ctx| {
			ctx.stack.pop_reference()?;
			Ok(Instruction::AThrow)
		}),
		opcode::CHECKCAST => fixed(name, 3, ops::check_cast),
		opcode::INSTANCEOF => fixed(name, 3, ops::instance_of),
		opcode::MONITORENTER => fixed(name, 1, |ctx| {
			ctx.stack.pop_reference()?;
			Ok(Instruction::MonitorEnter)
		}),
		opcode::MONITOREXIT => fixed(name, 1, |ctx| {
			ctx.stack.pop_reference()?;
			Ok(Instruction::MonitorExit)
		}),
		opcode::WIDE => variable(name, ops::wide),
		opcode::MULTIANEWARRAY => fixed(name, 4, ops::multi_a_new_array),
		opcode::IFNULL | opcode::IFNONNULL => {
			let null = opcode == opcode::IFNULL;
			fixed(name, 3, move |ctx| ops::if_null(ctx, null))
		},
		opcode::GOTO_W => fixed(name, 5, |ctx| ops::goto(ctx, true)),
		opcode::JSR_W if legacy => fixed(name, 5, |ctx| ops::jsr(ctx, true)),
		opcode::JSR_W => rejected(name, 5, Rejection::NotInVersion),
		opcode::BREAKPOINT | opcode::IMPDEP1 | opcode::IMPDEP2 => rejected(name, 1, Rejection::Reserved),
		_ => rejected(name, 1, Rejection::Unknown),
	}
}

#[cfg(test)]
mod testing {
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::class_constants::opcode;
	use crate::cursor::{ByteCursor, ClassRead};
	use crate::error::{BytecodeError, InvalidOpcodeReason};
	use crate::pool::ConstantPool;
	use crate::tree::descriptor::{ComputationalCategory, MethodDescriptor};
	use crate::tree::instruction::{ArithmeticOp, Constant, Dup2Form, Instruction, NumericKind, StackInstruction, ValueKind};
	use crate::tree::names::{ClassName, MethodName};
	use crate::verifier::context::{InstructionContext, MethodContext};
	use crate::verifier::locals::Locals;
	use crate::verifier::ops::Verified;
	use crate::verifier::stack::{OperandStack, Origin, Provenance, StackItem};
	use crate::verifier::table::{mnemonic, InstructionLength, OpcodeTable, Profile};
	use crate::version::Version;

	/// Verifies the instruction at the start of `code`, returning it and how many bytes it took.
	fn verify_one(version: Version, code: &[u8], stack: &mut OperandStack, locals: &mut Locals) -> Result<(Instruction, usize), BytecodeError> {
		let pool = ConstantPool::new(1);
		let method = MethodContext {
			version,
			class: ClassName::try_from("a/B").unwrap(),
			name: MethodName::try_from("run").unwrap(),
			descriptor: MethodDescriptor::parse(JavaStr::from_str("()V")).unwrap(),
			is_static: true,
			strict: false,
		};
		let mut reader = ByteCursor::new(code);
		let opcode = reader.read_u8()?;
		let mut ctx = InstructionContext {
			pc: 0,
			opcode,
			code_length: code.len() as u16,
			reader: &mut reader,
			stack,
			locals,
			pool: &pool,
			method: &method,
			bindings: &[],
		};
		let verified: Verified = OpcodeTable::for_version(version).entry(opcode).verify(&mut ctx);
		Ok((verified?, reader.position()))
	}

	fn int() -> StackItem {
		StackItem::numeric(ComputationalCategory::Int, Provenance::new(0, Origin::Constant))
	}

	fn long() -> StackItem {
		StackItem::numeric(ComputationalCategory::Long, Provenance::new(0, Origin::Constant))
	}

	#[test]
	fn tables_are_complete() {
		for version in [Version::V1_4, Version::V1_8] {
			let table = OpcodeTable::for_version(version);
			assert_eq!(table.entries().count(), 256);
		}
		assert_eq!(OpcodeTable::for_version(Version::V1_6).profile(), Profile::Legacy);
		assert_eq!(OpcodeTable::for_version(Version::V1_7).profile(), Profile::Modern);
		// built once
		assert!(std::ptr::eq(OpcodeTable::for_version(Version::V1_8), OpcodeTable::for_version(Version::V21)));
	}

	#[test]
	fn mnemonics_and_lengths() {
		assert_eq!(mnemonic(opcode::NOP), "nop");
		assert_eq!(mnemonic(opcode::IF_ICMPLE), "if_icmple");
		assert_eq!(mnemonic(opcode::MULTIANEWARRAY), "multianewarray");
		assert_eq!(mnemonic(opcode::IMPDEP2), "impdep2");
		assert_eq!(mnemonic(0xe0), "unknown");

		let table = OpcodeTable::for_version(Version::V1_8);
		assert_eq!(table.entry(opcode::IADD).length(), InstructionLength::Fixed(1));
		assert_eq!(table.entry(opcode::BIPUSH).length(), InstructionLength::Fixed(2));
		assert_eq!(table.entry(opcode::SIPUSH).length(), InstructionLength::Fixed(3));
		assert_eq!(table.entry(opcode::MULTIANEWARRAY).length(), InstructionLength::Fixed(4));
		assert_eq!(table.entry(opcode::INVOKEINTERFACE).length(), InstructionLength::Fixed(5));
		assert_eq!(table.entry(opcode::GOTO_W).length(), InstructionLength::Fixed(5));
		assert_eq!(table.entry(opcode::TABLESWITCH).length(), InstructionLength::Variable);
		assert_eq!(table.entry(opcode::WIDE).length(), InstructionLength::Variable);
	}

	#[test]
	fn supported_opcodes() {
		let legacy = OpcodeTable::for_version(Version::V1_4);
		let modern = OpcodeTable::for_version(Version::V1_8);
		for opcode in [opcode::JSR, opcode::JSR_W, opcode::RET] {
			assert!(legacy.entry(opcode).is_supported());
			assert!(!modern.entry(opcode).is_supported());
		}
		assert!(!legacy.entry(opcode::INVOKEDYNAMIC).is_supported());
		assert!(!modern.entry(opcode::INVOKEDYNAMIC).is_supported());

		let supported = modern.entries().filter(|(_, entry)| entry.is_supported()).count();
		// 0x00 to 0xc9, without jsr, ret, jsr_w and invokedynamic
		assert_eq!(supported, 0xca - 4);
	}

	#[test]
	fn rejections() {
		let mut stack = OperandStack::new(4);
		let mut locals = Locals::new(0);

		let error = verify_one(Version::V1_8, &[opcode::INVOKEDYNAMIC, 0, 1, 0, 0], &mut stack, &mut locals).unwrap_err();
		assert_eq!(error, BytecodeError::InvalidOpcode {
			opcode: opcode::INVOKEDYNAMIC,
			reason: InvalidOpcodeReason::NotYetSupported("invokedynamic"),
		});

		let error = verify_one(Version::V1_4, &[opcode::INVOKEDYNAMIC, 0, 1, 0, 0], &mut stack, &mut locals).unwrap_err();
		assert_eq!(error, BytecodeError::InvalidOpcode {
			opcode: opcode::INVOKEDYNAMIC,
			reason: InvalidOpcodeReason::NotInVersion { mnemonic: "invokedynamic", version: Version::V1_4 },
		});

		let error = verify_one(Version::V1_8, &[opcode::JSR, 0, 3], &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::InvalidOpcode { reason: InvalidOpcodeReason::NotInVersion { mnemonic: "jsr", .. }, .. }));

		let error = verify_one(Version::V1_8, &[opcode::BREAKPOINT], &mut stack, &mut locals).unwrap_err();
		assert_eq!(error, BytecodeError::InvalidOpcode { opcode: opcode::BREAKPOINT, reason: InvalidOpcodeReason::Reserved("breakpoint") });

		let error = verify_one(Version::V1_8, &[0xd0], &mut stack, &mut locals).unwrap_err();
		assert_eq!(error, BytecodeError::InvalidOpcode { opcode: 0xd0, reason: InvalidOpcodeReason::Unknown });
	}

	#[test]
	fn constants_and_arithmetic() -> Result<(), BytecodeError> {
		let mut stack = OperandStack::new(4);
		let mut locals = Locals::new(0);

		let (instruction, length) = verify_one(Version::V1_8, &[opcode::BIPUSH, 0xfe], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Constant(Constant::Int(-2)));
		assert_eq!(length, 2);

		let (instruction, _) = verify_one(Version::V1_8, &[opcode::ICONST_M1], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Constant(Constant::Int(-1)));

		let (instruction, _) = verify_one(Version::V1_8, &[opcode::IMUL], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Arithmetic { op: ArithmeticOp::Mul, kind: NumericKind::Int, strict: false });
		assert_eq!(stack.depth(), 1);

		// one int left, iadd needs two
		assert_eq!(verify_one(Version::V1_8, &[opcode::IADD], &mut stack, &mut locals), Err(BytecodeError::Underflow));
		assert!(stack.is_empty());

		verify_one(Version::V1_8, &[opcode::ICONST_1], &mut stack, &mut locals)?;
		let (instruction, _) = verify_one(Version::V1_8, &[opcode::I2D], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Convert { from: NumericKind::Int, to: NumericKind::Double, strict: false });
		assert_eq!(stack.depth(), 2);
		Ok(())
	}

	#[test]
	fn operands_must_fit_into_the_code() {
		let mut stack = OperandStack::new(4);
		let mut locals = Locals::new(0);
		assert_eq!(
			verify_one(Version::V1_8, &[opcode::SIPUSH, 1], &mut stack, &mut locals),
			Err(BytecodeError::WrongCodeLength { expected: 2, actual: 3 })
		);
		assert!(stack.is_empty());
	}

	#[test]
	fn wide_forms() -> Result<(), BytecodeError> {
		let mut stack = OperandStack::new(4);
		let mut locals = Locals::new(300);
		locals.store(260, ComputationalCategory::Int)?;

		let (instruction, length) = verify_one(Version::V1_8, &[opcode::WIDE, opcode::IINC, 1, 4, 0xff, 0x00], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Increment { index: 260, delta: -256 });
		assert_eq!(length, 6);

		let (instruction, length) = verify_one(Version::V1_8, &[opcode::WIDE, opcode::ILOAD, 1, 4], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Load { kind: ValueKind::Int, index: 260 });
		assert_eq!(length, 4);

		let error = verify_one(Version::V1_8, &[opcode::WIDE, opcode::IADD, 0, 0], &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::InvalidOpcode { opcode: opcode::WIDE, reason: InvalidOpcodeReason::Malformed(_) }));

		let error = verify_one(Version::V1_8, &[opcode::WIDE, opcode::RET, 0, 0], &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::InvalidOpcode { reason: InvalidOpcodeReason::NotInVersion { mnemonic: "ret", .. }, .. }));
		Ok(())
	}

	#[test]
	fn switches() -> Result<(), BytecodeError> {
		let mut locals = Locals::new(0);

		// opcode at 0, three bytes padding, default 20, low 1, high 2, two targets; code padded to 24 bytes
		let mut code = vec![opcode::TABLESWITCH, 0, 0, 0, 0, 0, 0, 20, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0, 21, 0, 0, 0, 22];
		code.resize(24, opcode::NOP);
		let mut stack = OperandStack::new(1);
		stack.push(int())?;
		// targets must be within the code, this has 24 bytes
		let (instruction, length) = verify_one(Version::V1_8, &code, &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::TableSwitch { default: 20, low: 1, high: 2, targets: vec![21, 22] });
		assert_eq!(length, 24);

		code[2] = 1;
		let mut stack = OperandStack::new(1);
		stack.push(int())?;
		let error = verify_one(Version::V1_8, &code, &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::InvalidOpcode { reason: InvalidOpcodeReason::Malformed(_), .. }));

		// keys out of order
		let code = [opcode::LOOKUPSWITCH, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 0, 0, 0, 5, 0, 0, 0, 0, 0, 0, 0, 5, 0, 0, 0, 0];
		let mut stack = OperandStack::new(1);
		stack.push(int())?;
		let error = verify_one(Version::V1_8, &code, &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::InvalidOpcode { reason: InvalidOpcodeReason::Malformed(_), .. }));

		// a huge range fails on the length, before reading the targets
		let code = [opcode::TABLESWITCH, 0, 0, 0, 0, 0, 0, 0, 0x80, 0, 0, 0, 0x7f, 0xff, 0xff, 0xff];
		let mut stack = OperandStack::new(1);
		stack.push(int())?;
		let error = verify_one(Version::V1_8, &code, &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::WrongCodeLength { expected: 16, .. }));
		Ok(())
	}

	#[test]
	fn stack_forms() -> Result<(), BytecodeError> {
		let mut locals = Locals::new(0);
		let mut stack = OperandStack::new(4);
		stack.push(long())?;
		let (instruction, _) = verify_one(Version::V1_8, &[opcode::DUP2], &mut stack, &mut locals)?;
		assert_eq!(instruction, Instruction::Stack(StackInstruction::Dup2(Dup2Form::Form2)));
		assert_eq!(stack.depth(), 4);

		let error = verify_one(Version::V1_8, &[opcode::DUP], &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::MismatchedType { .. }));
		Ok(())
	}

	#[test]
	fn returns_match_the_descriptor() {
		let mut locals = Locals::new(0);
		let mut stack = OperandStack::new(1);
		// the method returns void
		let error = verify_one(Version::V1_8, &[opcode::IRETURN], &mut stack, &mut locals).unwrap_err();
		assert!(matches!(error, BytecodeError::MismatchedType { .. }));
		assert!(verify_one(Version::V1_8, &[opcode::RETURN], &mut stack, &mut locals).is_ok());
	}
}
