//! The decoded form of verified instructions.
//!
//! Instructions are grouped into families sharing a variant, carrying what the opcode fixed (the
//! type it operates on, the comparison, the chosen form of a stack manipulation) as data.
//! Branch targets are absolute bytecode offsets.

use crate::pool::Loadable;
use crate::tree::descriptor::{ComputationalCategory, PrimitiveKind};
use crate::tree::field::FieldRef;
use crate::tree::method::MethodRef;
use crate::tree::names::ClassName;

/// The kinds of values loaded, stored and returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
	Int,
	Long,
	Float,
	Double,
	Reference,
}

impl ValueKind {
	pub fn category(self) -> ComputationalCategory {
		match self {
			ValueKind::Int => ComputationalCategory::Int,
			ValueKind::Long => ComputationalCategory::Long,
			ValueKind::Float => ComputationalCategory::Float,
			ValueKind::Double => ComputationalCategory::Double,
			ValueKind::Reference => ComputationalCategory::Reference,
		}
	}
}

/// The kinds of values arithmetic works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericKind {
	Int,
	Long,
	Float,
	Double,
}

impl NumericKind {
	pub fn category(self) -> ComputationalCategory {
		match self {
			NumericKind::Int => ComputationalCategory::Int,
			NumericKind::Long => ComputationalCategory::Long,
			NumericKind::Float => ComputationalCategory::Float,
			NumericKind::Double => ComputationalCategory::Double,
		}
	}

	pub fn is_floating_point(self) -> bool {
		matches!(self, NumericKind::Float | NumericKind::Double)
	}
}

/// The element kinds of the array load and store instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayKind {
	Int,
	Long,
	Float,
	Double,
	Reference,
	/// `baload` and `bastore` work on both `byte[]` and `boolean[]`.
	ByteOrBoolean,
	Char,
	Short,
}

impl ArrayKind {
	/// The category of the elements on the operand stack.
	pub fn category(self) -> ComputationalCategory {
		match self {
			ArrayKind::Long => ComputationalCategory::Long,
			ArrayKind::Float => ComputationalCategory::Float,
			ArrayKind::Double => ComputationalCategory::Double,
			ArrayKind::Reference => ComputationalCategory::Reference,
			ArrayKind::Int | ArrayKind::ByteOrBoolean | ArrayKind::Char | ArrayKind::Short => ComputationalCategory::Int,
		}
	}
}

/// The constants pushed by `aconst_null`, `iconst_<i>`, `lconst_<l>`, `fconst_<f>`, `dconst_<d>`, `bipush` and `sipush`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
	Null,
	Int(i32),
	Long(i64),
	/// The bits of a `float`.
	Float(u32),
	/// The bits of a `double`.
	Double(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOp {
	Add,
	Sub,
	Mul,
	Div,
	Rem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShiftOp {
	Left,
	Right,
	UnsignedRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
	And,
	Or,
	Xor,
}

/// The conditions of the conditional branches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
	Eq,
	Ne,
	Lt,
	Ge,
	Gt,
	Le,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvokeKind {
	Virtual,
	Special,
	Static,
	Interface,
}

/// `pop2` either pops two category 1 values, or one category 2 value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pop2Form {
	/// `..., value2, value1 → ...` where both are category 1.
	TwoCategory1,
	/// `..., value → ...` where it's category 2.
	OneCategory2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DupX2Form {
	/// `..., value3, value2, value1 → ..., value1, value3, value2, value1`, all category 1.
	Form1,
	/// `..., value2, value1 → ..., value1, value2, value1`, value1 category 1 and value2 category 2.
	Form2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dup2Form {
	/// `..., value2, value1 → ..., value2, value1, value2, value1`, both category 1.
	Form1,
	/// `..., value → ..., value, value`, a category 2 value.
	Form2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dup2X1Form {
	/// `..., value3, value2, value1 → ..., value2, value1, value3, value2, value1`, all category 1.
	Form1,
	/// `..., value2, value1 → ..., value1, value2, value1`, value1 category 2 and value2 category 1.
	Form2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dup2X2Form {
	/// `..., value4, value3, value2, value1 → ..., value2, value1, value4, value3, value2, value1`, all category 1.
	Form1,
	/// `..., value3, value2, value1 → ..., value1, value3, value2, value1`, value1 category 2, the others category 1.
	Form2,
	/// `..., value3, value2, value1 → ..., value2, value1, value3, value2, value1`, value1 and value2 category 1, value3 category 2.
	Form3,
	/// `..., value2, value1 → ..., value1, value2, value1`, both category 2.
	Form4,
}

/// The generic stack manipulation instructions, with the form chosen from the categories of the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackInstruction {
	Pop,
	Pop2(Pop2Form),
	Dup,
	DupX1,
	DupX2(DupX2Form),
	Dup2(Dup2Form),
	Dup2X1(Dup2X1Form),
	Dup2X2(Dup2X2Form),
	Swap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
	Nop,
	Constant(Constant),
	/// `ldc`, `ldc_w` and `ldc2_w`.
	Ldc(Loadable),
	/// The `<t>load` instructions, including the `_<n>` and `wide` forms.
	Load { kind: ValueKind, index: u16 },
	/// The `<t>store` instructions, including the `_<n>` and `wide` forms.
	Store { kind: ValueKind, index: u16 },
	ArrayLoad(ArrayKind),
	ArrayStore(ArrayKind),
	Stack(StackInstruction),
	/// `strict` is whether floating point arithmetic is FP-strict here.
	Arithmetic { op: ArithmeticOp, kind: NumericKind, strict: bool },
	Negate { kind: NumericKind, strict: bool },
	Shift { op: ShiftOp, kind: NumericKind },
	Bitwise { op: BitwiseOp, kind: NumericKind },
	Increment { index: u16, delta: i16 },
	/// The widening and narrowing conversions between `int`, `long`, `float` and `double`.
	Convert { from: NumericKind, to: NumericKind, strict: bool },
	/// `i2b`, `i2c` and `i2s`.
	Truncate(PrimitiveKind),
	LongCompare,
	/// `fcmpl`, `fcmpg`, `dcmpl` and `dcmpg`; `nan_result` is what is pushed if a value is NaN.
	FloatingCompare { kind: NumericKind, nan_result: i8 },
	/// `if<cond>`, comparing an int against zero.
	If { condition: Condition, target: u16 },
	/// `if_icmp<cond>`.
	IfIntCompare { condition: Condition, target: u16 },
	/// `if_acmpeq` and `if_acmpne`.
	IfReferenceCompare { equal: bool, target: u16 },
	/// `ifnull` and `ifnonnull`.
	IfNull { null: bool, target: u16 },
	/// `goto` and `goto_w`.
	Goto { target: u16 },
	/// `jsr` and `jsr_w`.
	Jsr { target: u16 },
	Ret { index: u16 },
	TableSwitch { default: u16, low: i32, high: i32, targets: Vec<u16> },
	LookupSwitch { default: u16, pairs: Vec<(i32, u16)> },
	/// `<t>return`, or `return` for `None`.
	Return(Option<ValueKind>),
	GetStatic(FieldRef),
	PutStatic(FieldRef),
	GetField(FieldRef),
	PutField(FieldRef),
	Invoke { kind: InvokeKind, method: MethodRef },
	New(ClassName),
	NewArray(PrimitiveKind),
	ANewArray(ClassName),
	ArrayLength,
	AThrow,
	CheckCast(ClassName),
	InstanceOf(ClassName),
	MonitorEnter,
	MonitorExit,
	MultiANewArray { class: ClassName, dimensions: u8 },
}

impl Instruction {
	/// The offsets this instruction may transfer control to, other than the next instruction.
	pub fn branch_targets(&self) -> Vec<u16> {
		match self {
			Instruction::If { target, .. } |
			Instruction::IfIntCompare { target, .. } |
			Instruction::IfReferenceCompare { target, .. } |
			Instruction::IfNull { target, .. } |
			Instruction::Goto { target } |
			Instruction::Jsr { target } => vec![*target],
			Instruction::TableSwitch { default, targets, .. } => {
				let mut all = vec![*default];
				all.extend(targets);
				all
			},
			Instruction::LookupSwitch { default, pairs } => {
				let mut all = vec![*default];
				all.extend(pairs.iter().map(|&(_, target)| target));
				all
			},
			_ => Vec::new(),
		}
	}

	/// Whether execution never continues with the next instruction.
	pub fn is_unconditional_transfer(&self) -> bool {
		matches!(self,
			Instruction::Goto { .. } |
			Instruction::Ret { .. } |
			Instruction::TableSwitch { .. } |
			Instruction::LookupSwitch { .. } |
			Instruction::Return(_) |
			Instruction::AThrow
		)
	}
}
