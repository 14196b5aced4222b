use std::fmt::{Display, Formatter};
use std::iter::Peekable;
use java_string::{Chars, JavaCodePoint, JavaStr, JavaString};
use crate::error::PoolError;
use crate::tree::names::{check_binary_name, ClassName};

/// The type of a value as the virtual machine computes with it.
///
/// `boolean`, `byte`, `char`, `short` and `int` are all computed as [`ComputationalCategory::Int`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComputationalCategory {
	Int,
	Float,
	Long,
	Double,
	Reference,
	ReturnAddress,
}

/// How many slots of the operand stack or the local variables a value takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotCategory {
	/// One slot: `int`, `float`, references and return addresses.
	One,
	/// Two slots: `long` and `double`.
	Two,
}

impl ComputationalCategory {
	pub fn slots(self) -> SlotCategory {
		match self {
			ComputationalCategory::Long | ComputationalCategory::Double => SlotCategory::Two,
			_ => SlotCategory::One,
		}
	}

	pub fn size(self) -> u16 {
		match self.slots() {
			SlotCategory::One => 1,
			SlotCategory::Two => 2,
		}
	}

	pub fn is_numeric(self) -> bool {
		matches!(self, ComputationalCategory::Int | ComputationalCategory::Float | ComputationalCategory::Long | ComputationalCategory::Double)
	}
}

impl Display for ComputationalCategory {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			ComputationalCategory::Int => "int",
			ComputationalCategory::Float => "float",
			ComputationalCategory::Long => "long",
			ComputationalCategory::Double => "double",
			ComputationalCategory::Reference => "reference",
			ComputationalCategory::ReturnAddress => "returnAddress",
		})
	}
}

/// The primitive types, by their descriptor character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
	/// `B`, a `byte`. In rust, this is a `i8`.
	Byte,
	/// `C`, a `char`.
	Char,
	/// `D`, a `double`. In rust, this is a `f64`.
	Double,
	/// `F`, a `float`. In rust, this is a `f32`.
	Float,
	/// `I`, an `int`. In rust, this is a `i32`.
	Int,
	/// `J`, a `long`. In rust, this is a `i64`.
	Long,
	/// `S`, a `short`. In rust, this is a `i16`.
	Short,
	/// `Z`, a `boolean`.
	Boolean,
}

impl PrimitiveKind {
	pub fn descriptor_char(self) -> char {
		match self {
			PrimitiveKind::Byte => 'B',
			PrimitiveKind::Char => 'C',
			PrimitiveKind::Double => 'D',
			PrimitiveKind::Float => 'F',
			PrimitiveKind::Int => 'I',
			PrimitiveKind::Long => 'J',
			PrimitiveKind::Short => 'S',
			PrimitiveKind::Boolean => 'Z',
		}
	}

	pub fn category(self) -> ComputationalCategory {
		match self {
			PrimitiveKind::Byte | PrimitiveKind::Char | PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Boolean => ComputationalCategory::Int,
			PrimitiveKind::Double => ComputationalCategory::Double,
			PrimitiveKind::Float => ComputationalCategory::Float,
			PrimitiveKind::Long => ComputationalCategory::Long,
		}
	}
}

/// What an [`InternalTypeName`] is built on, before applying the array dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
	Void,
	Primitive(PrimitiveKind),
	Reference(ClassName),
}

/// A type, as a base type together with a number of array dimensions.
///
/// `void` only ever has zero dimensions, and there are at most 255 dimensions.
///
/// The canonical text form is the descriptor: `V`, `I`, `[[D`, `Ljava/lang/String;`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalTypeName {
	base: BaseType,
	dimensions: u8,
}

impl InternalTypeName {
	pub fn new(base: BaseType, dimensions: u8) -> Result<InternalTypeName, PoolError> {
		if base == BaseType::Void && dimensions != 0 {
			return Err(PoolError::InvalidContent("there are no arrays of void".to_owned()));
		}
		Ok(InternalTypeName { base, dimensions })
	}

	pub fn void() -> InternalTypeName {
		InternalTypeName { base: BaseType::Void, dimensions: 0 }
	}

	pub fn primitive(kind: PrimitiveKind) -> InternalTypeName {
		InternalTypeName { base: BaseType::Primitive(kind), dimensions: 0 }
	}

	/// The type of instances of a class. Array class names are turned into the array type they name.
	pub fn reference(class: ClassName) -> InternalTypeName {
		InternalTypeName { base: BaseType::Reference(class), dimensions: 0 }
	}

	/// The type of an array with elements of this type.
	pub fn array_of(&self) -> Result<InternalTypeName, PoolError> {
		let dimensions = self.dimensions.checked_add(1)
			.ok_or_else(|| PoolError::InvalidContent(format!("array of {self} would have more than 255 dimensions")))?;
		InternalTypeName::new(self.base.clone(), dimensions)
	}

	/// The type of the elements of this array type, or `None` if it's not an array.
	pub fn component(&self) -> Option<InternalTypeName> {
		self.dimensions.checked_sub(1).map(|dimensions| InternalTypeName { base: self.base.clone(), dimensions })
	}

	pub fn base(&self) -> &BaseType {
		&self.base
	}

	pub fn dimensions(&self) -> u8 {
		self.dimensions
	}

	pub fn is_void(&self) -> bool {
		self.base == BaseType::Void
	}

	pub fn is_array(&self) -> bool {
		self.dimensions > 0
	}

	/// The computational category of values of this type, `None` for `void`.
	pub fn category(&self) -> Option<ComputationalCategory> {
		if self.dimensions > 0 {
			return Some(ComputationalCategory::Reference);
		}
		match &self.base {
			BaseType::Void => None,
			BaseType::Primitive(kind) => Some(kind.category()),
			BaseType::Reference(_) => Some(ComputationalCategory::Reference),
		}
	}

	/// The number of local variable slots values of this type take.
	pub fn slot_size(&self) -> u16 {
		self.category().map_or(0, ComputationalCategory::size)
	}

	/// Parses a field descriptor: any type except `void`.
	pub fn parse_field(s: &JavaStr) -> Result<InternalTypeName, PoolError> {
		let mut chars = s.chars().peekable();
		let t = read_field_type(&mut chars, s)?;
		expect_end(&mut chars, s)?;
		Ok(t)
	}

	/// Parses a return descriptor: any type, or `void`.
	pub fn parse_return(s: &JavaStr) -> Result<InternalTypeName, PoolError> {
		let mut chars = s.chars().peekable();
		let t = read_return_type(&mut chars, s)?;
		expect_end(&mut chars, s)?;
		Ok(t)
	}

	/// Writes the descriptor of this type.
	pub fn descriptor(&self) -> JavaString {
		let mut s = JavaString::new();
		write_type(self, &mut s);
		s
	}
}

impl Display for InternalTypeName {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		for _ in 0..self.dimensions {
			f.write_str("[")?;
		}
		match &self.base {
			BaseType::Void => f.write_str("V"),
			BaseType::Primitive(kind) => write!(f, "{}", kind.descriptor_char()),
			BaseType::Reference(class) => write!(f, "L{class};"),
		}
	}
}

// The grammar for descriptors is:
//   FieldDescriptor:
//     FieldType
//
//   MethodDescriptor:
//     "(" FieldType* ")" ReturnDescriptor
//
//   ReturnDescriptor:
//     FieldType | "V"
//
//   FieldType:
//     "B" | "C" | "D" | "F" | "I" | "J" | "S" | "Z" |
//     "L" ClassName ";" |
//     "[" FieldType
fn read_field_type(chars: &mut Peekable<Chars>, whole: &JavaStr) -> Result<InternalTypeName, PoolError> {
	const B: JavaCodePoint = JavaCodePoint::from_char('B');
	const C: JavaCodePoint = JavaCodePoint::from_char('C');
	const D: JavaCodePoint = JavaCodePoint::from_char('D');
	const F: JavaCodePoint = JavaCodePoint::from_char('F');
	const I: JavaCodePoint = JavaCodePoint::from_char('I');
	const J: JavaCodePoint = JavaCodePoint::from_char('J');
	const L: JavaCodePoint = JavaCodePoint::from_char('L');
	const S: JavaCodePoint = JavaCodePoint::from_char('S');
	const Z: JavaCodePoint = JavaCodePoint::from_char('Z');

	let mut dimensions: u8 = 0;
	while chars.next_if_eq(&'[').is_some() {
		dimensions = dimensions.checked_add(1)
			.ok_or_else(|| invalid(whole, "has more than 255 array dimensions"))?;
	}

	let char = chars.next().ok_or_else(|| invalid(whole, "ends abruptly"))?;
	let base = match char {
		B => BaseType::Primitive(PrimitiveKind::Byte),
		C => BaseType::Primitive(PrimitiveKind::Char),
		D => BaseType::Primitive(PrimitiveKind::Double),
		F => BaseType::Primitive(PrimitiveKind::Float),
		I => BaseType::Primitive(PrimitiveKind::Int),
		J => BaseType::Primitive(PrimitiveKind::Long),
		S => BaseType::Primitive(PrimitiveKind::Short),
		Z => BaseType::Primitive(PrimitiveKind::Boolean),
		L => {
			let mut s = JavaString::new();

			let mut char = chars.next().ok_or_else(|| invalid(whole, "ends abruptly"))?;
			while char != ';' {
				s.push_java(char);

				char = chars.next().ok_or_else(|| invalid(whole, "ends abruptly"))?;
			}

			check_binary_name(&s)?;
			BaseType::Reference(ClassName::try_from(s)?)
		},
		x => return Err(invalid(whole, &format!("has unexpected char {x:?}"))),
	};

	Ok(InternalTypeName { base, dimensions })
}

fn read_return_type(chars: &mut Peekable<Chars>, whole: &JavaStr) -> Result<InternalTypeName, PoolError> {
	if chars.next_if_eq(&'V').is_some() {
		Ok(InternalTypeName::void())
	} else {
		read_field_type(chars, whole)
	}
}

fn expect_end(chars: &mut Peekable<Chars>, whole: &JavaStr) -> Result<(), PoolError> {
	if chars.peek().is_some() {
		return Err(invalid(whole, &format!("has {:?} remaining", JavaString::from_iter(chars))));
	}
	Ok(())
}

fn write_type(t: &InternalTypeName, string: &mut JavaString) {
	for _ in 0..t.dimensions {
		string.push('[');
	}
	match &t.base {
		BaseType::Void => string.push('V'),
		BaseType::Primitive(kind) => string.push(kind.descriptor_char()),
		BaseType::Reference(class_name) => {
			string.push('L');
			string.push_java_str(class_name.as_java_str());
			string.push(';');
		},
	}
}

fn invalid(whole: &JavaStr, reason: &str) -> PoolError {
	PoolError::InvalidContent(format!("descriptor {whole:?} {reason}"))
}

/// A field descriptor: exactly one type, never `void`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor(InternalTypeName);

impl FieldDescriptor {
	pub fn parse(s: &JavaStr) -> Result<FieldDescriptor, PoolError> {
		InternalTypeName::parse_field(s).map(FieldDescriptor)
	}

	pub fn field_type(&self) -> &InternalTypeName {
		&self.0
	}
}

impl Display for FieldDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

/// A method descriptor: the parameter types and the return type.
///
/// The parameters take at most 255 slots of local variables, counting `long` and `double` twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
	parameters: Vec<InternalTypeName>,
	return_type: InternalTypeName,
}

impl MethodDescriptor {
	pub fn new(parameters: Vec<InternalTypeName>, return_type: InternalTypeName) -> Result<MethodDescriptor, PoolError> {
		if parameters.iter().any(InternalTypeName::is_void) {
			return Err(PoolError::InvalidContent("a parameter can't be void".to_owned()));
		}
		let descriptor = MethodDescriptor { parameters, return_type };
		if descriptor.parameter_slots() > 255 {
			return Err(PoolError::InvalidContent(format!(
				"method descriptor {descriptor} takes {} slots for its parameters, at most 255 are allowed",
				descriptor.parameter_slots()
			)));
		}
		Ok(descriptor)
	}

	/// Attempts to parse a method descriptor.
	///
	/// A method descriptor is defined by the [grammar](https://docs.oracle.com/javase/specs/jvms/se22/html/jvms-4.html#jvms-4.3.3) in the
	/// Java Virtual Machine Specification.
	pub fn parse(s: &JavaStr) -> Result<MethodDescriptor, PoolError> {
		let mut chars = s.chars().peekable();

		if chars.next_if_eq(&'(').is_none() {
			return Err(invalid(s, "doesn't start with '('"));
		}

		let mut parameters = Vec::new();
		loop {
			if chars.next_if_eq(&')').is_some() {
				break;
			}
			parameters.push(read_field_type(&mut chars, s)?);
		}

		let return_type = read_return_type(&mut chars, s)?;
		expect_end(&mut chars, s)?;

		MethodDescriptor::new(parameters, return_type)
	}

	pub fn parameters(&self) -> &[InternalTypeName] {
		&self.parameters
	}

	pub fn return_type(&self) -> &InternalTypeName {
		&self.return_type
	}

	/// The number of local variable slots the parameters take, not counting `this`.
	pub fn parameter_slots(&self) -> u16 {
		self.parameters.iter().map(InternalTypeName::slot_size).sum()
	}

	pub fn descriptor(&self) -> JavaString {
		let mut s = JavaString::new();
		s.push('(');
		for parameter in &self.parameters {
			write_type(parameter, &mut s);
		}
		s.push(')');
		write_type(&self.return_type, &mut s);
		s
	}
}

impl Display for MethodDescriptor {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("(")?;
		for parameter in &self.parameters {
			Display::fmt(parameter, f)?;
		}
		f.write_str(")")?;
		Display::fmt(&self.return_type, f)
	}
}
