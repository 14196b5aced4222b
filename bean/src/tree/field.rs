use java_string::JavaString;
use crate::tree::access::FieldAccess;
use crate::tree::descriptor::{BaseType, FieldDescriptor, PrimitiveKind};
use crate::tree::names::{ClassName, FieldName};

/// A reference to a field, as used by the field instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
	pub class: ClassName,
	pub name: FieldName,
	pub descriptor: FieldDescriptor,
}

/// The value of a `ConstantValue` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantValue {
	Integer(i32),
	/// The bits of a `float`.
	Float(u32),
	Long(i64),
	/// The bits of a `double`.
	Double(u64),
	String(JavaString),
}

impl ConstantValue {
	/// Whether a field with this descriptor may have this constant value.
	pub fn fits(&self, descriptor: &FieldDescriptor) -> bool {
		let field_type = descriptor.field_type();
		if field_type.is_array() {
			return false;
		}
		match (self, field_type.base()) {
			(ConstantValue::Integer(_), BaseType::Primitive(kind)) => matches!(kind,
				PrimitiveKind::Int | PrimitiveKind::Short | PrimitiveKind::Char | PrimitiveKind::Byte | PrimitiveKind::Boolean
			),
			(ConstantValue::Float(_), BaseType::Primitive(kind)) => *kind == PrimitiveKind::Float,
			(ConstantValue::Long(_), BaseType::Primitive(kind)) => *kind == PrimitiveKind::Long,
			(ConstantValue::Double(_), BaseType::Primitive(kind)) => *kind == PrimitiveKind::Double,
			(ConstantValue::String(_), BaseType::Reference(class)) => class.as_java_str() == java_string::JavaStr::from_str("java/lang/String"),
			_ => false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInformation {
	pub access: FieldAccess,
	pub name: FieldName,
	pub descriptor: FieldDescriptor,
	pub constant_value: Option<ConstantValue>,
	pub signature: Option<JavaString>,
	pub is_synthetic: bool,
	pub is_deprecated: bool,
}
