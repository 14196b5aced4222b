use java_string::JavaString;
use crate::tree::access::MethodAccess;
use crate::tree::code::Code;
use crate::tree::descriptor::MethodDescriptor;
use crate::tree::names::{ClassName, MethodName};

/// A reference to a method, as used by the invoke instructions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
	pub class: ClassName,
	pub name: MethodName,
	pub descriptor: MethodDescriptor,
	/// Whether this came from a `CONSTANT_InterfaceMethodref` entry.
	pub interface: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInformation {
	pub access: MethodAccess,
	pub name: MethodName,
	pub descriptor: MethodDescriptor,
	/// The verified code. Abstract and native methods have none, all others do.
	pub code: Option<Code>,
	/// The checked exceptions from the `Exceptions` attribute.
	pub exceptions: Vec<ClassName>,
	pub signature: Option<JavaString>,
	pub is_synthetic: bool,
	pub is_deprecated: bool,
}
