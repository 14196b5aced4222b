use std::fmt::{Display, Formatter};
use indexmap::{IndexMap, IndexSet};
use java_string::JavaString;
use crate::pool::{Loadable, MethodHandle};
use crate::tree::access::ClassAccess;
use crate::tree::descriptor::{FieldDescriptor, MethodDescriptor};
use crate::tree::field::FieldInformation;
use crate::tree::method::MethodInformation;
use crate::tree::names::{ClassName, FieldName, MethodName};
use crate::version::Version;

/// The key of a field: fields are unique by name and descriptor.
pub type FieldKey = (FieldName, FieldDescriptor);
/// The key of a method: methods are unique by name and descriptor.
pub type MethodKey = (MethodName, MethodDescriptor);

/// What kind of type a class file declares, derived from its access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
	Class,
	Interface,
	Annotation,
	Enum,
	Module,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
	Public,
	Package,
}

/// Whether a type can be instantiated or extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Completeness {
	/// Neither abstract nor final.
	Concrete,
	Abstract,
	Final,
}

impl Display for TypeKind {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			TypeKind::Class => "class",
			TypeKind::Interface => "interface",
			TypeKind::Annotation => "annotation",
			TypeKind::Enum => "enum",
			TypeKind::Module => "module",
		})
	}
}

impl ClassAccess {
	pub fn kind(&self) -> TypeKind {
		if self.is_module {
			TypeKind::Module
		} else if self.is_annotation {
			TypeKind::Annotation
		} else if self.is_interface {
			TypeKind::Interface
		} else if self.is_enum {
			TypeKind::Enum
		} else {
			TypeKind::Class
		}
	}

	pub fn visibility(&self) -> Visibility {
		if self.is_public { Visibility::Public } else { Visibility::Package }
	}

	pub fn completeness(&self) -> Completeness {
		if self.is_abstract {
			Completeness::Abstract
		} else if self.is_final {
			Completeness::Final
		} else {
			Completeness::Concrete
		}
	}
}

/// An entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
	pub inner_class: ClassName,
	pub outer_class: Option<ClassName>,
	pub inner_name: Option<JavaString>,
	pub flags: u16,
}

/// The `EnclosingMethod` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
	pub class: ClassName,
	pub method: Option<(MethodName, MethodDescriptor)>,
}

/// An entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
	pub handle: MethodHandle,
	pub arguments: Vec<Loadable>,
}

/// A class file that was read and verified completely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeInformation {
	pub version: Version,
	pub access: ClassAccess,
	pub name: ClassName,
	/// `None` only for `java/lang/Object` and for modules.
	pub super_class: Option<ClassName>,
	pub interfaces: IndexSet<ClassName>,

	pub fields: IndexMap<FieldKey, FieldInformation>,
	pub methods: IndexMap<MethodKey, MethodInformation>,

	pub source_file: Option<JavaString>,
	pub signature: Option<JavaString>,
	pub inner_classes: Vec<InnerClass>,
	pub enclosing_method: Option<EnclosingMethod>,
	pub bootstrap_methods: Vec<BootstrapMethod>,
	pub nest_host: Option<ClassName>,
	pub nest_members: Vec<ClassName>,
	pub permitted_subclasses: Vec<ClassName>,
	pub is_synthetic: bool,
	pub is_deprecated: bool,
}

impl TypeInformation {
	pub fn kind(&self) -> TypeKind {
		self.access.kind()
	}

	pub fn visibility(&self) -> Visibility {
		self.access.visibility()
	}

	pub fn completeness(&self) -> Completeness {
		self.access.completeness()
	}

	pub fn field(&self, name: &FieldName, descriptor: &FieldDescriptor) -> Option<&FieldInformation> {
		self.fields.get(&(name.clone(), descriptor.clone()))
	}

	pub fn method(&self, name: &MethodName, descriptor: &MethodDescriptor) -> Option<&MethodInformation> {
		self.methods.get(&(name.clone(), descriptor.clone()))
	}

	/// The number of instructions verified over all methods.
	pub fn instruction_count(&self) -> usize {
		self.methods.values()
			.filter_map(|method| method.code.as_ref())
			.map(|code| code.instructions.len())
			.sum()
	}
}
