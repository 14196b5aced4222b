use std::fmt::{Debug, Formatter};
use crate::error::{bail_structure, Result};
use crate::tree::names::MethodName;
use crate::version::Version;

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct ClassAccess {
	pub is_public: bool,
	pub is_final: bool,
	pub is_super: bool,
	pub is_interface: bool,
	pub is_abstract: bool,
	pub is_synthetic: bool,
	pub is_annotation: bool,
	pub is_enum: bool,
	pub is_module: bool,
}

impl Debug for ClassAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("ClassAccess { ")?;
		if self.is_public     { f.write_str("public ")?; }
		if self.is_final      { f.write_str("final ")?; }
		if self.is_super      { f.write_str("super ")?; }
		if self.is_interface  { f.write_str("interface ")?; }
		if self.is_abstract   { f.write_str("abstract ")?; }
		if self.is_synthetic  { f.write_str("synthetic ")?; }
		if self.is_annotation { f.write_str("annotation ")?; }
		if self.is_enum       { f.write_str("enum ")?; }
		if self.is_module     { f.write_str("module ")?; }
		f.write_str("}")
	}
}

/// Interprets an `u16` as the `access_flags` item of the `ClassFile` structure of the Java Virtual Machine Specification.
impl From<u16> for ClassAccess {
	fn from(value: u16) -> Self {
		ClassAccess {
			is_public:     value & 0x0001 != 0,
			is_final:      value & 0x0010 != 0,
			is_super:      value & 0x0020 != 0,
			is_interface:  value & 0x0200 != 0,
			is_abstract:   value & 0x0400 != 0,
			is_synthetic:  value & 0x1000 != 0,
			is_annotation: value & 0x2000 != 0,
			is_enum:       value & 0x4000 != 0,
			is_module:     value & 0x8000 != 0,
		}
	}
}

impl ClassAccess {
	/// Checks the combination of flags for a class file of the given version.
	pub fn check(&self, version: Version) -> Result<()> {
		if self.is_module {
			if !version.at_least(53) {
				bail_structure!("ACC_MODULE is not allowed before class file version 53");
			}
			let others = ClassAccess { is_module: false, ..*self };
			if others != ClassAccess::default() {
				bail_structure!("a module may not have other access flags than ACC_MODULE, got {self:?}");
			}
			return Ok(());
		}

		let since_1_5 = version.at_least(49);
		if self.is_interface {
			if !self.is_abstract {
				bail_structure!("an interface must be abstract, got {self:?}");
			}
			if self.is_final {
				bail_structure!("an interface can't be final, got {self:?}");
			}
			if since_1_5 && (self.is_super || self.is_enum) {
				bail_structure!("an interface can't have ACC_SUPER or ACC_ENUM, got {self:?}");
			}
		} else {
			if since_1_5 && self.is_annotation {
				bail_structure!("an annotation type must be an interface, got {self:?}");
			}
			if self.is_abstract && self.is_final {
				bail_structure!("a class can't be both abstract and final, got {self:?}");
			}
		}
		Ok(())
	}
}

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct FieldAccess {
	pub is_public: bool,
	pub is_private: bool,
	pub is_protected: bool,
	pub is_static: bool,
	pub is_final: bool,
	pub is_volatile: bool,
	pub is_transient: bool,
	pub is_synthetic: bool,
	pub is_enum: bool,
}

impl Debug for FieldAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("FieldAccess { ")?;
		if self.is_public    { f.write_str("public ")?; }
		if self.is_private   { f.write_str("private ")?; }
		if self.is_protected { f.write_str("protected ")?; }
		if self.is_static    { f.write_str("static ")?; }
		if self.is_final     { f.write_str("final ")?; }
		if self.is_volatile  { f.write_str("volatile ")?; }
		if self.is_transient { f.write_str("transient ")?; }
		if self.is_synthetic { f.write_str("synthetic ")?; }
		if self.is_enum      { f.write_str("enum ")?; }
		f.write_str("}")
	}
}

/// Interprets an `u16` as the `access_flags` item of the `field_info` structure of the Java Virtual Machine Specification.
impl From<u16> for FieldAccess {
	fn from(value: u16) -> Self {
		FieldAccess {
			is_public:    value & 0x0001 != 0,
			is_private:   value & 0x0002 != 0,
			is_protected: value & 0x0004 != 0,
			is_static:    value & 0x0008 != 0,
			is_final:     value & 0x0010 != 0,
			is_volatile:  value & 0x0040 != 0,
			is_transient: value & 0x0080 != 0,
			is_synthetic: value & 0x1000 != 0,
			is_enum:      value & 0x4000 != 0,
		}
	}
}

fn visibility_count(public: bool, private: bool, protected: bool) -> usize {
	[public, private, protected].into_iter().filter(|&x| x).count()
}

impl FieldAccess {
	/// Checks the combination of flags of a field declared in a class with the given access.
	pub fn check(&self, class: &ClassAccess) -> Result<()> {
		if visibility_count(self.is_public, self.is_private, self.is_protected) > 1 {
			bail_structure!("a field can have at most one of public, private and protected, got {self:?}");
		}
		if self.is_final && self.is_volatile {
			bail_structure!("a field can't be both final and volatile, got {self:?}");
		}
		if class.is_interface {
			let allowed = FieldAccess { is_public: true, is_static: true, is_final: true, is_synthetic: self.is_synthetic, ..FieldAccess::default() };
			if *self != allowed {
				bail_structure!("a field of an interface must be exactly public, static and final, got {self:?}");
			}
		}
		Ok(())
	}
}

#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub struct MethodAccess {
	pub is_public: bool,
	pub is_private: bool,
	pub is_protected: bool,
	pub is_static: bool,
	pub is_final: bool,
	pub is_synchronized: bool,
	pub is_bridge: bool,
	pub is_varargs: bool,
	pub is_native: bool,
	pub is_abstract: bool,
	pub is_strict: bool,
	pub is_synthetic: bool,
}

impl Debug for MethodAccess {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str("MethodAccess { ")?;
		if self.is_public       { f.write_str("public ")?; }
		if self.is_private      { f.write_str("private ")?; }
		if self.is_protected    { f.write_str("protected ")?; }
		if self.is_static       { f.write_str("static ")?; }
		if self.is_final        { f.write_str("final ")?; }
		if self.is_synchronized { f.write_str("synchronized ")?; }
		if self.is_bridge       { f.write_str("bridge ")?; }
		if self.is_varargs      { f.write_str("varargs ")?; }
		if self.is_native       { f.write_str("native ")?; }
		if self.is_abstract     { f.write_str("abstract ")?; }
		if self.is_strict       { f.write_str("strict ")?; }
		if self.is_synthetic    { f.write_str("synthetic ")?; }
		f.write_str("}")
	}
}

/// Interprets an `u16` as the `access_flags` item of the `method_info` structure of the Java Virtual Machine Specification.
impl From<u16> for MethodAccess {
	fn from(value: u16) -> Self {
		MethodAccess {
			is_public:       value & 0x0001 != 0,
			is_private:      value & 0x0002 != 0,
			is_protected:    value & 0x0004 != 0,
			is_static:       value & 0x0008 != 0,
			is_final:        value & 0x0010 != 0,
			is_synchronized: value & 0x0020 != 0,
			is_bridge:       value & 0x0040 != 0,
			is_varargs:      value & 0x0080 != 0,
			is_native:       value & 0x0100 != 0,
			is_abstract:     value & 0x0400 != 0,
			is_strict:       value & 0x0800 != 0,
			is_synthetic:    value & 0x1000 != 0,
		}
	}
}

impl MethodAccess {
	/// Whether the method has a `Code` attribute.
	pub fn has_code(&self) -> bool {
		!self.is_abstract && !self.is_native
	}

	/// Checks the combination of flags of a method declared in a class with the given access and version.
	pub fn check(&self, name: &MethodName, class: &ClassAccess, version: Version) -> Result<()> {
		if visibility_count(self.is_public, self.is_private, self.is_protected) > 1 {
			bail_structure!("a method can have at most one of public, private and protected, got {self:?}");
		}

		if name.is_clinit() {
			// all other flags are ignored for class initialization methods
			if version.at_least(51) && !self.is_static {
				bail_structure!("`<clinit>` must be static from class file version 51 on, got {self:?}");
			}
			return Ok(());
		}

		if class.is_interface {
			if version.at_least(52) {
				if self.is_protected || self.is_final || self.is_synchronized || self.is_native {
					bail_structure!("an interface method can't be protected, final, synchronized or native, got {self:?}");
				}
				if self.is_public == self.is_private {
					bail_structure!("an interface method must be exactly one of public and private, got {self:?}");
				}
			} else if !self.is_public || !self.is_abstract || self.is_static || self.is_final || self.is_synchronized || self.is_native || self.is_strict {
				bail_structure!("an interface method must be public abstract before class file version 52, got {self:?}");
			}
			if name.is_init() {
				bail_structure!("an interface can't have an instance initialization method");
			}
		}

		if self.is_abstract {
			let strict_forbidden = version.at_least(46) && !version.at_least(61);
			if self.is_private || self.is_static || self.is_final || self.is_synchronized || self.is_native || (strict_forbidden && self.is_strict) {
				bail_structure!("an abstract method can't be private, static, final, synchronized, native or strict, got {self:?}");
			}
		}

		if name.is_init() && (self.is_static || self.is_final || self.is_synchronized || self.is_bridge || self.is_native || self.is_abstract) {
			bail_structure!("`<init>` can't be static, final, synchronized, bridge, native or abstract, got {self:?}");
		}

		Ok(())
	}
}
