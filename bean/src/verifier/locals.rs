//! The local variables as the verifier models them: what category of value each slot holds.

use crate::error::BytecodeError;
use crate::tree::code::{LocalVariable, VerificationType};
use crate::tree::descriptor::{ComputationalCategory, MethodDescriptor, SlotCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalSlot {
	/// Nothing was stored here on the way to the current instruction.
	Unset,
	/// A value, for `long` and `double` this is the first of the two slots.
	Value(ComputationalCategory),
	/// The second slot of the `long` or `double` in the slot before.
	Upper,
	/// Paths disagree on what is here, or the path is not known.
	Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locals {
	slots: Vec<LocalSlot>,
}

impl Locals {
	/// Locals with nothing stored in them.
	pub fn new(max_locals: u16) -> Locals {
		Locals { slots: vec![LocalSlot::Unset; max_locals as usize] }
	}

	/// Locals about which nothing is known, as at code only reached by jumps not yet seen.
	pub fn unknown(max_locals: u16) -> Locals {
		Locals { slots: vec![LocalSlot::Unknown; max_locals as usize] }
	}

	/// The locals at method entry: `this` unless the method is static, then the parameters.
	pub fn for_entry(max_locals: u16, is_static: bool, descriptor: &MethodDescriptor) -> Result<Locals, BytecodeError> {
		let mut locals = Locals::new(max_locals);
		let mut index = 0u16;
		if !is_static {
			locals.store(index, ComputationalCategory::Reference)?;
			index += 1;
		}
		for parameter in descriptor.parameters() {
			let category = parameter.category()
				.ok_or(BytecodeError::Internal("parameter of type void"))?;
			locals.store(index, category)?;
			index += category.size();
		}
		Ok(locals)
	}

	/// The locals described by a stack map frame.
	pub fn from_frame(max_locals: u16, frame_locals: &[VerificationType]) -> Result<Locals, BytecodeError> {
		let mut locals = Locals::new(max_locals);
		let mut index = 0u16;
		for verification_type in frame_locals {
			let category = match verification_type {
				VerificationType::Top => None,
				VerificationType::Integer => Some(ComputationalCategory::Int),
				VerificationType::Float => Some(ComputationalCategory::Float),
				VerificationType::Long => Some(ComputationalCategory::Long),
				VerificationType::Double => Some(ComputationalCategory::Double),
				_ => Some(ComputationalCategory::Reference),
			};
			let size = category.map_or(1, ComputationalCategory::size);
			if index as u32 + size as u32 > max_locals as u32 {
				return Err(BytecodeError::InvalidLocal { index: index as u32 + size as u32 - 1, max_locals });
			}
			if let Some(category) = category {
				locals.store(index, category)?;
			}
			index += size;
		}
		Ok(locals)
	}

	pub fn max_locals(&self) -> u16 {
		// constructed from an u16
		self.slots.len() as u16
	}

	pub fn slot(&self, index: u16) -> Option<LocalSlot> {
		self.slots.get(index as usize).copied()
	}

	fn check_index(&self, index: u16, category: ComputationalCategory) -> Result<(), BytecodeError> {
		let last = index as u32 + category.size() as u32 - 1;
		if last >= self.max_locals() as u32 {
			return Err(BytecodeError::InvalidLocal { index: last, max_locals: self.max_locals() });
		}
		Ok(())
	}

	/// Checks that the local at `index` holds a value of the category.
	pub fn load(&self, index: u16, category: ComputationalCategory) -> Result<(), BytecodeError> {
		self.check_index(index, category)?;
		let found = self.slots[index as usize];
		match found {
			LocalSlot::Unknown => Ok(()),
			LocalSlot::Value(c) if c == category => {
				if category.slots() == SlotCategory::Two && !matches!(self.slots[index as usize + 1], LocalSlot::Upper | LocalSlot::Unknown) {
					return Err(BytecodeError::mismatch(category, "a value with its second slot overwritten"));
				}
				Ok(())
			},
			LocalSlot::Value(c) => Err(BytecodeError::mismatch(category, format!("{c} in local variable {index}"))),
			LocalSlot::Unset => Err(BytecodeError::mismatch(category, format!("unset local variable {index}"))),
			LocalSlot::Upper => Err(BytecodeError::mismatch(category, format!("the second slot of a long or double in local variable {index}"))),
		}
	}

	/// Stores a value of the category at `index`, invalidating values it partially overwrites.
	pub fn store(&mut self, index: u16, category: ComputationalCategory) -> Result<(), BytecodeError> {
		self.check_index(index, category)?;
		let index = index as usize;
		let size = category.size() as usize;

		// a long or double starting in the slot before loses its second half
		if index > 0 && matches!(self.slots[index - 1], LocalSlot::Value(c) if c.slots() == SlotCategory::Two) {
			self.slots[index - 1] = LocalSlot::Unset;
		}
		// a long or double starting in the last slot written loses its first half
		let last = index + size - 1;
		if matches!(self.slots[last], LocalSlot::Value(c) if c.slots() == SlotCategory::Two) {
			if let Some(upper @ LocalSlot::Upper) = self.slots.get_mut(last + 1) {
				*upper = LocalSlot::Unset;
			}
		}

		self.slots[index] = LocalSlot::Value(category);
		if size == 2 {
			self.slots[index + 1] = LocalSlot::Upper;
		}
		Ok(())
	}

	/// Joins the locals of another path reaching the same instruction: slots that differ become unknown.
	pub fn merge(&mut self, other: &Locals) {
		for (slot, other) in self.slots.iter_mut().zip(&other.slots) {
			if slot != other {
				*slot = LocalSlot::Unknown;
			}
		}
	}
}

/// Checks the category of a local against the `LocalVariableTable` entries for it that are live at `pc`.
pub fn check_binding(bindings: &[LocalVariable], pc: u16, index: u16, category: ComputationalCategory) -> Result<(), BytecodeError> {
	for binding in bindings {
		if binding.index != index || !binding.is_live_at(pc) {
			continue;
		}
		let Some(expected) = binding.descriptor.as_ref().and_then(|d| d.field_type().category()) else {
			continue;
		};
		if expected != category {
			return Err(BytecodeError::mismatch(
				format!("{expected} for local variable {:?}", binding.name),
				category,
			));
		}
	}
	Ok(())
}

#[cfg(test)]
mod testing {
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::error::{BytecodeError, PoolError};
	use crate::tree::code::{LocalVariable, VerificationType};
	use crate::tree::descriptor::ComputationalCategory::{Double, Float, Int, Long, Reference, ReturnAddress};
	use crate::tree::descriptor::{FieldDescriptor, MethodDescriptor};
	use crate::tree::names::ClassName;
	use crate::verifier::locals::{check_binding, LocalSlot, Locals};

	#[test]
	fn entry_locals() -> Result<(), Box<dyn std::error::Error>> {
		let descriptor = MethodDescriptor::parse(JavaStr::from_str("(JI[D)V"))?;
		let locals = Locals::for_entry(5, false, &descriptor)?;
		assert_eq!(locals.slot(0), Some(LocalSlot::Value(Reference)));
		assert_eq!(locals.slot(1), Some(LocalSlot::Value(Long)));
		assert_eq!(locals.slot(2), Some(LocalSlot::Upper));
		assert_eq!(locals.slot(3), Some(LocalSlot::Value(Int)));
		assert_eq!(locals.slot(4), Some(LocalSlot::Value(Reference)));

		// the parameters don't fit
		assert_eq!(Locals::for_entry(4, false, &descriptor), Err(BytecodeError::InvalidLocal { index: 4, max_locals: 4 }));
		assert!(Locals::for_entry(4, true, &descriptor).is_ok());
		Ok(())
	}

	#[test]
	fn loads_check_category() -> Result<(), BytecodeError> {
		let mut locals = Locals::new(4);
		assert!(matches!(locals.load(0, Int), Err(BytecodeError::MismatchedType { .. })));
		locals.store(0, Int)?;
		locals.load(0, Int)?;
		assert!(matches!(locals.load(0, Float), Err(BytecodeError::MismatchedType { .. })));

		locals.store(1, Double)?;
		locals.load(1, Double)?;
		assert!(matches!(locals.load(2, Float), Err(BytecodeError::MismatchedType { .. })));

		assert_eq!(locals.load(3, Long), Err(BytecodeError::InvalidLocal { index: 4, max_locals: 4 }));
		assert_eq!(locals.store(4, Int), Err(BytecodeError::InvalidLocal { index: 4, max_locals: 4 }));
		Ok(())
	}

	#[test]
	fn stores_split_wide_values() -> Result<(), BytecodeError> {
		let mut locals = Locals::new(4);
		locals.store(0, Long)?;
		locals.store(1, Int)?;
		assert_eq!(locals.slot(0), Some(LocalSlot::Unset));
		assert!(locals.load(0, Long).is_err());

		locals.store(2, Double)?;
		locals.store(1, Long)?;
		// the double lost its first slot
		assert_eq!(locals.slot(3), Some(LocalSlot::Unset));
		locals.load(1, Long)?;

		locals.store(0, ReturnAddress)?;
		locals.load(0, ReturnAddress)?;
		assert!(locals.load(0, Reference).is_err());
		Ok(())
	}

	#[test]
	fn merging() -> Result<(), BytecodeError> {
		let mut a = Locals::new(3);
		a.store(0, Int)?;
		a.store(1, Reference)?;
		let mut b = Locals::new(3);
		b.store(0, Int)?;
		b.store(1, Float)?;
		a.merge(&b);
		assert_eq!(a.slot(0), Some(LocalSlot::Value(Int)));
		assert_eq!(a.slot(1), Some(LocalSlot::Unknown));
		assert_eq!(a.slot(2), Some(LocalSlot::Unset));
		// unknown slots can be used as anything
		a.load(1, Double)?;
		Ok(())
	}

	#[test]
	fn frame_locals() -> Result<(), BytecodeError> {
		let frame = [
			VerificationType::Object(ClassName::java_lang_object()),
			VerificationType::Long,
			VerificationType::Top,
			VerificationType::Integer,
		];
		let locals = Locals::from_frame(5, &frame)?;
		assert_eq!(locals.slot(1), Some(LocalSlot::Value(Long)));
		assert_eq!(locals.slot(2), Some(LocalSlot::Upper));
		assert_eq!(locals.slot(3), Some(LocalSlot::Unset));
		assert_eq!(locals.slot(4), Some(LocalSlot::Value(Int)));

		assert_eq!(Locals::from_frame(4, &frame), Err(BytecodeError::InvalidLocal { index: 4, max_locals: 4 }));
		Ok(())
	}

	#[test]
	fn bindings() -> Result<(), PoolError> {
		let bindings = [LocalVariable {
			start: 2,
			length: 4,
			name: JavaStr::from_str("count").to_owned(),
			index: 1,
			descriptor: Some(FieldDescriptor::parse(JavaStr::from_str("I"))?),
			signature: None,
		}];
		assert!(check_binding(&bindings, 2, 1, Int).is_ok());
		assert!(check_binding(&bindings, 3, 1, Float).is_err());
		// not live
		assert!(check_binding(&bindings, 6, 1, Float).is_ok());
		// another index
		assert!(check_binding(&bindings, 3, 2, Float).is_ok());
		Ok(())
	}
}
