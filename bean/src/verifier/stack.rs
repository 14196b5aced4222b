//! The operand stack as the verifier models it.
//!
//! The stack holds typed items, and keeps count of the slots they take: `long` and `double` take two slots
//! but are a single item, so they can only ever be moved as a whole. The slot count is what is checked against
//! `max_stack`.

use std::fmt::{Display, Formatter};
use crate::error::BytecodeError;
use crate::tree::code::{StackEffect, VerificationType};
use crate::tree::descriptor::{ComputationalCategory, InternalTypeName, SlotCategory};
use crate::tree::instruction::{Dup2Form, Dup2X1Form, Dup2X2Form, DupX2Form, Pop2Form};

/// Where a value on the stack came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
	Constant,
	Local(u16),
	Field,
	Invocation,
	Allocation,
	ArrayElement,
	CaughtException,
	Computation,
	/// Taken from a stack map frame.
	Frame,
	/// The result of joining different values at a branch target.
	Merge,
}

/// The instruction that produced a value, and how it did so.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Provenance {
	pub pc: u16,
	pub origin: Origin,
}

impl Provenance {
	pub fn new(pc: u16, origin: Origin) -> Provenance {
		Provenance { pc, origin }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackItem {
	/// An `int`, `float`, `long` or `double`.
	Numeric {
		category: ComputationalCategory,
		provenance: Provenance,
	},
	/// A reference, with its static type if that is known. `aconst_null` has no type.
	Reference {
		provenance: Provenance,
		class: Option<InternalTypeName>,
	},
	/// The address pushed by `jsr` and `jsr_w`: the instruction following it.
	ReturnAddress {
		target: u16,
	},
}

impl StackItem {
	pub fn numeric(category: ComputationalCategory, provenance: Provenance) -> StackItem {
		StackItem::Numeric { category, provenance }
	}

	pub fn reference(provenance: Provenance, class: Option<InternalTypeName>) -> StackItem {
		StackItem::Reference { provenance, class }
	}

	/// The item for a value of the given non-void type.
	pub fn of_type(value_type: &InternalTypeName, provenance: Provenance) -> Result<StackItem, BytecodeError> {
		match value_type.category() {
			None => Err(BytecodeError::mismatch("a value", "void")),
			Some(ComputationalCategory::Reference) => Ok(StackItem::reference(provenance, Some(value_type.clone()))),
			Some(category) => Ok(StackItem::numeric(category, provenance)),
		}
	}

	/// The item described by an entry of a stack map frame. `Top` can't be on the stack.
	pub fn from_verification_type(verification_type: &VerificationType, pc: u16) -> Result<StackItem, BytecodeError> {
		let provenance = Provenance::new(pc, Origin::Frame);
		Ok(match verification_type {
			VerificationType::Top => return Err(BytecodeError::Malformed("a stack map frame has `top` on the operand stack".to_owned())),
			VerificationType::Integer => StackItem::numeric(ComputationalCategory::Int, provenance),
			VerificationType::Float => StackItem::numeric(ComputationalCategory::Float, provenance),
			VerificationType::Long => StackItem::numeric(ComputationalCategory::Long, provenance),
			VerificationType::Double => StackItem::numeric(ComputationalCategory::Double, provenance),
			VerificationType::Null | VerificationType::UninitializedThis | VerificationType::Uninitialized(_) => StackItem::reference(provenance, None),
			VerificationType::Object(class) => StackItem::reference(provenance, Some(class.as_type())),
		})
	}

	pub fn category(&self) -> ComputationalCategory {
		match self {
			StackItem::Numeric { category, .. } => *category,
			StackItem::Reference { .. } => ComputationalCategory::Reference,
			StackItem::ReturnAddress { .. } => ComputationalCategory::ReturnAddress,
		}
	}

	pub fn slots(&self) -> SlotCategory {
		self.category().slots()
	}

	pub fn size(&self) -> u16 {
		self.category().size()
	}

	fn is_category_1(&self) -> bool {
		self.slots() == SlotCategory::One
	}

	/// Joins two items of the same category found on different paths.
	fn merge(&self, other: &StackItem) -> StackItem {
		if self == other {
			return self.clone();
		}
		match (self, other) {
			(StackItem::Numeric { category, provenance }, StackItem::Numeric { .. }) => {
				StackItem::numeric(*category, Provenance::new(provenance.pc, Origin::Merge))
			},
			(StackItem::Reference { provenance, class: a }, StackItem::Reference { class: b, .. }) => {
				let class = if a == b { a.clone() } else { None };
				StackItem::reference(Provenance::new(provenance.pc, Origin::Merge), class)
			},
			_ => self.clone(),
		}
	}
}

impl Display for StackItem {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			StackItem::Reference { class: Some(class), .. } => write!(f, "reference {class}"),
			item => Display::fmt(&item.category(), f),
		}
	}
}

/// The categories of the items on a stack, bottom first, for comparing stacks from different paths.
pub fn describe_shape(shape: &[ComputationalCategory]) -> String {
	let items: Vec<String> = shape.iter().map(ToString::to_string).collect();
	format!("stack [{}]", items.join(", "))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperandStack {
	items: Vec<StackItem>,
	depth: u16,
	max_stack: u16,
	popped: u16,
	pushed: u16,
}

impl OperandStack {
	pub fn new(max_stack: u16) -> OperandStack {
		OperandStack {
			items: Vec::new(),
			depth: 0,
			max_stack,
			popped: 0,
			pushed: 0,
		}
	}

	/// The number of slots in use.
	pub fn depth(&self) -> u16 {
		self.depth
	}

	pub fn max_stack(&self) -> u16 {
		self.max_stack
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// The items, bottom first.
	pub fn items(&self) -> &[StackItem] {
		&self.items
	}

	pub fn shape(&self) -> Vec<ComputationalCategory> {
		self.items.iter().map(StackItem::category).collect()
	}

	pub fn peek(&self) -> Result<&StackItem, BytecodeError> {
		self.peek_at(0)
	}

	/// Looks at the item `n` items below the top, `0` being the top.
	pub fn peek_at(&self, n: usize) -> Result<&StackItem, BytecodeError> {
		self.items.len().checked_sub(n + 1)
			.map(|index| &self.items[index])
			.ok_or(BytecodeError::Underflow)
	}

	pub fn pop(&mut self) -> Result<StackItem, BytecodeError> {
		let item = self.items.pop().ok_or(BytecodeError::Underflow)?;
		self.depth -= item.size();
		self.popped += item.size();
		Ok(item)
	}

	pub fn pop_category_1(&mut self) -> Result<StackItem, BytecodeError> {
		let top = self.peek()?;
		if !top.is_category_1() {
			return Err(BytecodeError::mismatch("a category 1 value", top));
		}
		self.pop()
	}

	pub fn pop_category_2(&mut self) -> Result<StackItem, BytecodeError> {
		let top = self.peek()?;
		if top.is_category_1() {
			return Err(BytecodeError::mismatch("a category 2 value", top));
		}
		self.pop()
	}

	/// Pops an `int`, `float`, `long` or `double`, which must be of the category given.
	pub fn pop_numeric(&mut self, category: ComputationalCategory) -> Result<StackItem, BytecodeError> {
		let top = self.peek()?;
		if !matches!(top, StackItem::Numeric { category: found, .. } if *found == category) {
			return Err(BytecodeError::mismatch(category, top));
		}
		self.pop()
	}

	pub fn pop_reference(&mut self) -> Result<StackItem, BytecodeError> {
		let top = self.peek()?;
		if !matches!(top, StackItem::Reference { .. }) {
			return Err(BytecodeError::mismatch(ComputationalCategory::Reference, top));
		}
		self.pop()
	}

	/// Pops a value of any category, dispatching to the matching check.
	pub fn pop_value(&mut self, category: ComputationalCategory) -> Result<StackItem, BytecodeError> {
		match category {
			ComputationalCategory::Reference => self.pop_reference(),
			ComputationalCategory::ReturnAddress => {
				let top = self.peek()?;
				if !matches!(top, StackItem::ReturnAddress { .. }) {
					return Err(BytecodeError::mismatch(category, top));
				}
				self.pop()
			},
			numeric => self.pop_numeric(numeric),
		}
	}

	/// Checks that `slots` more slots fit onto the stack.
	pub fn reserve(&self, slots: u16) -> Result<(), BytecodeError> {
		if self.depth as u32 + slots as u32 > self.max_stack as u32 {
			return Err(BytecodeError::Overflow { max_stack: self.max_stack });
		}
		Ok(())
	}

	pub fn push(&mut self, item: StackItem) -> Result<(), BytecodeError> {
		self.reserve(item.size())?;
		self.depth += item.size();
		self.pushed += item.size();
		self.items.push(item);
		Ok(())
	}

	/// Pushes an item for which the space was already checked with [`OperandStack::reserve`].
	///
	/// Running out of space here is a bug in the verifier, not in the code being verified.
	pub fn push_with_certainty(&mut self, item: StackItem) -> Result<(), BytecodeError> {
		self.push(item).map_err(|_| BytecodeError::Internal("pushing an item with reserved space overflowed the stack"))
	}

	/// Marks an instruction that doesn't touch the stack. Fails if the instruction popped or pushed anything already.
	pub fn unchanged(&self) -> Result<(), BytecodeError> {
		if self.popped != 0 || self.pushed != 0 {
			return Err(BytecodeError::Internal("an instruction without stack effect changed the stack"));
		}
		Ok(())
	}

	/// Replaces the whole stack, as when taking the stack of a stack map frame or of a branch.
	pub fn replace_with(&mut self, items: Vec<StackItem>) -> Result<(), BytecodeError> {
		let depth: u32 = items.iter().map(|item| item.size() as u32).sum();
		if depth > self.max_stack as u32 {
			return Err(BytecodeError::Overflow { max_stack: self.max_stack });
		}
		self.depth = depth as u16;
		self.items = items;
		Ok(())
	}

	/// Checks that another path reaching the same instruction has a stack of the same shape,
	/// and joins the items.
	pub fn merge(&mut self, other: &[StackItem]) -> Result<(), BytecodeError> {
		let ours = self.shape();
		let theirs: Vec<_> = other.iter().map(StackItem::category).collect();
		if ours != theirs {
			return Err(BytecodeError::mismatch(describe_shape(&theirs), describe_shape(&ours)));
		}
		for (item, other) in self.items.iter_mut().zip(other) {
			*item = item.merge(other);
		}
		Ok(())
	}

	/// Starts counting the slots popped and pushed by the next instruction.
	pub fn begin_instruction(&mut self) {
		self.popped = 0;
		self.pushed = 0;
	}

	/// What the current instruction did to the stack.
	pub fn effect(&self) -> StackEffect {
		if self.popped == 0 && self.pushed == 0 {
			StackEffect::Unchanged
		} else {
			StackEffect::Changed { popped: self.popped, pushed: self.pushed }
		}
	}

	pub fn pop2(&mut self) -> Result<Pop2Form, BytecodeError> {
		if self.peek()?.is_category_1() {
			self.pop_category_1()?;
			self.pop_category_1()?;
			Ok(Pop2Form::TwoCategory1)
		} else {
			self.pop_category_2()?;
			Ok(Pop2Form::OneCategory2)
		}
	}

	// ..., value → ..., value, value
	pub fn dup(&mut self) -> Result<(), BytecodeError> {
		let value1 = self.pop_category_1()?;
		self.reserve(2)?;
		self.push_with_certainty(value1.clone())?;
		self.push_with_certainty(value1)
	}

	// ..., value2, value1 → ..., value1, value2, value1
	pub fn dup_x1(&mut self) -> Result<(), BytecodeError> {
		let value1 = self.pop_category_1()?;
		let value2 = self.pop_category_1()?;
		self.reserve(3)?;
		self.push_with_certainty(value1.clone())?;
		self.push_with_certainty(value2)?;
		self.push_with_certainty(value1)
	}

	pub fn dup_x2(&mut self) -> Result<DupX2Form, BytecodeError> {
		if !self.peek()?.is_category_1() {
			return Err(BytecodeError::mismatch("a category 1 value", self.peek()?));
		}
		if self.peek_at(1)?.is_category_1() {
			// Form 1: ..., value3, value2, value1 → ..., value1, value3, value2, value1
			let value1 = self.pop_category_1()?;
			let value2 = self.pop_category_1()?;
			let value3 = self.pop_category_1()?;
			self.reserve(4)?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value3)?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(DupX2Form::Form1)
		} else {
			// Form 2: ..., value2, value1 → ..., value1, value2, value1
			let value1 = self.pop_category_1()?;
			let value2 = self.pop_category_2()?;
			self.reserve(4)?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(DupX2Form::Form2)
		}
	}

	pub fn dup2(&mut self) -> Result<Dup2Form, BytecodeError> {
		if self.peek()?.is_category_1() {
			// Form 1: ..., value2, value1 → ..., value2, value1, value2, value1
			let value1 = self.pop_category_1()?;
			let value2 = self.pop_category_1()?;
			self.reserve(4)?;
			self.push_with_certainty(value2.clone())?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(Dup2Form::Form1)
		} else {
			// Form 2: ..., value → ..., value, value
			let value = self.pop_category_2()?;
			self.reserve(4)?;
			self.push_with_certainty(value.clone())?;
			self.push_with_certainty(value)?;
			Ok(Dup2Form::Form2)
		}
	}

	pub fn dup2_x1(&mut self) -> Result<Dup2X1Form, BytecodeError> {
		if self.peek()?.is_category_1() {
			// Form 1: ..., value3, value2, value1 → ..., value2, value1, value3, value2, value1
			let value1 = self.pop_category_1()?;
			let value2 = self.pop_category_1()?;
			let value3 = self.pop_category_1()?;
			self.reserve(5)?;
			self.push_with_certainty(value2.clone())?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value3)?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(Dup2X1Form::Form1)
		} else {
			// Form 2: ..., value2, value1 → ..., value1, value2, value1
			let value1 = self.pop_category_2()?;
			let value2 = self.pop_category_1()?;
			self.reserve(5)?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(Dup2X1Form::Form2)
		}
	}

	pub fn dup2_x2(&mut self) -> Result<Dup2X2Form, BytecodeError> {
		if self.peek()?.is_category_1() {
			if !self.peek_at(1)?.is_category_1() {
				return Err(BytecodeError::mismatch("a category 1 value", self.peek_at(1)?));
			}
			if self.peek_at(2)?.is_category_1() {
				// Form 1: ..., value4, value3, value2, value1 → ..., value2, value1, value4, value3, value2, value1
				let value1 = self.pop_category_1()?;
				let value2 = self.pop_category_1()?;
				let value3 = self.pop_category_1()?;
				let value4 = self.pop_category_1()?;
				self.reserve(6)?;
				self.push_with_certainty(value2.clone())?;
				self.push_with_certainty(value1.clone())?;
				self.push_with_certainty(value4)?;
				self.push_with_certainty(value3)?;
				self.push_with_certainty(value2)?;
				self.push_with_certainty(value1)?;
				Ok(Dup2X2Form::Form1)
			} else {
				// Form 3: ..., value3, value2, value1 → ..., value2, value1, value3, value2, value1
				let value1 = self.pop_category_1()?;
				let value2 = self.pop_category_1()?;
				let value3 = self.pop_category_2()?;
				self.reserve(6)?;
				self.push_with_certainty(value2.clone())?;
				self.push_with_certainty(value1.clone())?;
				self.push_with_certainty(value3)?;
				self.push_with_certainty(value2)?;
				self.push_with_certainty(value1)?;
				Ok(Dup2X2Form::Form3)
			}
		} else if self.peek_at(1)?.is_category_1() {
			// Form 2: ..., value3, value2, value1 → ..., value1, value3, value2, value1
			let value1 = self.pop_category_2()?;
			let value2 = self.pop_category_1()?;
			let value3 = self.pop_category_1()?;
			self.reserve(6)?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value3)?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(Dup2X2Form::Form2)
		} else {
			// Form 4: ..., value2, value1 → ..., value1, value2, value1
			let value1 = self.pop_category_2()?;
			let value2 = self.pop_category_2()?;
			self.reserve(6)?;
			self.push_with_certainty(value1.clone())?;
			self.push_with_certainty(value2)?;
			self.push_with_certainty(value1)?;
			Ok(Dup2X2Form::Form4)
		}
	}

	// ..., value2, value1 → ..., value1, value2
	pub fn swap(&mut self) -> Result<(), BytecodeError> {
		let value1 = self.pop_category_1()?;
		let value2 = self.pop_category_1()?;
		self.push_with_certainty(value1)?;
		self.push_with_certainty(value2)
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::error::BytecodeError;
	use crate::tree::code::StackEffect;
	use crate::tree::descriptor::ComputationalCategory::{self, Double, Float, Int, Long, Reference};
	use crate::tree::instruction::{Dup2Form, Dup2X1Form, Dup2X2Form, DupX2Form, Pop2Form};
	use crate::verifier::stack::{OperandStack, Origin, Provenance, StackItem};

	fn item(category: ComputationalCategory, pc: u16) -> StackItem {
		let provenance = Provenance::new(pc, Origin::Constant);
		if category == Reference {
			StackItem::reference(provenance, None)
		} else {
			StackItem::numeric(category, provenance)
		}
	}

	fn stack_of(max_stack: u16, categories: &[ComputationalCategory]) -> Result<OperandStack, BytecodeError> {
		let mut stack = OperandStack::new(max_stack);
		for (pc, &category) in categories.iter().enumerate() {
			stack.push(item(category, pc as u16))?;
		}
		Ok(stack)
	}

	/// The pcs of the items, bottom first, to check the order things were pushed in.
	fn order(stack: &OperandStack) -> Vec<u16> {
		stack.items().iter().map(|item| match item {
			StackItem::Numeric { provenance, .. } | StackItem::Reference { provenance, .. } => provenance.pc,
			StackItem::ReturnAddress { target } => *target,
		}).collect()
	}

	#[test]
	fn overflow_at_first_push_beyond_max() -> Result<(), BytecodeError> {
		let mut stack = OperandStack::new(3);
		stack.push(item(Int, 0))?;
		stack.push(item(Long, 1))?;
		assert_eq!(stack.depth(), 3);
		assert_eq!(stack.push(item(Int, 2)), Err(BytecodeError::Overflow { max_stack: 3 }));

		let mut stack = OperandStack::new(1);
		assert_eq!(stack.push(item(Double, 0)), Err(BytecodeError::Overflow { max_stack: 1 }));
		assert!(stack.is_empty());
		Ok(())
	}

	#[test]
	fn underflow_for_every_pop() {
		let mut stack = OperandStack::new(4);
		assert_eq!(stack.pop(), Err(BytecodeError::Underflow));
		assert_eq!(stack.pop_category_1(), Err(BytecodeError::Underflow));
		assert_eq!(stack.pop_category_2(), Err(BytecodeError::Underflow));
		for category in [Int, Float, Long, Double] {
			assert_eq!(stack.pop_numeric(category), Err(BytecodeError::Underflow));
		}
		assert_eq!(stack.pop_reference(), Err(BytecodeError::Underflow));
		assert_eq!(stack.pop2(), Err(BytecodeError::Underflow));
		assert_eq!(stack.dup(), Err(BytecodeError::Underflow));
		assert_eq!(stack.swap(), Err(BytecodeError::Underflow));
	}

	#[test]
	fn typed_pops() -> Result<(), BytecodeError> {
		let mut stack = stack_of(10, &[Int, Reference, Long])?;
		assert_eq!(stack.pop_numeric(Double), Err(BytecodeError::mismatch("double", "long")));
		assert_eq!(stack.pop_category_1(), Err(BytecodeError::mismatch("a category 1 value", "long")));
		assert_eq!(stack.pop_category_2()?.category(), Long);
		assert_eq!(stack.pop_numeric(Int), Err(BytecodeError::mismatch("int", "reference")));
		stack.pop_reference()?;
		assert_eq!(stack.pop_reference(), Err(BytecodeError::mismatch("reference", "int")));
		assert_eq!(stack.pop_category_2(), Err(BytecodeError::mismatch("a category 2 value", "int")));
		stack.pop_numeric(Int)?;
		assert!(stack.is_empty());
		assert_eq!(stack.depth(), 0);
		Ok(())
	}

	#[test]
	fn dup_on_long() -> Result<(), BytecodeError> {
		let mut stack = stack_of(4, &[Long])?;
		assert!(matches!(stack.dup(), Err(BytecodeError::MismatchedType { .. })));
		// a failed dup leaves the stack alone
		assert_eq!(stack.shape(), vec![Long]);

		assert_eq!(stack.dup2()?, Dup2Form::Form2);
		assert_eq!(stack.shape(), vec![Long, Long]);
		assert_eq!(stack.depth(), 4);
		Ok(())
	}

	#[test]
	fn dup_needs_room() -> Result<(), BytecodeError> {
		let mut stack = stack_of(1, &[Int])?;
		assert_eq!(stack.dup(), Err(BytecodeError::Overflow { max_stack: 1 }));
		Ok(())
	}

	#[test]
	fn dup_forms_order() -> Result<(), BytecodeError> {
		let mut stack = stack_of(10, &[Int, Float])?;
		stack.dup_x1()?;
		assert_eq!(order(&stack), vec![1, 0, 1]);

		let mut stack = stack_of(10, &[Int, Int, Float])?;
		assert_eq!(stack.dup_x2()?, DupX2Form::Form1);
		assert_eq!(order(&stack), vec![2, 0, 1, 2]);

		let mut stack = stack_of(10, &[Long, Float])?;
		assert_eq!(stack.dup_x2()?, DupX2Form::Form2);
		assert_eq!(order(&stack), vec![1, 0, 1]);

		let mut stack = stack_of(10, &[Int, Float])?;
		assert_eq!(stack.dup2()?, Dup2Form::Form1);
		assert_eq!(order(&stack), vec![0, 1, 0, 1]);

		let mut stack = stack_of(10, &[Int, Int, Float])?;
		assert_eq!(stack.dup2_x1()?, Dup2X1Form::Form1);
		assert_eq!(order(&stack), vec![1, 2, 0, 1, 2]);

		let mut stack = stack_of(10, &[Int, Double])?;
		assert_eq!(stack.dup2_x1()?, Dup2X1Form::Form2);
		assert_eq!(order(&stack), vec![1, 0, 1]);

		let mut stack = stack_of(10, &[Int, Int, Int, Float])?;
		assert_eq!(stack.dup2_x2()?, Dup2X2Form::Form1);
		assert_eq!(order(&stack), vec![2, 3, 0, 1, 2, 3]);

		let mut stack = stack_of(10, &[Int, Int, Long])?;
		assert_eq!(stack.dup2_x2()?, Dup2X2Form::Form2);
		assert_eq!(order(&stack), vec![2, 0, 1, 2]);

		let mut stack = stack_of(10, &[Long, Int, Int])?;
		assert_eq!(stack.dup2_x2()?, Dup2X2Form::Form3);
		assert_eq!(order(&stack), vec![1, 2, 0, 1, 2]);

		let mut stack = stack_of(10, &[Double, Long])?;
		assert_eq!(stack.dup2_x2()?, Dup2X2Form::Form4);
		assert_eq!(order(&stack), vec![1, 0, 1]);
		assert_eq!(stack.depth(), 6);
		Ok(())
	}

	#[test]
	fn dup_forms_reject_split_values() -> Result<(), BytecodeError> {
		// the second value would be split by dup_x1 and dup2_x2
		let mut stack = stack_of(10, &[Long, Int])?;
		assert!(matches!(stack.dup_x1(), Err(BytecodeError::MismatchedType { .. })));

		let mut stack = stack_of(10, &[Int, Long, Int])?;
		assert!(matches!(stack.dup2_x2(), Err(BytecodeError::MismatchedType { .. })));

		let mut stack = stack_of(10, &[Long, Int, Int])?;
		assert!(matches!(stack.dup2_x1(), Err(BytecodeError::MismatchedType { .. })));

		let mut stack = stack_of(10, &[Long, Int])?;
		assert!(matches!(stack.swap(), Err(BytecodeError::MismatchedType { .. })));
		Ok(())
	}

	#[test]
	fn pop2_forms() -> Result<(), BytecodeError> {
		let mut stack = stack_of(10, &[Int, Float, Double])?;
		assert_eq!(stack.pop2()?, Pop2Form::OneCategory2);
		assert_eq!(stack.pop2()?, Pop2Form::TwoCategory1);
		assert!(stack.is_empty());

		let mut stack = stack_of(10, &[Long, Int])?;
		assert!(matches!(stack.pop2(), Err(BytecodeError::MismatchedType { .. })));
		Ok(())
	}

	#[test]
	fn effects() -> Result<(), BytecodeError> {
		let mut stack = stack_of(10, &[Int, Int])?;
		stack.begin_instruction();
		stack.unchanged()?;
		assert_eq!(stack.effect(), StackEffect::Unchanged);

		stack.pop_numeric(Int)?;
		stack.pop_numeric(Int)?;
		stack.push(item(Long, 5))?;
		assert_eq!(stack.effect(), StackEffect::Changed { popped: 2, pushed: 2 });
		assert!(stack.unchanged().is_err());
		Ok(())
	}

	#[test]
	fn merging_stacks() -> Result<(), BytecodeError> {
		let mut stack = stack_of(10, &[Int, Reference])?;
		let other = stack_of(10, &[Int, Reference])?;
		stack.merge(other.items())?;

		let other = stack_of(10, &[Float, Reference])?;
		assert_eq!(stack.merge(other.items()), Err(BytecodeError::mismatch("stack [float, reference]", "stack [int, reference]")));

		assert_eq!(stack.replace_with(vec![item(Long, 0)]), Ok(()));
		assert_eq!(stack.depth(), 2);
		let mut small = OperandStack::new(1);
		assert_eq!(small.replace_with(vec![item(Long, 0)]), Err(BytecodeError::Overflow { max_stack: 1 }));
		Ok(())
	}
}
