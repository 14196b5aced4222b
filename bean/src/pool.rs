//! The constant pool: a one-indexed table of tagged entries that everything else in a class file refers into.
//!
//! Reading happens in two phases. [`ConstantPool::read`] inserts every entry as it is found, without looking at
//! what it refers to, since entries may refer forward. [`ConstantPool::validate_all_references`] then walks the
//! whole pool once and checks every reference and the content it implies. Only after that the pool is used
//! for resolving the typed values the rest of the reader needs.

use std::fmt::{Display, Formatter};
use java_string::{JavaStr, JavaString};
use log::trace;
use crate::class_constants::{method_handle, pool as tag};
use crate::cursor::ClassRead;
use crate::error::{Error, PoolError, Result, ResultContext};
use crate::jstring;
use crate::tree::descriptor::{FieldDescriptor, MethodDescriptor};
use crate::tree::field::{ConstantValue, FieldRef};
use crate::tree::method::MethodRef;
use crate::tree::names::{ClassName, FieldName, MethodName};
use crate::version::Version;

/// The kind of a constant pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
	Utf8,
	Integer,
	Float,
	Long,
	Double,
	Class,
	String,
	FieldRef,
	MethodRef,
	InterfaceMethodRef,
	NameAndType,
	MethodHandle,
	MethodType,
	Dynamic,
	InvokeDynamic,
	Module,
	Package,
}

impl Tag {
	fn from_byte(byte: u8) -> Option<Tag> {
		Some(match byte {
			tag::UTF8 => Tag::Utf8,
			tag::INTEGER => Tag::Integer,
			tag::FLOAT => Tag::Float,
			tag::LONG => Tag::Long,
			tag::DOUBLE => Tag::Double,
			tag::CLASS => Tag::Class,
			tag::STRING => Tag::String,
			tag::FIELD_REF => Tag::FieldRef,
			tag::METHOD_REF => Tag::MethodRef,
			tag::INTERFACE_METHOD_REF => Tag::InterfaceMethodRef,
			tag::NAME_AND_TYPE => Tag::NameAndType,
			tag::METHOD_HANDLE => Tag::MethodHandle,
			tag::METHOD_TYPE => Tag::MethodType,
			tag::DYNAMIC => Tag::Dynamic,
			tag::INVOKE_DYNAMIC => Tag::InvokeDynamic,
			tag::MODULE => Tag::Module,
			tag::PACKAGE => Tag::Package,
			_ => return None,
		})
	}

	/// The first class file version in which entries with this tag may appear.
	fn introduced_in(self) -> Version {
		match self {
			Tag::MethodHandle | Tag::MethodType | Tag::InvokeDynamic => Version::V1_7,
			Tag::Module | Tag::Package => Version::V9,
			Tag::Dynamic => Version::V11,
			_ => Version::new(45, 0),
		}
	}

	/// Whether entries with this tag take up two indices.
	pub fn is_wide(self) -> bool {
		matches!(self, Tag::Long | Tag::Double)
	}
}

impl Display for Tag {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Tag::Utf8 => "Utf8",
			Tag::Integer => "Integer",
			Tag::Float => "Float",
			Tag::Long => "Long",
			Tag::Double => "Double",
			Tag::Class => "Class",
			Tag::String => "String",
			Tag::FieldRef => "Fieldref",
			Tag::MethodRef => "Methodref",
			Tag::InterfaceMethodRef => "InterfaceMethodref",
			Tag::NameAndType => "NameAndType",
			Tag::MethodHandle => "MethodHandle",
			Tag::MethodType => "MethodType",
			Tag::Dynamic => "Dynamic",
			Tag::InvokeDynamic => "InvokeDynamic",
			Tag::Module => "Module",
			Tag::Package => "Package",
		})
	}
}

/// A raw constant pool entry, as read from the class file.
///
/// Indices into the pool are kept as they are; they are only checked by [`ConstantPool::validate_all_references`].
/// Floating point values are kept as their bits, so that entries compare by their encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEntry {
	Utf8(JavaString),
	Integer(i32),
	Float(u32),
	Long(i64),
	Double(u64),
	Class { name_index: u16 },
	String { string_index: u16 },
	FieldRef { class_index: u16, name_and_type_index: u16 },
	MethodRef { class_index: u16, name_and_type_index: u16 },
	InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
	NameAndType { name_index: u16, descriptor_index: u16 },
	MethodHandle { reference_kind: u8, reference_index: u16 },
	MethodType { descriptor_index: u16 },
	Dynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
	InvokeDynamic { bootstrap_method_attr_index: u16, name_and_type_index: u16 },
	Module { name_index: u16 },
	Package { name_index: u16 },
}

impl PoolEntry {
	pub fn tag(&self) -> Tag {
		match self {
			PoolEntry::Utf8(_) => Tag::Utf8,
			PoolEntry::Integer(_) => Tag::Integer,
			PoolEntry::Float(_) => Tag::Float,
			PoolEntry::Long(_) => Tag::Long,
			PoolEntry::Double(_) => Tag::Double,
			PoolEntry::Class { .. } => Tag::Class,
			PoolEntry::String { .. } => Tag::String,
			PoolEntry::FieldRef { .. } => Tag::FieldRef,
			PoolEntry::MethodRef { .. } => Tag::MethodRef,
			PoolEntry::InterfaceMethodRef { .. } => Tag::InterfaceMethodRef,
			PoolEntry::NameAndType { .. } => Tag::NameAndType,
			PoolEntry::MethodHandle { .. } => Tag::MethodHandle,
			PoolEntry::MethodType { .. } => Tag::MethodType,
			PoolEntry::Dynamic { .. } => Tag::Dynamic,
			PoolEntry::InvokeDynamic { .. } => Tag::InvokeDynamic,
			PoolEntry::Module { .. } => Tag::Module,
			PoolEntry::Package { .. } => Tag::Package,
		}
	}

	/// The indices this entry refers to.
	fn references(&self) -> Vec<u16> {
		match *self {
			PoolEntry::Utf8(_) | PoolEntry::Integer(_) | PoolEntry::Float(_) | PoolEntry::Long(_) | PoolEntry::Double(_) => Vec::new(),
			PoolEntry::Class { name_index } => vec![name_index],
			PoolEntry::String { string_index } => vec![string_index],
			PoolEntry::FieldRef { class_index, name_and_type_index } |
			PoolEntry::MethodRef { class_index, name_and_type_index } |
			PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => vec![class_index, name_and_type_index],
			PoolEntry::NameAndType { name_index, descriptor_index } => vec![name_index, descriptor_index],
			PoolEntry::MethodHandle { reference_index, .. } => vec![reference_index],
			PoolEntry::MethodType { descriptor_index } => vec![descriptor_index],
			PoolEntry::Dynamic { name_and_type_index, .. } |
			PoolEntry::InvokeDynamic { name_and_type_index, .. } => vec![name_and_type_index],
			PoolEntry::Module { name_index } | PoolEntry::Package { name_index } => vec![name_index],
		}
	}

	fn read(reader: &mut impl ClassRead, tag: Tag) -> Result<PoolEntry> {
		Ok(match tag {
			Tag::Utf8 => {
				let length = reader.read_u16_as_usize()?;
				let mut bytes = Vec::with_capacity(length);
				for _ in 0..length {
					bytes.push(reader.read_u8()?);
				}
				PoolEntry::Utf8(jstring::from_modified_utf8(&bytes)?)
			},
			Tag::Integer => PoolEntry::Integer(reader.read_i32()?),
			Tag::Float => PoolEntry::Float(reader.read_u32()?),
			Tag::Long => PoolEntry::Long(reader.read_i64()?),
			Tag::Double => PoolEntry::Double(reader.read_u64()?),
			Tag::Class => PoolEntry::Class { name_index: reader.read_u16()? },
			Tag::String => PoolEntry::String { string_index: reader.read_u16()? },
			Tag::FieldRef => PoolEntry::FieldRef { class_index: reader.read_u16()?, name_and_type_index: reader.read_u16()? },
			Tag::MethodRef => PoolEntry::MethodRef { class_index: reader.read_u16()?, name_and_type_index: reader.read_u16()? },
			Tag::InterfaceMethodRef => PoolEntry::InterfaceMethodRef { class_index: reader.read_u16()?, name_and_type_index: reader.read_u16()? },
			Tag::NameAndType => PoolEntry::NameAndType { name_index: reader.read_u16()?, descriptor_index: reader.read_u16()? },
			Tag::MethodHandle => PoolEntry::MethodHandle { reference_kind: reader.read_u8()?, reference_index: reader.read_u16()? },
			Tag::MethodType => PoolEntry::MethodType { descriptor_index: reader.read_u16()? },
			Tag::Dynamic => PoolEntry::Dynamic { bootstrap_method_attr_index: reader.read_u16()?, name_and_type_index: reader.read_u16()? },
			Tag::InvokeDynamic => PoolEntry::InvokeDynamic { bootstrap_method_attr_index: reader.read_u16()?, name_and_type_index: reader.read_u16()? },
			Tag::Module => PoolEntry::Module { name_index: reader.read_u16()? },
			Tag::Package => PoolEntry::Package { name_index: reader.read_u16()? },
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
	Vacant,
	Entry(PoolEntry),
	/// The unusable index following a `Long` or `Double` entry.
	Phantom,
}

/// The constant pool of a class file.
///
/// Index `0` never holds an entry. An index may only be filled once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantPool {
	slots: Vec<Slot>,
}

impl ConstantPool {
	/// Creates an empty pool with the given `constant_pool_count`. Valid indices are `1..count`.
	pub fn new(count: u16) -> ConstantPool {
		ConstantPool { slots: vec![Slot::Vacant; count as usize] }
	}

	/// The `constant_pool_count`, one more than the largest valid index.
	pub fn count(&self) -> u16 {
		// constructed from an u16
		self.slots.len() as u16
	}

	/// Reads the `constant_pool_count` and `constant_pool` items, inserting every entry.
	///
	/// This doesn't check any references, see [`ConstantPool::validate_all_references`].
	pub fn read(reader: &mut impl ClassRead, version: Version) -> Result<ConstantPool> {
		let count = reader.read_u16()?;
		if count == 0 {
			return Err(Error::Container("constant_pool_count must be at least 1".to_owned()));
		}

		let mut pool = ConstantPool::new(count);

		let mut index = 1u16;
		while index < count {
			let byte = reader.read_u8()?;
			let tag = Tag::from_byte(byte)
				.ok_or_else(|| Error::pool_error(index, PoolError::UnknownTag(byte)))?;
			if version < tag.introduced_in() {
				return Err(Error::pool_error(index, PoolError::TagNotAllowed { tag, required: tag.introduced_in() }));
			}

			let entry = PoolEntry::read(reader, tag)
				.with_context(|| format!("while reading constant pool entry #{index} ({tag})"))?;
			pool.insert(index, entry)?;

			index += if tag.is_wide() { 2 } else { 1 };
		}

		trace!("read constant pool with count {count}");
		Ok(pool)
	}

	/// Puts an entry at an index.
	///
	/// Fails if the index is zero, out of range, or already filled. `Long` and `Double` entries also fill
	/// the following index, which must be in range and still free.
	pub fn insert(&mut self, index: u16, entry: PoolEntry) -> Result<()> {
		let count = self.count();
		if index == 0 {
			return Err(Error::pool_error(index, PoolError::ZeroIndex));
		}
		if index >= count {
			return Err(Error::pool_error(index, PoolError::OutOfRange { count }));
		}
		if self.slots[index as usize] != Slot::Vacant {
			return Err(Error::pool_error(index, PoolError::DuplicateInsertion));
		}

		let tag = entry.tag();
		if tag.is_wide() {
			let successor = index as usize + 1;
			match self.slots.get(successor) {
				None => return Err(Error::pool_error(index, PoolError::WideSuccessor { tag, reason: "beyond the constant pool count" })),
				Some(Slot::Vacant) => self.slots[successor] = Slot::Phantom,
				Some(_) => return Err(Error::pool_error(index, PoolError::WideSuccessor { tag, reason: "already occupied" })),
			}
		}

		self.slots[index as usize] = Slot::Entry(entry);
		Ok(())
	}

	/// Gets the raw entry at an index.
	pub fn entry(&self, index: u16) -> Result<&PoolEntry> {
		if index == 0 {
			return Err(Error::pool_error(index, PoolError::ZeroIndex));
		}
		match self.slots.get(index as usize) {
			None => Err(Error::pool_error(index, PoolError::OutOfRange { count: self.count() })),
			Some(Slot::Vacant) => Err(Error::pool_error(index, PoolError::Vacant)),
			Some(Slot::Phantom) => Err(Error::pool_error(index, PoolError::PhantomSlot)),
			Some(Slot::Entry(entry)) => Ok(entry),
		}
	}

	pub fn entries(&self) -> impl Iterator<Item=(u16, &PoolEntry)> {
		self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
			// the slots vec has at most u16::MAX entries
			Slot::Entry(entry) => Some((index as u16, entry)),
			_ => None,
		})
	}

	/// Walks every entry once and checks that what it refers to exists, has the right tag, and has valid content.
	///
	/// Errors name the index of the offending reference, with context naming the entry holding it.
	pub fn validate_all_references(&self, version: Version) -> Result<()> {
		for (index, slot) in self.slots.iter().enumerate().skip(1) {
			let index = index as u16;
			let entry = match slot {
				Slot::Entry(entry) => entry,
				Slot::Phantom => continue,
				Slot::Vacant => return Err(Error::pool_error(index, PoolError::Vacant)),
			};

			if entry.references().contains(&index) {
				return Err(Error::pool_error(index, PoolError::SelfReference));
			}

			self.validate_entry(index, entry, version)
				.with_context(|| format!("while validating constant pool entry #{index} ({})", entry.tag()))?;
		}
		Ok(())
	}

	fn validate_entry(&self, index: u16, entry: &PoolEntry, version: Version) -> Result<()> {
		match *entry {
			PoolEntry::Utf8(_) | PoolEntry::Integer(_) | PoolEntry::Float(_) | PoolEntry::Long(_) | PoolEntry::Double(_) => {},
			PoolEntry::Class { .. } => { self.resolve::<ClassName>(index)?; },
			PoolEntry::String { string_index } => { self.get_utf8(string_index)?; },
			PoolEntry::FieldRef { .. } => { self.resolve::<FieldRef>(index)?; },
			PoolEntry::MethodRef { .. } => { self.resolve::<MethodRef>(index)?; },
			PoolEntry::InterfaceMethodRef { .. } => { self.resolve::<InterfaceMethodRef>(index)?; },
			PoolEntry::NameAndType { .. } => {
				let name_and_type = self.resolve::<NameAndType>(index)?;
				// the descriptor is checked against the use of the entry, but it must be a descriptor at all
				let descriptor = name_and_type.descriptor.as_java_str();
				if descriptor.starts_with('(') {
					MethodDescriptor::parse(descriptor)
						.map_err(|kind| Error::pool_error(name_and_type.descriptor_index, kind))?;
				} else {
					FieldDescriptor::parse(descriptor)
						.map_err(|kind| Error::pool_error(name_and_type.descriptor_index, kind))?;
				}
			},
			PoolEntry::MethodHandle { reference_kind, reference_index } => {
				let handle = self.resolve::<MethodHandle>(index)?;
				if let MemberRef::Method(method) = &handle.member {
					if method.interface && !version.at_least(52)
						&& matches!(reference_kind, method_handle::INVOKE_STATIC | method_handle::INVOKE_SPECIAL)
					{
						return Err(Error::pool_error(reference_index, PoolError::InvalidContent(
							"method handles of kind invokeStatic or invokeSpecial may only refer to interface methods from version 52 on".to_owned()
						)));
					}
				}
			},
			PoolEntry::MethodType { .. } => { self.resolve::<MethodDescriptor>(index)?; },
			PoolEntry::Dynamic { .. } => { self.resolve::<DynamicRef>(index)?; },
			PoolEntry::InvokeDynamic { .. } => { self.resolve::<InvokeDynamicRef>(index)?; },
			PoolEntry::Module { name_index } | PoolEntry::Package { name_index } => { self.get_utf8(name_index)?; },
		}
		Ok(())
	}

	/// Checks that all `Dynamic` and `InvokeDynamic` entries refer to an existing bootstrap method.
	pub fn check_bootstrap_indices(&self, bootstrap_methods: u16) -> Result<()> {
		for (index, entry) in self.entries() {
			if let PoolEntry::Dynamic { bootstrap_method_attr_index, .. } | PoolEntry::InvokeDynamic { bootstrap_method_attr_index, .. } = *entry {
				if bootstrap_method_attr_index >= bootstrap_methods {
					return Err(Error::pool_error(index, PoolError::BootstrapIndex {
						index: bootstrap_method_attr_index,
						count: bootstrap_methods,
					}));
				}
			}
		}
		Ok(())
	}

	/// Resolves the entry at `index` into a typed value, failing if the entry has the wrong tag.
	pub fn resolve<T: Resolve>(&self, index: u16) -> Result<T> {
		let entry = self.entry(index)?;
		T::resolve(self, index, entry)
	}

	/// Like [`ConstantPool::resolve`], but maps index `0` to `None`.
	pub fn resolve_optional<T: Resolve>(&self, index: u16) -> Result<Option<T>> {
		if index == 0 {
			Ok(None)
		} else {
			self.resolve(index).map(Some)
		}
	}

	pub fn get_utf8(&self, index: u16) -> Result<&JavaStr> {
		match self.entry(index)? {
			PoolEntry::Utf8(string) => Ok(string),
			entry => Err(wrong_tag(index, "Utf8", entry)),
		}
	}

	pub fn get_class(&self, index: u16) -> Result<ClassName> {
		self.resolve(index)
	}
}

fn wrong_tag(index: u16, expected: &'static str, actual: &PoolEntry) -> Error {
	Error::pool_error(index, PoolError::WrongTag { expected, actual: actual.tag() })
}

/// Types that can be resolved from a constant pool entry.
pub trait Resolve: Sized {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self>;
}

pub(crate) fn checked<T>(index: u16, result: Result<T, PoolError>) -> Result<T> {
	result.map_err(|kind| Error::pool_error(index, kind))
}

impl Resolve for ClassName {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::Class { name_index } = *entry else {
			return Err(wrong_tag(index, "Class", entry));
		};
		checked(name_index, ClassName::try_from(pool.get_utf8(name_index)?))
	}
}

/// A `CONSTANT_String` entry.
impl Resolve for JavaString {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::String { string_index } = *entry else {
			return Err(wrong_tag(index, "String", entry));
		};
		Ok(pool.get_utf8(string_index)?.to_owned())
	}
}

/// A `CONSTANT_NameAndType` entry, with the name and the descriptor not yet interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAndType {
	pub name: JavaString,
	pub name_index: u16,
	pub descriptor: JavaString,
	pub descriptor_index: u16,
}

impl Resolve for NameAndType {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::NameAndType { name_index, descriptor_index } = *entry else {
			return Err(wrong_tag(index, "NameAndType", entry));
		};
		Ok(NameAndType {
			name: pool.get_utf8(name_index)?.to_owned(),
			name_index,
			descriptor: pool.get_utf8(descriptor_index)?.to_owned(),
			descriptor_index,
		})
	}
}

impl Resolve for FieldRef {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::FieldRef { class_index, name_and_type_index } = *entry else {
			return Err(wrong_tag(index, "Fieldref", entry));
		};
		let class = pool.resolve(class_index)?;
		let name_and_type: NameAndType = pool.resolve(name_and_type_index)?;
		Ok(FieldRef {
			class,
			name: checked(name_and_type.name_index, FieldName::try_from(name_and_type.name))?,
			descriptor: checked(name_and_type.descriptor_index, FieldDescriptor::parse(&name_and_type.descriptor))?,
		})
	}
}

fn resolve_method(pool: &ConstantPool, class_index: u16, name_and_type_index: u16, interface: bool) -> Result<MethodRef> {
	let class = pool.resolve(class_index)?;
	let name_and_type: NameAndType = pool.resolve(name_and_type_index)?;
	let name = checked(name_and_type.name_index, MethodName::try_from(name_and_type.name))?;
	let descriptor = checked(name_and_type.descriptor_index, MethodDescriptor::parse(&name_and_type.descriptor))?;

	if name.is_clinit() {
		return Err(Error::pool_error(name_and_type.name_index, PoolError::InvalidContent(
			"`<clinit>` can't be referred to".to_owned()
		)));
	}
	if name.is_init() && !descriptor.return_type().is_void() {
		return Err(Error::pool_error(name_and_type.descriptor_index, PoolError::InvalidContent(
			format!("`<init>` must return void, but has descriptor {descriptor}")
		)));
	}

	Ok(MethodRef { class, name, descriptor, interface })
}

/// A `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref` entry.
impl Resolve for MethodRef {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		match *entry {
			PoolEntry::MethodRef { class_index, name_and_type_index } => resolve_method(pool, class_index, name_and_type_index, false),
			PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } => resolve_method(pool, class_index, name_and_type_index, true),
			_ => Err(wrong_tag(index, "Methodref or InterfaceMethodref", entry)),
		}
	}
}

/// Only a `CONSTANT_InterfaceMethodref` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceMethodRef(pub MethodRef);

impl Resolve for InterfaceMethodRef {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::InterfaceMethodRef { class_index, name_and_type_index } = *entry else {
			return Err(wrong_tag(index, "InterfaceMethodref", entry));
		};
		resolve_method(pool, class_index, name_and_type_index, true).map(InterfaceMethodRef)
	}
}

/// The target of a method handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberRef {
	Field(FieldRef),
	Method(MethodRef),
}

/// The kinds of method handles, see the `reference_kind` item of `CONSTANT_MethodHandle_info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodHandleKind {
	GetField,
	GetStatic,
	PutField,
	PutStatic,
	InvokeVirtual,
	InvokeStatic,
	InvokeSpecial,
	NewInvokeSpecial,
	InvokeInterface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandle {
	pub kind: MethodHandleKind,
	pub member: MemberRef,
}

impl Resolve for MethodHandle {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::MethodHandle { reference_kind, reference_index } = *entry else {
			return Err(wrong_tag(index, "MethodHandle", entry));
		};

		let kind = match reference_kind {
			method_handle::GET_FIELD => MethodHandleKind::GetField,
			method_handle::GET_STATIC => MethodHandleKind::GetStatic,
			method_handle::PUT_FIELD => MethodHandleKind::PutField,
			method_handle::PUT_STATIC => MethodHandleKind::PutStatic,
			method_handle::INVOKE_VIRTUAL => MethodHandleKind::InvokeVirtual,
			method_handle::INVOKE_STATIC => MethodHandleKind::InvokeStatic,
			method_handle::INVOKE_SPECIAL => MethodHandleKind::InvokeSpecial,
			method_handle::NEW_INVOKE_SPECIAL => MethodHandleKind::NewInvokeSpecial,
			method_handle::INVOKE_INTERFACE => MethodHandleKind::InvokeInterface,
			kind => return Err(Error::pool_error(index, PoolError::InvalidContent(
				format!("method handle reference kind {kind} is not in the range 1 to 9")
			))),
		};

		let reference = pool.entry(reference_index)?;
		let member = match kind {
			MethodHandleKind::GetField | MethodHandleKind::GetStatic | MethodHandleKind::PutField | MethodHandleKind::PutStatic => {
				MemberRef::Field(FieldRef::resolve(pool, reference_index, reference)?)
			},
			MethodHandleKind::InvokeVirtual | MethodHandleKind::NewInvokeSpecial => {
				if !matches!(reference, PoolEntry::MethodRef { .. }) {
					return Err(wrong_tag(reference_index, "Methodref", reference));
				}
				MemberRef::Method(MethodRef::resolve(pool, reference_index, reference)?)
			},
			MethodHandleKind::InvokeStatic | MethodHandleKind::InvokeSpecial => {
				MemberRef::Method(MethodRef::resolve(pool, reference_index, reference)?)
			},
			MethodHandleKind::InvokeInterface => {
				MemberRef::Method(InterfaceMethodRef::resolve(pool, reference_index, reference)?.0)
			},
		};

		if let MemberRef::Method(method) = &member {
			let must_be_init = kind == MethodHandleKind::NewInvokeSpecial;
			if method.name.is_init() != must_be_init {
				return Err(Error::pool_error(index, PoolError::InvalidContent(if must_be_init {
					format!("method handle of kind newInvokeSpecial must refer to `<init>`, got {}", method.name)
				} else {
					format!("method handle of kind {kind:?} can't refer to `<init>`")
				})));
			}
		}

		Ok(MethodHandle { kind, member })
	}
}

/// A `CONSTANT_MethodType` entry.
impl Resolve for MethodDescriptor {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::MethodType { descriptor_index } = *entry else {
			return Err(wrong_tag(index, "MethodType", entry));
		};
		checked(descriptor_index, MethodDescriptor::parse(pool.get_utf8(descriptor_index)?))
	}
}

/// A `CONSTANT_Dynamic` entry: a constant computed by a bootstrap method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicRef {
	pub bootstrap_method: u16,
	pub name: FieldName,
	pub descriptor: FieldDescriptor,
}

impl Resolve for DynamicRef {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::Dynamic { bootstrap_method_attr_index, name_and_type_index } = *entry else {
			return Err(wrong_tag(index, "Dynamic", entry));
		};
		let name_and_type: NameAndType = pool.resolve(name_and_type_index)?;
		Ok(DynamicRef {
			bootstrap_method: bootstrap_method_attr_index,
			name: checked(name_and_type.name_index, FieldName::try_from(name_and_type.name))?,
			descriptor: checked(name_and_type.descriptor_index, FieldDescriptor::parse(&name_and_type.descriptor))?,
		})
	}
}

/// A `CONSTANT_InvokeDynamic` entry: a call site computed by a bootstrap method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeDynamicRef {
	pub bootstrap_method: u16,
	pub name: MethodName,
	pub descriptor: MethodDescriptor,
}

impl Resolve for InvokeDynamicRef {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		let PoolEntry::InvokeDynamic { bootstrap_method_attr_index, name_and_type_index } = *entry else {
			return Err(wrong_tag(index, "InvokeDynamic", entry));
		};
		let name_and_type: NameAndType = pool.resolve(name_and_type_index)?;
		let name = checked(name_and_type.name_index, MethodName::try_from(name_and_type.name))?;
		if name.is_init() || name.is_clinit() {
			return Err(Error::pool_error(name_and_type.name_index, PoolError::InvalidContent(
				format!("a call site can't be named {name}")
			)));
		}
		Ok(InvokeDynamicRef {
			bootstrap_method: bootstrap_method_attr_index,
			name,
			descriptor: checked(name_and_type.descriptor_index, MethodDescriptor::parse(&name_and_type.descriptor))?,
		})
	}
}

/// A value loadable with `ldc`, `ldc_w` or `ldc2_w`, or usable as a bootstrap method argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loadable {
	Integer(i32),
	/// The bits of a `float`.
	Float(u32),
	Long(i64),
	/// The bits of a `double`.
	Double(u64),
	String(JavaString),
	Class(ClassName),
	MethodHandle(MethodHandle),
	MethodType(MethodDescriptor),
	Dynamic(DynamicRef),
}

impl Resolve for Loadable {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		Ok(match *entry {
			PoolEntry::Integer(value) => Loadable::Integer(value),
			PoolEntry::Float(bits) => Loadable::Float(bits),
			PoolEntry::Long(value) => Loadable::Long(value),
			PoolEntry::Double(bits) => Loadable::Double(bits),
			PoolEntry::String { .. } => Loadable::String(JavaString::resolve(pool, index, entry)?),
			PoolEntry::Class { .. } => Loadable::Class(ClassName::resolve(pool, index, entry)?),
			PoolEntry::MethodHandle { .. } => Loadable::MethodHandle(MethodHandle::resolve(pool, index, entry)?),
			PoolEntry::MethodType { .. } => Loadable::MethodType(MethodDescriptor::resolve(pool, index, entry)?),
			PoolEntry::Dynamic { .. } => Loadable::Dynamic(DynamicRef::resolve(pool, index, entry)?),
			_ => return Err(wrong_tag(index, "a loadable constant", entry)),
		})
	}
}

impl Resolve for ConstantValue {
	fn resolve(pool: &ConstantPool, index: u16, entry: &PoolEntry) -> Result<Self> {
		Ok(match *entry {
			PoolEntry::Integer(value) => ConstantValue::Integer(value),
			PoolEntry::Float(bits) => ConstantValue::Float(bits),
			PoolEntry::Long(value) => ConstantValue::Long(value),
			PoolEntry::Double(bits) => ConstantValue::Double(bits),
			PoolEntry::String { .. } => ConstantValue::String(JavaString::resolve(pool, index, entry)?),
			_ => return Err(wrong_tag(index, "Integer, Float, Long, Double or String", entry)),
		})
	}
}

#[cfg(test)]
mod testing {
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::cursor::ByteCursor;
	use crate::error::{Error, PoolError, Result};
	use crate::pool::{ConstantPool, Loadable, MethodHandle, MethodHandleKind, PoolEntry, Tag};
	use crate::tree::field::FieldRef;
	use crate::tree::method::MethodRef;
	use crate::tree::names::ClassName;
	use crate::version::Version;

	fn utf8(s: &str) -> PoolEntry {
		PoolEntry::Utf8(JavaStr::from_str(s).to_owned())
	}

	fn pool_of(entries: Vec<PoolEntry>) -> Result<ConstantPool> {
		let count = 1 + entries.iter().map(|e| if e.tag().is_wide() { 2 } else { 1 }).sum::<u16>();
		let mut pool = ConstantPool::new(count);
		let mut index = 1;
		for entry in entries {
			let width = if entry.tag().is_wide() { 2 } else { 1 };
			pool.insert(index, entry)?;
			index += width;
		}
		Ok(pool)
	}

	fn pool_kind(result: Result<impl std::fmt::Debug>) -> (u16, PoolError) {
		let error = result.unwrap_err();
		let (index, kind) = error.pool().unwrap_or_else(|| panic!("not a pool error: {error:?}"));
		(index, kind.clone())
	}

	#[test]
	fn empty_pool() {
		let pool = ConstantPool::new(1);
		assert_eq!(pool.entries().count(), 0);
		assert_eq!(pool_kind(pool.entry(1)), (1, PoolError::OutOfRange { count: 1 }));
		assert_eq!(pool_kind(pool.entry(0)), (0, PoolError::ZeroIndex));
		assert!(pool.validate_all_references(Version::V1_8).is_ok());
	}

	#[test]
	fn forward_references() -> Result<()> {
		let pool = pool_of(vec![
			PoolEntry::Class { name_index: 2 },
			utf8("java/lang/Object"),
		])?;
		pool.validate_all_references(Version::V1_8)?;
		assert_eq!(pool.get_class(1)?, ClassName::java_lang_object());
		Ok(())
	}

	#[test]
	fn phantom_slot() -> Result<()> {
		let pool = pool_of(vec![PoolEntry::Long(7), PoolEntry::Integer(3)])?;
		assert_eq!(pool.count(), 4);
		assert_eq!(pool.entry(1)?, &PoolEntry::Long(7));
		assert_eq!(pool_kind(pool.entry(2)), (2, PoolError::PhantomSlot));
		assert_eq!(pool.entry(3)?, &PoolEntry::Integer(3));
		assert_eq!(pool_kind(pool.resolve::<Loadable>(2)), (2, PoolError::PhantomSlot));
		Ok(())
	}

	#[test]
	fn insertion_rules() {
		let mut pool = ConstantPool::new(4);
		assert!(pool.insert(1, PoolEntry::Integer(1)).is_ok());
		assert_eq!(pool_kind(pool.insert(1, PoolEntry::Integer(2))), (1, PoolError::DuplicateInsertion));
		assert_eq!(pool_kind(pool.insert(0, PoolEntry::Integer(2))), (0, PoolError::ZeroIndex));
		assert_eq!(pool_kind(pool.insert(4, PoolEntry::Integer(2))), (4, PoolError::OutOfRange { count: 4 }));
		assert_eq!(
			pool_kind(pool.insert(3, PoolEntry::Double(0))),
			(3, PoolError::WideSuccessor { tag: Tag::Double, reason: "beyond the constant pool count" })
		);

		let mut pool = ConstantPool::new(4);
		assert!(pool.insert(2, PoolEntry::Integer(1)).is_ok());
		assert_eq!(
			pool_kind(pool.insert(1, PoolEntry::Long(0))),
			(1, PoolError::WideSuccessor { tag: Tag::Long, reason: "already occupied" })
		);
	}

	#[test]
	fn self_reference() -> Result<()> {
		let pool = pool_of(vec![PoolEntry::Class { name_index: 1 }])?;
		assert_eq!(pool_kind(pool.validate_all_references(Version::V1_8)), (1, PoolError::SelfReference));
		Ok(())
	}

	#[test]
	fn wrong_tag() -> Result<()> {
		let pool = pool_of(vec![PoolEntry::Class { name_index: 2 }, PoolEntry::Integer(5)])?;
		assert_eq!(
			pool_kind(pool.validate_all_references(Version::V1_8)),
			(2, PoolError::WrongTag { expected: "Utf8", actual: Tag::Integer })
		);
		Ok(())
	}

	#[test]
	fn vacant_slot_fails_validation() -> Result<()> {
		let mut pool = ConstantPool::new(3);
		pool.insert(1, PoolEntry::Integer(1))?;
		assert_eq!(pool_kind(pool.validate_all_references(Version::V1_8)), (2, PoolError::Vacant));
		Ok(())
	}

	#[test]
	fn member_references() -> Result<()> {
		let pool = pool_of(vec![
			/* 1 */ PoolEntry::Class { name_index: 2 },
			/* 2 */ utf8("a/B"),
			/* 3 */ PoolEntry::NameAndType { name_index: 4, descriptor_index: 5 },
			/* 4 */ utf8("count"),
			/* 5 */ utf8("J"),
			/* 6 */ PoolEntry::FieldRef { class_index: 1, name_and_type_index: 3 },
			/* 7 */ PoolEntry::NameAndType { name_index: 8, descriptor_index: 9 },
			/* 8 */ utf8("<init>"),
			/* 9 */ utf8("(I)V"),
			/* 10 */ PoolEntry::MethodRef { class_index: 1, name_and_type_index: 7 },
			/* 11 */ PoolEntry::MethodHandle { reference_kind: 8, reference_index: 10 },
		])?;
		pool.validate_all_references(Version::V1_8)?;

		let field: FieldRef = pool.resolve(6)?;
		assert_eq!(field.name.as_java_str(), JavaStr::from_str("count"));
		assert_eq!(field.descriptor.to_string(), "J");

		let method: MethodRef = pool.resolve(10)?;
		assert!(method.name.is_init());
		assert_eq!(method.descriptor.parameter_slots(), 1);

		let handle: MethodHandle = pool.resolve(11)?;
		assert_eq!(handle.kind, MethodHandleKind::NewInvokeSpecial);

		assert_eq!(
			pool_kind(pool.resolve::<MethodRef>(6)),
			(6, PoolError::WrongTag { expected: "Methodref or InterfaceMethodref", actual: Tag::FieldRef })
		);
		Ok(())
	}

	#[test]
	fn init_must_return_void() -> Result<()> {
		let pool = pool_of(vec![
			PoolEntry::Class { name_index: 2 },
			utf8("a/B"),
			PoolEntry::NameAndType { name_index: 4, descriptor_index: 5 },
			utf8("<init>"),
			utf8("()I"),
			PoolEntry::MethodRef { class_index: 1, name_and_type_index: 3 },
		])?;
		assert!(matches!(pool_kind(pool.validate_all_references(Version::V1_8)), (5, PoolError::InvalidContent(_))));
		Ok(())
	}

	#[test]
	fn method_handle_kinds() -> Result<()> {
		let pool = pool_of(vec![
			PoolEntry::Class { name_index: 2 },
			utf8("a/B"),
			PoolEntry::NameAndType { name_index: 4, descriptor_index: 5 },
			utf8("run"),
			utf8("()V"),
			PoolEntry::MethodRef { class_index: 1, name_and_type_index: 3 },
			PoolEntry::MethodHandle { reference_kind: 10, reference_index: 6 },
		])?;
		assert!(matches!(pool_kind(pool.validate_all_references(Version::V1_8)), (7, PoolError::InvalidContent(_))));

		let pool = pool_of(vec![
			PoolEntry::Class { name_index: 2 },
			utf8("a/B"),
			PoolEntry::NameAndType { name_index: 4, descriptor_index: 5 },
			utf8("run"),
			utf8("()V"),
			PoolEntry::MethodRef { class_index: 1, name_and_type_index: 3 },
			PoolEntry::MethodHandle { reference_kind: 1, reference_index: 6 },
		])?;
		assert_eq!(
			pool_kind(pool.validate_all_references(Version::V1_8)),
			(6, PoolError::WrongTag { expected: "Fieldref", actual: Tag::MethodRef })
		);
		Ok(())
	}

	#[test]
	fn read_from_bytes() -> Result<()> {
		let bytes = [
			0, 5, // count
			1, 0, 3, b'a', b'/', b'B', // #1 Utf8
			7, 0, 1, // #2 Class
			6, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18, // #3 Double, #4 phantom
		];
		let mut cursor = ByteCursor::new(&bytes);
		let pool = ConstantPool::read(&mut cursor, Version::V1_8)?;
		pool.validate_all_references(Version::V1_8)?;
		assert_eq!(pool.get_class(2)?.as_java_str(), JavaStr::from_str("a/B"));
		assert_eq!(pool.resolve::<Loadable>(3)?, Loadable::Double(std::f64::consts::PI.to_bits()));
		assert_eq!(pool_kind(pool.entry(4)), (4, PoolError::PhantomSlot));
		Ok(())
	}

	#[test]
	fn read_rejects() {
		let unknown_tag = [0, 2, 2, 0, 0];
		let error = ConstantPool::read(&mut ByteCursor::new(&unknown_tag), Version::V1_8).unwrap_err();
		assert_eq!(error.pool(), Some((1, &PoolError::UnknownTag(2))));

		let too_new = [0, 2, 16, 0, 1];
		let error = ConstantPool::read(&mut ByteCursor::new(&too_new), Version::V1_6).unwrap_err();
		assert_eq!(error.pool(), Some((1, &PoolError::TagNotAllowed { tag: Tag::MethodType, required: Version::V1_7 })));

		let bad_utf8 = [0, 2, 1, 0, 1, 0b1100_0010];
		let error = ConstantPool::read(&mut ByteCursor::new(&bad_utf8), Version::V1_8).unwrap_err();
		assert!(matches!(error.root(), Error::Encoding(_)));

		let truncated = [0, 3, 3, 0, 0];
		let error = ConstantPool::read(&mut ByteCursor::new(&truncated), Version::V1_8).unwrap_err();
		assert!(matches!(error.root(), Error::Truncated { .. }));
	}

	#[test]
	fn bootstrap_indices() -> Result<()> {
		let pool = pool_of(vec![
			PoolEntry::NameAndType { name_index: 2, descriptor_index: 3 },
			utf8("run"),
			utf8("()Ljava/lang/Runnable;"),
			PoolEntry::InvokeDynamic { bootstrap_method_attr_index: 1, name_and_type_index: 1 },
		])?;
		pool.validate_all_references(Version::V1_8)?;
		assert!(pool.check_bootstrap_indices(2).is_ok());
		assert_eq!(pool_kind(pool.check_bootstrap_indices(1)), (4, PoolError::BootstrapIndex { index: 1, count: 1 }));
		Ok(())
	}
}
