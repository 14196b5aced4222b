#![allow(dead_code)]

use bean::class_constants::{opcode, pool as tag};
use bean::Version;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_SUPER: u16 = 0x0020;
pub const ACC_ABSTRACT: u16 = 0x0400;

/// An attribute as it will be written: the index of its name and its contents.
pub type Attribute = (u16, Vec<u8>);

/// Writes the constant pool, handing out the indices of the entries added.
#[derive(Debug)]
pub struct PoolBuilder {
	bytes: Vec<u8>,
	next: u16,
}

impl PoolBuilder {
	pub fn new() -> PoolBuilder {
		PoolBuilder { bytes: Vec::new(), next: 1 }
	}

	fn add(&mut self, entry: &[u8], wide: bool) -> u16 {
		let index = self.next;
		self.bytes.extend(entry);
		self.next += if wide { 2 } else { 1 };
		index
	}

	pub fn count(&self) -> u16 {
		self.next
	}

	pub fn utf8(&mut self, string: &str) -> u16 {
		let mut entry = vec![tag::UTF8];
		entry.extend((string.len() as u16).to_be_bytes());
		entry.extend(string.as_bytes());
		self.add(&entry, false)
	}

	pub fn integer(&mut self, value: i32) -> u16 {
		let mut entry = vec![tag::INTEGER];
		entry.extend(value.to_be_bytes());
		self.add(&entry, false)
	}

	pub fn long(&mut self, value: i64) -> u16 {
		let mut entry = vec![tag::LONG];
		entry.extend(value.to_be_bytes());
		self.add(&entry, true)
	}

	pub fn class(&mut self, name: &str) -> u16 {
		let name = self.utf8(name);
		let mut entry = vec![tag::CLASS];
		entry.extend(name.to_be_bytes());
		self.add(&entry, false)
	}

	pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
		let name = self.utf8(name);
		let descriptor = self.utf8(descriptor);
		let mut entry = vec![tag::NAME_AND_TYPE];
		entry.extend(name.to_be_bytes());
		entry.extend(descriptor.to_be_bytes());
		self.add(&entry, false)
	}

	pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
		let class = self.class(class);
		let name_and_type = self.name_and_type(name, descriptor);
		let mut entry = vec![tag::METHOD_REF];
		entry.extend(class.to_be_bytes());
		entry.extend(name_and_type.to_be_bytes());
		self.add(&entry, false)
	}

	pub fn method_handle(&mut self, kind: u8, reference: u16) -> u16 {
		let mut entry = vec![tag::METHOD_HANDLE, kind];
		entry.extend(reference.to_be_bytes());
		self.add(&entry, false)
	}

	pub fn invoke_dynamic(&mut self, bootstrap_method: u16, name: &str, descriptor: &str) -> u16 {
		let name_and_type = self.name_and_type(name, descriptor);
		let mut entry = vec![tag::INVOKE_DYNAMIC];
		entry.extend(bootstrap_method.to_be_bytes());
		entry.extend(name_and_type.to_be_bytes());
		self.add(&entry, false)
	}
}

/// The parts of a `Code` attribute.
#[derive(Debug, Clone)]
pub struct Code {
	pub max_stack: u16,
	pub max_locals: u16,
	pub bytes: Vec<u8>,
	/// `(start, end, handler, catch type)`
	pub exception_table: Vec<(u16, u16, u16, u16)>,
	pub attributes: Vec<Attribute>,
}

impl Code {
	pub fn new(max_stack: u16, max_locals: u16, bytes: &[u8]) -> Code {
		Code {
			max_stack,
			max_locals,
			bytes: bytes.to_vec(),
			exception_table: Vec::new(),
			attributes: Vec::new(),
		}
	}
}

/// Writes a class file from parts, without checking any of them.
#[derive(Debug)]
pub struct ClassBuilder {
	pub version: Version,
	pub pool: PoolBuilder,
	pub access: u16,
	pub this_class: u16,
	pub super_class: u16,
	pub interfaces: Vec<u16>,
	fields: Vec<Vec<u8>>,
	methods: Vec<Vec<u8>>,
	attributes: Vec<Attribute>,
	pub trailing: Vec<u8>,
}

impl ClassBuilder {
	/// A public class extending `java/lang/Object`.
	pub fn new(version: Version, name: &str) -> ClassBuilder {
		let mut pool = PoolBuilder::new();
		let this_class = pool.class(name);
		let super_class = pool.class("java/lang/Object");
		ClassBuilder {
			version,
			pool,
			access: ACC_PUBLIC | ACC_SUPER,
			this_class,
			super_class,
			interfaces: Vec::new(),
			fields: Vec::new(),
			methods: Vec::new(),
			attributes: Vec::new(),
			trailing: Vec::new(),
		}
	}

	fn member(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> Vec<u8> {
		let mut member = Vec::new();
		member.extend(access.to_be_bytes());
		member.extend(self.pool.utf8(name).to_be_bytes());
		member.extend(self.pool.utf8(descriptor).to_be_bytes());
		write_attributes(&mut member, &attributes);
		member
	}

	pub fn field(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> &mut ClassBuilder {
		let field = self.member(access, name, descriptor, attributes);
		self.fields.push(field);
		self
	}

	pub fn method(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<Attribute>) -> &mut ClassBuilder {
		let method = self.member(access, name, descriptor, attributes);
		self.methods.push(method);
		self
	}

	/// Adds a method whose only attribute is `code`.
	pub fn method_with_code(&mut self, access: u16, name: &str, descriptor: &str, code: Code) -> &mut ClassBuilder {
		let code = self.code(code);
		self.method(access, name, descriptor, vec![code])
	}

	pub fn attribute(&mut self, attribute: Attribute) -> &mut ClassBuilder {
		self.attributes.push(attribute);
		self
	}

	pub fn code(&mut self, code: Code) -> Attribute {
		let mut data = Vec::new();
		data.extend(code.max_stack.to_be_bytes());
		data.extend(code.max_locals.to_be_bytes());
		data.extend((code.bytes.len() as u32).to_be_bytes());
		data.extend(&code.bytes);
		data.extend((code.exception_table.len() as u16).to_be_bytes());
		for (start, end, handler, catch_type) in code.exception_table {
			data.extend(start.to_be_bytes());
			data.extend(end.to_be_bytes());
			data.extend(handler.to_be_bytes());
			data.extend(catch_type.to_be_bytes());
		}
		write_attributes(&mut data, &code.attributes);
		(self.pool.utf8("Code"), data)
	}

	/// A `LineNumberTable` attribute with `(start, line)` entries.
	pub fn line_number_table(&mut self, entries: &[(u16, u16)]) -> Attribute {
		let mut data = Vec::new();
		data.extend((entries.len() as u16).to_be_bytes());
		for (start, line) in entries {
			data.extend(start.to_be_bytes());
			data.extend(line.to_be_bytes());
		}
		(self.pool.utf8("LineNumberTable"), data)
	}

	pub fn source_file(&mut self, name: &str) -> Attribute {
		let name = self.pool.utf8(name);
		(self.pool.utf8("SourceFile"), name.to_be_bytes().to_vec())
	}

	/// A `BootstrapMethods` attribute with one method without arguments.
	pub fn bootstrap_methods(&mut self, handle: u16) -> Attribute {
		let mut data = Vec::new();
		data.extend(1u16.to_be_bytes());
		data.extend(handle.to_be_bytes());
		data.extend(0u16.to_be_bytes());
		(self.pool.utf8("BootstrapMethods"), data)
	}

	pub fn build(&self) -> Vec<u8> {
		let mut data = Vec::new();
		data.extend(0xCAFE_BABEu32.to_be_bytes());
		data.extend(self.version.minor.to_be_bytes());
		data.extend(self.version.major.to_be_bytes());
		data.extend(self.pool.count().to_be_bytes());
		data.extend(&self.pool.bytes);
		data.extend(self.access.to_be_bytes());
		data.extend(self.this_class.to_be_bytes());
		data.extend(self.super_class.to_be_bytes());
		data.extend((self.interfaces.len() as u16).to_be_bytes());
		for interface in &self.interfaces {
			data.extend(interface.to_be_bytes());
		}
		for members in [&self.fields, &self.methods] {
			data.extend((members.len() as u16).to_be_bytes());
			for member in members {
				data.extend(member);
			}
		}
		write_attributes(&mut data, &self.attributes);
		data.extend(&self.trailing);
		data
	}
}

fn write_attributes(data: &mut Vec<u8>, attributes: &[Attribute]) {
	data.extend((attributes.len() as u16).to_be_bytes());
	for (name, contents) in attributes {
		data.extend(name.to_be_bytes());
		data.extend((contents.len() as u32).to_be_bytes());
		data.extend(contents);
	}
}

/// The `<init>` every class compiled by javac has, calling `super()`.
pub fn add_constructor(class: &mut ClassBuilder) {
	let super_init = class.pool.method_ref("java/lang/Object", "<init>", "()V");
	let [high, low] = super_init.to_be_bytes();
	let code = Code::new(1, 1, &[
		opcode::ALOAD_0,
		opcode::INVOKESPECIAL, high, low,
		opcode::RETURN,
	]);
	class.method_with_code(ACC_PUBLIC, "<init>", "()V", code);
}
