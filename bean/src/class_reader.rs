//! Reading a class file into a [`TypeInformation`], verifying the code of every method on the way.

use indexmap::{IndexMap, IndexSet};
use java_string::JavaString;
use log::{debug, trace};
use crate::class_constants::{self, attribute};
use crate::cursor::{ByteCursor, ClassRead};
use crate::error::{bail_structure, Error, Result, ResultContext};
use crate::pool::{checked, ConstantPool, Loadable, MethodHandle, NameAndType};
use crate::tree::access::{ClassAccess, FieldAccess, MethodAccess};
use crate::tree::class::{BootstrapMethod, EnclosingMethod, InnerClass, TypeInformation};
use crate::tree::descriptor::{FieldDescriptor, MethodDescriptor};
use crate::tree::field::{ConstantValue, FieldInformation};
use crate::tree::method::MethodInformation;
use crate::tree::names::{ClassName, FieldName, MethodName};
use crate::verifier::code::read_code;
use crate::verifier::context::MethodContext;
use crate::version::Version;
use crate::{OptionExpansion, ReadOptions};

pub(crate) mod attributes;

use attributes::{read_attribute, skip_contents, Location};

/// Reads and verifies a complete class file. The data must end exactly after the class attributes.
pub(crate) fn read(data: &[u8], options: &ReadOptions) -> Result<TypeInformation> {
	let mut reader = ByteCursor::new(data);
	let reader = &mut reader;

	let magic = reader.read_u32()?;
	if magic != class_constants::MAGIC {
		return Err(Error::Container(format!("wrong magic: got {magic:#x}, expected 0xCAFEBABE")));
	}

	let minor = reader.read_u16()?;
	let major = reader.read_u16()?;
	let version = Version::new(major, minor);
	let release = version.release()?;
	trace!("reading class file of version {version} ({release:?})");

	let pool_ = ConstantPool::read(reader, version)?;
	let pool = &pool_;
	pool.validate_all_references(version)?;

	let access: ClassAccess = reader.read_u16()?.into();
	access.check(version)?;

	let name = pool.get_class(reader.read_u16()?)?;
	if name.is_array() {
		bail_structure!("this_class must not be an array class, got {name}");
	}

	let super_class = pool.resolve_optional::<ClassName>(reader.read_u16()?)?;
	check_super_class(&name, super_class.as_ref(), &access)?;

	let mut interfaces = IndexSet::new();
	for _ in 0..reader.read_u16()? {
		let interface = pool.get_class(reader.read_u16()?)?;
		if !interfaces.insert(interface.clone()) {
			bail_structure!("interface {interface} is listed twice");
		}
	}

	let mut fields = IndexMap::new();
	for _ in 0..reader.read_u16()? {
		let field = read_field(reader, pool, &access, version)?;
		let key = (field.name.clone(), field.descriptor.clone());
		if fields.contains_key(&key) {
			bail_structure!("field {} {} is declared twice", key.0, key.1);
		}
		fields.insert(key, field);
	}

	let mut methods = IndexMap::new();
	for _ in 0..reader.read_u16()? {
		let method = read_method(reader, pool, &name, &access, version, options)?;
		let key = (method.name.clone(), method.descriptor.clone());
		if methods.contains_key(&key) {
			bail_structure!("method {} {} is declared twice", key.0, key.1);
		}
		methods.insert(key, method);
	}

	let mut class = TypeInformation {
		version,
		access,
		name,
		super_class,
		interfaces,
		fields,
		methods,
		source_file: None,
		signature: None,
		inner_classes: Vec::new(),
		enclosing_method: None,
		bootstrap_methods: Vec::new(),
		nest_host: None,
		nest_members: Vec::new(),
		permitted_subclasses: Vec::new(),
		is_synthetic: false,
		is_deprecated: false,
	};

	read_class_attributes(reader, pool, &mut class)
		.with_context(|| format!("while reading the attributes of class {}", class.name))?;

	if !reader.is_empty() {
		bail_structure!("there are {} bytes after the end of the class file", reader.remaining());
	}

	// invokedynamic and dynamic constants need a BootstrapMethods attribute with enough entries
	let bootstrap_methods = u16::try_from(class.bootstrap_methods.len())
		.map_err(|_| Error::Structure("too many bootstrap methods".to_owned()))?;
	pool.check_bootstrap_indices(bootstrap_methods)?;

	debug!("read class {} with {} fields and {} methods", class.name, class.fields.len(), class.methods.len());
	Ok(class)
}

fn check_super_class(name: &ClassName, super_class: Option<&ClassName>, access: &ClassAccess) -> Result<()> {
	let is_object = *name == ClassName::java_lang_object();
	match super_class {
		None if is_object || access.is_module => Ok(()),
		None => bail_structure!("class {name} has no super class, only java/lang/Object can have none"),
		Some(super_class) if is_object => bail_structure!("java/lang/Object can't have a super class, got {super_class}"),
		Some(super_class) if super_class.is_array() => bail_structure!("the super class of {name} can't be the array class {super_class}"),
		Some(super_class) if access.is_interface && *super_class != ClassName::java_lang_object() => {
			bail_structure!("the super class of interface {name} must be java/lang/Object, got {super_class}")
		},
		Some(_) => Ok(()),
	}
}

fn read_field(reader: &mut ByteCursor, pool: &ConstantPool, class_access: &ClassAccess, version: Version) -> Result<FieldInformation> {
	let access: FieldAccess = reader.read_u16()?.into();
	let name_index = reader.read_u16()?;
	let name = checked(name_index, FieldName::try_from(pool.get_utf8(name_index)?))?;
	let descriptor_index = reader.read_u16()?;
	let descriptor = checked(descriptor_index, FieldDescriptor::parse(pool.get_utf8(descriptor_index)?))?;

	let mut field = FieldInformation {
		access,
		name,
		descriptor,
		constant_value: None,
		signature: None,
		is_synthetic: false,
		is_deprecated: false,
	};

	field.access.check(class_access)
		.and_then(|()| read_field_attributes(reader, pool, version, &mut field))
		.with_context(|| format!("while reading field {} {}", field.name, field.descriptor))?;

	Ok(field)
}

fn read_field_attributes(reader: &mut ByteCursor, pool: &ConstantPool, version: Version, field: &mut FieldInformation) -> Result<()> {
	for _ in 0..reader.read_u16()? {
		let Some((name, mut attribute)) = read_attribute(reader, pool, Location::Field, version)? else {
			continue;
		};
		match name {
			attribute::CONSTANT_VALUE => {
				let constant_value: ConstantValue = pool.resolve(attribute.read_u16()?)?;
				if !constant_value.fits(&field.descriptor) {
					bail_structure!("constant value {constant_value:?} doesn't fit descriptor {}", field.descriptor);
				}
				field.constant_value.insert_if_empty(constant_value)
					.with_context(|| "only one ConstantValue attribute is allowed")?;
			},
			attribute::SIGNATURE => {
				let signature = pool.get_utf8(attribute.read_u16()?)?.to_owned();
				field.signature.insert_if_empty(signature)
					.with_context(|| "only one Signature attribute is allowed")?;
			},
			attribute::SYNTHETIC => field.is_synthetic = true,
			attribute::DEPRECATED => field.is_deprecated = true,
			_ => skip_contents(&mut attribute)?,
		}
		attribute.finish(format_args!("{name} attribute"))?;
	}
	Ok(())
}

fn read_method(
	reader: &mut ByteCursor,
	pool: &ConstantPool,
	class: &ClassName,
	class_access: &ClassAccess,
	version: Version,
	options: &ReadOptions,
) -> Result<MethodInformation> {
	let access: MethodAccess = reader.read_u16()?.into();
	let name_index = reader.read_u16()?;
	let name = checked(name_index, MethodName::try_from(pool.get_utf8(name_index)?))?;
	let descriptor_index = reader.read_u16()?;
	let descriptor = checked(descriptor_index, MethodDescriptor::parse(pool.get_utf8(descriptor_index)?))?;

	check_method(&name, &descriptor, &access, class_access, version)
		.with_context(|| format!("while reading method {name} {descriptor} of class {class}"))?;

	let method_context = MethodContext::new(version, class.clone(), name.clone(), descriptor.clone(), &access);

	let mut method = MethodInformation {
		access,
		name,
		descriptor,
		code: None,
		exceptions: Vec::new(),
		signature: None,
		is_synthetic: false,
		is_deprecated: false,
	};
	read_method_attributes(reader, pool, version, &method_context, options, &mut method)
		.with_context(|| format!("while reading method {} {} of class {class}", method.name, method.descriptor))?;

	trace!("read method {} {}", method.name, method.descriptor);
	Ok(method)
}

fn read_method_attributes(
	reader: &mut ByteCursor,
	pool: &ConstantPool,
	version: Version,
	method_context: &MethodContext,
	options: &ReadOptions,
	method: &mut MethodInformation,
) -> Result<()> {
	let mut exceptions = None;

	for _ in 0..reader.read_u16()? {
		let Some((name, mut attribute)) = read_attribute(reader, pool, Location::Method, version)? else {
			continue;
		};
		match name {
			attribute::CODE => {
				if !method.access.has_code() {
					bail_structure!("abstract and native methods can't have a Code attribute");
				}
				let code = read_code(&mut attribute, pool, method_context, options.keep_code_bytes)?;
				method.code.insert_if_empty(code)
					.with_context(|| "only one Code attribute is allowed")?;
			},
			attribute::EXCEPTIONS => {
				let classes = attribute.read_vec(
					|r| r.read_u16_as_usize(),
					|r| pool.get_class(r.read_u16()?),
				)?;
				exceptions.insert_if_empty(classes)
					.with_context(|| "only one Exceptions attribute is allowed")?;
			},
			attribute::SIGNATURE => {
				let signature = pool.get_utf8(attribute.read_u16()?)?.to_owned();
				method.signature.insert_if_empty(signature)
					.with_context(|| "only one Signature attribute is allowed")?;
			},
			attribute::SYNTHETIC => method.is_synthetic = true,
			attribute::DEPRECATED => method.is_deprecated = true,
			_ => skip_contents(&mut attribute)?,
		}
		attribute.finish(format_args!("{name} attribute"))?;
	}

	if method.access.has_code() && method.code.is_none() {
		bail_structure!("a method that is neither abstract nor native must have a Code attribute");
	}
	method.exceptions = exceptions.unwrap_or_default();
	Ok(())
}

fn check_method(name: &MethodName, descriptor: &MethodDescriptor, access: &MethodAccess, class_access: &ClassAccess, version: Version) -> Result<()> {
	access.check(name, class_access, version)?;

	if (name.is_init() || name.is_clinit()) && !descriptor.return_type().is_void() {
		bail_structure!("{name} must return void, but has descriptor {descriptor}");
	}
	if name.is_clinit() && version.at_least(51) && !descriptor.parameters().is_empty() {
		bail_structure!("<clinit> can't take parameters, but has descriptor {descriptor}");
	}
	// `this` takes a slot too
	let slots = descriptor.parameter_slots() as u32 + if access.is_static { 0 } else { 1 };
	if slots > 255 {
		bail_structure!("the parameters of method {name} {descriptor} take {slots} slots, at most 255 are allowed");
	}
	Ok(())
}

fn read_bootstrap_method(reader: &mut ByteCursor, pool: &ConstantPool) -> Result<BootstrapMethod> {
	let handle: MethodHandle = pool.resolve(reader.read_u16()?)?;
	let arguments = reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| pool.resolve::<Loadable>(r.read_u16()?),
	)?;
	Ok(BootstrapMethod { handle, arguments })
}

fn read_class_attributes(reader: &mut ByteCursor, pool: &ConstantPool, class: &mut TypeInformation) -> Result<()> {
	let mut inner_classes = None;
	let mut bootstrap_methods = None;
	let mut nest_members = None;
	let mut permitted_subclasses = None;

	for _ in 0..reader.read_u16()? {
		let Some((name, mut attribute)) = read_attribute(reader, pool, Location::Class, class.version)? else {
			continue;
		};
		match name {
			attribute::SOURCE_FILE => {
				let source_file = pool.get_utf8(attribute.read_u16()?)?.to_owned();
				class.source_file.insert_if_empty(source_file)
					.with_context(|| "only one SourceFile attribute is allowed")?;
			},
			attribute::SIGNATURE => {
				let signature = pool.get_utf8(attribute.read_u16()?)?.to_owned();
				class.signature.insert_if_empty(signature)
					.with_context(|| "only one Signature attribute is allowed")?;
			},
			attribute::INNER_CLASSES => {
				let classes = attribute.read_vec(
					|r| r.read_u16_as_usize(),
					|r| {
						Ok(InnerClass {
							inner_class: pool.get_class(r.read_u16()?)?,
							outer_class: pool.resolve_optional(r.read_u16()?)?,
							inner_name: optional_utf8(pool, r.read_u16()?)?,
							flags: r.read_u16()?,
						})
					},
				)?;
				inner_classes.insert_if_empty(classes)
					.with_context(|| "only one InnerClasses attribute is allowed")?;
			},
			attribute::ENCLOSING_METHOD => {
				let enclosing_class = pool.get_class(attribute.read_u16()?)?;
				let method = match pool.resolve_optional::<NameAndType>(attribute.read_u16()?)? {
					Some(name_and_type) => Some((
						checked(name_and_type.name_index, MethodName::try_from(name_and_type.name))?,
						checked(name_and_type.descriptor_index, MethodDescriptor::parse(&name_and_type.descriptor))?,
					)),
					None => None,
				};
				class.enclosing_method.insert_if_empty(EnclosingMethod { class: enclosing_class, method })
					.with_context(|| "only one EnclosingMethod attribute is allowed")?;
			},
			attribute::BOOTSTRAP_METHODS => {
				let methods = attribute.read_vec(
					|r| r.read_u16_as_usize(),
					|r| read_bootstrap_method(r, pool),
				)?;
				bootstrap_methods.insert_if_empty(methods)
					.with_context(|| "only one BootstrapMethods attribute is allowed")?;
			},
			attribute::NEST_HOST => {
				let host = pool.get_class(attribute.read_u16()?)?;
				class.nest_host.insert_if_empty(host)
					.with_context(|| "only one NestHost attribute is allowed")?;
			},
			attribute::NEST_MEMBERS => {
				let members = attribute.read_vec(
					|r| r.read_u16_as_usize(),
					|r| pool.get_class(r.read_u16()?),
				)?;
				nest_members.insert_if_empty(members)
					.with_context(|| "only one NestMembers attribute is allowed")?;
			},
			attribute::PERMITTED_SUBCLASSES => {
				let subclasses = attribute.read_vec(
					|r| r.read_u16_as_usize(),
					|r| pool.get_class(r.read_u16()?),
				)?;
				permitted_subclasses.insert_if_empty(subclasses)
					.with_context(|| "only one PermittedSubclasses attribute is allowed")?;
			},
			attribute::SYNTHETIC => class.is_synthetic = true,
			attribute::DEPRECATED => class.is_deprecated = true,
			// annotations, records, modules and the source debug extension are not interpreted
			_ => skip_contents(&mut attribute)?,
		}
		attribute.finish(format_args!("{name} attribute"))?;
	}

	if class.nest_host.is_some() && nest_members.is_some() {
		bail_structure!("a class can't have both a NestHost and a NestMembers attribute");
	}

	class.inner_classes = inner_classes.unwrap_or_default();
	class.bootstrap_methods = bootstrap_methods.unwrap_or_default();
	class.nest_members = nest_members.unwrap_or_default();
	class.permitted_subclasses = permitted_subclasses.unwrap_or_default();
	Ok(())
}

fn optional_utf8(pool: &ConstantPool, index: u16) -> Result<Option<JavaString>> {
	if index == 0 {
		Ok(None)
	} else {
		pool.get_utf8(index).map(|string| Some(string.to_owned()))
	}
}
