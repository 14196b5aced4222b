//! Where the predefined attributes may appear, and from which class file version on they are recognized.

use std::fmt::{Display, Formatter};
use crate::class_constants::attribute;
use crate::cursor::{ByteCursor, ClassRead};
use crate::error::{bail_structure, Result};
use crate::pool::ConstantPool;
use crate::version::Version;

/// The structures that have an attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Location {
	Class,
	Field,
	Method,
	Code,
	RecordComponent,
}

impl Display for Location {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			Location::Class => "ClassFile",
			Location::Field => "field_info",
			Location::Method => "method_info",
			Location::Code => "Code",
			Location::RecordComponent => "record_component_info",
		})
	}
}

use Location::{Class, Code, Field, Method, RecordComponent};

const MEMBERS: &[Location] = &[Class, Field, Method];
const ANNOTATED: &[Location] = &[Class, Field, Method, RecordComponent];

/// The name, the first major version and the locations of each predefined attribute.
const PREDEFINED: &[(&str, u16, &[Location])] = &[
	(attribute::CONSTANT_VALUE, 45, &[Field]),
	(attribute::CODE, 45, &[Method]),
	(attribute::STACK_MAP_TABLE, 50, &[Code]),
	(attribute::STACK_MAP, 45, &[Code]),
	(attribute::EXCEPTIONS, 45, &[Method]),
	(attribute::INNER_CLASSES, 45, &[Class]),
	(attribute::ENCLOSING_METHOD, 49, &[Class]),
	(attribute::SYNTHETIC, 45, MEMBERS),
	(attribute::SIGNATURE, 49, ANNOTATED),
	(attribute::SOURCE_FILE, 45, &[Class]),
	(attribute::SOURCE_DEBUG_EXTENSION, 49, &[Class]),
	(attribute::LINE_NUMBER_TABLE, 45, &[Code]),
	(attribute::LOCAL_VARIABLE_TABLE, 45, &[Code]),
	(attribute::LOCAL_VARIABLE_TYPE_TABLE, 49, &[Code]),
	(attribute::DEPRECATED, 45, MEMBERS),
	(attribute::RUNTIME_VISIBLE_ANNOTATIONS, 49, ANNOTATED),
	(attribute::RUNTIME_INVISIBLE_ANNOTATIONS, 49, ANNOTATED),
	(attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS, 49, &[Method]),
	(attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, 49, &[Method]),
	(attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, 52, &[Class, Field, Method, Code, RecordComponent]),
	(attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, 52, &[Class, Field, Method, Code, RecordComponent]),
	(attribute::ANNOTATION_DEFAULT, 49, &[Method]),
	(attribute::BOOTSTRAP_METHODS, 51, &[Class]),
	(attribute::METHOD_PARAMETERS, 52, &[Method]),
	(attribute::MODULE, 53, &[Class]),
	(attribute::MODULE_PACKAGES, 53, &[Class]),
	(attribute::MODULE_MAIN_CLASS, 53, &[Class]),
	(attribute::NEST_HOST, 55, &[Class]),
	(attribute::NEST_MEMBERS, 55, &[Class]),
	(attribute::RECORD, 60, &[Class]),
	(attribute::PERMITTED_SUBCLASSES, 61, &[Class]),
];

/// Checks a predefined attribute against where it was found. Returns `false` for attributes that aren't predefined.
fn check(name: &str, location: Location, version: Version) -> Result<bool> {
	let Some(&(_, major, locations)) = PREDEFINED.iter().find(|(predefined, _, _)| *predefined == name) else {
		return Ok(false);
	};
	if !version.at_least(major) {
		bail_structure!("the {name} attribute is not allowed before class file version {major}, this is {version}");
	}
	if !locations.contains(&location) {
		bail_structure!("the {name} attribute is not allowed in a {location} structure");
	}
	Ok(true)
}

/// Reads the header of the next attribute and splits off its contents.
///
/// Attributes that aren't predefined are skipped, and give `None`. Every other attribute must be read
/// completely by the caller, and checked with [`ByteCursor::finish`].
pub(crate) fn read_attribute<'p, 'd>(
	reader: &mut ByteCursor<'d>,
	pool: &'p ConstantPool,
	location: Location,
	version: Version,
) -> Result<Option<(&'p str, ByteCursor<'d>)>> {
	let name = pool.get_utf8(reader.read_u16()?)?;
	let length = reader.read_u32()? as usize;
	let contents = reader.take(length)?;

	match name.as_str() {
		Ok(name) if check(name, location, version)? => Ok(Some((name, contents))),
		_ => Ok(None),
	}
}

/// Reads over attribute contents that are recognized but not interpreted.
pub(crate) fn skip_contents(contents: &mut ByteCursor) -> Result<()> {
	contents.skip(contents.remaining())
}

#[cfg(test)]
mod testing {
	use crate::class_constants::attribute;
	use crate::class_reader::attributes::{check, Location};
	use crate::version::Version;

	#[test]
	fn predefined_attributes() {
		assert!(matches!(check(attribute::CODE, Location::Method, Version::V1_1), Ok(true)));
		assert!(matches!(check("SomethingElse", Location::Method, Version::V1_1), Ok(false)));
		assert!(check(attribute::CODE, Location::Field, Version::V1_8).is_err());
		assert!(check(attribute::STACK_MAP_TABLE, Location::Code, Version::V1_5).is_err());
		assert!(matches!(check(attribute::STACK_MAP_TABLE, Location::Code, Version::V1_6), Ok(true)));
		assert!(check(attribute::PERMITTED_SUBCLASSES, Location::Class, Version::V1_8).is_err());
		assert!(matches!(check(attribute::SIGNATURE, Location::RecordComponent, Version::V17), Ok(true)));
	}
}
