use java_string::{JavaCodePoint, JavaStr};
use crate::error::PoolError;
use crate::macros::make_name_like;
use crate::tree::descriptor::InternalTypeName;

make_name_like!(
	/// A class name in internal form, like `java/lang/Object`.
	///
	/// Array classes are named by their descriptor instead, like `[Ljava/lang/Object;` or `[[I`.
	pub ClassName;
);

make_name_like!(
	/// An unqualified field name.
	pub FieldName;
);

make_name_like!(
	/// An unqualified method name, or one of the special names `<init>` and `<clinit>`.
	pub MethodName;
);

impl ClassName {
	pub fn java_lang_object() -> ClassName {
		ClassName(JavaStr::from_str("java/lang/Object").to_owned())
	}

	pub fn is_array(&self) -> bool {
		self.0.starts_with('[')
	}

	/// The type this class name denotes.
	pub fn as_type(&self) -> InternalTypeName {
		if self.is_array() {
			// checked when constructed
			InternalTypeName::parse_field(&self.0)
				.unwrap_or_else(|_| InternalTypeName::reference(self.clone()))
		} else {
			InternalTypeName::reference(self.clone())
		}
	}

	fn check_valid(inner: &JavaStr) -> Result<(), PoolError> {
		if inner.starts_with('[') {
			return InternalTypeName::parse_field(inner).map(|_| ());
		}
		check_binary_name(inner)
	}
}

/// Checks a binary class name in internal form: `/`-separated non-empty unqualified names.
pub(crate) fn check_binary_name(inner: &JavaStr) -> Result<(), PoolError> {
	let mut segment_length = 0usize;
	for char in inner.chars() {
		if char == '/' {
			if segment_length == 0 {
				return Err(invalid("class name", inner, "has an empty segment"));
			}
			segment_length = 0;
		} else if is_forbidden_in_unqualified_name(char) {
			return Err(invalid("class name", inner, "contains one of `.`, `;` or `[`"));
		} else {
			segment_length += 1;
		}
	}
	if segment_length == 0 {
		return Err(invalid("class name", inner, "is empty or ends with `/`"));
	}
	Ok(())
}

impl FieldName {
	fn check_valid(inner: &JavaStr) -> Result<(), PoolError> {
		check_unqualified_name("field name", inner)
	}
}

impl MethodName {
	pub const INIT: &'static str = "<init>";
	pub const CLINIT: &'static str = "<clinit>";

	pub fn is_init(&self) -> bool {
		self.0.as_java_str() == JavaStr::from_str(Self::INIT)
	}

	pub fn is_clinit(&self) -> bool {
		self.0.as_java_str() == JavaStr::from_str(Self::CLINIT)
	}

	fn check_valid(inner: &JavaStr) -> Result<(), PoolError> {
		if inner == JavaStr::from_str(Self::INIT) || inner == JavaStr::from_str(Self::CLINIT) {
			return Ok(());
		}
		check_unqualified_name("method name", inner)?;
		if inner.chars().any(|c| c == '<' || c == '>') {
			return Err(invalid("method name", inner, "contains `<` or `>`"));
		}
		Ok(())
	}
}

fn is_forbidden_in_unqualified_name(char: JavaCodePoint) -> bool {
	char == '.' || char == ';' || char == '[' || char == '/'
}

fn check_unqualified_name(what: &str, inner: &JavaStr) -> Result<(), PoolError> {
	if inner.is_empty() {
		return Err(invalid(what, inner, "is empty"));
	}
	if inner.chars().any(is_forbidden_in_unqualified_name) {
		return Err(invalid(what, inner, "contains one of `.`, `;`, `[` or `/`"));
	}
	Ok(())
}

fn invalid(what: &str, inner: &JavaStr, reason: &str) -> PoolError {
	PoolError::InvalidContent(format!("{what} {inner:?} {reason}"))
}
