/// Creates a [`JavaString`](java_string::JavaString) wrapper whose contents are checked on construction.
///
/// You need to have a function
/// ```ignore
/// impl Owned {
///     fn check_valid(inner: &JavaStr) -> Result<(), PoolError> {
///         // ...
///     }
/// }
/// ```
/// that checks if the contents are valid.
macro_rules! make_name_like {
	(
		$( #[$doc:meta] )*
		$vis:vis $name:ident;
	) => {
		$( #[$doc] )*
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
		$vis struct $name(java_string::JavaString);

		impl $name {
			pub fn as_java_str(&self) -> &java_string::JavaStr {
				&self.0
			}

			pub fn into_inner(self) -> java_string::JavaString {
				self.0
			}

			/// Checks if a given value is valid for being represented by this type.
			pub fn is_valid(inner: &java_string::JavaStr) -> bool {
				Self::check_valid(inner).is_ok()
			}
		}

		impl TryFrom<java_string::JavaString> for $name {
			type Error = $crate::error::PoolError;

			fn try_from(value: java_string::JavaString) -> Result<$name, $crate::error::PoolError> {
				$name::check_valid(&value)?;
				Ok($name(value))
			}
		}

		impl TryFrom<&java_string::JavaStr> for $name {
			type Error = $crate::error::PoolError;

			fn try_from(value: &java_string::JavaStr) -> Result<$name, $crate::error::PoolError> {
				$name::check_valid(value)?;
				Ok($name(value.to_owned()))
			}
		}

		impl TryFrom<&str> for $name {
			type Error = $crate::error::PoolError;

			fn try_from(value: &str) -> Result<$name, $crate::error::PoolError> {
				$name::try_from(java_string::JavaStr::from_str(value))
			}
		}

		impl AsRef<java_string::JavaStr> for $name {
			fn as_ref(&self) -> &java_string::JavaStr {
				&self.0
			}
		}

		impl std::hash::Hash for $name {
			fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
				std::hash::Hash::hash(self.0.as_java_str(), state)
			}
		}

		impl std::fmt::Display for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				match self.0.as_str() {
					Ok(s) => f.write_str(s),
					Err(_) => write!(f, "{:?}", self.0),
				}
			}
		}

		impl std::fmt::Debug for $name {
			fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}({:?})", stringify!($name), self.0)
			}
		}
	}
}

pub(crate) use make_name_like;
