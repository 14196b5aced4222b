use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use crate::error::{Error, Result};

/// Represents a class file version.
///
/// Use the associated constants (like [`Version::V1_1`]) if you want that version.
///
/// Take a look at [the list of class file versions](https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.1-200-B.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
	pub major: u16,
	pub minor: u16,
}

impl Version {
	pub const V1_1: Version = Version::new(45, 3);
	pub const V1_2: Version = Version::new(46, 0);
	pub const V1_3: Version = Version::new(47, 0);
	pub const V1_4: Version = Version::new(48, 0);
	pub const V1_5: Version = Version::new(49, 0);
	pub const V1_6: Version = Version::new(50, 0);
	pub const V1_7: Version = Version::new(51, 0);
	pub const V1_8: Version = Version::new(52, 0);
	pub const V9: Version = Version::new(53, 0);
	pub const V10: Version = Version::new(54, 0);
	pub const V11: Version = Version::new(55, 0);
	pub const V12: Version = Version::new(56, 0);
	pub const V13: Version = Version::new(57, 0);
	pub const V14: Version = Version::new(58, 0);
	pub const V15: Version = Version::new(59, 0);
	pub const V16: Version = Version::new(60, 0);
	pub const V17: Version = Version::new(61, 0);
	pub const V18: Version = Version::new(62, 0);
	pub const V19: Version = Version::new(63, 0);
	pub const V20: Version = Version::new(64, 0);
	pub const V21: Version = Version::new(65, 0);
	pub const V22: Version = Version::new(66, 0);
	pub const V23: Version = Version::new(67, 0);

	/// The minor version marking a class file that depends on preview features.
	pub const PREVIEW_MINOR: u16 = 0xffff;

	pub const fn new(major: u16, minor: u16) -> Version {
		Version { major, minor }
	}

	/// Checks that this version is one we can read, returning the release it belongs to.
	///
	/// Majors 45 to 67 are supported. Before major 56 any minor version is accepted, from 56 on
	/// only `0` and the preview marker `65535` are.
	pub fn release(self) -> Result<Release> {
		let release = Release::from_major(self.major)
			.ok_or_else(|| Error::Container(format!("unsupported class file version {self}")))?;

		if self.major >= 56 && self.minor != 0 && self.minor != Self::PREVIEW_MINOR {
			return Err(Error::Container(format!(
				"unsupported minor version {} for major version {}, must be 0 or 65535", self.minor, self.major
			)));
		}

		Ok(release)
	}

	/// Whether this version is at least the version with major version `major`.
	pub fn at_least(self, major: u16) -> bool {
		self.major >= major
	}
}

impl PartialOrd for Version {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Version {
	fn cmp(&self, other: &Self) -> Ordering {
		self.major.cmp(&other.major)
			.then_with(|| self.minor.cmp(&other.minor))
	}
}

impl Display for Version {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}.{}", self.major, self.minor)
	}
}

/// The platform release a supported class file version belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Release {
	Jdk1_1,
	Jdk1_2,
	Jdk1_3,
	Jdk1_4,
	Jdk5,
	Jdk6,
	Jdk7,
	Jdk8,
	Jdk9,
	Jdk10,
	Jdk11,
	Jdk12,
	Jdk13,
	Jdk14,
	Jdk15,
	Jdk16,
	Jdk17,
	Jdk18,
	Jdk19,
	Jdk20,
	Jdk21,
	Jdk22,
	Jdk23,
}

impl Release {
	const ALL: [Release; 23] = [
		Release::Jdk1_1, Release::Jdk1_2, Release::Jdk1_3, Release::Jdk1_4, Release::Jdk5, Release::Jdk6,
		Release::Jdk7, Release::Jdk8, Release::Jdk9, Release::Jdk10, Release::Jdk11, Release::Jdk12,
		Release::Jdk13, Release::Jdk14, Release::Jdk15, Release::Jdk16, Release::Jdk17, Release::Jdk18,
		Release::Jdk19, Release::Jdk20, Release::Jdk21, Release::Jdk22, Release::Jdk23,
	];

	fn from_major(major: u16) -> Option<Release> {
		let index = major.checked_sub(45)?;
		Self::ALL.get(index as usize).copied()
	}

	pub fn major(self) -> u16 {
		45 + self as u16
	}
}

#[cfg(test)]
mod testing {
	use pretty_assertions::assert_eq;
	use crate::error::Error;
	use crate::version::{Release, Version};

	#[test]
	fn test_cmp() {
		assert!(Version::V21 < Version::V22);
		assert!(Version::V21 < Version::V23);
		assert!(Version::V21 <= Version::V21);
		assert!(Version::V21 >= Version::V20);
		assert!(Version::V21 >= Version::V10);

		assert!(Version::V21 < Version::new(65, 1));
		assert!(Version::V22 > Version::new(65, 1));
		assert!(Version::new(65, 2) > Version::new(65, 1));
	}

	#[test]
	fn releases() -> Result<(), Error> {
		assert_eq!(Version::new(45, 0).release()?, Release::Jdk1_1);
		assert_eq!(Version::V1_1.release()?, Release::Jdk1_1);
		assert_eq!(Version::new(49, 7).release()?, Release::Jdk5);
		assert_eq!(Version::V1_8.release()?, Release::Jdk8);
		assert_eq!(Version::new(61, 0xffff).release()?, Release::Jdk17);
		assert_eq!(Version::V23.release()?, Release::Jdk23);
		assert_eq!(Release::Jdk23.major(), 67);
		Ok(())
	}

	#[test]
	fn unsupported() {
		assert!(Version::new(44, 0).release().is_err());
		assert!(Version::new(68, 0).release().is_err());
		assert!(Version::new(61, 3).release().is_err());
	}
}
