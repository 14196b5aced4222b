//! Finding class files and verifying them on a pool of worker threads.

use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use anyhow::{Context, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use walkdir::WalkDir;
use bean::tree::names::ClassName;
use bean::{ReadOptions, TypeInformation};

const CLASS_EXTENSION: &str = "class";

/// Everything the driver needs to know, collected from the command line.
#[derive(Debug, Clone)]
pub struct Settings {
	pub paths: Vec<PathBuf>,
	pub threads: usize,
	pub read_options: ReadOptions,
}

/// A type that was read and verified, with the file it came from.
#[derive(Debug)]
pub struct Verified {
	pub path: PathBuf,
	pub class: TypeInformation,
}

/// The outcome of a run over all files.
#[derive(Debug)]
pub struct Report {
	pub files: usize,
	pub types: DashMap<ClassName, Verified>,
	pub failures: usize,
}

impl Report {
	/// The verified types, ordered by name.
	pub fn sorted_types(&self) -> Vec<(String, PathBuf)> {
		let mut types: Vec<_> = self.types.iter()
			.map(|entry| (entry.key().to_string(), entry.value().path.clone()))
			.collect();
		types.sort();
		types
	}

	pub fn summary(&self) -> Summary {
		let (methods, instructions) = self.types.iter()
			.map(|entry| (entry.value().class.methods.len(), entry.value().class.instruction_count()))
			.fold((0, 0), |(methods, instructions), (m, i)| (methods + m, instructions + i));

		Summary {
			files: self.files,
			types: self.types.len(),
			methods,
			instructions,
			failures: self.failures,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
	pub files: usize,
	pub types: usize,
	pub methods: usize,
	pub instructions: usize,
	pub failures: usize,
}

impl Display for Summary {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} files, {} types, {} methods, {} instructions verified, {} failures",
			self.files, self.types, self.methods, self.instructions, self.failures)
	}
}

/// Collects the class files to verify. Directories are searched recursively, files are taken as they are.
///
/// The result is sorted within each given path, so runs over the same input see the same order.
pub fn discover(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for path in paths {
		if path.is_file() {
			files.push(path.clone());
			continue;
		}
		for entry in WalkDir::new(path).sort_by_file_name() {
			let entry = entry.with_context(|| format!("failed to search {path:?} for class files"))?;
			if entry.file_type().is_file() && entry.path().extension().is_some_and(|ex| ex == CLASS_EXTENSION) {
				files.push(entry.into_path());
			}
		}
	}
	Ok(files)
}

fn verify_file(path: &Path, options: &ReadOptions) -> Result<TypeInformation> {
	let data = std::fs::read(path)
		.with_context(|| format!("failed to read {path:?}"))?;
	bean::read_class_with(&data, options)
		.with_context(|| format!("failed to verify {path:?}"))
}

/// Puts a verified type into the map. Of two files declaring the same type, the one sorting first is kept.
///
/// Returns the path of the file that was not kept, if there was a duplicate.
fn insert(types: &DashMap<ClassName, Verified>, verified: Verified) -> Option<PathBuf> {
	match types.entry(verified.class.name.clone()) {
		Entry::Vacant(entry) => {
			entry.insert(verified);
			None
		},
		Entry::Occupied(mut entry) => {
			if verified.path < entry.get().path {
				let replaced = entry.insert(verified);
				Some(replaced.path)
			} else {
				Some(verified.path)
			}
		},
	}
}

/// Verifies every class file found under the paths from the settings.
///
/// Failures of single files are logged and counted, only failing to find the files or to start the workers is an error.
pub fn run(settings: &Settings) -> Result<Report> {
	let files = discover(&settings.paths)?;
	info!("verifying {} class files on {} threads", files.len(), settings.threads);

	let pool = rayon::ThreadPoolBuilder::new()
		.num_threads(settings.threads)
		.thread_name(|index| format!("crema-worker-{index}"))
		.build()
		.context("failed to start the worker threads")?;

	let types = DashMap::new();
	let failures = AtomicUsize::new(0);

	pool.install(|| {
		files.par_iter().for_each(|path| {
			match verify_file(path, &settings.read_options) {
				Ok(class) => {
					debug!("verified {} from {path:?}", class.name);
					let name = class.name.clone();
					if let Some(duplicate) = insert(&types, Verified { path: path.clone(), class }) {
						warn!("type {name} is declared again in {duplicate:?}, keeping the first declaration");
						failures.fetch_add(1, Ordering::Relaxed);
					}
				},
				Err(error) => {
					warn!("{error:#}");
					failures.fetch_add(1, Ordering::Relaxed);
				},
			}
		});
	});

	Ok(Report {
		files: files.len(),
		types,
		failures: failures.into_inner(),
	})
}

#[cfg(test)]
mod testing {
	use std::fs;
	use std::path::PathBuf;
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use bean::ReadOptions;
	use crate::driver::{discover, run, Settings, Summary};

	/// A class file for the empty class `name` extending `java/lang/Object`, with no members.
	fn empty_class(name: &str) -> Vec<u8> {
		let mut data = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34, 0x00, 0x05];
		data.push(1);
		data.extend((name.len() as u16).to_be_bytes());
		data.extend(name.as_bytes());
		data.extend([7, 0x00, 0x01]);
		data.push(1);
		data.extend(16u16.to_be_bytes());
		data.extend(b"java/lang/Object");
		data.extend([7, 0x00, 0x03]);
		data.extend([0x00, 0x21, 0x00, 0x02, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
		data
	}

	/// A fresh directory for one test.
	fn directory(test: &str) -> Result<PathBuf> {
		let path = std::env::temp_dir().join(format!("crema-{}-{test}", std::process::id()));
		if path.exists() {
			fs::remove_dir_all(&path)?;
		}
		fs::create_dir_all(path.join("org/example"))?;
		Ok(path)
	}

	fn settings(path: PathBuf) -> Settings {
		Settings {
			paths: vec![path],
			threads: 2,
			read_options: ReadOptions::default(),
		}
	}

	#[test]
	fn only_class_files_in_order() -> Result<()> {
		let dir = directory("discover")?;
		fs::write(dir.join("org/example/B.class"), empty_class("org/example/B"))?;
		fs::write(dir.join("org/example/A.class"), empty_class("org/example/A"))?;
		fs::write(dir.join("org/example/notes.txt"), b"not a class")?;

		let files = discover(&[dir.clone()])?;
		assert_eq!(files, vec![dir.join("org/example/A.class"), dir.join("org/example/B.class")]);

		let single = dir.join("org/example/notes.txt");
		assert_eq!(discover(&[single.clone()])?, vec![single]);

		assert!(discover(&[dir.join("missing")]).is_err());

		fs::remove_dir_all(dir)?;
		Ok(())
	}

	#[test]
	fn failures_are_counted() -> Result<()> {
		let dir = directory("failures")?;
		fs::write(dir.join("org/example/A.class"), empty_class("org/example/A"))?;
		fs::write(dir.join("org/example/B.class"), empty_class("org/example/B"))?;
		fs::write(dir.join("org/example/Broken.class"), &empty_class("org/example/Broken")[..20])?;

		let report = run(&settings(dir.clone()))?;
		assert_eq!(report.summary(), Summary { files: 3, types: 2, methods: 0, instructions: 0, failures: 1 });
		let names: Vec<_> = report.sorted_types().into_iter().map(|(name, _)| name).collect();
		assert_eq!(names, vec!["org/example/A", "org/example/B"]);

		fs::remove_dir_all(dir)?;
		Ok(())
	}

	#[test]
	fn duplicate_types_keep_the_first_file() -> Result<()> {
		let dir = directory("duplicates")?;
		fs::write(dir.join("org/example/A.class"), empty_class("org/example/A"))?;
		fs::write(dir.join("org/example/Copy.class"), empty_class("org/example/A"))?;

		let report = run(&settings(dir.clone()))?;
		assert_eq!(report.summary().failures, 1);
		assert_eq!(report.sorted_types(), vec![("org/example/A".to_owned(), dir.join("org/example/A.class"))]);

		fs::remove_dir_all(dir)?;
		Ok(())
	}
}
