pub mod access;
pub mod class;
pub mod code;
pub mod descriptor;
pub mod field;
pub mod instruction;
pub mod method;
pub mod names;
