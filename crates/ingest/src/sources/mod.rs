pub mod generated;
pub mod json_file;
pub mod memory;

pub use generated::*;
pub use json_file::*;
pub use memory::*;
