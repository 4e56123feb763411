//! The sandbox directory and what gets unpacked into it

mod root;
pub mod tar;

pub use root::SandboxRoot;
