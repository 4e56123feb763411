#[cfg(not(target_os = "linux"))]
compile_error!("burrow only works on linux");

#[macro_use] extern crate lazy_static;
#[macro_use] extern crate serde;

pub mod container;
pub mod errors;
pub mod filesystem;
pub mod image;
pub mod manifest;
pub mod registry;

pub use crate::{
    container::{Container, ContainerBuilder, ExitStatus},
    image::ImageReference,
    registry::Client,
};
