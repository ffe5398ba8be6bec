pub mod config;
pub mod runtime;
pub mod validator;

pub use runtime::{InvalidRuntimeFormat, Runtime};
pub use validator::{ValidationErrors, Validator};
