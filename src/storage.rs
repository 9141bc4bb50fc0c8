mod instance;

pub use instance::{Format, Instance, LoadError, Schedule};
