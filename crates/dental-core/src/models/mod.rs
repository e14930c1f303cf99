//! Domain models for the dental practice core.

mod appointment;
mod attachment;
mod patient;

pub use appointment::*;
pub use attachment::*;
pub use patient::*;
