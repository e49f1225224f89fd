pub mod refine;
pub mod sensor;
pub mod source;

pub use sensor::ContextSensor;
pub use source::{RawContextData, RawContextSource, RawOptionChain};
