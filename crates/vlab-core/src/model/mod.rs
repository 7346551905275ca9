pub mod context;

pub use context::{InputSnapshot, SimulationContext};
