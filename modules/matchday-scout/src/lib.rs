pub mod assembler;
pub mod backends;
pub mod budget;
pub mod commentary;
pub mod extractors;
pub mod narrative;
pub mod pipeline;
pub mod session;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod weather;

pub use assembler::{Assembled, Assembler, SnapshotSource};
pub use commentary::{fan_out, FanOutLimits};
pub use pipeline::Pipeline;
