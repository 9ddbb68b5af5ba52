pub mod mock_kernel;
mod mock_shapes;
pub mod traits;
pub mod types;

pub use mock_kernel::{KernelCall, KernelOp, MockKernel};
pub use traits::*;
pub use types::*;
