mod intrinsics;

pub use intrinsics::*;
