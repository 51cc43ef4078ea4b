pub mod cancel;
pub mod cooperative;
pub mod progress;

pub use cancel::*;
pub use cooperative::*;
pub use progress::*;
