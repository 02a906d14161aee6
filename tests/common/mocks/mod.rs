pub mod connectivity;
pub mod remote_api;

pub use connectivity::*;
pub use remote_api::*;
