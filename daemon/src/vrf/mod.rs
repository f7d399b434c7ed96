// Local VRF coordinator and the worker answering its requests

mod coordinator;
mod oracle;

pub use coordinator::*;
pub use oracle::*;
