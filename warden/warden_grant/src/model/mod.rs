mod access;
mod grant;

pub use access::{AccessMode, Region};
pub use grant::{Endpoints, Grant};
