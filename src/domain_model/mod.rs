mod claims;
mod session;

pub use claims::*;
pub use session::*;
