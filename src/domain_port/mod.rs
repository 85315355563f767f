mod clock;
mod revocation_gate;
mod secret_generator;
mod token_codec;

pub use clock::*;
pub use revocation_gate::*;
pub use secret_generator::*;
pub use token_codec::*;
