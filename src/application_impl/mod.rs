mod jwt_codec;
mod key_material;
mod revocation_gate_impl;
mod secret_generator_impl;
mod session_service_impl;
mod system_clock;

pub use jwt_codec::*;
pub use key_material::*;
pub use revocation_gate_impl::*;
pub use secret_generator_impl::*;
pub use session_service_impl::*;
pub use system_clock::*;
