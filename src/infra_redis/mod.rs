mod revocation_gate_redis;

pub use revocation_gate_redis::*;
