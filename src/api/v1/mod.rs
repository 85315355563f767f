mod error;
mod guard;
mod handler;
mod router;
mod transport;

pub use error::{ApiError, ApiErrorCode, FailureResponder, PlainFailureResponder, recover_with};
pub use guard::*;
pub use handler::{ApiResponse, LoginRequest, LoginResponse, RestrictedResponse};
pub use router::routes;
pub use transport::*;
