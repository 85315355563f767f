use super::transport::{
    PresentedCredentials, RequestParts, ResponseDirectives, TransportConfig, extract_credentials,
};
use crate::application_port::*;
use crate::domain_model::{Claims, CsrfSecret, RefreshToken, Session, Transition};
use crate::domain_port::Clock;
use crate::logger::*;
use std::sync::Arc;
use warp::http::HeaderMap;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply, reject};

/// Runs every guarded request through the refresh state machine.
pub struct SessionGuard {
    service: Arc<dyn SessionService>,
    transport: TransportConfig,
    clock: Arc<dyn Clock>,
}

impl SessionGuard {
    pub fn new(
        service: Arc<dyn SessionService>,
        transport: TransportConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        SessionGuard {
            service,
            transport,
            clock,
        }
    }

    pub fn service(&self) -> &Arc<dyn SessionService> {
        &self.service
    }

    pub fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    pub async fn check(
        &self,
        headers: &HeaderMap,
        query: &str,
        body: Bytes,
    ) -> Result<SessionContext, SessionRejection> {
        let parts = RequestParts {
            headers,
            query,
            body: &body,
        };
        let PresentedCredentials {
            auth_token,
            refresh_token,
            csrf_secret,
        } = extract_credentials(self.transport.mode, &parts).map_err(|e| self.reject(e))?;

        let (Some(auth_token), Some(refresh_token)) = (auth_token, refresh_token) else {
            return Err(self.reject(Denial::MissingToken.into()));
        };

        let outcome = self
            .service
            .refresh(&auth_token, &refresh_token, &csrf_secret)
            .await
            .map_err(|e| self.reject(e))?;
        debug!(
            session = %outcome.session.claims.id,
            transition = ?outcome.transition,
            "session refreshed"
        );

        let directives = ResponseDirectives::issue(&self.transport, &outcome.session.tokens)
            .map_err(|e| self.reject(e))?;
        Ok(SessionContext {
            outcome,
            directives,
            presented_refresh: refresh_token,
            body,
        })
    }

    /// Directives that hand a newly issued session to the client.
    pub fn issue_directives(&self, session: &Session) -> Result<ResponseDirectives, SessionRejection> {
        ResponseDirectives::issue(&self.transport, &session.tokens).map_err(|e| self.reject(e))
    }

    /// Revoke the session behind `refresh_token` and return the directives that clear it.
    pub async fn terminate(&self, refresh_token: Option<&RefreshToken>) -> ResponseDirectives {
        let termination = self.service.terminate(refresh_token).await;
        if !termination.revocation_attempted {
            info!("logout without a readable refresh token, nothing revoked");
        }
        self.nullify()
    }

    pub fn nullify(&self) -> ResponseDirectives {
        ResponseDirectives::nullify(&self.transport, self.clock.now())
    }

    /// Unauthorized outcomes also clear the client's tokens.
    pub fn reject(&self, error: SessionError) -> SessionRejection {
        let clear = error.is_unauthorized().then(|| self.nullify());
        SessionRejection { error, clear }
    }
}

/// A request that passed the guard.
#[derive(Debug)]
pub struct SessionContext {
    outcome: RefreshOutcome,
    directives: ResponseDirectives,
    presented_refresh: RefreshToken,
    body: Bytes,
}

impl SessionContext {
    pub fn claims(&self) -> &Claims {
        &self.outcome.session.claims
    }

    pub fn csrf_secret(&self) -> &CsrfSecret {
        &self.outcome.session.tokens.csrf_secret
    }

    pub fn transition(&self) -> Transition {
        self.outcome.transition
    }

    pub fn presented_refresh_token(&self) -> &RefreshToken {
        &self.presented_refresh
    }

    /// Request body, buffered while credentials were read from it.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Write the refreshed tokens onto `reply`.
    pub fn respond(&self, reply: impl Reply) -> warp::reply::Response {
        let mut response = reply.into_response();
        self.directives.apply(&mut response);
        response
    }
}

#[derive(Debug)]
pub struct SessionRejection {
    pub error: SessionError,
    /// Set when the client's tokens must be cleared along with the failure.
    pub clear: Option<ResponseDirectives>,
}

impl reject::Reject for SessionRejection {}

pub fn with_session(
    guard: Arc<SessionGuard>,
) -> impl Filter<Extract = (SessionContext,), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(
            warp::query::raw()
                .or(warp::any().map(String::new))
                .unify(),
        )
        .and(warp::body::bytes())
        .and_then(move |headers: HeaderMap, query: String, body: Bytes| {
            let guard = guard.clone();
            async move {
                guard
                    .check(&headers, &query, body)
                    .await
                    .map_err(reject::custom)
            }
        })
}
