use super::guard::with_session;
use super::handler;
use crate::server::Server;
use std::convert::Infallible;
use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // Path before method, so an unknown path is a 404 rather than a 405.
    let login = warp::path("login")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::form())
        .and(with(server.guard.clone()))
        .and(with(server.demo.clone()))
        .and_then(handler::login);

    let restricted = warp::path("restricted")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_session(server.guard.clone()))
        .map(handler::restricted);

    let logout = warp::path("logout")
        .and(warp::path::end())
        .and(warp::post())
        .and(with_session(server.guard.clone()))
        .and(with(server.guard.clone()))
        .and_then(handler::logout);

    // CORS preflight carries no credentials and is answered without touching the session.
    let preflight = warp::path("restricted")
        .or(warp::path("logout"))
        .unify()
        .and(warp::path::end())
        .and(warp::options())
        .map(|| StatusCode::NO_CONTENT);

    login.or(restricted).or(logout).or(preflight)
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}
