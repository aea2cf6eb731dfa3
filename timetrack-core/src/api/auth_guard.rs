//! # Auth Guard Middleware
//!
//! Wires [`shared::auth::middleware::AuthMiddleware`] into the request
//! pipeline for scopes that require a valid access token. Applied with
//! `actix_web::middleware::from_fn` rather than a hand-rolled
//! `Transform`/`Service` pair, which is more code than this needs.

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web, Error,
};
use shared::auth::middleware::AuthMiddleware;

pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let auth = req
        .app_data::<web::Data<AuthMiddleware>>()
        .expect("AuthMiddleware not registered as app_data")
        .clone();

    auth.authenticate(&req)?;
    next.call(req).await
}
