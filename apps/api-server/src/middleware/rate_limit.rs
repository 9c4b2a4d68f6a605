//! Rate limiting middleware.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header,
    web,
};
use futures::future::LocalBoxFuture;
use nexsocial_shared::ErrorResponse;
use std::future::{Ready, ready};
use std::rc::Rc;

use super::error::with_request_id;
use crate::state::AppState;

/// Per-client-IP rate limiting backed by the state's login limiter.
///
/// Keys are `<scope>:<ip>`, so several routes can share one limiter
/// without sharing quota.
pub struct RateLimitMiddleware {
    scope: &'static str,
}

impl RateLimitMiddleware {
    pub fn new(scope: &'static str) -> Self {
        Self { scope }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            scope: self.scope,
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    scope: &'static str,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let key = format!(
            "{}:{}",
            self.scope,
            req.connection_info().realip_remote_addr().unwrap_or("unknown")
        );
        let limiter = req
            .app_data::<web::Data<AppState>>()
            .map(|state| state.login_limiter.clone());

        Box::pin(async move {
            let Some(limiter) = limiter else {
                tracing::error!("AppState not found in app data, rate limiting disabled");
                return service.call(req).await.map(|res| res.map_into_left_body());
            };

            match limiter.check(&key).await {
                Ok(result) if !result.allowed => {
                    let retry_after = result.retry_after_secs();
                    tracing::warn!(key = %key, retry_after, "Rate limit exceeded");

                    let response = HttpResponse::TooManyRequests()
                        .insert_header(("X-RateLimit-Remaining", "0"))
                        .insert_header((header::RETRY_AFTER, retry_after.to_string()))
                        .json(with_request_id(ErrorResponse::too_many_requests(retry_after)));

                    let (http_req, _payload) = req.into_parts();
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
                Ok(result) => {
                    let mut res = service.call(req).await?;
                    if let Ok(value) = header::HeaderValue::from_str(&result.remaining.to_string()) {
                        res.headers_mut().insert(
                            header::HeaderName::from_static("x-ratelimit-remaining"),
                            value,
                        );
                    }
                    Ok(res.map_into_left_body())
                }
                Err(e) => {
                    // Fail open
                    tracing::error!(error = %e, key = %key, "Rate limiter error, failing open");
                    service.call(req).await.map(|res| res.map_into_left_body())
                }
            }
        })
    }
}
