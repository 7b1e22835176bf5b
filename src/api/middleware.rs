use actix_web::{body::MessageBody, dev::{ServiceRequest, ServiceResponse}, middleware::Next, Error};
use tracing::debug;

/**
 * Middleware logging the handling time and status of each request.
 */
pub async fn timing_middleware(
    request: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let started = std::time::Instant::now();
    let path = request.path().to_owned();
    let method = request.method().to_owned();
    let response = next.call(request).await;
    let status = match &response {
        Ok(service_response) => service_response.status().as_u16(),
        Err(_) => 500, // Errors surface as a server error status
    };
    let elapsed = started.elapsed();
    debug!(target: "request_timing", "{} {} -> {} in {}ms", method, path, status, elapsed.as_millis());
    response
}

#[cfg(test)]
mod test {
    use super::*;
    use actix_web::{App, HttpResponse, middleware::from_fn, test, web};

    #[actix_web::test]
    async fn test_timing_middleware_passes_response_through() {
        let app = test::init_service(
            App::new()
                .wrap(from_fn(timing_middleware))
                .route("/ping", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;
        let response = test::call_service(&app, test::TestRequest::get().uri("/ping").to_request()).await;
        assert!(response.status().is_success());
    }
}
