//! tower adapter — observe the pulse on any HTTP client service.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::{Request, Response};
use tower::{Layer, Service};

use crate::observer::PulseObserver;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Layer that instruments an HTTP client service with a `PulseObserver`.
#[derive(Debug, Clone)]
pub struct PulseLayer {
    observer: PulseObserver,
}

impl PulseLayer {
    pub fn new(observer: PulseObserver) -> Self {
        Self { observer }
    }
}

impl<S> Layer<S> for PulseLayer {
    type Service = PulseService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PulseService {
            inner,
            observer: self.observer.clone(),
        }
    }
}

/// Service produced by `PulseLayer`.
#[derive(Debug, Clone)]
pub struct PulseService<S> {
    inner: S,
    observer: PulseObserver,
}

impl<S> PulseService<S> {
    pub fn observer(&self) -> &PulseObserver {
        &self.observer
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for PulseService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let response = self.inner.call(req);
        let observer = self.observer.clone();
        Box::pin(async move { observer.intercept(response).await })
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use tower::ServiceExt;

    use super::*;
    use pulse_core::StrategyTier;

    fn echo_pulse(
        req: Request<()>,
    ) -> impl Future<Output = Result<Response<&'static str>, Infallible>> {
        let pulse = req.headers().get("want-pulse").cloned();
        async move {
            let mut builder = Response::builder();
            if let Some(pulse) = pulse {
                builder = builder.header("x-server-pulse", pulse);
            }
            Ok(builder.body("ok").unwrap())
        }
    }

    fn request(pulse: Option<&'static str>) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        if let Some(pulse) = pulse {
            builder = builder.header("want-pulse", pulse);
        }
        builder.body(()).unwrap()
    }

    #[tokio::test]
    async fn layer_observes_responses() {
        let observer = PulseObserver::default();
        let service = PulseLayer::new(observer.clone()).layer(tower::service_fn(echo_pulse));

        let resp = service.clone().oneshot(request(Some("0.65"))).await.unwrap();
        assert_eq!(*resp.body(), "ok");
        assert_eq!(observer.current_strategy(), StrategyTier::Conservative);

        service.oneshot(request(None)).await.unwrap();
        assert_eq!(observer.current_load().get(), 0.65);
    }

    #[tokio::test]
    async fn layer_passes_errors_through() {
        let observer = PulseObserver::default();
        let failing = tower::service_fn(|_req: Request<()>| async {
            Err::<Response<()>, _>(std::io::Error::other("down"))
        });
        let service = PulseLayer::new(observer.clone()).layer(failing);

        let err = service.oneshot(request(Some("0.99"))).await.unwrap_err();
        assert_eq!(err.to_string(), "down");
        assert_eq!(observer.current_load().get(), 0.0);
    }
}
