use crate::core::contracts::{IPipelineStep, IRequestDelegate, StepError};
use crate::core::runtime::{Request, RequestContext};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

pub type RouteHandler = Arc<
    dyn for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), StepError>> + Send + Sync,
>;

/// Turns failures of the steps after it into a 500 response.
pub struct ErrorPageStep {
    detailed: bool,
}

impl ErrorPageStep {
    pub fn new(detailed: bool) -> Self {
        Self { detailed }
    }
}

#[async_trait]
impl IPipelineStep for ErrorPageStep {
    fn name(&self) -> &str {
        "error-page"
    }

    async fn handle(
        &self,
        context: &mut RequestContext,
        next: Arc<dyn IRequestDelegate>,
    ) -> Result<(), StepError> {
        if let Err(err) = next.invoke(context).await {
            #[cfg(feature = "logging")]
            log::error!(
                "ErrorPage. Request '{}' failed: {}",
                context.request().path,
                err
            );

            let body = if self.detailed {
                format!("Internal Server Error: {}", err)
            } else {
                "Internal Server Error".to_string()
            };
            context.respond(500, body);
        }
        Ok(())
    }
}

struct Route {
    method: String,
    path: String,
    handler: RouteHandler,
}

impl Route {
    fn matches(&self, request: &Request) -> bool {
        self.method == request.method
            && self.path.trim_end_matches('/') == request.path.trim_end_matches('/').to_lowercase()
    }
}

/// Dispatches to the first route matching method and path, otherwise passes
/// the request on.
#[derive(Default)]
pub struct RoutingStep {
    routes: Vec<Route>,
}

impl RoutingStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map<H>(mut self, method: &str, path: &str, handler: H) -> Self
    where
        H: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), StepError>>
            + Send
            + Sync
            + 'static,
    {
        self.routes.push(Route {
            method: method.to_uppercase(),
            path: path.to_lowercase(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn map_get<H>(self, path: &str, handler: H) -> Self
    where
        H: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, Result<(), StepError>>
            + Send
            + Sync
            + 'static,
    {
        self.map("GET", path, handler)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl IPipelineStep for RoutingStep {
    fn name(&self) -> &str {
        "routing"
    }

    async fn handle(
        &self,
        context: &mut RequestContext,
        next: Arc<dyn IRequestDelegate>,
    ) -> Result<(), StepError> {
        let route = self
            .routes
            .iter()
            .find(|route| route.matches(context.request()));

        match route {
            Some(route) => (route.handler)(context).await,
            None => next.invoke(context).await,
        }
    }
}
