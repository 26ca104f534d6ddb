use crate::core::composer::ComposedApplication;
use crate::core::contracts::{IRequestDelegate, StepError};
use crate::core::error_modular::ModularError;
use crate::core::provider::{CapabilityProvider, CapabilityScope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl Request {
    pub fn new(method: &str, path: &str, body: impl Into<String>) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            body: body.into(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path, String::new())
    }

    pub fn post(path: &str, body: impl Into<String>) -> Self {
        Self::new("POST", path, body)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn not_found() -> Self {
        Self::new(404, "Not Found")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// State of one inbound request while it travels through the pipeline.
pub struct RequestContext {
    request: Request,
    response: Response,
    capabilities: CapabilityScope,
    received_at: DateTime<Utc>,
    #[cfg(feature = "cancellation-token")]
    cancellation_token: tokio_util::sync::CancellationToken,
}

impl RequestContext {
    pub fn new(
        request: Request,
        capabilities: CapabilityScope,
        #[cfg(feature = "cancellation-token")]
        cancellation_token: tokio_util::sync::CancellationToken,
    ) -> Self {
        Self {
            request,
            response: Response::ok(""),
            capabilities,
            received_at: Utc::now(),
            #[cfg(feature = "cancellation-token")]
            cancellation_token,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn respond(&mut self, status: u16, body: impl Into<String>) {
        self.response = Response::new(status, body);
    }

    pub fn capabilities(&self) -> &CapabilityScope {
        &self.capabilities
    }

    pub fn resolve<C>(&self) -> Result<Arc<C>, ModularError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.resolve::<C>()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    #[cfg(feature = "cancellation-token")]
    pub fn cancellation_token(&self) -> &tokio_util::sync::CancellationToken {
        &self.cancellation_token
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}

pub(crate) struct NotFoundTerminal;

#[async_trait]
impl IRequestDelegate for NotFoundTerminal {
    async fn invoke(&self, context: &mut RequestContext) -> Result<(), StepError> {
        *context.response_mut() = Response::not_found();
        Ok(())
    }
}

/// Serves requests against a composed application. Cheap to clone.
#[derive(Clone)]
pub struct HostRuntime {
    application: Arc<ComposedApplication>,
    entry: Arc<dyn IRequestDelegate>,
}

impl HostRuntime {
    pub fn new(application: Arc<ComposedApplication>) -> Self {
        let entry = application.pipeline().build(Arc::new(NotFoundTerminal));
        Self { application, entry }
    }

    pub fn application(&self) -> &Arc<ComposedApplication> {
        &self.application
    }

    pub fn capabilities(&self) -> &Arc<CapabilityProvider> {
        self.application.capabilities()
    }

    pub async fn handle(
        &self,
        request: Request,
        #[cfg(feature = "cancellation-token")]
        cancellation_token: tokio_util::sync::CancellationToken,
    ) -> Result<Response, ModularError> {
        let path = request.path.clone();
        let mut context = RequestContext::new(
            request,
            self.capabilities().create_scope(),
            #[cfg(feature = "cancellation-token")]
            cancellation_token,
        );

        if let Err(err) = self.entry.invoke(&mut context).await {
            #[cfg(feature = "logging")]
            log::error!("Modular. Request '{}' failed: {}", path, err);

            return Err(ModularError::RequestFailed(path, err.to_string()));
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "Modular. Request '{}' answered {} in {} ms",
            path,
            context.response().status,
            (Utc::now() - context.received_at()).num_milliseconds()
        );

        Ok(context.into_response())
    }
}
