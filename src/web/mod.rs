//! Host-owned part of the application: environment, error page, routing and
//! the home endpoint that consumes the notifier capability.

mod environment;
mod home;
mod module;
mod steps;

pub use environment::HostEnvironment;
pub use home::{HOME_GREETING, home};
pub use module::WebHostModule;
pub use steps::{ErrorPageStep, RouteHandler, RoutingStep};
