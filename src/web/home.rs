use crate::core::contracts::StepError;
use crate::core::runtime::RequestContext;
use crate::notification::INotifier;
use futures::future::BoxFuture;

pub const HOME_GREETING: &str = "Hallo Welt (MVC)";

/// Home endpoint: notifies through whichever `INotifier` the composition
/// selected, then greets.
pub fn home(context: &mut RequestContext) -> BoxFuture<'_, Result<(), StepError>> {
    Box::pin(async move {
        let notifier = context.resolve::<dyn INotifier>()?;
        notifier.send("jim@panse.com", "Hey!", "...").await?;

        #[cfg(feature = "logging")]
        log::debug!("Home. Notified through '{}'", notifier.channel());

        context.respond(200, HOME_GREETING);
        Ok(())
    })
}
