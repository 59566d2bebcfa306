//! Handler traits the dispatcher routes updates to.

use futures_util::future::BoxFuture;

use formbot_types::event::{CallbackQuery, InboundMessage};

use crate::locale::RequestEnv;
use crate::wizard::WizardHandler;

/// Handles messages it recognises, typically a `/command`.
pub trait MessageHandler: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    fn can_handle(&self, env: &RequestEnv, msg: &InboundMessage) -> bool;

    fn handle<'a>(
        &'a self,
        env: &'a RequestEnv,
        msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>>;

    /// The wizard this handler starts, if any. Used to populate the
    /// registry at startup.
    fn as_wizard(&self) -> Option<&dyn WizardHandler> {
        None
    }
}

/// Handles callback queries whose data starts with [`prefix`](Self::prefix).
pub trait CallbackHandler: Send + Sync {
    /// Data prefix including the trailing `:`.
    fn prefix(&self) -> &str;

    fn handle<'a>(
        &'a self,
        env: &'a RequestEnv,
        query: &'a CallbackQuery,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}
