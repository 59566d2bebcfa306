//! `/cancel`: abandon the wizard in progress.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use formbot_types::event::InboundMessage;

use crate::locale::RequestEnv;
use crate::wizard::FormEngine;

use super::handler::MessageHandler;

pub const CANCEL_SUCCESS_TR: &str = "commands.cancel.success";
pub const NO_ACTIVE_WIZARD_TR: &str = "wizard.active.not.set";

pub struct CancelHandler {
    engine: Arc<FormEngine>,
}

impl CancelHandler {
    pub fn new(engine: Arc<FormEngine>) -> Self {
        Self { engine }
    }
}

impl MessageHandler for CancelHandler {
    fn name(&self) -> &str {
        "CancelHandler"
    }

    fn can_handle(&self, _env: &RequestEnv, msg: &InboundMessage) -> bool {
        msg.command() == Some("cancel")
    }

    fn handle<'a>(
        &'a self,
        env: &'a RequestEnv,
        msg: &'a InboundMessage,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            let key = if self.engine.cancel(msg.from.id).await? {
                CANCEL_SUCCESS_TR
            } else {
                NO_ACTIVE_WIZARD_TR
            };
            self.engine.replier().reply(msg, &env.lang.tr(key)).await?;
            Ok(())
        })
    }
}
