use crate::events::EventHandler;
use async_trait::async_trait;
use poise::serenity_prelude::{Context, FullEvent};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ReadyHandler;

#[async_trait]
impl EventHandler for ReadyHandler {
    fn name(&self) -> &str {
        "Ready"
    }

    fn wants(&self, event: &FullEvent) -> bool {
        matches!(event, FullEvent::Ready { .. })
    }

    async fn handle(
        &self,
        _ctx: &Context,
        event: &FullEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let FullEvent::Ready { data_about_bot } = event {
            info!(
                "Logged in as {} in {} guilds",
                data_about_bot.user.tag(),
                data_about_bot.guilds.len()
            );
        }
        Ok(())
    }

    fn box_clone(&self) -> Box<dyn EventHandler> {
        Box::new(self.clone())
    }
}
