use crate::api::McApi;
use crate::tasks::Task;
use crate::utils::thousands;
use async_trait::async_trait;
use poise::serenity_prelude::{ActivityData, Context, OnlineStatus};
use std::time::Duration;
use tracing::debug;

/// Keeps the bot's "Watching N Minecraft servers" presence current.
#[derive(Clone, Debug)]
pub struct PresenceTask {
    api: McApi,
    interval: Duration,
}

impl PresenceTask {
    pub fn new(api: McApi, interval: Duration) -> Self {
        Self { api, interval }
    }
}

pub fn activity_text(total: u64) -> String {
    format!("{} Minecraft servers", thousands(total))
}

#[async_trait]
impl Task for PresenceTask {
    fn name(&self) -> &str {
        "Presence"
    }

    fn schedule(&self) -> Option<Duration> {
        Some(self.interval)
    }

    async fn execute(
        &mut self,
        ctx: &Context,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let total = self.api.total_servers().await?;
        debug!("Indexed server count is {}", total);
        ctx.set_presence(
            Some(ActivityData::watching(activity_text(total))),
            OnlineStatus::Online,
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_uses_separators() {
        assert_eq!(activity_text(1_234_567), "1,234,567 Minecraft servers");
    }
}
