use api::McApi;
use config::Config;
use modules::{
    help::help,
    players::{whereis, whois},
    servers::{random, server, stats},
    status::mcinfo,
    system::{events::ReadyHandler, task::PresenceTask},
};
use poise::serenity_prelude::{self as serenity, CreateAllowedMentions};
use poise::CreateReply;
use std::sync::Arc;
use tasks::TaskManager;
use tracing::{error, info, trace};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod events;
mod modules;
mod tasks;
mod utils;

use crate::events::EventManager;

#[derive(Clone, Debug)]
pub struct Data {
    pub config: Arc<Config>,
    pub api: McApi,
    pub task_manager: Arc<TaskManager>,
    pub event_manager: Arc<EventManager>,
}

impl Data {
    pub async fn init_tasks(&self, ctx: &serenity::Context) {
        let presence = PresenceTask::new(self.api.clone(), self.config.presence_interval);
        self.task_manager.add_task(presence).await;

        self.task_manager.start_tasks(ctx.clone()).await;
    }
}

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

fn location(ctx: Context<'_>) -> String {
    ctx.guild_id()
        .map_or_else(|| "DM".to_string(), |id| id.to_string())
}

const COMMAND_FAILED: &str = "❌ Something went wrong while running this command.";

/// Only failures talking to the index are blamed on it.
fn failure_message(error: &Error) -> &'static str {
    if error.downcast_ref::<api::ApiError>().is_some() {
        utils::UPSTREAM_UNAVAILABLE
    } else {
        COMMAND_FAILED
    }
}

async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            error!(
                "Command {} failed for {} in {}: {:?}",
                ctx.command().qualified_name,
                ctx.author().tag(),
                location(ctx),
                error
            );

            let reply = CreateReply::default()
                .content(failure_message(&error))
                .ephemeral(true);
            if let Err(e) = ctx.send(reply).await {
                error!("Failed to report command failure: {}", e);
            }
        }
        err => error!("Other framework error: {:?}", err),
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("starting mcfinder");

    let config = Arc::new(Config::from_env()?);
    let api = McApi::new(&config.api_base_url, config.api_timeout)?;
    let task_manager = Arc::new(TaskManager::new());
    let intents = serenity::GatewayIntents::non_privileged();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions::<Data, Error> {
            allowed_mentions: Some(CreateAllowedMentions::new().empty_roles().empty_users()),
            commands: vec![
                help(),
                random(),
                server(),
                mcinfo(),
                whois(),
                whereis(),
                stats(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    trace!(
                        "Command {} used by {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx)
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command {} completed for {} in {}",
                        ctx.command().qualified_name,
                        ctx.author().tag(),
                        location(ctx)
                    );
                })
            },
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(async move {
                    data.event_manager.handle_event(ctx, event).await;
                    Ok(())
                })
            },
            ..Default::default()
        })
        .setup({
            let config = config.clone();
            let task_manager = task_manager.clone();
            move |ctx, _ready, framework| {
                Box::pin(async move {
                    info!("registering commands");
                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                    let event_manager = Arc::new(EventManager::new());
                    event_manager.add_handler(ReadyHandler).await;

                    let data = Data {
                        config,
                        api,
                        task_manager,
                        event_manager,
                    };
                    data.init_tasks(ctx).await;

                    Ok(data)
                })
            }
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutting down");
            task_manager.shutdown().await;
            shard_manager.shutdown_all().await;
        }
    });

    client.start().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn only_index_errors_blame_the_index() {
        let upstream: Error = Box::new(api::ApiError::Status(StatusCode::BAD_GATEWAY));
        assert_eq!(failure_message(&upstream), utils::UPSTREAM_UNAVAILABLE);

        let other: Error = "Unexpected component id".into();
        assert_eq!(failure_message(&other), COMMAND_FAILED);

        let discord: Error = Box::new(std::io::Error::other("gateway closed"));
        assert_eq!(failure_message(&discord), COMMAND_FAILED);
    }
}
