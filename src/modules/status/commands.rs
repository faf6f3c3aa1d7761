use super::{
    query,
    slp::{self, PingError, ServerAddress, ServerStatus},
};
use crate::{Context, Error};
use poise::serenity_prelude::{
    ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use poise::{command, CreateReply};
use std::time::Duration;
use tracing::debug;

const PING_TIMEOUT: Duration = Duration::from_secs(5);
const VIEW_TIMEOUT: Duration = Duration::from_secs(30);
const NO_PLAYERS: &str = "No players online or query is not enabled on server.";

pub(super) fn status_embed(ip: &str, status: &ServerStatus) -> CreateEmbed {
    let motd = if status.motd.is_empty() {
        "Unknown".to_string()
    } else {
        status.motd.clone()
    };

    CreateEmbed::new()
        .title(format!("Server Info — {}", ip))
        .colour(Colour::BLUE)
        .field("Status", "Online", true)
        .field("Version", status.version.clone(), true)
        .field("Players", format!("{}/{}", status.online, status.max), true)
        .field("MOTD", motd, false)
}

pub(super) fn player_list(players: &[String]) -> Option<String> {
    if players.is_empty() {
        None
    } else {
        Some(players.join("\n"))
    }
}

/// Player names from Query, or the status sample when Query is off or fails.
pub(super) fn online_players(
    queried: Result<Vec<String>, PingError>,
    status: &ServerStatus,
) -> Vec<String> {
    match queried {
        Ok(names) => names,
        Err(e) => {
            debug!("Query failed, using status sample: {}", e);
            status.sample.clone()
        }
    }
}

/// Get information about a Minecraft Java server.
#[command(slash_command)]
pub async fn mcinfo(
    ctx: Context<'_>,
    #[description = "IP of the server"] ip: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let address = ServerAddress::parse(&ip);
    let status = match slp::status(&address, PING_TIMEOUT).await {
        Ok(status) => status,
        Err(e) => {
            debug!("Status ping to {} failed: {}", ip, e);
            ctx.send(
                CreateReply::default()
                    .content(format!("Could not reach `{}`.", ip))
                    .ephemeral(true),
            )
            .await?;
            return Ok(());
        }
    };

    let players = online_players(query::players(&address, PING_TIMEOUT).await, &status);

    let embed = status_embed(&ip, &status);
    let button = CreateButton::new("show_players")
        .style(ButtonStyle::Primary)
        .label("Show Players");

    let msg = ctx
        .send(
            CreateReply::default()
                .embed(embed.clone())
                .components(vec![CreateActionRow::Buttons(vec![button])]),
        )
        .await?;

    while let Some(interaction) = msg
        .message()
        .await?
        .await_component_interaction(ctx.serenity_context())
        .timeout(VIEW_TIMEOUT)
        .await
    {
        let response = match player_list(&players) {
            Some(list) => CreateInteractionResponseMessage::new().embed(
                CreateEmbed::new()
                    .title("Online Players")
                    .description(list)
                    .colour(Colour::BLUE),
            ),
            None => CreateInteractionResponseMessage::new().content(NO_PLAYERS),
        };

        interaction
            .create_response(
                &ctx.serenity_context().http,
                CreateInteractionResponse::Message(response.ephemeral(true)),
            )
            .await?;
    }

    msg.edit(ctx, CreateReply::default().embed(embed).components(vec![]))
        .await?;
    Ok(())
}
