use super::view;
use crate::{Context, Error};
use poise::serenity_prelude::{Colour, CreateEmbed};
use poise::{command, CreateReply};

/// Find who has played on a Minecraft server
#[command(slash_command)]
pub async fn whois(
    ctx: Context<'_>,
    #[description = "The IP of the Minecraft server to search"] server_ip: String,
) -> Result<(), Error> {
    ctx.defer().await?;

    let who = match ctx.data().api.who(&server_ip).await? {
        Some(who) if !who.players.is_empty() => who,
        _ => {
            ctx.say(format!("No players found for server `{}`.", server_ip))
                .await?;
            return Ok(());
        }
    };

    let embed = CreateEmbed::new()
        .title(view::whois_title(&server_ip, &who))
        .colour(Colour::BLUE)
        .fields(view::whois_fields(&who));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Find where a Minecraft player has been
#[command(slash_command)]
pub async fn whereis(
    ctx: Context<'_>,
    #[description = "Minecraft username to search"] username: Option<String>,
    #[description = "Minecraft UUID to search"] uuid: Option<String>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let lookup = match view::lookup_from(username, uuid) {
        Ok(lookup) => lookup,
        Err(message) => {
            ctx.say(message).await?;
            return Ok(());
        }
    };

    let player = match ctx.data().api.whereis(&lookup.identifier).await? {
        Some(player) if !player.servers.is_empty() => player,
        _ => {
            ctx.say(format!("No servers found for {}.", lookup.identifier))
                .await?;
            return Ok(());
        }
    };

    let embed = CreateEmbed::new()
        .title(view::whereis_title(&lookup, &player))
        .colour(Colour::BLUE)
        .fields(view::whereis_fields(&player));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
