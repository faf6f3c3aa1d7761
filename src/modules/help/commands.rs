use crate::{Context, Error};
use poise::serenity_prelude::{Colour, CreateEmbed, CreateEmbedFooter};
use poise::{command, CreateReply};

const SERVER_HELP: &str = "**/server** — Search for Minecraft servers using the API.\n\
    **Options:**\n\
    • **page** — Starting page number (20 servers per page)\n\
    • **software** — Filter by server software (e.g., Paper, Vanilla)\n\
    • **version** — Filter by Minecraft version (e.g., 1.20.1)\n\
    • **country** — Filter by server location (e.g., EE, Estonia)\n\
    • **sort** — Sort by: Last Seen, Player Count, or Version\n\
    • **authmode** — Authentication: online / offline / whitelist\n\
    • **minplayers** — Minimum number of online players\n";

pub(super) fn help_fields() -> Vec<(&'static str, &'static str, bool)> {
    vec![
        ("🖥️ /server", SERVER_HELP, false),
        ("🎲 /random", "Gives a list of 5 random servers", false),
        (
            "📄 /mcinfo",
            "Displays information about a server\nUsage: /mcinfo (IP of the server)",
            false,
        ),
        ("📈 /stats", "Displays statistics about the bot.", false),
        ("👥 /whois", "Find who has played on a server", false),
        ("🌍 /whereis", "Find where a player has been", false),
    ]
}

/// Show help for commands.
#[command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = CreateEmbed::new()
        .title("❓ Help Menu")
        .description("List of available commands and how to use them.")
        .colour(Colour::BLUE)
        .fields(help_fields())
        .footer(CreateEmbedFooter::new("Use the commands with / to start!"));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_command() {
        let fields = help_fields();
        for command in ["/server", "/random", "/mcinfo", "/stats", "/whois", "/whereis"] {
            assert!(
                fields.iter().any(|(name, _, _)| name.ends_with(command)),
                "missing {}",
                command
            );
        }
    }

    #[test]
    fn server_help_names_every_filter() {
        for option in ["page", "software", "version", "country", "sort", "authmode", "minplayers"] {
            assert!(SERVER_HELP.contains(&format!("**{}**", option)));
        }
    }
}
