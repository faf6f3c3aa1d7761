use super::view::{self, Direction, PageCursor};
use crate::api::{AuthMode, McApi, ServerQuery, ServerRecord, SortOrder};
use crate::utils::{thousands, UPSTREAM_UNAVAILABLE};
use crate::{Context, Error};
use poise::serenity_prelude::{
    Colour, ComponentInteraction, CreateActionRow, CreateEmbed, CreateInteractionResponse,
    CreateInteractionResponseMessage,
};
use poise::{command, CreateReply, ReplyHandle};
use std::time::Duration;
use tracing::warn;

const VIEW_TIMEOUT: Duration = Duration::from_secs(120);
const NO_SERVERS: &str = "No servers found (after privacy filtering).";

/// What a server list message is showing, and how to page it.
struct Browser {
    servers: Vec<ServerRecord>,
    /// `None` for the random selection, which has no further pages.
    query: Option<ServerQuery>,
    cursor: PageCursor,
}

impl Browser {
    fn title(&self) -> String {
        match &self.query {
            Some(_) => format!("Server Search Results - Page {}", self.cursor.page),
            None => "Random Server Selection".to_string(),
        }
    }

    fn shown(&self) -> &[ServerRecord] {
        self.cursor.window(&self.servers)
    }

    fn embed(&self) -> CreateEmbed {
        view::list_embed(self.title(), self.shown(), self.cursor.first_number())
    }

    fn components(&self) -> Vec<CreateActionRow> {
        let mut rows = Vec::new();
        if !self.shown().is_empty() {
            rows.push(view::server_buttons(self.shown().len(), self.cursor.first_number()));
        }
        if self.query.is_some() {
            rows.push(view::paging_buttons());
        }
        rows
    }

    /// Moves the window, refetching when it crosses an API page. The cursor
    /// only moves once the new page has arrived.
    async fn turn(&mut self, api: &McApi, direction: Direction) -> Result<(), Error> {
        let Some(query) = &self.query else {
            return Ok(());
        };

        let mut cursor = self.cursor;
        if cursor.step(direction) {
            let query = ServerQuery {
                page: cursor.page,
                ..query.clone()
            };
            self.servers = api.servers(&query).await?.servers;
        }
        self.cursor = cursor;
        Ok(())
    }
}

async fn reply_ephemeral(
    ctx: Context<'_>,
    interaction: &ComponentInteraction,
    message: CreateInteractionResponseMessage,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.serenity_context().http,
            CreateInteractionResponse::Message(message.ephemeral(true)),
        )
        .await?;
    Ok(())
}

async fn browse(ctx: Context<'_>, mut browser: Browser) -> Result<(), Error> {
    let msg: ReplyHandle<'_> = ctx
        .send(
            CreateReply::default()
                .embed(browser.embed())
                .components(browser.components()),
        )
        .await?;

    while let Some(interaction) = msg
        .message()
        .await?
        .await_component_interaction(ctx.serenity_context())
        .timeout(VIEW_TIMEOUT)
        .await
    {
        let custom_id = interaction.data.custom_id.as_str();

        if let Some(index) = view::parse_server_button(custom_id) {
            match browser.shown().get(index) {
                Some(server) => {
                    let detail = CreateInteractionResponseMessage::new().embed(view::detail_embed(server));
                    reply_ephemeral(ctx, &interaction, detail).await?;
                }
                None => {
                    interaction
                        .create_response(
                            &ctx.serenity_context().http,
                            CreateInteractionResponse::Acknowledge,
                        )
                        .await?;
                }
            }
            continue;
        }

        let direction = match custom_id {
            view::PREV_ID => Direction::Previous,
            view::NEXT_ID => Direction::Next,
            _ => return Err("Unexpected component id".into()),
        };

        if let Err(e) = browser.turn(&ctx.data().api, direction).await {
            warn!("Failed to fetch next server page: {}", e);
            let failure = CreateInteractionResponseMessage::new().content(UPSTREAM_UNAVAILABLE);
            reply_ephemeral(ctx, &interaction, failure).await?;
            continue;
        }

        interaction
            .create_response(
                &ctx.serenity_context().http,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new()
                        .embed(browser.embed())
                        .components(browser.components()),
                ),
            )
            .await?;
    }

    msg.edit(
        ctx,
        CreateReply::default()
            .embed(browser.embed())
            .components(vec![]),
    )
    .await?;
    Ok(())
}

/// Get 5 random Minecraft servers
#[command(slash_command)]
pub async fn random(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let servers = ctx.data().api.random_servers().await?;
    if servers.is_empty() {
        ctx.say(NO_SERVERS).await?;
        return Ok(());
    }

    browse(
        ctx,
        Browser {
            servers,
            query: None,
            cursor: PageCursor::new(1),
        },
    )
    .await
}

/// Search Minecraft servers with filters
#[command(slash_command)]
pub async fn server(
    ctx: Context<'_>,
    #[description = "Starting page number to fetch servers from (20 servers per page)"]
    #[min = 1]
    #[max = 1000000]
    page: Option<u32>,
    #[description = "Filter by server software (e.g., Paper)"] software: Option<String>,
    #[description = "Filter by server country (e.g., EE, Estonia)"] country: Option<String>,
    #[description = "Filter by Minecraft version (e.g., 1.20.1)"] version: Option<String>,
    #[description = "Sort servers by different criteria"] sort: Option<SortOrder>,
    #[description = "Choose authentication mode: online/offline/whitelist"] authmode: Option<AuthMode>,
    #[description = "Minimum number of online players"] minplayers: Option<u32>,
) -> Result<(), Error> {
    ctx.defer().await?;

    let cursor = PageCursor::new(page.unwrap_or(1));
    let query = ServerQuery {
        page: cursor.page,
        software: software.filter(|s| !s.is_empty()),
        version: version.filter(|s| !s.is_empty()),
        sort,
        authmode,
        min_players: minplayers,
        country: country.filter(|s| !s.is_empty()),
    };

    let servers = ctx.data().api.servers(&query).await?.servers;
    if servers.is_empty() {
        ctx.say(NO_SERVERS).await?;
        return Ok(());
    }

    browse(
        ctx,
        Browser {
            servers,
            query: Some(query),
            cursor,
        },
    )
    .await
}

fn stats_embed(author: &str, api_url: &str, total: u64) -> CreateEmbed {
    CreateEmbed::new()
        .title("Statistics")
        .colour(Colour::BLUE)
        .field("Bot author:", author, false)
        .field("API:", api_url, false)
        .field("Total Servers:", format!("**{}**", thousands(total)), false)
}

/// Show statistics about the Minecraft server database.
#[command(slash_command)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let total = ctx.data().api.total_servers().await?;
    let embed = stats_embed(
        &ctx.data().config.bot_author,
        ctx.data().api.base_url().as_str(),
        total,
    );

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn browser(count: usize, query: Option<ServerQuery>) -> Browser {
        Browser {
            servers: vec![ServerRecord::default(); count],
            query,
            cursor: PageCursor::new(1),
        }
    }

    #[test]
    fn random_selection_has_no_paging_row() {
        let random = browser(5, None);
        assert_eq!(random.title(), "Random Server Selection");
        assert_eq!(random.components().len(), 1);
    }

    #[test]
    fn search_results_page_in_windows() {
        let mut search = browser(20, Some(ServerQuery::default()));
        assert_eq!(search.title(), "Server Search Results - Page 1");
        assert_eq!(search.shown().len(), 5);
        assert_eq!(search.components().len(), 2);

        search.cursor.step(Direction::Next);
        search.cursor.step(Direction::Next);
        search.cursor.step(Direction::Next);
        assert_eq!(search.cursor.first_number(), 16);
        assert_eq!(search.shown().len(), 5);
    }

    #[test]
    fn empty_window_keeps_paging_only() {
        let mut short = browser(3, Some(ServerQuery::default()));
        short.cursor.step(Direction::Next);
        assert!(short.shown().is_empty());
        assert_eq!(short.components().len(), 1);
    }

    fn filtered_search(server: &MockServer) -> (McApi, Browser) {
        let api = McApi::new(&server.base_url(), Duration::from_secs(5)).unwrap();
        let mut search = browser(
            20,
            Some(ServerQuery {
                software: Some("Paper".into()),
                authmode: Some(AuthMode::Offline),
                ..Default::default()
            }),
        );
        search.cursor = PageCursor { page: 1, start_index: 15 };
        (api, search)
    }

    #[tokio::test]
    async fn next_page_refetches_with_the_same_filters() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/servers")
                    .query_param("page", "2")
                    .query_param("software", "Paper")
                    .query_param("authmode", "offline");
                then.status(200).json_body(json!({
                    "servers": [{ "serverip": "5.6.7.8" }, { "serverip": "9.9.9.9" }],
                    "total": 22
                }));
            })
            .await;

        let (api, mut search) = filtered_search(&server);
        search.turn(&api, Direction::Next).await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(search.cursor, PageCursor { page: 2, start_index: 0 });
        assert_eq!(search.title(), "Server Search Results - Page 2");
        assert_eq!(search.shown()[0].serverip.as_deref(), Some("5.6.7.8"));
        assert_eq!(search.shown().len(), 2);

        search.turn(&api, Direction::Next).await.unwrap();
        mock.assert_hits_async(1).await;
        assert_eq!(search.cursor, PageCursor { page: 2, start_index: 5 });
    }

    #[tokio::test]
    async fn failed_refetch_keeps_the_current_page() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/servers").query_param("page", "2");
                then.status(500);
            })
            .await;

        let (api, mut search) = filtered_search(&server);
        let before = search.cursor;
        assert!(search.turn(&api, Direction::Next).await.is_err());

        mock.assert_hits_async(1).await;
        assert_eq!(search.cursor, before);
        assert_eq!(search.servers.len(), 20);
        assert_eq!(search.title(), "Server Search Results - Page 1");
    }
}
