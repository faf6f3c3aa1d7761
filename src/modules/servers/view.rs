use crate::api::{Geolocation, ServerRecord};
use crate::utils::relative_time_or_unknown;
use poise::serenity_prelude::{ButtonStyle, Colour, CreateActionRow, CreateButton, CreateEmbed};

/// Servers shown per message; the API hands out 20 per page.
pub const WINDOW: usize = 5;
pub const API_PAGE_SIZE: usize = 20;

pub const PREV_ID: &str = "prev_page";
pub const NEXT_ID: &str = "next_page";
const SERVER_ID_PREFIX: &str = "server_";

pub type Field = (String, String, bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthBadge {
    pub icon: &'static str,
    pub text: &'static str,
}

pub fn auth_badge(authmode: Option<&str>) -> AuthBadge {
    let (icon, text) = match authmode.map(str::to_ascii_lowercase).as_deref() {
        Some("online") => (":white_check_mark:", "Online Mode"),
        Some("offline") => (":x:", "Offline (Cracked)"),
        Some("whitelist") => (":lock:", "Whitelisted"),
        _ => (":question:", "Unknown"),
    };
    AuthBadge { icon, text }
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("Unknown")
}

fn flag(geo: &Geolocation) -> String {
    format!(
        ":flag_{}:",
        or_unknown(geo.country.as_deref()).to_lowercase()
    )
}

pub fn summary(server: &ServerRecord) -> String {
    let geo = server.geolocation.clone().unwrap_or_default();
    let auth = auth_badge(server.authmode.as_deref());

    format!(
        "**IP:** {}\n**Version:** {}\n**Location:** {} {}, {}\n**Authentication:** {} {}",
        or_unknown(server.serverip.as_deref()),
        or_unknown(server.version.as_deref()),
        flag(&geo),
        or_unknown(geo.country_name.as_deref()),
        or_unknown(geo.city.as_deref()),
        auth.icon,
        auth.text
    )
}

/// One embed field per server, numbered from `first_number`.
pub fn summary_fields(servers: &[ServerRecord], first_number: usize) -> Vec<Field> {
    servers
        .iter()
        .enumerate()
        .map(|(i, server)| (format!("Server {}", first_number + i), summary(server), false))
        .collect()
}

pub fn detail_fields(server: &ServerRecord) -> Vec<Field> {
    let geo = server.geolocation.clone().unwrap_or_default();
    let auth = auth_badge(server.authmode.as_deref());

    vec![
        ("IP".into(), or_unknown(server.serverip.as_deref()).into(), false),
        ("Version".into(), or_unknown(server.version.as_deref()).into(), true),
        (
            "Country".into(),
            format!("{} {}", flag(&geo), or_unknown(geo.country_name.as_deref())),
            true,
        ),
        ("City".into(), or_unknown(geo.city.as_deref()).into(), true),
        (
            "Last Seen".into(),
            relative_time_or_unknown(server.last_seen.as_ref()),
            true,
        ),
        ("Authentication".into(), format!("{} {}", auth.icon, auth.text), true),
        (
            "Online Players".into(),
            server.online_players.unwrap_or(0).to_string(),
            true,
        ),
        (
            "Max Players".into(),
            server.max_players.unwrap_or(0).to_string(),
            true,
        ),
    ]
}

pub fn detail_embed(server: &ServerRecord) -> CreateEmbed {
    CreateEmbed::new()
        .title("Server Information")
        .colour(Colour::BLUE)
        .fields(detail_fields(server))
}

pub fn list_embed(title: impl Into<String>, servers: &[ServerRecord], first_number: usize) -> CreateEmbed {
    CreateEmbed::new()
        .title(title)
        .colour(Colour::BLUE)
        .fields(summary_fields(servers, first_number))
}

pub fn server_button_id(index: usize) -> String {
    format!("{}{}", SERVER_ID_PREFIX, index)
}

/// Maps a `server_N` custom id back to its index within the shown window.
pub fn parse_server_button(custom_id: &str) -> Option<usize> {
    custom_id.strip_prefix(SERVER_ID_PREFIX)?.parse().ok()
}

pub fn server_buttons(count: usize, first_number: usize) -> CreateActionRow {
    CreateActionRow::Buttons(
        (0..count.min(WINDOW))
            .map(|i| {
                CreateButton::new(server_button_id(i))
                    .style(ButtonStyle::Primary)
                    .label(format!("Server {}", first_number + i))
            })
            .collect(),
    )
}

pub fn paging_buttons() -> CreateActionRow {
    CreateActionRow::Buttons(vec![
        CreateButton::new(PREV_ID)
            .style(ButtonStyle::Secondary)
            .label("Previous"),
        CreateButton::new(NEXT_ID)
            .style(ButtonStyle::Secondary)
            .label("Next"),
    ])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Position inside the paged server list: an API page plus a five-wide window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub page: u32,
    pub start_index: usize,
}

impl PageCursor {
    pub fn new(page: u32) -> Self {
        Self {
            page: page.max(1),
            start_index: 0,
        }
    }

    /// Moves one window. Returns `true` when the API page changed and must be refetched.
    pub fn step(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Next => {
                if self.start_index + WINDOW < API_PAGE_SIZE {
                    self.start_index += WINDOW;
                    false
                } else if let Some(page) = self.page.checked_add(1) {
                    self.page = page;
                    self.start_index = 0;
                    true
                } else {
                    false
                }
            }
            Direction::Previous => {
                if self.start_index >= WINDOW {
                    self.start_index -= WINDOW;
                    false
                } else if self.page == 1 {
                    self.start_index = 0;
                    false
                } else {
                    self.page -= 1;
                    self.start_index = API_PAGE_SIZE - WINDOW;
                    true
                }
            }
        }
    }

    pub fn first_number(&self) -> usize {
        self.start_index + 1
    }

    pub fn window<'a>(&self, servers: &'a [ServerRecord]) -> &'a [ServerRecord] {
        let start = self.start_index.min(servers.len());
        let end = (start + WINDOW).min(servers.len());
        &servers[start..end]
    }
}
