use crate::api::{PlayerRecord, WhoResponse};
use crate::utils::relative_time_or_unknown;
use chrono::{DateTime, Utc};

pub const MAX_WHEREIS_SERVERS: usize = 10;
pub const MAX_WHOIS_PLAYERS: usize = 20;

pub type Field = (String, String, bool);

/// Which identifier `/whereis` was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub identifier: String,
    pub kind: &'static str,
}

/// Exactly one of `username` or `uuid` must be set; the error is the reply text.
pub fn lookup_from(username: Option<String>, uuid: Option<String>) -> Result<Lookup, &'static str> {
    let username = username.filter(|s| !s.trim().is_empty());
    let uuid = uuid.filter(|s| !s.trim().is_empty());

    match (username, uuid) {
        (None, None) => Err("Please provide either a username or a UUID."),
        (Some(_), Some(_)) => Err("Please only provide **one** of username or UUID."),
        (Some(name), None) => Ok(Lookup {
            identifier: name.trim().to_string(),
            kind: "Username",
        }),
        (None, Some(uuid)) => Ok(Lookup {
            identifier: uuid.trim().to_string(),
            kind: "UUID",
        }),
    }
}

const UNKNOWN: &str = "Unknown";

fn seen(first: Option<&DateTime<Utc>>, last: Option<&DateTime<Utc>>) -> String {
    format!(
        "**First Seen:** {}\n**Last Seen:** {}",
        relative_time_or_unknown(first),
        relative_time_or_unknown(last)
    )
}

/// `ip:port`, or just the IP when the port is missing.
fn address(ip: Option<&str>, port: Option<u16>) -> String {
    let ip = ip.unwrap_or(UNKNOWN);
    match port {
        Some(port) => format!("{}:{}", ip, port),
        None => ip.to_string(),
    }
}

pub fn whereis_title(lookup: &Lookup, player: &PlayerRecord) -> String {
    let name = player
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(&lookup.identifier);
    format!("{} Search Results for {}", lookup.kind, name)
}

pub fn whereis_fields(player: &PlayerRecord) -> Vec<Field> {
    player
        .servers
        .iter()
        .take(MAX_WHEREIS_SERVERS)
        .map(|s| {
            (
                format!("Server `{}`", address(s.ip.as_deref(), s.port)),
                seen(s.first_seen.as_ref(), s.last_seen.as_ref()),
                false,
            )
        })
        .collect()
}

/// Falls back to the address that was asked about when the response omits it.
pub fn whois_title(server_ip: &str, who: &WhoResponse) -> String {
    let address = match &who.server {
        Some(server) if server.ip.is_some() => address(server.ip.as_deref(), server.port),
        _ => server_ip.to_string(),
    };
    format!("Players Seen on Server `{}`", address)
}

pub fn whois_fields(who: &WhoResponse) -> Vec<Field> {
    who.players
        .iter()
        .take(MAX_WHOIS_PLAYERS)
        .map(|p| {
            (
                format!(
                    "{} (`{}`)",
                    p.name.as_deref().unwrap_or(UNKNOWN),
                    p.uuid.as_deref().unwrap_or(UNKNOWN)
                ),
                seen(p.first_seen.as_ref(), p.last_seen.as_ref()),
                false,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{PlayerSighting, ServerEndpoint, ServerSighting};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn lookup_requires_exactly_one_identifier() {
        assert_eq!(
            lookup_from(None, None),
            Err("Please provide either a username or a UUID.")
        );
        assert_eq!(
            lookup_from(Some("Notch".into()), Some("abc".into())),
            Err("Please only provide **one** of username or UUID.")
        );
        assert_eq!(
            lookup_from(Some(" Notch ".into()), Some("".into())).unwrap(),
            Lookup { identifier: "Notch".into(), kind: "Username" }
        );
        assert_eq!(lookup_from(None, Some("abc".into())).unwrap().kind, "UUID");
    }

    #[test]
    fn whereis_lists_each_server_up_to_limit() {
        let player = PlayerRecord {
            name: Some("Notch".into()),
            uuid: None,
            servers: (0..12)
                .map(|i| ServerSighting {
                    ip: Some(format!("10.0.0.{}", i)),
                    port: Some(25565),
                    first_seen: Some(at(100)),
                    last_seen: Some(at(200)),
                })
                .collect(),
        };

        let fields = whereis_fields(&player);
        assert_eq!(fields.len(), MAX_WHEREIS_SERVERS);
        assert_eq!(fields[0].0, "Server `10.0.0.0:25565`");
        assert_eq!(
            fields[0].1,
            "**First Seen:** <t:100:R>\n**Last Seen:** <t:200:R>"
        );

        let lookup = Lookup { identifier: "notch".into(), kind: "Username" };
        assert_eq!(whereis_title(&lookup, &player), "Username Search Results for Notch");
    }

    #[test]
    fn whois_lists_players() {
        let who = WhoResponse {
            server: Some(ServerEndpoint {
                ip: Some("1.2.3.4".into()),
                port: Some(25566),
            }),
            players: (0..25)
                .map(|i| PlayerSighting {
                    name: Some(format!("p{}", i)),
                    uuid: Some(format!("u{}", i)),
                    first_seen: Some(at(1)),
                    last_seen: Some(at(2)),
                })
                .collect(),
        };

        assert_eq!(
            whois_title("1.2.3.4:25566", &who),
            "Players Seen on Server `1.2.3.4:25566`"
        );
        let fields = whois_fields(&who);
        assert_eq!(fields.len(), MAX_WHOIS_PLAYERS);
        assert_eq!(fields[3].0, "p3 (`u3`)");
    }

    #[test]
    fn missing_values_render_as_unknown() {
        let who = WhoResponse {
            server: None,
            players: vec![PlayerSighting {
                name: Some("Steve".into()),
                first_seen: Some(at(5)),
                ..Default::default()
            }],
        };
        assert_eq!(whois_title("mc.example.org", &who), "Players Seen on Server `mc.example.org`");
        let fields = whois_fields(&who);
        assert_eq!(fields[0].0, "Steve (`Unknown`)");
        assert_eq!(fields[0].1, "**First Seen:** <t:5:R>\n**Last Seen:** Unknown");

        let player = PlayerRecord {
            servers: vec![
                ServerSighting {
                    ip: Some("1.2.3.4".into()),
                    ..Default::default()
                },
                ServerSighting::default(),
            ],
            ..Default::default()
        };
        let fields = whereis_fields(&player);
        assert_eq!(fields[0].0, "Server `1.2.3.4`");
        assert_eq!(fields[1].0, "Server `Unknown`");
        assert_eq!(fields[1].1, "**First Seen:** Unknown\n**Last Seen:** Unknown");

        let lookup = Lookup { identifier: "Notch".into(), kind: "Username" };
        assert_eq!(whereis_title(&lookup, &player), "Username Search Results for Notch");
    }
}
