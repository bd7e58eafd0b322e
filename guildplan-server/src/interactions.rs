use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Local, NaiveDate, Utc};
use guildplan_libs::room::new_id;
use guildplan_libs::{parse_command, Event, WeekKey};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

const PING: u8 = 1;
const APPLICATION_COMMAND: u8 = 2;

const PONG: u8 = 1;
const CHANNEL_MESSAGE_WITH_SOURCE: u8 = 4;

/// Name of the command option carrying the event text
const EVENT_OPTION: &str = "event";
const FALLBACK_AUTHOR: &str = "discord";

#[derive(Deserialize, Debug, Default)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    pub data: Option<CommandData>,
    pub member: Option<Member>,
    pub user: Option<User>,
}

#[derive(Deserialize, Debug, Default)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

#[derive(Deserialize, Debug)]
pub struct CommandOption {
    pub name: String,
    pub value: Option<Value>,
}

#[derive(Deserialize, Debug)]
pub struct Member {
    pub user: Option<User>,
}

#[derive(Deserialize, Debug)]
pub struct User {
    pub username: Option<String>,
}

impl Interaction {
    fn event_text(&self) -> &str {
        self.data
            .iter()
            .flat_map(|data| data.options.iter())
            .find(|option| option.name == EVENT_OPTION)
            .and_then(|option| option.value.as_ref())
            .and_then(Value::as_str)
            .unwrap_or("")
    }

    /// Guild member first, then direct-message user
    fn author(&self) -> String {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
            .and_then(|u| u.username.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| FALLBACK_AUTHOR.to_string())
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct MessageData {
    pub content: String,
}

impl InteractionResponse {
    fn pong() -> Self {
        InteractionResponse {
            kind: PONG,
            data: None,
        }
    }

    fn message(content: String) -> Self {
        InteractionResponse {
            kind: CHANNEL_MESSAGE_WITH_SOURCE,
            data: Some(MessageData { content }),
        }
    }
}

/// An event the bot accepted and still has to store
#[derive(Debug, Clone)]
pub struct Booking {
    pub week: WeekKey,
    pub event: Event,
}

/// Decides the reply to an interaction without touching storage.
///
/// Only an accepted command yields a `Booking`; the reply to it is sent
/// before the booking is saved.
pub fn respond(
    interaction: &Interaction,
    command: &str,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> (InteractionResponse, Option<Booking>) {
    if interaction.kind == PING {
        return (InteractionResponse::pong(), None);
    }

    let name = interaction.data.as_ref().map(|d| d.name.as_str());
    if interaction.kind != APPLICATION_COMMAND || name != Some(command) {
        debug!("ignoring interaction of type {} ({:?})", interaction.kind, name);
        let usage = format!("Use `/{} {}: so 20-24 raid`", command, EVENT_OPTION);
        return (InteractionResponse::message(usage), None);
    }

    let parsed = match parse_command(interaction.event_text()) {
        Ok(parsed) => parsed,
        Err(e) => return (InteractionResponse::message(format!("❌ {}", e)), None),
    };

    let week = WeekKey::this_week(today).plus_weeks(parsed.week_offset);
    let reply = format!("⏳ Saving (week {}): {}", week, parsed.summary());
    let event = Event {
        id: new_id(),
        title: parsed.title,
        day: parsed.day,
        start_hour: parsed.start_hour,
        end_hour: parsed.end_hour,
        created_at: now,
        created_by: interaction.author(),
    };

    (
        InteractionResponse::message(reply),
        Some(Booking { week, event }),
    )
}

async fn record_detached(state: web::Data<AppState>, booking: Booking, today: NaiveDate) {
    let slug = &state.config.allowed_room;
    let title = booking.event.title.clone();

    match state.rooms.book(slug, booking, today).await {
        Ok(()) => info!("bot event {:?} booked into room {}", title, slug),
        Err(e) => error!("booking bot event {:?} into room {} failed: {}", title, slug, e),
    }
}

async fn interaction(body: web::Json<Interaction>, state: web::Data<AppState>) -> HttpResponse {
    let today = Local::now().date_naive();
    let (reply, booking) = respond(&body, &state.config.command, today, Utc::now());

    if let Some(booking) = booking {
        actix_web::rt::spawn(record_detached(state.clone(), booking, today));
    }

    HttpResponse::Ok().json(reply)
}

async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": true, "where": "/interactions" }))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/interactions")
            .route(web::post().to(interaction))
            .route(web::get().to(liveness)),
    );
}
