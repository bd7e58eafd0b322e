use crate::error::ApiError;
use crate::interactions::Booking;
use crate::saver::{DebouncedSaver, SaveStatus};
use crate::AppState;
use actix_web::{web, HttpResponse};
use chrono::{Local, NaiveDate};
use guildplan_libs::store::validate_slug;
use guildplan_libs::{Block, BlockError, Event, Player, Room, RoomStore, Session, WeekKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Everything an editor needs to draw a room
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub slug: String,
    pub this_week: WeekKey,
    pub next_week: WeekKey,
    pub selected_week: WeekKey,
    pub week_label: String,
    pub active_player: Option<Player>,
    pub min_free: usize,
    pub save_status: Option<SaveStatus>,
    pub room: Room,
}

impl RoomView {
    fn of(session: &Session) -> RoomView {
        RoomView {
            slug: session.slug().to_string(),
            this_week: session.this_week(),
            next_week: session.next_week(),
            selected_week: session.selected_week(),
            week_label: session.week_label(),
            active_player: session.active_player().cloned(),
            min_free: session.min_free(),
            save_status: None,
            room: session.room().clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OverlapView {
    pub week: WeekKey,
    pub label: String,
    pub min_free: usize,
    pub blocks: Vec<Block>,
    pub fully_synchronized_hours: usize,
    pub events: Vec<Event>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CellRequest {
    week: WeekKey,
    day: usize,
    hour: usize,
    player_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NoteRequest {
    week: WeekKey,
    day: usize,
    hour: usize,
    note: String,
    player_id: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct PlayerRequest {
    name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OverlapQuery {
    week: Option<WeekKey>,
    min_free: Option<usize>,
}

struct OpenRoom {
    session: Session,
    last_used: Instant,
}

/// Open sessions, one per room, plus the saver that persists their edits.
///
/// Every write to a room goes through its session, bot bookings included.
/// Sessions unused for `idle` are dropped once nothing is left to save.
pub struct Rooms {
    store: Arc<dyn RoomStore>,
    sessions: Mutex<HashMap<String, OpenRoom>>,
    saver: DebouncedSaver,
    idle: Duration,
}

impl Rooms {
    pub fn new(store: Arc<dyn RoomStore>, debounce: Duration, idle: Duration) -> Rooms {
        Rooms {
            saver: DebouncedSaver::new(Arc::clone(&store), debounce),
            store,
            sessions: Mutex::new(HashMap::new()),
            idle,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, OpenRoom>>, ApiError> {
        self.sessions.lock().map_err(|_| ApiError::Poisoned)
    }

    async fn load(&self, slug: &str, seed: Room, today: NaiveDate) -> Result<Session, ApiError> {
        validate_slug(slug)?;
        let store = Arc::clone(&self.store);
        let slug = slug.to_string();
        let session =
            web::block(move || Session::open_seeded(store.as_ref(), &slug, &seed, today)).await??;
        info!("opened room {}", session.slug());
        Ok(session)
    }

    fn evict_idle(&self, sessions: &mut HashMap<String, OpenRoom>, keep: &str) {
        let now = Instant::now();
        sessions.retain(|slug, open| {
            let stale = slug != keep
                && now.duration_since(open.last_used) >= self.idle
                && !self.saver.is_pending(slug);
            if stale {
                debug!("closing idle room {}", slug);
                self.saver.forget(slug);
            }
            !stale
        });
    }

    /// Runs `f` on the session of `slug`, opening it first if needed
    pub async fn with_session<T, F>(&self, slug: &str, today: NaiveDate, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Session) -> Result<T, ApiError>,
    {
        let seed = Room::seed(WeekKey::this_week(today));
        self.with_seeded_session(slug, seed, today, f).await
    }

    /// Like `with_session`, creating an unseen room from `seed`
    async fn with_seeded_session<T, F>(
        &self,
        slug: &str,
        seed: Room,
        today: NaiveDate,
        f: F,
    ) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Session) -> Result<T, ApiError>,
    {
        let open = match self.lock()?.get_mut(slug) {
            Some(open) => {
                open.last_used = Instant::now();
                true
            }
            None => false,
        };
        let loaded = if open {
            None
        } else {
            Some(self.load(slug, seed, today).await?)
        };

        let mut sessions = self.lock()?;
        self.evict_idle(&mut sessions, slug);

        let open = match loaded {
            // another request may have opened it meanwhile; keep theirs
            Some(fresh) => sessions.entry(slug.to_string()).or_insert(OpenRoom {
                session: fresh,
                last_used: Instant::now(),
            }),
            None => sessions
                .get_mut(slug)
                .ok_or_else(|| ApiError::NotOpen(slug.to_string()))?,
        };
        open.last_used = Instant::now();

        let session = &mut open.session;
        if session.this_week() != WeekKey::this_week(today) {
            let room = session.room().clone();
            *session = Session::from_room(slug, room, today);
        }

        f(session)
    }

    /// Files a bot booking into `slug`. Unseen rooms start without players.
    pub async fn book(&self, slug: &str, booking: Booking, today: NaiveDate) -> Result<(), ApiError> {
        let room = self
            .with_seeded_session(slug, Room::default(), today, |session| {
                Ok(session.record_event(booking.week, booking.event))
            })
            .await?;
        self.saver.schedule(slug, room);
        Ok(())
    }

    #[cfg(test)]
    fn open_rooms(&self) -> usize {
        self.sessions.lock().map_or(0, |sessions| sessions.len())
    }

    /// Applies an edit and schedules the resulting room for saving
    pub async fn edit<F>(&self, slug: &str, today: NaiveDate, f: F) -> Result<RoomView, ApiError>
    where
        F: FnOnce(&mut Session) -> Result<Room, ApiError>,
    {
        let (room, mut view) = self
            .with_session(slug, today, |session| {
                let room = f(session)?;
                Ok((room, RoomView::of(session)))
            })
            .await?;

        self.saver.schedule(slug, room);
        view.save_status = self.saver.status(slug);
        Ok(view)
    }

    pub async fn view(&self, slug: &str, today: NaiveDate) -> Result<RoomView, ApiError> {
        let mut view = self
            .with_session(slug, today, |session| Ok(RoomView::of(session)))
            .await?;
        view.save_status = self.saver.status(slug);
        Ok(view)
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn get_room(slug: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let view = state.rooms.view(&slug, today()).await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn cycle_cell(
    slug: web::Path<String>,
    body: web::Json<CellRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let view = state
        .rooms
        .edit(&slug, today(), move |session| {
            if let Some(player_id) = &body.player_id {
                session.select_player(player_id)?;
            }
            Ok(session.cycle_cell(body.week, body.day, body.hour)?)
        })
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn edit_note(
    slug: web::Path<String>,
    body: web::Json<NoteRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let view = state
        .rooms
        .edit(&slug, today(), move |session| {
            if let Some(player_id) = &body.player_id {
                session.select_player(player_id)?;
            }
            Ok(session.edit_note(body.week, body.day, body.hour, &body.note)?)
        })
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn add_player(
    slug: web::Path<String>,
    body: web::Json<PlayerRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let view = state
        .rooms
        .edit(&slug, today(), |session| {
            let (room, _) = session.add_player(&body.name)?;
            Ok(room)
        })
        .await?;
    Ok(HttpResponse::Created().json(view))
}

async fn remove_player(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let (slug, player_id) = path.into_inner();
    let view = state
        .rooms
        .edit(&slug, today(), |session| {
            session.select_player(&player_id)?;
            let (room, _) = session.remove_active_player()?;
            Ok(room)
        })
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn reset(slug: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let view = state
        .rooms
        .edit(&slug, today(), |session| Ok(session.reset_all()))
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

async fn overlap(
    slug: web::Path<String>,
    query: web::Query<OverlapQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let view = state
        .rooms
        .with_session(&slug, today(), |session| {
            if let Some(week) = query.week {
                session.select_week(week)?;
            }
            match query.min_free {
                Some(0) => return Err(BlockError::InvalidThreshold(0).into()),
                Some(min_free) => session.set_min_free(min_free),
                None => {}
            }

            Ok(OverlapView {
                week: session.selected_week(),
                label: session.week_label(),
                min_free: session.min_free(),
                blocks: session.blocks()?,
                fully_synchronized_hours: session.fully_synchronized_hours(),
                events: session.events().into_iter().cloned().collect(),
            })
        })
        .await?;
    Ok(HttpResponse::Ok().json(view))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/rooms/{slug}")
            .route("", web::get().to(get_room))
            .route("/cells/cycle", web::post().to(cycle_cell))
            .route("/cells/note", web::post().to(edit_note))
            .route("/players", web::post().to(add_player))
            .route("/players/{id}", web::delete().to(remove_player))
            .route("/reset", web::post().to(reset))
            .route("/overlap", web::get().to(overlap)),
    );
}
