use crate::error::{BitacoraError, Result};
use crate::paths;
use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Upper bound on occurrences generated for one recurring series.
pub const MAX_SERIES_OCCURRENCES: u32 = 366;

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Reservation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Active,
    Cancelled,
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: String,
    pub room_id: String,
    pub title: String,
    pub organizer: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: ReservationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    fn overlaps(&self, room_id: &str, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.is_active() && self.room_id == room_id && self.start < end && start < self.end
    }

    pub fn occurs_on(&self, day: NaiveDate) -> bool {
        self.start.date() <= day && day <= self.end.date()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReservation {
    pub room_id: String,
    pub title: String,
    pub organizer: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct ReservationUpdate {
    pub room_id: Option<String>,
    pub title: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

// ---------------------------------------------------------------------------
// Recurring series
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
}

impl std::str::FromStr for Frequency {
    type Err = BitacoraError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            _ => Err(BitacoraError::InvalidValue {
                field: "frequency".to_string(),
                reason: format!("'{s}' is not one of daily, weekly"),
            }),
        }
    }
}

/// Repetition of a reservation. A series must end, either on a date or after
/// a number of occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesPlan {
    pub frequency: Frequency,
    pub interval: u32,
    pub until: Option<NaiveDate>,
    pub count: Option<u32>,
}

impl SeriesPlan {
    fn step_days(&self) -> u64 {
        let unit = match self.frequency {
            Frequency::Daily => 1,
            Frequency::Weekly => 7,
        };
        unit * u64::from(self.interval)
    }

    /// Start/end pairs for every occurrence, first one included.
    pub fn occurrences(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<(NaiveDateTime, NaiveDateTime)>> {
        if self.interval == 0 {
            return Err(BitacoraError::InvalidValue {
                field: "interval".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.until.is_none() && self.count.is_none() {
            return Err(BitacoraError::InvalidValue {
                field: "series".to_string(),
                reason: "needs an end date or an occurrence count".to_string(),
            });
        }
        let limit = self
            .count
            .unwrap_or(MAX_SERIES_OCCURRENCES)
            .min(MAX_SERIES_OCCURRENCES);

        let mut out = Vec::new();
        let (mut s, mut e) = (start, end);
        while (out.len() as u32) < limit {
            if self.until.is_some_and(|u| s.date() > u) {
                break;
            }
            out.push((s, e));
            let step = Days::new(self.step_days());
            match (s.checked_add_days(step), e.checked_add_days(step)) {
                (Some(ns), Some(ne)) => (s, e) = (ns, ne),
                _ => break,
            }
        }
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// ReservationBook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ReservationBook {
    pub rooms: Vec<Room>,
    pub reservations: Vec<Reservation>,
}

impl ReservationBook {
    // ---------------------------------------------------------------------------
    // Persistence
    // ---------------------------------------------------------------------------

    pub fn load(root: &Path) -> Result<Self> {
        Ok(Self {
            rooms: crate::io::read_yaml_or_default(&paths::rooms_path(root))?,
            reservations: crate::io::read_yaml_or_default(&paths::reservations_path(root))?,
        })
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        crate::io::write_yaml(&paths::rooms_path(root), &self.rooms)?;
        crate::io::write_yaml(&paths::reservations_path(root), &self.reservations)
    }

    // ---------------------------------------------------------------------------
    // Rooms
    // ---------------------------------------------------------------------------

    pub fn add_room(&mut self, room: Room) -> Result<&Room> {
        paths::validate_id(&room.id)?;
        if self.room(&room.id).is_ok() {
            return Err(BitacoraError::RoomExists(room.id));
        }
        self.rooms.push(room);
        Ok(&self.rooms[self.rooms.len() - 1])
    }

    pub fn room(&self, id: &str) -> Result<&Room> {
        self.rooms
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| BitacoraError::RoomNotFound(id.to_string()))
    }

    // ---------------------------------------------------------------------------
    // Reservations
    // ---------------------------------------------------------------------------

    pub fn get(&self, id: &str) -> Result<&Reservation> {
        self.reservations
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| BitacoraError::ReservationNotFound(id.to_string()))
    }

    /// Active and cancelled reservations, optionally narrowed to a room or
    /// day, ordered by start time.
    pub fn list(
        &self,
        room_id: Option<&str>,
        day: Option<NaiveDate>,
        include_cancelled: bool,
    ) -> Vec<&Reservation> {
        let mut out: Vec<&Reservation> = self
            .reservations
            .iter()
            .filter(|r| include_cancelled || r.is_active())
            .filter(|r| room_id.map_or(true, |id| r.room_id == id))
            .filter(|r| day.map_or(true, |d| r.occurs_on(d)))
            .collect();
        out.sort_by_key(|r| r.start);
        out
    }

    fn check_slot(
        &self,
        room_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        ignore: Option<&str>,
    ) -> Result<()> {
        self.room(room_id)?;
        if end <= start {
            return Err(BitacoraError::InvalidValue {
                field: "end".to_string(),
                reason: format!("{end} is not after start {start}"),
            });
        }
        let clash = self
            .reservations
            .iter()
            .filter(|r| Some(r.id.as_str()) != ignore)
            .find(|r| r.overlaps(room_id, start, end));
        if let Some(r) = clash {
            return Err(BitacoraError::ReservationConflict {
                room: room_id.to_string(),
                title: r.title.clone(),
                start: r.start.to_string(),
                end: r.end.to_string(),
            });
        }
        Ok(())
    }

    fn push(
        &mut self,
        new: &NewReservation,
        start: NaiveDateTime,
        end: NaiveDateTime,
        series_id: Option<String>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.reservations.push(Reservation {
            id: id.clone(),
            room_id: new.room_id.clone(),
            title: new.title.clone(),
            organizer: new.organizer.clone(),
            start,
            end,
            status: ReservationStatus::Active,
            series_id,
            created_at: Utc::now(),
        });
        id
    }

    pub fn create(&mut self, new: NewReservation) -> Result<&Reservation> {
        self.check_slot(&new.room_id, new.start, new.end, None)?;
        let id = self.push(&new, new.start, new.end, None);
        info!(id = %id, room = %new.room_id, "reservation created");
        self.get(&id)
    }

    /// Book every occurrence of a series, or none of them if any slot is taken.
    pub fn create_series(&mut self, new: NewReservation, plan: SeriesPlan) -> Result<Vec<String>> {
        let slots = plan.occurrences(new.start, new.end)?;
        let mut staged = self.clone();
        let series_id = Uuid::new_v4().to_string();
        let mut ids = Vec::with_capacity(slots.len());
        for (start, end) in slots {
            staged.check_slot(&new.room_id, start, end, None)?;
            ids.push(staged.push(&new, start, end, Some(series_id.clone())));
        }
        *self = staged;
        info!(series = %series_id, occurrences = ids.len(), "reservation series created");
        Ok(ids)
    }

    pub fn update(&mut self, id: &str, update: ReservationUpdate) -> Result<&Reservation> {
        let current = self.get(id)?.clone();
        if !current.is_active() {
            return Err(BitacoraError::InvalidValue {
                field: "reservation".to_string(),
                reason: format!("{id} is cancelled"),
            });
        }
        let room_id = update.room_id.unwrap_or(current.room_id);
        let start = update.start.unwrap_or(current.start);
        let end = update.end.unwrap_or(current.end);
        self.check_slot(&room_id, start, end, Some(id))?;

        let r = self
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BitacoraError::ReservationNotFound(id.to_string()))?;
        r.room_id = room_id;
        r.start = start;
        r.end = end;
        if let Some(title) = update.title {
            r.title = title;
        }
        info!(id = %id, "reservation updated");
        Ok(r)
    }

    pub fn cancel(&mut self, id: &str) -> Result<&Reservation> {
        let r = self
            .reservations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| BitacoraError::ReservationNotFound(id.to_string()))?;
        r.status = ReservationStatus::Cancelled;
        info!(id = %id, "reservation cancelled");
        Ok(r)
    }

    /// Cancel every still-active occurrence of a series. Returns how many changed.
    pub fn cancel_series(&mut self, series_id: &str) -> usize {
        let mut n = 0;
        for r in self
            .reservations
            .iter_mut()
            .filter(|r| r.series_id.as_deref() == Some(series_id) && r.is_active())
        {
            r.status = ReservationStatus::Cancelled;
            n += 1;
        }
        n
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
