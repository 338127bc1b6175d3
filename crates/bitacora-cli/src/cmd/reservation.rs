use crate::cmd::{parse_datetime, Project};
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use bitacora_core::reservation::{
    Frequency, NewReservation, Reservation, ReservationBook, ReservationUpdate, SeriesPlan,
};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Subcommand};
use std::path::Path;

#[derive(Args)]
pub struct Booking {
    #[arg(long)]
    room: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    organizer: String,
    /// Start, e.g. "2024-06-10 09:00"
    #[arg(long, value_parser = parse_datetime)]
    start: NaiveDateTime,
    /// End, after the start
    #[arg(long, value_parser = parse_datetime)]
    end: NaiveDateTime,
}

impl From<Booking> for NewReservation {
    fn from(b: Booking) -> Self {
        NewReservation {
            room_id: b.room,
            title: b.title,
            organizer: b.organizer,
            start: b.start,
            end: b.end,
        }
    }
}

#[derive(Subcommand)]
pub enum ReservationSubcommand {
    /// Book a room
    Create {
        #[command(flatten)]
        booking: Booking,
    },
    /// Book a room repeatedly; nothing is booked if any occurrence clashes
    Series {
        #[command(flatten)]
        booking: Booking,
        /// daily or weekly
        #[arg(long, default_value = "weekly")]
        frequency: Frequency,
        /// Repeat every N days or weeks
        #[arg(long, default_value_t = 1)]
        interval: u32,
        /// Last day an occurrence may start on
        #[arg(long)]
        until: Option<NaiveDate>,
        /// Number of occurrences
        #[arg(long)]
        count: Option<u32>,
    },
    /// List reservations
    List {
        #[arg(long)]
        room: Option<String>,
        /// Only reservations touching this day
        #[arg(long)]
        day: Option<NaiveDate>,
        /// Include cancelled reservations
        #[arg(long)]
        all: bool,
    },
    /// Move, retitle or change the room of a reservation
    Update {
        id: String,
        #[arg(long)]
        room: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_parser = parse_datetime)]
        start: Option<NaiveDateTime>,
        #[arg(long, value_parser = parse_datetime)]
        end: Option<NaiveDateTime>,
    },
    /// Cancel a reservation, or with --series every occurrence of its series
    Cancel {
        id: String,
        #[arg(long)]
        series: bool,
    },
}

pub fn run(root: &Path, subcmd: ReservationSubcommand, json: bool) -> anyhow::Result<()> {
    Project::load(root)?;
    let mut book = ReservationBook::load(root).context("failed to load reservations")?;
    match subcmd {
        ReservationSubcommand::Create { booking } => {
            let r = book.create(booking.into())?.clone();
            book.save(root).context("failed to save reservations")?;
            print_one("Booked", &r, json)
        }
        ReservationSubcommand::Series {
            booking,
            frequency,
            interval,
            until,
            count,
        } => {
            let plan = SeriesPlan {
                frequency,
                interval,
                until,
                count,
            };
            let ids = book.create_series(booking.into(), plan)?;
            book.save(root).context("failed to save reservations")?;
            if json {
                print_json(&serde_json::json!({ "created": ids }))?;
            } else {
                println!("Booked {} occurrence(s)", ids.len());
            }
            Ok(())
        }
        ReservationSubcommand::List { room, day, all } => {
            list(&book.list(room.as_deref(), day, all), json)
        }
        ReservationSubcommand::Update {
            id,
            room,
            title,
            start,
            end,
        } => {
            let update = ReservationUpdate {
                room_id: room,
                title,
                start,
                end,
            };
            let r = book.update(&id, update)?.clone();
            book.save(root).context("failed to save reservations")?;
            print_one("Updated", &r, json)
        }
        ReservationSubcommand::Cancel { id, series } => {
            let series_id = book.get(&id)?.series_id.clone();
            let cancelled = match series_id.filter(|_| series) {
                Some(sid) => book.cancel_series(&sid),
                None => {
                    book.cancel(&id)?;
                    1
                }
            };
            book.save(root).context("failed to save reservations")?;
            if json {
                print_json(&serde_json::json!({ "id": id, "cancelled": cancelled }))?;
            } else {
                println!("Cancelled {cancelled} reservation(s)");
            }
            Ok(())
        }
    }
}

fn print_one(verb: &str, r: &Reservation, json: bool) -> anyhow::Result<()> {
    if json {
        print_json(r)?;
    } else {
        println!(
            "{verb} '{}' in {} from {} to {} [{}]",
            r.title, r.room_id, r.start, r.end, r.id
        );
    }
    Ok(())
}

fn list(reservations: &[&Reservation], json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&reservations);
    }
    if reservations.is_empty() {
        println!("No reservations.");
        return Ok(());
    }
    let rows = reservations
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.room_id.clone(),
                r.start.format("%Y-%m-%d %H:%M").to_string(),
                r.end.format("%Y-%m-%d %H:%M").to_string(),
                r.title.clone(),
                r.organizer.clone(),
                r.status.to_string(),
                or_dash(r.series_id.as_deref()),
            ]
        })
        .collect();
    print_table(
        &["ID", "ROOM", "START", "END", "TITLE", "ORGANIZER", "STATUS", "SERIES"],
        rows,
    );
    Ok(())
}
