use crate::cmd::Project;
use crate::output::{or_dash, print_json, print_table};
use anyhow::Context;
use bitacora_core::reservation::{ReservationBook, Room};
use clap::Subcommand;
use std::path::Path;

#[derive(Subcommand)]
pub enum RoomSubcommand {
    /// Register a meeting room
    Add {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 0)]
        capacity: u32,
        #[arg(long)]
        location: Option<String>,
    },
    /// List meeting rooms
    List,
}

pub fn run(root: &Path, subcmd: RoomSubcommand, json: bool) -> anyhow::Result<()> {
    Project::load(root)?;
    let mut book = ReservationBook::load(root).context("failed to load rooms")?;
    match subcmd {
        RoomSubcommand::Add {
            id,
            name,
            capacity,
            location,
        } => {
            let room = book
                .add_room(Room {
                    id,
                    name,
                    capacity,
                    location,
                })?
                .clone();
            book.save(root).context("failed to save rooms")?;
            if json {
                print_json(&room)?;
            } else {
                println!("Added room '{}' ({})", room.id, room.name);
            }
        }
        RoomSubcommand::List => {
            if json {
                return print_json(&book.rooms);
            }
            if book.rooms.is_empty() {
                println!("No rooms.");
                return Ok(());
            }
            let rows = book
                .rooms
                .iter()
                .map(|r| {
                    vec![
                        r.id.clone(),
                        r.name.clone(),
                        r.capacity.to_string(),
                        or_dash(r.location.as_deref()),
                    ]
                })
                .collect();
            print_table(&["ID", "NAME", "CAPACITY", "LOCATION"], rows);
        }
    }
    Ok(())
}
