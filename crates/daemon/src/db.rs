use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use std::fs;
use std::path::{Path, PathBuf};
use studionavi_common::{ClockTime, Studio, StudioId};
use tracing::warn;

use crate::checker::{OpenSlot, RoomAvailability};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS studios (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    address TEXT NOT NULL,
    is_24h INTEGER NOT NULL DEFAULT 0,
    opening_time TEXT,
    closing_time TEXT,
    closes_next_day INTEGER NOT NULL DEFAULT 0,
    reservation_url TEXT NOT NULL DEFAULT '',
    booking_days_before INTEGER,
    booking_opens_at TEXT,
    has_availability INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS rooms (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    studio_id INTEGER NOT NULL REFERENCES studios(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    starts_at_thirty INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS open_slots (
    room_id INTEGER NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    start_time TEXT NOT NULL,
    end_time TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_open_slots_room_date ON open_slots (room_id, date);
"#;

/// Venue details as stored. Display strings are derived from these.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudioProfile {
    pub name: String,
    pub address: String,
    pub is_24h: bool,
    pub opening_time: Option<ClockTime>,
    pub closing_time: Option<ClockTime>,
    pub closes_next_day: bool,
    pub reservation_url: String,
    /// How many days ahead individual practice can be booked.
    pub booking_days_before: Option<u32>,
    pub booking_opens_at: Option<ClockTime>,
    pub has_availability: bool,
}

impl StudioProfile {
    pub fn hours_text(&self) -> String {
        if self.is_24h {
            return "24時間営業".to_string();
        }
        match (self.opening_time, self.closing_time) {
            (Some(open), Some(close)) => {
                let next_day = if self.closes_next_day { "翌" } else { "" };
                format!("{} - {}{}", open, next_day, close)
            }
            _ => String::new(),
        }
    }

    pub fn self_booking_text(&self) -> String {
        match (self.booking_days_before, self.booking_opens_at) {
            (Some(1), Some(at)) => format!("前日 {}〜", at),
            (Some(days), Some(at)) => format!("{}日前 {}〜", days, at),
            _ => String::new(),
        }
    }

    pub fn to_studio(&self, id: StudioId) -> Studio {
        Studio {
            id,
            name: self.name.clone(),
            address: self.address.clone(),
            hours: self.hours_text(),
            self_booking_start: self.self_booking_text(),
            has_availability: self.has_availability,
        }
    }
}

/// Open the database at the given path, creating the directory and schema if needed.
pub fn init_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).ok();
    }

    let conn = Connection::open(path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

pub fn init_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    apply_schema(&conn)?;
    Ok(conn)
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.execute_batch(SCHEMA)
}

/// Get the default database path (~/.studionavi/studios.db)
pub fn default_db_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".studionavi")
        .join("studios.db")
}

pub fn insert_studio(conn: &Connection, profile: &StudioProfile) -> Result<StudioId> {
    conn.execute(
        "INSERT INTO studios (name, address, is_24h, opening_time, closing_time, closes_next_day,
            reservation_url, booking_days_before, booking_opens_at, has_availability)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            profile.name,
            profile.address,
            profile.is_24h,
            profile.opening_time.map(|t| t.to_string()),
            profile.closing_time.map(|t| t.to_string()),
            profile.closes_next_day,
            profile.reservation_url,
            profile.booking_days_before,
            profile.booking_opens_at.map(|t| t.to_string()),
            profile.has_availability,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_room(conn: &Connection, studio_id: StudioId, name: &str, starts_at_thirty: bool) -> Result<i64> {
    conn.execute(
        "INSERT INTO rooms (studio_id, name, starts_at_thirty) VALUES (?1, ?2, ?3)",
        params![studio_id, name, starts_at_thirty],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_open_slot(conn: &Connection, room_id: i64, date: NaiveDate, start: ClockTime, end: ClockTime) -> Result<()> {
    conn.execute(
        "INSERT INTO open_slots (room_id, date, start_time, end_time) VALUES (?1, ?2, ?3, ?4)",
        params![room_id, date.format("%Y-%m-%d").to_string(), start.to_string(), end.to_string()],
    )?;
    Ok(())
}

pub fn count_studios(conn: &Connection) -> Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM studios", [], |row| row.get(0))
}

const STUDIO_COLUMNS: &str = "id, name, address, is_24h, opening_time, closing_time, closes_next_day,
    reservation_url, booking_days_before, booking_opens_at, has_availability";

fn read_studio(row: &Row<'_>) -> Result<Studio> {
    let id: StudioId = row.get(0)?;
    let profile = StudioProfile {
        name: row.get(1)?,
        address: row.get(2)?,
        is_24h: row.get(3)?,
        opening_time: parse_time_column(row.get(4)?),
        closing_time: parse_time_column(row.get(5)?),
        closes_next_day: row.get(6)?,
        reservation_url: row.get(7)?,
        booking_days_before: row.get(8)?,
        booking_opens_at: parse_time_column(row.get(9)?),
        has_availability: row.get(10)?,
    };
    Ok(profile.to_studio(id))
}

fn parse_time_column(value: Option<String>) -> Option<ClockTime> {
    value.and_then(|s| s.parse().ok())
}

pub fn find_studio(conn: &Connection, id: StudioId) -> Result<Option<Studio>> {
    conn.query_row(
        &format!("SELECT {} FROM studios WHERE id = ?1", STUDIO_COLUMNS),
        params![id],
        read_studio,
    )
    .optional()
}

/// Studios whose name or address contains `query`, case-insensitively, in id order.
pub fn search_candidates(conn: &Connection, query: &str) -> Result<Vec<Studio>> {
    let pattern = format!("%{}%", escape_like(query));
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM studios
         WHERE name LIKE ?1 ESCAPE '\\' OR address LIKE ?1 ESCAPE '\\'
         ORDER BY id",
        STUDIO_COLUMNS
    ))?;
    let rows = stmt.query_map(params![pattern], read_studio)?;
    rows.collect()
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Rooms of a studio with their open slots on `date`, rooms in insertion order.
pub fn load_rooms_for_date(conn: &Connection, studio_id: StudioId, date: NaiveDate) -> Result<Vec<RoomAvailability>> {
    let mut rooms_stmt = conn.prepare("SELECT id, name, starts_at_thirty FROM rooms WHERE studio_id = ?1 ORDER BY id")?;
    let rooms: Vec<(i64, String, bool)> = rooms_stmt
        .query_map(params![studio_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<Result<_>>()?;

    let date = date.format("%Y-%m-%d").to_string();
    let mut slots_stmt = conn.prepare(
        "SELECT start_time, end_time FROM open_slots WHERE room_id = ?1 AND date = ?2 ORDER BY start_time",
    )?;

    let mut result = Vec::with_capacity(rooms.len());
    for (room_id, name, starts_at_thirty) in rooms {
        let rows: Vec<(String, String)> = slots_stmt
            .query_map(params![room_id, date], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_>>()?;
        let mut slots = Vec::with_capacity(rows.len());
        for (start, end) in rows {
            match (start.parse(), ClockTime::parse_end(&end)) {
                (Ok(start), Ok(end)) => slots.push(OpenSlot { start, end }),
                _ => warn!(room_id, %start, %end, "skipping open slot with unparsable time"),
            }
        }
        result.push(RoomAvailability {
            room_name: name,
            starts_at_thirty,
            slots,
        });
    }
    Ok(result)
}

/// Insert the demo venues with open slots on `date`. Returns the new studio ids.
pub fn seed_demo(conn: &Connection, date: NaiveDate) -> Result<Vec<StudioId>> {
    let pad = insert_studio(
        conn,
        &StudioProfile {
            name: "PADstudio".to_string(),
            address: "大阪府大阪市中央区西心斎橋2-10-34".to_string(),
            opening_time: Some(ClockTime::at(10, 0)),
            closing_time: Some(ClockTime::at(5, 0)),
            closes_next_day: true,
            reservation_url: "https://www.padstudio.jp/reserve".to_string(),
            booking_days_before: Some(1),
            booking_opens_at: Some(ClockTime::at(12, 0)),
            has_availability: true,
            ..Default::default()
        },
    )?;
    let room = insert_room(conn, pad, "Aスタジオ", false)?;
    insert_open_slot(conn, room, date, ClockTime::at(10, 0), ClockTime::at(13, 0))?;
    insert_open_slot(conn, room, date, ClockTime::at(15, 0), ClockTime::END_OF_DAY)?;
    let room = insert_room(conn, pad, "Bスタジオ", true)?;
    insert_open_slot(conn, room, date, ClockTime::at(11, 0), ClockTime::at(18, 0))?;

    let amemura = insert_studio(
        conn,
        &StudioProfile {
            name: "ベースオントップ アメ村店".to_string(),
            address: "大阪府大阪市中央区西心斎橋2-11-5".to_string(),
            is_24h: true,
            reservation_url: "https://www.studiol.jp/shop/673".to_string(),
            booking_days_before: Some(7),
            booking_opens_at: Some(ClockTime::at(0, 0)),
            has_availability: true,
            ..Default::default()
        },
    )?;
    let room = insert_room(conn, amemura, "1st", false)?;
    insert_open_slot(conn, room, date, ClockTime::at(9, 0), ClockTime::at(12, 0))?;
    insert_open_slot(conn, room, date, ClockTime::at(12, 0), ClockTime::at(16, 0))?;

    let green = insert_studio(
        conn,
        &StudioProfile {
            name: "グリーンスタジオ".to_string(),
            address: "大阪府大阪市北区中崎西1-1-1".to_string(),
            opening_time: Some(ClockTime::at(11, 0)),
            closing_time: Some(ClockTime::at(23, 0)),
            reservation_url: "https://www.studiol.jp/shop/546".to_string(),
            has_availability: true,
            ..Default::default()
        },
    )?;
    insert_room(conn, green, "Room 1", false)?;

    Ok(vec![pad, amemura, green])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 28).unwrap()
    }

    #[test]
    fn profile_display_text() {
        let profile = StudioProfile {
            opening_time: ClockTime::from_hm(10, 0),
            closing_time: ClockTime::from_hm(5, 0),
            closes_next_day: true,
            booking_days_before: Some(1),
            booking_opens_at: ClockTime::from_hm(12, 0),
            ..Default::default()
        };
        assert_eq!(profile.hours_text(), "10:00 - 翌05:00");
        assert_eq!(profile.self_booking_text(), "前日 12:00〜");

        let profile = StudioProfile {
            is_24h: true,
            booking_days_before: Some(7),
            booking_opens_at: ClockTime::from_hm(0, 0),
            ..Default::default()
        };
        assert_eq!(profile.hours_text(), "24時間営業");
        assert_eq!(profile.self_booking_text(), "7日前 00:00〜");
        assert_eq!(StudioProfile::default().self_booking_text(), "");
    }

    #[test]
    fn studio_roundtrip_through_table() {
        let conn = init_in_memory().unwrap();
        let ids = seed_demo(&conn, date()).unwrap();
        assert_eq!(count_studios(&conn).unwrap(), 3);

        let studio = find_studio(&conn, ids[0]).unwrap().unwrap();
        assert_eq!(studio.name, "PADstudio");
        assert_eq!(studio.hours, "10:00 - 翌05:00");
        assert!(find_studio(&conn, 999).unwrap().is_none());
    }

    #[test]
    fn search_candidates_matches_name_or_address() {
        let conn = init_in_memory().unwrap();
        seed_demo(&conn, date()).unwrap();

        let by_name = search_candidates(&conn, "padstudio").unwrap();
        assert_eq!(by_name.len(), 1);

        let by_address = search_candidates(&conn, "西心斎橋").unwrap();
        assert_eq!(by_address.len(), 2);

        assert!(search_candidates(&conn, "100%").unwrap().is_empty());
    }

    #[test]
    fn rooms_for_date_only_include_that_date() {
        let conn = init_in_memory().unwrap();
        let ids = seed_demo(&conn, date()).unwrap();

        let rooms = load_rooms_for_date(&conn, ids[0], date()).unwrap();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room_name, "Aスタジオ");
        assert_eq!(rooms[0].slots.len(), 2);
        assert_eq!(rooms[0].slots[1].end, ClockTime::END_OF_DAY);
        assert!(rooms[1].starts_at_thirty);

        let other_day = date().succ_opt().unwrap();
        let rooms = load_rooms_for_date(&conn, ids[0], other_day).unwrap();
        assert!(rooms.iter().all(|r| r.slots.is_empty()));
    }

    fn first_room_id(conn: &Connection, studio_id: StudioId) -> i64 {
        conn.query_row(
            "SELECT id FROM rooms WHERE studio_id = ?1 ORDER BY id LIMIT 1",
            params![studio_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn unparsable_slot_times_are_skipped() {
        let conn = init_in_memory().unwrap();
        let ids = seed_demo(&conn, date()).unwrap();
        let room_id = first_room_id(&conn, ids[0]);
        conn.execute(
            "INSERT INTO open_slots (room_id, date, start_time, end_time) VALUES (?1, ?2, '25:99', 'late')",
            params![room_id, date().format("%Y-%m-%d").to_string()],
        )
        .unwrap();

        let rooms = load_rooms_for_date(&conn, ids[0], date()).unwrap();
        assert_eq!(rooms[0].slots.len(), 2);
    }

    #[test]
    fn unreadable_slot_rows_are_an_error() {
        let conn = init_in_memory().unwrap();
        let ids = seed_demo(&conn, date()).unwrap();
        let room_id = first_room_id(&conn, ids[0]);
        conn.execute(
            "INSERT INTO open_slots (room_id, date, start_time, end_time) VALUES (?1, ?2, X'00', '12:00')",
            params![room_id, date().format("%Y-%m-%d").to_string()],
        )
        .unwrap();

        assert!(load_rooms_for_date(&conn, ids[0], date()).is_err());
    }

    #[test]
    fn init_db_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("studios.db");
        let conn = init_db(&path).unwrap();
        assert_eq!(count_studios(&conn).unwrap(), 0);
        assert!(path.exists());
    }
}
