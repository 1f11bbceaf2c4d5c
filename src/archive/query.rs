use std::path::PathBuf;

use super::{Archive, EventRecord, WaveformRecord};

use crate::{errors::SeisDataErr, network::NetworkCode};

impl Archive {
    /// Retrieve every event in the archive, oldest first.
    pub fn events(&self) -> Result<Vec<EventRecord>, SeisDataErr> {
        let mut stmt = self.db_conn.prepare(
            "
                SELECT event_id, origin, latitude, longitude, depth_km, magnitude, region
                FROM events
                ORDER BY origin ASC
            ",
        )?;

        let vals: Result<Vec<EventRecord>, SeisDataErr> = stmt
            .query_and_then(rusqlite::NO_PARAMS, Self::parse_row_to_event)?
            .map(|res| res.map_err(SeisDataErr::Database))
            .collect();

        vals
    }

    fn parse_row_to_event(row: &rusqlite::Row) -> Result<EventRecord, rusqlite::Error> {
        Ok(EventRecord {
            event_id: row.get(0)?,
            origin: row.get(1)?,
            latitude: row.get(2)?,
            longitude: row.get(3)?,
            depth_km: row.get(4)?,
            magnitude: row.get(5)?,
            region: row.get(6)?,
        })
    }

    /// Retrieve a single event.
    pub fn event(&self, event_id: &str) -> Result<Option<EventRecord>, SeisDataErr> {
        let res = self.db_conn.query_row_and_then(
            "
                SELECT event_id, origin, latitude, longitude, depth_km, magnitude, region
                FROM events
                WHERE event_id = ?1
            ",
            &[event_id],
            Self::parse_row_to_event,
        );

        match res {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Retrieve the waveforms downloaded for an event.
    pub fn waveforms(&self, event_id: &str) -> Result<Vec<WaveformRecord>, SeisDataErr> {
        let mut stmt = self.db_conn.prepare(
            "
                SELECT event_id, network, start_time, span_minutes, data_file, ctable_file
                FROM waveforms
                WHERE event_id = ?1
                ORDER BY network ASC
            ",
        )?;

        let vals: Result<Vec<WaveformRecord>, SeisDataErr> = stmt
            .query_and_then(&[event_id], |row| -> Result<_, rusqlite::Error> {
                let data_file: String = row.get(4)?;
                let ctable_file: String = row.get(5)?;

                Ok(WaveformRecord {
                    event_id: row.get(0)?,
                    network: row.get(1)?,
                    start_time: row.get(2)?,
                    span_minutes: row.get(3)?,
                    data_file: PathBuf::from(data_file),
                    ctable_file: PathBuf::from(ctable_file),
                })
            })?
            .map(|res| res.map_err(SeisDataErr::Database))
            .collect();

        vals
    }

    /// Check if a network has already been downloaded for an event.
    pub fn exists(&self, event_id: &str, network: &NetworkCode) -> Result<bool, SeisDataErr> {
        let num_records: i32 = self.db_conn.query_row(
            "SELECT COUNT(*) FROM waveforms WHERE event_id = ?1 AND network = ?2",
            &[event_id, network.as_str()],
            |row| row.get(0),
        )?;

        Ok(num_records == 1)
    }
}
