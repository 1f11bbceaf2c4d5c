use super::{Archive, WaveformRecord};

use crate::{catalog::CmtSolution, errors::SeisDataErr, network::NetworkCode};

impl Archive {
    /// Record an event. Adding the same event again replaces the old record.
    pub fn add_event(&self, cmt: &CmtSolution) -> Result<(), SeisDataErr> {
        let header = &cmt.header;
        let region = if header.region.is_empty() {
            None
        } else {
            Some(header.region.clone())
        };

        self.db_conn.execute(
            "INSERT OR REPLACE INTO events
                (event_id, origin, latitude, longitude, depth_km, magnitude, region)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &[
                &header.event_id() as &dyn rusqlite::types::ToSql,
                &header.origin as &dyn rusqlite::types::ToSql,
                &header.latitude,
                &header.longitude,
                &header.depth,
                &header.magnitude(),
                &region,
            ],
        )?;

        Ok(())
    }

    /// Record a downloaded waveform. Paths inside the archive root are stored relative to it.
    pub fn add_waveform(&self, record: &WaveformRecord) -> Result<(), SeisDataErr> {
        let relative = |path: &std::path::Path| -> String {
            path.strip_prefix(&self.root)
                .unwrap_or(path)
                .to_string_lossy()
                .into_owned()
        };

        self.db_conn.execute(
            "INSERT OR REPLACE INTO waveforms
                (event_id, network, start_time, span_minutes, data_file, ctable_file)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            &[
                &record.event_id as &dyn rusqlite::types::ToSql,
                &record.network,
                &record.start_time,
                &record.span_minutes,
                &relative(&record.data_file),
                &relative(&record.ctable_file),
            ],
        )?;

        Ok(())
    }

    /// Forget a downloaded waveform so it will be fetched again.
    pub fn remove_waveform(&self, event_id: &str, network: &NetworkCode) -> Result<(), SeisDataErr> {
        self.db_conn.execute(
            "DELETE FROM waveforms WHERE event_id = ?1 AND network = ?2",
            &[event_id, network.as_str()],
        )?;

        Ok(())
    }
}
