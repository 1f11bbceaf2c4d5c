//! Client for the NIED Hi-net continuous waveform service.
//!
//! All times handed to the service are Japan Standard Time.

use chrono::{Duration, NaiveDateTime, Timelike};

use crate::{catalog::PdeHeader, config::HinetConfig};

pub use self::client::HinetClient;
pub use self::status::{parse_status_page, RequestState, RequestStatus};

mod client;
mod status;

/// Root of the authenticated part of the service.
pub const AUTH_URL: &str = "https://hinetwww11.bosai.go.jp/auth/";
/// Directory holding the continuous waveform pages.
pub const CONT_URL: &str = "https://hinetwww11.bosai.go.jp/auth/download/cont/";

/// The data to download for one event.
#[derive(Clone, Debug, PartialEq)]
pub struct EventWindow {
    /// Event id, `YYYYMMDDhhmmss`.
    pub event_id: String,
    /// Start of the window in the service's time zone.
    pub start: NaiveDateTime,
    /// Minutes of data.
    pub span_minutes: u32,
}

impl EventWindow {
    /// The window around a catalog origin. Fractional seconds of the origin are dropped.
    pub fn for_event(header: &PdeHeader, config: &HinetConfig) -> Self {
        let origin = header.origin.with_nanosecond(0).unwrap_or(header.origin);
        let before = Duration::milliseconds((config.before_minutes * 60_000.0).round() as i64);

        EventWindow {
            event_id: header.event_id(),
            start: origin + Duration::hours(i64::from(config.timezone_offset_hours)) - before,
            span_minutes: config.duration_minutes,
        }
    }

    /// The service works in whole minutes, this is the start rounded down to the minute.
    pub fn request_start(&self) -> NaiveDateTime {
        truncate_to_minute(&self.start)
    }
}

fn truncate_to_minute(time: &NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(*time)
}

/// Split a request into pieces no longer than `max_span` minutes.
pub fn split_span(
    start: &NaiveDateTime,
    span_minutes: u32,
    max_span: u32,
) -> Vec<(NaiveDateTime, u32)> {
    let max_span = max_span.max(1);
    let mut pieces = vec![];

    let mut offset = 0;
    while offset < span_minutes {
        let span = max_span.min(span_minutes - offset);
        pieces.push((*start + Duration::minutes(i64::from(offset)), span));
        offset += span;
    }

    pieces
}

/*--------------------------------------------------------------------------------------------------
                                          Unit Tests
--------------------------------------------------------------------------------------------------*/
#[cfg(test)]
mod unit {
    use super::*;

    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2011, 3, 11)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_event_window() {
        let header = PdeHeader::parse(
            " PDE 2011  3 11  5 46 23.70  38.2960  142.4980  19.7 7.9 9.1 HONSHU",
        )
        .unwrap();

        let window = EventWindow::for_event(&header, &HinetConfig::default());

        assert_eq!(window.event_id, "20110311054623");
        assert_eq!(window.start, at(14, 43, 53));
        assert_eq!(window.request_start(), at(14, 43, 0));
        assert_eq!(window.span_minutes, 8);
    }

    #[test]
    fn test_window_crosses_midnight() {
        let header = PdeHeader::parse(
            " PDE 2011 12 31 15 01 00.00  38.2960  142.4980  19.7 5.0 5.1 HONSHU",
        )
        .unwrap();

        let window = EventWindow::for_event(&header, &HinetConfig::default());
        assert_eq!(
            window.start,
            NaiveDate::from_ymd_opt(2012, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
                - Duration::seconds(90)
        );
    }

    #[test]
    fn test_split_span() {
        let start = at(14, 43, 0);

        assert_eq!(split_span(&start, 8, 60), vec![(start, 8)]);
        assert_eq!(
            split_span(&start, 12, 5),
            vec![(start, 5), (at(14, 48, 0), 5), (at(14, 53, 0), 2)]
        );
        assert!(split_span(&start, 0, 5).is_empty());
        assert_eq!(split_span(&start, 2, 0).len(), 2);
    }
}
