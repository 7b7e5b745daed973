use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Workbook date system used to interpret serial date values.
///
/// Spreadsheets support two base date systems:
/// - `Excel1900` (default; includes the Lotus 1-2-3 leap year bug)
/// - `Excel1904` (default on older Mac versions)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DateSystem {
    #[serde(rename = "excel1900")]
    Excel1900,
    #[serde(rename = "excel1904")]
    Excel1904,
}

impl Default for DateSystem {
    fn default() -> Self {
        Self::Excel1900
    }
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Serial value of 9999-12-31, the last date hosts represent.
const MAX_SERIAL_DAYS: i64 = 2_958_465;

/// Convert a serial day-count value to a date-time.
///
/// In the 1900 system serial 1 is 1900-01-01; serials below 60 are offset by
/// the phantom 1900-02-29 the Lotus bug introduced. Returns `None` for
/// negative serials or values outside the representable date range.
pub fn serial_to_datetime(serial: f64, system: DateSystem) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL_DAYS as f64 {
        return None;
    }
    let days = serial.floor() as i64;
    let secs = ((serial - days as f64) * SECONDS_PER_DAY).round() as i64;

    let base = match system {
        DateSystem::Excel1900 => {
            if days < 60 {
                NaiveDate::from_ymd_opt(1899, 12, 31)?
            } else {
                NaiveDate::from_ymd_opt(1899, 12, 30)?
            }
        }
        DateSystem::Excel1904 => NaiveDate::from_ymd_opt(1904, 1, 1)?,
    };

    base.checked_add_signed(Duration::days(days))?
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(secs))
}

/// Convert a date-time to its serial day-count value.
pub fn datetime_to_serial(value: &NaiveDateTime, system: DateSystem) -> f64 {
    let days = match system {
        DateSystem::Excel1900 => {
            let base = NaiveDate::from_ymd_opt(1899, 12, 30)
                .expect("1899-12-30 is a valid date");
            let d = value.date().signed_duration_since(base).num_days();
            if d < 61 {
                d - 1
            } else {
                d
            }
        }
        DateSystem::Excel1904 => {
            let base = NaiveDate::from_ymd_opt(1904, 1, 1).expect("1904-01-01 is a valid date");
            value.date().signed_duration_since(base).num_days()
        }
    };
    days as f64 + value.time().num_seconds_from_midnight() as f64 / SECONDS_PER_DAY
}
