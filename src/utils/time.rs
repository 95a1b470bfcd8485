use anyhow::Result;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Timelike};

const RECORD_DATE_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a string in focuslog.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format(RECORD_DATE_FORMAT).to_string()
}

/// Reverse of [date_to_record_name].
pub fn record_name_to_date(name: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(name, RECORD_DATE_FORMAT)?)
}

/// Calendar date of a session start in the server's time zone.
pub fn local_date(moment: &DateTime<FixedOffset>) -> NaiveDate {
    moment.with_timezone(&Local).date_naive()
}

/// Hour of a session start in the server's time zone.
pub fn local_hour(moment: &DateTime<FixedOffset>) -> i32 {
    moment.with_timezone(&Local).hour() as i32
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{date_to_record_name, record_name_to_date};

    #[test]
    fn test_record_name_parsing() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        assert_eq!(date_to_record_name(date), "2018-07-04");
        assert_eq!(record_name_to_date("2018-07-04").unwrap(), date);
        assert!(record_name_to_date("nodes").is_err());
    }
}
