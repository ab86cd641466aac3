//! Fixed-width encoding of [`Index`] records.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc};

use super::did::{decode_address, NftDid, ADDRESS_LENGTH, DID_LENGTH};
use super::error::IndexError;
use super::types::{Index, Source, Subject};

/// Length of the inverted date part.
pub const DATE_LENGTH: usize = 6;
/// Length of the `HHMMSS` time part.
pub const TIME_LENGTH: usize = 6;
/// Length of both filler parts.
pub const FILLER_LENGTH: usize = 2;
/// Length of the padded data version part.
pub const DATA_VERSION_LENGTH: usize = 20;

/// Length of the fixed-width prefix of every index key. Anything beyond it is
/// the optional tail.
pub const TOTAL_LENGTH: usize = DID_LENGTH
    + DATE_LENGTH
    + TIME_LENGTH
    + FILLER_LENGTH
    + ADDRESS_LENGTH
    + DATA_VERSION_LENGTH
    + FILLER_LENGTH
    + DID_LENGTH;

/// The date part is `DATE_MAX - yymmdd`.
pub const DATE_MAX: u32 = 999_999;

pub const DEFAULT_PRIMARY_FILLER: &str = "MM";
pub const DEFAULT_SECONDARY_FILLER: &str = "00";

/// Left padding of the data version part.
pub const DATA_VERSION_PADDING: char = '!';

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2099;

const TIME_FORMAT: &str = "%H%M%S";

/// Encode an index into its key string.
///
/// The key format is:
///
/// ```text
/// subject + date + time + primaryFiller + source + dataVersion + secondaryFiller + producer + optional
/// ```
///
/// where:
///   - subject and producer are 64 character DID slugs (see [`NftDid::encode`])
///   - date is `999999 - (yy * 10000 + mm * 100 + dd)` as 6 digits, so later
///     dates sort first
///   - time is `HHMMSS` in UTC
///   - both fillers are 2 characters, defaulting to "MM" and "00"
///   - source is a 40 character hex address without `0x`
///   - dataVersion is left-padded with `!` or truncated to 20 bytes
///   - optional is appended as is
///
/// Truncation of the data version is lossy; decoding only recovers the first
/// 20 bytes.
pub fn encode_index(index: &Index) -> Result<String, IndexError> {
    let index = with_defaults(index);
    validate_index(&index)?;

    let timestamp = index.timestamp;
    let yymmdd =
        (timestamp.year() % 100) as u32 * 10_000 + timestamp.month() * 100 + timestamp.day();
    let date_part = DATE_MAX - yymmdd;
    let time_part = timestamp.format(TIME_FORMAT);

    Ok(format!(
        "{}{:06}{}{}{}{}{}{}{}",
        index.subject.encode(),
        date_part,
        time_part,
        index.primary_filler,
        index.source.encode(),
        encode_data_version(&index.data_version),
        index.secondary_filler,
        index.producer.encode(),
        index.optional,
    ))
}

/// Decode a key string produced by [`encode_index`].
///
/// Day of month is only range checked (1-31); out-of-month days roll over
/// into the following month.
pub fn decode_index(key: &str) -> Result<Index, IndexError> {
    if key.len() < TOTAL_LENGTH {
        return Err(IndexError::TooShort {
            len: key.len(),
            min: TOTAL_LENGTH,
        });
    }

    let mut parts = KeyParts::new(key);
    let subject_part = parts.next("subject", DID_LENGTH)?;
    let date_part = parts.next("date", DATE_LENGTH)?;
    let time_part = parts.next("time", TIME_LENGTH)?;
    let primary_filler = parts.next("primary filler", FILLER_LENGTH)?;
    let source_part = parts.next("source", ADDRESS_LENGTH)?;
    let data_version_part = parts.next("data version", DATA_VERSION_LENGTH)?;
    let secondary_filler = parts.next("secondary filler", FILLER_LENGTH)?;
    let producer_part = parts.next("producer", DID_LENGTH)?;
    let optional = parts.rest();

    let subject = NftDid::decode(subject_part)?;
    let timestamp = decode_timestamp(date_part, time_part)?;
    let source = decode_address(source_part)?;
    let producer = NftDid::decode(producer_part)?;

    Ok(Index {
        subject: Subject::Did(subject),
        timestamp,
        primary_filler: primary_filler.to_string(),
        source: Source::Address(source),
        data_version: decode_data_version(data_version_part),
        secondary_filler: secondary_filler.to_string(),
        producer: Subject::Did(producer),
        optional: optional.to_string(),
    })
}

/// Return a copy of the index with empty fillers replaced by their defaults.
pub fn with_defaults(index: &Index) -> Index {
    let mut index = index.clone();
    if index.primary_filler.is_empty() {
        index.primary_filler = DEFAULT_PRIMARY_FILLER.to_string();
    }
    if index.secondary_filler.is_empty() {
        index.secondary_filler = DEFAULT_SECONDARY_FILLER.to_string();
    }
    index
}

/// Check the constraints [`encode_index`] relies on. Defaults are not applied.
pub fn validate_index(index: &Index) -> Result<(), IndexError> {
    if index.primary_filler.len() != FILLER_LENGTH {
        return Err(IndexError::invalid(format!(
            "primary filler length must be {}, got {:?}",
            FILLER_LENGTH, index.primary_filler
        )));
    }
    if index.secondary_filler.len() != FILLER_LENGTH {
        return Err(IndexError::invalid(format!(
            "secondary filler length must be {}, got {:?}",
            FILLER_LENGTH, index.secondary_filler
        )));
    }
    validate_timestamp(&index.timestamp).map_err(IndexError::InvalidIndex)
}

/// The two digit year encoding only covers 2000 through 2099.
pub fn validate_timestamp(timestamp: &DateTime<Utc>) -> Result<(), String> {
    let year = timestamp.year();
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(format!(
            "timestamp year must be between {} and {}, got {}",
            MIN_YEAR, MAX_YEAR, year
        ));
    }
    Ok(())
}

/// Pad the data version with `!` on the left or truncate it to 20 bytes.
///
/// The limit is in bytes, not characters: a version with multi-byte
/// characters keeps fewer than 20 of them, and only versions of at most 20
/// bytes survive a round trip. Truncation backs off to the nearest character
/// boundary, padding fills the difference.
pub fn encode_data_version(data_version: &str) -> String {
    let mut end = data_version.len().min(DATA_VERSION_LENGTH);
    while !data_version.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &data_version[..end];

    let mut encoded = String::with_capacity(DATA_VERSION_LENGTH);
    encoded.extend(std::iter::repeat(DATA_VERSION_PADDING).take(DATA_VERSION_LENGTH - truncated.len()));
    encoded.push_str(truncated);
    encoded
}

/// Strip the left padding added by [`encode_data_version`].
pub fn decode_data_version(encoded: &str) -> String {
    encoded.trim_start_matches(DATA_VERSION_PADDING).to_string()
}

fn decode_timestamp(date_part: &str, time_part: &str) -> Result<DateTime<Utc>, IndexError> {
    if !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IndexError::format(format!("date part {:?} is not numeric", date_part)));
    }
    let date_value: u32 = date_part
        .parse()
        .map_err(|_| IndexError::format(format!("date part {:?} is not numeric", date_part)))?;
    let yymmdd = DATE_MAX - date_value;

    let year = (yymmdd / 10_000) as i32 + MIN_YEAR;
    let month = (yymmdd % 10_000) / 100;
    let day = yymmdd % 100;

    if !(1..=12).contains(&month) {
        return Err(IndexError::format(format!("month {} out of range", month)));
    }
    if !(1..=31).contains(&day) {
        return Err(IndexError::format(format!("day {} out of range", day)));
    }

    let time = NaiveTime::parse_from_str(time_part, TIME_FORMAT)
        .map_err(|e| IndexError::format(format!("time part {:?}: {}", time_part, e)))?;

    let first_of_month = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| IndexError::format(format!("invalid date {}-{:02}", year, month)))?;
    let date = first_of_month + Duration::days(i64::from(day) - 1);

    let naive = date
        .and_hms_opt(time.hour(), time.minute(), time.second())
        .ok_or_else(|| IndexError::format(format!("time part {:?} out of range", time_part)))?;

    Ok(naive.and_utc())
}

/// Walks the fixed-width fields of a key left to right.
struct KeyParts<'a> {
    key: &'a str,
    start: usize,
}

impl<'a> KeyParts<'a> {
    fn new(key: &'a str) -> Self {
        Self { key, start: 0 }
    }

    fn next(&mut self, field: &str, len: usize) -> Result<&'a str, IndexError> {
        let end = self.start + len;
        let part = self.key.get(self.start..end).ok_or_else(|| {
            IndexError::format(format!(
                "{} part at offset {} is not on a character boundary",
                field, self.start
            ))
        })?;
        self.start = end;
        Ok(part)
    }

    fn rest(&self) -> &'a str {
        &self.key[self.start..]
    }
}
