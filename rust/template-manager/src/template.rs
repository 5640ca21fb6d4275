//! Template interchange: an ordered list of minutia records with the four
//! fields `X`, `Y`, `Direction` and `Type`. Nothing else is persisted; derived
//! structures are rebuilt by the consumer on load.

use super::fingerprint_base as fpb;

use std::io;

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Errors raised while decoding or encoding minutia records.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A record lacks one of the four mandatory fields.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// The `Type` tag is neither "Ending" nor "Bifurcation".
    #[error("Invalid minutia type: {0:?}")]
    InvalidType(String),

    /// `X` or `Y` lies beyond `MAX_COORDINATE` in either direction.
    #[error("Coordinate {field} out of range: {value}")]
    CoordinateOutOfRange { field: &'static str, value: i32 },

    /// `Direction` does not fit into a byte angle.
    #[error("Direction out of range 0..=255: {0}")]
    DirectionOutOfRange(i64),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One minutia as it appears in the interchange format.
///
/// Every field is optional at parse level so that an incomplete record is
/// reported by the name of the field it misses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinutiaRecord {
    #[serde(rename = "X")]
    pub x: Option<i32>,
    #[serde(rename = "Y")]
    pub y: Option<i32>,
    #[serde(rename = "Direction")]
    pub direction: Option<i64>,
    #[serde(rename = "Type")]
    pub kind: Option<String>,
}

impl MinutiaRecord {
    pub fn to_minutia(&self) -> Result<fpb::Minutia, TemplateError> {
        let x = self.x.ok_or(TemplateError::MissingField("X"))?;
        let y = self.y.ok_or(TemplateError::MissingField("Y"))?;
        let direction = self.direction.ok_or(TemplateError::MissingField("Direction"))?;
        let kind = self.kind.as_deref().ok_or(TemplateError::MissingField("Type"))?;

        for (field, value) in [("X", x), ("Y", y)] {
            if value.unsigned_abs() > fpb::MAX_COORDINATE as u32 {
                return Err(TemplateError::CoordinateOutOfRange { field, value });
            }
        }

        let direction = u8::try_from(direction)
            .map_err(|_| TemplateError::DirectionOutOfRange(direction))?;

        Ok(fpb::Minutia {
            position: fpb::Point { x, y },
            direction,
            kind: kind.parse()?,
        })
    }
}

impl From<&fpb::Minutia> for MinutiaRecord {
    fn from(m: &fpb::Minutia) -> Self {
        MinutiaRecord {
            x: Some(m.position.x),
            y: Some(m.position.y),
            direction: Some(m.direction as i64),
            kind: Some(m.kind.as_str().to_string()),
        }
    }
}

/// Validates a list of records, keeping their order.
pub fn decode_records(records: &[MinutiaRecord]) -> Result<Vec<fpb::Minutia>, TemplateError> {
    records.iter().map(MinutiaRecord::to_minutia).collect()
}

pub fn encode_records(minutiae: &[fpb::Minutia]) -> Vec<MinutiaRecord> {
    minutiae.iter().map(MinutiaRecord::from).collect()
}

/// Reads minutiae from CSV with a `X,Y,Direction,Type` header row.
pub fn read_csv<R: io::Read>(reader: R) -> Result<Vec<fpb::Minutia>, TemplateError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut minutiae = Vec::new();
    for result in rdr.deserialize::<MinutiaRecord>() {
        let record = result?;
        minutiae.push(record.to_minutia()?);
    }

    Ok(minutiae)
}

/// Writes minutiae as CSV, header row first, in the order given.
pub fn write_csv<W: io::Write>(writer: W, minutiae: &[fpb::Minutia]) -> Result<(), TemplateError> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for record in encode_records(minutiae) {
        wtr.serialize(record)?;
    }
    wtr.flush()?;

    Ok(())
}
