use crate::SourceError;
use uuid::Uuid;

/// Number of positional fields in every input and output row.
pub const FIELD_COUNT: usize = 7;

/// The unit of work flowing through the pipeline.
///
/// All fields are opaque text. Only [`Record::id`] is ever rewritten; the other
/// six are carried through untouched.
///
/// Positional order on the wire is `id, firstName, lastName, email, address,
/// city, country`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Record {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub country: String,
}

impl Record {
    /// Overwrites the identifier in place with the hyphenated, lowercase form
    /// of `id` (36 characters).
    ///
    /// The existing `String` allocation is reused.
    pub fn assign_id(&mut self, id: &Uuid) {
        let mut buf = Uuid::encode_buffer();
        self.id.clear();
        self.id.push_str(id.hyphenated().encode_lower(&mut buf));
    }

    /// Borrows the record as an output row in wire order.
    pub fn as_row(&self) -> [&str; FIELD_COUNT] {
        [
            &self.id,
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.address,
            &self.city,
            &self.country,
        ]
    }

    /// The six fields that pass through the pipeline unchanged.
    pub fn passthrough(&self) -> [&str; FIELD_COUNT - 1] {
        [
            &self.first_name,
            &self.last_name,
            &self.email,
            &self.address,
            &self.city,
            &self.country,
        ]
    }
}

impl TryFrom<&csv::StringRecord> for Record {
    type Error = SourceError;

    fn try_from(row: &csv::StringRecord) -> Result<Self, Self::Error> {
        if row.len() != FIELD_COUNT {
            return Err(SourceError::FieldCount {
                line: row.position().map_or(0, csv::Position::line),
                expected: FIELD_COUNT,
                found: row.len(),
            });
        }

        let field = |i: usize| row.get(i).unwrap_or_default().to_owned();
        Ok(Self {
            id: field(0),
            first_name: field(1),
            last_name: field(2),
            email: field(3),
            address: field(4),
            city: field(5),
            country: field(6),
        })
    }
}
