use serde::{Deserialize, Serialize};

/// One input record: its identifier and the exact line text it came from.
///
/// The line is kept verbatim (already stripped of surrounding whitespace),
/// never re-serialized, so output preserves the original key order and
/// formatting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier in its string-coerced form.
    pub uid: String,
    /// Raw record text.
    pub line: String,
}

impl Record {
    pub fn new(uid: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            line: line.into(),
        }
    }
}
