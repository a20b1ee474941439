use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shelf_db::{DocumentId, ID_FIELD};

use super::error::LedgerError;

/// A title in the inventory together with its count of rentable copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Store-assigned identity
    #[serde(alias = "_id")]
    pub id: DocumentId,
    /// Title of the book, unique per inventory entry
    pub title: String,
    /// Author of the book
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Copies currently on the shelf
    #[serde(default)]
    pub available_count: u32,
}

/// Request model for adding copies of a book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    /// Copies to add; an absent count adds nothing to an existing title
    /// and creates a new title with a single copy.
    #[serde(default)]
    pub available_count: Option<u32>,
}

/// Stored form of a new [`Book`]; the store adds the identity.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BookRecord<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<&'a str>,
    pub available_count: u32,
}

/// One outstanding loan of one copy of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    #[serde(alias = "_id")]
    pub id: DocumentId,
    /// String form of the rented book's identity
    #[serde(rename = "bookID")]
    pub book_id: String,
}

/// Stored form of a new [`Rental`].
#[derive(Debug, Serialize)]
pub(crate) struct RentalRecord {
    #[serde(rename = "bookID")]
    pub book_id: String,
}

/// Response for a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
}

impl Default for DeleteConfirmation {
    fn default() -> Self {
        Self {
            message: "Book deleted successfully".to_string(),
        }
    }
}

/// Merge patch for a [`Book`]: only the keys present are overwritten.
///
/// Known fields are type-checked so the patched document still reads back as a
/// `Book`; other keys are stored untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BookPatch(Map<String, Value>);

impl BookPatch {
    pub fn into_fields(self) -> Map<String, Value> {
        self.0
    }
}

impl TryFrom<Map<String, Value>> for BookPatch {
    type Error = LedgerError;

    fn try_from(fields: Map<String, Value>) -> Result<Self, Self::Error> {
        for (key, value) in &fields {
            let valid = match key.as_str() {
                "id" | ID_FIELD => {
                    return Err(LedgerError::InvalidBody(format!(
                        "field '{key}' cannot be patched"
                    )))
                }
                "title" => value.is_string(),
                "author" => value.is_string() || value.is_null(),
                "availableCount" => value
                    .as_u64()
                    .is_some_and(|count| u32::try_from(count).is_ok()),
                _ => true,
            };
            if !valid {
                return Err(LedgerError::InvalidBody(format!(
                    "field '{key}' has an invalid value: {value}"
                )));
            }
        }
        Ok(Self(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn book_reads_store_identity_and_writes_api_identity() {
        let id = DocumentId::generate();
        let stored = json!({"_id": id.to_string(), "title": "Dune", "availableCount": 2});

        let book: Book = serde_json::from_value(stored).unwrap();
        assert_eq!(book.id, id);
        assert_eq!(book.author, None);

        let rendered = serde_json::to_value(&book).unwrap();
        assert_eq!(
            rendered,
            json!({"id": id.to_string(), "title": "Dune", "availableCount": 2})
        );
    }

    #[test]
    fn new_book_defaults_optional_fields() {
        let input: NewBook = serde_json::from_value(json!({"title": "Dune"})).unwrap();
        assert_eq!(input.author, None);
        assert_eq!(input.available_count, None);
    }

    #[test]
    fn new_book_rejects_negative_counts() {
        let result = serde_json::from_value::<NewBook>(json!({"title": "Dune", "availableCount": -1}));
        assert!(result.is_err());
    }

    #[test]
    fn rental_uses_book_id_key() {
        let id = DocumentId::generate();
        let rental: Rental =
            serde_json::from_value(json!({"_id": id.to_string(), "bookID": "abc"})).unwrap();
        assert_eq!(rental.book_id, "abc");
        let wire = serde_json::to_value(&rental).unwrap();
        assert_eq!(wire["bookID"], "abc");
        assert_eq!(wire["id"], id.to_string());
        assert!(wire.get("_id").is_none());
    }

    #[test]
    fn patch_accepts_known_and_extra_fields() {
        let patch = BookPatch::try_from(fields(json!({
            "title": "Dune Messiah",
            "author": null,
            "availableCount": 4,
            "edition": "2nd"
        })))
        .unwrap();
        assert_eq!(patch.into_fields().len(), 4);
    }

    #[test]
    fn patch_rejects_identity_and_bad_counts() {
        for body in [
            json!({"_id": "x"}),
            json!({"id": "x"}),
            json!({"availableCount": -1}),
            json!({"availableCount": 1.5}),
            json!({"title": 7}),
        ] {
            let result = BookPatch::try_from(fields(body.clone()));
            assert!(
                matches!(result, Err(LedgerError::InvalidBody(_))),
                "accepted {body}"
            );
        }
    }
}
