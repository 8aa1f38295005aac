use crate::error::ServiceError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::ser::Serializer;
use serde::Serialize;

/// Keyset position in the shared `(created_at DESC, id DESC)` ordering.
/// The wire form is base64("micros:id") so clients carry one opaque token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub created_at: i64,
    pub id: String,
}

impl Cursor {
    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.created_at, self.id))
    }

    pub fn decode(token: &str) -> Result<Self, ServiceError> {
        let malformed = || ServiceError::Validation("malformed cursor".into());
        let raw = URL_SAFE_NO_PAD.decode(token).map_err(|_| malformed())?;
        let raw = String::from_utf8(raw).map_err(|_| malformed())?;
        let (micros, id) = raw.split_once(':').ok_or_else(malformed)?;
        let created_at = micros.parse::<i64>().map_err(|_| malformed())?;
        if id.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            created_at,
            id: id.to_string(),
        })
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

/// One page of a keyset walk. `next_cursor` is absent on the final page.
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Folds a `limit + 1` overfetch into a page. The extra row, when
    /// present, seeds `next_cursor` and is served again as the first item
    /// of the following page: queries treat the cursor row as the
    /// inclusive start of the next window, so a walk yields every row
    /// exactly once.
    pub fn from_overfetch<F>(mut rows: Vec<T>, limit: usize, key: F) -> Self
    where
        F: Fn(&T) -> Cursor,
    {
        let next_cursor = if rows.len() > limit {
            rows.pop().as_ref().map(key)
        } else {
            None
        };
        Self {
            items: rows,
            next_cursor,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cursor_of(row: &(i64, &str)) -> Cursor {
        Cursor {
            created_at: row.0,
            id: row.1.to_string(),
        }
    }

    #[test]
    fn cursor_round_trips_through_token() {
        let cursor = Cursor {
            created_at: 1_700_000_000_123_456,
            id: "5f2b1c88-9d5f-4a63-8b1e-0ac1f0a3d9f2".into(),
        };
        let token = cursor.encode();
        assert_eq!(Cursor::decode(&token).unwrap(), cursor);
    }

    #[test]
    fn cursor_rejects_malformed_tokens() {
        assert!(Cursor::decode("!!! not base64 !!!").is_err());
        let no_separator = URL_SAFE_NO_PAD.encode("1700000000");
        assert!(Cursor::decode(&no_separator).is_err());
        let bad_micros = URL_SAFE_NO_PAD.encode("abc:some-id");
        assert!(Cursor::decode(&bad_micros).is_err());
        let empty_id = URL_SAFE_NO_PAD.encode("1700000000:");
        assert!(Cursor::decode(&empty_id).is_err());
    }

    #[test]
    fn overfetch_pops_the_extra_row_into_the_cursor() {
        let rows = vec![(500, "e"), (400, "d"), (300, "c")];
        let page = Page::from_overfetch(rows, 2, cursor_of);
        assert_eq!(page.items, vec![(500, "e"), (400, "d")]);
        let cursor = page.next_cursor.expect("cursor");
        assert_eq!(cursor.created_at, 300);
        assert_eq!(cursor.id, "c");
    }

    #[test]
    fn overfetch_within_limit_ends_the_walk() {
        let rows = vec![(500, "e"), (400, "d")];
        let page = Page::from_overfetch(rows, 2, cursor_of);
        assert_eq!(page.items.len(), 2);
        assert!(page.next_cursor.is_none());
    }
}
