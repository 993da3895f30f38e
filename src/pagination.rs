//! Relay-style cursor pagination.
//!
//! Cursors are opaque, base64-encoded offsets (`cursor:{offset}`). A
//! connection's edges and `total` are always computed against the full
//! `[0, total)` range of the underlying query or sequence, following the
//! same two-step shape as `graphql-relay`'s array-connection helper: first
//! resolve a `(offset, limit)` window from the pagination arguments and
//! `total`, then realize only that window (a `LIMIT/OFFSET` query for a
//! lazy source, a plain slice for a materialized one).

use async_graphql::{InputObject, SimpleObject};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

use crate::error::CoreError;

#[derive(SimpleObject, Debug, Clone, Default)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Edge<T> {
    pub node: T,
    pub cursor: String,
}

/// A paginated result slice, carrying back `total` alongside the page the
/// caller asked for (§4.6: "the connection value carries back `total`, the
/// original iterable, and its length").
#[derive(Debug, Clone)]
pub struct Connection<T> {
    pub edges: Vec<Edge<T>>,
    pub page_info: PageInfo,
    pub total: i64,
}

impl<T> Connection<T> {
    pub fn empty() -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total: 0,
        }
    }

    /// Build a connection from an already-fetched slice of `total` items
    /// starting at `offset`.
    pub fn from_slice(items: Vec<T>, offset: i64, total: i64) -> Self {
        let has_previous_page = offset > 0;
        let has_next_page = offset + items.len() as i64 < total;
        let edges: Vec<Edge<T>> = items
            .into_iter()
            .enumerate()
            .map(|(i, node)| Edge {
                cursor: encode_cursor(offset + i as i64),
                node,
            })
            .collect();
        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };
        Self {
            edges,
            page_info,
            total,
        }
    }
}

pub fn encode_cursor(offset: i64) -> String {
    BASE64.encode(format!("cursor:{offset}"))
}

pub fn decode_cursor(cursor: &str) -> Result<i64, CoreError> {
    let decoded = BASE64
        .decode(cursor)
        .map_err(|_| CoreError::malformed("invalid cursor format"))?;
    let s = String::from_utf8(decoded).map_err(|_| CoreError::malformed("invalid cursor encoding"))?;
    let offset = s
        .strip_prefix("cursor:")
        .ok_or_else(|| CoreError::malformed("invalid cursor prefix"))?;
    offset
        .parse()
        .map_err(|_| CoreError::malformed("invalid cursor value"))
}

/// Standard relay pagination arguments, shared by every connection field.
#[derive(InputObject, Debug, Clone, Default)]
#[graphql(name = "PaginationArgs")]
pub struct RawPaginationArgs {
    pub first: Option<i32>,
    pub after: Option<String>,
    pub last: Option<i32>,
    pub before: Option<String>,
}

/// A resolved `[offset, offset+limit)` window against `[0, total)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub offset: i64,
    pub limit: i64,
}

/// Resolve pagination arguments into a concrete window, mirroring
/// `graphql-relay`'s `connectionFromArraySlice` bounds computation.
pub fn resolve_window(
    total: i64,
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
) -> Result<Window, CoreError> {
    let after_offset = match after {
        Some(c) => decode_cursor(&c)? + 1,
        None => 0,
    };
    let before_offset = match before {
        Some(c) => decode_cursor(&c)?,
        None => total,
    };

    let mut start = after_offset.max(0);
    let mut end = before_offset.min(total);

    if let Some(first) = first {
        end = end.min(start + first as i64);
    }
    if let Some(last) = last {
        start = start.max(end - last as i64);
    }
    if start > end {
        start = end;
    }

    Ok(Window {
        offset: start,
        limit: end - start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_roundtrip() {
        for offset in [0, 1, 100, 999999] {
            let cursor = encode_cursor(offset);
            assert_eq!(decode_cursor(&cursor).unwrap(), offset);
        }
    }

    #[test]
    fn test_window_default_is_full_range() {
        let w = resolve_window(10, None, None, None, None).unwrap();
        assert_eq!(w, Window { offset: 0, limit: 10 });
    }

    #[test]
    fn test_window_first_after() {
        let after = encode_cursor(2);
        let w = resolve_window(10, Some(3), Some(after), None, None).unwrap();
        assert_eq!(w, Window { offset: 3, limit: 3 });
    }

    #[test]
    fn test_window_last_before() {
        let before = encode_cursor(8);
        let w = resolve_window(10, None, None, Some(2), Some(before)).unwrap();
        assert_eq!(w, Window { offset: 6, limit: 2 });
    }

    #[test]
    fn test_relay_slice_invariant() {
        // property (§8.7): for any list and any (first, after), edges equal
        // the slice and total equals the full length regardless of slice.
        let items: Vec<i32> = (0..37).collect();
        let total = items.len() as i64;
        for first in [1, 5, 25, 100] {
            for after in [None, Some(encode_cursor(10))] {
                let w = resolve_window(total, Some(first), after.clone(), None, None).unwrap();
                let slice: Vec<i32> = items[w.offset as usize..(w.offset + w.limit) as usize].to_vec();
                let conn = Connection::from_slice(slice.clone(), w.offset, total);
                assert_eq!(conn.total, total);
                assert_eq!(conn.edges.len(), slice.len());
                for (edge, expected) in conn.edges.iter().zip(slice.iter()) {
                    assert_eq!(edge.node, *expected);
                }
            }
        }
    }
}
