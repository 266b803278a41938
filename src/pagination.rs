//! Cursor pagination over an ordered collection.

use crate::error::PaginationError;

/// One page of a collection.
#[derive(Debug, PartialEq, Eq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Cursor of the first item after this page, if any remain.
    pub next_start: Option<String>,
}

/// Parse a client-supplied limit.
///
/// A missing limit yields `default`; anything other than a positive integer
/// is rejected; values above `max` are clamped.
pub fn parse_limit(raw: Option<&str>, default: usize, max: usize) -> Result<usize, PaginationError> {
    let Some(raw) = raw else {
        return Ok(default.min(max));
    };
    match raw.trim().parse::<usize>() {
        Ok(limit) if limit > 0 => Ok(limit.min(max)),
        _ => Err(PaginationError::InvalidLimit {
            value: raw.to_string(),
        }),
    }
}

/// Take up to `limit` items starting at the item whose cursor is `start_with`.
///
/// `cursor` extracts the unique cursor value of an item. The resume cursor is
/// inclusive: it names the first item of the page, which is exactly the
/// `next_start` of the previous page.
pub fn paginate<'a, T, F>(
    collection: &'a [T],
    limit: usize,
    start_with: Option<&str>,
    cursor: F,
) -> Result<Page<'a, T>, PaginationError>
where
    F: Fn(&T) -> &str,
{
    if limit == 0 {
        return Err(PaginationError::InvalidLimit {
            value: limit.to_string(),
        });
    }

    let start = match start_with {
        Some(start_with) => collection
            .iter()
            .position(|item| cursor(item) == start_with)
            .ok_or_else(|| PaginationError::StartNotFound {
                start_with: start_with.to_string(),
            })?,
        None => 0,
    };

    let end = start.saturating_add(limit).min(collection.len());
    let next_start = collection.get(end).map(|item| cursor(item).to_string());

    Ok(Page {
        items: &collection[start..end],
        next_start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("0x{i}")).collect()
    }

    fn key(item: &String) -> &str {
        item
    }

    #[test]
    fn first_page() {
        let items = ids(5);
        let page = paginate(&items, 2, None, key).unwrap();
        assert_eq!(page.items, &items[0..2]);
        assert_eq!(page.next_start.as_deref(), Some("0x2"));
    }

    #[test]
    fn resume_is_inclusive() {
        let items = ids(5);
        let page = paginate(&items, 2, Some("0x2"), key).unwrap();
        assert_eq!(page.items, &items[2..4]);
        assert_eq!(page.next_start.as_deref(), Some("0x4"));
    }

    #[test]
    fn last_page_has_no_next() {
        let items = ids(5);
        let page = paginate(&items, 2, Some("0x4"), key).unwrap();
        assert_eq!(page.items, &items[4..5]);
        assert_eq!(page.next_start, None);

        let page = paginate(&items, 10, None, key).unwrap();
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.next_start, None);
    }

    #[test]
    fn exact_fit_has_no_next() {
        let items = ids(4);
        let page = paginate(&items, 4, None, key).unwrap();
        assert_eq!(page.items.len(), 4);
        assert_eq!(page.next_start, None);
    }

    #[test]
    fn unknown_start_is_not_found() {
        let items = ids(3);
        let err = paginate(&items, 1, Some("random-hotel-address"), key).unwrap_err();
        assert_eq!(
            err,
            PaginationError::StartNotFound {
                start_with: "random-hotel-address".into()
            }
        );
    }

    #[test]
    fn zero_limit_rejected() {
        let items = ids(3);
        assert!(matches!(
            paginate(&items, 0, None, key),
            Err(PaginationError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn successive_cursors_visit_everything_once() {
        for len in 0..8 {
            for limit in 1..=len.max(1) {
                let items = ids(len);
                let mut seen = Vec::new();
                let mut start: Option<String> = None;
                loop {
                    let page = paginate(&items, limit, start.as_deref(), key).unwrap();
                    seen.extend(page.items.iter().cloned());
                    match page.next_start {
                        Some(next) => start = Some(next),
                        None => break,
                    }
                }
                assert_eq!(seen, items, "len {len}, limit {limit}");
            }
        }
    }

    #[test]
    fn parse_limit_values() {
        assert_eq!(parse_limit(None, 30, 300), Ok(30));
        assert_eq!(parse_limit(Some("4"), 30, 300), Ok(4));
        assert_eq!(parse_limit(Some("1000"), 30, 300), Ok(300));
        assert!(matches!(
            parse_limit(Some("-500"), 30, 300),
            Err(PaginationError::InvalidLimit { value }) if value == "-500"
        ));
        assert!(parse_limit(Some("0"), 30, 300).is_err());
        assert!(parse_limit(Some("ten"), 30, 300).is_err());
        assert!(parse_limit(Some("1.5"), 30, 300).is_err());
    }
}
