//! Paged listing with partial-failure backfill.
//!
//! A page is assembled in rounds. Every round paginates the collection,
//! resolves its items concurrently and sorts the outcomes into items,
//! warnings and errors. While a round reports errors, fewer items than
//! requested were collected and the collection continues, another round
//! fetches the shortfall.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::entity::{resolve_entity, ItemError, RemoteEntity};
use crate::error::PaginationError;
use crate::pagination::paginate;
use crate::types::{FieldSet, Segment};
use crate::validator::ModelValidator;

/// Response body of a list request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListPage {
    pub items: Vec<Value>,
    /// Present only for segments that validate their items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<ItemError>>,
    pub errors: Vec<ItemError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// Where a list request was served from, used to build `next` links.
#[derive(Debug, Clone, Copy)]
pub struct ListLink<'a> {
    pub base_url: &'a str,
    pub path: &'a str,
}

impl ListLink<'_> {
    /// Link to the page starting at `cursor`.
    pub fn next(&self, limit: usize, fields: &FieldSet, cursor: &str) -> String {
        format!(
            "{}{}?limit={limit}&fields={}&startWith={cursor}",
            self.base_url,
            self.path,
            fields.query_value()
        )
    }
}

/// Outcome of resolving one entity.
#[derive(Debug)]
enum Outcome {
    Item(Value),
    Warning(ItemError),
    Error(ItemError),
}

async fn resolve_item<E: RemoteEntity>(
    segment: &Segment,
    entity: &E,
    fields: &FieldSet,
    validator: Option<&ModelValidator>,
) -> Outcome {
    let item = match resolve_entity(segment, entity, fields).await {
        Ok(item) => Value::Object(item),
        Err(err) => {
            warn!(address = entity.address(), error = %err, "cannot resolve {}", segment.noun);
            return Outcome::Error(ItemError::remote(segment, entity.address(), &err));
        }
    };

    let Some(validator) = validator else {
        return Outcome::Item(item);
    };
    match validator.validate(&item) {
        Ok(()) => Outcome::Item(item),
        Err(failure) if failure.soft => {
            warn!(address = entity.address(), error = %failure, "soft validation failure");
            Outcome::Warning(ItemError::validation(segment, &failure, item))
        }
        Err(failure) => {
            warn!(address = entity.address(), error = %failure, "validation failure");
            Outcome::Error(ItemError::validation(segment, &failure, item))
        }
    }
}

/// Assemble one page of `entities`.
///
/// `limit` counts successfully resolved items. The `next` link keeps
/// `limit` and points at the first entity not visited by any round.
///
/// # Errors
///
/// Returns a `PaginationError` if `limit` is zero or `start_with` names no
/// entity. Failures of single entities never abort the page.
pub async fn assemble<E: RemoteEntity>(
    segment: &Segment,
    entities: &[E],
    fields: &FieldSet,
    validator: Option<&ModelValidator>,
    limit: usize,
    start_with: Option<&str>,
    link: ListLink<'_>,
) -> Result<ListPage, PaginationError> {
    let mut page = ListPage {
        items: Vec::new(),
        warnings: validator.map(|_| Vec::new()),
        errors: Vec::new(),
        next: None,
    };

    let mut cursor = start_with.map(str::to_string);
    let mut wanted = limit;
    let mut round = 0usize;

    loop {
        round += 1;
        let current = paginate(entities, wanted, cursor.as_deref(), E::address)?;
        let outcomes = join_all(
            current
                .items
                .iter()
                .map(|entity| resolve_item(segment, entity, fields, validator)),
        )
        .await;

        let mut failed = 0usize;
        for outcome in outcomes {
            match outcome {
                Outcome::Item(item) => page.items.push(item),
                Outcome::Warning(warning) => {
                    if let Some(warnings) = page.warnings.as_mut() {
                        warnings.push(warning);
                    }
                }
                Outcome::Error(error) => {
                    failed += 1;
                    page.errors.push(error);
                }
            }
        }
        debug!(
            round,
            requested = wanted,
            resolved = current.items.len(),
            failed,
            collected = page.items.len(),
            "list round"
        );

        cursor = current.next_start;
        if failed == 0 || page.items.len() >= limit || cursor.is_none() {
            break;
        }
        wanted = limit - page.items.len();
    }

    page.next = cursor.map(|cursor| link.next(limit, fields, &cursor));
    Ok(page)
}
