use std::collections::HashSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{self, Stream, TryStreamExt};
use tracing::trace;

use crate::pipeline::filter::{
    BoxedObjectFilter, ExtensionFilter, MtimeAfterFilter, ObjectFilterChain,
};
use crate::storage::Storage;
use crate::types::{Cursor, ObjectPage, ObjectRecord};

/// Paginated view of the source storage.
///
/// The cursor always follows the raw listing position. Filtering happens after
/// the cursor has been advanced, so objects that do not pass the filters never
/// move the listing backwards or make it skip.
pub struct ObjectCatalog {
    source: Storage,
    page_size: i32,
    cursor: Cursor,
    exhausted: bool,
}

impl ObjectCatalog {
    pub fn new(source: Storage, page_size: i32) -> Self {
        Self {
            source,
            page_size,
            cursor: None,
            exhausted: false,
        }
    }

    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub async fn list_page(&self, cursor: Cursor) -> Result<ObjectPage> {
        self.source.list_objects_page(cursor, self.page_size).await
    }

    /// Lists the page after the current cursor and advances the cursor to the
    /// last raw key of that page. Returns `None` once the listing is exhausted.
    ///
    /// A page may be empty while the listing is not exhausted, e.g. when it
    /// held only the prefix directory marker.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ObjectRecord>>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self.list_page(self.cursor.clone()).await?;
        if page.is_exhausted() {
            trace!(cursor = self.cursor.as_deref(), "listing exhausted.");
            self.exhausted = true;
            return Ok(None);
        }

        self.cursor = page.next_marker;
        trace!(
            cursor = self.cursor.as_deref(),
            objects = page.objects.len(),
            "page listed."
        );

        Ok(Some(page.objects))
    }

    /// Lazy single-pass sequence of objects modified at or after `since` whose
    /// key ends with `extension`.
    pub fn candidates(
        self,
        since: DateTime<Utc>,
        extension: &str,
    ) -> impl Stream<Item = Result<ObjectRecord>> + Send {
        let filters: Vec<BoxedObjectFilter> = vec![
            Box::new(MtimeAfterFilter::new(since, HashSet::new())),
            Box::new(ExtensionFilter::new(extension)),
        ];

        self.filtered(ObjectFilterChain::new(filters))
    }

    pub fn filtered(
        self,
        filters: ObjectFilterChain,
    ) -> impl Stream<Item = Result<ObjectRecord>> + Send {
        stream::try_unfold((self, filters), |(mut catalog, filters)| async move {
            let Some(objects) = catalog.next_page().await? else {
                return Ok::<_, anyhow::Error>(None);
            };

            let (candidates, _) = filters.partition(objects);
            Ok(Some((candidates, (catalog, filters))))
        })
        .map_ok(|candidates| {
            stream::iter(candidates.into_iter().map(Ok::<_, anyhow::Error>))
        })
        .try_flatten()
    }
}
