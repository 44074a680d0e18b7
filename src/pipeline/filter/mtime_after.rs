use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::pipeline::filter::ObjectFilter;
use crate::types::ObjectRecord;

const FILTER_NAME: &str = "MtimeAfterFilter";

/// Passes objects modified at or after `since`, and objects that failed in the
/// previous completed run.
pub struct MtimeAfterFilter {
    since: DateTime<Utc>,
    retry_keys: HashSet<String>,
}

impl MtimeAfterFilter {
    pub fn new(since: DateTime<Utc>, retry_keys: HashSet<String>) -> Self {
        Self { since, retry_keys }
    }
}

impl ObjectFilter for MtimeAfterFilter {
    fn is_candidate(&self, object: &ObjectRecord) -> bool {
        if self.since <= *object.last_modified() {
            return true;
        }

        let key = object.key();
        if self.retry_keys.contains(key) {
            debug!(
                name = FILTER_NAME,
                key = key,
                "object failed in the last run. retrying."
            );
            return true;
        }

        let last_modified = object.last_modified().to_rfc3339();
        let config_time = self.since.to_rfc3339();

        debug!(
            name = FILTER_NAME,
            key = key,
            last_modified = last_modified,
            config_time = config_time,
            "object filtered."
        );

        false
    }
}
