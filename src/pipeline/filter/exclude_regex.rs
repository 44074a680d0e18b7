use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::pipeline::filter::ObjectFilter;
use crate::types::ObjectRecord;

const FILTER_NAME: &str = "ExcludeRegexFilter";

pub struct ExcludeRegexFilter {
    exclude_regex: Regex,
}

impl ExcludeRegexFilter {
    pub fn new(exclude_regex: Regex) -> Self {
        Self { exclude_regex }
    }
}

impl ObjectFilter for ExcludeRegexFilter {
    fn is_candidate(&self, object: &ObjectRecord) -> bool {
        let key = object.key();
        let exclude_regex = self.exclude_regex.as_str();

        // a key that cannot be evaluated is treated as excluded.
        let excluded = match self.exclude_regex.is_match(key) {
            Ok(excluded) => excluded,
            Err(e) => {
                let error = e.to_string();
                warn!(
                    name = FILTER_NAME,
                    key = key,
                    exclude_regex = exclude_regex,
                    error = error,
                    "regex evaluation failed."
                );
                true
            }
        };

        if excluded {
            debug!(
                name = FILTER_NAME,
                key = key,
                exclude_regex = exclude_regex,
                "object filtered."
            );
        }

        !excluded
    }
}
