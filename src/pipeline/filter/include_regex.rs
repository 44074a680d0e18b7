use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::pipeline::filter::ObjectFilter;
use crate::types::ObjectRecord;

const FILTER_NAME: &str = "IncludeRegexFilter";

pub struct IncludeRegexFilter {
    include_regex: Regex,
}

impl IncludeRegexFilter {
    pub fn new(include_regex: Regex) -> Self {
        Self { include_regex }
    }
}

impl ObjectFilter for IncludeRegexFilter {
    fn is_candidate(&self, object: &ObjectRecord) -> bool {
        let key = object.key();
        let include_regex = self.include_regex.as_str();

        let match_result = match self.include_regex.is_match(key) {
            Ok(match_result) => match_result,
            Err(e) => {
                let error = e.to_string();
                warn!(
                    name = FILTER_NAME,
                    key = key,
                    include_regex = include_regex,
                    error = error,
                    "regex evaluation failed. object filtered."
                );
                return false;
            }
        };

        if !match_result {
            debug!(
                name = FILTER_NAME,
                key = key,
                include_regex = include_regex,
                "object filtered."
            );
        }

        match_result
    }
}
