use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::FilterConfig;
pub use crate::pipeline::filter::exclude_regex::ExcludeRegexFilter;
pub use crate::pipeline::filter::extension::ExtensionFilter;
pub use crate::pipeline::filter::include_regex::IncludeRegexFilter;
pub use crate::pipeline::filter::mtime_after::MtimeAfterFilter;
use crate::types::ObjectRecord;

mod exclude_regex;
mod extension;
mod include_regex;
mod mtime_after;

pub trait ObjectFilter {
    fn is_candidate(&self, object: &ObjectRecord) -> bool;
}

pub type BoxedObjectFilter = Box<dyn ObjectFilter + Send + Sync>;

/// Filters applied in order to every listed object. An object is a candidate
/// only if every filter accepts it.
pub struct ObjectFilterChain {
    filters: Vec<BoxedObjectFilter>,
}

impl ObjectFilterChain {
    pub fn new(filters: Vec<BoxedObjectFilter>) -> Self {
        Self { filters }
    }

    /// `retry_keys` are candidates regardless of their modification time.
    pub fn from_config(
        config: &FilterConfig,
        since: DateTime<Utc>,
        retry_keys: HashSet<String>,
    ) -> Self {
        let mut filters: Vec<BoxedObjectFilter> = vec![
            Box::new(MtimeAfterFilter::new(since, retry_keys)),
            Box::new(ExtensionFilter::new(&config.extension)),
        ];

        if let Some(include_regex) = &config.include_regex {
            filters.push(Box::new(IncludeRegexFilter::new(include_regex.clone())));
        }
        if let Some(exclude_regex) = &config.exclude_regex {
            filters.push(Box::new(ExcludeRegexFilter::new(exclude_regex.clone())));
        }

        Self::new(filters)
    }

    pub fn is_candidate(&self, object: &ObjectRecord) -> bool {
        self.filters.iter().all(|filter| filter.is_candidate(object))
    }

    /// Splits a page into candidates and filtered objects, both in listing order.
    pub fn partition(
        &self,
        objects: Vec<ObjectRecord>,
    ) -> (Vec<ObjectRecord>, Vec<ObjectRecord>) {
        objects
            .into_iter()
            .partition(|object| self.is_candidate(object))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use fancy_regex::Regex;

    use super::*;

    fn object(key: &str, hour: u32) -> ObjectRecord {
        ObjectRecord::new(
            key,
            Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap(),
            10,
        )
    }

    #[test]
    fn only_recent_jpg_is_candidate() {
        init_dummy_tracing_subscriber();

        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let chain = ObjectFilterChain::from_config(&FilterConfig::default(), since, HashSet::new());

        let (candidates, filtered) =
            chain.partition(vec![object("a.jpg", 0), object("b.jpg", 13), object("c.png", 13)]);

        let candidate_keys: Vec<&str> = candidates.iter().map(|o| o.key()).collect();
        let filtered_keys: Vec<&str> = filtered.iter().map(|o| o.key()).collect();
        assert_eq!(candidate_keys, vec!["b.jpg"]);
        assert_eq!(filtered_keys, vec!["a.jpg", "c.png"]);
    }

    #[test]
    fn retry_keys_bypass_mtime_but_not_extension() {
        init_dummy_tracing_subscriber();

        let since = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let retry_keys = HashSet::from(["a.jpg".to_string(), "c.png".to_string()]);
        let chain = ObjectFilterChain::from_config(&FilterConfig::default(), since, retry_keys);

        assert!(chain.is_candidate(&object("a.jpg", 0)));
        assert!(!chain.is_candidate(&object("c.png", 0)));
    }

    #[test]
    fn regex_filters_are_applied() {
        init_dummy_tracing_subscriber();

        let config = FilterConfig {
            extension: ".jpg".to_string(),
            include_regex: Some(Regex::new(r"^photos/").unwrap()),
            exclude_regex: Some(Regex::new(r"_thumb\.jpg$").unwrap()),
        };
        let chain =
            ObjectFilterChain::from_config(&config, DateTime::<Utc>::UNIX_EPOCH, HashSet::new());

        assert!(chain.is_candidate(&object("photos/a.jpg", 0)));
        assert!(!chain.is_candidate(&object("videos/a.jpg", 0)));
        assert!(!chain.is_candidate(&object("photos/a_thumb.jpg", 0)));
    }

    #[test]
    fn empty_chain_accepts_everything() {
        init_dummy_tracing_subscriber();

        let chain = ObjectFilterChain::new(vec![]);
        assert!(chain.is_candidate(&object("anything", 0)));
    }

    fn init_dummy_tracing_subscriber() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("dummy=trace")
            .try_init();
    }
}
