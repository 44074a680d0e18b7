use tracing::debug;

use crate::pipeline::filter::ObjectFilter;
use crate::types::ObjectRecord;

const FILTER_NAME: &str = "ExtensionFilter";

/// Case-sensitive suffix match on the key. An empty extension passes every key.
pub struct ExtensionFilter {
    extension: String,
}

impl ExtensionFilter {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.to_string(),
        }
    }
}

impl ObjectFilter for ExtensionFilter {
    fn is_candidate(&self, object: &ObjectRecord) -> bool {
        let key = object.key();
        if key.ends_with(&self.extension) {
            return true;
        }

        debug!(
            name = FILTER_NAME,
            key = key,
            extension = self.extension,
            "object filtered."
        );

        false
    }
}
