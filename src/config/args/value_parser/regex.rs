use fancy_regex::Regex;

const INVALID_REGEX: &str = "invalid regular expression.";

pub fn parse_regex(regex: &str) -> Result<Regex, String> {
    Regex::new(regex).map_err(|_| INVALID_REGEX.to_string())
}
