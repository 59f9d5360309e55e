use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

pub fn dictionary_url(base: &str, word: &str) -> String {
    format!("{}{}", base, encode_component(word))
}

pub fn search_url(base: &str, query: &str) -> String {
    let terms = query
        .split_whitespace()
        .map(encode_component)
        .collect::<Vec<_>>()
        .join("+");
    format!("{base}{terms}+definition")
}

pub fn entry_request_url(endpoint: &str, query: &str, key: &str) -> String {
    format!(
        "{}{}?key={}",
        endpoint,
        encode_component(query),
        encode_component(key)
    )
}

pub fn first_word(text: &str) -> Option<&str> {
    text.split_whitespace().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_DICTIONARY_BASE_URL, DEFAULT_ENTRY_ENDPOINT, DEFAULT_SEARCH_BASE_URL};

    #[test]
    fn search_joins_terms_with_plus() {
        assert_eq!(
            search_url(DEFAULT_SEARCH_BASE_URL, " look  up "),
            "https://www.google.com/search?q=look+up+definition"
        );
    }

    #[test]
    fn dictionary_url_encodes_word() {
        assert_eq!(
            dictionary_url(DEFAULT_DICTIONARY_BASE_URL, "cats"),
            "http://learnersdictionary.com/definition/cats"
        );
        assert_eq!(
            dictionary_url(DEFAULT_DICTIONARY_BASE_URL, "don't"),
            "http://learnersdictionary.com/definition/don%27t"
        );
    }

    #[test]
    fn entry_request_carries_key() {
        assert_eq!(
            entry_request_url(DEFAULT_ENTRY_ENDPOINT, "look up", "abc"),
            "https://www.dictionaryapi.com/api/v1/references/learners/xml/look%20up?key=abc"
        );
    }

    #[test]
    fn first_word_skips_leading_space() {
        assert_eq!(first_word("  sense of humor"), Some("sense"));
        assert_eq!(first_word("   "), None);
    }
}
