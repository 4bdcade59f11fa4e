//! Query-string construction for the search and filter endpoints.
//!
//! Both builders are pure: the same input always yields the same string.
//! Search text is percent-encoded component-style (spaces become `%20`);
//! filters are serialized as `application/x-www-form-urlencoded` pairs
//! (spaces become `+`), emitting only the criteria that are set.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::types::FilterCriteria;

/// Characters left untouched by a URI-component encoder.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// `name=<encoded>` for the search endpoint.
pub fn search_query(name: &str) -> String {
    format!("name={}", encode_component(name))
}

/// Form-encoded filter criteria. An empty filter yields an empty string.
pub fn filter_query(criteria: &FilterCriteria) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in criteria.pairs() {
        serializer.append_pair(key, &value);
    }
    serializer.finish()
}
