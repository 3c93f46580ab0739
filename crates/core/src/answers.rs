//! Submitted answer payloads.
//!
//! Answers are free-form form fields posted by the rendered task template,
//! stored as a string-keyed string map.

use std::collections::HashMap;

/// Form fields injected by CSRF protection rather than by the task template.
pub const CSRF_FIELD_NAMES: &[&str] = &["csrfmiddlewaretoken", "csrf_token", "_csrf"];

/// Remove CSRF-token fields from a submitted answer map.
pub fn sanitize_answers(mut answers: HashMap<String, String>) -> HashMap<String, String> {
    answers.retain(|key, _| !CSRF_FIELD_NAMES.contains(&key.as_str()));
    answers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_csrf_fields_only() {
        let answers: HashMap<String, String> = [
            ("csrfmiddlewaretoken", "abc"),
            ("_csrf", "def"),
            ("label", "positive"),
            ("comment", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let clean = sanitize_answers(answers);
        assert_eq!(clean.len(), 2);
        assert_eq!(clean["label"], "positive");
        assert!(clean.contains_key("comment"));
    }
}
