use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::types::{Progress, UserData};

/// The reply to one chat turn.
///
/// Every field is optional.  A missing field means the feature is not present
/// on this turn; it is never an error.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChatResponse {
    /// Bot text, in Markdown.
    #[serde(default)]
    pub response: Option<String>,

    /// Quick-reply labels for the next turn.
    #[serde(default, deserialize_with = "lenient_options")]
    pub options: Vec<String>,

    /// Fragment to merge into the cached user data.
    #[serde(default)]
    pub user_data: Option<UserData>,

    /// Overall completion percentage.
    #[serde(default, deserialize_with = "lenient_progress")]
    pub progress: Option<f64>,

    /// Set when the conversation has finished.
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,

    /// Download location of the finished artifact; only meaningful when
    /// `completed` is set.
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl ChatResponse {
    /// Create a response carrying only bot text.
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..Self::default()
        }
    }

    /// Set the quick-reply options.
    pub fn with_options<S: Into<String>>(mut self, options: impl IntoIterator<Item = S>) -> Self {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Set the user-data fragment.
    pub fn with_user_data(mut self, user_data: UserData) -> Self {
        self.user_data = Some(user_data);
        self
    }

    /// Set the progress value.
    pub fn with_progress(mut self, progress: f64) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Mark the conversation complete, optionally with a download location.
    pub fn completed(mut self, resume_url: Option<String>) -> Self {
        self.completed = true;
        self.resume_url = resume_url;
        self
    }

    /// The progress value, clamped.
    pub fn progress(&self) -> Option<Progress> {
        self.progress.map(Progress::new)
    }

    /// The bot text, or the empty string when the endpoint sent none.
    pub fn response_text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Labels are text; numbers and booleans are shown as written, anything else
/// is dropped.
fn lenient_options<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            tracing::warn!(options = %other, "ignoring options that are not a list");
            return Ok(Vec::new());
        }
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(label) => Some(label),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            other => {
                tracing::warn!(option = %other, "dropping option that is not text");
                None
            }
        })
        .collect())
}

/// A number, or a string holding one.  Anything else is dropped.
fn lenient_progress<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => return Ok(None),
        Some(value) => value,
    };
    let progress = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    if progress.is_none() {
        tracing::warn!(progress = %value, "ignoring progress that is not a number");
    }
    Ok(progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn full_response() {
        let response: ChatResponse = serde_json::from_value(json!({
            "response": "Hello!",
            "options": ["A", "B"],
            "user_data": {"name": "Ann"},
            "progress": 40,
            "completed": true,
            "resume_url": "/files/x.pdf"
        }))
        .unwrap();
        assert_eq!(response.response_text(), "Hello!");
        assert_eq!(response.options, vec!["A", "B"]);
        assert_eq!(
            response.user_data.as_ref().and_then(|data| data.get("name")),
            Some(&json!("Ann"))
        );
        assert_eq!(response.progress(), Some(Progress::new(40.0)));
        assert!(response.completed);
        assert_eq!(response.resume_url.as_deref(), Some("/files/x.pdf"));
    }

    #[test]
    fn empty_object_is_valid() {
        let response: ChatResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response, ChatResponse::default());
        assert_eq!(response.response_text(), "");
        assert!(response.options.is_empty());
    }

    #[test]
    fn nulls_and_unknown_fields_are_tolerated() {
        let response: ChatResponse = serde_json::from_value(json!({
            "response": "ok",
            "options": null,
            "completed": null,
            "session_id": "abc",
            "current_state": "domain_selected"
        }))
        .unwrap();
        assert!(response.options.is_empty());
        assert!(!response.completed);
    }

    #[test]
    fn odd_options_and_progress_do_not_fail_the_turn() {
        let response: ChatResponse = serde_json::from_value(json!({
            "response": "ok",
            "options": [1, "Two", true, {"x": 1}, null],
            "progress": "40"
        }))
        .unwrap();
        assert_eq!(response.options, vec!["1", "Two", "true"]);
        assert_eq!(response.progress(), Some(Progress::new(40.0)));

        let response: ChatResponse = serde_json::from_value(json!({
            "options": "A",
            "progress": {"value": 40}
        }))
        .unwrap();
        assert!(response.options.is_empty());
        assert_eq!(response.progress, None);

        let response: ChatResponse =
            serde_json::from_value(json!({"progress": "not a number"})).unwrap();
        assert_eq!(response.progress, None);
    }

    #[test]
    fn non_object_user_data_is_rejected() {
        let result = serde_json::from_value::<ChatResponse>(json!({"user_data": [1, 2]}));
        assert!(result.is_err());
    }
}
