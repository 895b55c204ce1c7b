/// Label shown on the download affordance of a finished conversation.
pub const DOWNLOAD_LABEL: &str = "Download Resume";

/// The affordance rendered once the endpoint reports completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionLink {
    /// Where the link points.  Only URLs accepted by
    /// [`is_safe_url`](crate::markup::is_safe_url) are ever put here.
    pub url: String,

    /// Visible label.
    pub label: String,
}

impl CompletionLink {
    /// A download link with the default label.
    pub fn download(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: DOWNLOAD_LABEL.to_string(),
        }
    }
}
