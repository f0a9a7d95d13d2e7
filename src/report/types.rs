/// The composed digest, ready to print or send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Rendered PR blocks per bucket, in the order they will appear.
#[derive(Debug, Clone, Default)]
pub struct DigestSections {
    pub opened: Vec<String>,
    pub closed: Vec<String>,
    pub draft: Vec<String>,
}

/// Inputs to the composer that do not come from GitHub.
#[derive(Debug, Clone)]
pub struct ComposeOptions<'a> {
    pub window_days: u32,
    pub separator: &'a str,
    pub signature: &'a str,
}
