//! The delivery request value.

/// A "send this URL to this Kindle" request. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeliveryRequest {
    url: String,
    recipient_email: String,
    sender_email: String,
    title: String,
}

impl DeliveryRequest {
    /// `sender_email` and `title` may be empty.
    pub fn new(
        url: impl Into<String>,
        recipient_email: impl Into<String>,
        sender_email: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            recipient_email: recipient_email.into(),
            sender_email: sender_email.into(),
            title: title.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn recipient_email(&self) -> &str {
        &self.recipient_email
    }

    pub fn sender_email(&self) -> &str {
        &self.sender_email
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}
