//! Classification of a delivery attempt.

use std::fmt;

/// Why the service refused a request outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Failure code `1`: the Kindle address was refused.
    InvalidRecipient,
    /// Failure code `2`: the service could not fetch the target URL.
    TargetNotFound,
    /// The service answered with its literal "Invalid URL supplied" body.
    InvalidUrl,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::InvalidRecipient => "Invalid email address",
            Self::TargetNotFound => "404 - URL not found!",
            Self::InvalidUrl => "Invalid URL supplied",
        };
        f.write_str(text)
    }
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No failure signal in the response.
    Delivered,
    /// The request itself is unprocessable. Never worth retrying unchanged.
    RequestRejected(RejectReason),
    /// The service signalled a failure code outside the known set.
    ServiceReportedUnknown { code: String, body: String },
    /// The call could not be completed; retry later.
    TransientFailure(String),
}

impl Outcome {
    /// Whether a later retry of the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientFailure(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered => f.write_str("delivered"),
            Self::RequestRejected(reason) => write!(f, "rejected: {reason}"),
            Self::ServiceReportedUnknown { code, body } if body.is_empty() => {
                write!(f, "X-PushToKindle-Failed: {code}")
            }
            Self::ServiceReportedUnknown { code, body } => {
                write!(f, "X-PushToKindle-Failed: {code}\n{body}")
            }
            Self::TransientFailure(reason) => write!(f, "network error: {reason}"),
        }
    }
}

/// Classify a response that was fully received.
///
/// `failure_code` is the trimmed value of the failure header, if present.
/// The header takes precedence over the body; a blank header value carries
/// no signal. A 5xx status without either signal means the service itself
/// was unavailable.
pub fn classify_response(status: u16, failure_code: Option<&str>, body: &[u8]) -> Outcome {
    match failure_code.filter(|code| !code.is_empty()) {
        Some("1") => Outcome::RequestRejected(RejectReason::InvalidRecipient),
        Some("2") => Outcome::RequestRejected(RejectReason::TargetNotFound),
        Some(code) => Outcome::ServiceReportedUnknown {
            code: code.to_string(),
            body: String::from_utf8_lossy(body).trim().to_string(),
        },
        None if body == crate::INVALID_URL_BODY => {
            Outcome::RequestRejected(RejectReason::InvalidUrl)
        }
        None if (500..600).contains(&status) => {
            Outcome::TransientFailure(format!("service returned HTTP {status}"))
        }
        None => Outcome::Delivered,
    }
}
