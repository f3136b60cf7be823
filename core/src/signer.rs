//! Request signing.
//!
//! The executor only sees the `Signer` trait: it hands over the `date` header
//! value and attaches whatever comes back as `Authorization`. `HmacSigner` is
//! the shared-secret implementation used by the example program and tests.

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::OffsetDateTime;

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
const HTTP_DATE: &[BorrowedFormatItem<'static>] = format_description!(
    "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
);

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error("invalid signing key: {0}")]
    InvalidKey(String),

    #[error("error formatting date header: {0}")]
    DateFormat(#[from] time::error::Format),
}

/// Produces an `Authorization` header value over a `date` header value.
pub trait Signer: Send + Sync {
    fn sign(&self, date: &str) -> Result<String, SignError>;
}

/// Render `at` as an HTTP date in UTC.
pub fn format_http_date(at: OffsetDateTime) -> Result<String, SignError> {
    Ok(at.to_offset(time::UtcOffset::UTC).format(HTTP_DATE)?)
}

/// HTTP-signature signer keyed by a shared secret (`hmac-sha256`).
#[derive(Clone)]
pub struct HmacSigner {
    account: String,
    key_id: String,
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(account: impl Into<String>, key_id: impl Into<String>, secret: impl Into<Vec<u8>>) -> Self {
        Self {
            account: account.into(),
            key_id: key_id.into(),
            secret: secret.into(),
        }
    }

    /// `keyId` parameter as it appears in the header.
    pub fn key_path(&self) -> String {
        format!("/{}/keys/{}", self.account, self.key_id)
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("account", &self.account)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl Signer for HmacSigner {
    fn sign(&self, date: &str) -> Result<String, SignError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.secret)
            .map_err(|e| SignError::InvalidKey(e.to_string()))?;
        mac.update(format!("date: {date}").as_bytes());
        let signature = B64.encode(mac.finalize().into_bytes());
        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"hmac-sha256\",headers=\"date\",signature=\"{signature}\"",
            self.key_path()
        ))
    }
}
