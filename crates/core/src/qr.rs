//! Rotating authentication code generation
//!
//! The provider proves QR freshness with a time-windowed HMAC: every
//! refresh interval the displayed code is recomputed from the session
//! secret and the elapsed whole seconds since the order was created.
//! A captured QR image therefore stops being useful one window later.

use hmac::{Hmac, Mac};
use idport_domain::constants::{AUTOSTART_URL_SCHEME, QR_CODE_PREFIX};
use idport_domain::SecretString;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute the animated QR payload for one refresh window.
///
/// The layout `bankid.<startToken>.<elapsedSeconds>.<hexCode>` is
/// provider-defined and must not be altered: dot separators, decimal
/// seconds, lowercase hex. `elapsed_seconds` is whole seconds since the
/// order was created.
///
/// Returns `None` when the token or secret is absent - the session is not
/// ready yet, which is not an error condition.
pub fn animated_qr_data(
    start_token: &str,
    secret: &SecretString,
    elapsed_seconds: u64,
) -> Option<String> {
    if start_token.is_empty() || secret.is_empty() {
        return None;
    }

    // HMAC-SHA256 accepts any key length; new_from_slice cannot fail here.
    let mut mac = HmacSha256::new_from_slice(secret.expose().as_bytes()).ok()?;
    mac.update(elapsed_seconds.to_string().as_bytes());
    let auth_code = hex::encode(mac.finalize().into_bytes());

    Some(format!("{QR_CODE_PREFIX}.{start_token}.{elapsed_seconds}.{auth_code}"))
}

/// Deep link that opens the provider's native app for this order.
pub fn autostart_url(auto_start_token: &str) -> String {
    format!("{AUTOSTART_URL_SCHEME}?autostarttoken={auto_start_token}&redirect=null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s)
    }

    // Known-answer vectors: HMAC-SHA256 over the decimal elapsed-seconds
    // string, keyed by the raw secret bytes.
    #[test]
    fn test_known_vector_at_zero_seconds() {
        let code = animated_qr_data("t1", &secret("s1"), 0).unwrap();
        assert_eq!(
            code,
            "bankid.t1.0.408336af18120b008e33eaeea6b99f9476f639b9a139bba5fe84d4102afc2946"
        );
    }

    #[test]
    fn test_known_vector_at_five_seconds() {
        let code = animated_qr_data("t1", &secret("s1"), 5).unwrap();
        assert_eq!(
            code,
            "bankid.t1.5.917ef77b3d6c1709c2a685bba332635d0fef8131f18104da2b8505b1c39817cc"
        );
    }

    #[test]
    fn test_known_vector_with_provider_length_secret() {
        let code =
            animated_qr_data("token", &secret("d28db9146bd1d154180e2c0a3b3db667"), 0).unwrap();
        assert_eq!(
            code,
            "bankid.token.0.92fee445d6e0a565d07ca23623deaf00da45ddf3598c25c3bc611a07a22492ec"
        );
    }

    #[test]
    fn test_deterministic() {
        let a = animated_qr_data("t1", &secret("s1"), 17).unwrap();
        let b = animated_qr_data("t1", &secret("s1"), 17).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_codes_rotate_with_elapsed_seconds() {
        let at_zero = animated_qr_data("t1", &secret("s1"), 0).unwrap();
        let at_five = animated_qr_data("t1", &secret("s1"), 5).unwrap();
        assert_ne!(at_zero, at_five);
    }

    #[test]
    fn test_format_shape() {
        let code = animated_qr_data("qr-token", &secret("whatever"), 1234).unwrap();
        let parts: Vec<&str> = code.split('.').collect();

        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "bankid");
        assert_eq!(parts[1], "qr-token");
        assert_eq!(parts[2], "1234");
        assert_eq!(parts[3].len(), 64);
        assert!(parts[3].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_refused_without_token_or_secret() {
        assert!(animated_qr_data("", &secret("s1"), 0).is_none());
        assert!(animated_qr_data("t1", &secret(""), 0).is_none());
    }

    #[test]
    fn test_autostart_url() {
        assert_eq!(
            autostart_url("7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6"),
            "bankid:///?autostarttoken=7c40b5c9-fa74-49cf-b98c-bfe651f9a7c6&redirect=null"
        );
    }
}
