//! Shared numeric-literal formatting for emitted source.
//!
//! Every threshold and leaf value the emitters write goes through
//! [`format_f64`], so the whole module has one precision policy: the
//! shortest decimal string that parses back to the identical `f64`.

/// Format an `f64` as a JavaScript numeric literal.
///
/// Finite values use shortest round-trip formatting, with a `.0` suffix when
/// integral so the literal reads as a float. Non-finite values use the
/// JavaScript global spellings.
pub fn format_f64(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        };
    }

    let mut s = value.to_string();
    if !s.contains(['.', 'e', 'E']) {
        s.push_str(".0");
    }
    s
}
