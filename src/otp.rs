use data_encoding::BASE32_NOPAD;
use totp_rs::{Algorithm, Secret, TOTP};

use crate::error::AppError;

const OTP_DIGITS: usize = 6;
const OTP_STEP_SECS: u64 = 30;
/// Codes from one step either side of "now" are accepted.
const OTP_SKEW: u8 = 1;

/// Generate a fresh base32-encoded OTP key for an invite.
pub fn generate_otp_key() -> Result<String, AppError> {
    let bytes = Secret::generate_secret()
        .to_bytes()
        .map_err(|e| AppError::Internal(format!("otp secret generation failed: {e:?}")))?;
    Ok(BASE32_NOPAD.encode(&bytes))
}

fn totp(otp_key: &str) -> Result<TOTP, AppError> {
    let secret = BASE32_NOPAD
        .decode(otp_key.as_bytes())
        .map_err(|e| AppError::Internal(format!("malformed otp key: {e}")))?;
    Ok(TOTP::new_unchecked(
        Algorithm::SHA1,
        OTP_DIGITS,
        OTP_SKEW,
        OTP_STEP_SECS,
        secret,
    ))
}

/// The code valid at `unix_secs`, as sent to the invitee.
pub fn code_at(otp_key: &str, unix_secs: u64) -> Result<String, AppError> {
    Ok(totp(otp_key)?.generate(unix_secs))
}

pub fn verify(otp_key: &str, code: &str, unix_secs: u64) -> Result<bool, AppError> {
    let code = code.trim();
    if code.len() != OTP_DIGITS || !code.chars().all(|c| c.is_ascii_digit()) {
        return Ok(false);
    }
    Ok(totp(otp_key)?.check(code, unix_secs))
}
