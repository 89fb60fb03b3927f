use rand::Rng;

/// Reset codes stay valid for exactly one hour after generation.
pub const RESET_CODE_TTL_SECS: i64 = 3600;

/// One-time code for email verification, password reset, and email-change
/// confirmation. Uniform over 100000..=999999 so it is always six digits.
pub fn generate_code() -> String {
    rand::rng().random_range(100_000..=999_999u32).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&n));
        }
    }

    #[test]
    fn codes_never_start_with_zero() {
        for _ in 0..200 {
            assert_ne!(generate_code().as_bytes()[0], b'0');
        }
    }
}
