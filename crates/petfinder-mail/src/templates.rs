//! Plain-text bodies for the three notification mails.

pub const VERIFICATION_SUBJECT: &str = "Pet Finder - Verify Your Account";
pub const CONFIRMATION_SUBJECT: &str = "Pet Finder - Registration Complete";
pub const RESET_SUBJECT: &str = "Pet Finder - Password Reset Request";

pub const CONFIRMATION_BODY: &str = "Your registration is complete. Welcome to Pet Finder!";

pub fn verification_body(code: &str) -> String {
    format!(
        "Welcome to Pet Finder!\n\
        \n\
        Your verification code is:\n\
        \n\
        {}\n\
        \n\
        Enter this code in the application to complete your registration.\n",
        code
    )
}

pub fn reset_body(code: &str) -> String {
    format!(
        "Hello,\n\
        \n\
        A password reset was requested for your Pet Finder account.\n\
        \n\
        Your reset code is:\n\
        \n\
        {}\n\
        \n\
        This code will expire in 1 hour.\n\
        \n\
        If you did not request this reset, you can ignore this email.\n",
        code
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_body_contains_code() {
        let body = verification_body("123456");
        assert!(body.contains("123456"));
        assert!(body.contains("verification code"));
    }

    #[test]
    fn reset_body_mentions_expiry_and_code() {
        let body = reset_body("654321");
        assert!(body.contains("654321"));
        assert!(body.contains("expire in 1 hour"));
        assert!(body.contains("did not request"));
    }

    #[test]
    fn code_is_set_off_by_blank_lines() {
        let body = verification_body("123456");
        let lines: Vec<&str> = body.lines().collect();
        let idx = lines.iter().position(|&l| l == "123456").unwrap();
        assert_eq!(lines[idx - 1], "");
        assert_eq!(lines[idx + 1], "");
    }
}
