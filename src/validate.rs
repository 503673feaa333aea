//! Signup field validation. Each rule pushes a message keyed by field
//! name; the result is returned to the client as-is, so the messages are
//! the user-facing copy.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::FieldErrors;

/// Characters the name fields may not contain (plus digits).
const NAME_DISALLOWED: &[char] = &['%', '#', '/', '*', '@', '!'];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub birthdate: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub sex: Option<String>,
    // Never settable by clients; its mere presence is rejected before
    // validation runs.
    pub is_activated: Option<serde_json::Value>,
}

pub fn validate_signup(req: &SignupRequest) -> FieldErrors {
    let mut errors = FieldErrors::new();
    let mut push = |field: &str, message: &str| {
        errors
            .entry(field.to_string())
            .or_insert_with(Vec::new)
            .push(message.to_string());
    };

    match req.username.as_deref() {
        None | Some("") => push("username", "Username is required"),
        Some(username) => {
            if username.chars().count() < 6 || username.chars().count() > 20 {
                push("username", "6 to 20 characters only");
            }
        }
    }

    match req.first_name.as_deref() {
        None | Some("") => push("first_name", "First name is required"),
        Some(name) => {
            if name.chars().count() > 70 {
                push("first_name", "70 characters max");
            }
            if !is_letters_only(name) {
                push("first_name", "Letters only");
            }
        }
    }

    match req.last_name.as_deref() {
        None | Some("") => push("last_name", "Last name is required"),
        Some(name) => {
            if name.chars().count() > 35 {
                push("last_name", "35 characters max");
            }
            if !is_letters_only(name) {
                push("last_name", "Letters only");
            }
        }
    }

    match req.email.as_deref() {
        None | Some("") => push("email", "Email is required"),
        Some(email) => {
            if !is_valid_email(email) {
                push("email", "Invalid email");
            }
        }
    }

    match req.birthdate.as_deref() {
        None | Some("") => push("birthdate", "Birthdate is required"),
        Some(birthdate) => match NaiveDate::parse_from_str(birthdate, "%Y-%m-%d") {
            Ok(date) => {
                if date > Utc::now().date_naive() {
                    push("birthdate", "Your birthday should not be greater than today");
                }
            }
            Err(_) => push("birthdate", "Invalid date"),
        },
    }

    match req.password.as_deref() {
        None | Some("") => push("password", "Password is required"),
        Some(password) => {
            if password.len() > 255 {
                push("password", "255 characters max");
            }
        }
    }

    match req.confirm_password.as_deref() {
        None | Some("") => push("confirm_password", "Confirm password is required"),
        Some(confirm) => {
            if Some(confirm) != req.password.as_deref() {
                push(
                    "confirm_password",
                    "Password confirmation does not match password.",
                );
            }
        }
    }

    match req.sex.as_deref() {
        None | Some("") => push("sex", "Sex is required"),
        Some("M") | Some("F") => {}
        Some(_) => push("sex", "Invalid Sex"),
    }

    errors
}

fn is_letters_only(value: &str) -> bool {
    !value
        .chars()
        .any(|c| c.is_ascii_digit() || NAME_DISALLOWED.contains(&c))
}

/// A deliberately loose shape check: one `@`, non-empty local part, a dot
/// somewhere in the domain.
fn is_valid_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> SignupRequest {
        SignupRequest {
            username: Some("chefpipz".into()),
            first_name: Some("Pip".into()),
            last_name: Some("Chef".into()),
            email: Some("pip@example.com".into()),
            birthdate: Some("1990-05-01".into()),
            password: Some("hunter22".into()),
            confirm_password: Some("hunter22".into()),
            sex: Some("M".into()),
            is_activated: None,
        }
    }

    #[test]
    fn valid_request_produces_no_errors() {
        assert!(validate_signup(&valid_request()).is_empty());
    }

    #[test]
    fn empty_request_flags_every_required_field() {
        let errors = validate_signup(&SignupRequest::default());
        for field in [
            "username",
            "first_name",
            "last_name",
            "email",
            "birthdate",
            "password",
            "confirm_password",
            "sex",
        ] {
            assert!(errors.contains_key(field), "missing error for {}", field);
        }
    }

    #[test]
    fn username_length_bounds() {
        let mut req = valid_request();
        req.username = Some("short".into());
        assert_eq!(
            validate_signup(&req)["username"],
            vec!["6 to 20 characters only"]
        );

        req.username = Some("a".repeat(21));
        assert!(validate_signup(&req).contains_key("username"));

        req.username = Some("a".repeat(20));
        assert!(!validate_signup(&req).contains_key("username"));
    }

    #[test]
    fn names_reject_digits_and_symbols() {
        let mut req = valid_request();
        req.first_name = Some("P1p".into());
        assert_eq!(validate_signup(&req)["first_name"], vec!["Letters only"]);

        let mut req = valid_request();
        req.last_name = Some("Che#f".into());
        assert_eq!(validate_signup(&req)["last_name"], vec!["Letters only"]);
    }

    #[test]
    fn names_allow_spaces_and_accents() {
        let mut req = valid_request();
        req.first_name = Some("Mary Anne".into());
        req.last_name = Some("Muñoz".into());
        assert!(validate_signup(&req).is_empty());
    }

    #[test]
    fn email_shape_is_checked() {
        let mut req = valid_request();
        for bad in ["nope", "@example.com", "pip@", "pip@nodot", "pip@.com"] {
            req.email = Some(bad.into());
            assert!(
                validate_signup(&req).contains_key("email"),
                "accepted {:?}",
                bad
            );
        }
    }

    #[test]
    fn future_birthdate_rejected() {
        let mut req = valid_request();
        let tomorrow = Utc::now().date_naive() + chrono::Days::new(1);
        req.birthdate = Some(tomorrow.format("%Y-%m-%d").to_string());
        assert_eq!(
            validate_signup(&req)["birthdate"],
            vec!["Your birthday should not be greater than today"]
        );
    }

    #[test]
    fn today_birthdate_accepted() {
        let mut req = valid_request();
        req.birthdate = Some(Utc::now().date_naive().format("%Y-%m-%d").to_string());
        assert!(validate_signup(&req).is_empty());
    }

    #[test]
    fn password_confirmation_must_match() {
        let mut req = valid_request();
        req.confirm_password = Some("different".into());
        assert_eq!(
            validate_signup(&req)["confirm_password"],
            vec!["Password confirmation does not match password."]
        );
    }

    #[test]
    fn sex_must_be_m_or_f() {
        let mut req = valid_request();
        req.sex = Some("X".into());
        assert_eq!(validate_signup(&req)["sex"], vec!["Invalid Sex"]);

        req.sex = Some("F".into());
        assert!(validate_signup(&req).is_empty());
    }
}
