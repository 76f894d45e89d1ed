//! Field validators shared by the account and article services.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationErrors;

/// Message shown when the `characters` field does not follow the expected
/// layout.
pub const CHARACTERS_FORMAT_MESSAGE: &str =
    "Enter in the format: \"<name> (<birth year>-<death year>)\"";

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static CHARACTERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A(?:.+\s\(\d{4}-(?:\d{4})?\)(?:, )?)+\z").expect("characters pattern compiles")
});

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[^@\s]+@[^@\s.]+(?:\.[^@\s.]+)+\z").expect("email pattern compiles")
});

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\A[\w.@+-]+\z").expect("username pattern compiles")
});

pub const USERNAME_MAX: usize = 150;
pub const RUBRIC_NAME_MAX: usize = 20;
pub const TITLE_MAX: usize = 40;
pub const CAPTION_MAX: usize = 200;
pub const COMMENT_AUTHOR_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;

/// Whether `value` lists people as `Name (YYYY-YYYY)` entries, optionally
/// separated by `", "`. The death year may be left empty for living people.
/// A name is any text, commas and parentheses included.
#[must_use]
pub fn characters_are_valid(value: &str) -> bool { CHARACTERS_RE.is_match(value) }

/// Record an error on `characters` unless it matches the expected layout.
pub fn check_characters(errors: &mut ValidationErrors, value: &str) {
    if !characters_are_valid(value) {
        errors.add("characters", CHARACTERS_FORMAT_MESSAGE);
    }
}

/// Record an error when `value` is blank.
pub fn check_required(errors: &mut ValidationErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
        return false;
    }
    true
}

/// Record an error when `value` holds more than `max` characters.
pub fn check_max_chars(errors: &mut ValidationErrors, field: &'static str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!("Ensure this value has at most {max} characters (it has {len})."),
        );
    }
}

/// Validate a username: required, bounded, and limited to letters, digits
/// and `@.+-_`.
pub fn check_username(errors: &mut ValidationErrors, value: &str) {
    if !check_required(errors, "username", value) {
        return;
    }
    check_max_chars(errors, "username", value, USERNAME_MAX);
    if !USERNAME_RE.is_match(value) {
        errors.add(
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
    }
}

/// Validate a required email address.
pub fn check_email(errors: &mut ValidationErrors, value: &str) {
    if check_required(errors, "email", value) && !EMAIL_RE.is_match(value) {
        errors.add("email", "Enter a valid email address.");
    }
}

/// Apply the password strength rules to `password` on behalf of `field`.
///
/// Rejects passwords shorter than [`PASSWORD_MIN`], passwords made only of
/// digits, and passwords that contain the username or are contained in it.
pub fn check_password_strength(
    errors: &mut ValidationErrors,
    field: &'static str,
    password: &str,
    username: &str,
) {
    if !check_required(errors, field, password) {
        return;
    }
    if password.chars().count() < PASSWORD_MIN {
        errors.add(
            field,
            format!("This password is too short. It must contain at least {PASSWORD_MIN} characters."),
        );
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        errors.add(field, "This password is entirely numeric.");
    }
    let pw = password.to_lowercase();
    let user = username.trim().to_lowercase();
    if !user.is_empty() && (pw.contains(&user) || user.contains(&pw)) {
        errors.add(field, "The password is too similar to the username.");
    }
}

/// Validate a new password and its confirmation.
pub fn check_password_pair(
    errors: &mut ValidationErrors,
    password1: &str,
    password2: &str,
    username: &str,
) {
    check_password_strength(errors, "password1", password1, username);
    if check_required(errors, "password2", password2)
        && !password1.is_empty()
        && password1 != password2
    {
        errors.add("password2", "The two password fields didn't match.");
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Ada Lovelace (1815-1852)")]
    #[case("Ada Lovelace (1815-1852), Alan Turing (1912-1954)")]
    #[case("Donald Knuth (1938-)")]
    #[case("Ada Lovelace (1815-1852), Donald Knuth (1938-), ")]
    #[case("Лев Толстой (1828-1910)")]
    #[case("Martin Luther King, Jr. (1929-1968)")]
    #[case("Pliny (the Elder) (1923-1979)")]
    #[case("Ada Lovelace (1815-1852)Alan Turing (1912-1954)")]
    #[case("Ada Lovelace (1815-1852),Alan Turing (1912-1954)")]
    fn accepts_well_formed_characters(#[case] value: &str) {
        assert!(characters_are_valid(value), "{value}");
    }

    #[rstest]
    #[case("")]
    #[case("Ada Lovelace 1815-1852")]
    #[case("Ada Lovelace (18151852)")]
    #[case("Ada Lovelace (1815-1852) and friends")]
    #[case("(1815-1852)")]
    #[case("Ada Lovelace (1815-1852); ")]
    #[case("Ada Lovelace\n(1815-1852)x")]
    #[case("Ada Lovelace (815-1852)")]
    #[case("Ada Lovelace (1815-852)")]
    fn rejects_malformed_characters(#[case] value: &str) {
        assert!(!characters_are_valid(value), "{value}");
    }

    #[rstest]
    fn characters_error_uses_fixed_message() {
        let mut errors = ValidationErrors::new();
        check_characters(&mut errors, "nobody");
        assert_eq!(
            errors.for_field("characters").collect::<Vec<_>>(),
            vec![CHARACTERS_FORMAT_MESSAGE]
        );
    }

    #[rstest]
    #[case("alice", true)]
    #[case("alice.b+c@d-e_f", true)]
    #[case("", false)]
    #[case("alice smith", false)]
    #[case("alice/", false)]
    fn username_rules(#[case] value: &str, #[case] ok: bool) {
        let mut errors = ValidationErrors::new();
        check_username(&mut errors, value);
        assert_eq!(errors.is_empty(), ok, "{value}");
    }

    #[rstest]
    #[case("alice@example.com", true)]
    #[case("a.b@mail.example.org", true)]
    #[case("alice", false)]
    #[case("alice@localhost", false)]
    #[case("al ice@example.com", false)]
    #[case("", false)]
    fn email_rules(#[case] value: &str, #[case] ok: bool) {
        let mut errors = ValidationErrors::new();
        check_email(&mut errors, value);
        assert_eq!(errors.is_empty(), ok, "{value}");
    }

    #[rstest]
    #[case("correct horse", "correct horse", true)]
    #[case("short", "short", false)]
    #[case("1234567890", "1234567890", false)]
    #[case("alice-rules", "alice-rules", false)]
    #[case("correct horse", "battery staple", false)]
    fn password_pair_rules(#[case] p1: &str, #[case] p2: &str, #[case] ok: bool) {
        let mut errors = ValidationErrors::new();
        check_password_pair(&mut errors, p1, p2, "alice");
        assert_eq!(errors.is_empty(), ok, "{errors}");
    }

    #[rstest]
    fn mismatch_is_reported_on_confirmation() {
        let mut errors = ValidationErrors::new();
        check_password_pair(&mut errors, "correct horse", "battery staple", "alice");
        assert!(errors.has_field("password2"));
        assert!(!errors.has_field("password1"));
    }

    #[rstest]
    fn max_chars_counts_characters_not_bytes() {
        let mut errors = ValidationErrors::new();
        check_max_chars(&mut errors, "name", &"я".repeat(20), RUBRIC_NAME_MAX);
        assert!(errors.is_empty());
        check_max_chars(&mut errors, "name", &"я".repeat(21), RUBRIC_NAME_MAX);
        assert!(errors.has_field("name"));
    }

    fn character_entry() -> impl Strategy<Value = String> {
        (
            "[A-Za-z][A-Za-z ]{0,15}[A-Za-z]",
            1000u32..=2100,
            prop::option::of(1000u32..=2100),
        )
            .prop_map(|(name, born, died)| {
                let died = died.map(|d| d.to_string()).unwrap_or_default();
                format!("{name} ({born}-{died})")
            })
    }

    proptest! {
        #[test]
        fn any_well_formed_list_is_accepted(entries in prop::collection::vec(character_entry(), 1..5)) {
            let value = entries.join(", ");
            prop_assert!(characters_are_valid(&value), "{}", value);
        }

        #[test]
        fn trailing_text_is_rejected(
            entries in prop::collection::vec(character_entry(), 1..4),
            tail in "[A-Za-z]{1,8}",
        ) {
            let value = format!("{} {tail}", entries.join(", "));
            prop_assert!(!characters_are_valid(&value), "{}", value);
        }
    }
}
