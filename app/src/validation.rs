//! Client-side validation of the sign-up and login forms.
//!
//! Every failing field is reported, so a form can show all messages at once.
//! A valid form converts into the [`UserAction`] it submits.

use crate::actions::UserAction;
use crate::types::Credentials;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use todo_sync_core::environment::Clock;

/// Message for a missing value
pub const REQUIRED: &str = "Required";
/// Message for a malformed email
pub const INVALID_EMAIL: &str = "Invalid email";
/// Message for a password under [`MIN_PASSWORD_LEN`]
pub const PASSWORD_TOO_SHORT: &str = "Password too short";
/// Message for a missing date of birth
pub const DOB_REQUIRED: &str = "Date of birth is required";
/// Message for a date of birth after today
pub const DOB_IN_FUTURE: &str = "Date of birth cannot be in the future";

/// Minimum password length, in characters
pub const MIN_PASSWORD_LEN: usize = 6;

/// A form input
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    /// Email input
    Email,
    /// Password input
    Password,
    /// Date of birth picker
    Dob,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Email => "email",
            Self::Password => "password",
            Self::Dob => "dob",
        })
    }
}

/// Per-field error messages, one per failing field
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<FormField, &'static str>);

impl FieldErrors {
    /// Message for `field`, if it failed
    #[must_use]
    pub fn get(&self, field: FormField) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    /// Whether no field failed
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Failing fields and their messages, in form order
    pub fn iter(&self) -> impl Iterator<Item = (FormField, &'static str)> + '_ {
        self.0.iter().map(|(field, message)| (*field, *message))
    }

    fn record(&mut self, field: FormField, check: Result<(), &'static str>) {
        if let Err(message) = check {
            self.0.insert(field, message);
        }
    }

    fn into_result(self) -> Result<(), ValidationError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, (field, message)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// A form failed validation
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Invalid form: {0}")]
pub struct ValidationError(pub FieldErrors);

impl ValidationError {
    /// The per-field messages
    #[must_use]
    pub const fn fields(&self) -> &FieldErrors {
        &self.0
    }
}

/// Whether `email` looks like `local@domain.tld`
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > 255 {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    let local_ok = local
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '+' | '_'));
    let domain_ok = domain
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-'));

    local_ok && domain_ok && domain.contains('.') && domain.split('.').all(|part| !part.is_empty())
}

fn check_email(email: &str) -> Result<(), &'static str> {
    if email.trim().is_empty() {
        Err(REQUIRED)
    } else if is_valid_email(email.trim()) {
        Ok(())
    } else {
        Err(INVALID_EMAIL)
    }
}

fn check_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        Err(REQUIRED)
    } else if password.chars().count() < MIN_PASSWORD_LEN {
        Err(PASSWORD_TOO_SHORT)
    } else {
        Ok(())
    }
}

fn check_dob(dob: Option<NaiveDate>, clock: &dyn Clock) -> Result<(), &'static str> {
    match dob {
        None => Err(DOB_REQUIRED),
        Some(date) if date > clock.now().date_naive() => Err(DOB_IN_FUTURE),
        Some(_) => Ok(()),
    }
}

/// Sign-up form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignUpForm {
    /// Account email
    pub email: String,
    /// Password, at least [`MIN_PASSWORD_LEN`] characters
    pub password: String,
    /// Date of birth, not after today
    pub dob: Option<NaiveDate>,
    /// Optional profile image URI
    pub image: Option<String>,
}

impl SignUpForm {
    /// Creates a form without an image
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>, dob: Option<NaiveDate>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            dob,
            image: None,
        }
    }

    /// Attaches a profile image URI
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Checks every field against today's date from `clock`
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn validate(&self, clock: &dyn Clock) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.record(FormField::Email, check_email(&self.email));
        errors.record(FormField::Password, check_password(&self.password));
        errors.record(FormField::Dob, check_dob(self.dob, clock));
        errors.into_result()
    }

    /// Validates the form and turns it into a `Register` action
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn submit(self, clock: &dyn Clock) -> Result<UserAction, ValidationError> {
        self.validate(clock)?;
        Ok(UserAction::Register {
            email: self.email.trim().to_string(),
            password: self.password,
            dob: self.dob,
            image: self.image,
        })
    }
}

/// Email/password login form
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Account email
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginForm {
    /// Creates a form
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Checks both fields
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = FieldErrors::default();
        errors.record(FormField::Email, check_email(&self.email));
        errors.record(FormField::Password, check_password(&self.password));
        errors.into_result()
    }

    /// Validates the form and turns it into a `Login` action
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failing field.
    pub fn submit(self) -> Result<UserAction, ValidationError> {
        self.validate()?;
        Ok(UserAction::Login {
            credentials: Credentials::email(self.email.trim(), self.password),
        })
    }
}
