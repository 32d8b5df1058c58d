//! Field validation for registration, profile, product and payment forms.
//!
//! Validators return a human-readable message on failure. Form-level checks
//! collect them into [`ValidationErrors`], which maps to a 400 response with
//! one entry per offending field.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::regions;

pub const MAX_NAME_CHARS: usize = 50;
pub const MAX_EMAIL_CHARS: usize = 30;
pub const MIN_PASSWORD_CHARS: usize = 4;
pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 99;
pub const MAX_PERSONALIZATION_CHARS: usize = 200;
pub const MAX_PRODUCT_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Records the error of `result`, if any, under `field`.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    pub fn merge(&mut self, other: ValidationErrors) {
        for (field, message) in other.fields {
            self.fields.entry(field).or_insert(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

pub fn validate_name(name: &str) -> Result<(), String> {
    let name = name.trim();
    if name.is_empty() {
        return Err("name is required".into());
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(format!("name cannot exceed {MAX_NAME_CHARS} characters"));
    }
    if !name.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return Err("name may only contain letters".into());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    let email = email.trim();
    if email.is_empty() {
        return Err("email is required".into());
    }
    if email.chars().count() > MAX_EMAIL_CHARS {
        return Err(format!("email cannot exceed {MAX_EMAIL_CHARS} characters"));
    }
    if !is_email_shaped(email) {
        return Err("invalid email".into());
    }
    Ok(())
}

fn is_email_shaped(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn validate_age(birth_date: NaiveDate, today: NaiveDate) -> Result<i32, String> {
    let age = age_on(birth_date, today);
    if age < MIN_AGE {
        return Err(format!("you must be at least {MIN_AGE} years old to register"));
    }
    if age > MAX_AGE {
        return Err(format!("the maximum allowed age is {MAX_AGE} years"));
    }
    Ok(age)
}

pub fn validate_phone(phone: &str) -> Result<(), String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err("phone is required".into());
    }
    if phone.len() != 9 || !phone.chars().all(|c| c.is_ascii_digit()) {
        return Err("phone must have exactly 9 digits".into());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("password is required".into());
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(format!(
            "password must have at least {MIN_PASSWORD_CHARS} characters"
        ));
    }
    Ok(())
}

/// Product codes are 4 to 6 ASCII letters or digits, e.g. `TC001`.
pub fn validate_product_code(code: &str) -> Result<(), String> {
    let len = code.len();
    if !(4..=6).contains(&len) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("product code must be 4 to 6 letters or digits".into());
    }
    Ok(())
}

pub fn validate_personalization(message: &str) -> Result<(), String> {
    if message.chars().count() > MAX_PERSONALIZATION_CHARS {
        return Err(format!(
            "personalization cannot exceed {MAX_PERSONALIZATION_CHARS} characters"
        ));
    }
    Ok(())
}

pub fn validate_address(street: &str, number: &str, region: &str, commune: &str) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if street.trim().is_empty() {
        errors.add("street", "street is required");
    }
    if number.trim().is_empty() {
        errors.add("number", "street number is required");
    }
    if region.trim().is_empty() {
        errors.add("region", "region is required");
    } else if regions::communes_of(region).is_none() {
        errors.add("region", "unknown region");
    }
    if commune.trim().is_empty() {
        errors.add("commune", "commune is required");
    } else if !errors.contains("region") && !regions::is_valid_commune(region, commune) {
        errors.add("commune", "commune does not belong to the selected region");
    }
    errors
}

/// Card details as typed by the shopper.
#[derive(Debug, Clone)]
pub struct CardInput<'a> {
    pub number: &'a str,
    pub expiry: &'a str,
    pub holder: &'a str,
    pub cvv: &'a str,
}

/// Checks card format (no issuer checksum) and returns the last four digits.
pub fn validate_card(card: &CardInput<'_>, today: NaiveDate) -> Result<String, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let digits: String = card
        .number
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    if digits.len() != 16 || !digits.chars().all(|c| c.is_ascii_digit()) {
        errors.add("card_number", "card number must have 16 digits");
    }

    errors.check("card_expiry", validate_expiry(card.expiry, today));

    let holder = card.holder.trim();
    if holder.is_empty() {
        errors.add("card_holder", "cardholder name is required");
    } else if !holder.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        errors.add("card_holder", "cardholder name may only contain letters");
    }

    let cvv = card.cvv.trim();
    if cvv.len() != 3 || !cvv.chars().all(|c| c.is_ascii_digit()) {
        errors.add("card_cvv", "CVV must have 3 digits");
    }

    errors.into_result()?;
    Ok(digits[digits.len() - 4..].to_string())
}

/// Accepts `MM/YY`; a card is valid through the last day of its month.
pub fn validate_expiry(expiry: &str, today: NaiveDate) -> Result<(), String> {
    let (month, year) = expiry
        .trim()
        .split_once('/')
        .ok_or_else(|| "expiry must use the MM/YY format".to_string())?;
    if month.len() != 2 || year.len() != 2 {
        return Err("expiry must use the MM/YY format".into());
    }
    let month: u32 = month
        .parse()
        .map_err(|_| "expiry must use the MM/YY format".to_string())?;
    let year: i32 = year
        .parse()
        .map_err(|_| "expiry must use the MM/YY format".to_string())?;
    if !(1..=12).contains(&month) {
        return Err("expiry month must be between 01 and 12".into());
    }
    if (2000 + year, month) < (today.year(), today.month()) {
        return Err("card has expired".into());
    }
    Ok(())
}
