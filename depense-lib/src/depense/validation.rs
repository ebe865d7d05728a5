//! Turns an untrusted [`RawPayload`] into validated depense fields.
//!
//! Validation is pure: nothing here touches the repository or the attachment
//! store. Errors are collected for every field rather than stopping at the
//! first one, so a client sees all problems in a single response.

use depense_repo::depense_repo::{
    Category, Depense, DepenseChanges, NewDepense, PaymentMethod,
};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::payload::{PayloadValue, RawPayload, UploadedFile};

pub const TITLE: &str = "title";
pub const AMOUNT: &str = "amount";
pub const CATEGORY: &str = "category";
pub const CUSTOM_CATEGORY: &str = "custom_category";
pub const PAYMENT_METHOD: &str = "payment_method";
pub const ATTACHMENT: &str = "piece_justificative";

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const AMOUNT_INVALID: &str = "amount must be a valid number";
pub const AMOUNT_NOT_POSITIVE: &str = "amount must be greater than 0";
pub const AMOUNT_DECIMAL_PLACES: &str = "Ensure that there are no more than 2 decimal places.";
pub const AMOUNT_TOTAL_DIGITS: &str = "Ensure that there are no more than 10 digits in total.";
pub const AMOUNT_WHOLE_DIGITS: &str =
    "Ensure that there are no more than 8 digits before the decimal point.";
pub const CUSTOM_CATEGORY_REQUIRED: &str = "This field is required when category is AUTRE.";
pub const NOT_A_FILE: &str =
    "The submitted data was not a file. Check the encoding type on the form.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";

const TITLE_MAX_LEN: usize = 200;
const CUSTOM_CATEGORY_MAX_LEN: usize = 50;
const AMOUNT_DECIMALS: u32 = 2;
const AMOUNT_MAX_DIGITS: u32 = 10;

/// Field name to messages, serialised as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            first = false;
            write!(f, "{}: {}", field, messages.join(" "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDepense {
    pub title: String,
    pub amount: Decimal,
    pub category: Category,
    pub custom_category: Option<String>,
    pub payment_method: PaymentMethod,
    pub attachment: Option<UploadedFile>,
}

impl ValidatedDepense {
    /// `attachment` is the stored path of [`ValidatedDepense::attachment`], if any.
    pub fn into_new_depense(self, attachment: Option<String>) -> NewDepense {
        NewDepense::new(
            self.title,
            self.amount,
            self.category,
            self.custom_category,
            self.payment_method,
            attachment,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedChanges {
    pub changes: DepenseChanges,
    /// A newly uploaded file that should replace the current attachment.
    pub attachment: Option<UploadedFile>,
}

/// Validates the payload of a create request. Every field except
/// `custom_category` and the attachment is required.
pub fn validate_new(payload: &RawPayload) -> Result<ValidatedDepense, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = required(payload, TITLE, &mut errors).and_then(|t| title(t, &mut errors));
    let amount = required(payload, AMOUNT, &mut errors).and_then(|a| amount(a, &mut errors));
    let category = required(payload, CATEGORY, &mut errors)
        .and_then(|c| choice::<Category>(CATEGORY, c, &mut errors));
    let payment_method = required(payload, PAYMENT_METHOD, &mut errors)
        .and_then(|p| choice::<PaymentMethod>(PAYMENT_METHOD, p, &mut errors));
    let custom_category = custom_category(payload, &mut errors).flatten();
    let attachment = new_attachment(payload, &mut errors);

    if category == Some(Category::Autre)
        && custom_category.is_none()
        && errors.get(CUSTOM_CATEGORY).is_none()
    {
        errors.add(CUSTOM_CATEGORY, CUSTOM_CATEGORY_REQUIRED);
    }

    match (title, amount, category, payment_method) {
        (Some(title), Some(amount), Some(category), Some(payment_method)) => {
            let custom_category = custom_category.filter(|_| category == Category::Autre);
            errors.into_result(ValidatedDepense {
                title,
                amount,
                category,
                custom_category,
                payment_method,
                attachment,
            })
        }
        _ => Err(errors),
    }
}

/// Validates a partial update of `existing`. Absent fields keep their stored
/// value, and the AUTRE rule is checked against the values the record will
/// have once the update is applied.
pub fn validate_update(
    payload: &RawPayload,
    existing: &Depense,
) -> Result<ValidatedChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();
    let mut changes = DepenseChanges::default();

    if let Some(t) = optional(payload, TITLE, &mut errors) {
        changes.title = title(t, &mut errors);
    }
    if let Some(a) = optional(payload, AMOUNT, &mut errors) {
        changes.amount = amount(a, &mut errors);
    }
    let category_supplied = payload.contains_key(CATEGORY);
    if let Some(c) = optional(payload, CATEGORY, &mut errors) {
        changes.category = choice::<Category>(CATEGORY, c, &mut errors);
    }
    if let Some(p) = optional(payload, PAYMENT_METHOD, &mut errors) {
        changes.payment_method = choice::<PaymentMethod>(PAYMENT_METHOD, p, &mut errors);
    }
    let custom_category = custom_category(payload, &mut errors);
    let attachment = new_attachment(payload, &mut errors);

    // a rejected category leaves nothing meaningful to check against
    if !category_supplied || changes.category.is_some() {
        let category = changes.category.unwrap_or(existing.category);
        let stored = existing
            .custom_category
            .as_deref()
            .filter(|c| !c.trim().is_empty());

        if category == Category::Autre {
            match custom_category {
                Some(Some(supplied)) => changes.custom_category = Some(Some(supplied)),
                // a blank or null value leaves the stored one in place
                _ if stored.is_some() => {}
                _ => {
                    if errors.get(CUSTOM_CATEGORY).is_none() {
                        errors.add(CUSTOM_CATEGORY, CUSTOM_CATEGORY_REQUIRED);
                    }
                }
            }
        } else if existing.custom_category.is_some() || custom_category.is_some() {
            changes.custom_category = Some(None);
        }
    }

    errors.into_result(ValidatedChanges {
        changes,
        attachment,
    })
}

/// Strips every whitespace character, then parses a strictly positive amount
/// with at most two decimal places. The result always has a scale of two.
pub fn parse_amount(raw: &str) -> Result<Decimal, Vec<&'static str>> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let Ok(mut amount) = Decimal::from_str(&cleaned) else {
        return Err(vec![AMOUNT_INVALID]);
    };

    let mut problems = Vec::new();
    if amount <= Decimal::ZERO {
        problems.push(AMOUNT_NOT_POSITIVE);
    }
    if let Some(problem) = precision_problem(amount) {
        problems.push(problem);
    }
    if !problems.is_empty() {
        return Err(problems);
    }

    amount.rescale(AMOUNT_DECIMALS);
    Ok(amount)
}

/// Reports at most one precision problem, checking total digits first, then
/// decimal places, then digits before the point. Trailing zeros don't count.
fn precision_problem(amount: Decimal) -> Option<&'static str> {
    let normalized = amount.normalize();
    let scale = normalized.scale();
    let significant = normalized.mantissa().unsigned_abs().to_string().len() as u32;
    let total = significant.max(scale);
    let whole = total - scale;

    if total > AMOUNT_MAX_DIGITS {
        Some(AMOUNT_TOTAL_DIGITS)
    } else if scale > AMOUNT_DECIMALS {
        Some(AMOUNT_DECIMAL_PLACES)
    } else if whole > AMOUNT_MAX_DIGITS - AMOUNT_DECIMALS {
        Some(AMOUNT_WHOLE_DIGITS)
    } else {
        None
    }
}

fn required<'a>(
    payload: &'a RawPayload,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    if !payload.contains_key(field) {
        errors.add(field, REQUIRED);
        return None;
    }
    optional(payload, field, errors)
}

fn optional<'a>(
    payload: &'a RawPayload,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<&'a str> {
    match payload.get(field)? {
        PayloadValue::Text(value) => Some(value.as_str()),
        PayloadValue::Null => {
            errors.add(field, NOT_NULL);
            None
        }
        PayloadValue::File(_) => {
            errors.add(field, NOT_A_STRING);
            None
        }
    }
}

fn title(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let title = raw.trim();
    if title.is_empty() {
        errors.add(TITLE, NOT_BLANK);
        None
    } else if title.chars().count() > TITLE_MAX_LEN {
        errors.add(TITLE, max_length_message(TITLE_MAX_LEN));
        None
    } else {
        Some(title.to_owned())
    }
}

fn amount(raw: &str, errors: &mut ValidationErrors) -> Option<Decimal> {
    match parse_amount(raw) {
        Ok(amount) => Some(amount),
        Err(problems) => {
            for problem in problems {
                errors.add(AMOUNT, problem);
            }
            None
        }
    }
}

fn choice<T>(field: &str, raw: &str, errors: &mut ValidationErrors) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
{
    match raw.parse() {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(field, e.to_string());
            None
        }
    }
}

/// `None` when the key is absent, `Some(None)` when it is null or blank.
fn custom_category(
    payload: &RawPayload,
    errors: &mut ValidationErrors,
) -> Option<Option<String>> {
    match payload.get(CUSTOM_CATEGORY)? {
        PayloadValue::Null => Some(None),
        PayloadValue::File(_) => {
            errors.add(CUSTOM_CATEGORY, NOT_A_STRING);
            Some(None)
        }
        PayloadValue::Text(value) => {
            let value = value.trim();
            if value.chars().count() > CUSTOM_CATEGORY_MAX_LEN {
                errors.add(CUSTOM_CATEGORY, max_length_message(CUSTOM_CATEGORY_MAX_LEN));
                Some(None)
            } else if value.is_empty() {
                Some(None)
            } else {
                Some(Some(value.to_owned()))
            }
        }
    }
}

/// Blank text and null mean "no file". On update the deletion sentinel has
/// already been taken out of the payload by the handler.
fn new_attachment(payload: &RawPayload, errors: &mut ValidationErrors) -> Option<UploadedFile> {
    match payload.get(ATTACHMENT)? {
        PayloadValue::File(file) if file.content.is_empty() => {
            errors.add(ATTACHMENT, EMPTY_FILE);
            None
        }
        PayloadValue::File(file) => Some(file.clone()),
        PayloadValue::Null => None,
        PayloadValue::Text(value) if value.is_empty() => None,
        PayloadValue::Text(_) => {
            errors.add(ATTACHMENT, NOT_A_FILE);
            None
        }
    }
}

fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}
