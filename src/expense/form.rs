//! Validation of the request body for creating an expense.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};

use crate::{
    Error, FieldError,
    expense::{Amount, Category, Description, NewExpense},
    idempotency::IdempotencyKey,
};

/// The JSON body for creating an expense.
///
/// Every field is optional here so that missing fields are reported together
/// with the other validation errors instead of failing deserialization.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseForm {
    /// How much money was spent, must be greater than zero.
    pub amount: Option<f64>,
    /// What kind of expense this was.
    pub category: Option<String>,
    /// What the expense was for.
    pub description: Option<String>,
    /// When the money was spent, as "YYYY-MM-DD" or an RFC 3339 date-time.
    pub date: Option<String>,
    /// A token chosen by the client to make retries safe.
    pub idempotency_key: Option<String>,
}

/// An [ExpenseForm] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedExpenseForm {
    /// The expense to create.
    pub expense: NewExpense,
    /// The idempotency key from the body or the `Idempotency-Key` header.
    pub idempotency_key: Option<IdempotencyKey>,
}

impl ExpenseForm {
    /// Check every field of the form.
    ///
    /// `header_key` is the value of the `Idempotency-Key` header, if the
    /// request had one. It is only used when the body has no `idempotencyKey`.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::Validation] listing every invalid field.
    pub fn validate(self, header_key: Option<String>) -> Result<ValidatedExpenseForm, Error> {
        let mut errors = Vec::new();

        let amount = match self.amount {
            Some(amount) => collect(parse_amount(amount), &mut errors),
            None => {
                errors.push(FieldError::new("amount", "Amount is required"));
                None
            }
        };

        let category = collect(
            Category::new(self.category.as_deref().unwrap_or_default()),
            &mut errors,
        );

        let description = collect(
            Description::new(self.description.as_deref().unwrap_or_default()),
            &mut errors,
        );

        let date = match self.date {
            Some(date) => collect(parse_date(&date), &mut errors),
            None => {
                errors.push(FieldError::new("date", "Date is required"));
                None
            }
        };

        // The body key wins, the header is only used when the body has none.
        let idempotency_key = self
            .idempotency_key
            .or(header_key)
            .and_then(|key| collect(IdempotencyKey::new(&key), &mut errors));

        match (amount, category, description, date) {
            (Some(amount), Some(category), Some(description), Some(date)) if errors.is_empty() => {
                Ok(ValidatedExpenseForm {
                    expense: NewExpense {
                        amount,
                        category,
                        description,
                        date,
                    },
                    idempotency_key,
                })
            }
            _ => Err(Error::Validation(errors)),
        }
    }
}

/// Move the field errors of a failed validation into `errors`.
fn collect<T>(result: Result<T, Error>, errors: &mut Vec<FieldError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(Error::Validation(mut field_errors)) => {
            errors.append(&mut field_errors);
            None
        }
        Err(error) => {
            errors.push(FieldError::new("body", &error.to_string()));
            None
        }
    }
}

/// Convert a JSON number into an [Amount].
///
/// The number is converted via its shortest decimal representation, so
/// `45.99` becomes exactly 45.99 rather than the nearest binary fraction.
///
/// # Errors
///
/// This function will return an [Error::Validation] if `amount` is not
/// positive or is too large.
pub fn parse_amount(amount: f64) -> Result<Amount, Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::Validation(vec![FieldError::new(
            "amount",
            "Amount must be positive",
        )]));
    }

    let decimal = Decimal::from_str(&amount.to_string()).map_err(|_| {
        Error::Validation(vec![FieldError::new("amount", "Amount is too large")])
    })?;

    Amount::new(decimal)
}

/// Parse a calendar date from "YYYY-MM-DD" or an RFC 3339 date-time.
///
/// For date-times, the date in the given offset is used, e.g.
/// "2024-01-15T23:00:00-05:00" is the 15th of January.
///
/// # Errors
///
/// This function will return an [Error::Validation] if `text` is not a valid date.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    let text = text.trim();

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .or_else(|_| OffsetDateTime::parse(text, &Rfc3339).map(|date_time| date_time.date()))
        .map_err(|_| Error::Validation(vec![FieldError::new("date", "Invalid date")]))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use time::macros::date;

    use crate::{
        Error, FieldError,
        expense::{
            Amount, Category, Description, NewExpense,
            form::{ExpenseForm, ValidatedExpenseForm, parse_amount, parse_date},
        },
        idempotency::IdempotencyKey,
    };

    fn lunch_form() -> ExpenseForm {
        ExpenseForm {
            amount: Some(45.99),
            category: Some("Food".to_owned()),
            description: Some("Lunch at cafe".to_owned()),
            date: Some("2024-01-15".to_owned()),
            idempotency_key: None,
        }
    }

    #[test]
    fn valid_form() {
        let got = lunch_form().validate(None);

        assert_eq!(
            got,
            Ok(ValidatedExpenseForm {
                expense: NewExpense {
                    amount: Amount::new(Decimal::from_str("45.99").unwrap()).unwrap(),
                    category: Category::new_unchecked("Food"),
                    description: Description::new_unchecked("Lunch at cafe"),
                    date: date!(2024 - 01 - 15),
                },
                idempotency_key: None,
            })
        );
    }

    #[test]
    fn reports_every_invalid_field() {
        let form = ExpenseForm {
            amount: Some(-1.0),
            category: None,
            description: Some("".to_owned()),
            date: Some("not a date".to_owned()),
            idempotency_key: None,
        };

        let got = form.validate(None);

        assert_eq!(
            got,
            Err(Error::Validation(vec![
                FieldError::new("amount", "Amount must be positive"),
                FieldError::new("category", "Category is required"),
                FieldError::new("description", "Description is required"),
                FieldError::new("date", "Invalid date"),
            ]))
        );
    }

    #[test]
    fn missing_amount_is_invalid() {
        let form = ExpenseForm {
            amount: None,
            ..lunch_form()
        };

        assert_eq!(
            form.validate(None),
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount is required"
            )]))
        );
    }

    #[test]
    fn uses_key_from_body() {
        let form = ExpenseForm {
            idempotency_key: Some("abc-1".to_owned()),
            ..lunch_form()
        };

        let got = form.validate(None).unwrap();

        assert_eq!(
            got.idempotency_key,
            Some(IdempotencyKey::new("abc-1").unwrap())
        );
    }

    #[test]
    fn uses_key_from_header() {
        let got = lunch_form().validate(Some("abc-1".to_owned())).unwrap();

        assert_eq!(
            got.idempotency_key,
            Some(IdempotencyKey::new("abc-1").unwrap())
        );
    }

    #[test]
    fn body_key_wins_over_header_key() {
        let form = ExpenseForm {
            idempotency_key: Some("fresh-key".to_owned()),
            ..lunch_form()
        };

        let got = form.validate(Some("stale-key".to_owned())).unwrap();

        assert_eq!(
            got.idempotency_key,
            Some(IdempotencyKey::new("fresh-key").unwrap())
        );
    }

    #[test]
    fn rejects_empty_header_key() {
        let got = lunch_form().validate(Some("".to_owned()));

        assert_eq!(
            got,
            Err(Error::Validation(vec![FieldError::new(
                "idempotencyKey",
                "Idempotency key cannot be empty"
            )]))
        );
    }

    #[test]
    fn rejects_empty_key() {
        let form = ExpenseForm {
            idempotency_key: Some("".to_owned()),
            ..lunch_form()
        };

        let got = form.validate(None);

        assert!(matches!(got, Err(Error::Validation(_))), "got {got:?}");
    }

    #[test]
    fn amount_keeps_decimal_digits() {
        let amount = parse_amount(0.1).unwrap();

        assert_eq!(amount.to_string(), "0.1");
    }

    #[test]
    fn amount_rejects_zero() {
        assert_eq!(
            parse_amount(0.0),
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount must be positive"
            )]))
        );
    }

    #[test]
    fn amount_rejects_huge_numbers() {
        assert_eq!(
            parse_amount(1e40),
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount is too large"
            )]))
        );
        assert_eq!(
            parse_amount(1_000_000_001.0),
            Err(Error::Validation(vec![FieldError::new(
                "amount",
                "Amount is too large"
            )]))
        );
    }

    #[test]
    fn parses_iso_date() {
        assert_eq!(parse_date("2024-01-15"), Ok(date!(2024 - 01 - 15)));
    }

    #[test]
    fn parses_rfc3339_date_time() {
        assert_eq!(
            parse_date("2024-01-15T23:00:00-05:00"),
            Ok(date!(2024 - 01 - 15))
        );
    }

    #[test]
    fn rejects_impossible_date() {
        assert_eq!(
            parse_date("2024-02-30"),
            Err(Error::Validation(vec![FieldError::new("date", "Invalid date")]))
        );
    }
}
