//! Client-side form constraints, checked before any mutation hits the wire.

use std::fmt;

use crate::types::{CreateRequest, UpdateRequest};

pub const NAME_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub reason: String,
}

/// Every constraint violated by one request, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, field: &'static str, reason: &str) {
        self.0.push(FieldError {
            field,
            reason: reason.to_string(),
        });
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", error.reason)?;
        }
        Ok(())
    }
}

fn check_name(errors: &mut ValidationErrors, name: &str) {
    if name.trim().is_empty() {
        errors.push("name", "Name is required");
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.push("name", "Name is too long");
    }
}

fn check_description(errors: &mut ValidationErrors, description: &str) {
    if description.trim().is_empty() {
        errors.push("description", "Description is required");
    } else if description.chars().count() > DESCRIPTION_MAX_CHARS {
        errors.push("description", "Description is too long");
    }
}

fn check_price(errors: &mut ValidationErrors, price: f64) {
    if !price.is_finite() || price <= 0.0 {
        errors.push("price", "Price must be greater than 0");
    }
}

impl CreateRequest {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, &self.description);
        check_price(&mut errors, self.price);
        errors.into_result()
    }
}

impl UpdateRequest {
    /// Same constraints as creation, applied only to the fields present.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(description) = &self.description {
            check_description(&mut errors, description);
        }
        if let Some(price) = self.price {
            check_price(&mut errors, price);
        }
        errors.into_result()
    }
}
