use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Phone number validated in E.164 format (e.g., "+447911123456").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone(String);

impl Phone {
    pub fn new(number: &str) -> Result<Self, DomainError> {
        if !Self::is_valid_e164(number) {
            return Err(DomainError::InvalidPhoneFormat);
        }
        Ok(Self(number.to_string()))
    }

    fn is_valid_e164(number: &str) -> bool {
        let bytes = number.as_bytes();
        if bytes.len() < 8 || bytes.len() > 16 {
            return false;
        }
        if bytes[0] != b'+' {
            return false;
        }
        bytes[1..].iter().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Delivery address for physical letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub postcode: String,
    pub country: String,
}

impl PostalAddress {
    pub fn uk(line1: impl Into<String>, city: impl Into<String>, postcode: impl Into<String>) -> Self {
        Self {
            line1: line1.into(),
            line2: None,
            city: city.into(),
            postcode: postcode.into(),
            country: "United Kingdom".into(),
        }
    }
}

/// Who a collections reminder is addressed to. Phone and postal address are
/// optional; channels that need them are skipped when they are missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContact {
    pub name: String,
    pub email: String,
    pub phone: Option<Phone>,
    pub address: Option<PostalAddress>,
}

impl ClientContact {
    pub fn email_only(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: None,
            address: None,
        }
    }
}
