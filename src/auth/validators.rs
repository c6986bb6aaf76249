// src/auth/validators.rs
//
// Shape checks on request bodies. Business rules (password strength, email
// syntax, uniqueness) live in the services so every caller gets them.

use super::models::*;
use crate::common::{ValidationResult, Validator};

fn require(result: &mut ValidationResult, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        result.add_error(field, message);
    }
}

pub struct RegisterValidator;

impl Validator<RegisterRequest> for RegisterValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(&mut result, "email", &data.email, "Email is required");
        require(&mut result, "password", &data.password, "Password is required");

        if let Some(name) = &data.name {
            if name.chars().count() > 255 {
                result.add_error("name", "Name must be less than 255 characters");
            }
        }

        result
    }
}

pub struct LoginValidator;

impl Validator<LoginRequest> for LoginValidator {
    fn validate(&self, data: &LoginRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(&mut result, "email", &data.email, "Email is required");
        require(&mut result, "password", &data.password, "Password is required");
        result
    }
}

pub struct PasswordResetValidator;

impl Validator<ForgotPasswordRequest> for PasswordResetValidator {
    fn validate(&self, data: &ForgotPasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(&mut result, "email", &data.email, "Email is required");
        result
    }
}

impl Validator<ResetPasswordRequest> for PasswordResetValidator {
    fn validate(&self, data: &ResetPasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(&mut result, "token", &data.token, "Token is required");
        require(
            &mut result,
            "new_password",
            &data.new_password,
            "New password is required",
        );
        result
    }
}

pub struct AccountValidator;

impl Validator<UpdatePasswordRequest> for AccountValidator {
    fn validate(&self, data: &UpdatePasswordRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(
            &mut result,
            "old_password",
            &data.old_password,
            "Current password is required",
        );
        require(
            &mut result,
            "new_password",
            &data.new_password,
            "New password is required",
        );
        result
    }
}

impl Validator<UpdateEmailRequest> for AccountValidator {
    fn validate(&self, data: &UpdateEmailRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        require(&mut result, "email", &data.email, "Email is required");
        result
    }
}
