// src/notifications/templates.rs
use serde::{Deserialize, Serialize};

pub const FORGOT_PASSWORD_SUBJECT: &str = "Forgot Password";
pub const FORGOT_PASSWORD_TEMPLATE: &str = "forgot-password";

/// Parameters stored alongside the rendered body so the mailer can re-render
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgotPasswordParams {
    pub reset_password_token: String,
    pub reset_link: String,
}

impl ForgotPasswordParams {
    /// `link_template` carries a `{token}` placeholder.
    pub fn new(token: &str, link_template: &str) -> Self {
        Self {
            reset_password_token: token.to_string(),
            reset_link: link_template.replace("{token}", &urlencoding::encode(token)),
        }
    }
}

pub fn generate_forgot_password_email(params: &ForgotPasswordParams) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #4F46E5; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; background-color: #f9f9f9; }}
        .footer {{ padding: 20px; text-align: center; font-size: 12px; color: #666; }}
        .button {{ display: inline-block; padding: 12px 24px; background-color: #4F46E5; color: white; text-decoration: none; border-radius: 5px; margin: 10px 0; }}
        .code {{ font-family: monospace; background-color: #eee; padding: 2px 6px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>Reset Your Password</h1>
        </div>
        <div class="content">
            <p>We received a request to reset the password for your account.</p>

            <p><a href="{}" class="button">Choose a new password</a></p>

            <p>If the button does not work, use this reset code: <span class="code">{}</span></p>

            <p>If you did not ask for a password reset, you can ignore this email. Your password will not change.</p>
        </div>
        <div class="footer">
            <p>This is an automated message. Please do not reply directly to this email.</p>
        </div>
    </div>
</body>
</html>"#,
        params.reset_link, params.reset_password_token
    )
}
