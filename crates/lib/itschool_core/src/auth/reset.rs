//! Password reset: reset-token issuance and one-time consumption.

use std::sync::Arc;

use chrono::Duration;
use tracing::{error, info};

use super::service::validate_new_password;
use super::{AuthContext, AuthError};
use crate::email::EmailSender;

/// Reset token lifetime: 30 minutes.
pub const RESET_TOKEN_EXPIRY_MINS: i64 = 30;

/// Subject line of the reset email.
pub const RESET_EMAIL_SUBJECT: &str = "Password Reset";

/// Request a reset token by email, then trade it for a new password.
#[derive(Clone)]
pub struct PasswordResetService {
    ctx: AuthContext,
    mailer: Arc<dyn EmailSender>,
}

impl PasswordResetService {
    pub fn new(ctx: AuthContext, mailer: Arc<dyn EmailSender>) -> Self {
        Self { ctx, mailer }
    }

    /// Issue a reset token for `email` and mail it.
    ///
    /// Returns `Ok(())` for unknown emails too, without storing or sending
    /// anything. A dispatch failure is reported even though the token is
    /// already stored; the caller has to request a fresh one.
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.ctx.users.find_user_by_email(email).await? else {
            info!("password reset requested for unknown email");
            return Ok(());
        };

        let token = self.ctx.issuer.issue_reset_token()?;
        let expires_at = self.ctx.clock.now() + Duration::minutes(RESET_TOKEN_EXPIRY_MINS);
        self.ctx
            .users
            .set_reset_token(user.id, &token, expires_at)
            .await?;

        self.mailer
            .send(
                &user.email,
                RESET_EMAIL_SUBJECT,
                &format!("Your reset token: {token}"),
            )
            .await
            .map_err(|e| AuthError::EmailDispatch(e.to_string()))?;

        info!(user_id = %user.id, "password reset token sent");
        Ok(())
    }

    /// Consume a reset token and set a new password.
    ///
    /// The password write nulls the token. The explicit clear afterwards is
    /// best-effort: if it fails the password change stands and the failure
    /// is only logged.
    pub async fn set_new_password(
        &self,
        reset_token: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_new_password(new_password)?;

        let user = self
            .ctx
            .users
            .find_user_by_reset_token(reset_token)
            .await?
            .ok_or(AuthError::ResetTokenUnknown)?;

        let now = self.ctx.clock.now();
        match user.reset_token_expires_at {
            Some(expires_at) if now <= expires_at => {}
            _ => {
                info!(user_id = %user.id, "expired reset token presented");
                return Err(AuthError::ResetTokenExpired);
            }
        }

        let hash = self.ctx.hasher.hash(new_password)?;
        self.ctx.users.update_password(user.id, &hash).await?;

        if let Err(e) = self.ctx.users.clear_reset_token(user.id).await {
            error!(user_id = %user.id, error = %e, "failed to clear reset token after password update");
        }

        info!(user_id = %user.id, "password reset completed");
        Ok(())
    }
}
