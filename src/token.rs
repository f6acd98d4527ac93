//! Gate that confirms an access token is usable before a run starts.

use std::sync::Arc;

use crate::contract::ActivityProvider;
use crate::error::{ProviderError, TokenError};
use crate::logger::SyncLogger;
use crate::model::UserContext;

/// Status reported when a failure carried no HTTP status.
pub const DEFAULT_TRANSIENT_STATUS: u16 = 500;

pub struct TokenValidator {
    provider: Arc<dyn ActivityProvider>,
    logger: Arc<dyn SyncLogger>,
}

impl TokenValidator {
    pub fn new(provider: Arc<dyn ActivityProvider>, logger: Arc<dyn SyncLogger>) -> Self {
        Self { provider, logger }
    }

    pub async fn validate(&self, user: &UserContext) -> Result<(), TokenError> {
        match self.provider.check_token(&user.access_token).await {
            Ok(()) => {
                self.logger.debug(&user.github_username, "access token is valid");
                Ok(())
            }
            Err(e) => {
                let err = classify(&e);
                self.logger.error(
                    &user.github_username,
                    &format!("token check failed: {e} ({err})"),
                );
                Err(err)
            }
        }
    }
}

/// 401 means the token is bad; every other failure is transient.
pub fn classify(error: &ProviderError) -> TokenError {
    match error.status() {
        Some(401) => TokenError::TokenInvalid,
        Some(status) => TokenError::TransientError { status },
        None => TokenError::TransientError {
            status: DEFAULT_TRANSIENT_STATUS,
        },
    }
}
