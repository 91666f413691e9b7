//! Authentication session state.
//!
//! Plain setters with no validation; the auth commands decide when to call
//! them.  The whole struct is persisted to the `auth-storage` slot.

use serde::{Deserialize, Serialize};

use parley_shared::types::AuthPhase;
use parley_store::User;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub pending_phone: String,
    pub pending_country_code: String,
    pub is_otp_sent: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn login(&mut self, user: User) {
        self.user = Some(user);
        self.is_authenticated = true;
    }

    pub fn logout(&mut self) {
        self.user = None;
        self.is_authenticated = false;
    }

    pub fn set_pending_auth(&mut self, phone: impl Into<String>, country_code: impl Into<String>) {
        self.pending_phone = phone.into();
        self.pending_country_code = country_code.into();
    }

    pub fn set_otp_sent(&mut self, sent: bool) {
        self.is_otp_sent = sent;
    }

    pub fn clear_pending_auth(&mut self) {
        self.pending_phone.clear();
        self.pending_country_code.clear();
        self.is_otp_sent = false;
    }

    pub fn phase(&self) -> AuthPhase {
        if self.is_authenticated {
            AuthPhase::Authenticated
        } else if self.is_otp_sent {
            AuthPhase::OtpPending
        } else {
            AuthPhase::Unauthenticated
        }
    }
}
