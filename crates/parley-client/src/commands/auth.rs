use serde::Serialize;
use tracing::info;

use parley_shared::constants::{DEMO_OTP, OTP_LENGTH, PHONE_MAX_LEN, PHONE_MIN_LEN};
use parley_shared::types::AuthPhase;
use parley_store::User;

use crate::error::{ClientError, Result};
use crate::events::{ClientEvent, SessionPayload};
use crate::state::{lock, AppState, SharedState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub phone_number: String,
    pub country_code: String,
    pub created_at: String,
}

impl From<&User> for UserDto {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.to_string(),
            phone_number: u.phone_number.clone(),
            country_code: u.country_code.clone(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub phase: AuthPhase,
    pub user: Option<UserDto>,
    pub pending_phone: String,
    pub pending_country_code: String,
}

impl From<&AppState> for SessionDto {
    fn from(state: &AppState) -> Self {
        let session = &state.session;
        Self {
            phase: session.phase(),
            user: session.user.as_ref().map(UserDto::from),
            pending_phone: session.pending_phone.clone(),
            pending_country_code: session.pending_country_code.clone(),
        }
    }
}

fn session_changed(state: &AppState) {
    state.persist_session();
    state.events.emit(ClientEvent::SessionChanged(SessionPayload {
        phase: state.session.phase(),
    }));
}

fn validate_phone(phone: &str, country_code: &str) -> Result<()> {
    let len = phone.chars().count();
    if len < PHONE_MIN_LEN {
        return Err(ClientError::Validation(format!(
            "Phone number must be at least {PHONE_MIN_LEN} digits"
        )));
    }
    if len > PHONE_MAX_LEN {
        return Err(ClientError::Validation("Phone number is too long".into()));
    }
    if country_code.is_empty() {
        return Err(ClientError::Validation("Please select a country".into()));
    }
    Ok(())
}

pub fn session_info(state: &SharedState) -> Result<SessionDto> {
    let guard = lock(state)?;
    Ok(SessionDto::from(&*guard))
}

/// Record the phone number and "send" a code after the delivery delay.
pub async fn request_otp(
    state: &SharedState,
    phone: String,
    country_code: String,
) -> Result<SessionDto> {
    let phone = phone.trim().to_string();
    let country_code = country_code.trim().to_string();
    validate_phone(&phone, &country_code)?;

    let delay = {
        let mut guard = lock(state)?;
        guard.session.set_pending_auth(&phone, &country_code);
        guard.persist_session();
        guard.config.otp_send_delay
    };

    tokio::time::sleep(delay).await;

    let mut guard = lock(state)?;
    guard.session.set_otp_sent(true);
    session_changed(&guard);

    info!(country = %country_code, "OTP sent (use {DEMO_OTP})");
    Ok(SessionDto::from(&*guard))
}

/// Check `code` against the demo OTP and sign in on a match.
///
/// A wrong code leaves the session waiting for another attempt.
pub async fn verify_otp(state: &SharedState, code: String) -> Result<UserDto> {
    let code = code.trim().to_string();

    let delay = {
        let guard = lock(state)?;
        if guard.session.phase() != AuthPhase::OtpPending {
            return Err(ClientError::OtpNotRequested);
        }
        guard.config.otp_verify_delay
    };

    if code.chars().count() != OTP_LENGTH {
        return Err(ClientError::Validation(format!(
            "OTP must be {OTP_LENGTH} digits"
        )));
    }

    tokio::time::sleep(delay).await;

    if code != DEMO_OTP {
        info!("OTP rejected");
        return Err(ClientError::InvalidOtp);
    }

    let mut guard = lock(state)?;
    let user = User::new(
        guard.session.pending_phone.clone(),
        guard.session.pending_country_code.clone(),
    );
    let dto = UserDto::from(&user);
    guard.session.login(user);
    session_changed(&guard);

    info!(user = %dto.id, "Signed in");
    Ok(dto)
}

/// Leave the code entry step without signing in.
pub fn cancel_otp(state: &SharedState) -> Result<SessionDto> {
    let mut guard = lock(state)?;
    guard.session.set_otp_sent(false);
    session_changed(&guard);
    Ok(SessionDto::from(&*guard))
}

pub fn logout(state: &SharedState) -> Result<SessionDto> {
    let mut guard = lock(state)?;
    guard.session.logout();
    guard.session.clear_pending_auth();
    session_changed(&guard);

    info!("Signed out");
    Ok(SessionDto::from(&*guard))
}

/// Reject the action unless someone is signed in.
pub(crate) fn require_auth(state: &AppState) -> Result<()> {
    if state.session.phase() == AuthPhase::Authenticated {
        Ok(())
    } else {
        Err(ClientError::NotAuthenticated)
    }
}
