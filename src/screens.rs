//! Screen flows over the FitPass client
//!
//! Each mobile screen is a small state machine: `loading` until its fetches
//! settle, then `loaded` with a derived view-model. Read failures are
//! logged and degrade to empty defaults; write failures are returned for
//! the caller to surface. Screens that re-fetch on input changes guard
//! against stale responses with [`FetchGate`] generation tickets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use log::warn;
use tokio::time::sleep;

use crate::error::{Error, Result};
use crate::Fitpass;
use fitpass_rust_auth::{Profile, RegisterRequest, Session};
use fitpass_rust_bookings::{Booking, DateUpdate, NewBooking};
use fitpass_rust_catalog::{Gym, Plan, Review};
use fitpass_rust_views::{active_pass, partition_bookings, ActivePass, BookingBuckets};

/// Where a screen is in its load cycle. There is no error state: failed
/// reads settle at `Loaded` with defaults.
#[derive(Debug, Clone)]
pub enum ScreenState<T> {
    Loading,
    Loaded(T),
}

impl<T> ScreenState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ScreenState::Loading)
    }

    pub fn loaded(&self) -> Option<&T> {
        match self {
            ScreenState::Loaded(view) => Some(view),
            ScreenState::Loading => None,
        }
    }
}

/// Monotonic request-generation tickets. A fetch captures a ticket when it
/// starts; its response is applied only if no newer fetch has been issued
/// since, so a slow response for a previous input can never overwrite a
/// newer one.
#[derive(Debug, Default)]
pub struct FetchGate {
    latest: AtomicU64,
}

impl FetchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new fetch generation and returns its ticket.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `ticket` still belongs to the latest issued fetch.
    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

/// The secondary state of the auth screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStage {
    CredentialsForm,
    OtpPending { email: String },
    ResetRequest,
    ResetConfirm { email: String },
}

/// Login/registration/password-reset flow. Transitions happen only on call
/// completion or explicit navigation; failed calls leave the stage in place
/// and return the error for an inline banner.
pub struct AuthFlow {
    stage: AuthStage,
}

impl Default for AuthFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthFlow {
    pub fn new() -> Self {
        Self {
            stage: AuthStage::CredentialsForm,
        }
    }

    pub fn stage(&self) -> &AuthStage {
        &self.stage
    }

    /// Explicit navigation back to the credentials form.
    pub fn back_to_credentials(&mut self) {
        self.stage = AuthStage::CredentialsForm;
    }

    /// Explicit navigation into the password-reset flow.
    pub fn start_password_reset(&mut self) {
        self.stage = AuthStage::ResetRequest;
    }

    pub async fn submit_login(
        &mut self,
        client: &Fitpass,
        email: &str,
        password: &str,
    ) -> Result<Session> {
        Ok(client.auth().login(email, password).await?)
    }

    /// Registers and, on success, moves to the OTP-pending stage.
    pub async fn submit_registration(
        &mut self,
        client: &Fitpass,
        request: &RegisterRequest,
    ) -> Result<()> {
        client.auth().register(request).await?;
        self.stage = AuthStage::OtpPending {
            email: request.email.clone(),
        };
        Ok(())
    }

    /// Verifies the OTP for the pending registration; success logs the
    /// user in and returns the flow to the credentials form.
    pub async fn submit_otp(&mut self, client: &Fitpass, otp: &str) -> Result<Session> {
        let email = match &self.stage {
            AuthStage::OtpPending { email } => email.clone(),
            _ => return Err(Error::InvalidInput("no OTP verification pending".to_string())),
        };

        let session = client.auth().verify_otp(&email, otp).await?;
        self.stage = AuthStage::CredentialsForm;
        Ok(session)
    }

    pub async fn resend_otp(&mut self, client: &Fitpass) -> Result<()> {
        let email = match &self.stage {
            AuthStage::OtpPending { email } => email.clone(),
            _ => return Err(Error::InvalidInput("no OTP verification pending".to_string())),
        };
        client.auth().resend_otp(&email).await?;
        Ok(())
    }

    /// Requests a reset code and moves to the confirm stage.
    pub async fn request_reset(&mut self, client: &Fitpass, email: &str) -> Result<()> {
        if self.stage != AuthStage::ResetRequest {
            return Err(Error::InvalidInput("not in the reset flow".to_string()));
        }
        client.auth().forgot_password(email).await?;
        self.stage = AuthStage::ResetConfirm {
            email: email.to_string(),
        };
        Ok(())
    }

    /// Confirms the reset code and new password, returning to credentials.
    pub async fn confirm_reset(
        &mut self,
        client: &Fitpass,
        otp: &str,
        new_password: &str,
    ) -> Result<()> {
        let email = match &self.stage {
            AuthStage::ResetConfirm { email } => email.clone(),
            _ => return Err(Error::InvalidInput("no reset confirmation pending".to_string())),
        };
        client.auth().reset_password(&email, otp, new_password).await?;
        self.stage = AuthStage::CredentialsForm;
        Ok(())
    }
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    pub profile: Profile,
    pub buckets: BookingBuckets,
    pub active_pass: Option<ActivePass>,
}

/// Loads the dashboard: profile and bookings are fetched concurrently and
/// joined before the view is derived. Either fetch failing degrades that
/// half to an empty default.
pub async fn load_dashboard(client: &Fitpass) -> DashboardView {
    let (profile, bookings) = tokio::join!(
        client.auth().profile(),
        client.bookings().my_bookings()
    );

    let profile = profile.unwrap_or_else(|e| {
        warn!("dashboard profile fetch failed: {}", e);
        Profile::default()
    });
    let bookings: Vec<Booking> = bookings.unwrap_or_else(|e| {
        warn!("dashboard bookings fetch failed: {}", e);
        Vec::new()
    });

    let buckets = partition_bookings(bookings);
    let active_pass = active_pass(&buckets, Utc::now());

    DashboardView {
        profile,
        buckets,
        active_pass,
    }
}

/// Everything the gym detail screen renders.
#[derive(Debug, Clone, Default)]
pub struct GymDetailView {
    pub gym: Option<Gym>,
    pub plans: Vec<Plan>,
    pub reviews: Vec<Review>,
}

/// The gym detail screen. Switching gyms quickly issues overlapping
/// fetches; the gate makes sure only the newest selection's response is
/// applied.
pub struct GymDetailScreen {
    gate: FetchGate,
    state: Mutex<ScreenState<GymDetailView>>,
}

impl Default for GymDetailScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl GymDetailScreen {
    pub fn new() -> Self {
        Self {
            gate: FetchGate::new(),
            state: Mutex::new(ScreenState::Loading),
        }
    }

    pub fn state(&self) -> ScreenState<GymDetailView> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Writes `state` only while `ticket` is still the latest generation.
    /// The gate check happens under the state lock, so a selection that has
    /// been superseded can never clobber a newer selection's state, not
    /// even with its initial `Loading` write.
    fn set_state_if_current(&self, ticket: u64, state: ScreenState<GymDetailView>) -> bool {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !self.gate.is_current(ticket) {
            return false;
        }
        *guard = state;
        true
    }

    /// Loads a gym and its plans and reviews. Failed reads degrade to an
    /// empty view rather than an error state; a response that lost the race
    /// to a newer selection is dropped.
    pub async fn select_gym(&self, client: &Fitpass, gym_id: &str) {
        let ticket = self.gate.issue();
        self.set_state_if_current(ticket, ScreenState::Loading);

        let (gym, plans, reviews) = tokio::join!(
            client.catalog().gym(gym_id),
            client.catalog().plans_for_gym(gym_id),
            client.catalog().reviews_for_gym(gym_id),
        );

        let view = GymDetailView {
            gym: gym
                .map_err(|e| warn!("gym fetch failed: {}", e))
                .ok(),
            plans: plans.unwrap_or_else(|e| {
                warn!("plans fetch failed: {}", e);
                Vec::new()
            }),
            reviews: reviews.unwrap_or_else(|e| {
                warn!("reviews fetch failed: {}", e);
                Vec::new()
            }),
        };
        if !self.set_state_if_current(ticket, ScreenState::Loaded(view)) {
            warn!("dropping stale gym detail response for {}", gym_id);
        }
    }
}

/// Runs the simulated payment step, then books through the direct-creation
/// endpoint. There is no real gateway; the delay stands in for one.
pub async fn pay_and_book(
    client: &Fitpass,
    booking: &NewBooking,
    processing_delay: Duration,
) -> Result<Booking> {
    sleep(processing_delay).await;
    Ok(client.bookings().create_direct(booking).await?)
}

/// Cancels a booking, then reloads and re-partitions the whole list. No
/// optimistic update: the returned buckets are what the backend now holds.
pub async fn cancel_and_reload(
    client: &Fitpass,
    booking_id: &str,
    reason: &str,
) -> Result<BookingBuckets> {
    client.bookings().cancel(booking_id, reason).await?;
    let bookings = client.bookings().my_bookings().await?;
    Ok(partition_bookings(bookings))
}

/// Moves a booking to new dates, then reloads the list.
pub async fn reschedule_and_reload(
    client: &Fitpass,
    booking_id: &str,
    update: &DateUpdate,
) -> Result<BookingBuckets> {
    client.bookings().update_date(booking_id, update).await?;
    let bookings = client.bookings().my_bookings().await?;
    Ok(partition_bookings(bookings))
}
