use std::{fmt, future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{
    domain::{AttemptId, DonationStatus, Network, TransactionId, DEFAULT_AMOUNT, QUICK_AMOUNTS},
    protocol::{
        PayRequest, PayResponse, PaymentStatusRequest, PaymentStatusResponse, RemotePaymentStatus,
    },
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

pub mod amount;
pub mod effects;
pub mod http_client;
pub mod view;

pub use amount::{
    is_acceptable_amount_input, is_submittable_amount, parse_positive_amount, ValidationError,
};
pub use effects::{
    CelebrationEffects, ConfettiBurst, NoopCelebration, PlaybackHandle, CELEBRATION_VOLUME,
};
pub use http_client::{GatewayError, HttpPaymentClient};
pub use view::{Banner, DonationView};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The two operations consumed from the external payment service.
#[async_trait]
pub trait PaymentCollaborator: Send + Sync {
    async fn pay(&self, request: PayRequest) -> Result<PayResponse>;
    async fn payment_status(&self, request: PaymentStatusRequest) -> Result<PaymentStatusResponse>;
}

pub struct MissingPaymentCollaborator;

#[async_trait]
impl PaymentCollaborator for MissingPaymentCollaborator {
    async fn pay(&self, _request: PayRequest) -> Result<PayResponse> {
        Err(anyhow!("payment collaborator is unavailable"))
    }

    async fn payment_status(&self, request: PaymentStatusRequest) -> Result<PaymentStatusResponse> {
        Err(anyhow!(
            "payment collaborator is unavailable for transaction {}",
            request.id
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStage {
    Initiation,
    StatusQuery,
}

impl PaymentStage {
    fn failure(self, message: String) -> PaymentFailure {
        match self {
            Self::Initiation => PaymentFailure::Initiation(message),
            Self::StatusQuery => PaymentFailure::StatusQuery(message),
        }
    }
}

impl fmt::Display for PaymentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initiation => f.write_str("payment initiation"),
            Self::StatusQuery => f.write_str("payment status query"),
        }
    }
}

/// Why an attempt ended in [`DonationStatus::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentFailure {
    #[error("payment initiation failed: {0}")]
    Initiation(String),
    #[error("payment response did not include a transaction identifier")]
    MissingTransactionId,
    #[error("payment status query failed: {0}")]
    StatusQuery(String),
    #[error("payment reported status '{0}'")]
    NotCompleted(RemotePaymentStatus),
    #[error("{0} timed out after {1:?}")]
    TimedOut(PaymentStage, Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("invalid amount: {0}")]
    Validation(#[from] ValidationError),
    #[error("a donation is already being processed")]
    AttemptInFlight,
    #[error("previous donation {0}; reset before donating again")]
    ResetRequired(DonationStatus),
}

/// Re-query policy for statuses that are still in progress.
///
/// One attempt means a single status check, where anything other than
/// `completed` fails the donation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPolling {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for StatusPolling {
    fn default() -> Self {
        Self {
            attempts: 1,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// Upper bound on each collaborator call; `None` waits forever.
    pub call_timeout: Option<Duration>,
    pub status_polling: StatusPolling,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
            status_polling: StatusPolling::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DonationSnapshot {
    pub amount: String,
    pub network: Network,
    pub status: DonationStatus,
    pub transaction_id: Option<TransactionId>,
    pub attempt_id: Option<AttemptId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<PaymentFailure>,
}

#[derive(Debug, Clone)]
pub enum DonationEvent {
    StateChanged(DonationSnapshot),
    ValidationFailed(ValidationError),
    CelebrationStarted { attempt_id: Option<AttemptId> },
}

/// Owns the donation form state and drives one attempt at a time.
pub struct DonationController {
    payments: Arc<dyn PaymentCollaborator>,
    effects: Arc<dyn CelebrationEffects>,
    options: ControllerOptions,
    state: DonationSnapshot,
    celebrated: bool,
    playback: Option<Box<dyn PlaybackHandle>>,
    events: broadcast::Sender<DonationEvent>,
}

impl DonationController {
    pub fn new(payments: Arc<dyn PaymentCollaborator>) -> Self {
        Self::new_with_dependencies(
            payments,
            Arc::new(NoopCelebration),
            ControllerOptions::default(),
        )
    }

    pub fn new_with_dependencies(
        payments: Arc<dyn PaymentCollaborator>,
        effects: Arc<dyn CelebrationEffects>,
        options: ControllerOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            payments,
            effects,
            options,
            state: DonationSnapshot {
                amount: DEFAULT_AMOUNT.to_string(),
                ..DonationSnapshot::default()
            },
            celebrated: false,
            playback: None,
            events,
        }
    }

    pub fn snapshot(&self) -> DonationSnapshot {
        self.state.clone()
    }

    pub fn status(&self) -> DonationStatus {
        self.state.status
    }

    pub fn amount(&self) -> &str {
        &self.state.amount
    }

    pub fn network(&self) -> Network {
        self.state.network
    }

    pub fn transaction_id(&self) -> Option<&TransactionId> {
        self.state.transaction_id.as_ref()
    }

    pub fn view(&self) -> DonationView {
        DonationView::from_snapshot(&self.state)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DonationEvent> {
        self.events.subscribe()
    }

    /// Returns `false` and keeps the previous amount when `raw` is not a
    /// well-formed amount with at most two fractional digits.
    pub fn set_amount(&mut self, raw: &str) -> bool {
        if !is_acceptable_amount_input(raw) {
            debug!(input = raw, "donation: ignoring malformed amount input");
            return false;
        }
        self.state.amount = raw.to_string();
        self.publish_state();
        true
    }

    pub fn select_preset(&mut self, preset: &str) -> bool {
        if !QUICK_AMOUNTS.contains(&preset) {
            debug!(preset, "donation: ignoring unknown quick amount");
            return false;
        }
        self.set_amount(preset)
    }

    pub fn set_network(&mut self, testnet: bool) {
        let network = Network::from_testnet_flag(testnet);
        if self.state.status == DonationStatus::Processing {
            warn!(%network, "donation: network change ignored while processing");
            return;
        }
        self.state.network = network;
        self.publish_state();
    }

    /// True exactly when [`submit`](Self::submit) would start an attempt.
    pub fn can_submit(&self) -> bool {
        submit_ready(&self.state)
    }

    /// Whether the clip started by the last celebration is still audible.
    pub fn is_clip_playing(&mut self) -> bool {
        self.playback
            .as_mut()
            .is_some_and(|playback| playback.is_playing())
    }

    /// Runs one donation attempt to a terminal status.
    ///
    /// Payment failures are not errors here: they end the attempt in
    /// [`DonationStatus::Failed`] with the cause kept in the snapshot. `Err` is
    /// returned only when the attempt could not start.
    pub async fn submit(&mut self) -> Result<DonationSnapshot, SubmitError> {
        match self.state.status {
            DonationStatus::Processing => return Err(SubmitError::AttemptInFlight),
            status if status.is_terminal() => return Err(SubmitError::ResetRequired(status)),
            _ => {}
        }

        if let Err(err) = parse_positive_amount(&self.state.amount) {
            warn!(amount = %self.state.amount, "donation: rejected before submit: {err}");
            self.publish(DonationEvent::ValidationFailed(err));
            return Err(err.into());
        }

        let attempt_id = AttemptId::new();
        let amount = self.state.amount.clone();
        let network = self.state.network;

        self.state.status = DonationStatus::Processing;
        self.state.attempt_id = Some(attempt_id);
        self.state.transaction_id = None;
        self.state.failure = None;
        self.state.submitted_at = Some(Utc::now());
        self.state.finished_at = None;
        self.publish_state();
        info!(%attempt_id, %network, %amount, "donation: submitted");

        match self.run_payment(attempt_id, amount, network).await {
            Ok(()) => {
                info!(
                    %attempt_id,
                    transaction_id = ?self.state.transaction_id,
                    "donation: completed"
                );
                self.finish(DonationStatus::Completed, None);
            }
            Err(failure) => {
                warn!(
                    %attempt_id,
                    transaction_id = ?self.state.transaction_id,
                    "donation: failed: {failure}"
                );
                self.finish(DonationStatus::Failed, Some(failure));
            }
        }

        self.sync_effects();
        Ok(self.snapshot())
    }

    /// Resets a failed attempt and submits again.
    pub async fn retry(&mut self) -> Result<DonationSnapshot, SubmitError> {
        if self.state.status == DonationStatus::Failed {
            self.reset();
        }
        self.submit().await
    }

    pub fn reset(&mut self) {
        if let Some(mut playback) = self.playback.take() {
            playback.stop();
        }

        if let Some(attempt_id) = self.state.attempt_id {
            debug!(%attempt_id, status = %self.state.status, "donation: attempt discarded");
        }
        self.state.status = DonationStatus::Idle;
        self.state.transaction_id = None;
        self.state.attempt_id = None;
        self.state.submitted_at = None;
        self.state.finished_at = None;
        self.state.failure = None;
        self.celebrated = false;
        self.publish_state();
    }

    /// Fires the completion celebration if it has not fired for this attempt.
    ///
    /// Safe to call on every redraw.
    pub fn sync_effects(&mut self) {
        if self.state.status != DonationStatus::Completed || self.celebrated {
            return;
        }
        self.celebrated = true;

        if let Some(mut previous) = self.playback.take() {
            previous.stop();
        }
        match self.effects.play_clip(CELEBRATION_VOLUME) {
            Ok(playback) => self.playback = Some(playback),
            Err(err) => warn!("celebration: clip playback failed: {err:#}"),
        }
        if let Err(err) = self.effects.launch_confetti(ConfettiBurst::default()) {
            warn!("celebration: confetti launch failed: {err:#}");
        }

        self.publish(DonationEvent::CelebrationStarted {
            attempt_id: self.state.attempt_id,
        });
    }

    async fn run_payment(
        &mut self,
        attempt_id: AttemptId,
        amount: String,
        network: Network,
    ) -> Result<(), PaymentFailure> {
        let payments = Arc::clone(&self.payments);
        let timeout = self.options.call_timeout;

        let response = bounded(
            timeout,
            PaymentStage::Initiation,
            payments.pay(PayRequest::to_recipient(amount, network)),
        )
        .await?;
        let transaction_id = response
            .transaction_id()
            .ok_or(PaymentFailure::MissingTransactionId)?;

        self.state.transaction_id = Some(transaction_id.clone());
        self.publish_state();
        info!(%attempt_id, %transaction_id, "donation: payment initiated");

        let polling = self.options.status_polling;
        let attempts = polling.attempts.max(1);
        let mut poll = 1;
        loop {
            let request = PaymentStatusRequest {
                id: transaction_id.clone(),
                testnet: network.is_testnet(),
            };
            let status = bounded(
                timeout,
                PaymentStage::StatusQuery,
                payments.payment_status(request),
            )
            .await?
            .status;
            debug!(%attempt_id, %transaction_id, %status, poll, "donation: payment status");

            if status.is_completed() {
                return Ok(());
            }
            if !status.is_in_progress() || poll >= attempts {
                return Err(PaymentFailure::NotCompleted(status));
            }
            poll += 1;
            tokio::time::sleep(polling.interval).await;
        }
    }

    fn finish(&mut self, status: DonationStatus, failure: Option<PaymentFailure>) {
        self.state.status = status;
        self.state.failure = failure;
        self.state.finished_at = Some(Utc::now());
        self.publish_state();
    }

    fn publish_state(&self) {
        self.publish(DonationEvent::StateChanged(self.state.clone()));
    }

    fn publish(&self, event: DonationEvent) {
        // No subscribers is the common case outside of a UI.
        let _ = self.events.send(event);
    }
}

pub(crate) fn submit_ready(state: &DonationSnapshot) -> bool {
    state.status == DonationStatus::Idle && is_submittable_amount(&state.amount)
}

async fn bounded<T>(
    timeout: Option<Duration>,
    stage: PaymentStage,
    call: impl Future<Output = Result<T>>,
) -> Result<T, PaymentFailure> {
    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| PaymentFailure::TimedOut(stage, limit))?,
        None => call.await,
    };
    outcome.map_err(|err| stage.failure(format!("{err:#}")))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
