//! Session orchestrator
//!
//! Drives one authentication/signing order from initiation to a terminal
//! outcome. Supervises three tasks per session - the collect-polling
//! loop, the QR refresh loop, and the overall deadline timer - and
//! guarantees exactly-once terminal transitions no matter which of them
//! resolves the race.
//!
//! Callers never block while a session is outstanding: state is observed
//! through [`SessionOrchestrator::snapshot`] or a watch subscription.

use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use idport_domain::{
    CollectResponse, CollectStatus, Identification, InitiateRequest, InitiatedOrder, OrderKind,
    RpError, SessionConfig, SessionError, SessionFault, SessionResult, SessionStatus,
};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::qr;
use crate::secrets::SessionSecretStore;
use crate::session::completion;
use crate::session::ports::{QrImageEncoder, RelyingPartyGateway};
use crate::session::state::SessionSnapshot;

/// Deadline for joining session tasks during shutdown
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Options for starting a session
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub kind: OrderKind,
    /// End-user IP forwarded to the provider; must be non-empty
    pub end_user_ip: String,
    /// Text shown in the provider app while signing (`Sign` only)
    pub visible_data: Option<String>,
}

impl StartOptions {
    pub fn auth(end_user_ip: impl Into<String>) -> Self {
        Self { kind: OrderKind::Auth, end_user_ip: end_user_ip.into(), visible_data: None }
    }

    pub fn sign(end_user_ip: impl Into<String>, visible_data: impl Into<String>) -> Self {
        Self {
            kind: OrderKind::Sign,
            end_user_ip: end_user_ip.into(),
            visible_data: Some(visible_data.into()),
        }
    }
}

/// Terminal outcome applied exactly once per session
enum Outcome {
    Complete(Identification),
    Failed { hint_code: Option<String> },
    TimedOut,
    Fault(SessionFault),
}

/// Type alias for task handles guarded for restart
type TaskHandles = Arc<Mutex<Vec<JoinHandle<()>>>>;

/// Everything a session task needs, cloneable per task
#[derive(Clone)]
struct SessionContext {
    gateway: Arc<dyn RelyingPartyGateway>,
    encoder: Option<Arc<dyn QrImageEncoder>>,
    secrets: Arc<SessionSecretStore>,
    config: SessionConfig,
    state: Arc<watch::Sender<SessionSnapshot>>,
    cancel: CancellationToken,
    tasks: TaskHandles,
}

/// Session orchestrator state machine
///
/// `Idle -> Initiating -> Outstanding -> {Complete | Failed | TimedOut |
/// Error}`. Terminal states are sticky until `start()` or `reset()`;
/// both fully re-initialize local state and clear the secret store
/// before anything new begins.
pub struct SessionOrchestrator {
    gateway: Arc<dyn RelyingPartyGateway>,
    encoder: Option<Arc<dyn QrImageEncoder>>,
    secrets: Arc<SessionSecretStore>,
    config: SessionConfig,
    state: Arc<watch::Sender<SessionSnapshot>>,
    cancel: StdMutex<CancellationToken>,
    tasks: TaskHandles,
    // Serializes start()/reset() so two callers cannot race a supersede
    lifecycle: Mutex<()>,
}

impl SessionOrchestrator {
    /// Create a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `gateway` - Relying-party gateway implementation
    /// * `config` - Session cadence and retry budget
    pub fn new(gateway: Arc<dyn RelyingPartyGateway>, config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::default());

        Self {
            gateway,
            encoder: None,
            secrets: Arc::new(SessionSecretStore::new()),
            config,
            state: Arc::new(state),
            cancel: StdMutex::new(CancellationToken::new()),
            tasks: Arc::new(Mutex::new(Vec::new())),
            lifecycle: Mutex::new(()),
        }
    }

    /// Install an external QR image encoder
    ///
    /// Without one the snapshot carries only the raw rotating-code
    /// payload.
    pub fn with_qr_encoder(mut self, encoder: Arc<dyn QrImageEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Shared handle to the session secret store
    pub fn secret_store(&self) -> Arc<SessionSecretStore> {
        Arc::clone(&self.secrets)
    }

    /// Current state, cloned
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Begin a new session, superseding any live one
    ///
    /// Returns as soon as the session driver is spawned; initiation and
    /// polling happen in the background. The previous session's loops are
    /// stopped and its secret deleted before the new order may register
    /// one, so there is no window where two secrets are valid.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidInput` when `end_user_ip` is empty,
    /// or `SessionError::JoinTimeout` when a previous session's tasks do
    /// not stop in time.
    #[instrument(skip(self, options), fields(kind = ?options.kind))]
    pub async fn start(&self, options: StartOptions) -> SessionResult<()> {
        if options.end_user_ip.trim().is_empty() {
            return Err(SessionError::InvalidInput(
                "end_user_ip must be a non-empty string".to_string(),
            ));
        }

        let _guard = self.lifecycle.lock().await;
        self.shutdown_current().await?;

        info!("Starting identification session");
        self.state.send_replace(SessionSnapshot {
            status: SessionStatus::Initiating,
            ..SessionSnapshot::default()
        });

        let cancel = CancellationToken::new();
        *self.cancel_slot() = cancel.clone();

        let ctx = SessionContext {
            gateway: Arc::clone(&self.gateway),
            encoder: self.encoder.clone(),
            secrets: Arc::clone(&self.secrets),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            cancel,
            tasks: Arc::clone(&self.tasks),
        };

        let driver = tokio::spawn(run_session(ctx, options));
        self.tasks.lock().await.push(driver);

        Ok(())
    }

    /// Force return to `Idle`, clearing the secret store
    ///
    /// # Errors
    ///
    /// Returns `SessionError::JoinTimeout` when session tasks do not stop
    /// in time.
    #[instrument(skip(self))]
    pub async fn reset(&self) -> SessionResult<()> {
        let _guard = self.lifecycle.lock().await;
        self.shutdown_current().await?;
        self.state.send_replace(SessionSnapshot::default());
        debug!("Session reset to idle");
        Ok(())
    }

    /// Cancel the live session's tasks, join them, and wipe secrets
    async fn shutdown_current(&self) -> SessionResult<()> {
        self.cancel_slot().cancel();

        // Drain under the lock, join outside it: the driver task pushes
        // its loop handles into the same vec and must not deadlock here.
        let drained: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock().await;
            tasks.drain(..).collect()
        };

        for handle in drained {
            if handle.is_finished() {
                continue;
            }
            match tokio::time::timeout(JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => warn!(error = %join_err, "Session task ended abnormally"),
                Err(_) => {
                    return Err(SessionError::JoinTimeout { seconds: JOIN_TIMEOUT.as_secs() })
                }
            }
        }

        // Stale secrets must not answer refresh requests for an ended
        // session.
        self.secrets.clear();
        Ok(())
    }

    fn cancel_slot(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ensure session tasks stop when the orchestrator is dropped
impl Drop for SessionOrchestrator {
    fn drop(&mut self) {
        let token = self.cancel_slot();
        if !token.is_cancelled() {
            warn!("SessionOrchestrator dropped with a live session; cancelling");
            token.cancel();
        }
    }
}

enum InitiateError {
    Superseded,
    Fault(SessionFault),
}

/// Session driver: initiate with retry, then hand off to the loops
async fn run_session(ctx: SessionContext, options: StartOptions) {
    let order = match initiate_with_retry(&ctx, &options).await {
        Ok(order) => order,
        Err(InitiateError::Superseded) => {
            debug!("Session superseded during initiation");
            return;
        }
        Err(InitiateError::Fault(fault)) => {
            error!(error = %fault, "Session initiation failed");
            finish(&ctx, Outcome::Fault(fault));
            return;
        }
    };

    // Register the secret: delete-then-put, so no two tokens are ever
    // live at once.
    ctx.secrets.clear();
    ctx.secrets.put(order.qr_start_token.clone(), order.qr_start_secret.clone());

    let started_at = Utc::now();
    let started_instant = Instant::now();
    let deadline = started_instant + ctx.config.session_timeout();

    // The first code ships with the initiation response (elapsed 0); the
    // refresh loop takes over from the next interval.
    let first_code = qr::animated_qr_data(&order.qr_start_token, &order.qr_start_secret, 0);
    let first_image = render_qr(&ctx.encoder, first_code.as_deref());

    ctx.state.send_modify(|snap| {
        snap.status = SessionStatus::Outstanding;
        snap.order_ref = Some(order.order_ref.clone());
        snap.auto_start_token = Some(order.auto_start_token.clone());
        snap.started_at = Some(started_at);
        snap.qr_data = first_code;
        snap.qr_image = first_image;
    });

    info!(order_ref = %order.order_ref, "Order initiated; session outstanding");

    // Three supervised tasks share only the secret store and the snapshot
    // channel; whichever reaches a terminal decision first wins.
    let collect = tokio::spawn(collect_loop(ctx.clone(), order.order_ref.clone()));
    let refresh = tokio::spawn(qr_refresh_loop(ctx.clone(), order.qr_start_token, started_instant));
    let timeout = tokio::spawn(deadline_task(ctx.clone(), deadline));

    let mut tasks = ctx.tasks.lock().await;
    tasks.push(collect);
    tasks.push(refresh);
    tasks.push(timeout);
}

/// Initiation with a bounded retry budget
///
/// Only initiation is retried; collect polls are never retried per-call.
/// The 30 s session deadline is anchored at successful initiation, so
/// this budget does not eat into the user's scan window.
async fn initiate_with_retry(
    ctx: &SessionContext,
    options: &StartOptions,
) -> Result<InitiatedOrder, InitiateError> {
    let attempts = ctx.config.initiation_attempts.max(1);
    let request = InitiateRequest {
        end_user_ip: options.end_user_ip.clone(),
        visible_data: options.visible_data.clone(),
    };

    let mut last_error = None;
    for attempt in 1..=attempts {
        let result = tokio::select! {
            _ = ctx.cancel.cancelled() => return Err(InitiateError::Superseded),
            result = ctx.gateway.initiate(options.kind, &request) => result,
        };

        match result {
            Ok(order) => {
                if attempt > 1 {
                    info!(attempt, "Initiation succeeded after retry");
                }
                return Ok(order);
            }
            Err(err) => {
                warn!(attempt, error = %err, "Initiation attempt failed");
                last_error = Some(err);

                if attempt < attempts {
                    tokio::select! {
                        _ = ctx.cancel.cancelled() => return Err(InitiateError::Superseded),
                        _ = tokio::time::sleep(ctx.config.initiation_retry_delay()) => {}
                    }
                }
            }
        }
    }

    Err(InitiateError::Fault(SessionFault::Initiation {
        attempts,
        source: last_error
            .unwrap_or_else(|| RpError::Transport("no initiation attempt was made".to_string())),
    }))
}

/// Collect-polling loop; resolves the session on any non-pending answer
async fn collect_loop(ctx: SessionContext, order_ref: String) {
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!("Collect loop cancelled");
                break;
            }
            _ = tokio::time::sleep(ctx.config.collect_interval()) => {
                // Abort mid-call on cancellation: a poll that lost the
                // race to the deadline must not linger past shutdown.
                let result = tokio::select! {
                    _ = ctx.cancel.cancelled() => break,
                    result = ctx.gateway.collect(&order_ref) => result,
                };

                if apply_collect_result(&ctx, &order_ref, result) {
                    break;
                }
            }
        }
    }
}

/// Apply one collect answer; returns true when the session resolved
fn apply_collect_result(
    ctx: &SessionContext,
    order_ref: &str,
    result: Result<CollectResponse, RpError>,
) -> bool {
    match result {
        Ok(response) => match response.status {
            CollectStatus::Pending => {
                // Hint codes ("userSign", "started", ...) are display
                // hints; keep the latest while outstanding.
                ctx.state.send_if_modified(|snap| {
                    if snap.status != SessionStatus::Outstanding
                        || snap.hint_code == response.hint_code
                    {
                        return false;
                    }
                    snap.hint_code = response.hint_code.clone();
                    true
                });
                false
            }
            CollectStatus::Complete => {
                let completed_at = Utc::now();
                let outcome =
                    match completion::build_identification(order_ref, response.completion_data, completed_at)
                    {
                        Ok(identification) => Outcome::Complete(identification),
                        Err(fault) => {
                            error!(error = %fault, "Completion rejected");
                            Outcome::Fault(fault)
                        }
                    };
                finish(ctx, outcome)
            }
            CollectStatus::Failed => {
                finish(ctx, Outcome::Failed { hint_code: response.hint_code })
            }
        },
        Err(err) => {
            // A swallowed collect error risks polling past the true
            // outcome; surface it as the terminal Error state instead.
            error!(error = %err, "Collect poll failed");
            finish(ctx, Outcome::Fault(SessionFault::Collect(err)))
        }
    }
}

/// QR refresh loop; publishes a fresh rotating code every interval
///
/// Never drives a state transition. An absent secret means "no code
/// available" (the session ended or was superseded), not an error.
async fn qr_refresh_loop(
    ctx: SessionContext,
    start_token: String,
    started_instant: Instant,
) {
    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                debug!("QR refresh loop cancelled");
                break;
            }
            _ = tokio::time::sleep(ctx.config.qr_refresh_interval()) => {
                let elapsed = started_instant.elapsed().as_secs();
                let code = ctx
                    .secrets
                    .get(&start_token)
                    .and_then(|secret| qr::animated_qr_data(&start_token, &secret, elapsed));
                let image = render_qr(&ctx.encoder, code.as_deref());

                ctx.state.send_if_modified(|snap| {
                    if snap.status != SessionStatus::Outstanding {
                        return false;
                    }
                    snap.qr_data = code;
                    snap.qr_image = image;
                    true
                });
            }
        }
    }
}

/// Deadline timer: resolves the session to `TimedOut` at 30 s
async fn deadline_task(ctx: SessionContext, deadline: Instant) {
    tokio::select! {
        _ = ctx.cancel.cancelled() => {
            debug!("Deadline timer cancelled");
        }
        _ = tokio::time::sleep_until(deadline) => {
            if finish(&ctx, Outcome::TimedOut) {
                warn!("Session timed out before the provider resolved the order");
            }
        }
    }
}

/// Exactly-once transition to a terminal state
///
/// The guard runs inside the watch channel's modify lock: whichever of
/// the collect loop, the deadline timer, or a late in-flight response
/// gets here first wins; the rest no-op. On a win the loops are
/// cancelled before the secret store is cleared, so a refresh tick can
/// never produce a code for an ended session.
fn finish(ctx: &SessionContext, outcome: Outcome) -> bool {
    let mut outcome = Some(outcome);
    let applied = ctx.state.send_if_modified(|snap| {
        if !snap.status.is_live() {
            return false;
        }
        let Some(outcome) = outcome.take() else {
            return false;
        };

        snap.qr_data = None;
        snap.qr_image = None;
        match outcome {
            Outcome::Complete(identification) => {
                snap.status = SessionStatus::Complete;
                snap.hint_code = None;
                snap.identification = Some(identification);
            }
            Outcome::Failed { hint_code } => {
                snap.status = SessionStatus::Failed;
                if hint_code.is_some() {
                    snap.hint_code = hint_code;
                }
            }
            Outcome::TimedOut => {
                snap.status = SessionStatus::TimedOut;
            }
            Outcome::Fault(fault) => {
                snap.status = SessionStatus::Error;
                snap.fault = Some(fault);
            }
        }
        true
    });

    if applied {
        info!(status = ?ctx.state.borrow().status, "Session reached terminal state");
        ctx.cancel.cancel();
        ctx.secrets.clear();
    }
    applied
}

fn render_qr(encoder: &Option<Arc<dyn QrImageEncoder>>, data: Option<&str>) -> Option<Vec<u8>> {
    let encoder = encoder.as_ref()?;
    match encoder.encode(data?) {
        Ok(image) => Some(image),
        Err(err) => {
            // Image rendering is best-effort; the raw payload is still
            // published.
            debug!(error = %err, "QR image encoding failed");
            None
        }
    }
}
