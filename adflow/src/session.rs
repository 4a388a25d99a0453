//! Ad session runners
//!
//! Each runner drives one operation for one slot: it subscribes its waits,
//! fires the SDK trigger, interprets whichever notification wins and moves
//! the slot to its resting state. The façade has already performed the
//! entry transition by the time a runner starts.
//!
//! Every runner owns a [`CancelScope`]. All of its waits and listeners are
//! tied to the scope's token, and the scope is cancelled before the slot is
//! released, so no subscription outlives its session.

use std::sync::Arc;

use adflow_bus::{
    wait_first, wait_next, AdFormat, CancelScope, CancelToken, Channel, EventBus, Notification,
    Reward, UnitFilter,
};
use adflow_store::{CounterId, LabelId};
use parking_lot::Mutex;

use crate::config::AdConfig;
use crate::sdk::AdSdk;
use crate::slot::SlotTable;
use crate::state::{CloseReason, Failure, Outcome, SessionState};

/// Everything a session needs, shared with the orchestrator.
#[derive(Clone)]
pub(crate) struct SessionContext {
    pub(crate) bus: EventBus,
    pub(crate) sdk: Arc<dyn AdSdk>,
    pub(crate) config: Arc<AdConfig>,
    pub(crate) slots: Arc<SlotTable>,
}

/// Notifications that end a show session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    Dismissed,
    Clicked,
    Closed,
    Expired,
    FailedToPlay,
}

impl Terminal {
    /// Terminal set raced after a show trigger, in race order.
    fn set(format: AdFormat) -> [(Channel, Terminal); 3] {
        match format {
            AdFormat::Interstitial => [
                (Channel::Dismissed(format), Terminal::Dismissed),
                (Channel::Clicked(format), Terminal::Clicked),
                (Channel::Expired(format), Terminal::Expired),
            ],
            AdFormat::RewardedVideo => [
                (Channel::Closed(format), Terminal::Closed),
                (Channel::Expired(format), Terminal::Expired),
                (Channel::FailedToPlay(format), Terminal::FailedToPlay),
            ],
        }
    }

    fn outcome(self, notification: &Notification, reward: Option<Reward>) -> Outcome {
        match self {
            Terminal::Dismissed => Outcome::Completed(CloseReason::Dismissed),
            Terminal::Clicked => Outcome::Completed(CloseReason::Clicked),
            Terminal::Closed => Outcome::Completed(CloseReason::Closed { reward }),
            Terminal::Expired => Outcome::Failed(Failure::Expired),
            Terminal::FailedToPlay => Outcome::Failed(Failure::FailedToPlay(
                notification.error().unwrap_or_default().to_string(),
            )),
        }
    }
}

/// Initialize the SDK and wait for it to report back.
///
/// There is no timeout: if the SDK never reports, this never returns.
pub(crate) async fn initialize(ctx: SessionContext, scope: CancelScope) -> Outcome {
    let initialized = wait_next(
        ctx.bus.stream(Channel::SdkInitialized, UnitFilter::Any),
        &scope.token(),
    );
    if scope.is_cancelled() {
        ctx.slots.abort_initialize();
        tracing::debug!("SDK initialization cancelled before it started");
        return Outcome::Failed(Failure::Cancelled);
    }

    tracing::info!(game_id = %ctx.config.game_id, "Initializing ad SDK");
    ctx.sdk.initialize(&ctx.config);
    ctx.sdk.report_application_open();
    ctx.sdk.enable_location_support(ctx.config.location_support);

    match initialized.await {
        Ok(_) if ctx.slots.finish_initialize() => {
            tracing::info!("Ad SDK initialized");
            Outcome::Ready
        }
        Ok(_) => {
            tracing::debug!("SDK reported ready after shutdown");
            Outcome::Failed(Failure::Cancelled)
        }
        Err(err) => {
            ctx.slots.abort_initialize();
            tracing::warn!(error = %err, "SDK initialization abandoned");
            Outcome::Failed(Failure::Cancelled)
        }
    }
}

/// Request an ad and race Loaded against LoadFailed.
pub(crate) async fn load(ctx: SessionContext, format: AdFormat, scope: CancelScope) -> Outcome {
    let ad_unit = ctx.config.ad_unit(format).clone();
    let filter = ctx.config.unit_filter(format);

    let race = wait_first(
        [
            ctx.bus.stream(Channel::Loaded(format), filter.clone()),
            ctx.bus.stream(Channel::LoadFailed(format), filter),
        ],
        &scope.token(),
    );
    if scope.is_cancelled() {
        return abandon(&ctx, format, scope);
    }

    tracing::debug!(%format, %ad_unit, "Requesting ad");
    ctx.sdk.load_plugins(format, std::slice::from_ref(&ad_unit));
    ctx.sdk.request_load(format, &ad_unit);

    let outcome = match race.await {
        Ok((0, _)) => {
            tracing::info!(%format, %ad_unit, "Ad loaded");
            Outcome::Loaded
        }
        Ok((_, notification)) => {
            let error = notification.error().unwrap_or_default().to_string();
            tracing::warn!(%format, %ad_unit, %error, "Failed loading ad");
            Outcome::Failed(Failure::Load(error))
        }
        Err(_) => Outcome::Failed(Failure::Cancelled),
    };

    scope.cancel();
    ctx.slots.finish(format, SessionState::from(outcome.clone()));
    outcome
}

/// Show a loaded ad, wait for it to appear, then race its terminal set.
pub(crate) async fn show(ctx: SessionContext, format: AdFormat, scope: CancelScope) -> Outcome {
    let ad_unit = ctx.config.ad_unit(format).clone();
    let filter = ctx.config.unit_filter(format);
    let token = scope.token();
    let terminals = Terminal::set(format);

    // Subscribed before the trigger: the SDK may report Shown and a
    // terminal notification back to back.
    let mut terminal = wait_first(
        terminals
            .iter()
            .map(|(channel, _)| ctx.bus.stream(*channel, filter.clone())),
        &token,
    );
    let mut shown = wait_next(ctx.bus.stream(Channel::Shown(format), filter.clone()), &token);
    let reward = capture_reward(&ctx.bus, format, filter, &token);
    if scope.is_cancelled() {
        return abandon(&ctx, format, scope);
    }

    tracing::debug!(%format, %ad_unit, "Showing ad");
    ctx.sdk.show(format, &ad_unit);

    // Shown wins a tie. A terminal notification without Shown (an ad that
    // never started playing) still ends the session.
    let first = tokio::select! {
        biased;
        result = &mut shown => result.map(|_| None),
        result = &mut terminal => result.map(Some),
    };
    let winner = match first {
        Ok(None) => {
            tracing::debug!(%format, %ad_unit, "Ad shown");
            ctx.slots.transition(format, SessionState::Shown);
            terminal.await
        }
        Ok(Some(winner)) => Ok(winner),
        Err(err) => Err(err),
    };

    let outcome = match winner {
        Ok((index, notification)) => {
            let captured = reward.lock().take();
            terminals[index].1.outcome(&notification, captured)
        }
        Err(_) => Outcome::Failed(Failure::Cancelled),
    };
    scope.cancel();

    let store = ctx.slots.store();
    if let Outcome::Completed(CloseReason::Closed { reward }) = &outcome {
        let completions = store.increment(CounterId::REWARDED_COMPLETIONS);
        if let Some(reward) = reward {
            store.set_label(LabelId::LAST_REWARD, reward.to_string());
        }
        tracing::info!(%format, completions, "Rewarded video completed");
    }
    store.set_label(LabelId::LAST_OUTCOME, outcome.label());

    match &outcome {
        Outcome::Failed(failure) => {
            tracing::warn!(%format, %ad_unit, %failure, "Ad show failed")
        }
        _ => tracing::info!(%format, %ad_unit, outcome = outcome.label(), "Finished showing ad"),
    }

    ctx.slots.finish(format, SessionState::from(outcome.clone()));
    outcome
}

/// Settle a session that was cancelled before its trigger went out.
///
/// The SDK is never called, so nothing is requested or played after a
/// shutdown.
fn abandon(ctx: &SessionContext, format: AdFormat, scope: CancelScope) -> Outcome {
    scope.cancel();
    tracing::debug!(%format, "Session cancelled before its trigger");
    ctx.slots.finish(format, SessionState::Failed(Failure::Cancelled));
    Outcome::Failed(Failure::Cancelled)
}

/// Record the last reward granted while a rewarded video plays.
///
/// The listener is detached when `token` is cancelled.
fn capture_reward(
    bus: &EventBus,
    format: AdFormat,
    filter: UnitFilter,
    token: &CancelToken,
) -> Arc<Mutex<Option<Reward>>> {
    let captured = Arc::new(Mutex::new(None));
    if format != AdFormat::RewardedVideo {
        return captured;
    }

    let sink = Arc::clone(&captured);
    let handle = bus.subscribe(Channel::RewardReceived(format), filter, move |notification| {
        if let Some(reward) = notification.reward() {
            tracing::debug!(%reward, "Reward received");
            *sink.lock() = Some(reward.clone());
        }
    });

    let bus = bus.clone();
    token.on_cancel(move || {
        bus.unsubscribe(handle);
    });
    captured
}
