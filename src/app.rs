// src/app.rs
//! Composition root: owns the bus, the store and the task engine, and runs
//! the cross-cutting rules (starter reward, navigation gating, premium
//! prompt dismissal).

use std::sync::Arc;

use tracing::info;

use crate::attachments::{BlobAllocator, Clock, ObjectUrls, SystemClock};
use crate::cadence::PremiumVisual;
use crate::config::Config;
use crate::error::StoreError;
use crate::events::{EventBus, Toast};
use crate::gates::{Section, StarterGates};
use crate::lifecycle::TaskEngine;
use crate::pricing::{gbp, BoostTier, PremiumTimeQuote, SubscriptionTier};
use crate::store::{JsonFileStore, KeyValueStore, LoadOutcome, StateStore};
use crate::types::AppState;

pub struct App {
    bus: Arc<EventBus>,
    store: Arc<StateStore>,
    engine: TaskEngine,
    load_outcome: LoadOutcome,
}

impl App {
    pub fn open(config: &Config) -> Result<Self, StoreError> {
        Self::builder(Box::new(JsonFileStore::new(config.state_dir.clone()))).reset(config.reset).build()
    }

    pub fn builder(backend: Box<dyn KeyValueStore>) -> AppBuilder {
        AppBuilder {
            backend,
            bus: Arc::new(EventBus::new()),
            clock: Arc::new(SystemClock),
            blobs: Arc::new(ObjectUrls::new()),
            reset: false,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    pub fn state(&self) -> AppState {
        self.store.get()
    }

    pub fn gates(&self) -> StarterGates {
        StarterGates::evaluate(&self.store.get().starter_tasks)
    }

    pub fn premium_visual(&self) -> PremiumVisual {
        PremiumVisual::from_state(&self.store.get())
    }

    pub fn landing_section(&self) -> Section {
        self.gates().landing()
    }

    /// Publishes a navigation request unless the section is locked.
    pub fn navigate(&self, section: Section) -> bool {
        if self.gates().is_locked(section) {
            self.bus.toast(
                Toast::new("🔒", format!("{section} is locked")).with_body("complete starter tasks to unlock"),
            );
            return false;
        }
        self.bus.navigate(section);
        true
    }

    /// Marks one starter task done. Returns `false` for unknown or already
    /// completed ids.
    pub fn complete_starter_task(&self, id: &str) -> Result<bool, StoreError> {
        self.complete_starter_tasks(&[id])
    }

    /// Marks several starter tasks done in a single update, then settles the
    /// one-time reward. Returns `false` when nothing changed.
    pub fn complete_starter_tasks(&self, ids: &[&str]) -> Result<bool, StoreError> {
        let before = self.store.get();
        if !before.starter_tasks.iter().any(|t| !t.done && ids.contains(&t.id.as_str())) {
            return Ok(false);
        }
        let after = self.store.set(|state| {
            for id in ids {
                mark_starter_done(state, id);
            }
        })?;
        let remaining = after.starter_tasks.iter().filter(|t| !t.done).count();
        let body = match remaining {
            0 => "All starter tasks complete!".to_string(),
            1 => "1 starter task left".to_string(),
            n => format!("{n} starter tasks left"),
        };
        self.bus.toast(Toast::new("✅", "Starter task checked off").with_body(body));
        self.settle_starter_reward()?;
        Ok(true)
    }

    /// Called by the Post Task page; the first post completes `s2`.
    pub fn record_first_post(&self) -> Result<bool, StoreError> {
        if self.store.get().starter_done("s2") {
            return Ok(false);
        }
        self.store.set(|state| mark_starter_done(state, "s2"))?;
        self.bus.toast(Toast::new("✅", "Starter task complete").with_body("Community unlocked"));
        self.settle_starter_reward()?;
        Ok(true)
    }

    /// Grants the one-time starter bonus when all three starter tasks are
    /// done and it has not been granted yet. Safe to call repeatedly.
    pub fn settle_starter_reward(&self) -> Result<bool, StoreError> {
        let current = self.store.get();
        if current.starter_rewarded || !StarterGates::evaluate(&current.starter_tasks).all_done() {
            return Ok(false);
        }
        let mut granted = false;
        let state = self.store.set(|state| {
            if StarterGates::evaluate(&state.starter_tasks).all_done() && !state.starter_rewarded {
                state.tokens += 1;
                state.starter_rewarded = true;
                granted = true;
            }
        })?;
        if granted {
            info!(target: "app", tokens = state.tokens, "starter pack reward granted");
            self.bus.toast(
                Toast::new("🎉", "Starter pack complete!").with_body("You earned 1 token. Welcome aboard!"),
            );
            self.bus.navigate(Section::Overview);
        }
        Ok(granted)
    }

    /// The user clicked the premium prompt: hide it until cadence re-arms it.
    pub fn dismiss_premium_hint(&self) -> Result<(), StoreError> {
        self.store.set(|state| state.premium_hint_dismissed = true)?;
        self.bus.navigate(Section::Premium);
        Ok(())
    }

    pub fn buy_boost(&self, tier: BoostTier, subscription: SubscriptionTier) -> f64 {
        let price = tier.price(subscription);
        self.bus.toast(Toast::new("⚡", format!("{tier} purchased")).with_body(format!(
            "{} for {} hours — {}",
            BoostTier::MULTIPLIER,
            tier.hours(),
            gbp(price)
        )));
        price
    }

    pub fn activate_premium_time(
        &self,
        bonus_pct: u32,
        months: u32,
        subscription: SubscriptionTier,
    ) -> PremiumTimeQuote {
        let quote = PremiumTimeQuote::compute(bonus_pct, months, subscription);
        let plural = if quote.months > 1 { "s" } else { "" };
        self.bus.toast(Toast::new("💫", "Premium Time activated").with_body(format!(
            "{}% for {} month{plural} — {}",
            quote.bonus_pct,
            quote.months,
            gbp(quote.total)
        )));
        quote
    }

    /// Restores the default snapshot and drops every live attachment.
    pub fn reset(&self) -> Result<AppState, StoreError> {
        self.engine.release_all();
        self.store.reset()
    }
}

fn mark_starter_done(state: &mut AppState, id: &str) {
    for task in state.starter_tasks.iter_mut().filter(|t| t.id == id) {
        task.done = true;
    }
}

pub struct AppBuilder {
    backend: Box<dyn KeyValueStore>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    blobs: Arc<dyn BlobAllocator>,
    reset: bool,
}

impl AppBuilder {
    pub fn bus(mut self, bus: Arc<EventBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn blobs(mut self, blobs: Arc<dyn BlobAllocator>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    pub fn build(self) -> Result<App, StoreError> {
        let (store, load_outcome) = StateStore::open(self.backend, Arc::clone(&self.bus));
        let store = Arc::new(store);
        store.apply_reset_signal(self.reset)?;
        let engine = TaskEngine::new(Arc::clone(&store), Arc::clone(&self.bus), self.clock, self.blobs);
        let app = App { bus: self.bus, store, engine, load_outcome };
        // A snapshot may arrive with all three done but the bonus unpaid.
        app.settle_starter_reward()?;
        Ok(app)
    }
}
