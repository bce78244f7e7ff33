//! Live simulation session.
//!
//! A single actor task owns the executor, the price book and the random
//! source. Manual trades, price updates and auto-trade ticks all reach it
//! as messages and run to completion one at a time, so no reader ever
//! observes a half-applied trade. A second task polls the price feed.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::error::{SimtraderError, TradeError};
use crate::domain::execution::OrderExecutor;
use crate::domain::goal::GoalProgress;
use crate::domain::ledger::{Ledger, SplitOutcome};
use crate::domain::metrics::Metrics;
use crate::domain::position::{Position, Trade};
use crate::domain::price_book::PriceBook;
use crate::domain::random::RandomSource;
use crate::domain::session_config::SessionConfig;
use crate::domain::strategy::{self, TickOutcome};
use crate::domain::valuation::{PositionView, position_views};
use crate::ports::price_feed_port::PriceFeedPort;

/// Number of trades carried in a snapshot.
pub const RECENT_TRADES: usize = 20;

const COMMAND_BUFFER: usize = 256;

/// Consistent view of the session for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub balance: f64,
    pub positions: Vec<PositionView>,
    /// Most recent first.
    pub recent_trades: Vec<Trade>,
    pub metrics: Metrics,
    pub goal: GoalProgress,
    pub status: String,
    pub auto_trade: bool,
    pub universe: Vec<String>,
    pub ticks: u64,
    pub taken_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Value the ledger at `now`. Runtime fields (status, universe, tick
    /// count) start out idle and empty.
    pub fn capture(
        executor: &OrderExecutor,
        prices: &PriceBook,
        config: &SessionConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let ledger = executor.ledger();
        let metrics = Metrics::compute(ledger, prices, now);
        let goal = GoalProgress::compute(
            ledger.initial_balance(),
            metrics.total_value,
            config.target_profit_pct,
            config.target_period_days,
            (now - ledger.created_at()).num_days(),
        );
        SessionSnapshot {
            balance: ledger.balance(),
            positions: position_views(ledger, prices),
            recent_trades: ledger.recent_trades(RECENT_TRADES),
            metrics,
            goal,
            status: TickOutcome::Idle.to_string(),
            auto_trade: false,
            universe: Vec::new(),
            ticks: 0,
            taken_at: now,
        }
    }
}

enum Command {
    Buy {
        symbol: String,
        amount: f64,
        price: Option<f64>,
        reply: oneshot::Sender<Result<Position, TradeError>>,
    },
    Sell {
        symbol: String,
        amount: f64,
        price: Option<f64>,
        reply: oneshot::Sender<Result<Vec<SplitOutcome>, TradeError>>,
    },
    Prices(HashMap<String, f64>),
    Price {
        symbol: String,
        price: f64,
    },
    SetAutoTrade(bool),
    Snapshot(oneshot::Sender<SessionSnapshot>),
    TradeLog(oneshot::Sender<Vec<Trade>>),
    Reset(oneshot::Sender<()>),
}

/// Cloneable handle for talking to a running session.
#[derive(Clone)]
pub struct SessionClient {
    tx: mpsc::Sender<Command>,
}

impl SessionClient {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, SimtraderError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SimtraderError::SessionClosed)?;
        rx.await.map_err(|_| SimtraderError::SessionClosed)
    }

    async fn notify(&self, command: Command) -> Result<(), SimtraderError> {
        self.tx
            .send(command)
            .await
            .map_err(|_| SimtraderError::SessionClosed)
    }

    pub async fn buy(
        &self,
        symbol: &str,
        amount: f64,
        price: Option<f64>,
    ) -> Result<Position, SimtraderError> {
        let symbol = symbol.to_string();
        self.request(|reply| Command::Buy {
            symbol,
            amount,
            price,
            reply,
        })
        .await?
        .map_err(SimtraderError::from)
    }

    pub async fn sell(
        &self,
        symbol: &str,
        amount: f64,
        price: Option<f64>,
    ) -> Result<Vec<SplitOutcome>, SimtraderError> {
        let symbol = symbol.to_string();
        self.request(|reply| Command::Sell {
            symbol,
            amount,
            price,
            reply,
        })
        .await?
        .map_err(SimtraderError::from)
    }

    pub async fn update_price(&self, symbol: &str, price: f64) -> Result<(), SimtraderError> {
        self.notify(Command::Price {
            symbol: symbol.to_string(),
            price,
        })
        .await
    }

    pub async fn update_prices(&self, prices: HashMap<String, f64>) -> Result<(), SimtraderError> {
        self.notify(Command::Prices(prices)).await
    }

    pub async fn set_auto_trade(&self, enabled: bool) -> Result<(), SimtraderError> {
        self.notify(Command::SetAutoTrade(enabled)).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SimtraderError> {
        self.request(Command::Snapshot).await
    }

    /// The full trade log in execution order.
    pub async fn trade_log(&self) -> Result<Vec<Trade>, SimtraderError> {
        self.request(Command::TradeLog).await
    }

    pub async fn reset(&self) -> Result<(), SimtraderError> {
        self.request(Command::Reset).await
    }
}

/// A running session and the tasks that drive it.
pub struct Session {
    client: SessionClient,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Fetch initial prices, pick the tradable universe and spawn the
    /// actor and price-poll tasks. Must be called inside a tokio runtime.
    pub fn start(
        config: SessionConfig,
        feed: Arc<dyn PriceFeedPort>,
        mut random: Box<dyn RandomSource + Send>,
    ) -> Session {
        let now = Utc::now();
        let mut prices = PriceBook::new();
        match feed.current_prices() {
            Ok(initial) => {
                prices.update_many(&initial, now);
            }
            Err(e) => warn!(error = %e, "initial price fetch failed"),
        }

        let universe =
            strategy::select_universe(&prices.symbols(), config.universe_size, random.as_mut());

        info!(
            initial_balance = config.initial_balance,
            strategy = %config.strategy,
            auto_trade = config.auto_trade,
            universe = universe.len(),
            "session started"
        );

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown, shutdown_rx) = watch::channel(false);

        let push_tx = tx.clone();
        let on_update = Box::new(move |symbol: &str, price: f64| {
            let update = Command::Price {
                symbol: symbol.to_string(),
                price,
            };
            if push_tx.try_send(update).is_err() {
                debug!(symbol, "dropped pushed price update");
            }
        });
        match feed.subscribe(&universe, on_update) {
            Ok(true) => debug!("price push subscription active"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "price subscription failed"),
        }

        let actor = SessionActor {
            executor: OrderExecutor::new(
                Ledger::new(config.initial_balance, now),
                config.execution.clone(),
            ),
            prices,
            universe,
            auto_trade: config.auto_trade,
            random,
            status: TickOutcome::Idle.to_string(),
            ticks: 0,
            config,
        };

        let poll_interval = actor.config.price_refresh;
        let tasks = vec![
            tokio::spawn(actor.run(rx, shutdown_rx.clone())),
            tokio::spawn(poll_prices(feed, tx.clone(), poll_interval, shutdown_rx)),
        ];

        Session {
            client: SessionClient { tx },
            shutdown,
            tasks,
        }
    }

    pub fn client(&self) -> SessionClient {
        self.client.clone()
    }

    /// Stop every periodic task and wait for them to finish. A command
    /// already being processed completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "session task ended abnormally");
            }
        }
        info!("session stopped");
    }
}

async fn poll_prices(
    feed: Arc<dyn PriceFeedPort>,
    tx: mpsc::Sender<Command>,
    every: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // the first tick fires immediately; initial prices were already loaded
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                match feed.current_prices() {
                    Ok(prices) => {
                        if tx.send(Command::Prices(prices)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(error = %e, "price refresh failed"),
                }
            }
        }
    }
}

struct SessionActor {
    executor: OrderExecutor,
    prices: PriceBook,
    universe: Vec<String>,
    config: SessionConfig,
    random: Box<dyn RandomSource + Send>,
    auto_trade: bool,
    status: String,
    ticks: u64,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::Receiver<Command>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            // a due tick runs before any queued command
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick(), if self.auto_trade => self.auto_trade_tick(),
                command = rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
    }

    fn handle(&mut self, command: Command) {
        let now = Utc::now();
        match command {
            Command::Buy {
                symbol,
                amount,
                price,
                reply,
            } => {
                let result = self.executor.buy(&symbol, amount, price, &self.prices, now);
                match &result {
                    Ok(pos) => info!(symbol = %symbol, amount, price = pos.buy_price, "manual buy"),
                    Err(e) => warn!(symbol = %symbol, error = %e, "manual buy rejected"),
                }
                let _ = reply.send(result);
            }
            Command::Sell {
                symbol,
                amount,
                price,
                reply,
            } => {
                let result = self.executor.sell(&symbol, amount, price, &self.prices, now);
                match &result {
                    Ok(closed) => info!(symbol = %symbol, amount, lots = closed.len(), "manual sell"),
                    Err(e) => warn!(symbol = %symbol, error = %e, "manual sell rejected"),
                }
                let _ = reply.send(result);
            }
            Command::Prices(batch) => {
                let accepted = self.prices.update_many(&batch, now);
                debug!(received = batch.len(), accepted, "prices refreshed");
                self.ensure_universe();
            }
            Command::Price { symbol, price } => {
                if !self.prices.update(&symbol, price, now) {
                    debug!(symbol = %symbol, price, "ignored unusable price");
                }
                self.ensure_universe();
            }
            Command::SetAutoTrade(enabled) => {
                if enabled != self.auto_trade {
                    info!(enabled, "auto-trade toggled");
                }
                self.auto_trade = enabled;
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot(now));
            }
            Command::TradeLog(reply) => {
                let _ = reply.send(self.executor.ledger().all_trades().to_vec());
            }
            Command::Reset(reply) => {
                self.executor.reset(now);
                self.status = TickOutcome::Idle.to_string();
                self.ticks = 0;
                info!("session reset");
                let _ = reply.send(());
            }
        }
    }

    /// The universe is chosen from the first prices seen; a feed that was
    /// down at start gets one as soon as quotes arrive.
    fn ensure_universe(&mut self) {
        if self.universe.is_empty() && !self.prices.is_empty() {
            self.universe = strategy::select_universe(
                &self.prices.symbols(),
                self.config.universe_size,
                self.random.as_mut(),
            );
            info!(universe = self.universe.len(), "tradable universe selected");
        }
    }

    fn auto_trade_tick(&mut self) {
        self.ticks += 1;
        let outcome = strategy::tick(
            &mut self.executor,
            &self.prices,
            &self.universe,
            &self.config.rules,
            self.random.as_mut(),
            Utc::now(),
        );
        match &outcome {
            TickOutcome::Idle => debug!(tick = self.ticks, "auto-trade idle"),
            TickOutcome::Rejected { error } => {
                debug!(tick = self.ticks, %error, "auto-trade skipped")
            }
            exit if exit.is_exit() => info!(tick = self.ticks, %exit, "auto-trade exit"),
            entry => info!(tick = self.ticks, %entry, "auto-trade entry"),
        }
        self.status = outcome.to_string();
    }

    fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status.clone(),
            auto_trade: self.auto_trade,
            universe: self.universe.clone(),
            ticks: self.ticks,
            ..SessionSnapshot::capture(&self.executor, &self.prices, &self.config, now)
        }
    }
}
