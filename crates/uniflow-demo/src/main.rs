//! Demo wiring for the uniflow store.
//!
//! Builds a two-slice store (a counter and a dispatch history), installs the
//! logging and effect middlewares, and drives it: two synchronous
//! increments, one label, then an effect that fetches a label from a
//! simulated remote source and dispatches the follow-up from a tokio task.
//! The final state snapshot is printed as JSON.

mod logger;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use uniflow::{
    apply_middleware, combine_reducers, create_store, Action, CombinedReducer, Effect,
    EffectAction, EffectMiddleware, EffectSplit, LoggingMiddleware, Middleware, SliceMap,
    SliceReducer,
};

type AppState = SliceMap<AppSlice>;

#[derive(Debug, PartialEq, Serialize)]
enum AppSlice {
    Counter(i64),
    History(Vec<String>),
}

#[derive(Debug, strum::AsRefStr)]
enum AppAction {
    Init,
    Increment,
    Label(String),
    FetchLabel(Effect<AppState, AppAction>),
}

impl Action for AppAction {
    fn kind(&self) -> &str {
        self.as_ref()
    }

    fn init() -> Self {
        AppAction::Init
    }
}

impl EffectAction<AppState> for AppAction {
    fn into_effect(self) -> EffectSplit<AppState, Self> {
        match self {
            AppAction::FetchLabel(effect) => EffectSplit::Effect(effect),
            other => EffectSplit::Plain(other),
        }
    }
}

fn counter_slice(
    slice: Option<&Arc<AppSlice>>,
    action: &AppAction,
) -> uniflow::Result<Option<Arc<AppSlice>>> {
    let current = match slice {
        Some(s) => Arc::clone(s),
        None => Arc::new(AppSlice::Counter(0)),
    };
    Ok(Some(match (action, current.as_ref()) {
        (AppAction::Increment, AppSlice::Counter(n)) => Arc::new(AppSlice::Counter(n + 1)),
        _ => current,
    }))
}

fn history_slice(
    slice: Option<&Arc<AppSlice>>,
    action: &AppAction,
) -> uniflow::Result<Option<Arc<AppSlice>>> {
    let current = match slice {
        Some(s) => Arc::clone(s),
        None => Arc::new(AppSlice::History(Vec::new())),
    };
    Ok(Some(match (action, current.as_ref()) {
        (AppAction::Increment | AppAction::Label(_), AppSlice::History(entries)) => {
            let mut entries = entries.clone();
            match action {
                AppAction::Label(label) => entries.push(format!("Label({label})")),
                _ => entries.push(action.kind().to_owned()),
            }
            Arc::new(AppSlice::History(entries))
        }
        _ => current,
    }))
}

fn root_reducer() -> CombinedReducer<AppSlice, AppAction> {
    combine_reducers(vec![
        ("counter", Box::new(counter_slice) as Box<dyn SliceReducer<_, _>>),
        ("history", Box::new(history_slice)),
    ])
}

/// Simulated remote fetch: resolves off the dispatching thread, then feeds
/// the result back in as a plain action.
fn fetch_label() -> AppAction {
    AppAction::FetchLabel(Effect::new(|api| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if let Err(err) = api.dispatch(AppAction::Label("remote".to_owned())) {
                log::error!("follow-up dispatch failed: {err}");
            }
        });
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    logger::init();

    let store = create_store(
        root_reducer(),
        None,
        Some(apply_middleware(vec![
            Arc::new(LoggingMiddleware::new()) as Arc<dyn Middleware<_, _>>,
            Arc::new(EffectMiddleware::new()),
        ])),
    )?;

    let watcher = store.clone();
    let subscription = store.subscribe(move || {
        if let Ok(state) = watcher.state() {
            log::info!("listener: counter is {:?}", state.get("counter"));
        }
    })?;

    store.dispatch(AppAction::Increment)?;
    store.dispatch(AppAction::Increment)?;
    store.dispatch(AppAction::Label("manual".to_owned()))?;
    store.dispatch(fetch_label())?;

    // Give the simulated fetch time to land its follow-up.
    tokio::time::sleep(Duration::from_millis(300)).await;
    subscription.unsubscribe()?;

    let state = store.state()?;
    println!("{}", serde_json::to_string_pretty(&*state)?);
    Ok(())
}
