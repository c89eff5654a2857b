//! Press-classification timing tests, run under a paused clock so hold
//! durations are exact.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use deckhand_device::{KeyEvent, SimDevice};
use deckhand_engine::{
    Deck, Engine, Services,
    test_support::{ProbeWidget, TriggerLog, settle},
};
use tokio::time::advance;

struct Fixture {
    dev: Arc<SimDevice>,
    log: TriggerLog,
    handle: deckhand_engine::EngineHandle,
    task: tokio::task::JoinHandle<deckhand_engine::Result<()>>,
}

async fn start() -> Fixture {
    let dev = Arc::new(SimDevice::new(3));
    let log: TriggerLog = Arc::new(Mutex::new(Vec::new()));
    let widgets: Vec<Box<dyn deckhand_engine::Widget>> = (0..3)
        .map(|i| Box::new(ProbeWidget::with_log(i, log.clone())) as Box<dyn deckhand_engine::Widget>)
        .collect();
    let deck = Deck::new(PathBuf::from("timing.deck"), widgets, Vec::new());
    let engine = Engine::new(dev.clone(), deck, Services::detached(), 80);
    let handle = engine.handle();
    let task = tokio::spawn(engine.run());
    settle().await;
    Fixture {
        dev,
        log,
        handle,
        task,
    }
}

impl Fixture {
    fn triggers(&self) -> Vec<(u8, bool)> {
        self.log.lock().unwrap().clone()
    }

    async fn finish(self) {
        self.handle.shutdown();
        settle().await;
        self.task.await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn short_press_fires_once() {
    let fx = start().await;

    fx.dev.press(0);
    settle().await;
    advance(Duration::from_millis(100)).await;
    fx.dev.release(0);
    settle().await;
    assert_eq!(fx.triggers(), vec![(0, false)]);

    // The armed watch expires without firing.
    advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(fx.triggers(), vec![(0, false)]);

    fx.finish().await;
}

#[tokio::test(start_paused = true)]
async fn held_key_fires_long_press_only() {
    let fx = start().await;

    fx.dev.press(1);
    settle().await;
    advance(Duration::from_millis(400)).await;
    settle().await;
    assert_eq!(fx.triggers(), vec![(1, true)]);

    // The late release adds nothing.
    fx.dev.release(1);
    settle().await;
    advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(fx.triggers(), vec![(1, true)]);

    fx.finish().await;
}

#[tokio::test(start_paused = true)]
async fn release_exactly_at_threshold_is_a_long_press() {
    let fx = start().await;

    fx.dev.press(0);
    settle().await;
    advance(Duration::from_millis(350)).await;
    settle().await;
    fx.dev.release(0);
    settle().await;
    advance(Duration::from_millis(500)).await;
    settle().await;

    // A hold of exactly 350ms is not "shorter than" the threshold.
    assert_eq!(fx.triggers(), vec![(0, true)]);

    fx.finish().await;
}

#[tokio::test(start_paused = true)]
async fn duplicate_reports_are_debounced() {
    let fx = start().await;

    fx.dev.press(2);
    fx.dev.inject(KeyEvent {
        index: 2,
        pressed: true,
    });
    settle().await;
    advance(Duration::from_millis(400)).await;
    settle().await;
    fx.dev.release(2);
    fx.dev.release(2);
    settle().await;
    advance(Duration::from_millis(500)).await;
    settle().await;

    assert_eq!(fx.triggers(), vec![(2, true)]);

    fx.finish().await;
}

#[tokio::test(start_paused = true)]
async fn stale_watch_ignores_a_new_press() {
    let fx = start().await;

    // First press released short; a second press starts before the first
    // press's watch would have fired.
    fx.dev.press(0);
    settle().await;
    advance(Duration::from_millis(200)).await;
    fx.dev.release(0);
    fx.dev.press(0);
    settle().await;
    assert_eq!(fx.triggers(), vec![(0, false)]);

    // t=350 from the first press: the stale watch must not fire against
    // the second press.
    advance(Duration::from_millis(150)).await;
    settle().await;
    assert_eq!(fx.triggers(), vec![(0, false)]);

    // Second press released at 300ms held: another short press.
    advance(Duration::from_millis(150)).await;
    fx.dev.release(0);
    settle().await;
    advance(Duration::from_millis(500)).await;
    settle().await;
    assert_eq!(fx.triggers(), vec![(0, false), (0, false)]);

    fx.finish().await;
}
