//! Tracks the share picker's lifetime through window focus.
//!
//! `NSSharingServicePicker` reports nothing when it closes. The window loses
//! focus while the picker (or the chosen service) is up and regains it when
//! the user is done, so a loss followed by a regain marks dismissal. If focus
//! never moves within the grace period the picker is treated as gone.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc, Mutex, MutexGuard, OnceLock,
};
use std::time::Duration;

use tauri::{Runtime, Window, WindowEvent};

use crate::Error;

const DISMISS_GRACE: Duration = Duration::from_millis(250);
const DISMISS_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PickerPhase {
    Shown,
    Covered,
    Dismissed,
}

#[derive(Debug)]
struct PickerTracker {
    phase: PickerPhase,
    notify: Option<mpsc::Sender<()>>,
}

impl PickerTracker {
    fn idle() -> Self {
        Self {
            phase: PickerPhase::Dismissed,
            notify: None,
        }
    }

    fn start(&mut self, notify: mpsc::Sender<()>) {
        self.phase = PickerPhase::Shown;
        self.notify = Some(notify);
    }

    /// Returns true when this transition dismissed the picker.
    fn on_focus(&mut self, focused: bool) -> bool {
        match (self.phase, focused) {
            (PickerPhase::Shown, false) => {
                self.phase = PickerPhase::Covered;
                false
            }
            (PickerPhase::Covered, true) => self.dismiss(),
            _ => false,
        }
    }

    fn on_grace_elapsed(&mut self) -> bool {
        self.phase == PickerPhase::Shown && self.dismiss()
    }

    fn on_destroyed(&mut self) -> bool {
        self.phase != PickerPhase::Dismissed && self.dismiss()
    }

    fn dismiss(&mut self) -> bool {
        self.phase = PickerPhase::Dismissed;
        if let Some(tx) = self.notify.take() {
            let _ = tx.send(());
        }
        true
    }
}

struct WindowWatch {
    tracker: Mutex<PickerTracker>,
    listening: AtomicBool,
}

impl WindowWatch {
    fn tracker(&self) -> MutexGuard<'_, PickerTracker> {
        match self.tracker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Blocks until the picker started with [`watch_dismissal`] has gone away.
pub struct DismissalHandle {
    watch: Arc<WindowWatch>,
    rx: mpsc::Receiver<()>,
}

impl DismissalHandle {
    pub fn wait(self) {
        if self.rx.recv_timeout(DISMISS_TIMEOUT).is_err() {
            log::debug!("share picker dismissal not observed; resolving anyway");
        }
        self.watch.tracker().dismiss();
    }

    /// Stops watching, e.g. when the picker failed to show.
    pub fn cancel(self) {
        self.watch.tracker().dismiss();
    }
}

/// Starts watching `window` for the dismissal of a picker about to be shown.
pub fn watch_dismissal<R: Runtime>(window: &Window<R>) -> Result<DismissalHandle, Error> {
    let watch = window_watch(window.label())?;
    ensure_listener(window, watch.clone());

    let (tx, rx) = mpsc::channel();
    {
        let mut tracker = watch.tracker();
        if tracker.phase != PickerPhase::Dismissed {
            return Err(Error::NativeApi("Share already in progress.".to_string()));
        }
        tracker.start(tx);
    }

    let timer_watch = watch.clone();
    std::thread::spawn(move || {
        std::thread::sleep(DISMISS_GRACE);
        timer_watch.tracker().on_grace_elapsed();
    });

    Ok(DismissalHandle { watch, rx })
}

fn ensure_listener<R: Runtime>(window: &Window<R>, watch: Arc<WindowWatch>) {
    if watch.listening.swap(true, Ordering::SeqCst) {
        return;
    }
    let label = window.label().to_string();
    window.on_window_event(move |event| match event {
        WindowEvent::Focused(focused) => {
            watch.tracker().on_focus(*focused);
        }
        WindowEvent::Destroyed => {
            watch.tracker().on_destroyed();
            if let Ok(mut map) = watches().lock() {
                map.remove(&label);
            }
        }
        _ => {}
    });
}

fn window_watch(label: &str) -> Result<Arc<WindowWatch>, Error> {
    let mut map = watches()
        .lock()
        .map_err(|_| Error::NativeApi("Share picker registry poisoned.".to_string()))?;
    Ok(map
        .entry(label.to_string())
        .or_insert_with(|| {
            Arc::new(WindowWatch {
                tracker: Mutex::new(PickerTracker::idle()),
                listening: AtomicBool::new(false),
            })
        })
        .clone())
}

fn watches() -> &'static Mutex<HashMap<String, Arc<WindowWatch>>> {
    static WATCHES: OnceLock<Mutex<HashMap<String, Arc<WindowWatch>>>> = OnceLock::new();
    WATCHES.get_or_init(|| Mutex::new(HashMap::new()))
}
