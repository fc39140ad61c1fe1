//! crates/travel_tracker_core/src/theme.rs
//!
//! Light/dark theme held as application state. Views subscribe to the
//! provider instead of reading or mutating a shared document node.

use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn from_dark(dark: bool) -> Self {
        if dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

pub struct ThemeProvider {
    tx: watch::Sender<Theme>,
}

impl ThemeProvider {
    /// Starts from the system preference.
    pub fn new(prefers_dark: bool) -> Self {
        let (tx, _rx) = watch::channel(Theme::from_dark(prefers_dark));
        Self { tx }
    }

    pub fn current(&self) -> Theme {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.tx.subscribe()
    }

    pub fn toggle(&self) -> Theme {
        let next = Theme::from_dark(!self.current().is_dark());
        self.tx.send_replace(next);
        next
    }

    /// Applies a change of the system color-scheme preference.
    pub fn follow_system(&self, prefers_dark: bool) {
        self.tx.send_if_modified(|theme| {
            let next = Theme::from_dark(prefers_dark);
            let changed = *theme != next;
            *theme = next;
            changed
        });
    }
}
