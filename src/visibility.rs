//! Viewport visibility tracking.
//!
//! The presentation layer feeds intersection ratios in; the observer reports
//! boolean visible/hidden transitions out, both as a return value and
//! through an optional callback.

use std::sync::Arc;

type VisibilityHandler = Arc<dyn Fn(bool) + Send + Sync>;

pub struct VisibilityObserver {
    threshold: f32,
    trigger_once: bool,
    visible: bool,
    frozen: bool,
    on_change: Option<VisibilityHandler>,
}

impl VisibilityObserver {
    /// `threshold` is the fraction of the element that must be on screen
    /// for it to count as visible.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            trigger_once: false,
            visible: false,
            frozen: false,
            on_change: None,
        }
    }

    /// Stop reporting after the first transition to visible.
    pub fn with_trigger_once(mut self, trigger_once: bool) -> Self {
        self.trigger_once = trigger_once;
        self
    }

    pub fn on_change<F>(&mut self, cb: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(cb));
    }

    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Feed the current intersection ratio. Returns the new visibility when
    /// it changed, `None` otherwise.
    pub fn observe(&mut self, ratio: f32) -> Option<bool> {
        if self.frozen {
            return None;
        }
        let now = ratio > 0.0 && ratio >= self.threshold;
        if now == self.visible {
            return None;
        }
        self.visible = now;
        if self.trigger_once && now {
            self.frozen = true;
        }
        if let Some(cb) = &self.on_change {
            cb(now);
        }
        Some(now)
    }
}

impl Default for VisibilityObserver {
    fn default() -> Self {
        Self::new(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn reports_only_transitions() {
        let mut obs = VisibilityObserver::default();
        assert_eq!(obs.observe(0.2), None);
        assert_eq!(obs.observe(0.6), Some(true));
        assert_eq!(obs.observe(0.9), None);
        assert_eq!(obs.observe(0.1), Some(false));
        assert!(!obs.is_visible());
    }

    #[test]
    fn trigger_once_freezes_after_first_reveal() {
        let mut obs = VisibilityObserver::new(0.5).with_trigger_once(true);
        assert_eq!(obs.observe(0.5), Some(true));
        assert_eq!(obs.observe(0.0), None);
        assert!(obs.is_visible());
    }

    #[test]
    fn callback_sees_each_transition() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut obs = VisibilityObserver::default();
        obs.on_change(move |v| sink.lock().unwrap().push(v));
        obs.observe(1.0);
        obs.observe(0.0);
        obs.observe(1.0);
        assert_eq!(*seen.lock().unwrap(), vec![true, false, true]);
    }
}
