// Playback view-state for the single active media element: progress bar,
// time labels, play/pause intent, and ownership of the local object URL.

/// What the player element is currently pointed at. Local sources hold an
/// object URL that must be revoked when the source is replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Local(String),
    Remote(String),
}

impl MediaSource {
    pub fn url(&self) -> &str {
        match self {
            MediaSource::Local(url) | MediaSource::Remote(url) => url,
        }
    }
}

/// Mirrors the media element's timing signals and owns at most one source.
/// All timing fields are last-writer-wins; the UI feeds them on every
/// timeupdate.
#[derive(Debug, Default)]
pub struct PlayerState {
    source: Option<MediaSource>,
    current_time: f64,
    duration: f64,
    paused: bool,
}

impl PlayerState {
    pub fn new() -> Self {
        Self {
            source: None,
            current_time: 0.0,
            duration: 0.0,
            paused: true,
        }
    }

    pub fn source(&self) -> Option<&MediaSource> {
        self.source.as_ref()
    }

    /// Points the player at a new source, resetting timing. Returns the
    /// previously held local object URL, if any, so the caller can revoke it.
    pub fn set_source(&mut self, source: MediaSource) -> Option<String> {
        let released = self.take_local_url();
        self.source = Some(source);
        self.reset_timing();
        released
    }

    /// Detaches the current source entirely. Returns any released local URL.
    pub fn clear(&mut self) -> Option<String> {
        let released = self.take_local_url();
        self.source = None;
        self.reset_timing();
        released
    }

    fn take_local_url(&mut self) -> Option<String> {
        match self.source.take() {
            Some(MediaSource::Local(url)) => Some(url),
            other => {
                self.source = other;
                None
            }
        }
    }

    fn reset_timing(&mut self) {
        self.current_time = 0.0;
        self.duration = 0.0;
        self.paused = true;
    }

    pub fn reset(&mut self) {
        self.reset_timing();
    }

    /// Mirror of the element's timeupdate / play / pause signals.
    pub fn apply_timing(&mut self, current_time: f64, duration: f64, paused: bool) {
        self.current_time = if current_time.is_finite() {
            current_time.max(0.0)
        } else {
            0.0
        };
        self.duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.paused = paused;
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Desired paused state after a play/pause toggle.
    pub fn toggle(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Target position after seeking by `offset` seconds, clamped to
    /// [0, duration]. Also applies it to the mirrored time.
    pub fn seek_offset(&mut self, offset: f64) -> f64 {
        let upper = if self.duration > 0.0 {
            self.duration
        } else {
            (self.current_time + offset).max(0.0)
        };
        self.current_time = (self.current_time + offset).clamp(0.0, upper);
        self.current_time
    }

    pub fn progress_percent(&self) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        ((self.current_time / self.duration) * 100.0).clamp(0.0, 100.0)
    }

    pub fn current_time_label(&self) -> String {
        format_clock(self.current_time)
    }

    pub fn duration_label(&self) -> String {
        format_clock(self.duration)
    }
}

/// `m:ss` clock label; anything non-finite renders as 0:00.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() {
        return "0:00".to_string();
    }
    let total = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
