// Evidence-frame gallery: a bounded strip of heatmap thumbnails and the
// modal viewer over them, with focus returned to the opening thumbnail.

use crate::detect::MAX_EVIDENCE_FRAMES;

pub const EMPTY_MESSAGE: &str = "No heatmap highlights for this file.";

#[derive(Debug, Default)]
pub struct HeatmapGallery {
    frames: Vec<String>,
    active_index: Option<usize>,
    last_trigger: Option<usize>,
}

impl HeatmapGallery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the frame list, silently truncating to the cap. An open
    /// modal is closed first so it never shows a stale frame.
    pub fn set_frames(&mut self, frames: Vec<String>) {
        if self.active_index.is_some() {
            self.close();
        }
        self.frames = frames;
        self.frames.truncate(MAX_EVIDENCE_FRAMES);
    }

    pub fn clear(&mut self) {
        self.set_frames(Vec::new());
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Message shown in place of thumbnails when there are no frames.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.is_empty().then_some(EMPTY_MESSAGE)
    }

    pub fn data_url(&self, index: usize) -> Option<String> {
        self.frames
            .get(index)
            .map(|frame| format!("data:image/png;base64,{frame}"))
    }

    /// Opens the modal on a frame. No-op when the index has no frame. The
    /// triggering thumbnail index is remembered for focus return.
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.frames.len() {
            return false;
        }
        self.last_trigger = Some(index);
        self.active_index = Some(index);
        true
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn is_open(&self) -> bool {
        self.active_index.is_some()
    }

    /// Closes the modal and reports which thumbnail should regain keyboard
    /// focus. The trigger reference is cleared either way.
    pub fn close(&mut self) -> Option<usize> {
        self.active_index = None;
        self.last_trigger.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("frame{i}")).collect()
    }

    #[test]
    fn truncates_to_six_frames() {
        let mut gallery = HeatmapGallery::new();
        gallery.set_frames(frames(9));
        assert_eq!(gallery.frames().len(), 6);
    }

    #[test]
    fn empty_state_message() {
        let gallery = HeatmapGallery::new();
        assert_eq!(gallery.empty_message(), Some(EMPTY_MESSAGE));
    }

    #[test]
    fn open_is_noop_out_of_range() {
        let mut gallery = HeatmapGallery::new();
        gallery.set_frames(frames(2));
        assert!(!gallery.open(2));
        assert!(!gallery.is_open());
        assert!(gallery.open(1));
        assert_eq!(gallery.active_index(), Some(1));
    }

    #[test]
    fn close_returns_focus_to_trigger_once() {
        let mut gallery = HeatmapGallery::new();
        gallery.set_frames(frames(3));
        gallery.open(2);
        assert_eq!(gallery.close(), Some(2));
        assert_eq!(gallery.close(), None);
    }

    #[test]
    fn replacing_frames_closes_open_modal() {
        let mut gallery = HeatmapGallery::new();
        gallery.set_frames(frames(3));
        gallery.open(0);
        gallery.set_frames(frames(1));
        assert!(!gallery.is_open());
    }

    #[test]
    fn data_urls_embed_the_frame() {
        let mut gallery = HeatmapGallery::new();
        gallery.set_frames(vec!["abc123".to_string()]);
        assert_eq!(
            gallery.data_url(0).as_deref(),
            Some("data:image/png;base64,abc123")
        );
        assert_eq!(gallery.data_url(1), None);
    }
}
