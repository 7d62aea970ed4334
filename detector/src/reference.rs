use motion_watch_common::frame::Frame;

/// The baseline every later frame is compared against.
///
/// Set once from the first captured frame and never replaced for the rest of
/// the run. Slow lighting drift is therefore not absorbed into the baseline.
#[derive(Debug, Default)]
pub struct ReferenceFrame {
    frame: Option<Frame>,
}

impl ReferenceFrame {
    /// Adopt `frame` as the baseline if none is held yet. Returns `true` if it was adopted.
    pub fn set_if_absent(&mut self, frame: Frame) -> bool {
        if self.frame.is_some() {
            return false;
        }
        self.frame = Some(frame);
        true
    }

    pub fn get(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.frame.is_some()
    }
}
