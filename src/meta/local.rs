/// Per-sequence readout captured alongside a frame.
///
/// Only describes the most recently read sequence.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LocalMetadata {
    /// Time elapsed since the first frame, in milliseconds
    pub time_msec: f64,
    /// Stage X position
    pub x_pos: f64,
    /// Stage Y position
    pub y_pos: f64,
    /// Stage Z position
    pub z_pos: f64,
}

impl LocalMetadata {
    pub fn new(time_msec: f64, x_pos: f64, y_pos: f64, z_pos: f64) -> Self {
        Self {
            time_msec,
            x_pos,
            y_pos,
            z_pos,
        }
    }

    pub fn time_seconds(&self) -> f64 {
        self.time_msec * 1e-3
    }

    pub fn stage_position(&self) -> (f64, f64, f64) {
        (self.x_pos, self.y_pos, self.z_pos)
    }
}
