/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "P1 Left", "Pause").
    pub name: &'static str,
}

/// Machine-agnostic interface for emulated systems.
///
/// Each machine implements this trait to provide a uniform interface for the
/// front-end. The front-end is a pure rendering engine that does not know
/// about specific hardware (mappers, video chips, palette formats, etc.).
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run one frame of emulation (advance the clock by one frame's worth of cycles).
    fn run_frame(&mut self);

    /// Render the current video state into an RGB24 pixel buffer.
    ///
    /// The buffer must be at least `width * height * 3` bytes (from `display_size()`).
    /// Pixels are stored left-to-right, top-to-bottom, 3 bytes per pixel (R, G, B).
    fn render_frame(&self, buffer: &mut [u8]);

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    /// `pressed` is true for key-down, false for key-up.
    ///
    /// Called per-event, not per-frame. Each call latches the button state so
    /// that `run_frame()` sees the accumulated input.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Battery-backed RAM contents to persist, if the machine has any and
    /// it has been touched.
    fn save_nvram(&self) -> Option<&[u8]> {
        None
    }

    /// Restore battery-backed RAM saved by a previous session.
    fn load_nvram(&mut self, _data: &[u8]) {}

    /// Drain generated audio samples into `buffer`. Returns samples written.
    fn fill_audio(&mut self, buffer: &mut [i16]) -> usize;

    /// Sample rate of the audio produced by `fill_audio`.
    fn audio_sample_rate(&self) -> u32;

    /// Nominal frame rate for host pacing.
    fn frame_rate_hz(&self) -> f64;
}
