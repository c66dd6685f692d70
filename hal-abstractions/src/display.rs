//! Text display collaborator
//!
//! Implementations own their frame buffer. `clear` and `draw_text` only
//! touch that buffer; nothing reaches the panel until `present`.

/// Monochrome pixel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    /// Lit pixel
    On,
    /// Dark pixel
    Off,
}

/// Buffered text display
pub trait Display {
    /// Transport or driver error
    type Error: core::fmt::Debug;

    /// Wipe the whole frame buffer
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Draw `text` with its top-left corner at (`x`, `y`)
    fn draw_text(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        foreground: Color,
        background: Color,
    ) -> Result<(), Self::Error>;

    /// Push the frame buffer to the panel
    fn present(&mut self) -> Result<(), Self::Error>;

    /// Switch the panel on or off. The frame buffer survives power-off.
    fn set_power(&mut self, on: bool) -> Result<(), Self::Error>;
}
