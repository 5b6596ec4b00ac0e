//! Color constants for the terminal user interface.

use ratatui::style::Color;

/// Pastel shades cycled across open tasks.
pub const PASTELS: [Color; 6] = [
    Color::Rgb(252, 231, 243), // pink
    Color::Rgb(219, 234, 254), // blue
    Color::Rgb(220, 252, 231), // green
    Color::Rgb(254, 249, 195), // yellow
    Color::Rgb(243, 232, 255), // purple
    Color::Rgb(255, 237, 213), // orange
];

/// Title accent
pub const PURPLE: Color = Color::Rgb(192, 132, 252);
/// Status bar and highlights
pub const PINK: Color = Color::Rgb(236, 72, 153);
/// Dark text on pastel backgrounds
pub const SLATE: Color = Color::Rgb(15, 23, 42);

/// Pastel for a task, stable across redraws.
pub fn pastel_for(id: u64) -> Color {
    PASTELS[(id as usize) % PASTELS.len()]
}
