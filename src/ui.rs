use crate::calibration::CalibrationPhase;
use crate::events::GazeEvent;
use crate::target::InteractiveTarget;
use std::io::Write;

const BARS: [&str; 9] = [" ", "▁", "▂", "▃", "▄", "▅", "▆", "▇", "█"];

/// Dwell progress as a short bar (0.0-1.0).
pub fn dwell_bar(progress: f32) -> String {
    let steps = (progress.clamp(0.0, 1.0) * 8.0).round() as usize;
    BARS[steps].to_string()
}

pub fn hover(label: &str, progress: f32) {
    print!("\r\x1b[K\x1b[33m{} {}\x1b[0m", dwell_bar(progress), label);
    std::io::stdout().flush().ok();
}

pub fn clear_line() {
    print!("\r\x1b[K");
    std::io::stdout().flush().ok();
}

pub fn show_buffer(text: &str) {
    print!("\r\x1b[K> {}\n", text);
    std::io::stdout().flush().ok();
}

pub fn show_calibration(phase: CalibrationPhase, message: &str) {
    let color = match phase {
        CalibrationPhase::Succeeded => "32",
        _ => "36",
    };
    print!("\r\x1b[K\x1b[{}m[calibration] {}\x1b[0m\n", color, message);
    std::io::stdout().flush().ok();
}

/// Render one notification. Cursor moves are too chatty for a terminal.
pub fn render(event: &GazeEvent) {
    match event {
        GazeEvent::Cursor { .. } => {}
        GazeEvent::HoverEntered { label, .. } => hover(label, 0.0),
        GazeEvent::HoverLeft { .. } => clear_line(),
        GazeEvent::Committed(commit) => show_buffer(&commit.buffer),
        GazeEvent::Calibration { phase, message } => show_calibration(*phase, message),
    }
}

/// Render everything queued so far without blocking.
pub fn drain(rx: &flume::Receiver<GazeEvent>) {
    for event in rx.try_iter() {
        render(&event);
    }
}

pub fn print_layout(targets: &[InteractiveTarget]) {
    for t in targets {
        println!(
            "{:<20} {:<6} {:<12} x={:<7.1} y={:<7.1} w={:<7.1} h={:<7.1}",
            t.id,
            t.label,
            t.action.to_string(),
            t.rect.x,
            t.rect.y,
            t.rect.width,
            t.rect.height
        );
    }
}
