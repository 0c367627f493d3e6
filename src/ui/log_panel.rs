//! Session log panel
//!
//! Displays the tail of the session log as fed by the background watcher.
//! Sticks to the bottom while the user hasn't scrolled away.

pub fn log_panel(ui: &imgui::Ui, lines: &[String], position: [f32; 2], size: [f32; 2]) {
    ui.window("Log")
        .position(position, imgui::Condition::FirstUseEver)
        .size(size, imgui::Condition::FirstUseEver)
        .build(|| {
            ui.child_window("log_lines").build(|| {
                for line in lines {
                    ui.text_wrapped(line);
                }
                if ui.scroll_y() >= ui.scroll_max_y() - 1.0 {
                    ui.set_scroll_here_y_with_ratio(1.0);
                }
            });
        });
}
