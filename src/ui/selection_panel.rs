//! Selection list panel
//!
//! Read-only colored labels for the currently selected concepts. The list
//! is fed one-way from the canonical selection; it never initiates
//! selection changes, so entries are plain text rather than selectables.

use crate::selection::SelectionListModel;

pub fn selection_panel(
    ui: &imgui::Ui,
    list: &SelectionListModel,
    position: [f32; 2],
    size: [f32; 2],
) -> SelectionPanelOutput {
    let mut output = SelectionPanelOutput::default();

    ui.window("Selection")
        .position(position, imgui::Condition::FirstUseEver)
        .size(size, imgui::Condition::FirstUseEver)
        .build(|| {
            ui.text(format!("{} selected", list.len()));
            ui.same_line();
            if ui.small_button("Clear") {
                output.clear_requested = true;
            }
            ui.separator();

            ui.child_window("selection_entries").build(|| {
                for entry in list.entries() {
                    let [r, g, b] = entry.color;
                    ui.text_colored([r, g, b, 1.0], &entry.name);
                }
            });
        });

    output
}

#[derive(Debug, Default)]
pub struct SelectionPanelOutput {
    pub clear_requested: bool,
}
