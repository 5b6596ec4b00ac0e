//! Add-task form for the terminal user interface.

use crate::tui::input::InputField;

pub const TEXT_FIELD: usize = 0;
pub const DESCRIPTION_FIELD: usize = 1;
const FIELD_COUNT: usize = 2;

/// Text and description inputs for a new task.
#[derive(Default)]
pub struct TaskForm {
    pub text: InputField,
    pub description: InputField,
    pub current_field: usize,
}

impl TaskForm {
    pub fn new() -> Self {
        let mut form = Self::default();
        form.update_active_field();
        form
    }

    /// Sync the `active` flags with `current_field`.
    pub fn update_active_field(&mut self) {
        self.text.active = self.current_field == TEXT_FIELD;
        self.description.active = self.current_field == DESCRIPTION_FIELD;
    }

    pub fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % FIELD_COUNT;
        self.update_active_field();
    }

    pub fn previous_field(&mut self) {
        self.current_field = (self.current_field + FIELD_COUNT - 1) % FIELD_COUNT;
        self.update_active_field();
    }

    /// The input that currently receives keystrokes.
    pub fn active_input(&mut self) -> &mut InputField {
        match self.current_field {
            DESCRIPTION_FIELD => &mut self.description,
            _ => &mut self.text,
        }
    }

    /// Clear both inputs and return focus to the text field.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}
