//! Command history
//!
//! Two stacks: undo grows without bound, redo is capped. Executing a fresh
//! command invalidates the whole forward history; the cap matters on the
//! path where the redo stack actually grows, `undo()`, which evicts the
//! oldest entry once the cap is exceeded.

use std::collections::VecDeque;

use log::debug;

use super::Command;

/// Default bound on the redo history
pub const REDO_CAP: usize = 20;

#[derive(Default)]
pub struct CommandManager {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: VecDeque<Box<dyn Command>>,
    redo_cap: usize,
}

impl CommandManager {
    pub fn new() -> Self {
        Self::with_redo_cap(REDO_CAP)
    }

    pub fn with_redo_cap(redo_cap: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: VecDeque::new(),
            redo_cap,
        }
    }

    /// Runs a fresh command and records it. Forward history becomes
    /// meaningless at this point and is dropped entirely.
    pub fn execute_command(&mut self, mut command: Box<dyn Command>) {
        debug!("execute: {}", command.name());
        command.execute();
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// Reverts the most recent command; no-op on an empty history.
    pub fn undo(&mut self) -> bool {
        let Some(mut command) = self.undo_stack.pop() else {
            return false;
        };
        debug!("undo: {}", command.name());
        command.undo();
        self.redo_stack.push_back(command);
        while self.redo_stack.len() > self.redo_cap {
            self.redo_stack.pop_front();
        }
        true
    }

    /// Re-applies the most recently undone command; no-op when nothing is
    /// pending.
    pub fn redo(&mut self) -> bool {
        let Some(mut command) = self.redo_stack.pop_back() else {
            return false;
        };
        debug!("redo: {}", command.name());
        command.execute();
        self.undo_stack.push(command);
        true
    }

    /// Name of the command `undo()` would revert, for menu labels.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|c| c.name())
    }

    /// Name of the command `redo()` would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.back().map(|c| c.name())
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn adder(name: &str, amount: i32, value: &Rc<RefCell<i32>>) -> Box<dyn Command> {
        let up = Rc::clone(value);
        let down = Rc::clone(value);
        Box::new(FnCommand::new(
            name,
            move || *up.borrow_mut() += amount,
            move || *down.borrow_mut() -= amount,
        ))
    }

    #[test]
    fn test_execute_undo_redo_round_trip() {
        let value = Rc::new(RefCell::new(0));
        let mut manager = CommandManager::new();

        manager.execute_command(adder("Add Five", 5, &value));
        assert_eq!(*value.borrow(), 5);

        assert!(manager.undo());
        assert_eq!(*value.borrow(), 0);

        assert!(manager.redo());
        assert_eq!(*value.borrow(), 5);
    }

    #[test]
    fn test_undo_redo_empty_are_noops() {
        let mut manager = CommandManager::new();
        assert!(!manager.undo());
        assert!(!manager.redo());
    }

    #[test]
    fn test_labels_follow_stack_tops() {
        let value = Rc::new(RefCell::new(0));
        let mut manager = CommandManager::new();

        manager.execute_command(adder("First", 1, &value));
        manager.execute_command(adder("Second", 2, &value));
        assert_eq!(manager.undo_label(), Some("Second"));
        assert_eq!(manager.redo_label(), None);

        manager.undo();
        assert_eq!(manager.undo_label(), Some("First"));
        assert_eq!(manager.redo_label(), Some("Second"));
    }

    #[test]
    fn test_execute_clears_forward_history() {
        let value = Rc::new(RefCell::new(0));
        let mut manager = CommandManager::new();

        manager.execute_command(adder("First", 1, &value));
        manager.undo();
        assert_eq!(manager.redo_depth(), 1);

        manager.execute_command(adder("Second", 2, &value));
        assert_eq!(manager.redo_depth(), 0);
        assert!(!manager.redo());
        assert_eq!(*value.borrow(), 2);
    }

    #[test]
    fn test_redo_cap_evicts_oldest() {
        let value = Rc::new(RefCell::new(0));
        let mut manager = CommandManager::with_redo_cap(3);

        for i in 0..5 {
            manager.execute_command(adder(&format!("Cmd {i}"), 1, &value));
        }
        for _ in 0..5 {
            assert!(manager.undo());
            assert!(manager.redo_depth() <= 3);
        }

        assert_eq!(manager.redo_depth(), 3);
        // Cmd 4 and Cmd 3 were undone first and evicted first; the most
        // recently undone command is next in line to redo
        assert_eq!(manager.redo_label(), Some("Cmd 0"));

        // Only the capped tail can be redone
        let mut redone = 0;
        while manager.redo() {
            redone += 1;
        }
        assert_eq!(redone, 3);
        assert_eq!(*value.borrow(), 3);
    }
}
