//! Non-empty value stack.
//!
//! Request names, request payloads and response bodies are all stacks: a
//! stage that rewrites a value pushes the new one and leaves the previous
//! value underneath, so later stages can still see what the caller asked for.
//!
//! A [`ValueStack`] always holds at least one value. The initial value is
//! supplied at construction and can never be popped, which makes
//! [`ValueStack::peek`] infallible.
//!
//! # Example
//!
//! ```
//! use synergy_core::ValueStack;
//!
//! let mut names = ValueStack::new("${HOME}/a.txt".to_string());
//! names.push("/home/me/a.txt".to_string());
//!
//! assert_eq!(names.peek(), "/home/me/a.txt");
//! assert_eq!(names.depth(), 2);
//! assert_eq!(names.bottom(), "${HOME}/a.txt");
//! ```

use std::mem;

/// A growable stack that is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueStack<T> {
    /// The currently effective value.
    top: T,
    /// Earlier values, oldest first.
    below: Vec<T>,
}

impl<T> ValueStack<T> {
    /// Creates a stack holding a single initial value.
    pub fn new(initial: T) -> Self {
        Self {
            top: initial,
            below: Vec::new(),
        }
    }

    /// Returns the currently effective value.
    pub fn peek(&self) -> &T {
        &self.top
    }

    /// Returns a mutable reference to the currently effective value.
    pub fn peek_mut(&mut self) -> &mut T {
        &mut self.top
    }

    /// Pushes a new effective value, keeping the previous one beneath it.
    pub fn push(&mut self, value: T) {
        let previous = mem::replace(&mut self.top, value);
        self.below.push(previous);
    }

    /// Removes and returns the top value.
    ///
    /// Returns `None` when only the initial value remains; the stack never
    /// becomes empty.
    pub fn pop(&mut self) -> Option<T> {
        let next_top = self.below.pop()?;
        Some(mem::replace(&mut self.top, next_top))
    }

    /// Returns the value the stack was constructed with.
    pub fn bottom(&self) -> &T {
        self.below.first().unwrap_or(&self.top)
    }

    /// Returns the number of values on the stack (always at least one).
    pub fn depth(&self) -> usize {
        self.below.len() + 1
    }

    /// Iterates from the top (most recent) to the bottom (initial) value.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.top).chain(self.below.iter().rev())
    }
}

impl<T: Default> Default for ValueStack<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> From<T> for ValueStack<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
