#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    Escape,
    SingleQuote,
    DoubleQuote,
    Comment,
    VariableExpand,
    CommandSubstitution,
    Heredoc,
}

/// Enclosing states of the lexer. Pushing past `max_depth` fails instead of growing.
#[derive(Debug)]
pub struct StateStack {
    states: Vec<LexState>,
    max_depth: usize,
}

impl StateStack {
    pub fn new(max_depth: usize) -> Self {
        StateStack {
            states: Vec::new(),
            max_depth,
        }
    }

    /// Returns `false` when the stack is full.
    #[must_use]
    pub fn push(&mut self, state: LexState) -> bool {
        if self.states.len() >= self.max_depth {
            return false;
        }
        self.states.push(state);
        true
    }

    /// Popping an empty stack yields `Normal`.
    pub fn pop(&mut self) -> LexState {
        self.states.pop().unwrap_or(LexState::Normal)
    }

    pub fn top(&self) -> Option<LexState> {
        self.states.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_order() {
        let mut stack = StateStack::new(4);
        assert!(stack.push(LexState::Normal));
        assert!(stack.push(LexState::DoubleQuote));
        assert_eq!(stack.top(), Some(LexState::DoubleQuote));
        assert_eq!(stack.pop(), LexState::DoubleQuote);
        assert_eq!(stack.pop(), LexState::Normal);
        assert_eq!(stack.pop(), LexState::Normal);
        assert_eq!(stack.top(), None);
    }

    #[test]
    fn test_bounded() {
        let mut stack = StateStack::new(1);
        assert!(stack.push(LexState::Normal));
        assert!(!stack.push(LexState::DoubleQuote));
        assert_eq!(stack.top(), Some(LexState::Normal));
    }
}
