use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a passage, unique for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PassageId(u64);

/// Identifier of a code, allocated from its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CodeId(u64);

impl PassageId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl CodeId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PassageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "passage-{}", self.0)
    }
}

impl fmt::Display for CodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code-{}", self.0)
    }
}

/// Monotonic id source owned by a session. Ids are never reused.
#[derive(Debug, Default, Clone)]
pub struct IdAllocator {
    next_passage: u64,
    next_code: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passage(&mut self) -> PassageId {
        let id = PassageId(self.next_passage);
        self.next_passage += 1;
        id
    }

    pub fn code(&mut self) -> CodeId {
        let id = CodeId(self.next_code);
        self.next_code += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_are_independent_and_monotonic() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.passage().to_string(), "passage-0");
        assert_eq!(ids.code().to_string(), "code-0");
        assert_eq!(ids.passage().to_string(), "passage-1");
        assert!(ids.code() > CodeId(0));
    }
}
