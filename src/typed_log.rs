#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

/// One accepted keystroke, compared against the target character at its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypedEntry {
    pub character: char,
    pub outcome: Outcome,
    /// Arrival time in milliseconds on the host clock.
    pub timestamp_ms: u64,
}

impl TypedEntry {
    pub fn new(character: char, expected: char, timestamp_ms: u64) -> Self {
        let outcome = if character == expected {
            Outcome::Correct
        } else {
            Outcome::Incorrect
        };
        Self {
            character,
            outcome,
            timestamp_ms,
        }
    }

    pub fn is_correct(&self) -> bool {
        self.outcome == Outcome::Correct
    }
}

/// Ordered record of accepted keystrokes.
///
/// Entry `i` is always the attempt at target slot `i`: the log only grows at the
/// tail and only shrinks from the tail.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypedLog {
    entries: Vec<TypedEntry>,
}

impl TypedLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[TypedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, entry: TypedEntry) {
        self.entries.push(entry);
    }

    /// Removes the last entry, if any.
    pub fn pop(&mut self) -> Option<TypedEntry> {
        self.entries.pop()
    }

    /// Truncates back through the nearest word boundary: trailing spaces first,
    /// then the run of characters before them up to a space or newline.
    ///
    /// Returns the number of entries removed.
    pub fn delete_word(&mut self) -> usize {
        let chars = &self.entries;
        let mut end = chars.len();
        while end > 0 && chars[end - 1].character == ' ' {
            end -= 1;
        }
        while end > 0 && !matches!(chars[end - 1].character, ' ' | '\n') {
            end -= 1;
        }

        let removed = self.entries.len() - end;
        self.entries.truncate(end);
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn correct_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_correct()).count()
    }

    pub fn incorrect_count(&self) -> usize {
        self.len() - self.correct_count()
    }

    /// Length of the run of incorrect entries at the tail of the log.
    pub fn trailing_incorrect(&self) -> usize {
        self.entries
            .iter()
            .rev()
            .take_while(|e| !e.is_correct())
            .count()
    }
}
