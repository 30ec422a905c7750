//! Comparison of a live typed buffer against a fixed target.
//!
//! Everything here works in character indices (Unicode scalar values), so a
//! range `[2, 5)` means "the third through fifth character", independent of
//! how many bytes those characters take in UTF-8.

/// Half-open range of character indices `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
}

impl CharRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, idx: usize) -> bool {
        self.start <= idx && idx < self.end
    }
}

/// Classification of a single typed character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mark {
    Correct,
    Error,
}

/// Untyped remainder of the target, rendered as zero-width ghost text after `anchor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub anchor: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub correct: Vec<CharRange>,
    pub errors: Vec<CharRange>,
    pub overlay: Option<Overlay>,
    pub match_index: usize,
    pub typed_len: usize,
    pub target_len: usize,
}

impl Partition {
    /// Every target character typed, nothing extra
    pub fn is_complete(&self) -> bool {
        self.match_index == self.target_len && self.typed_len == self.target_len
    }

    pub fn match_index(&self) -> usize {
        self.match_index
    }

    pub fn correct_count(&self) -> usize {
        self.correct.iter().map(CharRange::len).sum()
    }

    pub fn error_count(&self) -> usize {
        self.errors.iter().map(CharRange::len).sum()
    }
}

/// Partition `typed` against `target`.
///
/// Never fails: any pair of strings yields a valid partition. The result
/// depends only on the two inputs, so it can be recomputed from scratch after
/// arbitrary edits (paste, undo, multi-character deletes).
pub fn compute_partition(target: &str, typed: &str) -> Partition {
    let target: Vec<char> = target.chars().collect();
    let target_len = target.len();

    let match_index = typed
        .chars()
        .zip(target.iter())
        .take_while(|(t, e)| t == *e)
        .count();

    let mut correct = Vec::new();
    let mut errors = Vec::new();
    // start index and mark of the run currently being built
    let mut run: Option<(usize, Mark)> = None;
    let mut typed_len = 0;

    for (idx, c) in typed.chars().enumerate() {
        let mark = match target.get(idx) {
            Some(expected) if *expected == c => Mark::Correct,
            _ => Mark::Error,
        };

        match run {
            Some((_, current)) if current == mark => {}
            Some((start, current)) => {
                push_run(&mut correct, &mut errors, current, CharRange::new(start, idx));
                run = Some((idx, mark));
            }
            None => run = Some((idx, mark)),
        }
        typed_len = idx + 1;
    }

    if let Some((start, mark)) = run {
        push_run(&mut correct, &mut errors, mark, CharRange::new(start, typed_len));
    }

    let overlay = (match_index < target_len).then(|| Overlay {
        anchor: match_index,
        text: target[match_index..].iter().collect(),
    });

    Partition {
        correct,
        errors,
        overlay,
        match_index,
        typed_len,
        target_len,
    }
}

fn push_run(correct: &mut Vec<CharRange>, errors: &mut Vec<CharRange>, mark: Mark, range: CharRange) {
    match mark {
        Mark::Correct => correct.push(range),
        Mark::Error => errors.push(range),
    }
}
