/// Typewriter reveal: node text appears one character per tick.

/// Milliseconds per revealed character unless configured otherwise.
pub const DEFAULT_MS_PER_CHAR: u64 = 50;

/// Incrementally reveals a passage as time advances. Dropping it or
/// calling [`skip`](Typewriter::skip) is the cancellation.
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    /// byte offset of every char boundary after the first char
    boundaries: Vec<usize>,
    ms_per_char: u64,
    elapsed_ms: u64,
    revealed: usize,
}

impl Typewriter {
    pub fn new(text: impl Into<String>, ms_per_char: u64) -> Self {
        let text = text.into();
        let boundaries = text
            .char_indices()
            .map(|(i, c)| i + c.len_utf8())
            .collect();
        Self {
            text,
            boundaries,
            ms_per_char,
            elapsed_ms: 0,
            revealed: 0,
        }
    }

    /// Advance the clock and return the text revealed so far.
    pub fn advance(&mut self, elapsed_ms: u64) -> &str {
        self.elapsed_ms = self.elapsed_ms.saturating_add(elapsed_ms);
        let total = self.boundaries.len();
        self.revealed = if self.ms_per_char == 0 {
            total
        } else {
            usize::try_from(self.elapsed_ms / self.ms_per_char)
                .unwrap_or(usize::MAX)
                .min(total)
        };
        self.visible()
    }

    pub fn visible(&self) -> &str {
        match self.revealed {
            0 => "",
            n => &self.text[..self.boundaries[n - 1]],
        }
    }

    /// Reveal everything immediately.
    pub fn skip(&mut self) -> &str {
        self.revealed = self.boundaries.len();
        self.elapsed_ms = self.duration_ms();
        &self.text
    }

    pub fn is_finished(&self) -> bool {
        self.revealed == self.boundaries.len()
    }

    /// Time the full reveal takes.
    pub fn duration_ms(&self) -> u64 {
        self.ms_per_char.saturating_mul(self.boundaries.len() as u64)
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_one_char_per_step() {
        let mut tw = Typewriter::new("Hello", DEFAULT_MS_PER_CHAR);
        assert_eq!(tw.advance(0), "");
        assert_eq!(tw.advance(49), "");
        assert_eq!(tw.advance(1), "H");
        assert_eq!(tw.advance(100), "Hel");
        assert!(!tw.is_finished());
        assert_eq!(tw.advance(1000), "Hello");
        assert!(tw.is_finished());
    }

    #[test]
    fn multibyte_text_slices_on_char_boundaries() {
        let mut tw = Typewriter::new("Ærø", 10);
        assert_eq!(tw.advance(10), "Æ");
        assert_eq!(tw.advance(10), "Ær");
        assert_eq!(tw.advance(10), "Ærø");
    }

    #[test]
    fn skip_completes() {
        let mut tw = Typewriter::new("The third chamber is treacherous.", 50);
        tw.advance(100);
        assert_eq!(tw.skip(), "The third chamber is treacherous.");
        assert!(tw.is_finished());
    }

    #[test]
    fn zero_speed_is_instant() {
        let mut tw = Typewriter::new("now", 0);
        assert_eq!(tw.advance(0), "now");
    }

    #[test]
    fn empty_text_is_finished() {
        let tw = Typewriter::new("", 50);
        assert!(tw.is_finished());
        assert_eq!(tw.duration_ms(), 0);
    }
}
