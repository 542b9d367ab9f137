/// Characters that make up receipt-number and timestamp noise.
const NUMERIC_NOISE: &[char] = &['.', ',', ':', '/', '-', '$', '%', '#'];

const DEFAULT_MAX_LEN: usize = 25;

/// Chooses a short label, typically the merchant name, from recognized lines.
#[derive(Debug, Clone)]
pub struct DescriptionResolver {
    max_len: usize,
}

impl Default for DescriptionResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN)
    }
}

impl DescriptionResolver {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// First line with a letter in it; failing that, the first line that is
    /// not pure numeric noise; failing that, an empty string.
    pub fn resolve<S: AsRef<str>>(&self, lines: &[S]) -> String {
        let trimmed = || lines.iter().map(|l| l.as_ref().trim()).filter(|l| !l.is_empty());

        trimmed()
            .find(|l| l.chars().any(char::is_alphabetic))
            .or_else(|| trimmed().find(|l| !is_numeric_noise(l)))
            .map(|l| self.truncate(l))
            .unwrap_or_default()
    }

    fn truncate(&self, line: &str) -> String {
        let cut: String = line.chars().take(self.max_len).collect();
        cut.trim_end().to_string()
    }
}

fn is_numeric_noise(line: &str) -> bool {
    line.chars()
        .all(|c| c.is_ascii_digit() || c.is_whitespace() || NUMERIC_NOISE.contains(&c))
}
