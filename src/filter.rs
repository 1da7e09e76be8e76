use regex::RegexSet;

/// Lines whose text matches any of these are dropped from the filtered log
/// copies. Collected from real client runs; the list is append-only.
///
/// TODO: `[common|present]` in the d3d12 entry is a character class, not an
/// alternation of the two state names; confirm which lines it is meant to
/// drop before widening it.
pub const DEFAULT_NOISE_PATTERNS: &[&str] = &[
    "wgpu_hal::auxil::dxgi::exception",
    "d3d12_resource_state_[common|present]",
    "Tracy frame mark",
    "ID3D12CommandQueue",
];

/*
    @@@
    @NoiseFilter;
    . Wraps a compiled regex set built once at startup and read-only afterwards.
    . A line is dropped when ANY pattern finds a match anywhere in it (search,
      not full-match); evaluation order never changes the result.
    . Pure and Sync: safe to share between the pump task and the command loop.
*/
#[derive(Debug)]
pub struct NoiseFilter {
    set: RegexSet,
}

impl NoiseFilter {
    pub fn new<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(NoiseFilter {
            set: RegexSet::new(patterns)?,
        })
    }

    /// The built-in pattern set plus any operator-supplied extras.
    pub fn with_extra(extra: &[String]) -> Result<Self, regex::Error> {
        let patterns = DEFAULT_NOISE_PATTERNS
            .iter()
            .map(|p| p.to_string())
            .chain(extra.iter().cloned());
        Self::new(patterns)
    }

    pub fn is_noise(&self, line: &str) -> bool {
        self.set.is_match(line)
    }

    /// Keeps the relative order of retained lines; empty input yields empty
    /// output.
    pub fn filter<'a, I>(&self, lines: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().filter(|l| !self.is_noise(l)).collect()
    }

    /// Line-wise filter over a whole raw log body. Retained lines are written
    /// back newline-terminated, so the output is a full replacement for the
    /// filtered file.
    pub fn filter_text(&self, raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for line in raw.lines() {
            if !self.is_noise(line) {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_PATTERNS).expect("built-in noise patterns compile")
    }
}
