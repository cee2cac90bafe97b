use std::fmt;

/// A five-point frequency answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LikertResponse {
    Never,
    Rarely,
    Sometimes,
    Often,
    Always,
}

impl LikertResponse {
    pub const ALL: [LikertResponse; 5] = [
        LikertResponse::Never,
        LikertResponse::Rarely,
        LikertResponse::Sometimes,
        LikertResponse::Often,
        LikertResponse::Always,
    ];

    /// 1 for `Never` up to 5 for `Always`.
    pub fn score(self) -> u8 {
        match self {
            LikertResponse::Never => 1,
            LikertResponse::Rarely => 2,
            LikertResponse::Sometimes => 3,
            LikertResponse::Often => 4,
            LikertResponse::Always => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LikertResponse::Never => "never",
            LikertResponse::Rarely => "rarely",
            LikertResponse::Sometimes => "sometimes",
            LikertResponse::Often => "often",
            LikertResponse::Always => "always",
        }
    }

    /// Reads a spoken answer. The whole transcript must be one of the five
    /// words; case, surrounding whitespace and trailing punctuation are
    /// ignored. Anything else is not an answer.
    pub fn parse(transcript: &str) -> Option<Self> {
        let word = transcript
            .trim()
            .trim_end_matches(|c: char| c.is_ascii_punctuation())
            .trim()
            .to_lowercase();
        Self::ALL.into_iter().find(|r| r.as_str() == word)
    }
}

impl fmt::Display for LikertResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
