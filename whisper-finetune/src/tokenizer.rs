//! Whisper tokenizer with language and task prefix tokens.

use crate::error::{Result, TokenizerError};
use crate::traits::TextTokenizer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokenizers::Tokenizer;

const END_OF_TEXT: &str = "<|endoftext|>";
const START_OF_TRANSCRIPT: &str = "<|startoftranscript|>";
const NO_TIMESTAMPS: &str = "<|notimestamps|>";

/// Whisper language codes and names.
const LANGUAGES: &[(&str, &str)] = &[
    ("en", "english"),
    ("zh", "chinese"),
    ("de", "german"),
    ("es", "spanish"),
    ("ru", "russian"),
    ("ko", "korean"),
    ("fr", "french"),
    ("ja", "japanese"),
    ("pt", "portuguese"),
    ("tr", "turkish"),
    ("pl", "polish"),
    ("ca", "catalan"),
    ("nl", "dutch"),
    ("ar", "arabic"),
    ("sv", "swedish"),
    ("it", "italian"),
    ("id", "indonesian"),
    ("hi", "hindi"),
    ("fi", "finnish"),
    ("vi", "vietnamese"),
    ("he", "hebrew"),
    ("uk", "ukrainian"),
    ("el", "greek"),
    ("ms", "malay"),
    ("cs", "czech"),
    ("ro", "romanian"),
    ("da", "danish"),
    ("hu", "hungarian"),
    ("ta", "tamil"),
    ("no", "norwegian"),
    ("th", "thai"),
    ("ur", "urdu"),
    ("hr", "croatian"),
    ("bg", "bulgarian"),
    ("lt", "lithuanian"),
    ("la", "latin"),
    ("mi", "maori"),
    ("ml", "malayalam"),
    ("cy", "welsh"),
    ("sk", "slovak"),
    ("te", "telugu"),
    ("fa", "persian"),
    ("lv", "latvian"),
    ("bn", "bengali"),
    ("sr", "serbian"),
    ("az", "azerbaijani"),
    ("sl", "slovenian"),
    ("kn", "kannada"),
    ("et", "estonian"),
    ("mk", "macedonian"),
    ("br", "breton"),
    ("eu", "basque"),
    ("is", "icelandic"),
    ("hy", "armenian"),
    ("ne", "nepali"),
    ("mn", "mongolian"),
    ("bs", "bosnian"),
    ("kk", "kazakh"),
    ("sq", "albanian"),
    ("sw", "swahili"),
    ("gl", "galician"),
    ("mr", "marathi"),
    ("pa", "punjabi"),
    ("si", "sinhala"),
    ("km", "khmer"),
    ("sn", "shona"),
    ("yo", "yoruba"),
    ("so", "somali"),
    ("af", "afrikaans"),
    ("oc", "occitan"),
    ("ka", "georgian"),
    ("be", "belarusian"),
    ("tg", "tajik"),
    ("sd", "sindhi"),
    ("gu", "gujarati"),
    ("am", "amharic"),
    ("yi", "yiddish"),
    ("lo", "lao"),
    ("uz", "uzbek"),
    ("fo", "faroese"),
    ("ht", "haitian creole"),
    ("ps", "pashto"),
    ("tk", "turkmen"),
    ("nn", "nynorsk"),
    ("mt", "maltese"),
    ("sa", "sanskrit"),
    ("lb", "luxembourgish"),
    ("my", "myanmar"),
    ("bo", "tibetan"),
    ("tl", "tagalog"),
    ("mg", "malagasy"),
    ("as", "assamese"),
    ("tt", "tatar"),
    ("haw", "hawaiian"),
    ("ln", "lingala"),
    ("ha", "hausa"),
    ("ba", "bashkir"),
    ("jw", "javanese"),
    ("su", "sundanese"),
    ("yue", "cantonese"),
];

/// A Whisper language, parsed from its name or code (case-insensitive).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Language {
    code: &'static str,
    name: &'static str,
}

impl Language {
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Special token selecting this language, e.g. `<|hi|>`.
    pub fn token(&self) -> String {
        format!("<|{}|>", self.code)
    }
}

impl FromStr for Language {
    type Err = TokenizerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        LANGUAGES
            .iter()
            .find(|(code, name)| *code == key || *name == key)
            .map(|&(code, name)| Language { code, name })
            .ok_or_else(|| TokenizerError::UnknownLanguage(s.to_string()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Decoding task selected by the prefix.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    #[default]
    Transcribe,
    Translate,
}

impl Task {
    /// Special token selecting this task.
    pub fn token(&self) -> &'static str {
        match self {
            Task::Transcribe => "<|transcribe|>",
            Task::Translate => "<|translate|>",
        }
    }
}

/// Whisper tokenizer.
///
/// Encodes transcripts as
/// `<|startoftranscript|> <|lang|> <|task|> <|notimestamps|> text <|endoftext|>`.
/// `<|endoftext|>` doubles as the pad token.
pub struct WhisperTokenizer {
    tokenizer: Tokenizer,
    language: Language,
    task: Task,
    prefix: Vec<u32>,
    end_of_text: u32,
}

impl WhisperTokenizer {
    /// Wrap a loaded tokenizer, resolving the prefix tokens for `language` and `task`.
    pub fn new(tokenizer: Tokenizer, language: Language, task: Task) -> Result<Self> {
        let special = |token: &str| {
            tokenizer
                .token_to_id(token)
                .ok_or_else(|| TokenizerError::MissingSpecialToken(token.to_string()))
        };

        let prefix = vec![
            special(START_OF_TRANSCRIPT)?,
            special(&language.token())?,
            special(task.token())?,
            special(NO_TIMESTAMPS)?,
        ];
        let end_of_text = special(END_OF_TEXT)?;

        Ok(Self {
            tokenizer,
            language,
            task,
            prefix,
            end_of_text,
        })
    }

    /// Load from a `tokenizer.json` file.
    pub fn from_file(path: impl AsRef<Path>, language: Language, task: Task) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(path)?;
        Self::new(tokenizer, language, task)
    }

    /// Write the underlying `tokenizer.json`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.tokenizer.save(path, true)?;
        Ok(())
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn task(&self) -> Task {
        self.task
    }

    /// Tokens prepended to every encoded transcript.
    pub fn prefix_tokens(&self) -> &[u32] {
        &self.prefix
    }

    /// Get vocabulary size including added tokens.
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

impl TextTokenizer for WhisperTokenizer {
    fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self.tokenizer.encode(text, false)?;

        let mut ids = Vec::with_capacity(self.prefix.len() + encoding.len() + 1);
        ids.extend_from_slice(&self.prefix);
        ids.extend_from_slice(encoding.get_ids());
        ids.push(self.end_of_text);

        Ok(ids)
    }

    fn decode(&self, ids: &[u32], skip_special_tokens: bool) -> Result<String> {
        Ok(self.tokenizer.decode(ids, skip_special_tokens)?)
    }

    fn pad_token_id(&self) -> u32 {
        self.end_of_text
    }

    fn start_token_id(&self) -> u32 {
        self.prefix[0]
    }

    fn end_token_id(&self) -> u32 {
        self.end_of_text
    }
}
