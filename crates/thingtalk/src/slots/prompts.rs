//! Locale-keyed prompt catalog.

use thiserror::Error;
use tracing::warn;

/// Failure to produce a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptError {
    #[error("no '{locale}' prompt for slot '{tag}'")]
    MissingTranslation { locale: String, tag: String },
}

/// Which template a slot uses and what to fill it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PromptKey {
    key: String,
    name: String,
    /// Position among sibling elements and their count
    position: Option<(usize, usize)>,
}

impl PromptKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: String::new(),
            position: None,
        }
    }

    pub fn named(key: impl Into<String>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::new(key)
        }
    }

    pub fn at(mut self, index: usize, count: usize) -> Self {
        self.position = Some((index, count));
        self
    }
}

type Entries = &'static [(&'static str, &'static str)];

const ENGLISH: Entries = &[
    ("program.principal", "Who should run this command?"),
    ("in_param", "Please tell me the {name}."),
    (
        "attribute",
        "Please tell me the {name} of the device you would like to use.",
    ),
    ("table.index", "What is the index of the result you would like?"),
    (
        "table.index.nth",
        "What is the index of the {ordinal} result you would like?",
    ),
    ("slice.base", "What is the first result you would like?"),
    ("slice.limit", "How many results would you like?"),
    ("result_ref.index", "Which result do you want?"),
    ("attimer.time", "When do you want your command to run?"),
    (
        "attimer.time.nth",
        "What is the {ordinal} time you would like your command to run?",
    ),
    ("attimer.expiration_date", "When should your command stop?"),
    ("timer.base", "When should your command start?"),
    ("timer.interval", "How often should your command run?"),
    ("compute_filter.lhs", "What is the left hand side of the filter?"),
    ("compute_filter.rhs", "What is the right hand side of the filter?"),
    ("source", "Who is allowed to ask you for this command?"),
    (
        "source.element",
        "Who is the {ordinal} friend who is allowed to ask you for this command?",
    ),
    ("filter.element", "What is the {ordinal} value of the {name}?"),
    ("filter.==", "What should the {name} be?"),
    ("filter.!=", "What should the {name} not be?"),
    ("filter.>", "What should the {name} be greater than?"),
    ("filter.>=", "What should the {name} be at least?"),
    ("filter.<", "What should the {name} be less than?"),
    ("filter.<=", "What should the {name} be at most?"),
    ("filter.=~", "What should the {name} contain?"),
    ("filter.~=", "What should contain the {name}?"),
    ("filter.contains", "What should the {name} contain?"),
    ("filter.in_array", "What values can the {name} have?"),
    ("filter.starts_with", "What should the {name} start with?"),
    ("filter.ends_with", "What should the {name} end with?"),
    ("filter.prefix_of", "What should the {name} be a prefix of?"),
    ("filter.suffix_of", "What should the {name} be a suffix of?"),
];

const CATALOGS: &[(&str, Entries)] = &[("en-US", ENGLISH), ("en", ENGLISH)];

/// Prompt templates of one locale.
#[derive(Debug, Clone, Copy)]
pub struct PromptCatalog {
    locale: &'static str,
    entries: Entries,
}

impl PromptCatalog {
    /// The catalog for `locale`, if one is bundled.
    pub fn get(locale: &str) -> Option<Self> {
        CATALOGS
            .iter()
            .find(|(l, _)| *l == locale)
            .map(|&(locale, entries)| Self { locale, entries })
    }

    /// Locales with a bundled catalog.
    pub fn locales() -> impl Iterator<Item = &'static str> {
        CATALOGS.iter().map(|(l, _)| *l)
    }

    pub fn locale(&self) -> &'static str {
        self.locale
    }

    /// The raw template stored under `key`.
    pub fn template(&self, key: &str) -> Option<&'static str> {
        self.entries.iter().find(|(k, _)| *k == key).map(|(_, t)| *t)
    }

    fn render(&self, prompt: &PromptKey) -> Option<String> {
        let plural = prompt.position.filter(|(_, count)| *count > 1);
        let template = plural
            .and_then(|_| self.template(&format!("{}.nth", prompt.key)))
            .or_else(|| self.template(&prompt.key))?;
        let ordinal = prompt.position.map(|(i, _)| ordinal(i + 1)).unwrap_or_default();
        Some(
            template
                .replace("{name}", &humanize(&prompt.name))
                .replace("{ordinal}", &ordinal),
        )
    }
}

/// Render `prompt` in `locale`, reporting the slot `tag` on failure.
pub(super) fn render(locale: &str, prompt: &PromptKey, tag: &str) -> Result<String, PromptError> {
    PromptCatalog::get(locale)
        .and_then(|catalog| catalog.render(prompt))
        .ok_or_else(|| {
            warn!(locale, tag, key = %prompt.key, "missing prompt translation");
            PromptError::MissingTranslation {
                locale: locale.to_string(),
                tag: tag.to_string(),
            }
        })
}

/// `p_query` → `query`, `target_language` → `target language`.
fn humanize(name: &str) -> String {
    name.strip_prefix("p_").unwrap_or(name).replace('_', " ")
}

fn ordinal(n: usize) -> String {
    const WORDS: [&str; 10] = [
        "first", "second", "third", "fourth", "fifth", "sixth", "seventh", "eighth", "ninth",
        "tenth",
    ];
    if let Some(word) = WORDS.get(n.wrapping_sub(1)) {
        return word.to_string();
    }
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
