use anyhow::{Context, Result, anyhow, bail};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use logos::Logos;
use strum::EnumString;
use tracing::debug;

use crate::{
    outline::{
        OutlineItem,
        edit::{DEFAULT_MAX_LEVEL, NEW_ITEM_TITLE, OutlineEditor},
    },
    pdf::destination::PagePolicy,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Deepest level the editor will indent an entry to.
    pub max_level: usize,
    pub out_of_range_pages: PagePolicy,
    /// Title given to entries created in the editor.
    pub new_title: String,
    pub pretty_json: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `path` when given, otherwise the system config if there is one. Without either the
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let system = Self::system_config_path()?;
                if system.exists() {
                    Self::from_file(&system)
                } else {
                    debug!("No config at {}, using defaults", system.display());
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Config::from_str(&contents).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn system_config_path() -> Result<PathBuf> {
        Ok(home::home_dir()
            .ok_or(anyhow!("No home directory could be determined"))?
            .join("./.config/miro-outline/outline.conf"))
    }

    /// An editor over `items` using the configured level ceiling and title for new entries.
    pub fn editor(&self, items: Vec<OutlineItem>) -> OutlineEditor {
        OutlineEditor::new(items)
            .max_level(self.max_level)
            .new_title(self.new_title.clone())
    }

    fn set(&mut self, key: Setting, value: &str) -> Result<()> {
        match key {
            Setting::MaxLevel => {
                self.max_level = value
                    .parse()
                    .map_err(|_| anyhow!("MaxLevel expects a non-negative number, got {value}"))?;
            }
            Setting::OutOfRangePages => {
                self.out_of_range_pages = PagePolicy::from_str(value).map_err(|_| {
                    anyhow!("OutOfRangePages expects FirstPage, LastPage or Reject, got {value}")
                })?;
            }
            Setting::NewTitle => self.new_title = value.to_string(),
            Setting::PrettyJson => self.pretty_json = parse_bool(value)?,
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_level: DEFAULT_MAX_LEVEL,
            out_of_range_pages: PagePolicy::default(),
            new_title: NEW_ITEM_TITLE.to_string(),
            pretty_json: true,
        }
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value {
        "True" => Ok(true),
        "False" => Ok(false),
        other => bail!("Expected True or False, got {other}"),
    }
}

impl FromStr for Config {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lexer = Token::lexer(s);

        let mut expecting_statement = true;
        let mut line = 1;

        let mut cmd_name: Option<String> = None;
        let mut args = vec![];

        let mut out = Config::new();

        // A missing trailing newline still ends the last statement.
        for token in lexer.chain(std::iter::once(Ok(Token::StatementDelim))) {
            match token {
                Ok(Token::String(s)) => {
                    if expecting_statement {
                        cmd_name = Some(s);
                    } else {
                        args.push(s);
                    }
                }
                Ok(Token::Comment) => {}
                Ok(Token::StatementDelim) => {
                    if let Some(name) = cmd_name.take() {
                        let cmd = Command::from_str(&name)
                            .map_err(|_| anyhow!("Line {line}: unknown command {name}"))?;
                        match cmd {
                            Command::Set => {
                                if args.len() < 2 {
                                    bail!("Line {line}: Set requires a key and a value");
                                }
                                let key = Setting::from_str(&args[0])
                                    .map_err(|_| anyhow!("Line {line}: unknown setting {}", args[0]))?;
                                // Values may contain spaces, e.g. a default title.
                                let value = args[1..].join(" ");
                                out.set(key, &value).with_context(|| format!("Line {line}"))?;
                            }
                        }
                    }
                    expecting_statement = true;
                    args.clear();
                    line += 1;
                }
                Ok(Token::ArgDelim) => {
                    if cmd_name.is_some() {
                        expecting_statement = false;
                    }
                }
                Err(_) => bail!("Line {line}: unreadable input"),
            }
        }
        Ok(out)
    }
}

/// Represents valid tokens in a configuration file.
#[derive(Debug, Logos)]
enum Token {
    #[regex("[ \t]+")]
    ArgDelim,

    #[token("\n")]
    StatementDelim,

    #[regex("#[^\n]*")]
    Comment,

    #[regex("[^ \t\n#]+", |lex| lex.slice().to_owned())]
    String(String),
}

#[derive(Debug, EnumString)]
enum Command {
    Set,
}

#[derive(Debug, EnumString)]
enum Setting {
    MaxLevel,
    OutOfRangePages,
    NewTitle,
    PrettyJson,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    pub fn can_parse_config_file() {
        let contents = include_str!("../assets/default.conf");
        let config = Config::from_str(contents).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    pub fn settings_override_defaults() {
        let config = Config::from_str(
            "Set MaxLevel 3\nSet OutOfRangePages LastPage\nSet NewTitle Fresh entry\nSet PrettyJson False",
        )
        .unwrap();
        assert_eq!(config.max_level, 3);
        assert_eq!(config.out_of_range_pages, PagePolicy::LastPage);
        assert_eq!(config.new_title, "Fresh entry");
        assert!(!config.pretty_json);
    }

    #[test]
    pub fn blank_lines_and_comments_are_ignored() {
        let config = Config::from_str("\n# indent limit\n\nSet MaxLevel 2 # trailing\n\n").unwrap();
        assert_eq!(config.max_level, 2);
    }

    #[test]
    pub fn errors_name_the_line() {
        let err = Config::from_str("Set MaxLevel 2\nSet Colour Blue\n").unwrap_err();
        assert!(format!("{err:#}").contains("Line 2"));

        let err = Config::from_str("Bind j Down\n").unwrap_err();
        assert!(format!("{err:#}").contains("unknown command"));

        assert!(Config::from_str("Set MaxLevel many\n").is_err());
        assert!(Config::from_str("Set PrettyJson yes\n").is_err());
        assert!(Config::from_str("Set MaxLevel\n").is_err());
    }

    #[test]
    pub fn editor_uses_configured_limits() {
        let config = Config::from_str("Set MaxLevel 1\nSet NewTitle Draft\n").unwrap();
        let mut editor = config.editor(vec![]);
        let mut ids = crate::outline::SequentialIds::default();
        let first = editor.insert(None, false, 0, &mut ids);
        let second = editor.insert(Some(&first), true, 0, &mut ids);
        editor.insert(Some(&second), true, 0, &mut ids);
        let items = editor.into_items();
        assert_eq!(items[0].title, "Draft");
        assert_eq!(items[2].level, 1);
    }

    #[test]
    pub fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("absent.conf"))).is_err());
    }

    #[test]
    pub fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outline.conf");
        fs::write(&path, "Set OutOfRangePages Reject\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.out_of_range_pages, PagePolicy::Reject);
    }
}
