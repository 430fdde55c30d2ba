use std::str::FromStr;

use anyhow::anyhow;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Title,
    Desc,
    Category,
    Priority,
    Status,
    Address,
    Photo,
    Lat,
    Lng,
    Message,
    Tab,
    Date,
    Start,
    End,
    Max,
}

impl Field {
    fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_lowercase().as_str() {
            "title" => Some(Self::Title),
            "desc" | "description" => Some(Self::Desc),
            "cat" | "category" => Some(Self::Category),
            "pri" | "priority" => Some(Self::Priority),
            "status" => Some(Self::Status),
            "addr" | "address" => Some(Self::Address),
            "photo" => Some(Self::Photo),
            "lat" => Some(Self::Lat),
            "lng" | "lon" => Some(Self::Lng),
            "msg" | "message" => Some(Self::Message),
            "tab" => Some(Self::Tab),
            "date" => Some(Self::Date),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "max" | "capacity" => Some(Self::Max),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Desc => "desc",
            Self::Category => "cat",
            Self::Priority => "pri",
            Self::Status => "status",
            Self::Address => "addr",
            Self::Photo => "photo",
            Self::Lat => "lat",
            Self::Lng => "lng",
            Self::Message => "msg",
            Self::Tab => "tab",
            Self::Date => "date",
            Self::Start => "start",
            Self::End => "end",
            Self::Max => "max",
        }
    }
}

/// Command arguments split into free-text words and `key:value` fields.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedArgs {
    pub words: Vec<String>,
    fields: Vec<(Field, String)>,
}

impl ParsedArgs {
    /// Tokens after `--` are always words. Fields outside `allowed` stay words.
    pub fn parse(args: &[String], allowed: &[Field]) -> Self {
        let mut out = Self::default();
        let mut literal = false;

        for arg in args {
            if arg == "--" && !literal {
                literal = true;
                continue;
            }

            if !literal && let Some((field, value)) = parse_one_field(arg) {
                if allowed.contains(&field) {
                    out.fields.push((field, value.to_string()));
                    continue;
                }
                warn!(arg = %arg, "modifier does not apply to this command, kept as text");
            }

            out.words.push(arg.clone());
        }

        debug!(words = out.words.len(), fields = out.fields.len(), "parsed modifiers");
        out
    }

    pub fn text(&self) -> String {
        self.words.join(" ")
    }

    /// Last occurrence wins.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn parse_field<T>(&self, field: Field) -> anyhow::Result<Option<T>>
    where
        T: FromStr,
        T::Err: Into<anyhow::Error>,
    {
        self.get(field)
            .map(|raw| {
                raw.parse::<T>().map_err(|err| {
                    let err: anyhow::Error = err.into();
                    err.context(format!("invalid {}:{raw}", field.key()))
                })
            })
            .transpose()
    }

    pub fn require(&self, field: Field, command: &str) -> anyhow::Result<&str> {
        self.get(field)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow!("{command}: {}: is required", field.key()))
    }
}

fn parse_one_field(tok: &str) -> Option<(Field, &str)> {
    let (key, value) = tok.split_once(':').or_else(|| tok.split_once('='))?;
    Field::from_key(key).map(|field| (field, value))
}

#[cfg(test)]
mod tests {
    use super::{Field, ParsedArgs};
    use crate::model::IssuePriority;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn splits_words_and_allowed_fields() {
        let parsed = ParsedArgs::parse(
            &args(&["Broken", "swing", "pri:high", "cat=parks", "at", "10:30", "tab:past"]),
            &[Field::Priority, Field::Category],
        );

        assert_eq!(parsed.text(), "Broken swing at 10:30 tab:past");
        assert_eq!(
            parsed.parse_field::<IssuePriority>(Field::Priority).unwrap(),
            Some(IssuePriority::High)
        );
        assert_eq!(parsed.get(Field::Category), Some("parks"));
        assert_eq!(parsed.get(Field::Tab), None);
    }

    #[test]
    fn double_dash_makes_rest_literal() {
        let parsed = ParsedArgs::parse(&args(&["pri:low", "--", "pri:high"]), &[Field::Priority]);
        assert_eq!(parsed.get(Field::Priority), Some("low"));
        assert_eq!(parsed.text(), "pri:high");
    }

    #[test]
    fn bad_values_and_missing_required_fields_error() {
        let parsed = ParsedArgs::parse(&args(&["max:lots", "pri:urgent"]), &[Field::Max, Field::Priority]);
        assert!(parsed.parse_field::<u32>(Field::Max).is_err());
        assert!(parsed.parse_field::<IssuePriority>(Field::Priority).is_err());
        assert!(parsed.require(Field::Date, "create").is_err());
    }
}
