//! Response templates for custom commands.
//!
//! A template is literal text with `{name}` placeholders. `{{` and `}}` are
//! literal braces. Templates are parsed once and rendered many times; parsing
//! rejects unknown placeholders and unbalanced braces.

use std::fmt::Write as _;
use thiserror::Error;

/// Errors raised while parsing a template.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// A `{` without a closing `}` or a stray `}`.
    #[error("unbalanced '{brace}' at position {position}")]
    UnbalancedBrace {
        /// The offending brace.
        brace: char,
        /// Character offset in the template.
        position: usize,
    },

    /// A placeholder name that is not supported.
    #[error("unknown placeholder {{{0}}}")]
    UnknownPlaceholder(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    User,
    Args,
    Arg(usize),
    Channel,
    Uptime,
    Game,
    Title,
    UserTitle,
    Points,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        let placeholder = match name {
            "user" => Self::User,
            "args" => Self::Args,
            "channel" => Self::Channel,
            "uptime" => Self::Uptime,
            "game" => Self::Game,
            "title" => Self::Title,
            "user_title" => Self::UserTitle,
            "points" => Self::Points,
            other => {
                let index = other.strip_prefix("arg")?.parse::<usize>().ok()?;
                if !(1..=9).contains(&index) {
                    return None;
                }
                Self::Arg(index)
            }
        };
        Some(placeholder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Var(Placeholder),
}

/// A parsed response template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

/// Values substituted into a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    /// Invoker display name.
    pub user: String,
    /// Whitespace-separated arguments.
    pub args: Vec<String>,
    /// Channel name.
    pub channel: String,
    /// Stream uptime text.
    pub uptime: String,
    /// Current category.
    pub game: String,
    /// Current stream title.
    pub title: String,
    /// Invoker loyalty title.
    pub user_title: String,
    /// Invoker loyalty points.
    pub points: i64,
}

impl Template {
    /// Parses a template, validating every placeholder.
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().enumerate().peekable();

        while let Some((position, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|(_, n)| *n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|(_, n)| *n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnbalancedBrace { brace: '}', position }),
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, '{')) | None => {
                                return Err(TemplateError::UnbalancedBrace { brace: '{', position })
                            }
                            Some((_, ch)) => name.push(ch),
                        }
                    }
                    let placeholder = Placeholder::parse(name.trim())
                        .ok_or_else(|| TemplateError::UnknownPlaceholder(name.clone()))?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Var(placeholder));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Self { segments })
    }

    /// Whether rendering needs the invoker's loyalty profile.
    pub fn uses_loyalty(&self) -> bool {
        self.segments.iter().any(|s| {
            matches!(
                s,
                Segment::Var(Placeholder::UserTitle | Placeholder::Points)
            )
        })
    }

    /// Renders the template. Missing positional arguments render as empty text.
    pub fn render(&self, vars: &TemplateVars) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Var(placeholder) => match placeholder {
                    Placeholder::User => out.push_str(&vars.user),
                    Placeholder::Args => out.push_str(&vars.args.join(" ")),
                    Placeholder::Arg(n) => {
                        if let Some(arg) = vars.args.get(n - 1) {
                            out.push_str(arg);
                        }
                    }
                    Placeholder::Channel => out.push_str(&vars.channel),
                    Placeholder::Uptime => out.push_str(&vars.uptime),
                    Placeholder::Game => out.push_str(&vars.game),
                    Placeholder::Title => out.push_str(&vars.title),
                    Placeholder::UserTitle => out.push_str(&vars.user_title),
                    Placeholder::Points => {
                        let _ = write!(out, "{}", vars.points);
                    }
                },
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        TemplateVars {
            user: "Alice".to_string(),
            args: vec!["one".to_string(), "two".to_string()],
            channel: "flightdeck".to_string(),
            uptime: "0d 1h 2m 3s".to_string(),
            game: "Microsoft Flight Simulator".to_string(),
            title: "Night ops".to_string(),
            user_title: "Subject".to_string(),
            points: 120,
        }
    }

    #[test]
    fn test_plain_text() {
        let t = Template::parse("LET'S GO").unwrap();
        assert_eq!(t.render(&vars()), "LET'S GO");
        assert!(!t.uses_loyalty());
    }

    #[test]
    fn test_all_placeholders() {
        let t = Template::parse(
            "{user} {args} {arg1}/{arg2}/{arg3} {channel} {uptime} {game} {title} {user_title} {points}",
        )
        .unwrap();
        assert_eq!(
            t.render(&vars()),
            "Alice one two one/two/ flightdeck 0d 1h 2m 3s Microsoft Flight Simulator Night ops Subject 120"
        );
        assert!(t.uses_loyalty());
    }

    #[test]
    fn test_escaped_braces() {
        let t = Template::parse("{{user}} is {user}, }} and {{").unwrap();
        assert_eq!(t.render(&vars()), "{user} is Alice, } and {");
    }

    #[test]
    fn test_unknown_placeholder() {
        assert_eq!(
            Template::parse("hello {nope}"),
            Err(TemplateError::UnknownPlaceholder("nope".to_string()))
        );
        assert!(matches!(
            Template::parse("{arg10}"),
            Err(TemplateError::UnknownPlaceholder(_))
        ));
        assert!(matches!(
            Template::parse("{arg0}"),
            Err(TemplateError::UnknownPlaceholder(_))
        ));
        assert!(matches!(
            Template::parse("{}"),
            Err(TemplateError::UnknownPlaceholder(_))
        ));
    }

    #[test]
    fn test_unbalanced_braces() {
        assert_eq!(
            Template::parse("hi {user"),
            Err(TemplateError::UnbalancedBrace { brace: '{', position: 3 })
        );
        assert_eq!(
            Template::parse("hi } there"),
            Err(TemplateError::UnbalancedBrace { brace: '}', position: 3 })
        );
        assert!(Template::parse("{us{er}").is_err());
    }
}
