use thiserror::Error;

/// Built-in maintenance notice, used when no custom template is configured.
pub const DEFAULT_TEMPLATE: &str = "Bot **{Bot}** is undergoing maintenance, please wait a bit!\nIf you need to know more, you can visit the Discord server: {DiscordServer}!";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown placeholder `{{{name}}}` at byte {offset} (expected {{Bot}} or {{DiscordServer}})")]
    UnknownPlaceholder { name: String, offset: usize },

    #[error("placeholder opened at byte {offset} is never closed")]
    UnclosedPlaceholder { offset: usize },

    #[error("unmatched `}}` at byte {offset} (write `}}}}` for a literal brace)")]
    UnmatchedClosingBrace { offset: usize },

    #[error("empty placeholder `{{}}` at byte {offset}")]
    EmptyPlaceholder { offset: usize },
}

/// Values substituted into the notice.
#[derive(Debug, Clone, Default)]
pub struct MessageData<'a> {
    /// The bot's `username#discriminator`
    pub bot: &'a str,
    /// Support server link, may be empty
    pub discord_server: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Bot,
    DiscordServer,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "Bot" => Some(Field::Bot),
            "DiscordServer" => Some(Field::DiscordServer),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A notice template compiled once at startup.
///
/// Placeholders are written `{Bot}` and `{DiscordServer}`; `{{` and `}}`
/// produce literal braces.
#[derive(Debug, Clone)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        if inner == '{' {
                            return Err(TemplateError::UnclosedPlaceholder { offset });
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::UnclosedPlaceholder { offset });
                    }

                    let name = name.trim();
                    if name.is_empty() {
                        return Err(TemplateError::EmptyPlaceholder { offset });
                    }
                    let field = Field::parse(name).ok_or_else(|| {
                        TemplateError::UnknownPlaceholder {
                            name: name.to_string(),
                            offset,
                        }
                    })?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::UnmatchedClosingBrace { offset });
                    }
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Compile the built-in notice.
    pub fn default_message() -> Self {
        match Self::compile(DEFAULT_TEMPLATE) {
            Ok(template) => template,
            Err(e) => unreachable!("built-in template failed to compile: {e}"),
        }
    }

    pub fn render(&self, data: &MessageData<'_>) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(Field::Bot) => out.push_str(data.bot),
                Segment::Field(Field::DiscordServer) => out.push_str(data.discord_server),
            }
        }
        out
    }
}
