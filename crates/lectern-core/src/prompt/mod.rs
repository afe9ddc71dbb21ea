//! Prompt templates and rendering.
//!
//! A [`PromptTemplate`] is a named pair of optional system text and user
//! text with `{variable}` placeholders. A [`Prompt`] binds a template to
//! variable values and optional prior history; rendering it yields the
//! system text plus the message list an oracle receives.

pub mod templates;

use std::borrow::Cow;
use std::collections::BTreeMap;

use lectern_types::llm::{LlmError, Message};

/// A named template with `{variable}` placeholders.
///
/// `{{` and `}}` render as literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: Cow<'static, str>,
    system: Option<Cow<'static, str>>,
    user: Cow<'static, str>,
}

impl PromptTemplate {
    pub const fn from_static(name: &'static str, user: &'static str) -> Self {
        Self {
            name: Cow::Borrowed(name),
            system: None,
            user: Cow::Borrowed(user),
        }
    }

    pub const fn from_static_with_system(
        name: &'static str,
        system: &'static str,
        user: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            system: Some(Cow::Borrowed(system)),
            user: Cow::Borrowed(user),
        }
    }

    pub fn new(name: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            name: Cow::Owned(name.into()),
            system: None,
            user: Cow::Owned(user.into()),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(Cow::Owned(system.into()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Placeholder names used by the template, in order of first use.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        for text in self.system.iter().chain(std::iter::once(&self.user)) {
            for token in tokenize(text) {
                if let Token::Var(name) = token {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names
    }

    /// Render `(system, user)` with the given variables.
    ///
    /// Fails with `LlmError::InvalidRequest` when a placeholder has no value.
    pub fn render(
        &self,
        vars: &BTreeMap<String, String>,
    ) -> Result<(Option<String>, String), LlmError> {
        let system = match &self.system {
            Some(text) => Some(self.render_text(text, vars)?),
            None => None,
        };
        let user = self.render_text(&self.user, vars)?;
        Ok((system, user))
    }

    fn render_text(&self, text: &str, vars: &BTreeMap<String, String>) -> Result<String, LlmError> {
        let mut out = String::with_capacity(text.len());
        for token in tokenize(text) {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Var(name) => {
                    let value = vars.get(name).ok_or_else(|| {
                        LlmError::InvalidRequest(format!(
                            "prompt '{}' is missing variable '{name}'",
                            self.name
                        ))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Literal(&'a str),
    Var(&'a str),
}

/// Split template text into literal runs and placeholders.
///
/// A `{` that does not open a valid identifier followed by `}` is literal.
fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let bytes = text.as_bytes();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'{' | b'}' if bytes.get(i + 1) == Some(&bytes[i]) => {
                if literal_start < i {
                    tokens.push(Token::Literal(&text[literal_start..i]));
                }
                tokens.push(Token::Literal(&text[i..i + 1]));
                i += 2;
                literal_start = i;
            }
            b'{' => {
                let rest = &text[i + 1..];
                let close = rest.find('}');
                match close {
                    Some(end) if is_identifier(&rest[..end]) => {
                        if literal_start < i {
                            tokens.push(Token::Literal(&text[literal_start..i]));
                        }
                        tokens.push(Token::Var(&rest[..end]));
                        i += end + 2;
                        literal_start = i;
                    }
                    _ => i += 1,
                }
            }
            _ => i += 1,
        }
    }
    if literal_start < text.len() {
        tokens.push(Token::Literal(&text[literal_start..]));
    }
    tokens
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A template bound to variables and optional prior history.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub template: PromptTemplate,
    pub vars: BTreeMap<String, String>,
    pub history: Vec<Message>,
}

impl From<PromptTemplate> for Prompt {
    fn from(template: PromptTemplate) -> Self {
        Prompt::new(template)
    }
}

/// What an oracle actually receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system: Option<String>,
    pub messages: Vec<Message>,
}

impl Prompt {
    pub fn new(template: PromptTemplate) -> Self {
        Self {
            template,
            vars: BTreeMap::new(),
            history: Vec::new(),
        }
    }

    pub fn var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// Render to `system` + `history ++ [user]`.
    pub fn render(&self) -> Result<RenderedPrompt, LlmError> {
        let (system, user) = self.template.render(&self.vars)?;
        let mut messages = self.history.clone();
        messages.push(Message::user(user));
        Ok(RenderedPrompt { system, messages })
    }
}
