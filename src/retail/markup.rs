//! Streaming markup events on top of the html5ever tokenizer.
//!
//! Produces start/end/text events in document order. Tag nesting is left to
//! the consumer, but a tag, comment, or quoted attribute that is still open
//! at end of input is a [`CrawlError::Parse`].

use crate::error::CrawlError;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, EndTag, StartTag, Tag, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use std::cell::{Cell, RefCell};
use tracing::trace;

/// Elements that never have an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// html5ever reports end of input inside an open construct with this prefix
/// when `exact_errors` is off.
const EOF_ERROR_PREFIX: &str = "Saw EOF";

/// A single markup event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { name: String, attrs: Vec<(String, String)>, self_closing: bool },
    End { name: String },
    Text(String),
}

impl Event {
    /// Returns an attribute value of a start tag.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Event::Start { attrs, .. } => {
                attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
            }
            _ => None,
        }
    }

    /// Returns true if this start tag carries `class` among its classes.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class").is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }
}

/// Returns true for elements that are never closed.
pub fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Collects tokenizer output as [`Event`]s.
#[derive(Default)]
struct EventSink {
    events: RefCell<Vec<Event>>,
    saw_markup: Cell<bool>,
    in_raw_text: Cell<bool>,
    eof_error: RefCell<Option<String>>,
}

impl EventSink {
    fn push_text(&self, text: &str) {
        if self.in_raw_text.get() || text.is_empty() {
            return;
        }
        let mut events = self.events.borrow_mut();
        if let Some(Event::Text(previous)) = events.last_mut() {
            previous.push_str(text);
        } else {
            events.push(Event::Text(text.to_string()));
        }
    }

    fn tag(&self, tag: Tag) -> TokenSinkResult<()> {
        self.saw_markup.set(true);
        let name = tag.name.to_string();

        match tag.kind {
            StartTag => {
                let raw_kind = match name.as_str() {
                    "script" => Some(RawKind::ScriptData),
                    "style" => Some(RawKind::Rawtext),
                    _ => None,
                };
                let self_closing = tag.self_closing || is_void(&name);
                let attrs = tag
                    .attrs
                    .into_iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                self.events.borrow_mut().push(Event::Start { name, attrs, self_closing });

                match raw_kind {
                    // Script and style bodies are skipped; they may contain '<' freely.
                    Some(kind) if !self_closing => {
                        self.in_raw_text.set(true);
                        TokenSinkResult::RawData(kind)
                    }
                    _ => TokenSinkResult::Continue,
                }
            }
            EndTag => {
                self.in_raw_text.set(false);
                self.events.borrow_mut().push(Event::End { name });
                TokenSinkResult::Continue
            }
        }
    }
}

impl TokenSink for EventSink {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => return self.tag(tag),
            Token::CharacterTokens(text) => self.push_text(&text),
            Token::CommentToken(_) | Token::DoctypeToken(_) => self.saw_markup.set(true),
            Token::ParseError(message) => {
                if message.starts_with(EOF_ERROR_PREFIX) {
                    let mut eof_error = self.eof_error.borrow_mut();
                    if eof_error.is_none() {
                        *eof_error =
                            Some(format!("unterminated markup at line {}: {}", line_number, message));
                    }
                } else {
                    trace!("Recoverable markup error at line {}: {}", line_number, message);
                }
            }
            Token::NullCharacterToken | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenizes `input` into events, with character references decoded.
///
/// Fails if a construct is left unterminated, or if a non-blank input
/// contains no tags at all.
pub fn tokenize(input: &str) -> Result<Vec<Event>, CrawlError> {
    let queue = BufferQueue::default();
    queue.push_back(StrTendril::from_slice(input));

    let tokenizer = Tokenizer::new(EventSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&queue);
    tokenizer.end();

    let sink = tokenizer.sink;
    if let Some(message) = sink.eof_error.into_inner() {
        return Err(CrawlError::Parse(message));
    }
    if !sink.saw_markup.get() && !input.trim().is_empty() {
        return Err(CrawlError::Parse("response contains no markup".to_string()));
    }

    Ok(sink.events.into_inner())
}
