//! Boolean tag expressions gating hooks per scenario.
//!
//! Grammar: `expr := or`, `or := and ("or" and)*`, `and := unary ("and"
//! unary)*`, `unary := "not" unary | "(" expr ")" | tag`. Tags are bare
//! words, conventionally starting with `@`. Evaluation is against a
//! scenario's effective tag set.

use std::fmt;
use thiserror::Error;

/// Errors raised while parsing a tag expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagExpressionError {
    /// The expression ended where more input was expected.
    #[error("unexpected end of tag expression")]
    UnexpectedEnd,
    /// A token appeared where it is not allowed.
    #[error("unexpected token '{token}' in tag expression")]
    UnexpectedToken {
        /// The offending token.
        token: String,
    },
    /// An opened group was never closed.
    #[error("missing closing ')' in tag expression")]
    UnbalancedParen,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TagToken {
    Tag(String),
    And,
    Or,
    Not,
    Open,
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TagNode {
    Tag(String),
    Not(Box<TagNode>),
    And(Box<TagNode>, Box<TagNode>),
    Or(Box<TagNode>, Box<TagNode>),
}

/// A parsed, evaluatable tag expression.
///
/// # Examples
/// ```
/// use cuke_harness::TagExpression;
///
/// let expression = TagExpression::parse("@smoke and not @wip")
///     .unwrap_or_else(|err| panic!("{err}"));
/// assert!(expression.evaluate(&["@smoke".to_string()]));
/// assert!(!expression.evaluate(&["@smoke".to_string(), "@wip".to_string()]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagExpression {
    source: String,
    root: TagNode,
}

impl TagExpression {
    /// Parse an expression source.
    ///
    /// # Errors
    /// Returns [`TagExpressionError`] for malformed input.
    pub fn parse(source: &str) -> Result<Self, TagExpressionError> {
        let tokens = tokenize(source);
        let mut parser = Parser { tokens, index: 0 };
        let root = parser.parse_or()?;
        if let Some(extra) = parser.peek() {
            return Err(TagExpressionError::UnexpectedToken {
                token: render(extra),
            });
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// The original expression source.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluate the expression against a scenario's tags.
    #[must_use]
    pub fn evaluate(&self, tags: &[String]) -> bool {
        evaluate_node(&self.root, tags)
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn evaluate_node(node: &TagNode, tags: &[String]) -> bool {
    match node {
        TagNode::Tag(name) => tags.iter().any(|tag| tag == name),
        TagNode::Not(inner) => !evaluate_node(inner, tags),
        TagNode::And(left, right) => evaluate_node(left, tags) && evaluate_node(right, tags),
        TagNode::Or(left, right) => evaluate_node(left, tags) || evaluate_node(right, tags),
    }
}

fn tokenize(source: &str) -> Vec<TagToken> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut flush = |word: &mut String, tokens: &mut Vec<TagToken>| {
        if word.is_empty() {
            return;
        }
        let token = match word.as_str() {
            "and" => TagToken::And,
            "or" => TagToken::Or,
            "not" => TagToken::Not,
            _ => TagToken::Tag(word.clone()),
        };
        word.clear();
        tokens.push(token);
    };
    for ch in source.chars() {
        match ch {
            '(' => {
                flush(&mut word, &mut tokens);
                tokens.push(TagToken::Open);
            }
            ')' => {
                flush(&mut word, &mut tokens);
                tokens.push(TagToken::Close);
            }
            c if c.is_whitespace() => flush(&mut word, &mut tokens),
            c => word.push(c),
        }
    }
    flush(&mut word, &mut tokens);
    tokens
}

fn render(token: &TagToken) -> String {
    match token {
        TagToken::Tag(name) => name.clone(),
        TagToken::And => "and".to_string(),
        TagToken::Or => "or".to_string(),
        TagToken::Not => "not".to_string(),
        TagToken::Open => "(".to_string(),
        TagToken::Close => ")".to_string(),
    }
}

struct Parser {
    tokens: Vec<TagToken>,
    index: usize,
}

impl Parser {
    fn peek(&self) -> Option<&TagToken> {
        self.tokens.get(self.index)
    }

    fn advance(&mut self) -> Option<TagToken> {
        let token = self.tokens.get(self.index).cloned();
        if token.is_some() {
            self.index += 1;
        }
        token
    }

    fn parse_or(&mut self) -> Result<TagNode, TagExpressionError> {
        let mut node = self.parse_and()?;
        while matches!(self.peek(), Some(TagToken::Or)) {
            self.advance();
            let right = self.parse_and()?;
            node = TagNode::Or(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<TagNode, TagExpressionError> {
        let mut node = self.parse_unary()?;
        while matches!(self.peek(), Some(TagToken::And)) {
            self.advance();
            let right = self.parse_unary()?;
            node = TagNode::And(Box::new(node), Box::new(right));
        }
        Ok(node)
    }

    fn parse_unary(&mut self) -> Result<TagNode, TagExpressionError> {
        match self.advance() {
            Some(TagToken::Not) => Ok(TagNode::Not(Box::new(self.parse_unary()?))),
            Some(TagToken::Open) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(TagToken::Close) => Ok(inner),
                    _ => Err(TagExpressionError::UnbalancedParen),
                }
            }
            Some(TagToken::Tag(name)) => Ok(TagNode::Tag(name)),
            Some(other) => Err(TagExpressionError::UnexpectedToken {
                token: render(&other),
            }),
            None => Err(TagExpressionError::UnexpectedEnd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[rstest]
    #[case("@a", &["@a"], true)]
    #[case("@a", &["@b"], false)]
    #[case("@a and @b", &["@a", "@b"], true)]
    #[case("@a and @b", &["@a"], false)]
    #[case("@a or @b", &["@b"], true)]
    #[case("not @wip", &["@smoke"], true)]
    #[case("not @wip", &["@wip"], false)]
    #[case("@a and (@b or @c)", &["@a", "@c"], true)]
    #[case("@a and (@b or @c)", &["@a"], false)]
    #[case("not (@a or @b)", &["@c"], true)]
    fn evaluates(#[case] source: &str, #[case] present: &[&str], #[case] expected: bool) {
        let expression =
            TagExpression::parse(source).unwrap_or_else(|err| panic!("{source}: {err}"));
        assert_eq!(expression.evaluate(&tags(present)), expected, "{source}");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expression =
            TagExpression::parse("@a or @b and @c").unwrap_or_else(|err| panic!("{err}"));
        assert!(expression.evaluate(&tags(&["@a"])));
        assert!(!expression.evaluate(&tags(&["@b"])));
        assert!(expression.evaluate(&tags(&["@b", "@c"])));
    }

    #[rstest]
    #[case("")]
    #[case("@a and")]
    #[case("(@a")]
    #[case("and @a")]
    #[case("@a @b")]
    fn rejects_malformed_input(#[case] source: &str) {
        assert!(
            TagExpression::parse(source).is_err(),
            "'{source}' should not parse"
        );
    }
}
