//! Recursive descent parser for job scripts
//! Converts tokens into an AST, one statement per line

use crate::ast::*;
use crate::lexer::{lex, Token};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("unrecognised input")]
    InvalidToken { span: Span },

    #[error("expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("expected {expected}, got end of input")]
    UnexpectedEof { expected: String, span: Span },

    #[error("invalid number")]
    InvalidNumber { span: Span },

    #[error("'{clause}' given more than once")]
    DuplicateClause { clause: &'static str, span: Span },

    #[error("missing '{clause}' clause")]
    MissingClause { clause: &'static str, span: Span },
}

impl ParseError {
    /// Source range the error points at
    pub fn span(&self) -> Span {
        match self {
            ParseError::InvalidToken { span }
            | ParseError::UnexpectedToken { span, .. }
            | ParseError::UnexpectedEof { span, .. }
            | ParseError::InvalidNumber { span }
            | ParseError::DuplicateClause { span, .. }
            | ParseError::MissingClause { span, .. } => span.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;

/// Lex and parse a whole script, reporting every error found
pub fn parse_script(source: &str) -> std::result::Result<Script, Vec<ParseError>> {
    let tokens = lex(source).map_err(|spans| {
        spans
            .into_iter()
            .map(|span| ParseError::InvalidToken { span })
            .collect::<Vec<_>>()
    })?;
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    position: usize,
    current_line: usize,
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        let end = tokens.last().map(|(_, span)| span.end).unwrap_or(0);
        Self {
            tokens,
            position: 0,
            current_line: 1,
            end,
        }
    }

    /// Parse the full script.
    ///
    /// A bad statement is skipped up to the end of its line so later
    /// statements are still checked.
    pub fn parse(&mut self) -> std::result::Result<Script, Vec<ParseError>> {
        let mut statements = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_newlines();
            if self.peek().is_none() {
                break;
            }

            let start = self.current_span().start;
            let line = self.current_line;
            let parsed = self
                .parse_statement()
                .and_then(|kind| self.expect_end_of_statement().map(|_| kind));

            match parsed {
                Ok(kind) => statements.push(Statement {
                    kind,
                    span: start..self.previous_end(),
                    line,
                }),
                Err(e) => {
                    errors.push(e);
                    self.recover();
                }
            }
        }

        if errors.is_empty() {
            Ok(Script { statements })
        } else {
            Err(errors)
        }
    }

    fn parse_statement(&mut self) -> Result<StatementKind> {
        match self.peek() {
            Some(Token::Material) => {
                self.advance();
                Ok(StatementKind::Material(self.expect_name("material ID")?))
            }
            Some(Token::Force) => Ok(StatementKind::Force(self.parse_force()?)),
            Some(Token::Stress) => Ok(StatementKind::Stress(self.parse_stress()?)),
            Some(Token::Life) => Ok(StatementKind::Life(self.parse_life()?)),
            Some(Token::Speed) => Ok(StatementKind::Speed(self.parse_speed()?)),
            Some(Token::Recommend) => {
                self.advance();
                Ok(StatementKind::Recommend(self.expect_name("operation")?))
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "a statement (material, force, stress, life, speed, recommend)".to_string(),
                got: other.to_string(),
                span: self.current_span(),
            }),
            None => Err(self.eof("a statement")),
        }
    }

    fn parse_force(&mut self) -> Result<ForceQuery> {
        self.consume(Token::Force)?;
        self.consume(Token::Chip)?;
        let mut query = ForceQuery {
            chip_thickness_mm: self.expect_number()?,
            ..Default::default()
        };

        loop {
            let span = self.current_span();
            match self.peek() {
                Some(Token::Width) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut query.chip_width_mm, value, "width", span)?;
                }
                Some(Token::Temp) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut query.temperature_c, value, "temp", span)?;
                }
                Some(Token::Speed) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut query.speed_m_min, value, "speed", span)?;
                }
                Some(Token::Geometry) => {
                    if query.geometry {
                        return Err(ParseError::DuplicateClause {
                            clause: "geometry",
                            span,
                        });
                    }
                    self.advance();
                    query.geometry = true;
                }
                _ => break,
            }
        }

        Ok(query)
    }

    fn parse_stress(&mut self) -> Result<StressQuery> {
        let start = self.current_span().start;
        self.consume(Token::Stress)?;
        let (mut strain, mut rate, mut temp) = (None, None, None);

        loop {
            let span = self.current_span();
            match self.peek() {
                Some(Token::Strain) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut strain, value, "strain", span)?;
                }
                Some(Token::Rate) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut rate, value, "rate", span)?;
                }
                Some(Token::Temp) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut temp, value, "temp", span)?;
                }
                _ => break,
            }
        }

        let span = start..self.previous_end();
        Ok(StressQuery {
            strain: required(strain, "strain", &span)?,
            strain_rate: required(rate, "rate", &span)?,
            temperature_c: required(temp, "temp", &span)?,
        })
    }

    fn parse_life(&mut self) -> Result<LifeQuery> {
        let start = self.current_span().start;
        self.consume(Token::Life)?;
        let (mut speed, mut depth, mut coolant) = (None, None, None);

        loop {
            let span = self.current_span();
            match self.peek() {
                Some(Token::Speed) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut speed, value, "speed", span)?;
                }
                Some(Token::Depth) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut depth, value, "depth", span)?;
                }
                Some(Token::Coolant) => {
                    self.advance();
                    let value = self.expect_name("coolant name")?;
                    set_once(&mut coolant, value, "coolant", span)?;
                }
                _ => break,
            }
        }

        let span = start..self.previous_end();
        Ok(LifeQuery {
            speed_m_min: required(speed, "speed", &span)?,
            depth_mm: required(depth, "depth", &span)?,
            coolant: required(coolant, "coolant", &span)?,
        })
    }

    fn parse_speed(&mut self) -> Result<SpeedQuery> {
        let start = self.current_span().start;
        self.consume(Token::Speed)?;
        let (mut life, mut depth, mut coolant) = (None, None, None);

        loop {
            let span = self.current_span();
            match self.peek() {
                Some(Token::Life) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut life, value, "life", span)?;
                }
                Some(Token::Depth) => {
                    self.advance();
                    let value = self.expect_number()?;
                    set_once(&mut depth, value, "depth", span)?;
                }
                Some(Token::Coolant) => {
                    self.advance();
                    let value = self.expect_name("coolant name")?;
                    set_once(&mut coolant, value, "coolant", span)?;
                }
                _ => break,
            }
        }

        let span = start..self.previous_end();
        Ok(SpeedQuery {
            life_min: required(life, "life", &span)?,
            depth_mm: required(depth, "depth", &span)?,
            coolant: required(coolant, "coolant", &span)?,
        })
    }

    // Helper methods

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position).map(|(t, _)| t)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.position)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.end..self.end)
    }

    fn previous_end(&self) -> usize {
        self.position
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, span)| span.end)
            .unwrap_or(0)
    }

    fn consume(&mut self, expected: Token) -> Result<()> {
        match self.peek() {
            Some(token) if token == &expected => {
                self.advance();
                Ok(())
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: expected.to_string(),
                got: other.to_string(),
                span: self.current_span(),
            }),
            None => Err(self.eof(&expected.to_string())),
        }
    }

    fn expect_number(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Number(Some(n))) => {
                let val = *n;
                self.advance();
                Ok(val)
            }
            Some(Token::Number(None)) => Err(ParseError::InvalidNumber {
                span: self.current_span(),
            }),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "number".to_string(),
                got: other.to_string(),
                span: self.current_span(),
            }),
            None => Err(self.eof("number")),
        }
    }

    /// Identifier or quoted string
    fn expect_name(&mut self, what: &str) -> Result<String> {
        match self.peek() {
            Some(Token::Ident(name)) | Some(Token::String(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: what.to_string(),
                got: other.to_string(),
                span: self.current_span(),
            }),
            None => Err(self.eof(what)),
        }
    }

    fn expect_end_of_statement(&self) -> Result<()> {
        match self.peek() {
            None | Some(Token::Newline) => Ok(()),
            Some(other) => Err(ParseError::UnexpectedToken {
                expected: "end of line".to_string(),
                got: other.to_string(),
                span: self.current_span(),
            }),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek() == Some(&Token::Newline) {
            self.current_line += 1;
            self.advance();
        }
    }

    /// Skip the rest of a bad statement
    fn recover(&mut self) {
        while !matches!(self.peek(), None | Some(Token::Newline)) {
            self.advance();
        }
    }

    fn eof(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedEof {
            expected: expected.to_string(),
            span: self.end..self.end,
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, clause: &'static str, span: Span) -> Result<()> {
    if slot.is_some() {
        return Err(ParseError::DuplicateClause { clause, span });
    }
    *slot = Some(value);
    Ok(())
}

fn required<T>(slot: Option<T>, clause: &'static str, span: &Span) -> Result<T> {
    slot.ok_or_else(|| ParseError::MissingClause {
        clause,
        span: span.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_ok(input: &str) -> Vec<StatementKind> {
        parse_script(input)
            .expect("script should parse")
            .statements
            .into_iter()
            .map(|s| s.kind)
            .collect()
    }

    #[test]
    fn test_parse_full_script() {
        let input = r#"
# A2 annealed, roughing
material P-CS-109
force chip 0.15
force chip 0.2 width 2 temp 300 speed 150 geometry
stress strain 0.2 rate 1000 temp 500
life speed 30 depth 1.5 coolant dry
speed life 20 depth 2 coolant "flood"
recommend turning
"#;

        assert_eq!(
            parse_ok(input),
            vec![
                StatementKind::Material("P-CS-109".to_string()),
                StatementKind::Force(ForceQuery {
                    chip_thickness_mm: 0.15,
                    ..Default::default()
                }),
                StatementKind::Force(ForceQuery {
                    chip_thickness_mm: 0.2,
                    chip_width_mm: Some(2.0),
                    temperature_c: Some(300.0),
                    speed_m_min: Some(150.0),
                    geometry: true,
                }),
                StatementKind::Stress(StressQuery {
                    strain: 0.2,
                    strain_rate: 1000.0,
                    temperature_c: 500.0,
                }),
                StatementKind::Life(LifeQuery {
                    speed_m_min: 30.0,
                    depth_mm: 1.5,
                    coolant: "dry".to_string(),
                }),
                StatementKind::Speed(SpeedQuery {
                    life_min: 20.0,
                    depth_mm: 2.0,
                    coolant: "flood".to_string(),
                }),
                StatementKind::Recommend("turning".to_string()),
            ]
        );
    }

    #[test]
    fn test_clauses_in_any_order() {
        assert_eq!(
            parse_ok("life coolant mist depth 1 speed 80"),
            vec![StatementKind::Life(LifeQuery {
                speed_m_min: 80.0,
                depth_mm: 1.0,
                coolant: "mist".to_string(),
            })]
        );
    }

    #[test]
    fn test_statement_lines_and_spans() {
        let input = "material P-CS-101\n\n  recommend milling";
        let script = parse_script(input).unwrap();
        assert_eq!(script.statements[0].line, 1);
        assert_eq!(script.statements[1].line, 3);
        assert_eq!(&input[script.statements[1].span.clone()], "recommend milling");
    }

    #[test]
    fn test_missing_clause() {
        let errors = parse_script("stress strain 0.1 temp 20").unwrap_err();
        assert_eq!(
            errors,
            vec![ParseError::MissingClause {
                clause: "rate",
                span: 0..25,
            }]
        );
    }

    #[test]
    fn test_duplicate_clause() {
        let errors = parse_script("force chip 0.1 width 1 width 2").unwrap_err();
        assert_eq!(
            errors,
            vec![ParseError::DuplicateClause {
                clause: "width",
                span: 23..28,
            }]
        );
    }

    #[test]
    fn test_errors_are_collected_per_line() {
        let input = "material\nlife speed 30 depth 1 coolant dry\nforce chip fast\nrecommend turning extra";
        let errors = parse_script(input).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], ParseError::UnexpectedToken { ref expected, .. } if expected == "material ID"));
        assert!(matches!(errors[1], ParseError::UnexpectedToken { ref expected, .. } if expected == "number"));
        assert!(matches!(errors[2], ParseError::UnexpectedToken { ref expected, .. } if expected == "end of line"));
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let errors = parse_script("force chip").unwrap_err();
        assert_eq!(
            errors,
            vec![ParseError::UnexpectedEof {
                expected: "number".to_string(),
                span: 10..10,
            }]
        );
    }

    #[test]
    fn test_invalid_characters() {
        let errors = parse_script("life speed 30 @").unwrap_err();
        assert_eq!(errors, vec![ParseError::InvalidToken { span: 14..15 }]);
    }

    #[test]
    fn test_unknown_statement() {
        let errors = parse_script("grind P-CS-101").unwrap_err();
        assert_eq!(errors[0].span(), 0..5);
    }

    #[test]
    fn test_empty_script() {
        assert_eq!(parse_ok("# nothing here\n\n"), vec![]);
    }
}
