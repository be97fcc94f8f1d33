use logos::Logos;

/// Tokens for the job-script language
/// One query per line, keywords followed by values:
/// `force chip 0.15 width 2 geometry`

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f\r]+")] // Skip whitespace
pub enum Token {
    // Literals
    #[regex(r"-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(Option<f64>),

    #[regex(r#""[^"\n]*""#, |lex| lex.slice()[1..lex.slice().len()-1].to_string())]
    String(String),

    // Material IDs (P-CS-109), coolant and operation names
    #[regex(r"[A-Za-z_][A-Za-z0-9_.\-]*", |lex| lex.slice().to_string())]
    Ident(String),

    // Keywords - statements
    #[token("material")]
    Material,

    #[token("force")]
    Force,

    #[token("stress")]
    Stress,

    #[token("life")]
    Life,

    #[token("speed")]
    Speed,

    #[token("recommend")]
    Recommend,

    // Keywords - clauses
    #[token("chip")]
    Chip,

    #[token("width")]
    Width,

    #[token("temp")]
    #[token("temperature")]
    Temp,

    #[token("geometry")]
    Geometry,

    #[token("strain")]
    Strain,

    #[token("rate")]
    Rate,

    #[token("depth")]
    Depth,

    #[token("coolant")]
    Coolant,

    // Statement separator
    #[token("\n")]
    Newline,

    // Comments
    #[regex(r"#[^\n]*", logos::skip)]
    Comment,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(Some(n)) => write!(f, "number {}", n),
            Token::Number(None) => write!(f, "malformed number"),
            Token::String(s) => write!(f, "string \"{}\"", s),
            Token::Ident(s) => write!(f, "'{}'", s),
            Token::Material => write!(f, "'material'"),
            Token::Force => write!(f, "'force'"),
            Token::Stress => write!(f, "'stress'"),
            Token::Life => write!(f, "'life'"),
            Token::Speed => write!(f, "'speed'"),
            Token::Recommend => write!(f, "'recommend'"),
            Token::Chip => write!(f, "'chip'"),
            Token::Width => write!(f, "'width'"),
            Token::Temp => write!(f, "'temp'"),
            Token::Geometry => write!(f, "'geometry'"),
            Token::Strain => write!(f, "'strain'"),
            Token::Rate => write!(f, "'rate'"),
            Token::Depth => write!(f, "'depth'"),
            Token::Coolant => write!(f, "'coolant'"),
            Token::Newline => write!(f, "end of line"),
            Token::Comment => write!(f, "comment"),
        }
    }
}

/// Lex the input string into tokens.
///
/// Unrecognised input is returned as the spans it covers, all of them.
pub fn lex(input: &str) -> Result<Vec<(Token, logos::Span)>, Vec<logos::Span>> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (result, span) in Token::lexer(input).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => errors.push(span),
        }
    }

    if errors.is_empty() {
        Ok(tokens)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_force_query() {
        assert_eq!(
            tokens("force chip 0.15 width 2 geometry"),
            vec![
                Token::Force,
                Token::Chip,
                Token::Number(Some(0.15)),
                Token::Width,
                Token::Number(Some(2.0)),
                Token::Geometry,
            ]
        );
    }

    #[test]
    fn test_material_ids_are_idents() {
        assert_eq!(
            tokens("material P-CS-109"),
            vec![Token::Material, Token::Ident("P-CS-109".to_string())]
        );
    }

    #[test]
    fn test_keyword_prefix_is_an_ident() {
        assert_eq!(
            tokens("speedy lifetime"),
            vec![
                Token::Ident("speedy".to_string()),
                Token::Ident("lifetime".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("-40 .5 1e3 2.5E-2"),
            vec![
                Token::Number(Some(-40.0)),
                Token::Number(Some(0.5)),
                Token::Number(Some(1000.0)),
                Token::Number(Some(0.025)),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let input = "# header\nmaterial P-CS-110 # hardened\n\nrecommend turning\n";
        assert_eq!(
            tokens(input),
            vec![
                Token::Newline,
                Token::Material,
                Token::Ident("P-CS-110".to_string()),
                Token::Newline,
                Token::Newline,
                Token::Recommend,
                Token::Ident("turning".to_string()),
                Token::Newline,
            ]
        );
    }

    #[test]
    fn test_quoted_string() {
        assert_eq!(
            tokens("coolant \"flood\""),
            vec![Token::Coolant, Token::String("flood".to_string())]
        );
    }

    #[test]
    fn test_invalid_characters_are_reported() {
        let errors = lex("life speed 30 @ depth 1 $").unwrap_err();
        assert_eq!(errors, vec![14..15, 24..25]);
    }
}
