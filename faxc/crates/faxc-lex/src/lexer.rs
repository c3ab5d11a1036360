//! Main lexer implementation for the Fax programming language.
//!
//! This module provides the `Lexer` struct which transforms source code
//! into a stream of tokens. It handles all token types including keywords,
//! identifiers, literals, operators, and delimiters.

use faxc_util::{Handler, Span};

use crate::cursor::Cursor;
use crate::token::{keyword_from_ident, Token};
use crate::unicode::{
    codepoint_to_char, is_ascii_ident_continue, is_ascii_ident_start, is_digit_in_base,
    parse_hex_byte, parse_hex_codepoint,
};

/// The main lexer for Fax source code.
///
/// The lexer transforms source code into a stream of tokens using a
/// recursive descent approach. It maintains a cursor for position tracking
/// and a handler for error reporting.
///
/// # Example
///
/// ```
/// use faxc_util::Handler;
/// use faxc_lex::lexer::Lexer;
/// use faxc_lex::token::Token;
///
/// let mut handler = Handler::new();
/// let mut lexer = Lexer::new("let x = 42;", &mut handler);
///
/// assert_eq!(lexer.next_token(), Token::Let);
/// assert_eq!(lexer.next_token(), Token::Ident(faxc_util::Symbol::intern("x")));
/// ```
pub struct Lexer<'a> {
    /// Character cursor for traversing source.
    cursor: Cursor<'a>,

    /// Diagnostic handler for error reporting.
    handler: &'a mut Handler,

    /// Start position of the current token.
    token_start: usize,

    /// Start line of the current token.
    token_start_line: u32,

    /// Start column of the current token.
    token_start_column: u32,

    /// Whether we've checked for BOM at file start
    bom_checked: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given source code.
    ///
    /// # Arguments
    ///
    /// * `source` - The source code to lex
    /// * `handler` - Error handler for reporting lexical errors
    ///
    /// # Example
    ///
    /// ```
    /// use faxc_util::Handler;
    /// use faxc_lex::lexer::Lexer;
    ///
    /// let mut handler = Handler::new();
    /// let lexer = Lexer::new("let x = 42;", &mut handler);
    /// ```
    pub fn new(source: &'a str, handler: &'a mut Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_start: 0,
            token_start_line: 1,
            token_start_column: 1,
            bom_checked: false,
        }
    }

    /// Returns the next token from the source.
    ///
    /// This is the main entry point for tokenization. It skips whitespace
    /// and comments, then dispatches to the appropriate lexer function
    /// based on the first character.
    ///
    /// # Returns
    ///
    /// The next token, or `Token::Eof` if at end of input.
    ///
    /// # Example
    ///
    /// ```
    /// use faxc_util::Handler;
    /// use faxc_lex::lexer::Lexer;
    /// use faxc_lex::token::Token;
    ///
    /// let mut handler = Handler::new();
    /// let mut lexer = Lexer::new("let x = 42;", &mut handler);
    ///
    /// assert_eq!(lexer.next_token(), Token::Let);
    /// ```
    pub fn next_token(&mut self) -> Token {
        // Skip whitespace and comments
        self.skip_whitespace_and_comments();

        // Record start position of this token
        self.token_start = self.cursor.position();
        self.token_start_line = self.cursor.line();
        self.token_start_column = self.cursor.column();

        // Check for end of file
        if self.cursor.is_at_end() {
            return Token::Eof;
        }

        // Dispatch based on first character
        match self.cursor.current_char() {
            // Single-character delimiters
            '(' => {
                self.cursor.advance();
                Token::LParen
            }
            ')' => {
                self.cursor.advance();
                Token::RParen
            }
            '{' => {
                self.cursor.advance();
                Token::LBrace
            }
            '}' => {
                self.cursor.advance();
                Token::RBrace
            }
            '[' => {
                self.cursor.advance();
                Token::LBracket
            }
            ']' => {
                self.cursor.advance();
                Token::RBracket
            }
            ',' => {
                self.cursor.advance();
                Token::Comma
            }
            ';' => {
                self.cursor.advance();
                Token::Semicolon
            }

            // Multi-character operators - dispatch to specific handlers
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '/' => self.lex_slash(),
            '%' => self.lex_percent(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '&' => self.lex_ampersand(),
            '|' => self.lex_pipe(),
            ':' => self.lex_colon(),
            '.' => self.lex_dot(),
            '^' => self.lex_caret(),
            '~' => self.lex_tilde(),

            // String and char literals
            '"' => self.lex_string(),
            '\'' => self.lex_char(),

            // Macro metavariable prefix
            '$' => {
                self.cursor.advance();
                Token::Dollar
            }

            // Pattern binding modifier
            '@' => {
                self.cursor.advance();
                Token::At
            }

            // Wildcard pattern or identifier starting with underscore
            '_' => {
                self.cursor.advance();
                // If followed by alphanumeric, it's an identifier
                if is_ascii_ident_continue(self.cursor.current_char()) {
                    self.lex_identifier()
                } else {
                    Token::Underscore
                }
            }

            // Identifiers and keywords
            'r' => {
                let next_char = self.cursor.peek_char(1);
                if next_char == '"' || next_char == '#' {
                    self.lex_raw_string()
                } else {
                    self.lex_identifier()
                }
            },
            c if is_ascii_ident_start(c) => self.lex_identifier(),

            // Numbers
            c if c.is_ascii_digit() => self.lex_number(),

            // Unknown character
            c => {
                self.report_error(format!("unexpected character '{}'", c));
                self.cursor.advance();
                Token::Invalid(c.to_string())
            }
        }
    }

    /// Lexes an identifier or keyword.
    ///
    /// Identifiers start with a letter or underscore, followed by
    /// alphanumeric characters or underscores. After reading the identifier,
    /// checks if it matches a reserved keyword.
    ///
    /// # Returns
    ///
    /// Either a keyword token (e.g., `Token::Let`) or `Token::Ident(symbol)`
    fn lex_identifier(&mut self) -> Token {
        // Consume identifier characters
        while is_ascii_ident_continue(self.cursor.current_char()) {
            self.cursor.advance();
        }

        // Extract the identifier text
        let text = self.cursor.slice_from(self.token_start);

        // Check if it's a keyword
        keyword_from_ident(text).unwrap_or_else(|| Token::Ident(faxc_util::Symbol::intern(text)))
    }

    /// Lexes a number literal.
    ///
    /// Handles decimal, hexadecimal (0x), binary (0b), octal (0o), and
    /// floating-point formats.
    ///
    /// # Number Formats
    ///
    /// - Decimal: `42`, `123`, `0`
    /// - Hexadecimal: `0xFF`, `0xAB_CD`
    /// - Binary: `0b1010`, `0b1111_0000`
    /// - Octal: `0o777`
    /// - Float: `3.14`, `1e10`, `2.5e-3`
    ///
    /// # Returns
    ///
    /// Either `Token::Number(u64)` or `Token::Float(f64)`
    fn lex_number(&mut self) -> Token {
        // Check for special bases (hex, binary, octal)
        if self.cursor.current_char() == '0' && !self.cursor.is_at_end() {
            let start = self.cursor.position();
            self.cursor.advance();
            match self.cursor.current_char() {
                'x' | 'X' => {
                    self.cursor.advance();
                    return self.lex_integer(16, start);
                }
                'b' | 'B' => {
                    self.cursor.advance();
                    return self.lex_integer(2, start);
                }
                'o' | 'O' => {
                    self.cursor.advance();
                    return self.lex_integer(8, start);
                }
                _ => {
                    // Just a zero followed by non-digit - return 0
                    // Check if next char is not a digit (to avoid parsing 0123 as 0)
                    if !self.cursor.current_char().is_ascii_digit() 
                        && self.cursor.current_char() != '.' 
                        && self.cursor.current_char() != 'e' 
                        && self.cursor.current_char() != 'E' {
                        return Token::Number(0);
                    }
                    // Otherwise continue to parse as decimal (e.g., 0.5, 0e10)
                }
            }
        }

        let start = self.cursor.position();

        // Parse decimal integer part
        while self.cursor.current_char().is_ascii_digit() {
            self.cursor.advance();
        }

        // Check for float (decimal point or exponent)
        let is_float = (self.cursor.current_char() == '.'
            && self.cursor.peek_char(1).is_ascii_digit())
            || self.cursor.current_char() == 'e'
            || self.cursor.current_char() == 'E';

        if is_float {
            // Parse decimal point
            if self.cursor.current_char() == '.' {
                self.cursor.advance();
                while self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }
            }

            // Parse exponent (HIGH #15: require at least one digit)
            if self.cursor.current_char() == 'e' || self.cursor.current_char() == 'E' {
                let exp_start = self.cursor.position();
                self.cursor.advance();
                // Optional sign
                if self.cursor.current_char() == '+' || self.cursor.current_char() == '-' {
                    self.cursor.advance();
                }
                // Exponent digits
                while self.cursor.current_char().is_ascii_digit() {
                    self.cursor.advance();
                }

                // Check we got at least one digit after 'e'/'E'
                // More precise check: after e/E and optional sign, we need digits
                let after_e_pos = exp_start + 1;
                let has_sign = after_e_pos < self.cursor.position()
                    && (self.cursor.source()[after_e_pos..].starts_with('+')
                        || self.cursor.source()[after_e_pos..].starts_with('-'));
                let min_expected_pos = if has_sign { exp_start + 2 } else { exp_start + 1 };

                if self.cursor.position() < min_expected_pos {
                    self.report_error("no digits in float exponent".to_string());
                }
            }

            let text = self.cursor.slice_from(start);
            // CRITICAL #3: Check if result is finite (not infinity or NaN)
            match text.parse::<f64>() {
                Ok(value) if value.is_finite() => Token::Float(value),
                Ok(_) => {
                    self.report_error(format!("floating point literal '{}' is not finite", text));
                    Token::Float(0.0)
                }
                Err(e) => {
                    self.report_error(format!("invalid floating point literal '{}': {}", text, e));
                    Token::Float(0.0)
                }
            }
        } else {
            // Integer
            let text = self.cursor.slice_from(start);
            // CRITICAL #2: Use checked parsing with explicit error handling
            match text.parse::<u64>() {
                Ok(value) => Token::Number(value),
                Err(e) => {
                    self.report_error(format!("integer literal overflow: {}", e));
                    Token::Number(0)
                }
            }
        }
    }

    /// Lexes an integer with the specified base.
    ///
    /// # Arguments
    ///
    /// * `base` - The numeric base (2, 8, 10, or 16)
    /// * `start` - The starting position of the number (at the '0' before prefix)
    fn lex_integer(&mut self, base: u32, start: usize) -> Token {
        // Record position after prefix to check for at least one digit
        let digit_start = self.cursor.position();

        // Skip underscore separators and valid digits for the base
        loop {
            let c = self.cursor.current_char();
            if c == '_' {
                self.cursor.advance();
            } else if is_digit_in_base(c, base) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        // Check for at least one digit after prefix (HIGH #14)
        if digit_start == self.cursor.position() {
            self.report_error(format!("no digits after base-{} prefix", base));
            return Token::Number(0);
        }

        // Get the full text including prefix (e.g., "0xFF")
        let full_text = self.cursor.slice_from(start);
        // Skip the prefix (0x, 0b, 0o) for parsing
        let digits_text = &full_text[2..].replace('_', "");

        // CRITICAL #1: Proper overflow detection and error reporting
        let value = match u64::from_str_radix(digits_text, base) {
            Ok(v) => v,
            Err(e) => {
                self.report_error(format!("integer literal overflow: {}", e));
                0
            }
        };

        Token::Number(value)
    }

    /// Lexes a string literal.
    ///
    /// Parses a string enclosed in double quotes, handling escape sequences:
    /// - `\n` - Newline
    /// - `\t` - Tab
    /// - `\r` - Carriage return
    /// - `\\` - Backslash
    /// - `\"` - Double quote
    /// - `\0` - Null
    /// - `\xNN` - Hex byte
    /// - `\u{NNNN}` - Unicode codepoint
    ///
    /// # Returns
    ///
    /// `Token::String(symbol)` with the processed string content
    fn lex_string(&mut self) -> Token {
        // Consume opening quote
        self.cursor.advance();

        let mut content = String::new();

        loop {
            if self.cursor.is_at_end() {
                self.report_error("unterminated string literal".to_string());
                break;
            }

            let c = self.cursor.current_char();

            if c == '"' {
                self.cursor.advance();
                break;
            }

            if c == '\n' {
                self.report_error("unterminated string literal".to_string());
                break;
            }

            if c == '\\' {
                self.cursor.advance();
                if let Some(escaped) = self.parse_escape() {
                    content.push(escaped);
                }
            } else {
                content.push(c);
                self.cursor.advance();
            }
        }

        Token::String(faxc_util::Symbol::intern(&content))
    }


    /// Lexes a raw string literal (r"..." or r#"..."#).
    ///
    /// Raw strings don't process escape sequences and can contain quotes.
    /// The number of # characters determines the delimiter.
    ///
    /// # Returns
    ///
    /// `Token::RawString(symbol)` with the raw string content
    fn lex_raw_string(&mut self) -> Token {
        // Consume the 'r'
        self.cursor.advance();

        // Count the number of # characters (delimiter)
        let mut hash_count = 0;
        while self.cursor.current_char() == '#' {
            hash_count += 1;
            self.cursor.advance();
        }

        // Expect opening quote after r and hashes
        if self.cursor.current_char() != '"' {
            self.report_error("expected \" after raw string prefix".to_string());
            return Token::Invalid("raw".to_string());
        }
        self.cursor.advance();

        // Build the closing delimiter
        let mut closing_delimiter = String::from("\"");
        for _ in 0..hash_count {
            closing_delimiter.push('#');
        }
        closing_delimiter.push('"');

        // Accumulate content until we find the closing delimiter
        let mut content = String::new();
        let mut found_closing = false;

        while !self.cursor.is_at_end() {
            if self.cursor.current_char() == '"' {
                // Check if this is the closing delimiter
                let remaining = self.cursor.remaining();
                if remaining.starts_with(&closing_delimiter) {
                    // Consume the closing delimiter
                    for _ in 0..closing_delimiter.len() {
                        self.cursor.advance();
                    }
                    found_closing = true;
                    break;
                }
            }

            // Add current character to content
            content.push(self.cursor.current_char());
            self.cursor.advance();
        }

        if !found_closing {
            self.report_error("unterminated raw string literal".to_string());
        }

        Token::RawString(faxc_util::Symbol::intern(&content))
    }

    /// Lexes a character literal.
    ///
    /// Parses a character enclosed in single quotes, handling escape sequences.
    ///
    /// # Returns
    ///
    /// `Token::Char` containing the parsed character
    fn lex_char(&mut self) -> Token {
        // Consume opening quote
        self.cursor.advance();

        if self.cursor.is_at_end() {
            self.report_error("unterminated character literal".to_string());
            return Token::Char('\0');
        }

        let c = if self.cursor.current_char() == '\\' {
            self.cursor.advance();
            self.parse_escape().unwrap_or('\0')
        } else {
            let c = self.cursor.current_char();
            if c == '\'' || c == '\n' {
                self.report_error("empty character literal".to_string());
                return Token::Char('\0');
            }
            self.cursor.advance();
            c
        };

        // Expect closing quote
        if self.cursor.current_char() != '\'' {
            self.report_error("unterminated character literal".to_string());
            // Try to recover by skipping to end of line or next quote
            while !self.cursor.is_at_end()
                && self.cursor.current_char() != '\''
                && self.cursor.current_char() != '\n'
            {
                self.cursor.advance();
            }
        } else {
            self.cursor.advance();
        }

        Token::Char(c)
    }

    /// Parses an escape sequence.
    ///
    /// Handles: `\n`, `\t`, `\r`, `\\`, `\"`, `\'`, `\0`, `\xNN`, `\u{NNNN}`
    ///
    /// # Returns
    ///
    /// The escaped character, or None on error
    fn parse_escape(&mut self) -> Option<char> {
        if self.cursor.is_at_end() {
            self.report_error("unterminated escape sequence".to_string());
            return None;
        }

        let c = self.cursor.current_char();
        self.cursor.advance();

        match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            '\'' => Some('\''),
            '0' => Some('\0'),
            'x' => {
                // Hex escape: \xNN
                let mut hex = String::new();
                for _ in 0..2 {
                    if self.cursor.is_at_end() {
                        self.report_error("incomplete hex escape sequence".to_string());
                        return None;
                    }
                    let hc = self.cursor.current_char();
                    if hc.is_ascii_hexdigit() {
                        hex.push(hc);
                        self.cursor.advance();
                    } else {
                        self.report_error(format!("invalid hex escape character '{}'", hc));
                        return None;
                    }
                }
                parse_hex_byte(&hex)
                    .map(|b| b as char)
                    .or_else(|| {
                        self.report_error(format!("invalid hex escape value '{}'", hex));
                        None
                    })
            }
            'u' => {
                // Unicode escape: \u{NNNN}
                if self.cursor.current_char() != '{' {
                    self.report_error("expected '{' in unicode escape sequence".to_string());
                    return None;
                }
                self.cursor.advance();

                let mut hex = String::new();
                loop {
                    if self.cursor.is_at_end() {
                        self.report_error("unterminated unicode escape sequence".to_string());
                        return None;
                    }
                    let hc = self.cursor.current_char();
                    if hc == '}' {
                        self.cursor.advance();
                        break;
                    }
                    if hc.is_ascii_hexdigit() {
                        hex.push(hc);
                        self.cursor.advance();
                    } else {
                        self.report_error(format!("invalid unicode escape character '{}'", hc));
                        return None;
                    }
                }

                if hex.is_empty() {
                    self.report_error("empty unicode escape sequence".to_string());
                    return None;
                }

                // Parse the codepoint value first to check for surrogates
                let codepoint = parse_hex_codepoint(&hex);
                match codepoint {
                    Some(value) => {
                        // HIGH #4: Explicitly reject surrogate codepoints (D800-DFFF)
                        if (0xD800..=0xDFFF).contains(&value) {
                            self.report_error(format!(
                                "unicode escape sequence is a surrogate: U+{:04X}",
                                value
                            ));
                            return Some('\u{FFFD}'); // Replacement character
                        }
                        codepoint_to_char(value).or_else(|| {
                            self.report_error(format!("invalid unicode codepoint '{}'", hex));
                            None
                        })
                    }
                    None => {
                        self.report_error(format!("invalid unicode codepoint '{}'", hex));
                        None
                    }
                }
            }
            _ => {
                self.report_error(format!("unknown escape sequence '\\{}'", c));
                Some(c)
            }
        }
    }

    /// Lexes plus or plus-equals.
    ///
    /// Handles: `+`, `+=`
    fn lex_plus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::PlusEq
        } else {
            Token::Plus
        }
    }

    /// Lexes minus, arrow, or minus-equals.
    ///
    /// Handles: `-`, `->`, `-=`
    fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('>') {
            Token::Arrow
        } else if self.cursor.match_char('=') {
            Token::MinusEq
        } else {
            Token::Minus
        }
    }

    /// Lexes star or star-equals.
    ///
    /// Handles: `*`, `*=`
    fn lex_star(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::StarEq
        } else {
            Token::Star
        }
    }

    /// Lexes slash, comment start, or slash-equals.
    ///
    /// Handles: `/`, `//`, `/* */`, `/=`
    fn lex_slash(&mut self) -> Token {
        self.cursor.advance();

        // Check for line comment
        if self.cursor.match_char('/') {
            // Skip until end of line
            while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                self.cursor.advance();
            }
            // Recursively skip more whitespace/comments
            self.skip_whitespace_and_comments();
            // Return next token (comments are not tokens)
            return self.next_token();
        }

        // Check for block comment
        if self.cursor.match_char('*') {
            self.skip_block_comment();
            // Recursively skip more whitespace/comments
            self.skip_whitespace_and_comments();
            // Return next token
            return self.next_token();
        }

        // Check for slash-equals
        if self.cursor.match_char('=') {
            Token::SlashEq
        } else {
            Token::Slash
        }
    }

    /// Lexes percent or percent-equals.
    ///
    /// Handles: `%`, `%=`
    fn lex_percent(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::PercentEq
        } else {
            Token::Percent
        }
    }

    /// Lexes equals, equals-equals, or fat arrow.
    ///
    /// Handles: `=`, `==`, `=>`
    fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::EqEq
        } else if self.cursor.match_char('>') {
            Token::FatArrow
        } else {
            Token::Eq
        }
    }

    /// Lexes bang or not-equals.
    ///
    /// Handles: `!`, `!=`
    fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::NotEq
        } else {
            Token::Bang
        }
    }

    /// Lexes less, less-equals, left shift, or shift-left-equals.
    ///
    /// Handles: `<`, `<=`, `<<`, `<<=`
    fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::LtEq
        } else if self.cursor.match_char('<') {
            // Check for <<=
            if self.cursor.match_char('=') {
                Token::ShlEq
            } else {
                Token::Shl
            }
        } else {
            Token::Lt
        }
    }

    /// Lexes greater, greater-equals, right shift, or shift-right-equals.
    ///
    /// Handles: `>`, `>=`, `>>`, `>>=`
    fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::GtEq
        } else if self.cursor.match_char('>') {
            // Check for >>=
            if self.cursor.match_char('=') {
                Token::ShrEq
            } else {
                Token::Shr
            }
        } else {
            Token::Gt
        }
    }

    /// Lexes ampersand, logical and, or ampersand-equals.
    ///
    /// Handles: `&`, `&&`, `&=`
    fn lex_ampersand(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('&') {
            Token::AndAnd
        } else if self.cursor.match_char('=') {
            Token::AmpersandEq
        } else {
            Token::Ampersand
        }
    }

    /// Lexes pipe, logical or, or pipe-equals.
    ///
    /// Handles: `|`, `||`, `|=`
    fn lex_pipe(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('|') {
            Token::OrOr
        } else if self.cursor.match_char('=') {
            Token::PipeEq
        } else {
            Token::Pipe
        }
    }

    /// Lexes caret (bitwise XOR) or caret-equals.
    ///
    /// Handles: `^`, `^=`
    fn lex_caret(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            Token::CaretEq
        } else {
            Token::Caret
        }
    }

    /// Lexes tilde (bitwise NOT).
    ///
    /// Handles: `~`
    fn lex_tilde(&mut self) -> Token {
        self.cursor.advance();
        Token::Tilde
    }

    /// Lexes colon or double colon.
    ///
    /// Handles: `:`, `::`
    fn lex_colon(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char(':') {
            Token::ColonColon
        } else {
            Token::Colon
        }
    }

    /// Lexes dot, double dot, inclusive range, or triple dot.
    ///
    /// Handles: `.`, `..`, `..=`, `...`
    fn lex_dot(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('.') {
            if self.cursor.match_char('=') {
                Token::DotDotEq
            } else if self.cursor.match_char('.') {
                Token::DotDotDot
            } else {
                Token::DotDot
            }
        } else {
            Token::Dot
        }
    }

    /// Skips a block comment.
    ///
    /// Handles nested block comments with a depth counter.
    /// HIGH #9: Limits nesting depth to prevent stack overflow.
    fn skip_block_comment(&mut self) {
        const MAX_COMMENT_DEPTH: u32 = 100;
        let mut depth = 1;

        while depth > 0 && !self.cursor.is_at_end() {
            // HIGH #9: Check for maximum nesting depth
            if depth > MAX_COMMENT_DEPTH {
                self.report_error(format!(
                    "block comment nesting too deep (maximum is {} levels)",
                    MAX_COMMENT_DEPTH
                ));
                return;
            }

            if self.cursor.current_char() == '/' && self.cursor.peek_char(1) == '*' {
                self.cursor.advance();
                self.cursor.advance();
                depth += 1;
            } else if self.cursor.current_char() == '*' && self.cursor.peek_char(1) == '/' {
                self.cursor.advance();
                self.cursor.advance();
                depth -= 1;
            } else {
                self.cursor.advance();
            }
        }

        if depth > 0 {
            self.report_error("unterminated block comment".to_string());
        }
    }

    /// Skips whitespace and comments.
    ///
    /// Skips all whitespace characters and comments (both line and block).
    /// This is called before lexing each token.
    /// LOW #12: Handles UTF-8 BOM at file start.
    fn skip_whitespace_and_comments(&mut self) {
        // LOW #12: Skip UTF-8 BOM if present at very start of file (only once)
        // BOM is U+FEFF encoded as EF BB BF in UTF-8
        // Note: U+FEFF is considered whitespace by Unicode, so we must check for it
        // BEFORE calling skip_whitespace()
        if !self.bom_checked {
            self.bom_checked = true;
            if self.cursor.remaining().starts_with("\u{FEFF}") {
                self.cursor.advance(); // Skip the BOM character
            }
        }

        loop {
            // Skip whitespace (this will NOT include BOM since we already handled it)
            self.cursor.skip_whitespace();

            // Check for comment
            if self.cursor.is_at_end() {
                break;
            }

            // Check for line comment
            if self.cursor.current_char() == '/' && self.cursor.peek_char(1) == '/' {
                self.cursor.advance(); // /
                self.cursor.advance(); // /
                while !self.cursor.is_at_end() && self.cursor.current_char() != '\n' {
                    self.cursor.advance();
                }
                continue;
            }

            // Check for block comment
            if self.cursor.current_char() == '/' && self.cursor.peek_char(1) == '*' {
                self.cursor.advance(); // /
                self.cursor.advance(); // *
                self.skip_block_comment();
                continue;
            }

            // No more whitespace or comments
            break;
        }
    }

    /// Reports a lexical error.
    ///
    /// Creates and emits an error diagnostic at the current token position.
    ///
    /// # Arguments
    ///
    /// * `message` - The error message
    fn report_error(&mut self, message: String) {
        let span = Span::new(
            self.token_start,
            self.cursor.position(),
            self.token_start_line,
            self.token_start_column,
        );
        self.handler.error(message, span);
    }

    /// Returns the current line number.
    pub fn line(&self) -> u32 {
        self.cursor.line()
    }

    /// Returns the current column number.
    pub fn column(&self) -> u32 {
        self.cursor.column()
    }

    /// Returns the current position in the source.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }
}

/// Make Lexer an iterator over tokens.
impl<'a> Iterator for Lexer<'a> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token == Token::Eof {
            None
        } else {
            Some(token)
        }
    }
}
