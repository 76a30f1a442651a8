//! Pratt (Top-Down Operator Precedence) parser.
//!
//! Each token kind has an optional prefix (`nud`) handler and an optional
//! infix (`led`) handler with a binding power from [`power::infix_power`].
//! `parse_expression(rbp)` parses one prefix then greedily consumes
//! infixes while their binding power exceeds `rbp`. Binary operators are
//! left-associative: a `led` parses its right operand at its own binding
//! power, so a later operator of equal power is picked up by the *outer*
//! loop instead of nesting into the right operand. `:=` and the else-arm
//! of `?` are the two right-associative exceptions, parsing their right
//! operand at `power - 1`.

#![cfg_attr(test, allow(clippy::panic, clippy::unwrap_used, clippy::expect_used))]

mod power;

use jq_ast::{
    Arena, BinaryOp, Callee, CompiledExpr, Node, NodeId, NodeKind, SortDirection, SortKey, Arg,
    VariableRef,
};
use jq_diagnostics_codes::DiagnosticCode;
use jq_error::ParseError;
use jq_lexer::Lexer;
use jq_token::{Token, TokenKind};

use power::infix_power;

/// Binding power of unary prefix `-` and the `<`/`>` sort-direction
/// markers: tighter than every binary operator except path (`.`/`**`) and
/// postfix filter/call/group (`[`/`{`/`(`), so `-a.b` is `-(a.b)` but
/// `-a*b` is `(-a)*b`.
const UNARY_POWER: u8 = 65;

/// Default cap on `parse_expression` nesting depth, shared by [`compile`]
/// and [`compile_with_recovery`]. A caller that needs a tighter budget
/// (e.g. an engine fronting untrusted queries) should use
/// [`compile_with_max_depth`] instead.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Parse `source` into a [`CompiledExpr`], failing fast on the first
/// lexical or syntactic error (no local recovery). Callers that want every
/// diagnostic a query produces should use [`compile_with_recovery`]
/// instead.
pub fn compile(source: &str) -> Result<CompiledExpr, ParseError> {
    compile_with_max_depth(source, DEFAULT_MAX_DEPTH)
}

/// As [`compile`], but with an explicit cap on expression nesting depth —
/// the parser's own recursion budget, distinct from the evaluator's
/// `with_max_depth` (which bounds lambda call recursion at *eval* time,
/// not parse time). A pathologically nested query (`((((((...))))))`)
/// would otherwise recurse the parser's call stack as deep as the input;
/// this turns that into a regular `ParseError` instead of a stack
/// overflow.
pub fn compile_with_max_depth(source: &str, max_depth: usize) -> Result<CompiledExpr, ParseError> {
    let mut parser = Parser::new(source);
    parser.max_depth = max_depth;
    let root = parser.parse_expression(0)?;
    parser.expect_eof()?;
    Ok(CompiledExpr::new(source.to_string(), parser.arena, root))
}

/// Parse with error recovery: keeps going past a malformed sub-expression
/// in a list position (array/object/call argument lists, sort-key lists)
/// by skipping to the next list separator or closer, recording the error,
/// and splicing in a placeholder node so enclosing structure stays valid.
/// Still returns `Err` for the *primary* (first) error if any error was
/// seen — recovery exists to collect diagnostics, not to make a malformed
/// query succeed — but the caller gets every error that was found, not
/// just the first.
pub fn compile_with_recovery(source: &str) -> (Result<CompiledExpr, ParseError>, Vec<ParseError>) {
    let mut parser = Parser::new(source);
    parser.recovery = true;
    let result = parser.parse_expression(0).and_then(|root| {
        parser.expect_eof()?;
        Ok(root)
    });
    match result {
        Ok(root) => {
            if parser.errors.is_empty() {
                (Ok(CompiledExpr::new(source.to_string(), parser.arena, root)), Vec::new())
            } else {
                // At least one sub-expression was recovered from; the
                // overall compile still fails (no local recovery changes
                // that), but every error collected along the way is
                // returned for diagnostics.
                let primary = parser.errors[0].clone();
                (Err(primary), parser.errors)
            }
        }
        Err(top_level) => {
            parser.errors.push(top_level.clone());
            (Err(top_level), parser.errors)
        }
    }
}

struct Parser<'a> {
    source: &'a str,
    lexer: Lexer<'a>,
    current: Token,
    arena: Arena,
    recovery: bool,
    errors: Vec<ParseError>,
    /// Current `parse_expression` nesting depth; checked against
    /// `max_depth` on every entry (see `parse_expression`).
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next(true);
        Parser {
            source,
            lexer,
            current,
            arena: Arena::new(),
            recovery: false,
            errors: Vec::new(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    fn alloc(&mut self, kind: NodeKind, pos: usize) -> NodeId {
        self.arena.alloc(Node::new(kind, pos))
    }

    fn node_kind(&self, id: NodeId) -> &NodeKind {
        &self.arena.get(id).kind
    }

    /// Whether `id`'s node already carries a `keep_array` flag (set by an
    /// empty-bracket filter, or a path step that itself propagated one).
    /// Chained path steps inherit it from their left-hand side so
    /// `a[].b.c` keeps it all the way to the end.
    fn keep_array_of(&self, id: NodeId) -> bool {
        match self.node_kind(id) {
            NodeKind::Path { keep_array, .. } | NodeKind::Filter { keep_array, .. } => *keep_array,
            _ => false,
        }
    }

    /// Advance past the current token, choosing the lexer's `allow_regex`
    /// flag for the *next* token from whether the token we're leaving could
    /// have ended an expression (an operand) — if so, a following `/` is
    /// division; otherwise we're still in a position that admits a regex
    /// literal.
    fn bump(&mut self) -> Token {
        let allow_regex = !can_end_expression(self.current.kind);
        let prev = std::mem::replace(&mut self.current, self.lexer.next(allow_regex));
        prev
    }

    fn error_at(&self, code: DiagnosticCode, message: impl Into<String>, pos: usize) -> ParseError {
        ParseError::new(code, message, pos)
    }

    fn current_error(&self, code: DiagnosticCode, message: impl Into<String>) -> ParseError {
        self.error_at(code, message, self.current.start).with_token(self.current.text.to_string())
    }

    fn lexer_error_if_any(&self) -> Option<ParseError> {
        if self.current.kind == TokenKind::Error { self.lexer.error().cloned() } else { None }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if let Some(err) = self.lexer_error_if_any() {
            return Err(err);
        }
        if self.current.kind == kind {
            Ok(self.bump())
        } else {
            Err(self.current_error(
                DiagnosticCode::ExpectedToken,
                format!("expected {what}, found '{}'", self.current.text),
            ))
        }
    }

    fn expect_eof(&mut self) -> Result<(), ParseError> {
        if let Some(err) = self.lexer_error_if_any() {
            return Err(err);
        }
        if self.current.is_eof() {
            Ok(())
        } else {
            Err(self.current_error(
                DiagnosticCode::UnexpectedToken,
                format!("unexpected trailing token '{}'", self.current.text),
            ))
        }
    }

    /// Every recursive descent into a sub-expression (grouping, array/call
    /// arguments, lambda bodies, sort keys, ...) funnels back through this
    /// one entry point, so a single depth counter here bounds the parser's
    /// own call-stack usage regardless of which construct is nesting.
    fn parse_expression(&mut self, rbp: u8) -> Result<NodeId, ParseError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(self.current_error(
                DiagnosticCode::ParserRecursionLimit,
                format!("expression nested deeper than {} levels", self.max_depth),
            ));
        }
        let result = self.parse_expression_inner(rbp);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, rbp: u8) -> Result<NodeId, ParseError> {
        let mut left = self.parse_nud()?;
        loop {
            if let Some(err) = self.lexer_error_if_any() {
                return Err(err);
            }
            let Some(lbp) = infix_power(self.current.kind) else { break };
            if rbp >= lbp {
                break;
            }
            left = self.parse_led(left, lbp)?;
        }
        Ok(left)
    }

    fn parse_nud(&mut self) -> Result<NodeId, ParseError> {
        if let Some(err) = self.lexer_error_if_any() {
            return Err(err);
        }
        let tok = self.current.clone();
        match tok.kind {
            TokenKind::String => {
                self.bump();
                Ok(self.alloc(NodeKind::StringLiteral(tok.text.to_string()), tok.start))
            }
            TokenKind::Number => {
                self.bump();
                let n: f64 = tok.text.parse().map_err(|_| {
                    self.error_at(
                        DiagnosticCode::NumberOutOfRange,
                        format!("'{}' is not a valid number", tok.text),
                        tok.start,
                    )
                })?;
                Ok(self.alloc(NodeKind::NumberLiteral(n), tok.start))
            }
            TokenKind::True => {
                self.bump();
                Ok(self.alloc(NodeKind::BoolLiteral(true), tok.start))
            }
            TokenKind::False => {
                self.bump();
                Ok(self.alloc(NodeKind::BoolLiteral(false), tok.start))
            }
            TokenKind::Null => {
                self.bump();
                Ok(self.alloc(NodeKind::NullLiteral, tok.start))
            }
            TokenKind::Regex => {
                self.bump();
                Ok(self.alloc(NodeKind::RegexLiteral(tok.text.to_string()), tok.start))
            }
            TokenKind::EscapedName => {
                self.bump();
                Ok(self.alloc(NodeKind::EscapedName(tok.text.to_string()), tok.start))
            }
            TokenKind::Variable => {
                self.bump();
                Ok(self.alloc(NodeKind::Variable(variable_ref(&tok.text)), tok.start))
            }
            TokenKind::Name if &*tok.text == "function" || &*tok.text == "λ" => {
                self.bump();
                self.parse_lambda(tok.start)
            }
            TokenKind::Name | TokenKind::And | TokenKind::Or | TokenKind::In => {
                // Bareword field access; `and`/`or`/`in` double as field
                // names in prefix position since real-world data has
                // fields with these exact names.
                self.bump();
                Ok(self.alloc(NodeKind::Name(tok.text.to_string()), tok.start))
            }
            TokenKind::Minus => {
                self.bump();
                let operand = self.parse_expression(UNARY_POWER)?;
                Ok(self.alloc(NodeKind::Neg(operand), tok.start))
            }
            TokenKind::Percent => {
                self.bump();
                Ok(self.alloc(NodeKind::Parent, tok.start))
            }
            TokenKind::Star => {
                self.bump();
                Ok(self.alloc(NodeKind::Wildcard, tok.start))
            }
            TokenKind::DoubleStar => {
                self.bump();
                Ok(self.alloc(NodeKind::Descendant, tok.start))
            }
            TokenKind::LeftParen => self.parse_paren(tok.start),
            TokenKind::LeftBracket => self.parse_array_ctor(tok.start),
            TokenKind::LeftBrace => self.parse_object_ctor(tok.start, None),
            _ => Err(self.current_error(
                DiagnosticCode::UnexpectedToken,
                format!("unexpected token '{}'", tok.text),
            )),
        }
    }

    fn parse_led(&mut self, left: NodeId, lbp: u8) -> Result<NodeId, ParseError> {
        let tok = self.bump();
        match tok.kind {
            TokenKind::Dot => {
                let rhs = self.parse_expression(lbp)?;
                let keep_array = self.keep_array_of(left);
                Ok(self.alloc(NodeKind::Path { lhs: left, rhs, keep_array }, tok.start))
            }
            TokenKind::DoubleStar => {
                // `a ** b` is sugar for `a.**.b`: a descendant step from
                // `a`, then `b` evaluated against each descendant.
                let desc = self.alloc(NodeKind::Descendant, tok.start);
                let stepped =
                    self.alloc(NodeKind::Path { lhs: left, rhs: desc, keep_array: false }, tok.start);
                let rhs = self.parse_expression(lbp)?;
                Ok(self.alloc(NodeKind::Path { lhs: stepped, rhs, keep_array: false }, tok.start))
            }
            TokenKind::LeftBracket => self.parse_filter(left, tok.start),
            TokenKind::LeftBrace => self.parse_object_ctor(tok.start, Some(left)),
            TokenKind::LeftParen => self.parse_call(left, tok.start),
            TokenKind::Caret => self.parse_sort(left, tok.start),
            TokenKind::Star => self.binary(left, BinaryOp::Mul, lbp, tok.start),
            TokenKind::Slash => self.binary(left, BinaryOp::Div, lbp, tok.start),
            TokenKind::Percent => self.binary(left, BinaryOp::Mod, lbp, tok.start),
            TokenKind::Plus => self.binary(left, BinaryOp::Add, lbp, tok.start),
            TokenKind::Minus => self.binary(left, BinaryOp::Sub, lbp, tok.start),
            TokenKind::Ampersand => self.binary(left, BinaryOp::Concat, lbp, tok.start),
            TokenKind::Range => {
                let rhs = self.parse_expression(lbp)?;
                Ok(self.alloc(NodeKind::Range { from: left, to: rhs }, tok.start))
            }
            TokenKind::Equal => self.binary(left, BinaryOp::Eq, lbp, tok.start),
            TokenKind::NotEqual => self.binary(left, BinaryOp::Ne, lbp, tok.start),
            TokenKind::Less => self.binary(left, BinaryOp::Lt, lbp, tok.start),
            TokenKind::LessEqual => self.binary(left, BinaryOp::Le, lbp, tok.start),
            TokenKind::Greater => self.binary(left, BinaryOp::Gt, lbp, tok.start),
            TokenKind::GreaterEqual => self.binary(left, BinaryOp::Ge, lbp, tok.start),
            TokenKind::In => self.binary(left, BinaryOp::In, lbp, tok.start),
            TokenKind::And => self.binary(left, BinaryOp::And, lbp, tok.start),
            TokenKind::Or => self.binary(left, BinaryOp::Or, lbp, tok.start),
            TokenKind::Coalesce => self.binary(left, BinaryOp::Coalesce, lbp, tok.start),
            TokenKind::Apply => {
                let rhs = self.parse_expression(lbp)?;
                Ok(self.alloc(NodeKind::Apply { lhs: left, rhs }, tok.start))
            }
            TokenKind::Question => {
                let then_branch = self.parse_expression(0)?;
                let else_branch = if self.current.kind == TokenKind::Colon {
                    self.bump();
                    Some(self.parse_expression(lbp - 1)?)
                } else {
                    None
                };
                Ok(self.alloc(NodeKind::Condition { cond: left, then_branch, else_branch }, tok.start))
            }
            TokenKind::Bind => {
                let name = match self.node_kind(left) {
                    NodeKind::Variable(VariableRef::Named(name)) => name.clone(),
                    _ => {
                        return Err(self.error_at(
                            DiagnosticCode::UnexpectedToken,
                            "':=' left-hand side must be a named variable",
                            tok.start,
                        ))
                    }
                };
                let value = self.parse_expression(lbp - 1)?;
                if let NodeKind::Lambda { self_name, .. } = &mut self.arena.get_mut(value).kind {
                    *self_name = Some(name.clone());
                }
                Ok(self.alloc(NodeKind::Bind { name, value }, tok.start))
            }
            _ => unreachable!("parse_led dispatched on a token with no handler: {:?}", tok.kind),
        }
    }

    fn binary(&mut self, left: NodeId, op: BinaryOp, lbp: u8, pos: usize) -> Result<NodeId, ParseError> {
        let rhs = self.parse_expression(lbp)?;
        Ok(self.alloc(NodeKind::Binary { op, lhs: left, rhs }, pos))
    }

    /// `( e1 ; e2 ; ... ; eN )`. A single non-bind expression is returned
    /// directly (parens are just grouping); a single bind, or more than one
    /// expression, is wrapped in a `Block` to isolate the scope.
    fn parse_paren(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.bump(); // '('
        let exprs = self.parse_semicolon_list(TokenKind::RightParen)?;
        self.expect(TokenKind::RightParen, "')'")?;
        match exprs.len() {
            0 => Err(self.error_at(
                DiagnosticCode::UnexpectedToken,
                "empty parentheses are not a valid expression",
                start,
            )),
            1 => {
                let only = exprs[0];
                if matches!(self.node_kind(only), NodeKind::Bind { .. }) {
                    Ok(self.alloc(NodeKind::Block(exprs), start))
                } else {
                    Ok(only)
                }
            }
            _ => Ok(self.alloc(NodeKind::Block(exprs), start)),
        }
    }

    fn parse_semicolon_list(&mut self, closing: TokenKind) -> Result<Vec<NodeId>, ParseError> {
        let mut exprs = Vec::new();
        while self.current.kind != closing {
            exprs.push(self.parse_expression_recoverable(0, &[TokenKind::Semicolon, closing])?);
            if self.current.kind == TokenKind::Semicolon {
                self.bump();
            } else {
                break;
            }
        }
        Ok(exprs)
    }

    /// Like [`Self::parse_expression`], but in recovery mode a failed
    /// sub-expression is recorded in `self.errors` and replaced with a
    /// `null` placeholder rather than aborting the whole compile; the
    /// parser then skips forward to the next token in `sync` (a list
    /// separator or closing delimiter) so the enclosing list can continue.
    /// Outside recovery mode this is identical to `parse_expression`.
    fn parse_expression_recoverable(
        &mut self,
        rbp: u8,
        sync: &[TokenKind],
    ) -> Result<NodeId, ParseError> {
        match self.parse_expression(rbp) {
            Ok(id) => Ok(id),
            Err(e) if self.recovery => {
                self.errors.push(e);
                let placeholder_pos = self.current.start;
                while !self.current.is_eof() && !sync.contains(&self.current.kind) {
                    self.bump();
                }
                Ok(self.alloc(NodeKind::NullLiteral, placeholder_pos))
            }
            Err(e) => Err(e),
        }
    }

    fn parse_array_ctor(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.bump(); // '['
        let mut elements = Vec::new();
        while self.current.kind != TokenKind::RightBracket {
            elements.push(self.parse_expression_recoverable(
                0,
                &[TokenKind::Comma, TokenKind::RightBracket],
            )?);
            if self.current.kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightBracket, "']'")?;
        Ok(self.alloc(NodeKind::ArrayCtor(elements), start))
    }

    fn parse_object_ctor(&mut self, start: usize, base: Option<NodeId>) -> Result<NodeId, ParseError> {
        if base.is_none() {
            self.bump(); // '{' — already consumed by led path when base is Some
        }
        let mut pairs = Vec::new();
        while self.current.kind != TokenKind::RightBrace {
            let key = self.parse_expression_recoverable(0, &[TokenKind::Colon, TokenKind::RightBrace])?;
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expression_recoverable(
                0,
                &[TokenKind::Comma, TokenKind::RightBrace],
            )?;
            pairs.push((key, value));
            if self.current.kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightBrace, "'}'")?;
        Ok(self.alloc(NodeKind::ObjectCtor { base, pairs, is_grouping: base.is_some() }, start))
    }

    fn parse_filter(&mut self, left: NodeId, start: usize) -> Result<NodeId, ParseError> {
        if self.current.kind == TokenKind::RightBracket {
            self.bump();
            return Ok(self.alloc(
                NodeKind::Filter { lhs: left, predicate: None, keep_array: true },
                start,
            ));
        }
        let predicate = self.parse_expression(0)?;
        self.expect(TokenKind::RightBracket, "']'")?;
        Ok(self.alloc(NodeKind::Filter { lhs: left, predicate: Some(predicate), keep_array: false }, start))
    }

    fn parse_call(&mut self, left: NodeId, start: usize) -> Result<NodeId, ParseError> {
        // A callee written as a bare field-access name (`sum(...)`) or as a
        // `$name` variable reference (`$sum(...)`, the form every built-in
        // is actually invoked with) both resolve the same way at call time
        // — environment first, built-in registry second — so both are
        // stored as `Callee::Name` for that shared lookup. Anything else
        // (a lambda literal, a parenthesized expression, a prior call or
        // partial application) must evaluate to a function value instead.
        let callee = match self.node_kind(left) {
            NodeKind::Name(name) => Callee::Name(name.clone()),
            NodeKind::Variable(VariableRef::Named(name)) => Callee::Name(name.clone()),
            _ => Callee::Expr(left),
        };
        let mut args = Vec::new();
        let mut has_placeholder = false;
        while self.current.kind != TokenKind::RightParen {
            if self.current.kind == TokenKind::Question {
                self.bump();
                has_placeholder = true;
                args.push(Arg::Placeholder);
            } else {
                args.push(Arg::Expr(self.parse_expression_recoverable(
                    0,
                    &[TokenKind::Comma, TokenKind::RightParen],
                )?));
            }
            if self.current.kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        if has_placeholder {
            Ok(self.alloc(NodeKind::PartialApplication { callee, args }, start))
        } else {
            let plain: Vec<NodeId> = args
                .into_iter()
                .map(|a| match a {
                    Arg::Expr(id) => id,
                    Arg::Placeholder => unreachable!("checked has_placeholder above"),
                })
                .collect();
            Ok(self.alloc(NodeKind::FunctionCall { callee, args: plain }, start))
        }
    }

    /// `A ^ ( K1, K2, ... )`. Each key is `<expr` (ascending), `>expr`
    /// (descending), or a plain expression — classified as a two-parameter
    /// lambda comparator, or else ascending by the expression's own value.
    fn parse_sort(&mut self, left: NodeId, start: usize) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::LeftParen, "'(' after '^'")?;
        let mut keys = Vec::new();
        while self.current.kind != TokenKind::RightParen {
            keys.push(self.parse_sort_key()?);
            if self.current.kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;
        Ok(self.alloc(NodeKind::Sort { lhs: left, keys }, start))
    }

    fn parse_sort_key(&mut self) -> Result<SortKey, ParseError> {
        match self.current.kind {
            TokenKind::Less => {
                self.bump();
                let expr = self.parse_expression(UNARY_POWER)?;
                Ok(SortKey { expr, direction: SortDirection::Ascending })
            }
            TokenKind::Greater => {
                self.bump();
                let expr = self.parse_expression(UNARY_POWER)?;
                Ok(SortKey { expr, direction: SortDirection::Descending })
            }
            _ => {
                let expr = self.parse_expression(0)?;
                let direction = match self.node_kind(expr) {
                    NodeKind::Lambda { params, .. } if params.len() == 2 => SortDirection::Comparator,
                    _ => SortDirection::Ascending,
                };
                Ok(SortKey { expr, direction })
            }
        }
    }

    /// `function ( $a, $b, ... ) <sig>? { body }`. The signature, if
    /// present, is captured verbatim from the source text rather than
    /// tokenized — its mini-language (`s-`, `<n-n:n>`, ...) uses `<`/`>`
    /// with its own nesting rules the main token stream isn't shaped for.
    fn parse_lambda(&mut self, start: usize) -> Result<NodeId, ParseError> {
        self.expect(TokenKind::LeftParen, "'(' after 'function'")?;
        let mut params = Vec::new();
        while self.current.kind != TokenKind::RightParen {
            let tok = self.expect(TokenKind::Variable, "a parameter variable")?;
            params.push(variable_name(&tok.text));
            if self.current.kind == TokenKind::Comma {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::RightParen, "')'")?;

        let signature = if self.current.kind == TokenKind::Less {
            Some(self.scan_verbatim_signature()?)
        } else {
            None
        };

        self.expect(TokenKind::LeftBrace, "'{' to start the lambda body")?;
        let exprs = self.parse_semicolon_list(TokenKind::RightBrace)?;
        self.expect(TokenKind::RightBrace, "'}'")?;
        let body = match exprs.len() {
            0 => self.alloc(NodeKind::NullLiteral, start),
            1 => exprs[0],
            _ => self.alloc(NodeKind::Block(exprs), start),
        };
        Ok(self.alloc(NodeKind::Lambda { params, body, signature, self_name: None }, start))
    }

    /// Scans the raw source from the current `<` to its matching `>`,
    /// tracking nesting depth so sub-signatures like `<a<n>>` don't close
    /// early, then reseeks the lexer past it.
    fn scan_verbatim_signature(&mut self) -> Result<String, ParseError> {
        let start = self.current.start;
        let bytes = self.source.as_bytes();
        let mut pos = start;
        let mut depth = 0i32;
        loop {
            match bytes.get(pos) {
                None => {
                    return Err(self.error_at(
                        DiagnosticCode::UnexpectedEof,
                        "unterminated parameter signature",
                        start,
                    ))
                }
                Some(b'<') => {
                    depth += 1;
                    pos += 1;
                }
                Some(b'>') => {
                    depth -= 1;
                    pos += 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => pos += 1,
            }
        }
        let text = self.source[start..pos].to_string();
        self.lexer.seek(pos);
        self.current = self.lexer.next(true);
        Ok(text)
    }
}

fn variable_name(text: &str) -> String {
    text.strip_prefix('$').unwrap_or(text).to_string()
}

fn variable_ref(text: &str) -> VariableRef {
    match text {
        "$" => VariableRef::Focus,
        "$$" => VariableRef::Root,
        other => VariableRef::Named(variable_name(other)),
    }
}

/// Whether a token of this kind, once consumed, could be the *end* of an
/// expression (an operand or a closing delimiter) — if so, a following `/`
/// must be division, not a regex literal.
fn can_end_expression(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name
            | TokenKind::EscapedName
            | TokenKind::Variable
            | TokenKind::Number
            | TokenKind::String
            | TokenKind::True
            | TokenKind::False
            | TokenKind::Null
            | TokenKind::Regex
            | TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::RightBrace
    )
}

#[cfg(test)]
mod tests;
