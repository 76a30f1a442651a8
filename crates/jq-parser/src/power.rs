//! Binding powers for infix/postfix operators, matching this language's
//! precedence table. Higher binds tighter.

use jq_token::TokenKind;

/// The binding power of `tok` in infix/postfix position, or `None` if `tok`
/// has no infix meaning at all.
pub fn infix_power(tok: TokenKind) -> Option<u8> {
    use TokenKind::*;
    Some(match tok {
        Dot | DoubleStar => 75,
        LeftBracket | LeftBrace | LeftParen => 80,
        Caret => 70,
        Star | Slash | Percent => 60,
        Plus | Minus | Ampersand => 50,
        Range => 45,
        Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual | In => 40,
        And => 30,
        Coalesce => 26,
        Or => 25,
        Apply => 20,
        Question => 15,
        Bind => 10,
        _ => return None,
    })
}
