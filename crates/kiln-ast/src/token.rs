// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Token definitions and the grammar tables shared by lexer and parser.
//!
//! Every token kind carries a fixed set of [`TokenFlags`] and, for binary and
//! assignment operators, a precedence. Smaller precedence binds tighter.

use std::fmt;
use std::ops::BitOr;

use crate::Range;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub range: Option<Range>,
    pub value: Option<TokenValue>,
}

/// Literal payload carried by a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Bool(bool),
    Int(u64),
    Float(f64),
    Char(char),
    Text(String),
}

impl Token {
    pub fn new(kind: TokenKind, range: Option<Range>) -> Self {
        Self { kind, range, value: None }
    }

    pub fn with_value(kind: TokenKind, range: Option<Range>, value: TokenValue) -> Self {
        Self { kind, range, value: Some(value) }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Identifier name, string contents or segment text.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(TokenValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<u64> {
        match self.value {
            Some(TokenValue::Int(n)) => Some(n),
            _ => None,
        }
    }
}

/// Static grammatical role bits of a [`TokenKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenFlags(u16);

impl TokenFlags {
    pub const NONE: TokenFlags = TokenFlags(0);
    pub const PREFIX: TokenFlags = TokenFlags(1 << 0);
    pub const POSTFIX: TokenFlags = TokenFlags(1 << 1);
    pub const BINARY: TokenFlags = TokenFlags(1 << 2);
    pub const ASSIGNMENT: TokenFlags = TokenFlags(1 << 3);
    pub const TERNARY: TokenFlags = TokenFlags(1 << 4);
    pub const KEYWORD: TokenFlags = TokenFlags(1 << 5);
    pub const PRIMITIVE_TYPE: TokenFlags = TokenFlags(1 << 6);
    pub const ERROR_BOUNDARY: TokenFlags = TokenFlags(1 << 7);

    pub const fn union(self, other: TokenFlags) -> TokenFlags {
        TokenFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: TokenFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TokenFlags {
    type Output = TokenFlags;

    fn bitor(self, rhs: TokenFlags) -> TokenFlags {
        self.union(rhs)
    }
}

/// Precedence given to kinds that are not binary operators.
pub const LOOSEST_PRECEDENCE: u8 = u8::MAX;

/// Precedence shared by `=` and every compound assignment.
pub const ASSIGNMENT_PRECEDENCE: u8 = 14;

/// Internal names of the fixed-spelling operator overloads.
pub const OPERATOR_INDEX: &str = "operator_index";
pub const OPERATOR_INDEX_SET: &str = "operator_index_set";
pub const OPERATOR_CALL: &str = "operator_call";
pub const OPERATOR_INIT: &str = "operator_init";

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    // Special
    Eof,
    Invalid,

    // Literals
    IntegerLiteral,
    FloatLiteral,
    CharLiteral,
    StringLiteral,
    BooleanLiteral,
    NullLiteral,

    // String interpolation
    OpenStringExpr,
    StringSegment,
    CloseStringExpr,

    Identifier,

    // Keywords
    Func,
    Var,
    Const,
    Struct,
    Enum,
    Type,
    If,
    Else,
    While,
    For,
    Defer,
    Return,
    Break,
    Continue,
    Export,
    Opaque,
    Async,
    Await,
    Delete,
    New,
    Yield,
    Init,
    As,
    Private,

    // Primitive type keywords
    Void,
    Bool,
    Char,
    String,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Isize,
    Usize,
    Any,

    // Binary operators
    StarStar,
    Star,
    Slash,
    Percent,
    Plus,
    Minus,
    LtLt,
    GtGt,
    Lt,
    Gt,
    LtEq,
    GtEq,
    EqEq,
    BangEq,
    Amp,
    Caret,
    Pipe,
    AmpAmp,
    DotDot,
    PipePipe,
    QuestionQuestion,

    // Assignment operators
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    StarStarEq,
    LtLtEq,
    GtGtEq,
    AmpEq,
    CaretEq,
    PipeEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,

    // Other operators
    Bang,
    Tilde,
    PlusPlus,
    MinusMinus,
    Question,
    QuestionDot,
    Dot,
    DotDotDot,
    Arrow,
    FatArrow,
    At,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Semi,
    Comma,
}

impl TokenKind {
    /// Classify an identifier-shaped word. `None` means a plain identifier.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "true" | "false" => BooleanLiteral,
            "null" => NullLiteral,
            "func" => Func,
            "var" => Var,
            "const" => Const,
            "struct" => Struct,
            "enum" => Enum,
            "type" => Type,
            "if" => If,
            "else" => Else,
            "while" => While,
            "for" => For,
            "defer" => Defer,
            "return" => Return,
            "break" => Break,
            "continue" => Continue,
            "export" => Export,
            "opaque" => Opaque,
            "async" => Async,
            "await" => Await,
            "delete" => Delete,
            "new" => New,
            "yield" => Yield,
            "init" => Init,
            "as" => As,
            "private" => Private,
            "void" => Void,
            "bool" => Bool,
            "char" => Char,
            "string" => String,
            "i8" => I8,
            "i16" => I16,
            "i32" => I32,
            "i64" => I64,
            "u8" => U8,
            "u16" => U16,
            "u32" => U32,
            "u64" => U64,
            "f32" => F32,
            "f64" => F64,
            "isize" => Isize,
            "usize" => Usize,
            "any" => Any,
            _ => return None,
        })
    }

    pub fn flags(self) -> TokenFlags {
        use TokenKind::*;
        const KW: TokenFlags = TokenFlags::KEYWORD;
        const KW_BOUNDARY: TokenFlags = TokenFlags::KEYWORD.union(TokenFlags::ERROR_BOUNDARY);
        const PRIM: TokenFlags = TokenFlags::KEYWORD.union(TokenFlags::PRIMITIVE_TYPE);
        const BIN: TokenFlags = TokenFlags::BINARY;
        const BIN_PREFIX: TokenFlags = TokenFlags::BINARY.union(TokenFlags::PREFIX);
        const STEP: TokenFlags = TokenFlags::PREFIX.union(TokenFlags::POSTFIX);

        match self {
            Func | Var | Const | Struct | Enum | Type | If | While | For | Defer | Return
            | Break | Continue | Export | Opaque | Async => KW_BOUNDARY,
            Else | New | Yield | Init | As | Private => KW,
            Await | Delete => KW.union(TokenFlags::PREFIX),

            Void | Bool | Char | String | I8 | I16 | I32 | I64 | U8 | U16 | U32 | U64
            | F32 | F64 | Isize | Usize | Any => PRIM,

            Plus | Minus | Star | Amp => BIN_PREFIX,
            StarStar | Slash | Percent | LtLt | GtGt | Lt | Gt | LtEq | GtEq | EqEq
            | BangEq | Caret | Pipe | AmpAmp | DotDot | PipePipe | QuestionQuestion => BIN,

            Eq | PlusEq | MinusEq | StarEq | SlashEq | PercentEq | StarStarEq | LtLtEq
            | GtGtEq | AmpEq | CaretEq | PipeEq | AmpAmpEq | PipePipeEq
            | QuestionQuestionEq => TokenFlags::ASSIGNMENT,

            Bang | Tilde => TokenFlags::PREFIX,
            PlusPlus | MinusMinus => STEP,
            Question => TokenFlags::TERNARY,

            Eof | Invalid | IntegerLiteral | FloatLiteral | CharLiteral | StringLiteral
            | BooleanLiteral | NullLiteral | OpenStringExpr | StringSegment
            | CloseStringExpr | Identifier | QuestionDot | Dot | DotDotDot | Arrow
            | FatArrow | At | LParen | RParen | LBracket | RBracket | LBrace | RBrace
            | Colon | Semi | Comma => TokenFlags::NONE,
        }
    }

    pub fn is_prefix_operator(self) -> bool {
        self.flags().contains(TokenFlags::PREFIX)
    }

    pub fn is_postfix_operator(self) -> bool {
        self.flags().contains(TokenFlags::POSTFIX)
    }

    pub fn is_binary_operator(self) -> bool {
        self.flags().contains(TokenFlags::BINARY)
    }

    pub fn is_assignment_operator(self) -> bool {
        self.flags().contains(TokenFlags::ASSIGNMENT)
    }

    pub fn is_ternary_operator(self) -> bool {
        self.flags().contains(TokenFlags::TERNARY)
    }

    pub fn is_keyword(self) -> bool {
        self.flags().contains(TokenFlags::KEYWORD)
    }

    pub fn is_primitive_type(self) -> bool {
        self.flags().contains(TokenFlags::PRIMITIVE_TYPE)
    }

    pub fn is_error_boundary(self) -> bool {
        self.flags().contains(TokenFlags::ERROR_BOUNDARY)
    }

    /// Binding strength of a binary or assignment operator.
    pub fn precedence(self) -> u8 {
        use TokenKind::*;
        match self {
            StarStar => 1,
            Star | Slash | Percent => 2,
            Plus | Minus => 3,
            LtLt | GtGt => 4,
            Lt | Gt | LtEq | GtEq => 5,
            EqEq | BangEq => 6,
            Amp => 7,
            Caret => 8,
            Pipe => 9,
            AmpAmp => 10,
            DotDot => 11,
            PipePipe | QuestionQuestion => 12,
            k if k.is_assignment_operator() => ASSIGNMENT_PRECEDENCE,
            _ => LOOSEST_PRECEDENCE,
        }
    }

    /// The simple operator a compound assignment desugars to (`+=` gives `+`).
    pub fn compound_operator(self) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match self {
            PlusEq => Plus,
            MinusEq => Minus,
            StarEq => Star,
            SlashEq => Slash,
            PercentEq => Percent,
            StarStarEq => StarStar,
            LtLtEq => LtLt,
            GtGtEq => GtGt,
            AmpEq => Amp,
            CaretEq => Caret,
            PipeEq => Pipe,
            AmpAmpEq => AmpAmp,
            PipePipeEq => PipePipe,
            QuestionQuestionEq => QuestionQuestion,
            _ => return None,
        })
    }

    /// Internal function name for an overload of this operator.
    pub fn operator_name(self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            StarStar => "operator_pow",
            Star => "operator_mul",
            Slash => "operator_div",
            Percent => "operator_mod",
            Plus => "operator_add",
            Minus => "operator_sub",
            LtLt => "operator_shl",
            GtGt => "operator_shr",
            Lt => "operator_lt",
            Gt => "operator_gt",
            LtEq => "operator_le",
            GtEq => "operator_ge",
            EqEq => "operator_eq",
            BangEq => "operator_ne",
            Amp => "operator_bitand",
            Caret => "operator_bitxor",
            Pipe => "operator_bitor",
            DotDot => "operator_range",
            Bang => "operator_not",
            Tilde => "operator_bitnot",
            PlusPlus => "operator_inc",
            MinusMinus => "operator_dec",
            PlusEq => "operator_add_assign",
            MinusEq => "operator_sub_assign",
            StarEq => "operator_mul_assign",
            SlashEq => "operator_div_assign",
            PercentEq => "operator_mod_assign",
            StarStarEq => "operator_pow_assign",
            LtLtEq => "operator_shl_assign",
            GtGtEq => "operator_shr_assign",
            AmpEq => "operator_bitand_assign",
            CaretEq => "operator_bitxor_assign",
            PipeEq => "operator_bitor_assign",
            _ => return None,
        })
    }

    /// Overload name when the operator is declared with a single parameter.
    pub fn unary_operator_name(self) -> Option<&'static str> {
        match self {
            TokenKind::Minus => Some("operator_neg"),
            TokenKind::Plus => Some("operator_pos"),
            TokenKind::Star => Some("operator_deref"),
            TokenKind::Amp => Some("operator_addr"),
            other => other.operator_name(),
        }
    }

    /// Source spelling of a fixed-text kind; empty for literals and identifiers.
    pub fn text(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof | Invalid | IntegerLiteral | FloatLiteral | CharLiteral | StringLiteral
            | BooleanLiteral | StringSegment | Identifier => "",
            NullLiteral => "null",
            OpenStringExpr | CloseStringExpr => "`",
            Func => "func",
            Var => "var",
            Const => "const",
            Struct => "struct",
            Enum => "enum",
            Type => "type",
            If => "if",
            Else => "else",
            While => "while",
            For => "for",
            Defer => "defer",
            Return => "return",
            Break => "break",
            Continue => "continue",
            Export => "export",
            Opaque => "opaque",
            Async => "async",
            Await => "await",
            Delete => "delete",
            New => "new",
            Yield => "yield",
            Init => "init",
            As => "as",
            Private => "private",
            Void => "void",
            Bool => "bool",
            Char => "char",
            String => "string",
            I8 => "i8",
            I16 => "i16",
            I32 => "i32",
            I64 => "i64",
            U8 => "u8",
            U16 => "u16",
            U32 => "u32",
            U64 => "u64",
            F32 => "f32",
            F64 => "f64",
            Isize => "isize",
            Usize => "usize",
            Any => "any",
            StarStar => "**",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Plus => "+",
            Minus => "-",
            LtLt => "<<",
            GtGt => ">>",
            Lt => "<",
            Gt => ">",
            LtEq => "<=",
            GtEq => ">=",
            EqEq => "==",
            BangEq => "!=",
            Amp => "&",
            Caret => "^",
            Pipe => "|",
            AmpAmp => "&&",
            DotDot => "..",
            PipePipe => "||",
            QuestionQuestion => "??",
            Eq => "=",
            PlusEq => "+=",
            MinusEq => "-=",
            StarEq => "*=",
            SlashEq => "/=",
            PercentEq => "%=",
            StarStarEq => "**=",
            LtLtEq => "<<=",
            GtGtEq => ">>=",
            AmpEq => "&=",
            CaretEq => "^=",
            PipeEq => "|=",
            AmpAmpEq => "&&=",
            PipePipeEq => "||=",
            QuestionQuestionEq => "??=",
            Bang => "!",
            Tilde => "~",
            PlusPlus => "++",
            MinusMinus => "--",
            Question => "?",
            QuestionDot => "?.",
            Dot => ".",
            DotDotDot => "...",
            Arrow => "->",
            FatArrow => "=>",
            At => "@",
            LParen => "(",
            RParen => ")",
            LBracket => "[",
            RBracket => "]",
            LBrace => "{",
            RBrace => "}",
            Colon => ":",
            Semi => ";",
            Comma => ",",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Eof => f.write_str("end of file"),
            TokenKind::Invalid => f.write_str("an invalid token"),
            TokenKind::IntegerLiteral | TokenKind::FloatLiteral => f.write_str("a number"),
            TokenKind::CharLiteral => f.write_str("a character"),
            TokenKind::StringLiteral => f.write_str("a string"),
            TokenKind::BooleanLiteral => f.write_str("'true' or 'false'"),
            TokenKind::StringSegment => f.write_str("string text"),
            TokenKind::OpenStringExpr => f.write_str("start of string expression"),
            TokenKind::CloseStringExpr => f.write_str("end of string expression"),
            TokenKind::Identifier => f.write_str("a name"),
            kind => write!(f, "'{}'", kind.text()),
        }
    }
}
