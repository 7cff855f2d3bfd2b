//! Recursive-descent parser producing the assembly AST

use crate::error::{AssemblerError, Result};
use crate::lexer::{tokenize, Spanned, Token};
use casm_spec::{Felt, Register};

// ============================================================================
// AST
// ============================================================================

/// `[reg + offset]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deref {
    pub register: Register,
    pub offset: i16,
}

impl Deref {
    pub fn new(register: Register, offset: i16) -> Self {
        Self { register, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Mul,
}

/// Right-hand side of a binary expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Deref(Deref),
    Immediate(Felt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expr {
    Deref(Deref),
    /// `[[reg + a] + b]`
    DoubleDeref(Deref, i16),
    Immediate(Felt),
    BinOp { op: BinOp, lhs: Deref, rhs: Operand },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Abs,
    Rel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    AssertEq { dst: Deref, value: Expr },
    Jump { kind: JumpKind, target: Expr },
    Jnz { target: Expr, condition: Deref },
    Call { kind: JumpKind, target: Expr },
    Ret,
    ApAdd(Expr),
    Data(Felt),
}

/// One parsed instruction with its position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInstruction {
    pub statement: Statement,
    /// Trailing `, ap++`
    pub ap_increment: bool,
    pub line: usize,
    pub column: usize,
}

// ============================================================================
// Parser
// ============================================================================

pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Position reported at end of input
    end: (usize, usize),
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        let end = tokens
            .last()
            .map(|t| (t.line, t.column + 1))
            .unwrap_or((1, 1));
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|t| &t.token)
    }

    fn position(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos)
            .map(|t| (t.line, t.column))
            .unwrap_or(self.end)
    }

    fn unexpected(&self, expected: &str) -> AssemblerError {
        let (line, column) = self.position();
        AssemblerError::UnexpectedToken {
            line,
            column,
            expected: expected.to_string(),
            found: self
                .peek()
                .map(Token::to_string)
                .unwrap_or_else(|| "end of input".to_string()),
        }
    }

    fn expect(&mut self, token: Token) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn invalid(&self, line: usize, column: usize, reason: &str) -> AssemblerError {
        AssemblerError::InvalidCombination {
            line,
            column,
            reason: reason.to_string(),
        }
    }

    pub fn parse_program(&mut self) -> Result<Vec<ParsedInstruction>> {
        let mut program = Vec::new();
        while self.peek().is_some() {
            program.push(self.parse_instruction()?);
        }
        Ok(program)
    }

    fn parse_instruction(&mut self) -> Result<ParsedInstruction> {
        let (line, column) = self.position();
        let statement = match self.peek() {
            Some(Token::Dw) => {
                self.pos += 1;
                Statement::Data(self.parse_immediate()?)
            }
            Some(Token::Ret) => {
                self.pos += 1;
                Statement::Ret
            }
            Some(Token::Call) => {
                self.pos += 1;
                let kind = self.parse_jump_kind()?;
                let target = self.parse_expr()?;
                if !matches!(target, Expr::Deref(_) | Expr::Immediate(_)) {
                    return Err(self.invalid(line, column, "call target must be a deref or immediate"));
                }
                Statement::Call { kind, target }
            }
            Some(Token::Jmp) => {
                self.pos += 1;
                let kind = self.parse_jump_kind()?;
                let target = self.parse_expr()?;
                if self.peek() == Some(&Token::If) {
                    self.pos += 1;
                    let condition = self.parse_deref()?;
                    self.expect(Token::NotEq)?;
                    if self.peek() != Some(&Token::Integer("0".to_string())) {
                        return Err(self.unexpected("'0'"));
                    }
                    self.pos += 1;
                    if kind == JumpKind::Abs {
                        return Err(self.invalid(line, column, "conditional jumps are relative"));
                    }
                    if matches!(target, Expr::BinOp { .. }) {
                        return Err(self.invalid(line, column, "jnz offset must be a deref or immediate"));
                    }
                    Statement::Jnz { target, condition }
                } else {
                    Statement::Jump { kind, target }
                }
            }
            Some(Token::Ap) if self.peek_at(1) == Some(&Token::PlusEq) => {
                self.pos += 2;
                Statement::ApAdd(self.parse_expr()?)
            }
            Some(Token::LBracket) => {
                let dst = self.parse_deref()?;
                self.expect(Token::Eq)?;
                Statement::AssertEq {
                    dst,
                    value: self.parse_expr()?,
                }
            }
            Some(Token::Identifier(name)) => {
                return Err(AssemblerError::UnknownMnemonic {
                    line,
                    column,
                    name: name.clone(),
                })
            }
            _ => return Err(self.unexpected("an instruction")),
        };

        let mut ap_increment = false;
        if self.peek() == Some(&Token::Comma) {
            self.pos += 1;
            self.expect(Token::Ap)?;
            self.expect(Token::PlusPlus)?;
            ap_increment = true;
        }

        match self.peek() {
            Some(Token::Semicolon) => self.pos += 1,
            None => {
                let (line, column) = self.end;
                return Err(AssemblerError::UnterminatedInstruction { line, column });
            }
            Some(_) => return Err(self.unexpected("';'")),
        }

        Ok(ParsedInstruction {
            statement,
            ap_increment,
            line,
            column,
        })
    }

    fn parse_jump_kind(&mut self) -> Result<JumpKind> {
        match self.peek() {
            Some(Token::Abs) => {
                self.pos += 1;
                Ok(JumpKind::Abs)
            }
            Some(Token::Rel) => {
                self.pos += 1;
                Ok(JumpKind::Rel)
            }
            _ => Err(self.unexpected("'abs' or 'rel'")),
        }
    }

    fn parse_register(&mut self) -> Result<Register> {
        match self.peek() {
            Some(Token::Ap) => {
                self.pos += 1;
                Ok(Register::Ap)
            }
            Some(Token::Fp) => {
                self.pos += 1;
                Ok(Register::Fp)
            }
            _ => Err(self.unexpected("'ap' or 'fp'")),
        }
    }

    /// Optional `+ n`, `- n` or `+ -n` before a closing bracket
    fn parse_offset(&mut self) -> Result<i16> {
        let negate = match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                if self.peek() == Some(&Token::Minus) {
                    self.pos += 1;
                    true
                } else {
                    false
                }
            }
            Some(Token::Minus) => {
                self.pos += 1;
                true
            }
            _ => return Ok(0),
        };

        let (line, column) = self.position();
        let text = match self.peek() {
            Some(Token::Integer(text)) => text.clone(),
            _ => return Err(self.unexpected("an integer offset")),
        };
        self.pos += 1;
        let magnitude = parse_int(&text).ok_or_else(|| AssemblerError::OffsetOutOfRange {
            line,
            column,
            value: i64::MAX,
        })?;
        let value = if negate { -magnitude } else { magnitude };
        i16::try_from(value).map_err(|_| AssemblerError::OffsetOutOfRange {
            line,
            column,
            value,
        })
    }

    fn parse_deref(&mut self) -> Result<Deref> {
        self.expect(Token::LBracket)?;
        let register = self.parse_register()?;
        let offset = self.parse_offset()?;
        self.expect(Token::RBracket)?;
        Ok(Deref::new(register, offset))
    }

    fn parse_immediate(&mut self) -> Result<Felt> {
        let (line, column) = self.position();
        let negate = if self.peek() == Some(&Token::Minus) {
            self.pos += 1;
            true
        } else {
            false
        };
        let text = match self.peek() {
            Some(Token::Integer(text)) => text.clone(),
            _ => return Err(self.unexpected("an immediate")),
        };
        self.pos += 1;
        let literal = if negate { format!("-{text}") } else { text };
        literal
            .parse::<Felt>()
            .map_err(|_| AssemblerError::InvalidImmediate {
                line,
                column,
                text: literal,
            })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        if self.peek() != Some(&Token::LBracket) {
            return Ok(Expr::Immediate(self.parse_immediate()?));
        }
        if self.peek_at(1) == Some(&Token::LBracket) {
            self.pos += 1;
            let inner = self.parse_deref()?;
            let offset = self.parse_offset()?;
            self.expect(Token::RBracket)?;
            return Ok(Expr::DoubleDeref(inner, offset));
        }

        let lhs = self.parse_deref()?;
        let op = match self.peek() {
            Some(Token::Plus) => BinOp::Add,
            Some(Token::Star) => BinOp::Mul,
            _ => return Ok(Expr::Deref(lhs)),
        };
        self.pos += 1;
        let rhs = if self.peek() == Some(&Token::LBracket) {
            Operand::Deref(self.parse_deref()?)
        } else {
            Operand::Immediate(self.parse_immediate()?)
        };
        Ok(Expr::BinOp { op, lhs, rhs })
    }
}

fn parse_int(text: &str) -> Option<i64> {
    match text.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Parse assembly source into instructions
pub fn parse(source: &str) -> Result<Vec<ParsedInstruction>> {
    Parser::new(tokenize(source)?).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(source: &str) -> Statement {
        let parsed = parse(source).unwrap();
        assert_eq!(parsed.len(), 1);
        parsed[0].statement
    }

    #[test]
    fn test_parse_assert_forms() {
        assert_eq!(
            statement("[ap] = [fp + 0];"),
            Statement::AssertEq {
                dst: Deref::new(Register::Ap, 0),
                value: Expr::Deref(Deref::new(Register::Fp, 0)),
            }
        );
        assert_eq!(
            statement("[fp - 3] = [[ap - 1] + 2];"),
            Statement::AssertEq {
                dst: Deref::new(Register::Fp, -3),
                value: Expr::DoubleDeref(Deref::new(Register::Ap, -1), 2),
            }
        );
        assert_eq!(
            statement("[ap + -3] = [ap] * -1;"),
            Statement::AssertEq {
                dst: Deref::new(Register::Ap, -3),
                value: Expr::BinOp {
                    op: BinOp::Mul,
                    lhs: Deref::new(Register::Ap, 0),
                    rhs: Operand::Immediate(Felt::from(-1i64)),
                },
            }
        );
    }

    #[test]
    fn test_parse_control_flow() {
        assert_eq!(
            statement("jmp rel [ap - 2] if [fp - 7] != 0;"),
            Statement::Jnz {
                target: Expr::Deref(Deref::new(Register::Ap, -2)),
                condition: Deref::new(Register::Fp, -7),
            }
        );
        assert_eq!(
            statement("call abs 123;"),
            Statement::Call {
                kind: JumpKind::Abs,
                target: Expr::Immediate(Felt::from(123u64)),
            }
        );
        assert_eq!(statement("ret;"), Statement::Ret);
        assert_eq!(
            statement("ap += 0x10;"),
            Statement::ApAdd(Expr::Immediate(Felt::from(16u64)))
        );
        assert_eq!(statement("dw -1;"), Statement::Data(Felt::from(-1i64)));
    }

    #[test]
    fn test_parse_ap_increment_and_positions() {
        let parsed = parse("ret;\n  [ap] = 5, ap++;").unwrap();
        assert!(!parsed[0].ap_increment);
        assert!(parsed[1].ap_increment);
        assert_eq!((parsed[1].line, parsed[1].column), (2, 3));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("ret"),
            Err(AssemblerError::UnterminatedInstruction { .. })
        ));
        assert!(matches!(
            parse("mov [ap], 1;"),
            Err(AssemblerError::UnknownMnemonic { name, .. }) if name == "mov"
        ));
        assert!(matches!(
            parse("[ap + 40000] = 1;"),
            Err(AssemblerError::OffsetOutOfRange { value: 40000, .. })
        ));
        assert!(matches!(
            parse("jmp abs 3 if [ap] != 0;"),
            Err(AssemblerError::InvalidCombination { .. })
        ));
        assert!(matches!(
            parse("[ap] = 1 ret;"),
            Err(AssemblerError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("jmp rel 2 if [ap] != 1;"),
            Err(AssemblerError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn test_offset_bounds() {
        assert!(parse("[ap + 32767] = 1;").is_ok());
        assert!(parse("[ap - 32768] = 1;").is_ok());
        assert!(parse("[ap - 32769] = 1;").is_err());
    }
}
