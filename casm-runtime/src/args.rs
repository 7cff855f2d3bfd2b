//! Program arguments
//!
//! Arguments are whitespace-separated integers (decimal, `0x` hex, optionally
//! negative). A `[ ... ]` group becomes an array argument, passed to the
//! program as a `start, end` pointer pair.

use crate::error::RuntimeError;
use casm_spec::Felt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CairoArg {
    Single(Felt),
    Array(Vec<Felt>),
}

impl From<Felt> for CairoArg {
    fn from(value: Felt) -> Self {
        CairoArg::Single(value)
    }
}

impl From<Vec<Felt>> for CairoArg {
    fn from(values: Vec<Felt>) -> Self {
        CairoArg::Array(values)
    }
}

fn parse_felt(token: &str) -> Result<Felt, RuntimeError> {
    token
        .parse::<Felt>()
        .map_err(|err| RuntimeError::InvalidArgs(format!("{token:?}: {err}")))
}

/// Parse an argument list such as `1 -2 [3 0x4] 5`
pub fn parse_args(text: &str) -> Result<Vec<CairoArg>, RuntimeError> {
    let spaced = text.replace('[', " [ ").replace(']', " ] ");
    let mut args = Vec::new();
    let mut array: Option<Vec<Felt>> = None;

    for token in spaced.split_whitespace() {
        match (token, array.as_mut()) {
            ("[", None) => array = Some(Vec::new()),
            ("[", Some(_)) => {
                return Err(RuntimeError::InvalidArgs("nested arrays are not supported".into()))
            }
            ("]", Some(_)) => {
                if let Some(values) = array.take() {
                    args.push(CairoArg::Array(values));
                }
            }
            ("]", None) => return Err(RuntimeError::InvalidArgs("unmatched ']'".into())),
            (token, Some(values)) => values.push(parse_felt(token)?),
            (token, None) => args.push(CairoArg::Single(parse_felt(token)?)),
        }
    }

    if array.is_some() {
        return Err(RuntimeError::InvalidArgs("unterminated '['".into()));
    }
    Ok(args)
}
