//! Module for parsing Gene Protein Reaction strings into AST values

use crate::io::gpr_parse::lexer::LexerError;
use crate::io::gpr_parse::parser::ParseError;
use crate::metabolic_model::gene::Gene;
use crate::metabolic_model::model::Gpr;
use indexmap::IndexMap;
use thiserror::Error;

mod lexer;
pub mod parser;
mod token;

/// Parse a Gene Protein Reaction string into a GPR Tree
///
/// # Parameters
/// - `input`: &str representing the gene protein reaction rule
/// - `gene_map`: map of gene id strings to genes, genes referenced in the rule but missing
///     from the map are added to it
///
/// # Returns
/// Parse result which is
/// - `Ok`: The root node of the GPR tree
/// - `Err`: The GprParseError describing the issue with the GPR rule which
///     was being parsed.
///
/// # Examples
/// ```rust
/// use indexmap::IndexMap;
/// use fluxshift_core::io::gpr_parse::parse_gpr;
/// let gpr: &str = "Rv0001 and Rv0002";
/// let mut gene_map = IndexMap::new();
/// let gpr_tree = parse_gpr(gpr, &mut gene_map).unwrap();
/// assert_eq!(gpr_tree.gene_ids(), vec!["Rv0001", "Rv0002"]);
/// ```
pub fn parse_gpr(input: &str, gene_map: &mut IndexMap<String, Gene>) -> Result<Gpr, GprParseError> {
    let tokens = lexer::Lexer::new(input).lex()?;
    let mut parser = parser::GPRParser::new(tokens, gene_map);
    Ok(parser.parse()?)
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error)]
pub enum GprParseError {
    /// Lexing Error
    #[error("Error occurred during lexing (conversion of GPR string to tokens): {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing (conversion of tokens to GPR tree): {0}")]
    ParsingError(#[from] ParseError),
}

#[cfg(test)]
mod tests {
    use crate::io::gpr_parse::{parse_gpr, GprParseError};
    use crate::metabolic_model::gene::{Gene, GeneActivity};
    use crate::metabolic_model::model::{Gpr, GprOperation};
    use indexmap::IndexMap;

    #[test]
    fn test_parse_gpr() {
        let mut gene_map: IndexMap<String, Gene> = IndexMap::new();
        let mut knocked = Gene::new("Rv0002");
        knocked.activity = GeneActivity::Inactive;
        gene_map.insert("Rv0002".to_string(), knocked);

        let gpr_tree = parse_gpr("Rv0001 and (Rv0002 or Rv0003)", &mut gene_map).unwrap();
        let expected = Gpr::Operation(GprOperation::And {
            left: Box::new(Gpr::new_gene_node("Rv0001")),
            right: Box::new(Gpr::Operation(GprOperation::Or {
                left: Box::new(Gpr::new_gene_node("Rv0002")),
                right: Box::new(Gpr::new_gene_node("Rv0003")),
            })),
        });
        assert_eq!(gpr_tree, expected);
        // Missing genes are added, existing ones are left untouched
        assert_eq!(gene_map.len(), 3);
        assert_eq!(gene_map["Rv0002"].activity, GeneActivity::Inactive);
    }

    #[test]
    fn lexing_error() {
        let mut gene_map: IndexMap<String, Gene> = IndexMap::new();
        assert!(matches!(
            parse_gpr("Rv0001 | Rv0002", &mut gene_map),
            Err(GprParseError::LexingError(_))
        ));
    }
}
