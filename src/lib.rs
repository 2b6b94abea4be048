pub mod certificate;
pub mod parsing;
pub mod proof;
pub mod rules;
pub mod scope;
pub mod term;
pub mod unify;
pub mod utils;
pub mod validator;

use crate::certificate::{Certificate, Derivation, ReasonCode};
use crate::proof::Options;
use crate::rules::RuleSet;
use crate::utils::span::{peg_error_to_snippet, Spanned};
use crate::validator::Validator;
use itertools::Itertools;

/// Разбирает и проверяет доказательство, печатая ошибку с указанием места в тексте.
pub fn read_proof(input: &str, options: Options) -> Result<Derivation, ()> {
	use crate::parsing::parser;

	let parsed = parser::script(input).map_err(|err| peg_error_to_snippet(err, input))?;
	let steps = parsed.proof_steps();

	let validator = Validator::default()
		.with_declarations(parsed.declarations.clone())
		.with_options(options);
	match validator.validate(&steps) {
		Certificate::Valid(derivation) => Ok(derivation),
		Certificate::Invalid(failure) => {
			let span = parsed.steps[failure.index].span.clone();
			Spanned::new(&failure, span).print_error_snippet(input);
			if failure.code() == ReasonCode::RuleNotFound {
				println!("known rules: {}", RuleSet::standard().names().join(", "));
			}
			Err(())
		},
	}
}
