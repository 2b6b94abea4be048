use crate::certificate::*;
use crate::proof::*;
use crate::rules::*;
use crate::scope::*;
use crate::term::Formula;
use log::debug;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
	#[error(transparent)]
	Rule(#[from] RuleError),
	#[error(transparent)]
	Scope(#[from] ScopeError),
	#[error("undefined atomic proposition `{symbol}`")]
	UndeclaredSymbol {
		symbol: String,
	},
	#[error("incorrect line number, expected `{expected}`")]
	IncorrectNumber {
		expected: StepId,
	},
}

impl ValidationError {
	pub fn code(&self) -> ReasonCode {
		match self {
			ValidationError::Rule(error) => match error {
				RuleError::RuleNotFound { .. } => ReasonCode::RuleNotFound,
				RuleError::ArityMismatch { .. } => ReasonCode::ArityMismatch,
				RuleError::PatternMismatch { .. } => ReasonCode::PatternMismatch,
				RuleError::SideConditionViolated { .. } => ReasonCode::SideConditionViolated,
				RuleError::ConflictingBinding { .. } => ReasonCode::ConflictingBinding,
			},
			ValidationError::Scope(error) => match error {
				ScopeError::UnknownReference { .. } => ReasonCode::UnknownReference,
				ScopeError::OutOfScopeReference { .. } => ReasonCode::OutOfScopeReference,
				ScopeError::DuplicateStep { .. } => ReasonCode::DuplicateStep,
				ScopeError::NoOpenScope => ReasonCode::NoOpenScope,
				ScopeError::NotAHypothesis { .. } => ReasonCode::NotAHypothesis,
				ScopeError::UnclosedScope { .. } => ReasonCode::UnclosedScope,
			},
			ValidationError::UndeclaredSymbol { .. } => ReasonCode::UndeclaredSymbol,
			ValidationError::IncorrectNumber { .. } => ReasonCode::IncorrectNumber,
		}
	}
}

/// Проверяет доказательство стандартным набором правил без объявлений и с настройками по умолчанию.
pub fn validate(steps: &[ProofStep]) -> Certificate {
	Validator::default().validate(steps)
}

/// Проверка доказательств. Сам валидатор не меняется, поэтому один экземпляр можно использовать из нескольких потоков.
#[derive(Clone, Debug)]
pub struct Validator<'a> {
	rules: &'a RuleSet,
	declarations: Declarations,
	options: Options,
}

impl Default for Validator<'static> {
	fn default() -> Self {
		Validator::new(RuleSet::standard())
	}
}

impl<'a> Validator<'a> {
	pub fn new(rules: &'a RuleSet) -> Self {
		Validator {
			rules,
			declarations: Declarations::default(),
			options: Options::default(),
		}
	}

	pub fn with_declarations(mut self, declarations: Declarations) -> Self {
		self.declarations = declarations;
		self
	}

	pub fn with_options(mut self, options: Options) -> Self {
		self.options = options;
		self
	}

	/// Проходит по строкам по порядку и останавливается на первой неверной.
	pub fn validate(&self, steps: &[ProofStep]) -> Certificate {
		let mut run = Run {
			validator: self,
			context: Context::new(),
			previous: StepId::from(0),
			derived: Vec::with_capacity(steps.len()),
		};

		for (index, step) in steps.iter().enumerate() {
			debug!("checking line {}: {} [{}]", step.id, step.formula, step.rule);
			if let Err(error) = run.step(step) {
				debug!("line {} is invalid: {}", step.id, error);
				return Certificate::Invalid(Failure { index, step: step.id.clone(), error });
			}
		}

		if let (Err(error), Some(last)) = (run.context.finish(), steps.last()) {
			debug!("proof ends in a sub-proof: {}", error);
			return Certificate::Invalid(Failure {
				index: steps.len() - 1,
				step: last.id.clone(),
				error: error.into(),
			});
		}

		Certificate::Valid(Derivation { steps: run.derived })
	}
}

/// Состояние одного прохода.
struct Run<'v, 'a> {
	validator: &'v Validator<'a>,
	context: Context,
	previous: StepId,
	derived: Vec<CertifiedStep>,
}

impl<'v, 'a> Run<'v, 'a> {
	fn step(&mut self, step: &ProofStep) -> Result<(), ValidationError> {
		let validator = self.validator;

		if let Some(symbol) = validator.declarations.undeclared(&step.formula) {
			return Err(ValidationError::UndeclaredSymbol { symbol });
		}

		let rule = validator.rules.get(&step.rule)?;
		if validator.options.numbering == Numbering::Nested {
			self.check_number(&step.id, rule.role)?;
		}

		let antecedents = step.references
			.iter()
			.map(|reference| self.context.resolve(reference).map(|entry| entry.formula.clone()))
			.collect::<Result<Vec<Formula>, ScopeError>>()?;

		let references = match rule.role {
			Role::OpenScope => {
				let assumptions = self.context.assumptions();
				rule.check(&Application {
					antecedents: &antecedents,
					consequent: &step.formula,
					environment: Environment { assumptions: &assumptions, givens: &validator.declarations.givens },
					any_order: validator.options.any_order,
				})?;
				self.context.open_hypothesis(step.id.clone(), step.formula.clone())?;
				step.references.clone()
			},
			Role::CloseScope => {
				if step.references.len() > 1 {
					return Err(RuleError::ArityMismatch {
						rule: rule.name.clone(),
						expected: 1,
						actual: step.references.len(),
					}.into());
				}

				let discharged = self.context.discharge(step.references.first())?;
				let antecedents = [discharged.hypothesis.formula, discharged.conclusion.formula];
				let assumptions = self.context.assumptions();
				rule.check(&Application {
					antecedents: &antecedents,
					consequent: &step.formula,
					environment: Environment { assumptions: &assumptions, givens: &validator.declarations.givens },
					any_order: false,
				})?;
				self.context.push(step.id.clone(), step.formula.clone())?;
				vec![discharged.hypothesis.step, discharged.conclusion.step]
			},
			Role::Ordinary => {
				let assumptions = self.context.assumptions();
				rule.check(&Application {
					antecedents: &antecedents,
					consequent: &step.formula,
					environment: Environment { assumptions: &assumptions, givens: &validator.declarations.givens },
					any_order: validator.options.any_order,
				})?;
				self.context.push(step.id.clone(), step.formula.clone())?;
				step.references.clone()
			},
		};

		self.derived.push(CertifiedStep {
			id: step.id.clone(),
			label: step.label.clone(),
			formula: step.formula.clone(),
			rule: rule.name.clone(),
			references,
			depth: self.context.depth(),
		});
		Ok(())
	}

	fn check_number(&mut self, id: &StepId, role: Role) -> Result<(), ValidationError> {
		let expected = match role {
			Role::OpenScope => self.previous.next().nested(),
			Role::CloseScope => match self.previous.parent() {
				Some(parent) => parent,
				None => return Err(ScopeError::NoOpenScope.into()),
			},
			Role::Ordinary => self.previous.next(),
		};

		if *id != expected {
			return Err(ValidationError::IncorrectNumber { expected });
		}
		self.previous = expected;
		Ok(())
	}
}
