use crate::term::*;
use crate::unify::*;
use itertools::Itertools;
use log::trace;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RuleError {
	#[error("rule `{name}` is not known")]
	RuleNotFound {
		name: String,
	},
	#[error("rule `{rule}` expects {expected} antecedents but got {actual}")]
	ArityMismatch {
		rule: String,
		expected: usize,
		actual: usize,
	},
	#[error("claimed formula does not follow by `{rule}`")]
	PatternMismatch {
		rule: String,
	},
	#[error("side condition of `{rule}` is violated: {reason}")]
	SideConditionViolated {
		rule: String,
		reason: String,
	},
	#[error("antecedents of `{rule}` require `{name}` to match two different formulas")]
	ConflictingBinding {
		rule: String,
		name: String,
	},
}

/// Как шаг с этим правилом действует на области видимости.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
	Ordinary,
	/// Открывает подвывод с гипотезой.
	OpenScope,
	/// Закрывает самый внутренний подвывод. Антецеденты правила: гипотеза и последний шаг подвывода.
	CloseScope,
}

/// То, что нужно побочным условиям помимо привязок: открытые гипотезы и данные посылки.
#[derive(Clone, Copy, Debug, Default)]
pub struct Environment<'a> {
	pub assumptions: &'a [Formula],
	pub givens: &'a [Formula],
}

pub type SideCondition = fn(&Bindings, &Environment<'_>) -> Result<(), String>;

/// `premises ⊢ conclusions[0] | conclusions[1] | ...`
#[derive(Clone)]
pub struct Inference {
	pub premises: Vec<Formula>,
	pub conclusions: Vec<Formula>,
	pub side_condition: Option<SideCondition>,
}

impl fmt::Debug for Inference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Inference")
			.field("premises", &self.premises)
			.field("conclusions", &self.conclusions)
			.field("side_condition", &self.side_condition.is_some())
			.finish()
	}
}

#[derive(Clone, Debug)]
pub enum RuleKind {
	Inference(Inference),
	/// Пары равносильных формул, любая может заменять подформулы в обе стороны.
	Equivalence(Vec<(Formula, Formula)>),
}

#[derive(Clone, Debug)]
pub struct Rule {
	pub name: String,
	pub role: Role,
	pub kind: RuleKind,
}

/// Одно применение правила.
#[derive(Clone, Copy, Debug)]
pub struct Application<'a> {
	pub antecedents: &'a [Formula],
	pub consequent: &'a Formula,
	pub environment: Environment<'a>,
	/// Разрешено ли сопоставлять антецеденты с посылками правила в любом порядке.
	pub any_order: bool,
}

impl Rule {
	pub fn arity(&self) -> usize {
		match &self.kind {
			RuleKind::Inference(inference) => inference.premises.len(),
			RuleKind::Equivalence(_) => 1,
		}
	}

	pub fn check(&self, application: &Application<'_>) -> Result<Bindings, RuleError> {
		let actual = application.antecedents.len();
		if actual != self.arity() {
			return Err(RuleError::ArityMismatch { rule: self.name.clone(), expected: self.arity(), actual });
		}

		match &self.kind {
			RuleKind::Inference(inference) => inference.check(&self.name, application),
			RuleKind::Equivalence(equivalences) => {
				if rewrites(equivalences, &application.antecedents[0], application.consequent) {
					Ok(Bindings::default())
				} else {
					Err(RuleError::PatternMismatch { rule: self.name.clone() })
				}
			},
		}
	}
}

impl Inference {
	fn check(&self, rule: &str, application: &Application<'_>) -> Result<Bindings, RuleError> {
		let antecedents = application.antecedents;
		let orders: Vec<Vec<&Formula>> = if application.any_order && antecedents.len() > 1 {
			antecedents.iter().permutations(antecedents.len()).collect()
		} else {
			vec![antecedents.iter().collect()]
		};

		let mut error: Option<RuleError> = None;
		for order in &orders {
			for conclusion in &self.conclusions {
				match self.attempt(rule, order, conclusion, application) {
					Ok(bindings) => return Ok(bindings),
					Err(current) => {
						trace!("`{}` with conclusion {} does not match: {}", rule, conclusion, current);
						// нарушенное побочное условие говорит больше, чем несовпадение
						let replace = match &error {
							None => true,
							Some(RuleError::SideConditionViolated { .. }) => false,
							Some(_) => matches!(current, RuleError::SideConditionViolated { .. }),
						};
						if replace {
							error = Some(current);
						}
					},
				}
			}
		}

		Err(error.unwrap_or_else(|| RuleError::PatternMismatch { rule: rule.to_string() }))
	}

	fn attempt(
		&self,
		rule: &str,
		order: &[&Formula],
		conclusion: &Formula,
		application: &Application<'_>,
	) -> Result<Bindings, RuleError> {
		let mut pairs: Vec<(&Formula, &Formula, bool)> = self.premises
			.iter()
			.zip(order.iter().copied())
			.map(|(pattern, concrete)| (pattern, concrete, false))
			.chain(std::iter::once((conclusion, application.consequent, true)))
			.collect();
		// шаблоны, определяющие схемы, сопоставляются первыми
		pairs.sort_by_key(|(pattern, _, _)| !pattern.defines_schema());

		let mut bindings = Bindings::default();
		for (pattern, concrete, is_consequent) in pairs {
			unify_with(pattern, concrete, &mut bindings).map_err(|error| match error {
				UnifyError::ConflictingBinding { name } if !is_consequent => {
					RuleError::ConflictingBinding { rule: rule.to_string(), name }
				},
				_ => RuleError::PatternMismatch { rule: rule.to_string() },
			})?;
		}

		if let Some(side_condition) = self.side_condition {
			side_condition(&bindings, &application.environment)
				.map_err(|reason| RuleError::SideConditionViolated { rule: rule.to_string(), reason })?;
		}

		Ok(bindings)
	}
}

fn is_instance(left: &Formula, right: &Formula, from: &Formula, to: &Formula) -> bool {
	let mut bindings = Bindings::default();
	unify_with(left, from, &mut bindings).is_ok() && unify_with(right, to, &mut bindings).is_ok()
}

/// Получается ли `rhs` из `lhs` заменой непересекающихся подформул на равносильные.
fn rewrites(equivalences: &[(Formula, Formula)], lhs: &Formula, rhs: &Formula) -> bool {
	use Formula::*;

	if lhs == rhs {
		return true;
	}

	let by_equivalence = equivalences
		.iter()
		.any(|(left, right)| is_instance(left, right, lhs, rhs) || is_instance(left, right, rhs, lhs));
	if by_equivalence {
		return true;
	}

	match (lhs, rhs) {
		(Not(a), Not(b)) => rewrites(equivalences, a, b),
		(Binary { connective: c1, lhs: l1, rhs: r1 }, Binary { connective: c2, lhs: l2, rhs: r2 }) if c1 == c2 => {
			rewrites(equivalences, l1, l2) && rewrites(equivalences, r1, r2)
		},
		(Quantified { quantifier: q1, var: v1, body: b1 }, Quantified { quantifier: q2, var: v2, body: b2 }) if q1 == q2 => {
			let mut avoid = b1.variables();
			avoid.extend(b2.variables());
			let common = Term::Variable(v1.fresh(&avoid));
			rewrites(equivalences, &b1.substitute(v1, &common), &b2.substitute(v2, &common))
		},
		_ => false,
	}
}

/// Приводит имя правила к виду ключа таблицы: `Intro ∧` -> `intro and`.
pub fn normalize_name(name: &str) -> String {
	name.split_whitespace()
		.map(|word| match word {
			"∧" | "\\land" | "\\wedge" => "and".to_string(),
			"∨" | "\\lor" | "\\vee" => "or".to_string(),
			"¬" | "\\neg" => "not".to_string(),
			"→" | "\\to" => "implies".to_string(),
			"↔" | "\\iff" => "iff".to_string(),
			"∀" => "forall".to_string(),
			"∃" => "exists".to_string(),
			other => other.to_lowercase(),
		})
		.join(" ")
}

/// Таблица правил по именам. Набор правил задаётся данными, валидатор только ищет правило по имени.
#[derive(Clone, Debug, Default)]
pub struct RuleSet {
	rules: BTreeMap<String, Rule>,
	aliases: BTreeMap<String, String>,
}

impl RuleSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Стандартный набор правил, общий для всего процесса и неизменяемый.
	pub fn standard() -> &'static RuleSet {
		static STANDARD: OnceLock<RuleSet> = OnceLock::new();
		STANDARD.get_or_init(standard_rules)
	}

	pub fn insert(&mut self, name: &str, role: Role, kind: RuleKind) {
		let name = normalize_name(name);
		self.rules.insert(name.clone(), Rule { name, role, kind });
	}

	pub fn inference(&mut self, name: &str, premises: Vec<Formula>, conclusions: Vec<Formula>, side_condition: Option<SideCondition>) {
		self.insert(name, Role::Ordinary, RuleKind::Inference(Inference { premises, conclusions, side_condition }));
	}

	pub fn equivalence(&mut self, name: &str, equivalences: Vec<(Formula, Formula)>) {
		self.insert(name, Role::Ordinary, RuleKind::Equivalence(equivalences));
	}

	pub fn alias(&mut self, alias: &str, name: &str) {
		self.aliases.insert(normalize_name(alias), normalize_name(name));
	}

	pub fn get(&self, name: &str) -> Result<&Rule, RuleError> {
		let key = normalize_name(name);
		let key = self.aliases.get(&key).unwrap_or(&key);
		self.rules.get(key).ok_or_else(|| RuleError::RuleNotFound { name: name.to_string() })
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.rules.keys().chain(self.aliases.keys()).map(String::as_str)
	}

	/// Проверяет, что `consequent` следует из `antecedents` по правилу `name`, без гипотез и с фиксированным порядком антецедентов.
	pub fn apply(&self, name: &str, antecedents: &[Formula], consequent: &Formula) -> Result<Bindings, RuleError> {
		self.apply_in(name, &Application {
			antecedents,
			consequent,
			environment: Environment::default(),
			any_order: false,
		})
	}

	pub fn apply_in(&self, name: &str, application: &Application<'_>) -> Result<Bindings, RuleError> {
		self.get(name)?.check(application)
	}
}

fn eigenvariable(bindings: &Bindings, name: &str) -> Result<Option<Var>, String> {
	match bindings.term(name) {
		None => Ok(None),
		Some(Term::Variable(var)) => Ok(Some(var.clone())),
		Some(term) => Err(format!("`{}` is not a variable", term)),
	}
}

fn absent_from_assumptions(var: &Var, environment: &Environment<'_>) -> Result<(), String> {
	match environment.assumptions.iter().chain(environment.givens).find(|formula| formula.is_free(var)) {
		Some(formula) => Err(format!("`{}` occurs free in the assumption {}", var, formula)),
		None => Ok(()),
	}
}

fn universal_generalization(bindings: &Bindings, environment: &Environment<'_>) -> Result<(), String> {
	let var = match eigenvariable(bindings, "a")? {
		Some(var) => var,
		None => return Ok(()),
	};
	if bindings.schema("phi").map_or(false, |schema| schema.free_variables().contains(&var)) {
		return Err(format!("`{}` occurs free in the generalized formula", var));
	}
	absent_from_assumptions(&var, environment)
}

fn existential_instantiation(bindings: &Bindings, environment: &Environment<'_>) -> Result<(), String> {
	let var = match eigenvariable(bindings, "a")? {
		Some(var) => var,
		None => return Ok(()),
	};
	if bindings.schema("phi").map_or(false, |schema| schema.free_variables().contains(&var)) {
		return Err(format!("`{}` occurs free in the existential formula", var));
	}
	if bindings.formula("C").map_or(false, |conclusion| conclusion.is_free(&var)) {
		return Err(format!("`{}` occurs free in the conclusion", var));
	}
	absent_from_assumptions(&var, environment)
}

fn is_given(bindings: &Bindings, environment: &Environment<'_>) -> Result<(), String> {
	match bindings.formula("A") {
		Some(formula) if environment.givens.contains(formula) => Ok(()),
		Some(formula) => Err(format!("{} is not given", formula)),
		None => Err("nothing is claimed".to_string()),
	}
}

fn standard_rules() -> RuleSet {
	use Formula as F;

	let a = F::meta("A");
	let b = F::meta("B");
	let c = F::meta("C");
	let mut rules = RuleSet::new();

	// Структурные правила
	rules.insert("assumption", Role::OpenScope, RuleKind::Inference(Inference {
		premises: vec![],
		conclusions: vec![a.clone()],
		side_condition: None,
	}));
	rules.insert("direct proof rule", Role::CloseScope, RuleKind::Inference(Inference {
		premises: vec![a.clone(), b.clone()],
		conclusions: vec![F::implies(a.clone(), b.clone())],
		side_condition: None,
	}));
	rules.inference("given", vec![], vec![a.clone()], Some(is_given));
	rules.inference("reiteration", vec![a.clone()], vec![a.clone()], None);

	// Правила вывода
	rules.inference("excluded middle", vec![], vec![F::or(a.clone(), F::not(a.clone()))], None);
	rules.inference("modus ponens", vec![a.clone(), F::implies(a.clone(), b.clone())], vec![b.clone()], None);
	rules.inference("modus tollens", vec![F::implies(a.clone(), b.clone()), F::not(b.clone())], vec![F::not(a.clone())], None);
	rules.inference("intro and", vec![a.clone(), b.clone()], vec![F::and(a.clone(), b.clone())], None);
	rules.inference("elim and", vec![F::and(a.clone(), b.clone())], vec![a.clone(), b.clone()], None);
	rules.inference("intro or", vec![a.clone()], vec![F::or(a.clone(), b.clone()), F::or(b.clone(), a.clone())], None);
	rules.inference("elim or", vec![F::or(a.clone(), b.clone()), F::not(a.clone())], vec![b.clone()], None);
	rules.inference(
		"proof by cases",
		vec![F::or(a.clone(), b.clone()), F::implies(a.clone(), c.clone()), F::implies(b.clone(), c.clone())],
		vec![c.clone()],
		None,
	);
	rules.inference("intro not", vec![F::implies(a.clone(), F::False)], vec![F::not(a.clone())], None);
	rules.inference("elim not", vec![a.clone(), F::not(a.clone())], vec![F::False], None);
	rules.inference("elim false", vec![F::False], vec![a.clone()], None);
	rules.inference("intro true", vec![], vec![F::True], None);
	rules.inference("intro iff", vec![F::implies(a.clone(), b.clone()), F::implies(b.clone(), a.clone())], vec![F::iff(a.clone(), b.clone())], None);
	rules.inference("elim iff", vec![F::iff(a.clone(), b.clone())], vec![F::implies(a.clone(), b.clone()), F::implies(b.clone(), a.clone())], None);

	// Кванторы
	let phi = |arg: &str| F::schema("phi", vec![Term::var(arg)]);
	rules.inference("elim forall", vec![F::forall("x", phi("x"))], vec![phi("t")], None);
	rules.inference("intro forall", vec![phi("a")], vec![F::forall("x", phi("x"))], Some(universal_generalization));
	rules.inference("intro exists", vec![phi("t")], vec![F::exists("x", phi("x"))], None);
	rules.inference(
		"elim exists",
		vec![F::exists("x", phi("x")), F::implies(phi("a"), c.clone())],
		vec![c.clone()],
		Some(existential_instantiation),
	);

	for (alias, name) in &[
		("hypothesis", "assumption"),
		("discharge", "direct proof rule"),
		("conditional proof", "direct proof rule"),
		("premise", "given"),
		("reit", "reiteration"),
		("elim implies", "modus ponens"),
		("ex falso", "elim false"),
		("universal instantiation", "elim forall"),
		("universal generalization", "intro forall"),
		("existential generalization", "intro exists"),
		("existential instantiation", "elim exists"),
	] {
		rules.alias(alias, name);
	}

	// Определения и равносильности
	let p = F::meta("p");
	let q = F::meta("q");
	let r = F::meta("r");
	let (and, or, not) = (F::and, F::or, F::not);

	rules.equivalence("definition of xor", vec![
		(F::xor(p.clone(), q.clone()), or(and(p.clone(), not(q.clone())), and(not(p.clone()), q.clone()))),
		(F::xor(p.clone(), q.clone()), and(or(p.clone(), q.clone()), or(not(p.clone()), not(q.clone())))),
	]);
	rules.equivalence("definition of biconditional", vec![
		(F::iff(p.clone(), q.clone()), and(F::implies(p.clone(), q.clone()), F::implies(q.clone(), p.clone()))),
	]);
	rules.equivalence("identity", vec![
		(and(p.clone(), F::True), p.clone()),
		(or(p.clone(), F::False), p.clone()),
	]);
	rules.equivalence("domination", vec![
		(or(p.clone(), F::True), F::True),
		(and(p.clone(), F::False), F::False),
	]);
	rules.equivalence("idempotency", vec![
		(or(p.clone(), p.clone()), p.clone()),
		(and(p.clone(), p.clone()), p.clone()),
	]);
	rules.equivalence("commutativity", vec![
		(or(p.clone(), q.clone()), or(q.clone(), p.clone())),
		(and(p.clone(), q.clone()), and(q.clone(), p.clone())),
	]);
	rules.equivalence("associativity", vec![
		(or(or(p.clone(), q.clone()), r.clone()), or(p.clone(), or(q.clone(), r.clone()))),
		(and(and(p.clone(), q.clone()), r.clone()), and(p.clone(), and(q.clone(), r.clone()))),
	]);
	rules.equivalence("distributivity", vec![
		(and(p.clone(), or(q.clone(), r.clone())), or(and(p.clone(), q.clone()), and(p.clone(), r.clone()))),
		(or(p.clone(), and(q.clone(), r.clone())), and(or(p.clone(), q.clone()), or(p.clone(), r.clone()))),
	]);
	rules.equivalence("negation", vec![
		(or(p.clone(), not(p.clone())), F::True),
		(and(p.clone(), not(p.clone())), F::False),
	]);
	rules.equivalence("de morgan's law", vec![
		(not(or(p.clone(), q.clone())), and(not(p.clone()), not(q.clone()))),
		(not(and(p.clone(), q.clone())), or(not(p.clone()), not(q.clone()))),
	]);
	rules.equivalence("double negation", vec![
		(not(not(p.clone())), p.clone()),
	]);
	rules.equivalence("law of implication", vec![
		(F::implies(p.clone(), q.clone()), or(not(p.clone()), q.clone())),
	]);
	rules.equivalence("contrapositive", vec![
		(F::implies(p.clone(), q.clone()), F::implies(not(q.clone()), not(p.clone()))),
	]);
	rules.equivalence("quantifier negation", vec![
		(not(F::forall("x", phi("x"))), F::exists("x", not(phi("x")))),
		(not(F::exists("x", phi("x"))), F::forall("x", not(phi("x")))),
	]);

	// Равносильности булевой алгебры
	let x = F::meta("X");
	let y = F::meta("Y");
	let z = F::meta("Z");
	rules.equivalence("absorption", vec![
		(or(x.clone(), and(x.clone(), y.clone())), x.clone()),
		(and(x.clone(), or(x.clone(), y.clone())), x.clone()),
		(and(or(x.clone(), not(y.clone())), y.clone()), and(x.clone(), y.clone())),
		(or(and(x.clone(), not(y.clone())), y.clone()), or(x.clone(), y.clone())),
	]);
	rules.equivalence("uniting", vec![
		(or(and(x.clone(), y.clone()), and(x.clone(), not(y.clone()))), x.clone()),
		(and(or(x.clone(), y.clone()), or(x.clone(), not(y.clone()))), x.clone()),
	]);
	rules.equivalence("consensus", vec![
		(
			or(or(and(x.clone(), y.clone()), and(y.clone(), z.clone())), and(not(x.clone()), z.clone())),
			or(and(x.clone(), y.clone()), and(not(x.clone()), z.clone())),
		),
		(
			and(and(or(x.clone(), y.clone()), or(y.clone(), z.clone())), or(not(x.clone()), z.clone())),
			and(or(x.clone(), y.clone()), or(not(x.clone()), z.clone())),
		),
	]);
	rules.equivalence("factoring", vec![
		(
			and(or(x.clone(), y.clone()), or(not(x.clone()), z.clone())),
			or(and(x.clone(), y.clone()), and(not(x.clone()), z.clone())),
		),
		(
			or(and(x.clone(), y.clone()), and(not(x.clone()), z.clone())),
			and(or(x.clone(), y.clone()), or(not(x.clone()), z)),
		),
	]);

	for (alias, name) in &[
		("demorgan's law", "de morgan's law"),
		("complementarity", "negation"),
		("null", "domination"),
		("involution", "double negation"),
	] {
		rules.alias(alias, name);
	}

	rules
}
