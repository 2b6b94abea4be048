use crate::term::*;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum UnifyError {
	#[error("formulas do not unify")]
	NoUnification,
	#[error("`{name}` is required to match two different values")]
	ConflictingBinding {
		name: String,
	},
}

/// `φ(params) := body`, значение, к которому привязана схема.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Schema {
	pub params: Vec<Var>,
	pub body: Formula,
}

impl Schema {
	pub fn free_variables(&self) -> BTreeSet<Var> {
		let mut result = self.body.free_variables();
		for param in &self.params {
			result.remove(param);
		}
		result
	}
}

/// Результат унификации: значения паттернов формул, термов и схем.
#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Bindings {
	formulas: BTreeMap<String, Formula>,
	terms: BTreeMap<Var, Term>,
	schemas: BTreeMap<String, Schema>,
}

impl Bindings {
	pub fn formula(&self, name: &str) -> Option<&Formula> {
		self.formulas.get(name)
	}

	pub fn term(&self, name: &str) -> Option<&Term> {
		self.terms.get(&Var::new(name))
	}

	pub fn schema(&self, name: &str) -> Option<&Schema> {
		self.schemas.get(name)
	}

	/// Добавляет привязку формулы. Если она уже есть, то проверяет что значения совпадают.
	fn add_formula(&mut self, name: &str, value: Formula) -> Result<(), UnifyError> {
		use std::collections::btree_map::Entry::*;

		match self.formulas.entry(name.to_string()) {
			Vacant(vacant) => {
				vacant.insert(value);
				Ok(())
			},
			Occupied(occupied) => {
				if *occupied.get() == value {
					Ok(())
				} else {
					Err(UnifyError::ConflictingBinding { name: name.to_string() })
				}
			},
		}
	}

	fn add_term(&mut self, var: &Var, value: Term) -> Result<(), UnifyError> {
		use std::collections::btree_map::Entry::*;

		match self.terms.entry(var.clone()) {
			Vacant(vacant) => {
				vacant.insert(value);
				Ok(())
			},
			Occupied(occupied) => {
				if *occupied.get() == value {
					Ok(())
				} else {
					Err(UnifyError::ConflictingBinding { name: var.to_string() })
				}
			},
		}
	}
}

/// Сопоставление шаблона с конкретной формулой.
///
/// Связанные переменные сравниваются по позиции квантора, поэтому имена связанных переменных не важны. В режиме `holes` сопоставляется тело уже известной схемы: паттернами там являются только параметры схемы, остальные свободные переменные должны совпадать буквально.
struct Matcher {
	bindings: Bindings,
	holes: Option<Vec<Var>>,
	found: BTreeMap<Var, Term>,
	pattern_env: Vec<Var>,
	concrete_env: Vec<Var>,
	/// Кванторы `concrete_env` ниже этой позиции лежат снаружи сопоставляемой формулы.
	base: usize,
}

impl Matcher {
	fn new(bindings: Bindings) -> Self {
		Matcher {
			bindings,
			holes: None,
			found: BTreeMap::new(),
			pattern_env: Vec::new(),
			concrete_env: Vec::new(),
			base: 0,
		}
	}

	fn formula(&mut self, pattern: &Formula, concrete: &Formula) -> Result<(), UnifyError> {
		use Formula::*;

		match (pattern, concrete) {
			(Meta { name }, _) => {
				self.closed(concrete)?;
				self.bindings.add_formula(name, concrete.clone())
			},
			(Formula::Schema { name, args }, _) => self.schema(name, args, concrete),
			(True, True) | (False, False) => Ok(()),
			(Predicate { name: n1, args: a1 }, Predicate { name: n2, args: a2 })
				if n1 == n2 && a1.len() == a2.len()
			=> {
				for (p, c) in a1.iter().zip(a2) {
					self.term(p, c)?;
				}
				Ok(())
			},
			(Not(p), Not(c)) => self.formula(p, c),
			(Binary { connective: c1, lhs: l1, rhs: r1 }, Binary { connective: c2, lhs: l2, rhs: r2 })
				if c1 == c2
			=> {
				self.formula(l1, l2)?;
				self.formula(r1, r2)
			},
			(Quantified { quantifier: q1, var: v1, body: b1 }, Quantified { quantifier: q2, var: v2, body: b2 })
				if q1 == q2
			=> {
				self.pattern_env.push(v1.clone());
				self.concrete_env.push(v2.clone());
				let result = self.formula(b1, b2);
				self.pattern_env.pop();
				self.concrete_env.pop();
				result
			},
			_ => Err(UnifyError::NoUnification),
		}
	}

	fn term(&mut self, pattern: &Term, concrete: &Term) -> Result<(), UnifyError> {
		match pattern {
			Term::Variable(var) => {
				if let Some(position) = binding_position(&self.pattern_env, var) {
					return match concrete {
						Term::Variable(other)
							if binding_position(&self.concrete_env, other) == Some(self.base + position)
						=> Ok(()),
						_ => Err(UnifyError::NoUnification),
					};
				}

				let is_hole = self.holes.as_ref().map(|params| params.contains(var));
				match is_hole {
					None => {
						self.captures(concrete)?;
						self.bindings.add_term(var, concrete.clone())
					},
					Some(true) => {
						self.captures(concrete)?;
						match self.found.get(var) {
							Some(previous) if previous != concrete => {
								Err(UnifyError::ConflictingBinding { name: var.to_string() })
							},
							Some(_) => Ok(()),
							None => {
								self.found.insert(var.clone(), concrete.clone());
								Ok(())
							},
						}
					},
					Some(false) => match concrete {
						Term::Variable(other)
							if other == var && binding_position(&self.concrete_env, other).is_none()
						=> Ok(()),
						_ => Err(UnifyError::NoUnification),
					},
				}
			},
			Term::Function { name, args } => match concrete {
				Term::Function { name: other_name, args: other_args }
					if name == other_name && args.len() == other_args.len()
				=> {
					for (p, c) in args.iter().zip(other_args) {
						self.term(p, c)?;
					}
					Ok(())
				},
				_ => Err(UnifyError::NoUnification),
			},
		}
	}

	/// Терм не должен ссылаться на переменные, связанные внутри сопоставляемой формулы.
	fn captures(&self, concrete: &Term) -> Result<(), UnifyError> {
		let base = self.base;
		let captured = concrete
			.variables()
			.iter()
			.any(|var| binding_position(&self.concrete_env, var).map_or(false, |position| position >= base));
		if captured {
			Err(UnifyError::NoUnification)
		} else {
			Ok(())
		}
	}

	/// Формула, привязываемая к паттерну, не должна ссылаться на переменные окружающих кванторов.
	fn closed(&self, concrete: &Formula) -> Result<(), UnifyError> {
		let open = concrete
			.free_variables()
			.iter()
			.any(|var| binding_position(&self.concrete_env, var).is_some());
		if open {
			Err(UnifyError::NoUnification)
		} else {
			Ok(())
		}
	}

	fn schema(&mut self, name: &str, args: &[Term], concrete: &Formula) -> Result<(), UnifyError> {
		if let Some(schema) = self.bindings.schemas.get(name).cloned() {
			if schema.params.len() != args.len() {
				return Err(UnifyError::NoUnification);
			}

			let mut body_matcher = Matcher {
				bindings: Bindings::default(),
				holes: Some(schema.params.clone()),
				found: BTreeMap::new(),
				pattern_env: Vec::new(),
				concrete_env: self.concrete_env.clone(),
				base: self.concrete_env.len(),
			};
			body_matcher.formula(&schema.body, concrete)?;

			for (param, arg) in schema.params.iter().zip(args) {
				if let Some(value) = body_matcher.found.get(param) {
					self.term(arg, value)?;
				}
			}
			return Ok(());
		}

		let mut positions = Vec::with_capacity(args.len());
		for arg in args {
			match arg {
				Term::Variable(var) => match binding_position(&self.pattern_env, var) {
					Some(position) if !positions.contains(&position) => positions.push(position),
					_ => return Err(UnifyError::NoUnification),
				},
				Term::Function { .. } => return Err(UnifyError::NoUnification),
			}
		}

		// формула может зависеть только от тех связанных переменных, по которым абстрагируется схема
		for var in concrete.free_variables() {
			if let Some(position) = binding_position(&self.concrete_env, &var) {
				if !positions.contains(&position) {
					return Err(UnifyError::NoUnification);
				}
			}
		}

		let mut avoid = concrete.variables();
		avoid.extend(self.concrete_env.iter().cloned());
		let mut params = Vec::with_capacity(positions.len());
		for position in positions {
			let var = &self.concrete_env[position];
			if binding_position(&self.concrete_env, var) == Some(position) {
				params.push(var.clone());
			} else {
				// переменная затенена и в формулу не входит
				let fresh = var.fresh(&avoid);
				avoid.insert(fresh.clone());
				params.push(fresh);
			}
		}

		self.bindings.schemas.insert(name.to_string(), Schema { params, body: concrete.clone() });
		Ok(())
	}
}

/// Унифицирует шаблон с формулой, продолжая уже накопленные привязки. При ошибке `bindings` может остаться частично заполненным.
pub fn unify_with(pattern: &Formula, concrete: &Formula, bindings: &mut Bindings) -> Result<(), UnifyError> {
	let mut matcher = Matcher::new(std::mem::take(bindings));
	let result = matcher.formula(pattern, concrete);
	*bindings = matcher.bindings;
	result
}

/// Самая общая подстановка, превращающая `pattern` в `concrete`.
pub fn unify(pattern: &Formula, concrete: &Formula) -> Result<Bindings, UnifyError> {
	let mut bindings = Bindings::default();
	unify_with(pattern, concrete, &mut bindings)?;
	Ok(bindings)
}

pub fn unify_terms(pattern: &Term, concrete: &Term) -> Result<Bindings, UnifyError> {
	let mut matcher = Matcher::new(Bindings::default());
	matcher.term(pattern, concrete)?;
	Ok(matcher.bindings)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn r(a: Term, b: Term) -> Formula {
		Formula::predicate("R", vec![a, b])
	}

	fn x(name: &str) -> Term {
		Term::var(name)
	}

	#[test]
	fn modus_ponens_pattern() {
		let pattern = Formula::implies(Formula::meta("A"), Formula::meta("B"));
		let concrete = Formula::implies(Formula::atom("p"), Formula::and(Formula::atom("q"), Formula::atom("r")));
		let bindings = unify(&pattern, &concrete).unwrap();
		assert_eq!(bindings.formula("A"), Some(&Formula::atom("p")));
		assert_eq!(bindings.formula("B"), Some(&Formula::and(Formula::atom("q"), Formula::atom("r"))));
	}

	#[test]
	fn conflicting_binding() {
		let pattern = Formula::and(Formula::meta("A"), Formula::meta("A"));
		assert!(unify(&pattern, &Formula::and(Formula::atom("p"), Formula::atom("p"))).is_ok());
		assert_eq!(
			unify(&pattern, &Formula::and(Formula::atom("p"), Formula::atom("q"))),
			Err(UnifyError::ConflictingBinding { name: "A".to_string() })
		);
	}

	#[test]
	fn connective_mismatch() {
		let pattern = Formula::and(Formula::meta("A"), Formula::meta("B"));
		assert_eq!(
			unify(&pattern, &Formula::or(Formula::atom("p"), Formula::atom("q"))),
			Err(UnifyError::NoUnification)
		);
	}

	#[test]
	fn terms() {
		let bindings = unify_terms(&Term::function("f", vec![x("t"), x("t")]), &Term::function("f", vec![x("a"), x("a")])).unwrap();
		assert_eq!(bindings.term("t"), Some(&x("a")));
		assert_eq!(
			unify_terms(&Term::function("f", vec![x("t"), x("t")]), &Term::function("f", vec![x("a"), x("b")])),
			Err(UnifyError::ConflictingBinding { name: "t".to_string() })
		);
	}

	#[test]
	fn bound_variable_names_do_not_matter() {
		let fa = Term::function("f", vec![x("a")]);
		let concrete = Formula::forall("z", r(x("z"), fa.clone()));
		let by_x = unify(&Formula::forall("x", r(x("x"), x("t"))), &concrete).unwrap();
		let by_y = unify(&Formula::forall("y", r(x("y"), x("t"))), &concrete).unwrap();
		assert_eq!(by_x.term("t"), Some(&fa));
		assert_eq!(by_x, by_y);
	}

	#[test]
	fn metavariable_cannot_capture_bound_variable() {
		let pattern = Formula::forall("x", r(x("x"), x("t")));
		assert_eq!(
			unify(&pattern, &Formula::forall("z", r(x("z"), x("z")))),
			Err(UnifyError::NoUnification)
		);

		let pattern = Formula::forall("x", Formula::meta("A"));
		assert!(unify(&pattern, &Formula::forall("z", Formula::atom("p"))).is_ok());
		assert!(unify(&pattern, &Formula::forall("z", Formula::predicate("P", vec![x("z")]))).is_err());
	}

	#[test]
	fn schema_instantiation() {
		// ∀x.φ(x) определяет φ, затем φ(t) проверяется по телу
		let definition = Formula::forall("x", Formula::schema("phi", vec![x("x")]));
		let instance = Formula::schema("phi", vec![x("t")]);
		let mut bindings = Bindings::default();

		let general = Formula::forall("y", Formula::forall("w", r(x("y"), x("w"))));
		unify_with(&definition, &general, &mut bindings).unwrap();
		assert!(bindings.schema("phi").is_some());

		let mut with_b = bindings.clone();
		unify_with(&instance, &Formula::forall("w", r(x("b"), x("w"))), &mut with_b).unwrap();
		assert_eq!(with_b.term("t"), Some(&x("b")));

		// ∀w.R(w,w) получилось бы только с захватом переменной
		let mut captured = bindings.clone();
		assert_eq!(
			unify_with(&instance, &Formula::forall("w", r(x("w"), x("w"))), &mut captured),
			Err(UnifyError::NoUnification)
		);
	}

	#[test]
	fn schema_keeps_free_variables_rigid() {
		let definition = Formula::exists("x", Formula::schema("phi", vec![x("x")]));
		let instance = Formula::schema("phi", vec![x("t")]);
		let mut bindings = Bindings::default();
		unify_with(&definition, &Formula::exists("x", r(x("x"), x("a"))), &mut bindings).unwrap();

		let mut matching = bindings.clone();
		unify_with(&instance, &r(x("a"), x("a")), &mut matching).unwrap();
		assert_eq!(matching.term("t"), Some(&x("a")));

		let mut other = bindings.clone();
		assert!(unify_with(&instance, &r(x("c"), x("b")), &mut other).is_err());
	}

	#[test]
	fn schema_parameter_with_two_values() {
		let definition = Formula::forall("x", Formula::schema("phi", vec![x("x")]));
		let mut bindings = Bindings::default();
		unify_with(&definition, &Formula::forall("y", r(x("y"), x("y"))), &mut bindings).unwrap();

		assert_eq!(
			unify_with(&Formula::schema("phi", vec![x("t")]), &r(x("a"), x("b")), &mut bindings),
			Err(UnifyError::ConflictingBinding { name: "y".to_string() })
		);
	}

	#[test]
	fn schema_is_only_defined_by_bound_arguments() {
		let body = Formula::schema("phi", vec![x("t")]);
		assert_eq!(unify(&body, &Formula::atom("p")), Err(UnifyError::NoUnification));
	}
}
