use std::collections::BTreeSet;
use std::fmt;

/// Переменная. `tag` отличает переименованные при подстановке переменные от написанных пользователем: у пользовательских он равен нулю.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Var {
	pub name: String,
	pub tag: u32,
}

impl Var {
	pub fn new(name: impl Into<String>) -> Self {
		Var { name: name.into(), tag: 0 }
	}

	/// Новая переменная с тем же именем, которой нет среди `avoid`.
	pub fn fresh(&self, avoid: &BTreeSet<Var>) -> Var {
		let tag = avoid
			.iter()
			.filter(|v| v.name == self.name)
			.map(|v| v.tag)
			.chain(std::iter::once(self.tag))
			.max()
			.unwrap_or(0) + 1;
		Var { name: self.name.clone(), tag }
	}
}

impl fmt::Display for Var {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.tag == 0 {
			write!(f, "{}", self.name)
		} else {
			write!(f, "{}'{}", self.name, self.tag)
		}
	}
}

/// Терм: `x`, `f(x, g(y))`.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Term {
	Variable(Var),
	Function {
		name: String,
		args: Vec<Term>,
	},
}

impl Term {
	pub fn var(name: impl Into<String>) -> Self {
		Term::Variable(Var::new(name))
	}

	pub fn function(name: impl Into<String>, args: Vec<Term>) -> Self {
		Term::Function { name: name.into(), args }
	}

	pub fn variables(&self) -> BTreeSet<Var> {
		let mut result = BTreeSet::new();
		self.collect_variables(&mut result);
		result
	}

	fn collect_variables(&self, into: &mut BTreeSet<Var>) {
		match self {
			Term::Variable(var) => { into.insert(var.clone()); },
			Term::Function { args, .. } => args.iter().for_each(|arg| arg.collect_variables(into)),
		}
	}

	pub fn contains(&self, var: &Var) -> bool {
		match self {
			Term::Variable(v) => v == var,
			Term::Function { args, .. } => args.iter().any(|arg| arg.contains(var)),
		}
	}

	pub fn substitute(&self, var: &Var, term: &Term) -> Term {
		match self {
			Term::Variable(v) if v == var => term.clone(),
			Term::Variable(_) => self.clone(),
			Term::Function { name, args } => Term::Function {
				name: name.clone(),
				args: args.iter().map(|arg| arg.substitute(var, term)).collect(),
			},
		}
	}
}

impl fmt::Display for Term {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Term::Variable(var) => write!(f, "{}", var),
			Term::Function { name, args } => {
				write!(f, "{}(", name)?;
				write_list(f, args)?;
				write!(f, ")")
			},
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Connective {
	And,
	Or,
	Xor,
	Implies,
	Iff,
}

impl Connective {
	fn precedence(self) -> u8 {
		match self {
			Connective::And => 1,
			Connective::Xor => 2,
			Connective::Or => 3,
			Connective::Implies => 4,
			Connective::Iff => 5,
		}
	}

	fn symbol(self) -> &'static str {
		match self {
			Connective::And => "∧",
			Connective::Or => "∨",
			Connective::Xor => "⊕",
			Connective::Implies => "→",
			Connective::Iff => "↔",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Quantifier {
	Forall,
	Exists,
}

/// Логическая формула.
///
/// Варианты `Meta` и `Schema` встречаются только в шаблонах правил, парсер их не создаёт.
#[derive(Clone, Debug)]
pub enum Formula {
	True,
	False,

	/// `P(x, f(y))`, а при пустом `args` просто высказывание `p`.
	Predicate {
		name: String,
		args: Vec<Term>,
	},

	Not(Box<Formula>),

	Binary {
		connective: Connective,
		lhs: Box<Formula>,
		rhs: Box<Formula>,
	},

	/// `∀x.body`, `∃x.body`.
	Quantified {
		quantifier: Quantifier,
		var: Var,
		body: Box<Formula>,
	},

	/// Паттерн, матчится с любой формулой. В правилах выглядит как `A`, `B`.
	Meta {
		name: String,
	},

	/// Паттерн, параметризованный термами: `φ(x)`. Первое вхождение, где аргументы связаны кванторами шаблона, определяет тело, последующие проверяются по нему.
	Schema {
		name: String,
		args: Vec<Term>,
	},
}

impl Formula {
	pub fn predicate(name: impl Into<String>, args: Vec<Term>) -> Self {
		Formula::Predicate { name: name.into(), args }
	}

	pub fn atom(name: impl Into<String>) -> Self {
		Formula::predicate(name, vec![])
	}

	pub fn meta(name: impl Into<String>) -> Self {
		Formula::Meta { name: name.into() }
	}

	pub fn schema(name: impl Into<String>, args: Vec<Term>) -> Self {
		Formula::Schema { name: name.into(), args }
	}

	pub fn not(arg: Formula) -> Self {
		Formula::Not(Box::new(arg))
	}

	pub fn binary(connective: Connective, lhs: Formula, rhs: Formula) -> Self {
		Formula::Binary { connective, lhs: Box::new(lhs), rhs: Box::new(rhs) }
	}

	pub fn and(lhs: Formula, rhs: Formula) -> Self { Formula::binary(Connective::And, lhs, rhs) }
	pub fn or(lhs: Formula, rhs: Formula) -> Self { Formula::binary(Connective::Or, lhs, rhs) }
	pub fn xor(lhs: Formula, rhs: Formula) -> Self { Formula::binary(Connective::Xor, lhs, rhs) }
	pub fn implies(lhs: Formula, rhs: Formula) -> Self { Formula::binary(Connective::Implies, lhs, rhs) }
	pub fn iff(lhs: Formula, rhs: Formula) -> Self { Formula::binary(Connective::Iff, lhs, rhs) }

	pub fn quantified(quantifier: Quantifier, var: Var, body: Formula) -> Self {
		Formula::Quantified { quantifier, var, body: Box::new(body) }
	}

	pub fn forall(var: impl Into<String>, body: Formula) -> Self {
		Formula::quantified(Quantifier::Forall, Var::new(var), body)
	}

	pub fn exists(var: impl Into<String>, body: Formula) -> Self {
		Formula::quantified(Quantifier::Exists, Var::new(var), body)
	}

	/// Свободные переменные формулы.
	pub fn free_variables(&self) -> BTreeSet<Var> {
		let mut result = BTreeSet::new();
		self.collect_free(&mut Vec::new(), &mut result);
		result
	}

	fn collect_free(&self, bound: &mut Vec<Var>, into: &mut BTreeSet<Var>) {
		use Formula::*;

		match self {
			True | False | Meta { .. } => {},
			Predicate { args, .. } | Schema { args, .. } => {
				for var in args.iter().flat_map(Term::variables) {
					if !bound.contains(&var) {
						into.insert(var);
					}
				}
			},
			Not(arg) => arg.collect_free(bound, into),
			Binary { lhs, rhs, .. } => {
				lhs.collect_free(bound, into);
				rhs.collect_free(bound, into);
			},
			Quantified { var, body, .. } => {
				bound.push(var.clone());
				body.collect_free(bound, into);
				bound.pop();
			},
		}
	}

	/// Все переменные формулы, и свободные, и связанные.
	pub fn variables(&self) -> BTreeSet<Var> {
		let mut result = BTreeSet::new();
		self.collect_variables(&mut result);
		result
	}

	fn collect_variables(&self, into: &mut BTreeSet<Var>) {
		use Formula::*;

		match self {
			True | False | Meta { .. } => {},
			Predicate { args, .. } | Schema { args, .. } => args.iter().for_each(|arg| arg.collect_variables(into)),
			Not(arg) => arg.collect_variables(into),
			Binary { lhs, rhs, .. } => {
				lhs.collect_variables(into);
				rhs.collect_variables(into);
			},
			Quantified { var, body, .. } => {
				into.insert(var.clone());
				body.collect_variables(into);
			},
		}
	}

	pub fn is_free(&self, var: &Var) -> bool {
		self.free_variables().contains(var)
	}

	/// Имена всех предикатов формулы.
	pub fn predicates(&self) -> BTreeSet<String> {
		use Formula::*;

		match self {
			True | False | Meta { .. } | Schema { .. } => BTreeSet::new(),
			Predicate { name, .. } => std::iter::once(name.clone()).collect(),
			Not(arg) => arg.predicates(),
			Binary { lhs, rhs, .. } => {
				let mut result = lhs.predicates();
				result.extend(rhs.predicates());
				result
			},
			Quantified { body, .. } => body.predicates(),
		}
	}

	/// Подстановка `term` вместо свободных вхождений `var` без захвата переменных: если квантор связывает переменную, входящую в `term`, он сначала переименовывается.
	pub fn substitute(&self, var: &Var, term: &Term) -> Formula {
		use Formula::*;

		match self {
			True | False | Meta { .. } => self.clone(),
			Predicate { name, args } => Predicate {
				name: name.clone(),
				args: args.iter().map(|arg| arg.substitute(var, term)).collect(),
			},
			Schema { name, args } => Schema {
				name: name.clone(),
				args: args.iter().map(|arg| arg.substitute(var, term)).collect(),
			},
			Not(arg) => Formula::not(arg.substitute(var, term)),
			Binary { connective, lhs, rhs } => Formula::binary(
				*connective,
				lhs.substitute(var, term),
				rhs.substitute(var, term),
			),
			Quantified { quantifier, var: bound, body } => {
				if bound == var || !body.is_free(var) {
					return self.clone();
				}

				if term.contains(bound) {
					let mut avoid = term.variables();
					avoid.extend(body.variables());
					avoid.insert(var.clone());
					let renamed = bound.fresh(&avoid);
					let body = body.substitute(bound, &Term::Variable(renamed.clone()));
					Formula::quantified(*quantifier, renamed, body.substitute(var, term))
				} else {
					Formula::quantified(*quantifier, bound.clone(), body.substitute(var, term))
				}
			},
		}
	}

	/// Находит ли внутри шаблон, определяющий схему (`φ(x)` под квантором по `x`).
	pub(crate) fn defines_schema(&self) -> bool {
		fn inner(formula: &Formula, bound: &mut Vec<Var>) -> bool {
			use Formula::*;

			match formula {
				True | False | Meta { .. } | Predicate { .. } => false,
				Schema { args, .. } => !args.is_empty() && args.iter().all(|arg| match arg {
					Term::Variable(var) => bound.contains(var),
					Term::Function { .. } => false,
				}),
				Not(arg) => inner(arg, bound),
				Binary { lhs, rhs, .. } => inner(lhs, bound) || inner(rhs, bound),
				Quantified { var, body, .. } => {
					bound.push(var.clone());
					let result = inner(body, bound);
					bound.pop();
					result
				},
			}
		}

		inner(self, &mut Vec::new())
	}

	fn precedence(&self) -> u8 {
		match self {
			Formula::Binary { connective, .. } => connective.precedence(),
			_ => 0,
		}
	}
}

/// Позиция связывания переменной, считая от самого внешнего квантора.
pub(crate) fn binding_position(env: &[Var], var: &Var) -> Option<usize> {
	env.iter().rposition(|v| v == var)
}

fn terms_alpha_eq(a: &Term, b: &Term, env_a: &[Var], env_b: &[Var]) -> bool {
	match (a, b) {
		(Term::Variable(x), Term::Variable(y)) => {
			match (binding_position(env_a, x), binding_position(env_b, y)) {
				(Some(i), Some(j)) => i == j,
				(None, None) => x == y,
				_ => false,
			}
		},
		(Term::Function { name: n1, args: a1 }, Term::Function { name: n2, args: a2 }) => {
			n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| terms_alpha_eq(x, y, env_a, env_b))
		},
		_ => false,
	}
}

fn alpha_eq(a: &Formula, b: &Formula, env_a: &mut Vec<Var>, env_b: &mut Vec<Var>) -> bool {
	use Formula::*;

	match (a, b) {
		(True, True) | (False, False) => true,
		(Meta { name: n1 }, Meta { name: n2 }) => n1 == n2,
		(Predicate { name: n1, args: a1 }, Predicate { name: n2, args: a2 }) |
		(Schema { name: n1, args: a1 }, Schema { name: n2, args: a2 }) => {
			n1 == n2 && a1.len() == a2.len() && a1.iter().zip(a2).all(|(x, y)| terms_alpha_eq(x, y, env_a, env_b))
		},
		(Not(x), Not(y)) => alpha_eq(x, y, env_a, env_b),
		(Binary { connective: c1, lhs: l1, rhs: r1 }, Binary { connective: c2, lhs: l2, rhs: r2 }) => {
			c1 == c2 && alpha_eq(l1, l2, env_a, env_b) && alpha_eq(r1, r2, env_a, env_b)
		},
		(Quantified { quantifier: q1, var: v1, body: b1 }, Quantified { quantifier: q2, var: v2, body: b2 }) => {
			if q1 != q2 {
				return false;
			}
			env_a.push(v1.clone());
			env_b.push(v2.clone());
			let result = alpha_eq(b1, b2, env_a, env_b);
			env_a.pop();
			env_b.pop();
			result
		},
		_ => false,
	}
}

/// Равенство с точностью до переименования связанных переменных.
impl PartialEq for Formula {
	fn eq(&self, other: &Self) -> bool {
		alpha_eq(self, other, &mut Vec::new(), &mut Vec::new())
	}
}

impl Eq for Formula {}

fn write_list(f: &mut fmt::Formatter<'_>, terms: &[Term]) -> fmt::Result {
	for (index, term) in terms.iter().enumerate() {
		if index != 0 {
			write!(f, ", ")?;
		}
		write!(f, "{}", term)?;
	}
	Ok(())
}

impl Formula {
	fn fmt_wrapped(&self, f: &mut fmt::Formatter<'_>, wrap: bool) -> fmt::Result {
		if wrap {
			write!(f, "({})", self)
		} else {
			write!(f, "{}", self)
		}
	}
}

impl fmt::Display for Formula {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		use Formula::*;

		match self {
			True => write!(f, "⊤"),
			False => write!(f, "⊥"),
			Predicate { name, args } => {
				write!(f, "{}", name)?;
				if !args.is_empty() {
					write!(f, "(")?;
					write_list(f, args)?;
					write!(f, ")")?;
				}
				Ok(())
			},
			Meta { name } => write!(f, "?{}", name),
			Schema { name, args } => {
				write!(f, "?{}(", name)?;
				write_list(f, args)?;
				write!(f, ")")
			},
			Not(arg) => {
				write!(f, "¬")?;
				arg.fmt_wrapped(f, arg.precedence() > 0)
			},
			Binary { connective, lhs, rhs } => {
				let own = connective.precedence();
				// `→` правоассоциативна, остальные связки левоассоциативны
				let (wrap_left, wrap_right) = if *connective == Connective::Implies {
					(lhs.precedence() >= own, rhs.precedence() > own)
				} else {
					(lhs.precedence() > own, rhs.precedence() >= own)
				};
				lhs.fmt_wrapped(f, wrap_left)?;
				write!(f, "{}", connective.symbol())?;
				rhs.fmt_wrapped(f, wrap_right)
			},
			Quantified { quantifier, var, body } => {
				let symbol = match quantifier {
					Quantifier::Forall => "∀",
					Quantifier::Exists => "∃",
				};
				write!(f, "{}{}.", symbol, var)?;
				body.fmt_wrapped(f, body.precedence() > 0)
			},
		}
	}
}
