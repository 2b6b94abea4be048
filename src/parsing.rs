use crate::proof::*;
use crate::term::*;
use crate::utils::span::*;

/// Разобранный файл: объявления и строки доказательства с их местом в тексте.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedProof {
	pub declarations: Declarations,
	pub steps: Vec<Spanned<ProofStep>>,
}

impl ParsedProof {
	pub fn proof_steps(&self) -> Vec<ProofStep> {
		self.steps.iter().map(|step| step.inner.clone()).collect()
	}
}

enum Declaration {
	Symbols(Vec<String>),
	Given(Formula),
}

fn collect_declarations(declarations: Vec<Declaration>) -> Declarations {
	let mut result = Declarations::default();
	for declaration in declarations {
		match declaration {
			Declaration::Symbols(names) => names.into_iter().for_each(|name| result.declare(name)),
			Declaration::Given(formula) => result.give(formula),
		}
	}
	result
}

// Кванторы связывают сильнее бинарных связок: `∀x.P(x) → q` это `(∀x.P(x)) → q`.
peg::parser!(
	pub grammar parser() for str {
		pub rule script() -> ParsedProof
			= __ declarations:(d:declaration() __ { d })*
			  ("proof" _ ("." / ":")? __)?
			  steps:(s:line() __ { s })*
			{
				ParsedProof {
					declarations: collect_declarations(declarations),
					steps,
				}
			}

		rule declaration() -> Declaration
			= "Let" _ names:identifier() ++ (_ ("," / "and" !ident_char()) _) _ "be" _ (("an" / "a") _)? symbol_kind() {
				Declaration::Symbols(names)
			}
			/ "Given" _ ":"? _ formula:formula() { Declaration::Given(formula) }

		rule symbol_kind()
			= "propositions" / "proposition" / "predicates" / "predicate"

		rule line() -> Spanned<ProofStep>
			= start:position!()
			  id:step_id() "."? _
			  formula:formula() _
			  "[" _ name:rule_name() _ references:(":" _ r:step_id() ** (_ "," _) { r })? _ "]"
			  label:(_ "as" _ l:identifier() { l })?
			  end:position!()
			{
				Spanned::new(ProofStep {
					id,
					label,
					formula,
					rule: name,
					references: references.unwrap_or_default(),
				}, GlobalSpan(start..end))
			}

		pub rule step_id() -> StepId
			= components:integer() ++ "." { StepId(components) }

		rule rule_name() -> String
			= n:$((!['[' | ']' | ':' | '\n'] [_])+) { n.trim().to_string() }

		pub rule formula() -> Formula = precedence! {
			x:(@) _ iff() _ y:@ { Formula::iff(x, y) }
			--
			x:@ _ implies() _ y:(@) { Formula::implies(x, y) }
			--
			x:(@) _ or() _ y:@ { Formula::or(x, y) }
			--
			x:(@) _ xor() _ y:@ { Formula::xor(x, y) }
			--
			x:(@) _ and() _ y:@ { Formula::and(x, y) }
			--
			not() _ x:@ { Formula::not(x) }
			q:quantifier() _ v:variable() _ "."? _ x:@ { Formula::quantified(q, v, x) }
			--
			a:atom() { a }
		}

		rule atom() -> Formula
			= "(" _ f:formula() _ ")" { f }
			/ "⊤" { Formula::True }
			/ "⊥" { Formula::False }
			/ name:identifier() _ "(" _ args:term() ** (_ "," _) _ ")" { Formula::predicate(name, args) }
			/ name:identifier() {
				match name.as_str() {
					"T" => Formula::True,
					"F" => Formula::False,
					_ => Formula::atom(name),
				}
			}

		pub rule term() -> Term
			= name:identifier() _ "(" _ args:term() ** (_ "," _) _ ")" { Term::function(name, args) }
			/ v:variable() { Term::Variable(v) }

		// `y'1` печатается для переменной, переименованной при подстановке
		rule variable() -> Var
			= name:identifier() tag:("'" n:integer() { n })? {
				Var { name, tag: tag.unwrap_or(0) }
			}

		rule iff() = "<->" / "↔" / "<=>"
		rule implies() = "->" / "→" / "=>"
		rule or() = "|" / "∨" / "\\/"
		rule xor() = "^" / "⊕"
		rule and() = "&" / "∧" / "/\\"
		rule not() = "~" / "!" / "¬"

		rule quantifier() -> Quantifier
			= ("∀" / "forall" !ident_char()) { Quantifier::Forall }
			/ ("∃" / "exists" !ident_char()) { Quantifier::Exists }

		rule integer() -> u32
			= n:$(['0'..='9']+) {? n.parse().map_err(|_| "number is too big") }

		rule identifier() -> String
			= n:$(['a'..='z' | 'A'..='Z' | '_'] ident_char()*) {
				String::from(n)
			}

		rule ident_char() = ['a'..='z' | 'A'..='Z' | '_' | '0'..='9']

		rule comment() = "//" (!"\n" [_])*

		rule _() = quiet!{[' ' | '\t']*}

		rule __() = quiet!{([' ' | '\t' | '\n' | '\r'] / comment())*}
	}
);

#[cfg(test)]
mod tests {
	use super::*;

	fn p(name: &str) -> Formula {
		Formula::atom(name)
	}

	fn pred(name: &str, var: &str) -> Formula {
		Formula::predicate(name, vec![Term::var(var)])
	}

	#[test]
	fn formulas() {
		assert_eq!(parser::formula("p & q | r").unwrap(), Formula::or(Formula::and(p("p"), p("q")), p("r")));
		assert_eq!(parser::formula("p ∧ (q ∨ r)").unwrap(), Formula::and(p("p"), Formula::or(p("q"), p("r"))));
		assert_eq!(
			parser::formula("p -> q -> r").unwrap(),
			Formula::implies(p("p"), Formula::implies(p("q"), p("r")))
		);
		assert_eq!(parser::formula("p ↔ q → r").unwrap(), Formula::iff(p("p"), Formula::implies(p("q"), p("r"))));
		assert_eq!(parser::formula("~~p").unwrap(), Formula::not(Formula::not(p("p"))));
		assert_eq!(parser::formula("¬p ⊕ q").unwrap(), Formula::xor(Formula::not(p("p")), p("q")));
		assert_eq!(parser::formula("T | ⊥").unwrap(), Formula::or(Formula::True, Formula::False));
	}

	#[test]
	fn quantifiers() {
		assert_eq!(
			parser::formula("∀x.(P(x) → Q(x))").unwrap(),
			Formula::forall("x", Formula::implies(pred("P", "x"), pred("Q", "x")))
		);
		assert_eq!(
			parser::formula("forall x P(x) -> q").unwrap(),
			Formula::implies(Formula::forall("x", pred("P", "x")), p("q"))
		);
		assert_eq!(
			parser::formula("∃y. R(y, f(a))").unwrap(),
			Formula::exists("y", Formula::predicate("R", vec![Term::var("y"), Term::function("f", vec![Term::var("a")])]))
		);
		assert_eq!(parser::formula("forallx").unwrap(), p("forallx"));
	}

	#[test]
	fn display_reparses() {
		let sources = [
			"p <-> q <-> r",
			"p ^ (q | r)",
			"~(forall x P(x)) & q",
			"forall x (P(x) -> exists y R(x, y))",
			"(p -> q) -> r",
			"p -> q -> r",
			"p & (q & r)",
			"~p | ~~q",
			"q & forall x ~P(x)",
			"(exists y R(y, f(y))) <-> ⊥",
		];
		for source in sources.iter() {
			let formula = parser::formula(source).unwrap();
			assert_eq!(parser::formula(&formula.to_string()).unwrap(), formula, "{}", source);
		}
	}

	#[test]
	fn renamed_variables_reparse() {
		// (∀y.R(x,y))[x := f(y)] = ∀y'1.R(f(y), y'1)
		let formula = Formula::forall("y", Formula::predicate("R", vec![Term::var("x"), Term::var("y")]));
		let renamed = formula.substitute(&Var::new("x"), &Term::function("f", vec![Term::var("y")]));
		assert_eq!(renamed.to_string(), "∀y'1.R(f(y), y'1)");
		assert_eq!(parser::formula(&renamed.to_string()).unwrap(), renamed);

		assert_eq!(parser::term("y'2").unwrap(), Term::Variable(Var { name: "y".to_string(), tag: 2 }));
	}

	#[test]
	fn script() {
		let text = "\
			Let p, q be propositions\n\
			Given p\n\
			// комментарий\n\
			proof.\n\
			1.1. q [Assumption]\n\
			1.2. p [Given]\n\
			1. q -> p [Direct Proof Rule] as weakening\n\
			2. q -> p [Reiteration: 1]\n";
		let parsed = parser::script(text).unwrap();

		assert_eq!(parsed.declarations.givens, vec![p("p")]);
		assert_eq!(parsed.declarations.undeclared(&p("r")), Some("r".to_string()));
		assert_eq!(parsed.steps.len(), 4);

		let steps = parsed.proof_steps();
		assert_eq!(steps[0].id, StepId::new(vec![1, 1]));
		assert_eq!(steps[2].rule, "Direct Proof Rule");
		assert_eq!(steps[2].label, Some("weakening".to_string()));
		assert_eq!(steps[3].references, vec![StepId::from(1)]);
		assert_eq!(&text[parsed.steps[1].span.0.clone()], "1.2. p [Given]");
	}

	#[test]
	fn syntax_errors() {
		assert!(parser::script("1. p -> [Assumption]").is_err());
		assert!(parser::script("1. p [Assumption").is_err());
		assert!(parser::formula("P(x").is_err());
	}
}
