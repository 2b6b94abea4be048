use proofc::certificate::*;
use proofc::parsing::parser;
use proofc::proof::*;
use proofc::rules::RuleSet;
use proofc::scope::ScopeError;
use proofc::term::*;
use proofc::validator::*;

fn check(text: &str) -> Certificate {
	check_with(text, Options::default())
}

fn check_with(text: &str, options: Options) -> Certificate {
	let parsed = parser::script(text).unwrap();
	Validator::default()
		.with_declarations(parsed.declarations.clone())
		.with_options(options)
		.validate(&parsed.proof_steps())
}

fn failure(text: &str) -> (StepId, ReasonCode) {
	let certificate = check(text);
	let failure = certificate.failure().unwrap();
	(failure.step.clone(), failure.code())
}

fn id(text: &str) -> StepId {
	parser::step_id(text).unwrap()
}

#[test]
fn identity() {
	let certificate = check("1. P [Hypothesis]\n2. P [Reit: 1]\n3. P -> P [Discharge]\n");
	let derivation = certificate.derivation().unwrap();
	assert_eq!(derivation.conclusion().unwrap().formula, Formula::implies(Formula::atom("P"), Formula::atom("P")));
	assert!(derivation.unused().is_empty());
}

#[test]
fn wrong_conclusion() {
	let text = "\
		1. P [Hypothesis]\n\
		2. P -> R [Hypothesis]\n\
		3. Q [Modus Ponens: 1, 2]\n";
	assert_eq!(failure(text), (id("3"), ReasonCode::PatternMismatch));
}

#[test]
fn unknown_rule() {
	assert_eq!(failure("1. P [Wishful Thinking]\n"), (id("1"), ReasonCode::RuleNotFound));
}

#[test]
fn first_failure_wins() {
	let text = "\
		1. P [Hypothesis]\n\
		2. Q [Reiteration: 1]\n\
		3. R [Wishful Thinking]\n\
		4. S [Reiteration: 9]\n";
	assert_eq!(failure(text), (id("2"), ReasonCode::PatternMismatch));
}

#[test]
fn deterministic() {
	let text = include_str!("../proofs/contrapositive.proof");
	assert_eq!(check(text), check(text));

	let broken = "1. p [Hypothesis]\n2. q [Modus Ponens: 1, 1]\n";
	assert_eq!(check(broken), check(broken));
}

#[test]
fn sibling_scope_is_out_of_reach() {
	let text = "\
		1.1. p [Assumption]\n\
		1. p -> p [Direct Proof Rule]\n\
		2.1. q [Assumption]\n\
		2.2. p [Reiteration: 1.1]\n";
	assert_eq!(failure(text), (id("2.2"), ReasonCode::OutOfScopeReference));
}

#[test]
fn discharge_over_open_child() {
	let text = "\
		1.1. p [Assumption]\n\
		1.2.1. q [Assumption]\n\
		1. p -> q [Direct Proof Rule: 1.1]\n";
	let certificate = check(text);
	let failure = certificate.failure().unwrap();
	assert_eq!(failure.step, id("1"));
	assert_eq!(failure.error, ValidationError::Scope(ScopeError::UnclosedScope { hypothesis: id("1.2.1") }));
}

#[test]
fn proof_ends_in_sub_proof() {
	let text = "1.1. p [Assumption]\n1.2. p [Reiteration: 1.1]\n";
	assert_eq!(failure(text), (id("1.2"), ReasonCode::UnclosedScope));
}

#[test]
fn forward_reference() {
	assert_eq!(failure("1. p [Reiteration: 2]\n2. p [Hypothesis]\n"), (id("1"), ReasonCode::UnknownReference));
}

#[test]
fn contrapositive() {
	let text = include_str!("../proofs/contrapositive.proof");
	let nested = Options { numbering: Numbering::Nested, any_order: true };
	let certificate = check_with(text, nested);
	let derivation = certificate.derivation().unwrap();

	let last = derivation.conclusion().unwrap();
	assert_eq!(last.label, Some("contrapositive".to_string()));
	assert_eq!(last.references, vec![id("1.1"), id("1.2")]);
	assert_eq!(derivation.steps.iter().map(|step| step.depth).collect::<Vec<_>>(), vec![1, 2, 2, 1, 0]);
}

#[test]
fn nested_numbering_is_enforced() {
	let nested = Options { numbering: Numbering::Nested, any_order: true };
	let text = "1. p | ~p [Excluded Middle]\n3. p | ~p [Reiteration: 1]\n";
	let certificate = check_with(text, nested);
	let failure = certificate.failure().unwrap();
	assert_eq!(failure.step, id("3"));
	assert_eq!(failure.error, ValidationError::IncorrectNumber { expected: id("2") });

	assert!(check(text).is_valid());
}

#[test]
fn syllogism() {
	let certificate = check(include_str!("../proofs/syllogism.proof"));
	let derivation = certificate.derivation().unwrap();
	assert_eq!(derivation.steps[1].rule, "elim forall");
	assert_eq!(derivation.support().len(), 5);
}

#[test]
fn proof_by_cases() {
	let certificate = check(include_str!("../proofs/cases.proof"));
	assert!(certificate.is_valid());
}

#[test]
fn undeclared_symbol() {
	let text = "Let p be a proposition\nproof.\n1. p | ~q [Excluded Middle]\n";
	assert_eq!(failure(text), (id("1"), ReasonCode::UndeclaredSymbol));
}

#[test]
fn given_must_be_declared() {
	let text = "Let p, q be propositions\nGiven p\nproof.\n1. q [Given]\n";
	assert_eq!(failure(text), (id("1"), ReasonCode::SideConditionViolated));
}

#[test]
fn universal_generalization() {
	let valid = "\
		1.1. forall x (P(x) & Q(x)) [Assumption]\n\
		1.2. P(a) & Q(a) [Elim Forall: 1.1]\n\
		1.3. P(a) [Elim And: 1.2]\n\
		1.4. forall y P(y) [Intro Forall: 1.3]\n\
		1. (forall x (P(x) & Q(x))) -> forall y P(y) [Direct Proof Rule]\n";
	assert!(check(valid).is_valid());

	let invalid = "\
		1.1. P(a) [Assumption]\n\
		1.2. forall x P(x) [Intro Forall: 1.1]\n\
		1. P(a) -> forall x P(x) [Direct Proof Rule]\n";
	assert_eq!(failure(invalid), (id("1.2"), ReasonCode::SideConditionViolated));
}

#[test]
fn existential_elimination() {
	let text = "\
		1.1. exists x P(x) [Assumption]\n\
		1.2.1. P(a) [Assumption]\n\
		1.2.2. exists y P(y) [Intro Exists: 1.2.1]\n\
		1.2. P(a) -> exists y P(y) [Direct Proof Rule]\n\
		1.3. exists y P(y) [Elim Exists: 1.1, 1.2]\n\
		1. (exists x P(x)) -> exists y P(y) [Direct Proof Rule]\n";
	assert!(check(text).is_valid());
}

#[test]
fn equivalence_steps() {
	let text = "\
		1.1. ~(p & q) [Assumption]\n\
		1.2. ~p | ~q [DeMorgan's Law: 1.1]\n\
		1.3. p -> ~q [Law of Implication: 1.2]\n\
		1. ~(p & q) -> (p -> ~q) [Direct Proof Rule]\n";
	assert!(check(text).is_valid());

	let wrong = "1.1. ~(p & q) [Assumption]\n1.2. ~p & ~q [DeMorgan's Law: 1.1]\n";
	assert_eq!(failure(wrong), (id("1.2"), ReasonCode::PatternMismatch));
}

#[test]
fn certificate_display() {
	let certificate = check("1.1. p [Assumption]\n1. p -> p [Direct Proof Rule]\n");
	assert_eq!(certificate.to_string(), "  1.1. p [Assumption]\n1. p→p [Direct Proof Rule: 1.1, 1.1]\n");

	let certificate = check("1. p [Modus Ponens: 7]\n");
	assert_eq!(certificate.to_string(), "at line 1: referred line `7` does not exist [unknown-reference]");
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn shared_between_threads() {
	assert_send_sync::<Validator<'static>>();
	assert_send_sync::<RuleSet>();
	assert_send_sync::<Certificate>();
	assert_send_sync::<Formula>();

	let text = include_str!("../proofs/contrapositive.proof");
	let parsed = parser::script(text).unwrap();
	let steps = parsed.proof_steps();
	let validator = Validator::new(RuleSet::standard()).with_declarations(parsed.declarations);

	let handles: Vec<_> = (0..2)
		.map(|_| {
			let validator = validator.clone();
			let steps = steps.clone();
			std::thread::spawn(move || validator.validate(&steps))
		})
		.collect();
	let certificates: Vec<Certificate> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

	assert!(certificates[0].is_valid());
	assert_eq!(certificates[0], certificates[1]);
	assert_eq!(certificates[0], validator.validate(&steps));
}
