use crate::proof::StepId;
use crate::term::Formula;
use crate::validator::ValidationError;
use itertools::Itertools;
use petgraph::graph::NodeIndex;
use petgraph::visit::Dfs;
use petgraph::Graph;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Проверенная строка вместе с тем, откуда она взялась.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CertifiedStep {
	pub id: StepId,
	pub label: Option<String>,
	pub formula: Formula,
	/// Каноническое имя правила.
	pub rule: String,
	/// Использованные строки. У выписки гипотезы это гипотеза и последняя строка подвывода.
	pub references: Vec<StepId>,
	/// Сколько подвыводов открыто на этой строке.
	pub depth: usize,
}

#[derive(Default, Debug, Clone, Eq, PartialEq)]
pub struct Derivation {
	pub steps: Vec<CertifiedStep>,
}

impl Derivation {
	/// Последняя строка доказательства, у пустого доказательства её нет.
	pub fn conclusion(&self) -> Option<&CertifiedStep> {
		self.steps.last()
	}

	/// Граф зависимостей: вершина на каждую строку в порядке строк, ребро от строки к каждой строке, на которую она ссылается.
	pub fn dependency_graph(&self) -> Graph<StepId, ()> {
		let positions: BTreeMap<&StepId, usize> = self.steps
			.iter()
			.enumerate()
			.map(|(index, step)| (&step.id, index))
			.collect();

		let mut graph = Graph::with_capacity(self.steps.len(), 0);
		for step in &self.steps {
			graph.add_node(step.id.clone());
		}

		for (from, step) in self.steps.iter().enumerate() {
			for reference in &step.references {
				if let Some(&to) = positions.get(reference) {
					graph.add_edge(NodeIndex::new(from), NodeIndex::new(to), ());
				}
			}
		}
		graph
	}

	/// Строки, от которых заключение зависит хотя бы транзитивно, включая само заключение.
	pub fn support(&self) -> BTreeSet<StepId> {
		let graph = self.dependency_graph();
		let mut result = BTreeSet::new();
		if self.steps.is_empty() {
			return result;
		}

		let mut dfs = Dfs::new(&graph, NodeIndex::new(self.steps.len() - 1));
		while let Some(node) = dfs.next(&graph) {
			result.insert(graph[node].clone());
		}
		result
	}

	/// Строки, которые не нужны для заключения, в порядке доказательства.
	pub fn unused(&self) -> Vec<StepId> {
		let support = self.support();
		self.steps
			.iter()
			.map(|step| &step.id)
			.filter(|id| !support.contains(id))
			.cloned()
			.collect()
	}
}

fn title_case(name: &str) -> String {
	name.split_whitespace()
		.map(|word| {
			let mut chars = word.chars();
			match chars.next() {
				Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
				None => String::new(),
			}
		})
		.join(" ")
}

impl fmt::Display for CertifiedStep {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}. {} [{}", "  ".repeat(self.depth), self.id, self.formula, title_case(&self.rule))?;
		if !self.references.is_empty() {
			write!(f, ": {}", self.references.iter().join(", "))?;
		}
		write!(f, "]")?;
		if let Some(label) = &self.label {
			write!(f, " as {}", label)?;
		}
		Ok(())
	}
}

impl fmt::Display for Derivation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		for step in &self.steps {
			writeln!(f, "{}", step)?;
		}
		Ok(())
	}
}

/// Устойчивые коды причин, по которым доказательство отвергнуто.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ReasonCode {
	UnknownReference,
	OutOfScopeReference,
	DuplicateStep,
	RuleNotFound,
	ArityMismatch,
	PatternMismatch,
	SideConditionViolated,
	ConflictingBinding,
	UnclosedScope,
	NoOpenScope,
	NotAHypothesis,
	UndeclaredSymbol,
	IncorrectNumber,
}

impl ReasonCode {
	pub fn as_str(self) -> &'static str {
		use ReasonCode::*;

		match self {
			UnknownReference => "unknown-reference",
			OutOfScopeReference => "out-of-scope-reference",
			DuplicateStep => "duplicate-step",
			RuleNotFound => "rule-not-found",
			ArityMismatch => "arity-mismatch",
			PatternMismatch => "pattern-mismatch",
			SideConditionViolated => "side-condition-violated",
			ConflictingBinding => "conflicting-binding",
			UnclosedScope => "unclosed-scope",
			NoOpenScope => "no-open-scope",
			NotAHypothesis => "not-a-hypothesis",
			UndeclaredSymbol => "undeclared-symbol",
			IncorrectNumber => "incorrect-number",
		}
	}
}

impl fmt::Display for ReasonCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

/// Первая неверная строка.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Failure {
	/// Позиция строки во входной последовательности.
	pub index: usize,
	pub step: StepId,
	pub error: ValidationError,
}

impl Failure {
	pub fn code(&self) -> ReasonCode {
		self.error.code()
	}
}

impl fmt::Display for Failure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "at line {}: {} [{}]", self.step, self.error, self.code())
	}
}

/// Итог проверки. Строится один раз в конце прохода и дальше не меняется.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Certificate {
	Valid(Derivation),
	Invalid(Failure),
}

impl Certificate {
	pub fn is_valid(&self) -> bool {
		matches!(self, Certificate::Valid(_))
	}

	pub fn derivation(&self) -> Option<&Derivation> {
		match self {
			Certificate::Valid(derivation) => Some(derivation),
			Certificate::Invalid(_) => None,
		}
	}

	pub fn failure(&self) -> Option<&Failure> {
		match self {
			Certificate::Valid(_) => None,
			Certificate::Invalid(failure) => Some(failure),
		}
	}
}

impl fmt::Display for Certificate {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Certificate::Valid(derivation) => write!(f, "{}", derivation),
			Certificate::Invalid(failure) => write!(f, "{}", failure),
		}
	}
}
